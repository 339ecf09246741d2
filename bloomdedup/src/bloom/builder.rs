// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::f64::consts::LN_2;

use super::BloomFilter;
use crate::error::Error;

/// Smallest bit set a filter will allocate.
pub const MIN_NUM_BITS: u64 = 512;
/// Largest bit set a filter will allocate (128 GiB of bits, 16 GiB of memory).
pub const MAX_NUM_BITS: u64 = 1 << MAX_CAPACITY_EXPONENT;

/// Largest probe count a filter accepts. Every query and insert touches this many bits.
pub const MAX_NUM_PROBES: u64 = 1024;

pub(super) const MIN_CAPACITY_EXPONENT: u64 = 9;
pub(super) const MAX_CAPACITY_EXPONENT: u64 = 40;

/// Resolved dimensions of a filter: a power-of-two bit length and a probe count.
///
/// # Examples
///
/// ```
/// use bloomdedup::bloom::Sizing;
///
/// let sizing = Sizing::compute(1000.0, 0.01).unwrap();
/// assert_eq!(sizing.num_bits(), 16_384);
/// assert_eq!(sizing.capacity_exponent(), 14);
/// assert_eq!(sizing.num_probes(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizing {
    capacity_exponent: u64,
    num_probes: u64,
}

impl Sizing {
    /// Resolves `(entries, rate_or_count)` using one of two calling conventions.
    ///
    /// - `rate_or_count >= 1.0`: `entries` is the requested **bit length** and `rate_or_count`
    ///   the probe count (fractional part dropped).
    /// - `rate_or_count < 1.0`: `entries` is the expected number of entries and `rate_or_count`
    ///   the target false positive rate.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if either
    /// value is not finite or negative, if the rate is not in `(0.0, 1.0)`, if the resulting
    /// bit length exceeds [`MAX_NUM_BITS`], or if the probe count exceeds [`MAX_NUM_PROBES`].
    pub fn compute(entries: f64, rate_or_count: f64) -> Result<Self, Error> {
        if !entries.is_finite() || !rate_or_count.is_finite() {
            return Err(Error::config_invalid("sizing parameters must be finite")
                .with_context("entries", entries)
                .with_context("rate_or_count", rate_or_count));
        }
        if entries < 0.0 {
            return Err(
                Error::config_invalid("entries must not be negative").with_context("entries", entries)
            );
        }

        if rate_or_count >= 1.0 {
            Self::for_size(entries as u64, rate_or_count as u64)
        } else {
            Self::for_accuracy(entries, rate_or_count)
        }
    }

    /// Sizes a filter for `entries` expected entries at false positive rate `fpp`.
    ///
    /// Formulas: `m = -n * ln(p) / ln(2)^2` and `k = ceil(ln(2) * m / n)`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if `entries`
    /// is not positive, `fpp` is not in `(0.0, 1.0)`, or the bit length is too large.
    pub fn for_accuracy(entries: f64, fpp: f64) -> Result<Self, Error> {
        if !(entries.is_finite() && entries > 0.0) {
            return Err(
                Error::config_invalid("entries must be positive").with_context("entries", entries)
            );
        }
        if !(fpp > 0.0 && fpp < 1.0) {
            return Err(Error::config_invalid(
                "false positive rate must be between 0.0 and 1.0 (exclusive)",
            )
            .with_context("fpp", fpp));
        }

        let bits = -entries * fpp.ln() / (LN_2 * LN_2);
        if bits > MAX_NUM_BITS as f64 {
            return Err(Error::config_invalid(format!(
                "filter would need {bits:.0} bits, more than {MAX_NUM_BITS}"
            ))
            .with_context("entries", entries)
            .with_context("fpp", fpp));
        }
        let num_probes = (LN_2 * bits / entries).ceil() as u64;

        Self::for_size(bits.ceil() as u64, num_probes)
    }

    /// Sizes a filter with an explicit bit length and probe count.
    ///
    /// The bit length is rounded up to the next power of two, and to at least
    /// [`MIN_NUM_BITS`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if
    /// `num_probes` is 0 or above [`MAX_NUM_PROBES`], or `num_bits` exceeds [`MAX_NUM_BITS`].
    pub fn for_size(num_bits: u64, num_probes: u64) -> Result<Self, Error> {
        if !(1..=MAX_NUM_PROBES).contains(&num_probes) {
            return Err(Error::config_invalid(format!(
                "num_probes must be between 1 and {MAX_NUM_PROBES}"
            ))
            .with_context("num_probes", num_probes));
        }
        if num_bits > MAX_NUM_BITS {
            return Err(Error::config_invalid(format!(
                "num_bits must not exceed {MAX_NUM_BITS}"
            ))
            .with_context("num_bits", num_bits));
        }

        let target = num_bits.max(MIN_NUM_BITS);
        let mut size = 1u64;
        let mut capacity_exponent = 0;
        while size < target {
            size <<= 1;
            capacity_exponent += 1;
        }

        log::debug!(
            "sized bloom filter: requested {num_bits} bits, allocating 2^{capacity_exponent} bits with {num_probes} probes"
        );
        Ok(Sizing {
            capacity_exponent,
            num_probes,
        })
    }

    /// Returns `log2` of the bit length.
    pub fn capacity_exponent(&self) -> u64 {
        self.capacity_exponent
    }

    /// Returns the bit length, a power of two.
    pub fn num_bits(&self) -> u64 {
        1 << self.capacity_exponent
    }

    /// Returns the number of probes per entry.
    pub fn num_probes(&self) -> u64 {
        self.num_probes
    }
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Accuracy { max_items: u64, fpp: f64 },
    Size { num_bits: u64, num_probes: u64 },
}

/// Builder for creating [`BloomFilter`] instances.
///
/// Provides two construction modes:
/// - [`with_accuracy()`](Self::with_accuracy): Specify target items and false positive rate
///   (recommended)
/// - [`with_size()`](Self::with_size): Specify requested bit count and probe count (manual)
///
/// Parameters are validated by [`build()`](Self::build), which reports problems as errors.
#[derive(Debug, Clone, Default)]
pub struct BloomFilterBuilder {
    request: Option<Request>,
}

impl BloomFilterBuilder {
    /// Creates a builder with optimal parameters for a target accuracy.
    ///
    /// # Arguments
    ///
    /// - `max_items`: Maximum expected number of distinct items
    /// - `fpp`: Target false positive probability (e.g., 0.01 for 1%)
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilterBuilder;
    /// let filter = BloomFilterBuilder::with_accuracy(10_000, 0.01).build().unwrap();
    /// assert_eq!(filter.num_probes(), 7);
    /// ```
    pub fn with_accuracy(max_items: u64, fpp: f64) -> Self {
        BloomFilterBuilder {
            request: Some(Request::Accuracy { max_items, fpp }),
        }
    }

    /// Creates a builder with manual size specification.
    ///
    /// `num_bits` is rounded up to a power of two of at least [`MIN_NUM_BITS`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilterBuilder;
    /// let filter = BloomFilterBuilder::with_size(10_000, 7).build().unwrap();
    /// assert_eq!(filter.capacity(), 16_384);
    /// ```
    pub fn with_size(num_bits: u64, num_probes: u64) -> Self {
        BloomFilterBuilder {
            request: Some(Request::Size {
                num_bits,
                num_probes,
            }),
        }
    }

    /// Builds the Bloom filter.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if neither
    /// `with_accuracy()` nor `with_size()` was called, or if their parameters are unusable.
    pub fn build(self) -> Result<BloomFilter, Error> {
        let sizing = match self.request {
            Some(Request::Accuracy { max_items, fpp }) => {
                Sizing::for_accuracy(max_items as f64, fpp)?
            }
            Some(Request::Size {
                num_bits,
                num_probes,
            }) => Sizing::for_size(num_bits, num_probes)?,
            None => {
                return Err(Error::config_invalid(
                    "must call with_accuracy() or with_size() before build()",
                ));
            }
        };
        Ok(BloomFilter::from_sizing(sizing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_accuracy_sizing() {
        let sizing = Sizing::compute(1000.0, 0.01).unwrap();
        assert_eq!(sizing.num_bits(), 16_384);
        assert_eq!(sizing.capacity_exponent(), 14);
        assert_eq!(sizing.num_probes(), 7);
    }

    #[test]
    fn test_explicit_sizing_rounds_to_power_of_two() {
        let sizing = Sizing::compute(1000.0, 3.0).unwrap();
        assert_eq!(sizing.num_bits(), 1024);
        assert_eq!(sizing.capacity_exponent(), 10);
        assert_eq!(sizing.num_probes(), 3);

        let exact = Sizing::compute(4096.0, 4.0).unwrap();
        assert_eq!(exact.num_bits(), 4096);
    }

    #[test]
    fn test_explicit_sizing_truncates_probe_count() {
        let sizing = Sizing::compute(2048.0, 2.9).unwrap();
        assert_eq!(sizing.num_probes(), 2);
    }

    #[test]
    fn test_sizing_floor() {
        for bits in [0, 1, 64, 511, 512] {
            let sizing = Sizing::for_size(bits, 1).unwrap();
            assert_eq!(sizing.num_bits(), MIN_NUM_BITS);
            assert_eq!(sizing.capacity_exponent(), MIN_CAPACITY_EXPONENT);
        }
        assert_eq!(Sizing::for_size(513, 1).unwrap().num_bits(), 1024);
    }

    #[test]
    fn test_tiny_accuracy_request_uses_floor() {
        let sizing = Sizing::compute(1.0, 0.9).unwrap();
        assert_eq!(sizing.num_bits(), MIN_NUM_BITS);
        assert_eq!(sizing.num_probes(), 1);
    }

    #[test]
    fn test_invalid_parameters() {
        let cases = [
            (f64::NAN, 0.01),
            (1000.0, f64::INFINITY),
            (-5.0, 0.01),
            (0.0, 0.01),
            (1000.0, 0.0),
            (1000.0, -0.5),
            (1e30, 1e-9),
            (1e30, 3.0),
        ];
        for (entries, rate_or_count) in cases {
            let err = Sizing::compute(entries, rate_or_count).unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::ConfigInvalid,
                "({entries}, {rate_or_count})"
            );
        }
    }

    #[test]
    fn test_zero_probes_rejected() {
        let err = Sizing::for_size(1024, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_probe_count_is_bounded() {
        assert_eq!(
            Sizing::for_size(1024, MAX_NUM_PROBES).unwrap().num_probes(),
            MAX_NUM_PROBES
        );
        let err = Sizing::for_size(1024, MAX_NUM_PROBES + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("num_probes"));

        // a count past u64::MAX saturates on conversion and must still be refused
        for rate_or_count in [1e19, 1e300] {
            let err = Sizing::compute(1024.0, rate_or_count).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        }
        let err = BloomFilterBuilder::with_size(1024, u64::MAX).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_builder_without_parameters() {
        let err = BloomFilterBuilder::default().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("with_accuracy"));
    }

    #[test]
    fn test_builder_conventions() {
        let filter = BloomFilterBuilder::with_accuracy(1000, 0.01).build().unwrap();
        assert_eq!(filter.capacity(), 16_384);
        assert_eq!(filter.num_probes(), 7);

        let filter = BloomFilterBuilder::with_size(1024, 5).build().unwrap();
        assert_eq!(filter.capacity(), 1024);
        assert_eq!(filter.num_probes(), 5);
    }

    #[test]
    fn test_builder_reports_invalid_fpp() {
        let err = BloomFilterBuilder::with_accuracy(100, 1.5).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("false positive rate"));
    }
}
