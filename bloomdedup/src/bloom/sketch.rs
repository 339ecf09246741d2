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

use std::hash::Hasher;

use siphasher::sip::SipHasher24;

use super::BloomFilterBuilder;
use super::Sizing;
use super::bitset::BitSet;
use super::builder::MAX_CAPACITY_EXPONENT;
use super::builder::MAX_NUM_PROBES;
use super::builder::MIN_CAPACITY_EXPONENT;
use crate::error::Error;

// SipHash keys shared by every filter; persisted filters depend on them.
const SIP_KEY_0: u64 = 0xdead_beaf;
const SIP_KEY_1: u64 = 0xfaeb_daed;

/// A Bloom filter for probabilistic set membership testing.
///
/// Provides fast membership queries with:
/// - No false negatives (inserted entries always return `true`)
/// - Tunable false positive rate
/// - Constant space usage
///
/// Entries are byte sequences; anything implementing `AsRef<[u8]>` can be inserted.
///
/// The methods on this type take no lock. See
/// [`SharedBloomFilter`](super::SharedBloomFilter) for the thread-safe variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// log2 of the bit length
    pub(super) capacity_exponent: u64,
    /// Bit length minus one
    pub(super) index_mask: u64,
    /// Number of probes per entry (k)
    pub(super) num_probes: u64,
    /// `64 - capacity_exponent`
    pub(super) hash_shift: u64,
    /// Incremented once per probe on every insert
    pub(super) num_inserted: u64,
    pub(super) bits: BitSet,
}

impl BloomFilter {
    /// Creates a filter from `(entries, probes_or_rate)`.
    ///
    /// When `probes_or_rate < 1.0` it is a false positive rate and `entries` is the expected
    /// number of entries. Otherwise it is the probe count and `entries` is the requested bit
    /// length. See [`Sizing::compute`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) when the
    /// parameters cannot be resolved to a size.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let filter = BloomFilter::new(1000.0, 0.01).unwrap();
    /// assert_eq!(filter.capacity(), 16_384);
    /// assert_eq!(filter.num_probes(), 7);
    ///
    /// assert!(BloomFilter::new(1000.0, 0.0).is_err());
    /// ```
    pub fn new(entries: f64, probes_or_rate: f64) -> Result<Self, Error> {
        Ok(Self::from_sizing(Sizing::compute(entries, probes_or_rate)?))
    }

    /// Returns a builder for creating a Bloom filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloomdedup::bloom::BloomFilter;
    /// use bloomdedup::bloom::BloomFilterBuilder;
    ///
    /// // By accuracy (recommended)
    /// let filter = BloomFilterBuilder::with_accuracy(1000, 0.01).build().unwrap();
    ///
    /// // By size (manual)
    /// let filter = BloomFilterBuilder::with_size(10_000, 7).build().unwrap();
    ///
    /// // Neither
    /// assert!(BloomFilter::builder().build().is_err());
    /// ```
    pub fn builder() -> BloomFilterBuilder {
        BloomFilterBuilder::default()
    }

    /// Creates an empty filter with the given dimensions.
    pub fn from_sizing(sizing: Sizing) -> Self {
        let capacity_exponent = sizing.capacity_exponent();
        BloomFilter {
            capacity_exponent,
            index_mask: sizing.num_bits() - 1,
            num_probes: sizing.num_probes(),
            hash_shift: 64 - capacity_exponent,
            num_inserted: 0,
            bits: BitSet::new(sizing.num_bits()),
        }
    }

    /// Rebuilds a filter from a raw bit set image and a probe count.
    ///
    /// `bytes` holds the words of the bit set, each in little-endian order, as returned by
    /// [`bitset_bytes()`](Self::bitset_bytes). The bit length is `bytes.len() * 8`. The insertion
    /// counter of the new filter is 0.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if the bit length is not a power of two between [`MIN_NUM_BITS`](super::MIN_NUM_BITS) and
    /// [`MAX_NUM_BITS`](super::MAX_NUM_BITS), or if `num_probes` is 0 or above
    /// [`MAX_NUM_PROBES`](super::MAX_NUM_PROBES).
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(1000.0, 0.01).unwrap();
    /// filter.insert("alpha");
    ///
    /// let copy = BloomFilter::from_bitset_bytes(&filter.bitset_bytes(), filter.num_probes()).unwrap();
    /// assert!(copy.contains("alpha"));
    /// assert_eq!(copy.num_inserted(), 0);
    /// ```
    pub fn from_bitset_bytes(bytes: &[u8], num_probes: u64) -> Result<Self, Error> {
        let num_bits = (bytes.len() as u64).saturating_mul(8);
        if !num_bits.is_power_of_two()
            || num_bits.trailing_zeros() < MIN_CAPACITY_EXPONENT as u32
            || num_bits.trailing_zeros() > MAX_CAPACITY_EXPONENT as u32
        {
            return Err(Error::deserial(
                "bit set length must be a power of two between 512 and 2^40 bits",
            )
            .with_context("num_bytes", bytes.len()));
        }
        if !(1..=MAX_NUM_PROBES).contains(&num_probes) {
            return Err(Error::deserial(format!(
                "num_probes must be between 1 and {MAX_NUM_PROBES}"
            ))
            .with_context("num_probes", num_probes));
        }

        let sizing = Sizing::for_size(num_bits, num_probes)?;
        let bits = BitSet::from_le_bytes(bytes).ok_or_else(|| {
            Error::deserial("bit set image is not a whole number of words")
                .with_context("num_bytes", bytes.len())
        })?;

        let mut filter = Self::from_sizing(sizing);
        filter.bits = bits;
        Ok(filter)
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Tests whether an entry is possibly in the set.
    ///
    /// Returns:
    /// - `true`: Entry was **possibly** inserted (or false positive)
    /// - `false`: Entry was **definitely not** inserted
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100.0, 0.01).unwrap();
    /// filter.insert("apple");
    ///
    /// assert!(filter.contains("apple")); // true - was inserted
    /// assert!(!filter.contains("grape")); // false - never inserted (probably)
    /// ```
    pub fn contains(&self, entry: impl AsRef<[u8]>) -> bool {
        let (low, high) = self.spread_hash(entry.as_ref());
        self.check_bits(low, high)
    }

    // ========================================================================
    // Update Operations
    // ========================================================================

    /// Inserts an entry into the filter.
    ///
    /// After insertion, `contains(entry)` will always return `true`. The insertion counter grows
    /// by [`num_probes()`](Self::num_probes), also for entries that were already present.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100.0, 0.01).unwrap();
    ///
    /// filter.insert("apple");
    /// filter.insert(b"raw bytes");
    /// filter.insert(vec![1u8, 2, 3]);
    ///
    /// assert!(filter.contains("apple"));
    /// assert_eq!(filter.num_inserted(), 3 * filter.num_probes());
    /// ```
    pub fn insert(&mut self, entry: impl AsRef<[u8]>) {
        let (low, high) = self.spread_hash(entry.as_ref());
        self.set_bits(low, high);
    }

    /// Inserts an entry only if it is not already (possibly) present.
    ///
    /// Returns `true` if the entry was inserted, `false` if it was reported present, in which case
    /// the filter is left untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100.0, 0.01).unwrap();
    ///
    /// assert!(filter.insert_if_absent("apple"));
    /// assert!(!filter.insert_if_absent("apple"));
    /// ```
    pub fn insert_if_absent(&mut self, entry: impl AsRef<[u8]>) -> bool {
        let (low, high) = self.spread_hash(entry.as_ref());
        if self.check_bits(low, high) {
            return false;
        }
        self.set_bits(low, high);
        true
    }

    /// Tests and inserts an entry in a single operation.
    ///
    /// Returns whether the entry was possibly already in the set before insertion. Unlike
    /// [`insert_if_absent()`](Self::insert_if_absent) the entry is always inserted, so the
    /// insertion counter grows on every call.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100.0, 0.01).unwrap();
    ///
    /// assert!(!filter.contains_and_insert("apple")); // First insertion
    /// assert!(filter.contains_and_insert("apple")); // Now it's in the set
    /// ```
    pub fn contains_and_insert(&mut self, entry: impl AsRef<[u8]>) -> bool {
        let (low, high) = self.spread_hash(entry.as_ref());
        let was_present = self.check_bits(low, high);
        self.set_bits(low, high);
        was_present
    }

    /// Clears all bits while preserving the sizing and the insertion counter.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100.0, 0.01).unwrap();
    /// filter.insert("apple");
    ///
    /// filter.clear();
    /// assert!(filter.is_empty());
    /// assert!(!filter.contains("apple"));
    /// assert_eq!(filter.num_inserted(), filter.num_probes());
    /// ```
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    // ========================================================================
    // Statistics and Properties
    // ========================================================================

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits.words().iter().all(|&word| word == 0)
    }

    /// Returns the number of bits set to 1.
    pub fn bits_used(&self) -> u64 {
        self.bits.count_ones()
    }

    /// Returns the total number of bits in the filter, always a power of two.
    pub fn capacity(&self) -> u64 {
        self.index_mask + 1
    }

    /// Returns `log2` of [`capacity()`](Self::capacity).
    pub fn capacity_exponent(&self) -> u64 {
        self.capacity_exponent
    }

    /// Returns the number of probes per entry.
    pub fn num_probes(&self) -> u64 {
        self.num_probes
    }

    /// Returns the insertion counter.
    ///
    /// The counter grows by [`num_probes()`](Self::num_probes) for every insert, duplicates
    /// included. It survives the binary layout but not the JSON one.
    pub fn num_inserted(&self) -> u64 {
        self.num_inserted
    }

    /// Returns the current load factor (fraction of bits set).
    pub fn load_factor(&self) -> f64 {
        self.bits_used() as f64 / self.capacity() as f64
    }

    /// Estimates the current false positive probability.
    ///
    /// Based on `(1 - e^(-k * load))^k`, assuming a uniform bit distribution.
    pub fn estimated_fpp(&self) -> f64 {
        let k = self.num_probes as f64;
        let load = self.load_factor();
        (1.0 - (-k * load).exp()).powf(k)
    }

    /// Returns the bit set as bytes, each `u64` word in little-endian order.
    pub fn bitset_bytes(&self) -> Vec<u8> {
        self.bits.to_le_bytes()
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    /// Splits one SipHash-2-4 value into the `(low, high)` pair used for double hashing.
    ///
    /// `high` is the top `capacity_exponent` bits, `low` the bits that survive the index mask.
    fn spread_hash(&self, entry: &[u8]) -> (u64, u64) {
        let mut hasher = SipHasher24::new_with_keys(SIP_KEY_0, SIP_KEY_1);
        hasher.write(entry);
        let hash = hasher.finish();
        (hash & self.index_mask, hash >> self.hash_shift)
    }

    /// Formula: `(high + i * low) & index_mask` (Kirsch-Mitzenmacher).
    fn probe_index(&self, low: u64, high: u64, i: u64) -> u64 {
        high.wrapping_add(i.wrapping_mul(low)) & self.index_mask
    }

    // No short circuit: every probe is read.
    fn check_bits(&self, low: u64, high: u64) -> bool {
        let mut present = true;
        for i in 0..self.num_probes {
            present &= self.bits.get(self.probe_index(low, high, i));
        }
        present
    }

    fn set_bits(&mut self, low: u64, high: u64) {
        for i in 0..self.num_probes {
            let index = self.probe_index(low, high, i);
            self.bits.set(index);
            self.num_inserted = self.num_inserted.wrapping_add(1);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
