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

//! Bloom filter implementation for probabilistic set membership testing.
//!
//! A Bloom filter answers "possibly in set" or "definitely not in set". False positives are
//! possible, false negatives are not.
//!
//! # Properties
//!
//! - **Power-of-two size**: the bit set always holds `2^n >= 512` bits, so a probe position is
//!   folded into range with a mask instead of a division
//! - **Fixed size**: a filter never resizes; build a new one and re-insert to grow
//! - **No removal**: bits are only ever set, or cleared all at once with [`BloomFilter::clear`]
//!
//! # Creating Filters
//!
//! [`BloomFilter::new`] takes two numbers and picks the calling convention from the second one:
//!
//! - `new(expected_entries, false_positive_rate)` when the second value is below `1.0`; the bit
//!   length and probe count are derived from the optimal Bloom filter formulas
//! - `new(num_bits, num_probes)` when the second value is `1.0` or larger; the first value is
//!   then a bit length, not an entry count
//!
//! ```rust
//! use bloomdedup::bloom::BloomFilter;
//!
//! // 1% false positives for 10,000 entries
//! let by_rate = BloomFilter::new(10_000.0, 0.01).unwrap();
//! assert_eq!(by_rate.capacity(), 131_072);
//! assert_eq!(by_rate.num_probes(), 7);
//!
//! // 4096 bits, 3 probes per entry
//! let by_size = BloomFilter::new(4096.0, 3.0).unwrap();
//! assert_eq!(by_size.capacity(), 4096);
//! assert_eq!(by_size.num_probes(), 3);
//! ```
//!
//! [`BloomFilterBuilder`] offers the same two conventions with typed arguments.
//!
//! # Concurrency
//!
//! [`BloomFilter`] methods take no lock. Wrap the filter in a [`SharedBloomFilter`] to get
//! locked counterparts that can be called from many threads.
//!
//! # Persistence
//!
//! - [`BloomFilter::to_json`] / [`BloomFilter::from_json`]: a JSON object with the raw bit set
//!   (`FilterSet`, base64) and the probe count (`SetLocs`). The insertion counter is not part of
//!   this layout and restarts at zero.
//! - [`BloomFilter::write_to`] / [`BloomFilter::read_from`]: six little-endian `u64` header
//!   fields followed by the bit set words. Every field survives the round trip.
//!
//! # Implementation Details
//!
//! - One SipHash-2-4 call per entry, split into two values for double hashing
//!   (Kirsch-Mitzenmacher)
//! - Bits packed in `u64` words, persisted little-endian on every platform
//!
//! # References
//!
//! - Bloom, Burton H. (1970). "Space/time trade-offs in hash coding with allowable errors"
//! - Kirsch and Mitzenmacher (2008). "Less Hashing, Same Performance: Building a Better Bloom
//!   Filter"

mod bitset;
mod builder;
mod serialization;
mod shared;
mod sketch;

pub use self::builder::BloomFilterBuilder;
pub use self::builder::MAX_NUM_BITS;
pub use self::builder::MAX_NUM_PROBES;
pub use self::builder::MIN_NUM_BITS;
pub use self::builder::Sizing;
pub use self::shared::SharedBloomFilter;
pub use self::sketch::BloomFilter;
