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

//! # bloomdedup
//!
//! A Bloom filter with power-of-two sizing, SipHash-based double hashing and two persisted
//! layouts: a JSON document carrying the raw bit set, and a fixed little-endian binary record
//! that also keeps the insertion counter.
//!
//! ```rust
//! use bloomdedup::bloom::BloomFilter;
//!
//! let mut filter = BloomFilter::new(1000.0, 0.01).unwrap();
//! filter.insert("alpha");
//! assert!(filter.contains("alpha"));
//!
//! let restored = BloomFilter::deserialize(&filter.serialize()).unwrap();
//! assert!(restored.contains("alpha"));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod bloom;
pub mod error;

mod codec;
