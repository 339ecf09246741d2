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

use byteorder::ByteOrder;
use byteorder::LittleEndian;

/// Bit array packed into `u64` words.
///
/// Indexes are not bounds checked beyond the slice access itself; callers mask them into range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Allocates a zeroed bit set holding `num_bits` bits (a multiple of 64).
    pub fn new(num_bits: u64) -> Self {
        Self {
            words: vec![0u64; (num_bits >> 6) as usize],
        }
    }

    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words }
    }

    /// Rebuilds a bit set from its little-endian byte image.
    ///
    /// Returns `None` if the length is not a whole number of words.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 8 != 0 {
            return None;
        }
        let mut words = vec![0u64; bytes.len() / 8];
        LittleEndian::read_u64_into(bytes, &mut words);
        Some(Self { words })
    }

    /// Returns the bit set as bytes, each word in little-endian order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.words.len() * 8];
        LittleEndian::write_u64_into(&self.words, &mut bytes);
        bytes
    }

    pub fn set(&mut self, index: u64) {
        self.words[(index >> 6) as usize] |= 1u64 << (index & 63);
    }

    pub fn get(&self, index: u64) -> bool {
        self.words[(index >> 6) as usize] & (1u64 << (index & 63)) != 0
    }

    /// Zeroes every word in place, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|word| word.count_ones() as u64).sum()
    }
}
