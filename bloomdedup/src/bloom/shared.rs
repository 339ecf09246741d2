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

use std::io;
use std::io::Write;
use std::ops::DerefMut;

use parking_lot::Mutex;

use super::BloomFilter;
use crate::error::Error;

/// A [`BloomFilter`] behind a mutex, for use from several threads.
///
/// Every method holds the lock for the whole operation, so
/// [`insert_if_absent()`](Self::insert_if_absent) and
/// [`contains_and_insert()`](Self::contains_and_insert) are atomic. The lock is released when the
/// method returns, on every path.
///
/// Share it with `Arc` or scoped threads:
///
/// ```
/// use bloomdedup::bloom::BloomFilter;
/// use bloomdedup::bloom::SharedBloomFilter;
///
/// let shared = SharedBloomFilter::new(BloomFilter::new(10_000.0, 0.01).unwrap());
/// std::thread::scope(|s| {
///     for t in 0..4 {
///         let shared = &shared;
///         s.spawn(move || {
///             for i in 0..100 {
///                 shared.insert(format!("{t}-{i}"));
///             }
///         });
///     }
/// });
/// assert!(shared.contains("3-99"));
/// ```
#[derive(Debug)]
pub struct SharedBloomFilter {
    inner: Mutex<BloomFilter>,
}

impl SharedBloomFilter {
    /// Takes ownership of `filter`.
    pub fn new(filter: BloomFilter) -> Self {
        Self {
            inner: Mutex::new(filter),
        }
    }

    /// Locked [`BloomFilter::insert`].
    pub fn insert(&self, entry: impl AsRef<[u8]>) {
        self.inner.lock().insert(entry)
    }

    /// Locked [`BloomFilter::contains`].
    pub fn contains(&self, entry: impl AsRef<[u8]>) -> bool {
        self.inner.lock().contains(entry)
    }

    /// Locked [`BloomFilter::insert_if_absent`]; the query and the insert form one critical
    /// section.
    pub fn insert_if_absent(&self, entry: impl AsRef<[u8]>) -> bool {
        self.inner.lock().insert_if_absent(entry)
    }

    /// Locked [`BloomFilter::contains_and_insert`].
    pub fn contains_and_insert(&self, entry: impl AsRef<[u8]>) -> bool {
        self.inner.lock().contains_and_insert(entry)
    }

    /// Locked [`BloomFilter::clear`].
    pub fn clear(&self) {
        self.inner.lock().clear()
    }

    /// Returns the insertion counter.
    pub fn num_inserted(&self) -> u64 {
        self.inner.lock().num_inserted()
    }

    /// Locks the filter for a sequence of unlocked operations. The lock is released when the
    /// returned guard is dropped.
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// # use bloomdedup::bloom::SharedBloomFilter;
    /// let shared = SharedBloomFilter::new(BloomFilter::new(1000.0, 0.01).unwrap());
    /// {
    ///     let mut filter = shared.lock();
    ///     filter.insert("a");
    ///     filter.insert("b");
    /// }
    /// assert!(shared.contains("b"));
    /// ```
    pub fn lock(&self) -> impl DerefMut<Target = BloomFilter> + '_ {
        self.inner.lock()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> BloomFilter {
        self.inner.lock().clone()
    }

    /// Locked [`BloomFilter::to_json`].
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        self.inner.lock().to_json()
    }

    /// Locked [`BloomFilter::write_to`]. The lock is held while the sink is written.
    pub fn write_to<W: Write>(&self, w: W) -> io::Result<()> {
        self.inner.lock().write_to(w)
    }

    /// Returns the filter, consuming the wrapper.
    pub fn into_inner(self) -> BloomFilter {
        self.inner.into_inner()
    }
}

impl From<BloomFilter> for SharedBloomFilter {
    fn from(filter: BloomFilter) -> Self {
        Self::new(filter)
    }
}
