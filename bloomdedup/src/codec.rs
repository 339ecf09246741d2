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
use std::io::Read;
use std::io::Write;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

use crate::error::Error;

/// Upper bound on words read per step by [`SketchReader::read_u64_vec_le`].
const READ_CHUNK_WORDS: usize = 64 * 1024;

/// Writes fixed-width little-endian fields to a caller-provided sink.
///
/// Sink errors are handed back untouched.
pub(crate) struct SketchWriter<W> {
    inner: W,
}

impl<W: Write> SketchWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_u64_le(&mut self, n: u64) -> io::Result<()> {
        self.inner.write_u64::<LittleEndian>(n)
    }

    pub fn write_u64_slice_le(&mut self, words: &[u64]) -> io::Result<()> {
        for &word in words {
            self.write_u64_le(word)?;
        }
        Ok(())
    }
}

/// Reads fixed-width little-endian fields from a caller-provided source.
///
/// A short read is reported as [`Error::insufficient_data`] tagged with the field being read.
pub(crate) struct SketchReader<R> {
    inner: R,
}

impl<R: Read> SketchReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u64_le(&mut self, field: &'static str) -> Result<u64, Error> {
        self.inner
            .read_u64::<LittleEndian>()
            .map_err(|err| Error::insufficient_data(field).set_source(err))
    }

    /// Reads `len` words, growing the buffer as data arrives so that a short source fails before
    /// the full length is allocated.
    pub fn read_u64_vec_le(&mut self, len: usize, field: &'static str) -> Result<Vec<u64>, Error> {
        let mut words = Vec::with_capacity(len.min(READ_CHUNK_WORDS));
        while words.len() < len {
            let start = words.len();
            words.resize(start + (len - start).min(READ_CHUNK_WORDS), 0);
            self.inner
                .read_u64_into::<LittleEndian>(&mut words[start..])
                .map_err(|err| Error::insufficient_data(field).set_source(err))?;
        }
        Ok(words)
    }
}
