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

//! Binary and JSON layouts of a [`BloomFilter`].

use std::io;
use std::io::Read;
use std::io::Write;

use byteorder::ByteOrder;
use byteorder::LittleEndian;
use serde::Deserialize;
use serde::Serialize;
use serde_with::base64::Base64;
use serde_with::serde_as;

use super::BloomFilter;
use super::bitset::BitSet;
use super::builder::MAX_CAPACITY_EXPONENT;
use super::builder::MAX_NUM_PROBES;
use super::builder::MIN_CAPACITY_EXPONENT;
use crate::codec::SketchReader;
use crate::codec::SketchWriter;
use crate::error::Error;
use crate::error::ErrorKind;

/// Six `u64` header fields precede the words.
const HEADER_BYTES: usize = 6 * 8;

/// JSON image of a filter: the raw bit set and the probe count.
#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonImage {
    #[serde_as(as = "Base64")]
    filter_set: Vec<u8>,
    set_locs: u64,
}

impl BloomFilter {
    // ========================================================================
    // Binary layout
    // ========================================================================

    /// Writes the filter to `w` in the binary layout.
    ///
    /// Layout, every field a little-endian `u64`:
    ///
    /// ```text
    /// capacity_exponent | index_mask | num_probes | hash_shift | num_inserted | word_count
    /// word[0] | word[1] | ... | word[word_count - 1]
    /// ```
    ///
    /// There is no version tag, padding, or checksum. Output is written field by field, so pass a
    /// buffered writer for file or socket sinks.
    ///
    /// # Errors
    ///
    /// Returns the sink's error unchanged.
    pub fn write_to<W: Write>(&self, w: W) -> io::Result<()> {
        let mut writer = SketchWriter::new(w);
        for field in self.header() {
            writer.write_u64_le(field)?;
        }
        writer.write_u64_slice_le(self.bits.words())
    }

    fn header(&self) -> [u64; 6] {
        [
            self.capacity_exponent,
            self.index_mask,
            self.num_probes,
            self.hash_shift,
            self.num_inserted,
            self.bits.num_words() as u64,
        ]
    }

    /// Reads a filter in the binary layout written by [`write_to()`](Self::write_to).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`] if the source ends early (the error names
    /// the field being read and carries the I/O error as its source), or if the header does not
    /// describe a valid filter.
    pub fn read_from<R: Read>(r: R) -> Result<Self, Error> {
        let mut reader = SketchReader::new(r);
        let capacity_exponent = reader.read_u64_le("capacity_exponent")?;
        let index_mask = reader.read_u64_le("index_mask")?;
        let num_probes = reader.read_u64_le("num_probes")?;
        let hash_shift = reader.read_u64_le("hash_shift")?;
        let num_inserted = reader.read_u64_le("num_inserted")?;
        let word_count = reader.read_u64_le("word_count")?;

        if !(MIN_CAPACITY_EXPONENT..=MAX_CAPACITY_EXPONENT).contains(&capacity_exponent) {
            return Err(Error::deserial(format!(
                "capacity exponent out of range: {capacity_exponent}"
            )));
        }
        let num_bits = 1u64 << capacity_exponent;
        if index_mask != num_bits - 1 {
            return Err(Error::deserial(format!(
                "index mask {index_mask:#x} does not match capacity exponent {capacity_exponent}"
            )));
        }
        if hash_shift != 64 - capacity_exponent {
            return Err(Error::deserial(format!(
                "hash shift {hash_shift} does not match capacity exponent {capacity_exponent}"
            )));
        }
        if word_count != num_bits / 64 {
            return Err(Error::deserial(format!(
                "word count {word_count} does not match capacity exponent {capacity_exponent}"
            )));
        }
        if !(1..=MAX_NUM_PROBES).contains(&num_probes) {
            return Err(Error::deserial(format!(
                "num_probes must be between 1 and {MAX_NUM_PROBES}"
            ))
            .with_context("num_probes", num_probes));
        }

        let words = reader.read_u64_vec_le(word_count as usize, "words")?;

        log::debug!(
            "decoded binary bloom filter: 2^{capacity_exponent} bits, {num_probes} probes, {num_inserted} inserted"
        );
        Ok(BloomFilter {
            capacity_exponent,
            index_mask,
            num_probes,
            hash_shift,
            num_inserted,
            bits: BitSet::from_words(words),
        })
    }

    /// Serializes the filter to a byte vector in the binary layout.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100.0, 0.01).unwrap();
    /// filter.insert("test");
    ///
    /// let bytes = filter.serialize();
    /// assert_eq!(bytes.len(), 48 + 1024 / 8);
    ///
    /// let restored = BloomFilter::deserialize(&bytes).unwrap();
    /// assert_eq!(filter, restored);
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_BYTES + self.bits.num_words() * 8];
        let (header, words) = bytes.split_at_mut(HEADER_BYTES);
        LittleEndian::write_u64_into(&self.header(), header);
        LittleEndian::write_u64_into(self.bits.words(), words);
        bytes
    }

    /// Deserializes a filter from bytes in the binary layout.
    ///
    /// Bytes after the last word are ignored.
    ///
    /// # Errors
    ///
    /// See [`read_from()`](Self::read_from).
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::read_from(bytes)
    }

    // ========================================================================
    // JSON layout
    // ========================================================================

    /// Encodes the bit set and probe count as a JSON object.
    ///
    /// The object has two fields, `FilterSet` (the little-endian bit set image, base64) and
    /// `SetLocs` (the probe count). The insertion counter is not part of it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::SerializeFailed`] if the JSON encoder fails.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomdedup::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100.0, 0.01).unwrap();
    /// filter.insert("test");
    ///
    /// let json = filter.to_json().unwrap();
    /// let restored = BloomFilter::from_json(&json).unwrap();
    /// assert!(restored.contains("test"));
    /// assert_eq!(restored.num_inserted(), 0);
    /// ```
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        let image = JsonImage {
            filter_set: self.bitset_bytes(),
            set_locs: self.num_probes,
        };
        serde_json::to_vec(&image).map_err(|err| {
            Error::new(ErrorKind::SerializeFailed, "failed to encode filter as JSON")
                .set_source(err)
        })
    }

    /// Decodes a filter from the JSON object produced by [`to_json()`](Self::to_json).
    ///
    /// The bit length is taken from the size of `FilterSet`; the insertion counter starts at 0.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`] if the input is not such an object, a field
    /// is missing, or the bit set does not describe a valid filter (see
    /// [`from_bitset_bytes()`](Self::from_bitset_bytes)).
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let image: JsonImage = serde_json::from_slice(bytes).map_err(|err| {
            Error::deserial("malformed JSON filter image").set_source(err)
        })?;
        let filter = Self::from_bitset_bytes(&image.filter_set, image.set_locs)?;
        log::debug!(
            "decoded JSON bloom filter: 2^{} bits, {} probes",
            filter.capacity_exponent,
            filter.num_probes
        );
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_filter() -> BloomFilter {
        let mut filter = BloomFilter::new(1000.0, 0.01).unwrap();
        for i in 0..100 {
            filter.insert(format!("entry-{i}"));
        }
        filter
    }

    #[test]
    fn test_binary_header_layout() {
        let filter = BloomFilter::new(512.0, 3.0).unwrap();
        let bytes = filter.serialize();
        assert_eq!(bytes.len(), HEADER_BYTES + 64);

        let header: Vec<u64> = bytes[..HEADER_BYTES]
            .chunks_exact(8)
            .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(header, vec![9, 511, 3, 55, 0, 8]);
        assert!(bytes[HEADER_BYTES..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_binary_words_are_little_endian() {
        let mut filter = BloomFilter::new(512.0, 1.0).unwrap();
        filter.bits.set(0);
        filter.bits.set(9);
        let bytes = filter.serialize();
        assert_eq!(&bytes[HEADER_BYTES..HEADER_BYTES + 2], &[0x01, 0x02]);
    }

    #[test]
    fn test_binary_roundtrip_keeps_counter() {
        let filter = sample_filter();
        let restored = BloomFilter::deserialize(&filter.serialize()).unwrap();
        assert_eq!(restored, filter);
        assert_eq!(restored.num_inserted(), 100 * filter.num_probes());
    }

    #[test]
    fn test_binary_truncation_at_every_field() {
        let bytes = sample_filter().serialize();
        let expected = [
            (0, "capacity_exponent"),
            (8, "index_mask"),
            (16, "num_probes"),
            (24, "hash_shift"),
            (32, "num_inserted"),
            (40, "word_count"),
            (47, "word_count"),
            (48, "words"),
            (bytes.len() - 1, "words"),
        ];
        for (len, field) in expected {
            let err = BloomFilter::deserialize(&bytes[..len]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
            assert!(
                err.message().contains(field),
                "len {len}: expected {field} in {:?}",
                err.message()
            );
        }
    }

    #[test]
    fn test_binary_rejects_inconsistent_header() {
        let bytes = sample_filter().serialize();
        for (offset, value) in [(0usize, 3u64), (0, 63), (8, 7), (16, 0), (24, 1), (40, 1 << 40)] {
            let mut corrupt = bytes.clone();
            corrupt[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
            let err = BloomFilter::deserialize(&corrupt).unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::MalformedDeserializeData,
                "offset {offset}"
            );
        }
    }

    #[test]
    fn test_binary_largest_header_without_words_fails() {
        let header = [40u64, (1 << 40) - 1, 3, 24, 0, 1 << 34];
        let bytes: Vec<u8> = header.iter().flat_map(|v| v.to_le_bytes()).collect();
        let err = BloomFilter::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
        assert!(err.message().contains("words"), "{:?}", err.message());
    }

    #[test]
    fn test_binary_rejects_excessive_probe_count() {
        let bytes = sample_filter().serialize();
        for value in [MAX_NUM_PROBES + 1, 1 << 62, u64::MAX] {
            let mut corrupt = bytes.clone();
            corrupt[16..24].copy_from_slice(&value.to_le_bytes());
            let err = BloomFilter::deserialize(&corrupt).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
            assert!(err.message().contains("num_probes"));
        }
    }

    #[test]
    fn test_write_to_propagates_sink_error() {
        struct FullDevice;

        impl Write for FullDevice {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::StorageFull, "device full"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = sample_filter().write_to(FullDevice).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        assert_eq!(err.to_string(), "device full");
    }

    #[test]
    fn test_json_field_names() {
        let filter = BloomFilter::new(512.0, 4.0).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&filter.to_json().unwrap()).unwrap();
        assert_eq!(json["SetLocs"].as_u64(), Some(4));
        // 64 zero bytes in padded standard base64
        let expected = "A".repeat(86) + "==";
        assert_eq!(json["FilterSet"].as_str(), Some(expected.as_str()));
    }

    #[test]
    fn test_json_roundtrip_resets_counter() {
        let filter = sample_filter();
        let restored = BloomFilter::from_json(&filter.to_json().unwrap()).unwrap();
        assert_eq!(restored.bits, filter.bits);
        assert_eq!(restored.capacity_exponent(), filter.capacity_exponent());
        assert_eq!(restored.num_probes(), filter.num_probes());
        assert_eq!(restored.num_inserted(), 0);
    }

    #[test]
    fn test_json_rejects_excessive_probe_count() {
        let zeros = "A".repeat(86) + "==";
        for set_locs in [MAX_NUM_PROBES + 1, 1 << 62] {
            let input = format!(r#"{{"FilterSet": "{zeros}", "SetLocs": {set_locs}}}"#);
            let err = BloomFilter::from_json(input.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
        }

        let input = format!(r#"{{"FilterSet": "{zeros}", "SetLocs": {MAX_NUM_PROBES}}}"#);
        let filter = BloomFilter::from_json(input.as_bytes()).unwrap();
        assert_eq!(filter.num_probes(), MAX_NUM_PROBES);
    }

    #[test]
    fn test_json_rejects_malformed_input() {
        let cases: [&[u8]; 5] = [
            b"not json",
            br#"{"SetLocs": 3}"#,
            br#"{"FilterSet": "AAAA"}"#,
            br#"{"FilterSet": "%%%", "SetLocs": 3}"#,
            br#"{"FilterSet": "AAAAAAAAAAA=", "SetLocs": 3}"#,
        ];
        for input in cases {
            let err = BloomFilter::from_json(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
        }
    }
}
