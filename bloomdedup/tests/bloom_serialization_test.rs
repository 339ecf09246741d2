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

use std::io::Cursor;

use bloomdedup::bloom::BloomFilter;
use bloomdedup::bloom::MAX_NUM_PROBES;
use bloomdedup::error::ErrorKind;
use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;

fn filled(n: usize) -> (BloomFilter, Vec<String>) {
    let mut filter = BloomFilter::new(5_000.0, 0.01).unwrap();
    let entries: Vec<String> = (0..n).map(|i| format!("line {i}")).collect();
    for entry in &entries {
        filter.insert(entry);
    }
    (filter, entries)
}

#[test]
fn test_binary_roundtrip_through_stream() {
    let (filter, entries) = filled(2_000);

    let mut sink = Cursor::new(Vec::new());
    filter.write_to(&mut sink).unwrap();
    sink.set_position(0);
    let restored = BloomFilter::read_from(&mut sink).unwrap();

    assert_eq!(restored, filter);
    assert_that!(restored.num_inserted(), eq(filter.num_inserted()));
    for entry in &entries {
        assert!(restored.contains(entry));
    }
    for i in 0..2_000 {
        let probe = format!("absent {i}");
        assert_eq!(restored.contains(&probe), filter.contains(&probe));
    }
}

#[test]
fn test_binary_stream_can_hold_several_filters() {
    let (first, _) = filled(10);
    let mut second = BloomFilter::new(512.0, 2.0).unwrap();
    second.insert("second");

    let mut bytes = first.serialize();
    second.write_to(&mut bytes).unwrap();

    let mut source = bytes.as_slice();
    assert_eq!(BloomFilter::read_from(&mut source).unwrap(), first);
    assert_eq!(BloomFilter::read_from(&mut source).unwrap(), second);
    assert!(source.is_empty());
}

#[test]
fn test_binary_truncated_stream_fails() {
    let (filter, _) = filled(100);
    let bytes = filter.serialize();

    let err = BloomFilter::deserialize(&bytes[..bytes.len() - 8]).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    assert_that!(err.message(), contains_substring("words"));

    let err = BloomFilter::deserialize(&[]).unwrap_err();
    assert_that!(err.message(), contains_substring("capacity_exponent"));
}

#[test]
fn test_binary_header_declaring_huge_filter_without_words_fails() {
    let header = [40u64, (1 << 40) - 1, 3, 24, 0, 1 << 34];
    let bytes: Vec<u8> = header.iter().flat_map(|field| field.to_le_bytes()).collect();

    let err = BloomFilter::read_from(Cursor::new(bytes)).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    assert_that!(err.message(), contains_substring("words"));
}

#[test]
fn test_corrupt_probe_count_is_rejected_by_both_layouts() {
    let (filter, _) = filled(10);

    let mut bytes = filter.serialize();
    bytes[16..24].copy_from_slice(&(1u64 << 62).to_le_bytes());
    let err = BloomFilter::deserialize(&bytes).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    assert_that!(err.message(), contains_substring("num_probes"));

    let mut value: serde_json::Value = serde_json::from_slice(&filter.to_json().unwrap()).unwrap();
    value["SetLocs"] = serde_json::Value::from(MAX_NUM_PROBES + 1);
    let err = BloomFilter::from_json(&serde_json::to_vec(&value).unwrap()).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    assert_that!(err.message(), contains_substring("num_probes"));
}

#[test]
fn test_binary_snapshot_is_independent_of_later_inserts() {
    let (mut filter, _) = filled(10);
    let bytes = filter.serialize();
    filter.insert("late arrival");

    let restored = BloomFilter::deserialize(&bytes).unwrap();
    assert!(!restored.contains("late arrival"));
    assert!(restored.num_inserted() < filter.num_inserted());
}

#[test]
fn test_json_roundtrip() {
    let (filter, entries) = filled(2_000);

    let json = filter.to_json().unwrap();
    let restored = BloomFilter::from_json(&json).unwrap();

    assert_that!(restored.capacity(), eq(filter.capacity()));
    assert_that!(restored.num_probes(), eq(filter.num_probes()));
    assert_that!(restored.bits_used(), eq(filter.bits_used()));
    assert_that!(restored.num_inserted(), eq(0u64));
    for entry in &entries {
        assert!(restored.contains(entry));
    }
}

#[test]
fn test_json_is_an_object_with_two_fields() {
    let (filter, _) = filled(1);
    let json = String::from_utf8(filter.to_json().unwrap()).unwrap();
    assert_that!(json, contains_substring("\"FilterSet\":\""));
    assert_that!(json, contains_substring("\"SetLocs\":7"));
}

#[test]
fn test_json_accepts_any_field_order() {
    let (filter, _) = filled(50);
    let value: serde_json::Value = serde_json::from_slice(&filter.to_json().unwrap()).unwrap();
    let reordered = format!(
        r#"{{"SetLocs":{},"FilterSet":{}}}"#,
        value["SetLocs"], value["FilterSet"]
    );

    let restored = BloomFilter::from_json(reordered.as_bytes()).unwrap();
    assert_eq!(restored.serialize()[48..], filter.serialize()[48..]);
}

#[test]
fn test_bitset_bytes_roundtrip() {
    let (filter, entries) = filled(300);
    let restored =
        BloomFilter::from_bitset_bytes(&filter.bitset_bytes(), filter.num_probes()).unwrap();
    for entry in &entries {
        assert!(restored.contains(entry));
    }
}
