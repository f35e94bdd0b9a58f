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

use approx_distinct::error::ErrorKind;
use approx_distinct::hash::hash_value;
use approx_distinct::hll::HllSketch;
use approx_distinct::hll::LEGACY_MAX_RANK;
use approx_distinct::hll::LEGACY_NUM_REGISTERS;
use approx_distinct::hll::MAX_RANK;
use approx_distinct::hll::NUM_REGISTERS;
use approx_distinct::hll::StorageType;
use approx_distinct::hll::StorageVersion;
use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;

const LEGACY_VERSION: StorageVersion = StorageVersion::new(2);

fn sketch_of(n: u64) -> HllSketch {
    let mut sketch = HllSketch::new();
    for i in 0..n {
        sketch.insert_hash(hash_value(&i));
    }
    sketch
}

fn assert_within_acceptable_range(a: u64, b: u64) {
    let (a, b) = (a as f64, b as f64);
    assert!(a.max(b) / a.min(b) < 2.0, "{a} and {b} differ too much");
}

#[test]
fn test_native_round_trip_is_exact() {
    for n in [0, 1, 100, 10_000, 200_000] {
        let sketch = sketch_of(n);
        let bytes = sketch.serialize_native();
        assert_that!(bytes.len(), eq(1 + NUM_REGISTERS));
        assert_that!(bytes[0], eq(StorageType::Native.tag()));

        let restored = HllSketch::deserialize(&bytes).unwrap();
        assert_eq!(restored.registers(), sketch.registers());
        assert_eq!(restored.serialize_native(), bytes);
    }
}

#[test]
fn test_legacy_round_trip_stays_in_range() {
    for n in [1, 10, 1_000, 50_000, 300_000] {
        let sketch = sketch_of(n);
        let bytes = sketch.serialize(LEGACY_VERSION);
        assert_that!(bytes.len(), eq(1 + LEGACY_NUM_REGISTERS));
        assert_that!(bytes[0], eq(StorageType::Legacy.tag()));

        let restored = HllSketch::deserialize(&bytes).unwrap();
        assert_within_acceptable_range(restored.count(), sketch.count());
        // registers below the legacy maximum survive the expansion
        assert_eq!(restored, sketch);
    }
}

#[test]
fn test_legacy_round_trip_of_empty_sketch() {
    let bytes = HllSketch::new().serialize(LEGACY_VERSION);
    assert!(bytes[1..].iter().all(|&r| r == 0));

    let restored = HllSketch::deserialize(&bytes).unwrap();
    assert!(restored.is_empty());
    assert_that!(restored.count(), eq(0u64));
}

#[test]
fn test_legacy_round_trip_keeps_saturated_registers() {
    let mut sketch = sketch_of(1_000);
    sketch.insert_hash(0);
    sketch.insert_hash(u64::MAX << 52);
    assert_eq!(sketch.register(0), MAX_RANK);
    assert_eq!(sketch.register(NUM_REGISTERS - 1), MAX_RANK);

    let bytes = sketch.serialize(LEGACY_VERSION);
    let restored = HllSketch::deserialize(&bytes).unwrap();
    assert_eq!(restored.register(0), MAX_RANK);
    assert_eq!(restored.register(NUM_REGISTERS - 1), MAX_RANK);
    assert_eq!(restored, sketch);
}

#[test]
fn test_deserialize_legacy_payload_with_wide_registers() {
    let mut bytes = vec![0u8; 1 + LEGACY_NUM_REGISTERS];
    bytes[0] = StorageType::Legacy.tag();
    bytes[1] = LEGACY_MAX_RANK;
    bytes[2] = MAX_RANK + 1;

    let sketch = HllSketch::deserialize(&bytes).unwrap();
    assert_eq!(sketch.register(0), MAX_RANK);
}

#[test]
fn test_storage_version_selects_layout() {
    let sketch = sketch_of(100);
    assert_eq!(
        sketch.serialize(StorageVersion::new(1))[0],
        StorageType::Legacy.tag()
    );
    assert_eq!(
        sketch.serialize(StorageVersion::NATIVE_REGISTERS)[0],
        StorageType::Native.tag()
    );
    assert_eq!(
        sketch.serialize(StorageVersion::new(10))[0],
        StorageType::Native.tag()
    );
}

#[test]
fn test_deserialize_legacy_payload() {
    let mult = LEGACY_NUM_REGISTERS / NUM_REGISTERS;
    let mut bytes = vec![0u8; 1 + LEGACY_NUM_REGISTERS];
    bytes[0] = StorageType::Legacy.tag();
    bytes[1 + 7 * mult] = 2;
    bytes[1 + 7 * mult + mult - 1] = 6;
    bytes[1 + 100 * mult + 1] = 3;

    let sketch = HllSketch::deserialize(&bytes).unwrap();
    assert_eq!(sketch.register(7), 6);
    assert_eq!(sketch.register(100), 3);
    assert_eq!(
        sketch.registers().iter().filter(|&&r| r != 0).count(),
        2
    );
}

#[test]
fn test_deserialize_unknown_tag() {
    for tag in [0u8, 3, 42, u8::MAX] {
        let mut bytes = vec![0u8; 1 + NUM_REGISTERS];
        bytes[0] = tag;
        let err = HllSketch::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptInput);
        assert_that!(
            err.message(),
            contains_substring("unknown HyperLogLog storage type")
        );
    }
}

#[test]
fn test_deserialize_empty_input() {
    let err = HllSketch::deserialize(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_that!(err.message(), contains_substring("storage_type"));
}

#[test]
fn test_deserialize_truncated_payload() {
    let bytes = sketch_of(1_000).serialize_native();
    let err = HllSketch::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_that!(err.message(), contains_substring("insufficient data"));

    let bytes = sketch_of(1_000).serialize(LEGACY_VERSION);
    let err = HllSketch::deserialize(&bytes[..NUM_REGISTERS + 1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_that!(err.message(), contains_substring("legacy_registers"));
}

#[test]
fn test_deserialize_trailing_bytes() {
    let mut bytes = sketch_of(1_000).serialize_native();
    bytes.push(0);
    let err = HllSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_that!(err.message(), contains_substring("trailing bytes"));
}

#[test]
fn test_deserialize_legacy_rank_out_of_range() {
    let mut bytes = vec![0u8; 1 + LEGACY_NUM_REGISTERS];
    bytes[0] = StorageType::Legacy.tag();
    bytes[5] = LEGACY_MAX_RANK + 1;
    let err = HllSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_that!(err.to_string(), contains_substring("bucket: 4"));
}
