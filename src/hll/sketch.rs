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

use std::fmt;
use std::hash::Hash;

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::hash::hash_value;
use crate::hll::LEGACY_MAX_RANK;
use crate::hll::LEGACY_NUM_REGISTERS;
use crate::hll::MAX_RANK;
use crate::hll::NATIVE_LAYOUT;
use crate::hll::NUM_REGISTERS;
use crate::hll::estimator;
use crate::hll::legacy::LegacyRegisters;
use crate::hll::serialization::StorageType;
use crate::hll::serialization::StorageVersion;
use crate::hll::serialization::TAG_SIZE;

/// A dense HyperLogLog sketch with [`NUM_REGISTERS`] one byte registers.
///
/// Every register holds a value in `[0, MAX_RANK]`. The register count is
/// fixed, so any two sketches can be merged.
///
/// # Examples
///
/// ```
/// use approx_distinct::hll::HllSketch;
///
/// let mut sketch = HllSketch::new();
/// for i in 0..1000 {
///     sketch.update(&i);
/// }
/// let estimate = sketch.count();
/// assert!(estimate > 900 && estimate < 1100);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct HllSketch {
    registers: [u8; NUM_REGISTERS],
}

impl Default for HllSketch {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HllSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_zero = self.registers.iter().filter(|&&r| r != 0).count();
        f.debug_struct("HllSketch")
            .field("num_registers", &NUM_REGISTERS)
            .field("non_zero_registers", &non_zero)
            .field("estimate", &self.count())
            .finish()
    }
}

impl HllSketch {
    /// Creates an empty sketch.
    pub fn new() -> Self {
        Self {
            registers: [0; NUM_REGISTERS],
        }
    }

    /// Hashes `value` with [`hash_value`] and inserts the hash.
    pub fn update<H: Hash + ?Sized>(&mut self, value: &H) {
        self.insert_hash(hash_value(value));
    }

    /// Inserts a 64-bit hash.
    ///
    /// The top [`PRECISION`](super::PRECISION) bits select the register, the
    /// position of the first set bit among the others is its candidate value.
    /// Inserting the same hash again never changes the sketch.
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) {
        let (bucket, rank) = NATIVE_LAYOUT.bucket_and_rank(hash);
        self.update_register(bucket, rank);
    }

    /// Raises register `bucket` to `rank` if it is lower.
    ///
    /// `rank` is capped at [`MAX_RANK`].
    ///
    /// # Panics
    ///
    /// Panics if `bucket >= NUM_REGISTERS`.
    #[inline]
    pub fn update_register(&mut self, bucket: usize, rank: u8) {
        let register = &mut self.registers[bucket];
        *register = (*register).max(rank.min(MAX_RANK));
    }

    /// Returns the value of register `bucket`.
    ///
    /// # Panics
    ///
    /// Panics if `bucket >= NUM_REGISTERS`.
    pub fn register(&self, bucket: usize) -> u8 {
        self.registers[bucket]
    }

    /// Returns all registers, indexed by bucket.
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Returns true if nothing was inserted.
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    /// Merges `other` into this sketch, keeping the maximum of every register.
    ///
    /// The result estimates the cardinality of the union of both inputs.
    pub fn merge(&mut self, other: &HllSketch) {
        for (register, &rank) in self.registers.iter_mut().zip(other.registers.iter()) {
            *register = (*register).max(rank);
        }
    }

    /// Returns the estimated number of distinct hashes inserted.
    pub fn count(&self) -> u64 {
        estimator::estimate(&self.registers, NATIVE_LAYOUT)
    }
}

impl HllSketch {
    /// Serializes the sketch for the current storage version.
    pub fn serialize_native(&self) -> Vec<u8> {
        self.serialize(StorageVersion::CURRENT)
    }

    /// Serializes the sketch in the layout readable by `version`.
    ///
    /// Versions without native register support get the legacy layout, which
    /// approximates this sketch (see [`StorageType::Legacy`]).
    pub fn serialize(&self, version: StorageVersion) -> Vec<u8> {
        match version.storage_type() {
            StorageType::Native => {
                let mut bytes = SketchBytes::with_capacity(TAG_SIZE + NUM_REGISTERS);
                bytes.write_u8(StorageType::Native.tag());
                bytes.write(&self.registers);
                bytes.into_bytes()
            }
            StorageType::Legacy => {
                let legacy = LegacyRegisters::from_sketch(self);
                let mut bytes = SketchBytes::with_capacity(TAG_SIZE + LEGACY_NUM_REGISTERS);
                bytes.write_u8(StorageType::Legacy.tag());
                bytes.write(legacy.as_bytes());
                bytes.into_bytes()
            }
        }
    }

    /// Deserializes a sketch written in either storage layout.
    ///
    /// Legacy payloads are folded into the current register count.
    pub fn deserialize(bytes: &[u8]) -> Result<HllSketch, Error> {
        let mut cursor = SketchSlice::new(bytes);
        let tag = cursor
            .read_u8()
            .map_err(|e| Error::insufficient_data("storage_type", e))?;

        match StorageType::try_from(tag)? {
            StorageType::Native => {
                let mut registers = [0u8; NUM_REGISTERS];
                cursor
                    .read_exact(&mut registers)
                    .map_err(|e| Error::insufficient_data("registers", e))?;
                ensure_fully_consumed(&cursor, bytes.len())?;
                ensure_ranks_at_most(&registers, MAX_RANK)?;
                Ok(HllSketch { registers })
            }
            StorageType::Legacy => {
                let mut legacy = LegacyRegisters::new();
                cursor
                    .read_exact(legacy.as_bytes_mut())
                    .map_err(|e| Error::insufficient_data("legacy_registers", e))?;
                ensure_fully_consumed(&cursor, bytes.len())?;
                ensure_ranks_at_most(legacy.as_bytes(), LEGACY_MAX_RANK)?;
                legacy.to_sketch()
            }
        }
    }
}

fn ensure_fully_consumed(cursor: &SketchSlice<'_>, len: usize) -> Result<(), Error> {
    match cursor.remaining() {
        0 => Ok(()),
        remaining => Err(Error::trailing_bytes(len - remaining, len)),
    }
}

fn ensure_ranks_at_most(registers: &[u8], max_rank: u8) -> Result<(), Error> {
    match registers.iter().position(|&r| r > max_rank) {
        None => Ok(()),
        Some(bucket) => Err(Error::rank_out_of_range(
            bucket,
            registers[bucket],
            max_rank,
        )),
    }
}
