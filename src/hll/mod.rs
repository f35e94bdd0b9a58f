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

//! HyperLogLog sketch for approximate distinct counting.
//!
//! # Overview
//!
//! A [`HllSketch`] keeps one small counter (register) per bucket. Each 64-bit
//! hash selects a bucket with its top [`PRECISION`] bits and contributes the
//! position of the first set bit in the remaining bits (its rank). A register
//! holds the largest rank seen for its bucket, so inserting is idempotent and
//! two sketches union by taking the register-wise maximum.
//!
//! The cardinality is estimated from the histogram of register values using
//! the bias-corrected harmonic mean with the `sigma`/`tau` corrections of
//! Otmar Ertl, "New cardinality estimation algorithms for HyperLogLog
//! sketches" (arXiv:1702.01284).
//!
//! # Storage
//!
//! Sketches are persisted as a one byte storage tag followed by the raw
//! registers. Older storage versions used a larger register array
//! ([`LEGACY_NUM_REGISTERS`] registers). Such payloads are still readable:
//! they are folded into the current layout on read, and sketches can be
//! expanded back into the legacy layout when writing for an older storage
//! version. Both conversions are lossy.

mod estimator;
mod legacy;
mod serialization;
mod sketch;

pub use serialization::StorageType;
pub use serialization::StorageVersion;
pub use sketch::HllSketch;

/// Number of bits of the hash selecting the bucket.
pub const PRECISION: u8 = 12;
/// Number of registers of a sketch.
pub const NUM_REGISTERS: usize = NATIVE_LAYOUT.num_registers();
/// Largest value a register can hold.
pub const MAX_RANK: u8 = NATIVE_LAYOUT.max_rank();

/// Bucket bits of the legacy storage layout.
pub const LEGACY_PRECISION: u8 = 14;
/// Number of registers of the legacy storage layout.
pub const LEGACY_NUM_REGISTERS: usize = LEGACY_LAYOUT.num_registers();
/// Largest register value representable in the legacy storage layout.
///
/// Legacy registers are 6 bits wide. Hashes only produce ranks up to
/// `64 - LEGACY_PRECISION + 1`, but the register bound is at least
/// [`MAX_RANK`], so expanding a sketch never truncates a register.
pub const LEGACY_MAX_RANK: u8 = 63;

/// Asymptotic bias correction, `1 / (2 ln 2)`.
const ALPHA: f64 = 0.721_347_520_444_481_7;

/// Two estimates agree if the larger is less than this factor of the smaller.
const ACCEPTABLE_Q_ERROR: f64 = 2.0;

const NATIVE_LAYOUT: RegisterLayout = RegisterLayout::new(PRECISION);
const LEGACY_LAYOUT: RegisterLayout = RegisterLayout::new(LEGACY_PRECISION);

/// Shape of a dense register array, derived from its precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RegisterLayout {
    precision: u8,
}

impl RegisterLayout {
    const fn new(precision: u8) -> Self {
        assert!(precision >= 4 && precision <= 18, "precision must be in [4, 18]");
        Self { precision }
    }

    const fn num_registers(&self) -> usize {
        1 << self.precision
    }

    /// Number of hash bits left for the rank.
    const fn q(&self) -> usize {
        64 - self.precision as usize
    }

    const fn max_rank(&self) -> u8 {
        self.q() as u8 + 1
    }

    /// Split a hash into its bucket and rank.
    ///
    /// The rank is the number of leading zeros of the non-bucket bits plus
    /// one. A sentinel bit right below them caps it at `q + 1`.
    #[inline]
    fn bucket_and_rank(&self, hash: u64) -> (usize, u8) {
        let bucket = (hash >> self.q()) as usize;
        let rest = (hash << self.precision) | (1 << (self.precision - 1));
        let rank = rest.leading_zeros() as u8 + 1;
        (bucket, rank)
    }
}

/// Whether two cardinality estimates are close enough to be considered the
/// same, i.e. `max(a, b) / min(a, b) < 2`.
fn is_within_acceptable_range(a: u64, b: u64) -> bool {
    let (a, b) = (a as f64, b as f64);
    a.max(b) / a.min(b) < ACCEPTABLE_Q_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(NUM_REGISTERS, 4096);
        assert_eq!(MAX_RANK, 53);
        assert_eq!(LEGACY_NUM_REGISTERS, 16384);
        assert_eq!(LEGACY_MAX_RANK, 63);
        assert!(LEGACY_MAX_RANK >= MAX_RANK);
        assert_eq!(LEGACY_NUM_REGISTERS % NUM_REGISTERS, 0);
    }

    #[test]
    fn test_bucket_uses_top_bits() {
        let (bucket, _) = NATIVE_LAYOUT.bucket_and_rank(0xFFF0_0000_0000_0000);
        assert_eq!(bucket, 0xFFF);
        let (bucket, _) = NATIVE_LAYOUT.bucket_and_rank(0x0000_0000_0000_FFFF);
        assert_eq!(bucket, 0);
    }

    #[test]
    fn test_rank_bounds() {
        // first bit after the bucket bits set
        let (_, rank) = NATIVE_LAYOUT.bucket_and_rank(1 << 51);
        assert_eq!(rank, 1);
        let (_, rank) = NATIVE_LAYOUT.bucket_and_rank(1);
        assert_eq!(rank, 52);
        // all rank bits zero hits the sentinel
        let (bucket, rank) = NATIVE_LAYOUT.bucket_and_rank(0);
        assert_eq!(bucket, 0);
        assert_eq!(rank, MAX_RANK);
        let (_, rank) = LEGACY_LAYOUT.bucket_and_rank(0);
        assert_eq!(rank, LEGACY_LAYOUT.max_rank());
        assert_eq!(rank, 51);
    }

    #[test]
    fn test_acceptable_range() {
        assert!(is_within_acceptable_range(100, 100));
        assert!(is_within_acceptable_range(100, 199));
        assert!(is_within_acceptable_range(199, 100));
        assert!(!is_within_acceptable_range(100, 200));
        assert!(!is_within_acceptable_range(0, 1));
    }
}
