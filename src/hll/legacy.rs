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

//! Conversion between the current register array and the legacy one.
//!
//! The legacy layout has `mult = LEGACY_NUM_REGISTERS / NUM_REGISTERS` times
//! more registers. Legacy buckets are selected by more hash bits, so the
//! `mult` legacy registers `[i * mult, (i + 1) * mult)` all map onto the
//! current register `i`.
//!
//! Both directions are lossy. Folding (legacy to current) keeps the maximum
//! of each group. Legacy ranks are taken from fewer hash bits than current
//! ones, so the folded register only approximates the value a current sketch
//! would have held for the same input. Expanding (current to legacy) cannot
//! recover the individual legacy registers: the first register of every
//! group receives the current value and the others a shared fill value,
//! tuned by a short local search until the legacy estimate is within the
//! acceptable range of the current one.

use tracing::debug;
use tracing::warn;

use crate::error::Error;
use crate::hll::HllSketch;
use crate::hll::LEGACY_LAYOUT;
use crate::hll::LEGACY_MAX_RANK;
use crate::hll::LEGACY_NUM_REGISTERS;
use crate::hll::NUM_REGISTERS;
use crate::hll::estimator;
use crate::hll::is_within_acceptable_range;

/// Steps of the fill search, one round per step.
const FILL_SEARCH_STEPS: [u8; 4] = [4, 3, 2, 1];

/// Registers in the legacy layout.
///
/// Only lives for the duration of one serialize or deserialize call.
pub(super) struct LegacyRegisters {
    registers: Box<[u8]>,
}

impl LegacyRegisters {
    pub fn new() -> Self {
        Self {
            registers: vec![0u8; LEGACY_NUM_REGISTERS].into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.registers
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.registers
    }

    /// Estimate the cardinality with the legacy layout.
    pub fn count(&self) -> u64 {
        estimator::estimate(&self.registers, LEGACY_LAYOUT)
    }

    /// Fold the legacy registers into a new sketch.
    pub fn to_sketch(&self) -> Result<HllSketch, Error> {
        let mut sketch = HllSketch::new();
        fold_registers(&self.registers, &mut sketch)?;

        let legacy_count = self.count();
        let count = sketch.count();
        if legacy_count != count && !is_within_acceptable_range(count, legacy_count) {
            warn!(
                legacy_count,
                count, "upgraded HyperLogLog estimate diverges from the legacy estimate"
            );
        }
        Ok(sketch)
    }

    /// Expand a sketch into the legacy layout.
    pub fn from_sketch(sketch: &HllSketch) -> Self {
        let mut legacy = Self::new();
        let target = sketch.count();
        if target == 0 {
            return legacy;
        }

        let mult = LEGACY_NUM_REGISTERS / NUM_REGISTERS;
        let mut sum = 0usize;
        for (group, &rank) in legacy
            .registers
            .chunks_exact_mut(mult)
            .zip(sketch.registers())
        {
            let rank = rank.min(LEGACY_MAX_RANK);
            group[0] = rank;
            sum += rank as usize;
        }
        let avg = (sum / NUM_REGISTERS) as u8;

        let (fill, converged) = search_fill(avg, target, |fill| {
            legacy.fill_groups(sketch, fill);
            legacy.count()
        });
        if !converged {
            debug!(
                expected_count = target,
                fill,
                legacy_count = legacy.count(),
                "legacy fill search stopped without reaching the acceptable range"
            );
        }
        legacy
    }

    /// Set every register but the first of each group to `min(rank, fill)`.
    fn fill_groups(&mut self, sketch: &HllSketch, fill: u8) {
        let mult = self.registers.len() / NUM_REGISTERS;
        for (group, &rank) in self.registers.chunks_exact_mut(mult).zip(sketch.registers()) {
            let value = rank.min(LEGACY_MAX_RANK).min(fill);
            group[1..].fill(value);
        }
    }

    #[cfg(test)]
    pub fn insert_hash(&mut self, hash: u64) {
        let (bucket, rank) = LEGACY_LAYOUT.bucket_and_rank(hash);
        let register = &mut self.registers[bucket];
        *register = (*register).max(rank);
    }
}

/// Fold `legacy` into `sketch`, taking the maximum of every group of
/// `legacy.len() / NUM_REGISTERS` registers.
fn fold_registers(legacy: &[u8], sketch: &mut HllSketch) -> Result<(), Error> {
    if legacy.is_empty() || legacy.len() % NUM_REGISTERS != 0 {
        return Err(Error::incompatible_layout(legacy.len(), NUM_REGISTERS));
    }

    let mult = legacy.len() / NUM_REGISTERS;
    for (bucket, group) in legacy.chunks_exact(mult).enumerate() {
        let max = group.iter().copied().max().unwrap_or(0);
        sketch.update_register(bucket, max);
    }
    Ok(())
}

/// Search a fill value whose estimate, as computed by `apply`, is within the
/// acceptable range of `target`.
///
/// `apply` writes a fill value and returns the resulting estimate. One round
/// is run per step of [`FILL_SEARCH_STEPS`]: an overshoot lowers the fill by
/// the step, an undershoot raises it. The fill saturates at `0` and at
/// [`LEGACY_MAX_RANK`].
///
/// Returns the last fill passed to `apply` and whether it converged.
fn search_fill(initial: u8, target: u64, mut apply: impl FnMut(u8) -> u64) -> (u8, bool) {
    let mut fill = initial.min(LEGACY_MAX_RANK);
    for (round, step) in FILL_SEARCH_STEPS.into_iter().enumerate() {
        let estimate = apply(fill);
        if is_within_acceptable_range(target, estimate) {
            return (fill, true);
        }
        if round + 1 == FILL_SEARCH_STEPS.len() {
            break;
        }
        fill = if estimate > target {
            fill.saturating_sub(step)
        } else {
            fill.saturating_add(step).min(LEGACY_MAX_RANK)
        };
    }
    (fill, false)
}
