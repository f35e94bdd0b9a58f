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

//! `approx_count_distinct` as seen by a vectorized aggregate executor.
//!
//! The executor owns one state per group or partition. It feeds batches of
//! pre-computed hashes with [`AggregateFunction::update`], reduces partition
//! states with [`AggregateFunction::combine`] and reads the result with
//! [`AggregateFunction::finalize`].

use crate::hll::HllSketch;

/// A batch of 64-bit hashes, one per input row.
#[derive(Debug, Clone, Copy)]
pub enum HashVector<'a> {
    /// One hash per row. Rows whose validity entry is `false` are null.
    /// `None` validity means every row is valid.
    Flat {
        hashes: &'a [u64],
        validity: Option<&'a [bool]>,
    },
    /// The same hash (or null) repeated for `count` rows.
    Constant { hash: Option<u64>, count: usize },
}

impl<'a> HashVector<'a> {
    /// A flat vector without nulls.
    pub fn flat(hashes: &'a [u64]) -> Self {
        HashVector::Flat {
            hashes,
            validity: None,
        }
    }

    /// A flat vector with a validity mask.
    ///
    /// # Panics
    ///
    /// Panics if `validity` and `hashes` differ in length.
    pub fn with_validity(hashes: &'a [u64], validity: &'a [bool]) -> Self {
        assert_eq!(
            hashes.len(),
            validity.len(),
            "validity mask must cover every hash"
        );
        HashVector::Flat {
            hashes,
            validity: Some(validity),
        }
    }

    pub fn constant(hash: Option<u64>, count: usize) -> Self {
        HashVector::Constant { hash, count }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            HashVector::Flat { hashes, .. } => hashes.len(),
            HashVector::Constant { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the non-null hashes, once per row.
    pub fn valid_hashes(&self) -> impl Iterator<Item = u64> + 'a {
        let (hashes, validity, repeated): (&'a [u64], Option<&'a [bool]>, _) = match *self {
            HashVector::Flat { hashes, validity } => (hashes, validity, None),
            HashVector::Constant { hash, count } => (&[], None, hash.map(|h| (h, count))),
        };
        let flat = hashes
            .iter()
            .enumerate()
            .filter(move |(i, _)| validity.is_none_or(|v| v[*i]))
            .map(|(_, &h)| h);
        let constant = repeated
            .into_iter()
            .flat_map(|(h, count)| std::iter::repeat_n(h, count));
        flat.chain(constant)
    }
}

/// Contract between an aggregate function and the executor driving it.
pub trait AggregateFunction {
    type State;
    type Output;

    /// Creates the state of an empty group.
    fn initialize(&self) -> Self::State;

    /// Accumulates a batch of rows into `state`.
    fn update(&self, state: &mut Self::State, input: &HashVector<'_>);

    /// Folds `source` into `target`. `source` is left untouched.
    fn combine(&self, source: &Self::State, target: &mut Self::State);

    /// Produces the aggregate result of `state`.
    fn finalize(&self, state: &Self::State) -> Self::Output;

    /// Releases resources held by `state` before it is dropped.
    fn destroy(&self, _state: &mut Self::State) {}
}

/// Approximate `COUNT(DISTINCT x)` backed by a [`HllSketch`].
///
/// The state is a fixed register array, so [`AggregateFunction::destroy`] is
/// a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproxCountDistinct;

impl AggregateFunction for ApproxCountDistinct {
    type State = HllSketch;
    type Output = u64;

    fn initialize(&self) -> HllSketch {
        HllSketch::new()
    }

    fn update(&self, state: &mut HllSketch, input: &HashVector<'_>) {
        match *input {
            // inserting is idempotent, one insert covers the whole batch
            HashVector::Constant { hash, count } => {
                if let Some(hash) = hash.filter(|_| count > 0) {
                    state.insert_hash(hash);
                }
            }
            HashVector::Flat { .. } => {
                for hash in input.valid_hashes() {
                    state.insert_hash(hash);
                }
            }
        }
    }

    fn combine(&self, source: &HllSketch, target: &mut HllSketch) {
        target.merge(source);
    }

    fn finalize(&self, state: &HllSketch) -> u64 {
        state.count()
    }
}
