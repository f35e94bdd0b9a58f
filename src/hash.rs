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

//! Convenience hashing for callers that do not bring their own 64-bit hash.
//!
//! The sketch only consumes `u64` hashes; any well-distributed hash function
//! works. This one is MurmurHash3 x64 128, keeping the low half.

use std::hash::Hash;

/// Seed used by [`hash_value`].
pub const DEFAULT_SEED: u32 = 9001;

/// Hash any [`Hash`] value into the 64-bit input expected by
/// [`HllSketch::insert_hash`](crate::hll::HllSketch::insert_hash).
pub fn hash_value<H: Hash + ?Sized>(value: &H) -> u64 {
    hash_value_with_seed(value, DEFAULT_SEED)
}

/// Same as [`hash_value`] with an explicit seed.
pub fn hash_value_with_seed<H: Hash + ?Sized>(value: &H, seed: u32) -> u64 {
    let mut hasher = mur3::Hasher128::with_seed(seed);
    value.hash(&mut hasher);
    let (h1, _) = hasher.finish128();
    h1
}
