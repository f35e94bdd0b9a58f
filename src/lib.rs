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

//! Approximate distinct counting for aggregate functions.
//!
//! The crate provides a dense HyperLogLog sketch ([`hll::HllSketch`]) that
//! consumes 64-bit hashes, merges by register-wise maximum and estimates
//! cardinality with a bias-corrected harmonic mean. Sketches serialize into
//! either the current register layout or, for older storage versions, a
//! legacy layout with more registers, converting between both on the fly.
//!
//! [`aggregate::ApproxCountDistinct`] wraps the sketch into the
//! initialize / update / combine / finalize contract of a vectorized
//! aggregate executor.
//!
//! # Usage
//!
//! ```rust
//! use approx_distinct::hll::{HllSketch, StorageVersion};
//!
//! let mut sketch = HllSketch::new();
//! for i in 0..10_000u64 {
//!     sketch.update(&i);
//! }
//!
//! let bytes = sketch.serialize(StorageVersion::CURRENT);
//! let restored = HllSketch::deserialize(&bytes).unwrap();
//! assert_eq!(restored.count(), sketch.count());
//! ```

pub mod aggregate;
pub mod error;
pub mod hash;
pub mod hll;

mod codec;
