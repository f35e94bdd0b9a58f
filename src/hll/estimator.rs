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

//! Cardinality estimation from a register histogram.
//!
//! Implements the improved raw estimator of Otmar Ertl, "New cardinality
//! estimation algorithms for HyperLogLog sketches" (arXiv:1702.01284), which
//! needs neither empirical bias tables nor a linear counting switch.

use crate::hll::ALPHA;
use crate::hll::RegisterLayout;

/// Largest histogram any supported layout needs (`q + 2` for precision 4).
const HISTOGRAM_CAPACITY: usize = 64 - 4 + 2;

/// Estimate the number of distinct hashes summarized by `registers`.
pub(super) fn estimate(registers: &[u8], layout: RegisterLayout) -> u64 {
    debug_assert_eq!(registers.len(), layout.num_registers());

    let q = layout.q();
    let counts = histogram(registers, q);
    estimate_from_histogram(&counts[..q + 2], registers.len(), q)
}

/// Count registers per value. Values at or above `q` land in slot `q`.
fn histogram(registers: &[u8], q: usize) -> [u32; HISTOGRAM_CAPACITY] {
    let mut counts = [0u32; HISTOGRAM_CAPACITY];
    for &r in registers {
        counts[(r as usize).min(q)] += 1;
    }
    counts
}

fn estimate_from_histogram(counts: &[u32], num_registers: usize, q: usize) -> u64 {
    let m = num_registers as f64;

    let mut z = m * tau((m - counts[q] as f64) / m);
    for &c in counts[1..=q].iter().rev() {
        z += c as f64;
        z *= 0.5;
    }
    z += m * sigma(counts[0] as f64 / m);

    (ALPHA * m * m / z).round() as u64
}

/// `sigma(x) = x + sum_{k >= 1} x^(2^k) 2^(k-1)`, summed until the result
/// stops changing.
fn sigma(x: f64) -> f64 {
    if x == 1.0 {
        return f64::INFINITY;
    }

    let mut x = x;
    let mut y = 1.0;
    let mut z = x;
    loop {
        x *= x;
        let z_prime = z;
        z += x * y;
        y += y;
        if z_prime == z {
            return z;
        }
    }
}

/// `tau(x) = (1 - x - sum_{k >= 1} (1 - x^(2^-k))^2 2^-k) / 3`, summed until
/// the result stops changing.
fn tau(x: f64) -> f64 {
    if x == 0.0 || x == 1.0 {
        return 0.0;
    }

    let mut x = x;
    let mut y = 1.0;
    let mut z = 1.0 - x;
    loop {
        x = x.sqrt();
        let z_prime = z;
        y *= 0.5;
        z -= (1.0 - x).powi(2) * y;
        if z_prime == z {
            return z / 3.0;
        }
    }
}
