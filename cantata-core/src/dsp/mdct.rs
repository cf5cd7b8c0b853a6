// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mdct` module implements the Modified Discrete Cosine Transform (MDCT).
//!
//! The transform is evaluated against a precomputed cosine basis that is shared by the forward
//! and inverse directions. Using the exact same basis both ways keeps the pair transpose
//! consistent, which the overlap-add reconstruction guarantee depends on.

use std::f64::consts;

/// The Modified Discrete Cosine Transform for one block size.
///
/// An `Mdct` for `m` coefficients transforms blocks of `2m` time-domain samples into `m`
/// frequency-domain coefficients and back. Both directions are scaled by `sqrt(2/m)` so that the
/// windowed overlap-add of consecutive inverse-transformed blocks cancels time-domain aliasing
/// exactly (within floating-point tolerance) when the window satisfies the Princen-Bradley
/// condition.
pub struct Mdct {
    /// The number of frequency coefficients per block.
    m: usize,
    /// The scaled cosine basis, `m` rows of `2m` values.
    table: Vec<f32>,
    /// Inverse transform accumulation scratch.
    accum: Vec<f64>,
}

impl Mdct {
    /// Instantiate an `Mdct` producing `m` frequency coefficients per block of `2m` samples.
    pub fn new(m: usize) -> Self {
        assert!(m >= 2 && m.is_power_of_two());

        let n = 2 * m;

        // Basis: cos(pi/(4m) * (2i + 1 + m) * (2k + 1)), for coefficient k and sample i, scaled
        // by sqrt(2/m).
        let theta = consts::PI / (2 * n) as f64;
        let scale = (2.0 / m as f64).sqrt();

        let mut table = vec![0.0; m * n];

        for (k, row) in table.chunks_exact_mut(n).enumerate() {
            for (i, basis) in row.iter_mut().enumerate() {
                let arg = theta * ((2 * i + 1 + m) * (2 * k + 1)) as f64;
                *basis = (scale * arg.cos()) as f32;
            }
        }

        Mdct { m, table, accum: vec![0.0; n] }
    }

    /// The number of frequency coefficients per block.
    pub fn coeffs(&self) -> usize {
        self.m
    }

    /// The number of time-domain samples per block.
    pub fn frames(&self) -> usize {
        2 * self.m
    }

    /// Forward transform: `2m` (windowed) time-domain samples into `m` coefficients.
    pub fn forward(&mut self, samples: &[f32], coeffs: &mut [f32]) {
        let n = 2 * self.m;

        assert_eq!(samples.len(), n);
        assert_eq!(coeffs.len(), self.m);

        for (row, coeff) in self.table.chunks_exact(n).zip(coeffs.iter_mut()) {
            let accum: f64 =
                row.iter().zip(samples).map(|(&b, &s)| f64::from(b) * f64::from(s)).sum();

            *coeff = accum as f32;
        }
    }

    /// Inverse transform: `m` coefficients into `2m` time-domain samples.
    ///
    /// The output contains the time-domain alias inherent to the lapped transform; the caller
    /// must window it and overlap-add with the neighbouring blocks to reconstruct audio.
    pub fn inverse(&mut self, coeffs: &[f32], samples: &mut [f32]) {
        let n = 2 * self.m;

        assert_eq!(coeffs.len(), self.m);
        assert_eq!(samples.len(), n);

        self.accum.fill(0.0);

        for (row, &coeff) in self.table.chunks_exact(n).zip(coeffs) {
            if coeff == 0.0 {
                continue;
            }

            let coeff = f64::from(coeff);

            for (acc, &b) in self.accum.iter_mut().zip(row) {
                *acc += f64::from(b) * coeff;
            }
        }

        for (s, &acc) in samples.iter_mut().zip(self.accum.iter()) {
            *s = acc as f32;
        }
    }
}
