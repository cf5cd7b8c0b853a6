// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The floor is the coarse per-band spectral envelope of a block.
//!
//! For each of the [`FLOOR_BANDS`] equal-width bands of a coefficient block, the peak absolute
//! coefficient amplitude is quantized to a 6-bit logarithmic index and transmitted. Coefficients
//! are normalized by the dequantized band amplitude before vector quantization, and rescaled by
//! it after lookup. The envelope therefore doubles as the residual scale factor.

use crate::common::FLOOR_BANDS;

/// The width in bits of one quantized band amplitude.
pub const FLOOR_AMP_BITS: u32 = 6;

/// Quantizes a peak band amplitude to a 6-bit logarithmic index.
///
/// The index is rounded up so that the dequantized amplitude is never below the measured peak,
/// keeping normalized coefficients within the quantizer's nominal range.
pub fn quantize_amplitude(peak: f32) -> u32 {
    if peak <= 0.0 {
        return 0;
    }

    let q = (60.0 + 10.0 * f64::from(peak).log10()).ceil();

    q.clamp(0.0, 63.0) as u32
}

/// Dequantizes a 6-bit amplitude index. The index 60 maps to an amplitude of 1.0, and each step
/// is one decibel.
pub fn amplitude(q: u32) -> f32 {
    debug_assert!(q < 64);
    10f64.powf((f64::from(q) - 60.0) / 10.0) as f32
}

/// The number of coefficients per band for a block of `m` coefficients.
///
/// Block sizes are powers of two no smaller than 64 coefficients, so the bands always divide the
/// block evenly.
pub fn band_width(m: usize) -> usize {
    debug_assert!(m % FLOOR_BANDS == 0);
    m / FLOOR_BANDS
}
