// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vector quantization against an immutable product codebook.

use cantata_core::errors::{
    invalid_codebook_index_error, malformed_stream_error, unsupported_error, Result,
};
use cantata_core::io::{BitReaderRtl, BitWriterRtl};

use crate::common::{ilog, CODEBOOK_SYNC, CODEBOOK_VERSION};

/// The maximum number of entries a codebook read from a setup header may declare.
const MAX_ENTRIES: u32 = 1 << 24;

/// An immutable product codebook.
///
/// A sorted table of `L` per-component reconstruction levels yields `L^dim` entries. Every entry
/// is materialized once into a contiguous arena at construction, so decode is a slice lookup and
/// returns the identical vector for an index on every call. The codebook is never mutated after
/// construction.
pub struct Codebook {
    dim: usize,
    levels: Vec<f32>,
    /// Nearest-neighbor decision boundaries, `levels.len() - 1` midpoints between adjacent
    /// levels.
    midpoints: Vec<f32>,
    /// All entries, `dim` components each, entry `e` at `arena[e * dim..(e + 1) * dim]`.
    arena: Vec<f32>,
    n_entries: u32,
    index_bits: u32,
}

impl Codebook {
    /// Build a codebook from a sorted per-component level table.
    ///
    /// The levels must be finite and strictly ascending, and `levels.len()^dim` must not exceed
    /// [`MAX_ENTRIES`]. Violations are programmer errors and panic.
    fn from_levels(dim: usize, levels: Vec<f32>) -> Self {
        assert!(dim >= 1);
        assert!(!levels.is_empty());
        assert!(levels.windows(2).all(|w| w[0] < w[1]));

        let n_entries = match (levels.len() as u32).checked_pow(dim as u32) {
            Some(n) if n <= MAX_ENTRIES => n,
            _ => panic!("codebook entry count exceeds limit"),
        };

        let midpoints = levels.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

        // Materialize the arena. Component 0 is the most-significant digit of the entry index in
        // base levels.len().
        let mut arena = vec![0.0; n_entries as usize * dim];

        for (e, entry) in arena.chunks_exact_mut(dim).enumerate() {
            let mut rem = e;

            for c in entry.iter_mut().rev() {
                *c = levels[rem % levels.len()];
                rem /= levels.len();
            }
        }

        let index_bits = ilog(n_entries - 1);

        Codebook { dim, levels, midpoints, arena, n_entries, index_bits }
    }

    /// Generate the deterministic codebook for a quality setting.
    ///
    /// The table has `7 + 2q` levels per component, spaced quadratically in `[-1, 1]` so that
    /// resolution concentrates near zero where normalized coefficients cluster.
    pub fn for_quality(quality: u8) -> Self {
        let n_levels = 7 + 2 * usize::from(quality);
        let half = (n_levels / 2) as i32;

        let levels = (0..n_levels as i32)
            .map(|j| {
                let t = f64::from(j - half) / f64::from(half);
                (t.signum() * t * t) as f32
            })
            .collect();

        Codebook::from_levels(2, levels)
    }

    /// The number of components per entry.
    pub fn dimensions(&self) -> usize {
        self.dim
    }

    /// The total number of entries.
    pub fn num_entries(&self) -> u32 {
        self.n_entries
    }

    /// The exact width in bits of an entry index in the bitstream.
    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    /// Gets the entry for `index`, or fails with
    /// [`Error::InvalidCodebookIndex`][cantata_core::errors::Error] if the index is outside the
    /// table.
    #[inline(always)]
    pub fn entry(&self, index: u32) -> Result<&[f32]> {
        if index >= self.n_entries {
            return invalid_codebook_index_error(index);
        }

        let start = index as usize * self.dim;
        Ok(&self.arena[start..start + self.dim])
    }

    /// Finds the index of the entry nearest to `v` under Euclidean distance.
    ///
    /// Squared error is separable per component for a product codebook, so each component is
    /// resolved independently against the midpoint table with a binary search. The result is the
    /// exact nearest neighbor, never an approximation.
    pub fn quantize(&self, v: &[f32]) -> u32 {
        debug_assert!(v.len() == self.dim);

        let mut index = 0u32;

        for &x in v {
            let c = self.midpoints.partition_point(|&mid| mid < x);
            index = index * self.levels.len() as u32 + c as u32;
        }

        index
    }

    /// Serialize the codebook into a setup header.
    pub fn write(&self, bw: &mut BitWriterRtl) {
        bw.write_bits_leq32(CODEBOOK_SYNC, 24);
        bw.write_bits_leq32(u32::from(CODEBOOK_VERSION), 8);
        bw.write_bits_leq32(self.dim as u32, 16);
        bw.write_bits_leq32(self.levels.len() as u32, 16);

        for &level in &self.levels {
            bw.write_bits_leq32(level.to_bits(), 32);
        }
    }

    /// Deserialize a codebook from a setup header, validating every field.
    pub fn read(bs: &mut BitReaderRtl<'_>) -> Result<Self> {
        if bs.read_bits_leq32(24)? != CODEBOOK_SYNC {
            return malformed_stream_error("codebook sync word mismatch");
        }

        if bs.read_bits_leq32(8)? != u32::from(CODEBOOK_VERSION) {
            return unsupported_error("codebook layout version");
        }

        let dim = bs.read_bits_leq32(16)? as usize;
        let n_levels = bs.read_bits_leq32(16)? as usize;

        if dim < 1 || n_levels < 1 {
            return malformed_stream_error("codebook dimensions");
        }

        match (n_levels as u32).checked_pow(dim as u32) {
            Some(n) if n <= MAX_ENTRIES => (),
            _ => return malformed_stream_error("codebook too large"),
        }

        let mut levels = Vec::with_capacity(n_levels);

        for _ in 0..n_levels {
            let level = f32::from_bits(bs.read_bits_leq32(32)?);

            if !level.is_finite() {
                return malformed_stream_error("codebook level not finite");
            }

            levels.push(level);
        }

        if !levels.windows(2).all(|w| w[0] < w[1]) {
            return malformed_stream_error("codebook levels not ascending");
        }

        Ok(Codebook::from_levels(dim, levels))
    }
}
