// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f64::consts;

/// For a given window size, generates the curve of the left-half of the window.
fn generate_win_curve(bs: usize) -> Vec<f32> {
    let len = bs / 2;
    let denom = f64::from(len as u32);

    let mut slope = vec![0.0; len];

    for (i, s) in slope.iter_mut().enumerate() {
        let num = f64::from(i as u32) + 0.5;
        let frac = consts::FRAC_PI_2 * (num / denom);
        *s = (consts::FRAC_PI_2 * frac.sin().powi(2)).sin() as f32
    }

    slope
}

/// Build the full window for a long block given the sizes of the lapped neighbours.
///
/// When a neighbouring block is short, the corresponding slope narrows to the short overlap
/// region, with zeros outside the overlap and a flat unity span up to the block centre.
fn generate_long_window(n1: usize, n0: usize, prev_long: bool, next_long: bool) -> Vec<f32> {
    let long_slope = generate_win_curve(n1);
    let short_slope = generate_win_curve(n0);

    let mut win = vec![0.0; n1];

    if prev_long {
        win[..n1 / 2].copy_from_slice(&long_slope);
    }
    else {
        let start = n1 / 4 - n0 / 4;
        win[start..start + n0 / 2].copy_from_slice(&short_slope);

        for w in win[start + n0 / 2..n1 / 2].iter_mut() {
            *w = 1.0;
        }
    }

    if next_long {
        for (i, w) in win[n1 / 2..].iter_mut().enumerate() {
            *w = long_slope[n1 / 2 - 1 - i];
        }
    }
    else {
        let start = 3 * n1 / 4 - n0 / 4;

        for w in win[n1 / 2..start].iter_mut() {
            *w = 1.0;
        }

        for (i, w) in win[start..start + n0 / 2].iter_mut().enumerate() {
            *w = short_slope[n0 / 2 - 1 - i];
        }
    }

    win
}

/// The set of analysis/synthesis windows for one stream.
///
/// A short block always laps two short half-overlaps, so a single short window suffices. A long
/// block has four variants selected by whether the previous and next blocks are long.
pub struct Windows {
    short: Vec<f32>,
    long: [Vec<f32>; 4],
}

impl Windows {
    pub fn new(n0: usize, n1: usize) -> Self {
        let slope = generate_win_curve(n0);

        let mut short = vec![0.0; n0];
        short[..n0 / 2].copy_from_slice(&slope);

        for (i, w) in short[n0 / 2..].iter_mut().enumerate() {
            *w = slope[n0 / 2 - 1 - i];
        }

        let long = [
            generate_long_window(n1, n0, false, false),
            generate_long_window(n1, n0, true, false),
            generate_long_window(n1, n0, false, true),
            generate_long_window(n1, n0, true, true),
        ];

        Windows { short, long }
    }

    /// Gets the window for a block, given the block flag and the neighbour window flags.
    ///
    /// The neighbour flags are only meaningful for long blocks and are ignored for short blocks.
    pub fn window(&self, block_flag: bool, prev_flag: bool, next_flag: bool) -> &[f32] {
        if block_flag {
            &self.long[usize::from(prev_flag) | (usize::from(next_flag) << 1)]
        }
        else {
            &self.short
        }
    }
}
