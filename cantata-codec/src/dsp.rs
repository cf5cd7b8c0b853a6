// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cantata_core::dsp::mdct::Mdct;

use crate::window::Windows;

/// State retained between consecutive audio packets.
pub struct LappingState {
    pub prev_block_size: usize,
}

pub struct Dsp {
    /// DSP channels, one per audio channel.
    pub channels: Vec<DspChannel>,
    /// MDCT for short blocks.
    pub mdct_short: Mdct,
    /// MDCT for long blocks.
    pub mdct_long: Mdct,
    /// Windows for overlap-add.
    pub windows: Windows,
    /// Lapping state. `None` until the first audio packet has been synthesized.
    pub lapping_state: Option<LappingState>,
}

impl Dsp {
    pub fn new(n_channels: usize, n0: usize, n1: usize) -> Self {
        Dsp {
            channels: (0..n_channels).map(|_| DspChannel::new(n1)).collect(),
            mdct_short: Mdct::new(n0 / 2),
            mdct_long: Mdct::new(n1 / 2),
            windows: Windows::new(n0, n1),
            lapping_state: None,
        }
    }

    /// The number of samples per channel the next block of `block_size` samples will render.
    ///
    /// The first block renders nothing; it only primes the overlap buffer.
    pub fn render_len(&self, block_size: usize) -> usize {
        match &self.lapping_state {
            Some(lap) => (lap.prev_block_size + block_size) / 4,
            None => 0,
        }
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }

        self.lapping_state = None;
    }
}

pub struct DspChannel {
    /// The coefficient buffer for the current block.
    pub coeffs: Vec<f32>,
    /// Windowed IMDCT output of the current block.
    buf: Vec<f32>,
    /// The windowed right half of the previous block.
    overlap: Vec<f32>,
}

impl DspChannel {
    pub fn new(n1: usize) -> Self {
        DspChannel {
            coeffs: vec![0.0; n1 / 2],
            buf: vec![0.0; n1],
            overlap: vec![0.0; n1 / 2],
        }
    }

    /// Synthesize one block of `n` samples from `coeffs[..n / 2]` and overlap-add it with the
    /// previous block, writing `render_len` samples to `out`.
    pub fn synth(
        &mut self,
        n: usize,
        lap_state: &Option<LappingState>,
        win: &[f32],
        mdct: &mut Mdct,
        out: &mut [f32],
    ) {
        // Step 1
        //
        // Perform the inverse MDCT on the audio spectrum.
        mdct.inverse(&self.coeffs[..n / 2], &mut self.buf[..n]);

        // Step 2
        //
        // Apply the synthesis window to the samples produced by the IMDCT.
        for (s, &w) in self.buf[..n].iter_mut().zip(win) {
            *s *= w;
        }

        // Step 3
        //
        // Overlap-add with the windowed right half of the previous block. The output region runs
        // from the previous block's centre to this block's centre. When the block sizes differ,
        // one side stops contributing where its window is zero or has ended, and the other side
        // is flat unity there.
        if let Some(lap_state) = lap_state {
            let prev_n = lap_state.prev_block_size;

            debug_assert!(out.len() == (prev_n + n) / 4);

            // Offset of the output region within the current block.
            let cur_off = n as isize / 4 - prev_n as isize / 4;

            for (t, o) in out.iter_mut().enumerate() {
                let mut s = 0.0;

                if t < prev_n / 2 {
                    s += self.overlap[t];
                }

                let cur_i = t as isize + cur_off;
                if cur_i >= 0 {
                    s += self.buf[cur_i as usize];
                }

                *o = s.clamp(-1.0, 1.0);
            }
        }

        // Step 4
        //
        // Save the windowed right half of this block for the next overlap-add.
        self.overlap[..n / 2].copy_from_slice(&self.buf[n / 2..n]);
    }

    pub fn reset(&mut self) {
        // Clear the overlap buffer. Nothing else is carried across packets.
        self.overlap.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn verify_synth_reconstructs_equal_blocks() {
        // Analyze three lapped long blocks by hand, synthesize them through a DspChannel, and
        // check that the region lapped by two blocks reconstructs the input.
        const N: usize = 256;

        let mut rng = SmallRng::seed_from_u64(0x5EED);

        let signal: Vec<f32> = (0..2 * N).map(|_| rng.random_range(-0.9f32..0.9)).collect();

        let mut dsp = Dsp::new(1, 64, N);
        let win = dsp.windows.window(true, true, true).to_vec();

        let mut rendered = Vec::new();

        for block in 0..3 {
            let start = block * N / 2;

            let windowed: Vec<f32> =
                signal[start..start + N].iter().zip(&win).map(|(&s, &w)| s * w).collect();

            let mut out = vec![0.0; dsp.render_len(N)];

            let mut coeffs = vec![0.0; N / 2];
            dsp.mdct_long.forward(&windowed, &mut coeffs);

            let channel = &mut dsp.channels[0];
            channel.coeffs[..N / 2].copy_from_slice(&coeffs);
            channel.synth(N, &dsp.lapping_state, &win, &mut dsp.mdct_long, &mut out);

            dsp.lapping_state = Some(LappingState { prev_block_size: N });

            rendered.extend_from_slice(&out);
        }

        // The first block renders nothing, the next two render N / 2 samples each, covering
        // signal[N / 2..3 * N / 2].
        assert_eq!(rendered.len(), N);

        for (i, &r) in rendered.iter().enumerate() {
            assert!((r - signal[N / 2 + i]).abs() < 1e-4);
        }
    }

    #[test]
    fn verify_reset_clears_lapping() {
        let mut dsp = Dsp::new(2, 64, 256);

        dsp.channels[0].overlap[0] = 0.5;
        dsp.lapping_state = Some(LappingState { prev_block_size: 256 });

        assert_eq!(dsp.render_len(256), 128);

        dsp.reset();

        assert!(dsp.lapping_state.is_none());
        assert_eq!(dsp.channels[0].overlap[0], 0.0);
        assert_eq!(dsp.render_len(256), 0);
    }
}
