// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `audio` module provides the audio buffer exchanged with the encoder and decoder.

/// `SignalSpec` describes the characteristics of a PCM signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignalSpec {
    /// The signal sampling rate in hertz (Hz).
    pub rate: u32,

    /// The number of channels. Channel `c` of frame `t` is sample `t` of plane `c`.
    pub channels: usize,
}

impl SignalSpec {
    pub fn new(rate: u32, channels: usize) -> Self {
        SignalSpec { rate, channels }
    }
}

/// An `AudioBuffer` is a planar buffer of 32-bit floating point samples.
///
/// Samples are stored one plane per channel, each plane holding one sample per frame. All planes
/// always have equal length. Sample values are nominally in the range [-1.0, 1.0], but the buffer
/// itself does not enforce this.
#[derive(Clone, Debug, Default)]
pub struct AudioBuffer {
    planes: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Instantiate an `AudioBuffer` of `n_frames` silent frames for `n_channels` channels.
    pub fn new(n_channels: usize, n_frames: usize) -> Self {
        AudioBuffer { planes: vec![vec![0.0; n_frames]; n_channels] }
    }

    /// Instantiate an `AudioBuffer` from per-channel sample planes.
    ///
    /// Panics if the planes are not all of equal length.
    pub fn from_planes(planes: Vec<Vec<f32>>) -> Self {
        if let Some(first) = planes.first() {
            assert!(planes.iter().all(|p| p.len() == first.len()));
        }
        AudioBuffer { planes }
    }

    /// Gets the number of channels.
    pub fn num_channels(&self) -> usize {
        self.planes.len()
    }

    /// Gets the number of frames per channel.
    pub fn frames(&self) -> usize {
        self.planes.first().map_or(0, |p| p.len())
    }

    /// Returns `true` if the buffer contains no frames.
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Gets an immutable slice of the samples of channel `ch`.
    pub fn chan(&self, ch: usize) -> &[f32] {
        &self.planes[ch]
    }

    /// Gets a mutable slice of the samples of channel `ch`.
    pub fn chan_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.planes[ch]
    }

    /// Truncates every plane to at most `n_frames` frames.
    pub fn truncate(&mut self, n_frames: usize) {
        for plane in self.planes.iter_mut() {
            plane.truncate(n_frames);
        }
    }
}
