// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Cantata codec: a lossy transform audio encoder and decoder operating on in-memory
//! buffers.
//!
//! The codec is container-agnostic. [`Encoder`] turns planar audio into a sequence of
//! self-delimiting [`Packet`][cantata_core::formats::Packet]s (three header packets followed by
//! audio packets), and [`Decoder`] turns the packet sequence back into audio. Transporting or
//! storing the packets is the caller's concern.

mod codebook;
mod common;
mod decoder;
mod dsp;
mod encoder;
mod floor;
mod window;

pub use decoder::{open_decoder, Decoder};
pub use encoder::{open_encoder, Encoder, EncoderOptions};

pub use common::MAX_QUALITY;
