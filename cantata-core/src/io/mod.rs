// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements bit-level packing and unpacking of in-memory buffers.
//!
//! All packet payloads in a Cantata bitstream are sequences of 1 to 32 bit wide unsigned integer
//! fields packed least-significant bit first. [`BitWriterRtl`] packs fields into a byte buffer and
//! [`BitReaderRtl`] unpacks them, each crossing byte boundaries transparently. The bitrate
//! efficiency of the codec depends on every field being written at its exact width rather than
//! being byte-aligned.

mod bit;

pub use bit::{BitReaderRtl, BitWriterRtl};
