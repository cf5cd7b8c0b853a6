// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bitstream constants and small helpers shared by the encoder and decoder.

/// The signature that follows the packet type byte of every header packet.
pub const SIGNATURE: &[u8; 7] = b"cantata";

/// The bitstream format version written to, and required in, the identification header.
pub const FORMAT_VERSION: u8 = 0;

/// Identification header packet type.
pub const PACKET_TYPE_IDENTIFICATION: u8 = 1;
/// Comments header packet type.
pub const PACKET_TYPE_COMMENTS: u8 = 3;
/// Setup header packet type.
pub const PACKET_TYPE_SETUP: u8 = 5;

/// The synchronization word preceding a serialized codebook in the setup header.
pub const CODEBOOK_SYNC: u32 = 0x43_42_4b;

/// Serialized codebook layout version.
pub const CODEBOOK_VERSION: u8 = 0;

/// Smallest supported block size exponent (block size 64).
pub const MIN_BLOCK_SIZE_EXP: u8 = 6;
/// Largest supported block size exponent (block size 8192).
pub const MAX_BLOCK_SIZE_EXP: u8 = 13;

/// The short and long block size exponents written by the encoder.
pub const DEFAULT_BLOCK_SIZE_EXP_0: u8 = 7;
pub const DEFAULT_BLOCK_SIZE_EXP_1: u8 = 10;

/// The maximum number of channels in a stream.
pub const MAX_CHANNELS: usize = 32;

/// The maximum quality setting. This quality selects the lossless coefficient path.
pub const MAX_QUALITY: u8 = 10;

/// The number of spectral envelope bands per channel per block.
pub const FLOOR_BANDS: usize = 16;

/// The position number (1 through n) of the highest set bit in `x`.
///
/// This is the number of bits required to represent values in `0..=x`, with `ilog(0) == 0`.
#[inline(always)]
pub fn ilog(x: u32) -> u32 {
    32 - x.leading_zeros()
}
