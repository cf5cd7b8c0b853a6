// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::min;

use crate::errors::{out_of_bounds_error, Result};

/// `BitReaderRtl` reads bits from least-significant to most-significant from a `&[u8]`.
///
/// Stated another way, if N-bits are read from a `BitReaderRtl` then bit 0, the first bit read,
/// is the least-significant bit, and bit N-1, the last bit read, is the most-significant.
///
/// Reading past the end of the buffer fails with [`Error::OutOfBounds`][crate::errors::Error].
pub struct BitReaderRtl<'a> {
    buf: &'a [u8],
    bits: u64,
    n_bits_left: u32,
}

impl<'a> BitReaderRtl<'a> {
    /// Instantiate a new `BitReaderRtl` with the given buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        BitReaderRtl { buf, bits: 0, n_bits_left: 0 }
    }

    /// Discard any remaining cached bits and refill the bit cache from the buffer.
    fn fetch_bits(&mut self) -> Result<()> {
        let mut bytes = [0u8; std::mem::size_of::<u64>()];

        let read_len = min(self.buf.len(), std::mem::size_of::<u64>());

        if read_len == 0 {
            return out_of_bounds_error();
        }

        bytes[..read_len].copy_from_slice(&self.buf[..read_len]);

        self.buf = &self.buf[read_len..];

        self.bits = u64::from_le_bytes(bytes);
        self.n_bits_left = (read_len as u32) << 3;

        Ok(())
    }

    #[inline(always)]
    fn consume_bits(&mut self, num: u32) {
        self.n_bits_left -= num;
        self.bits >>= num;
    }

    /// Read a single bit as a boolean value.
    #[inline(always)]
    pub fn read_bool(&mut self) -> Result<bool> {
        if self.n_bits_left < 1 {
            self.fetch_bits()?;
        }

        let bit = (self.bits & 1) == 1;

        self.consume_bits(1);
        Ok(bit)
    }

    /// Reads up to 32-bits and interprets them as an unsigned integer.
    #[inline(always)]
    pub fn read_bits_leq32(&mut self, bit_width: u32) -> Result<u32> {
        debug_assert!(bit_width <= u32::BITS);

        let mut bits = self.bits;
        let mut bits_needed = bit_width;

        while bits_needed > self.n_bits_left {
            bits_needed -= self.n_bits_left;

            self.fetch_bits()?;

            bits |= self.bits << (bit_width - bits_needed);
        }

        self.consume_bits(bits_needed);

        // Since bit_width is <= 32, this shift will never panic.
        let mask = !(!0 << bit_width);

        Ok((bits & mask) as u32)
    }

    /// Gets the number of bits left unread.
    pub fn bits_left(&self) -> u64 {
        (8 * self.buf.len() as u64) + u64::from(self.n_bits_left)
    }
}

/// `BitWriterRtl` writes bits from least-significant to most-significant into a byte buffer.
///
/// This is the writing counterpart of [`BitReaderRtl`]: a sequence of fields written with
/// `BitWriterRtl` reads back identically with `BitReaderRtl`.
#[derive(Default)]
pub struct BitWriterRtl {
    buf: Vec<u8>,
    bits: u64,
    n_bits: u32,
}

impl BitWriterRtl {
    /// Instantiate a new, empty, `BitWriterRtl`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Write a single bit.
    #[inline(always)]
    pub fn write_bool(&mut self, bit: bool) {
        self.write_bits_leq32(u32::from(bit), 1);
    }

    /// Writes the `bit_width` low-order bits of `value`, least-significant bit first, crossing
    /// byte boundaries transparently.
    #[inline(always)]
    pub fn write_bits_leq32(&mut self, value: u32, bit_width: u32) {
        debug_assert!(bit_width <= u32::BITS);

        if bit_width == 0 {
            return;
        }

        // Since bit_width is >= 1, this shift will never panic.
        let mask = !0 >> (u32::BITS - bit_width);

        // The cache never holds a full byte between writes, so at most 7 + 32 bits are pending.
        self.bits |= u64::from(value & mask) << self.n_bits;
        self.n_bits += bit_width;

        while self.n_bits >= u8::BITS {
            self.buf.push((self.bits & 0xff) as u8);
            self.bits >>= u8::BITS;
            self.n_bits -= u8::BITS;
        }
    }

    /// The total number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        (8 * self.buf.len() as u64) + u64::from(self.n_bits)
    }

    /// Pads the final byte with zero bits and returns the finalized byte buffer.
    pub fn finalize(mut self) -> Vec<u8> {
        if self.n_bits > 0 {
            self.buf.push((self.bits & 0xff) as u8);
        }
        self.buf
    }
}
