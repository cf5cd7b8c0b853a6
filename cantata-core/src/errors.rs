// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Cantata.
///
/// Every error is fatal for the stream that produced it. There is no automatic retry inside the
/// codec; corruption is not self-healing without redundant data the core does not carry.
#[derive(Debug)]
pub enum Error {
    /// A bitstream read was attempted past the end of the declared buffer. Always indicates a
    /// truncated packet.
    OutOfBounds,
    /// A codebook index outside the table's range was read from the bitstream. This is a
    /// protocol-corruption signal; the stream is desynchronized and must be abandoned.
    InvalidCodebookIndex(u32),
    /// The stream violated packet ordering or contained a malformed header, and cannot be decoded
    /// past the offending packet.
    MalformedStream(&'static str),
    /// The requested channel count, sample rate, or quality combination is outside the supported
    /// range. Rejected before any stream state is created.
    Unsupported(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::OutOfBounds => {
                write!(f, "out-of-bounds: bitstream read past end of buffer")
            }
            Error::InvalidCodebookIndex(index) => {
                write!(f, "invalid codebook index: {}", index)
            }
            Error::MalformedStream(msg) => {
                write!(f, "malformed stream: {}", msg)
            }
            Error::Unsupported(feature) => {
                write!(f, "unsupported configuration: {}", feature)
            }
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create an out-of-bounds error.
pub fn out_of_bounds_error<T>() -> Result<T> {
    Err(Error::OutOfBounds)
}

/// Convenience function to create an invalid codebook index error.
pub fn invalid_codebook_index_error<T>(index: u32) -> Result<T> {
    Err(Error::InvalidCodebookIndex(index))
}

/// Convenience function to create a malformed stream error.
pub fn malformed_stream_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::MalformedStream(desc))
}

/// Convenience function to create an unsupported configuration error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}
