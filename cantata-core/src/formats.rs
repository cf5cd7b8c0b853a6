// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `formats` module declares the `Packet`, the unit of data exchanged with a container.

/// A `Packet` contains one logical unit of the compressed bitstream.
///
/// The codec is container-agnostic: a packet carries its complete payload as an opaque,
/// length-delimited byte buffer, and it is the container's responsibility to preserve packet
/// boundaries and ordering.
#[derive(Clone)]
pub struct Packet {
    /// The granule position of the packet.
    ///
    /// For audio packets this is the total number of decodable PCM frames up to and including
    /// this packet. Header packets carry a granule position of 0.
    pub granule: u64,

    /// The complete packet payload.
    pub data: Box<[u8]>,
}

impl Packet {
    /// Create a new `Packet` from a payload buffer.
    pub fn new_from_buf(granule: u64, data: Vec<u8>) -> Self {
        Packet { granule, data: data.into_boxed_slice() }
    }

    /// Gets an immutable slice of the packet payload.
    pub fn buf(&self) -> &[u8] {
        &self.data
    }
}
