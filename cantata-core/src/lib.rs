// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared foundation of the Cantata codec: audio buffers, packets, the common error type,
//! bit-level I/O, and DSP primitives.

pub mod audio;
pub mod dsp;
pub mod errors;
pub mod formats;
pub mod io;
