// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use cantata_core::audio::{AudioBuffer, SignalSpec};
use cantata_core::dsp::mdct::Mdct;
use cantata_core::errors::{malformed_stream_error, unsupported_error, Result};
use cantata_core::formats::Packet;
use cantata_core::io::BitWriterRtl;

use crate::codebook::Codebook;
use crate::common::*;
use crate::floor::{self, FLOOR_AMP_BITS};
use crate::window::Windows;

/// The vendor string written to the comments header.
const VENDOR: &str = concat!("cantata ", env!("CARGO_PKG_VERSION"));

/// A block whose lookahead energy jumps by more than this factor over the running average
/// triggers a switch to short blocks.
const TRANSIENT_ENERGY_RATIO: f32 = 10.0;

/// Mean squared sample energy below which a lookahead sub-block never counts as a transient.
const TRANSIENT_ENERGY_FLOOR: f32 = 1.0e-4;

/// `EncoderOptions` is a common set of options that all encoders use.
#[derive(Clone, Debug, Default)]
pub struct EncoderOptions {
    /// User comments written to the comments header as `KEY=value` strings.
    pub comments: Vec<(String, String)>,
}

/// Open an encoder for the given signal specification and quality setting.
///
/// Quality ranges from 0 (smallest) to 10; quality 10 bypasses vector quantization and writes
/// raw coefficient bit patterns. Unsupported parameter combinations are rejected before any
/// stream state is created.
pub fn open_encoder(spec: SignalSpec, quality: u8, opts: &EncoderOptions) -> Result<Encoder> {
    if spec.channels < 1 || spec.channels > MAX_CHANNELS {
        return unsupported_error("encoder: channel count");
    }

    if spec.rate == 0 {
        return unsupported_error("encoder: sample rate");
    }

    if quality > MAX_QUALITY {
        return unsupported_error("encoder: quality");
    }

    Ok(Encoder::new(spec, quality, opts))
}

pub struct Encoder {
    spec: SignalSpec,
    quality: u8,
    /// Short and long block sizes.
    n0: usize,
    n1: usize,
    codebook: Codebook,
    windows: Windows,
    mdct_short: Mdct,
    mdct_long: Mdct,
    /// Per-channel input queues. Sample 0 of each queue is at absolute position `queue_start` of
    /// the primed timeline (the source signal preceded by `n1 / 2` samples of silence).
    queue: Vec<Vec<f32>>,
    queue_start: u64,
    /// The centre of the next block to emit, in the primed timeline.
    center: u64,
    /// Block flag of the next block to emit.
    cur_flag: bool,
    /// Block flag of the previously emitted block.
    prev_flag: bool,
    /// Source samples received so far.
    total_in: u64,
    /// The three header packets, taken on the first call that returns packets.
    headers: Option<[Packet; 3]>,
    headers_sent: bool,
    finished: bool,
}

impl Encoder {
    fn new(spec: SignalSpec, quality: u8, opts: &EncoderOptions) -> Self {
        let n0 = 1 << DEFAULT_BLOCK_SIZE_EXP_0;
        let n1 = 1 << DEFAULT_BLOCK_SIZE_EXP_1;

        // Prime each queue with half a long block of silence. The first block is centred on the
        // first source sample, so the first audio packet renders nothing and carries granule 0.
        let queue = vec![vec![0.0; n1 / 2]; spec.channels];

        let mut enc = Encoder {
            spec,
            quality,
            n0,
            n1,
            codebook: Codebook::for_quality(quality),
            windows: Windows::new(n0, n1),
            mdct_short: Mdct::new(n0 / 2),
            mdct_long: Mdct::new(n1 / 2),
            queue,
            queue_start: 0,
            center: (n1 / 2) as u64,
            cur_flag: true,
            prev_flag: true,
            total_in: 0,
            headers: None,
            headers_sent: false,
            finished: false,
        };

        // Header packets depend only on open-time parameters, build them eagerly.
        enc.headers = Some([
            enc.make_identification(),
            enc.make_comments(opts),
            enc.make_setup(),
        ]);

        enc
    }

    /// Encode a buffer of audio, returning zero or more packets.
    ///
    /// The three header packets precede the first audio packet. Audio packets are emitted once
    /// enough input has accumulated to cover a block and its window-switch lookahead.
    pub fn encode(&mut self, buf: &AudioBuffer) -> Result<Vec<Packet>> {
        if self.finished {
            return malformed_stream_error("encoder: encode after finish");
        }

        if buf.num_channels() != self.spec.channels {
            return unsupported_error("encoder: audio buffer channel count");
        }

        for (ch, queue) in self.queue.iter_mut().enumerate() {
            queue.extend_from_slice(buf.chan(ch));
        }

        self.total_in += buf.frames() as u64;

        let mut packets = self.take_headers();

        // Emit blocks while the queue covers the block and the lookahead region.
        while self.queue_end() >= self.center + (self.n1 / 4 + self.n1) as u64 {
            let packet = self.emit_block(false, None);
            packets.push(packet);
        }

        Ok(packets)
    }

    /// Flush all buffered audio and emit the final end-of-stream packet.
    pub fn finish(&mut self) -> Result<Vec<Packet>> {
        if self.finished {
            return malformed_stream_error("encoder: finish after finish");
        }

        self.finished = true;

        let source_len = self.total_in;

        let mut packets = self.take_headers();

        loop {
            // Pad the lookahead with silence.
            let needed = self.center + (self.n1 / 4 + self.n1) as u64;

            if self.queue_end() < needed {
                let pad = (needed - self.queue_end()) as usize;

                for queue in self.queue.iter_mut() {
                    queue.resize(queue.len() + pad, 0.0);
                }
            }

            let natural = self.center - (self.n1 / 2) as u64;

            if natural >= source_len {
                packets.push(self.emit_block(true, Some(source_len)));
                break;
            }

            packets.push(self.emit_block(false, None));
        }

        Ok(packets)
    }

    fn queue_end(&self) -> u64 {
        self.queue_start + self.queue[0].len() as u64
    }

    fn take_headers(&mut self) -> Vec<Packet> {
        if self.headers_sent {
            return Vec::new();
        }

        self.headers_sent = true;
        self.headers.take().map(|h| h.to_vec()).unwrap_or_default()
    }

    /// Emit the block centred at `self.center` as one audio packet and advance the schedule.
    fn emit_block(&mut self, eos: bool, granule_override: Option<u64>) -> Packet {
        let n = if self.cur_flag { self.n1 } else { self.n0 };
        let m = n / 2;

        // Decide the next block's size from the energy profile of the region the next block will
        // newly cover. The region is chosen independently of the next block's own size to avoid
        // a circular dependency.
        let next_flag = !self.detect_transient(self.center + (n / 4) as u64, self.n1);

        if next_flag != self.cur_flag {
            debug!("window switch at {}: long={}", self.center, next_flag);
        }

        let win = self.windows.window(self.cur_flag, self.prev_flag, next_flag);

        let mdct = if self.cur_flag { &mut self.mdct_long } else { &mut self.mdct_short };

        let granule = granule_override.unwrap_or(self.center - (self.n1 / 2) as u64);

        let mut bw = BitWriterRtl::new();

        // Audio packet marker, then the window-mode selector.
        bw.write_bool(false);
        bw.write_bool(self.cur_flag);

        if self.cur_flag {
            bw.write_bool(self.prev_flag);
            bw.write_bool(next_flag);
        }

        bw.write_bool(eos);

        bw.write_bits_leq32((granule & 0xffff_ffff) as u32, 32);
        bw.write_bits_leq32((granule >> 32) as u32, 32);

        let start = (self.center - (n / 2) as u64 - self.queue_start) as usize;

        let mut coeffs = vec![0.0; m];
        let mut windowed = vec![0.0; n];

        for queue in self.queue.iter() {
            for (w, (&s, &c)) in windowed.iter_mut().zip(queue[start..start + n].iter().zip(win))
            {
                *w = s * c;
            }

            mdct.forward(&windowed, &mut coeffs);

            if self.quality == MAX_QUALITY {
                // Lossless path: raw coefficient bit patterns.
                for &c in coeffs.iter() {
                    bw.write_bits_leq32(c.to_bits(), 32);
                }
            }
            else {
                write_channel_vq(&mut bw, &coeffs, &self.codebook);
            }
        }

        // Advance to the next block centre and drop queue samples no future block can reach.
        let next_n = if next_flag { self.n1 } else { self.n0 };

        self.center += ((n + next_n) / 4) as u64;
        self.prev_flag = self.cur_flag;
        self.cur_flag = next_flag;

        let keep_from = self.center - (self.n1 / 2) as u64;
        let drop = (keep_from - self.queue_start) as usize;

        for queue in self.queue.iter_mut() {
            queue.drain(..drop);
        }

        self.queue_start = keep_from;

        Packet::new_from_buf(granule, bw.finalize())
    }

    /// Returns `true` if the region of `len` samples starting at primed position `start`
    /// contains an energy transient on any channel.
    fn detect_transient(&self, start: u64, len: usize) -> bool {
        let sub = self.n0 / 2;
        let rel = (start - self.queue_start) as usize;

        for queue in self.queue.iter() {
            let region = &queue[rel..rel + len];

            let mut avg: Option<f32> = None;

            for block in region.chunks_exact(sub) {
                let energy = block.iter().map(|&s| s * s).sum::<f32>() / sub as f32;

                if let Some(avg) = avg {
                    if energy > TRANSIENT_ENERGY_RATIO * avg && energy > TRANSIENT_ENERGY_FLOOR {
                        return true;
                    }
                }

                avg = Some(match avg {
                    Some(avg) => 0.5 * (avg + energy),
                    None => energy,
                });
            }
        }

        false
    }

    fn write_header_prelude(bw: &mut BitWriterRtl, packet_type: u8) {
        bw.write_bits_leq32(u32::from(packet_type), 8);

        for &b in SIGNATURE {
            bw.write_bits_leq32(u32::from(b), 8);
        }
    }

    fn make_identification(&self) -> Packet {
        let mut bw = BitWriterRtl::new();

        Encoder::write_header_prelude(&mut bw, PACKET_TYPE_IDENTIFICATION);

        bw.write_bits_leq32(u32::from(FORMAT_VERSION), 8);
        bw.write_bits_leq32(self.spec.channels as u32, 8);
        bw.write_bits_leq32(self.spec.rate, 32);
        bw.write_bits_leq32(u32::from(self.quality), 8);
        bw.write_bits_leq32(u32::from(DEFAULT_BLOCK_SIZE_EXP_0), 4);
        bw.write_bits_leq32(u32::from(DEFAULT_BLOCK_SIZE_EXP_1), 4);

        bw.write_bool(true);

        Packet::new_from_buf(0, bw.finalize())
    }

    fn make_comments(&self, opts: &EncoderOptions) -> Packet {
        let mut bw = BitWriterRtl::new();

        Encoder::write_header_prelude(&mut bw, PACKET_TYPE_COMMENTS);

        write_string(&mut bw, VENDOR);

        bw.write_bits_leq32(opts.comments.len() as u32, 32);

        for (key, value) in opts.comments.iter() {
            write_string(&mut bw, &format!("{}={}", key, value));
        }

        bw.write_bool(true);

        Packet::new_from_buf(0, bw.finalize())
    }

    fn make_setup(&self) -> Packet {
        let mut bw = BitWriterRtl::new();

        Encoder::write_header_prelude(&mut bw, PACKET_TYPE_SETUP);

        bw.write_bits_leq32(1, 8);
        self.codebook.write(&mut bw);

        bw.write_bits_leq32(FLOOR_BANDS as u32, 8);

        bw.write_bool(true);

        Packet::new_from_buf(0, bw.finalize())
    }
}

/// Write one channel's floor envelope and vector-quantized coefficients.
fn write_channel_vq(bw: &mut BitWriterRtl, coeffs: &[f32], codebook: &Codebook) {
    let band_width = floor::band_width(coeffs.len());

    let mut amps = [0.0f32; FLOOR_BANDS];

    for (band, amp) in coeffs.chunks_exact(band_width).zip(amps.iter_mut()) {
        let peak = band.iter().fold(0.0f32, |peak, &c| peak.max(c.abs()));

        let q = floor::quantize_amplitude(peak);
        bw.write_bits_leq32(q, FLOOR_AMP_BITS);

        *amp = floor::amplitude(q);
    }

    let dim = codebook.dimensions();
    let index_bits = codebook.index_bits();

    let mut norm = vec![0.0f32; dim];

    for (j, group) in coeffs.chunks_exact(dim).enumerate() {
        let amp = amps[(j * dim) / band_width];

        for (n, &c) in norm.iter_mut().zip(group) {
            *n = c / amp;
        }

        bw.write_bits_leq32(codebook.quantize(&norm), index_bits);
    }
}

fn write_string(bw: &mut BitWriterRtl, s: &str) {
    bw.write_bits_leq32(s.len() as u32, 32);

    for &b in s.as_bytes() {
        bw.write_bits_leq32(u32::from(b), 8);
    }
}
