// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::{debug, warn};

use cantata_core::audio::{AudioBuffer, SignalSpec};
use cantata_core::errors::{malformed_stream_error, unsupported_error, Result};
use cantata_core::formats::Packet;
use cantata_core::io::BitReaderRtl;

use crate::codebook::Codebook;
use crate::common::*;
use crate::dsp::{Dsp, LappingState};
use crate::floor::{self, FLOOR_AMP_BITS};

/// Open a decoder. Stream parameters arrive in the header packets.
pub fn open_decoder() -> Decoder {
    Decoder::default()
}

/// The packet the decoder expects next.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
enum Stage {
    #[default]
    Identification,
    Comments,
    Setup,
    Audio,
}

struct StreamInfo {
    channels: usize,
    rate: u32,
    quality: u8,
    /// Short and long block sizes.
    n0: usize,
    n1: usize,
}

#[derive(Default)]
pub struct Decoder {
    stage: Stage,
    /// Set after a fatal error. A desynchronized decoder refuses all further packets.
    poisoned: bool,
    info: Option<StreamInfo>,
    vendor: String,
    comments: Vec<String>,
    codebook: Option<Codebook>,
    dsp: Option<Dsp>,
    /// Cumulative samples per channel rendered so far, synced to the last granule position.
    rendered: u64,
    last_granule: Option<u64>,
    /// Set when the end-of-stream packet has been decoded.
    ended: bool,
}

impl Decoder {
    /// Decode one packet, returning the reconstructed audio.
    ///
    /// Header packets and the priming audio packet decode to an empty buffer. A packet is parsed
    /// completely before any per-channel DSP state is mutated, so a failing packet leaves
    /// previously decoded audio unaffected.
    pub fn decode(&mut self, packet: &Packet) -> Result<AudioBuffer> {
        if self.poisoned {
            return malformed_stream_error("decoder: decoder is desynchronized");
        }

        match self.decode_inner(packet) {
            Ok(buf) => Ok(buf),
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Clears the lapping state to support resuming after a seek.
    ///
    /// The headers and codebook are retained. The first audio packet decoded after a reset
    /// primes the overlap buffers and renders nothing; its granule position relocates the output
    /// sample counter.
    pub fn reset(&mut self) {
        if let Some(dsp) = &mut self.dsp {
            dsp.reset();
        }

        self.rendered = 0;
        self.last_granule = None;
        self.ended = false;
    }

    /// The signal specification of the stream, available after the identification header.
    pub fn signal_spec(&self) -> Option<SignalSpec> {
        self.info.as_ref().map(|info| SignalSpec::new(info.rate, info.channels))
    }

    /// The vendor string from the comments header.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// The user comments from the comments header.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    fn decode_inner(&mut self, packet: &Packet) -> Result<AudioBuffer> {
        let mut bs = BitReaderRtl::new(packet.buf());

        // The first bit distinguishes audio packets (0) from header packets (1).
        if bs.read_bool()? {
            self.read_header(&mut bs)?;
            Ok(AudioBuffer::default())
        }
        else {
            self.read_audio(&mut bs)
        }
    }

    fn read_header(&mut self, bs: &mut BitReaderRtl<'_>) -> Result<()> {
        // The low bit of the packet type byte was consumed by the audio/header discriminator.
        let packet_type = 1 | (bs.read_bits_leq32(7)? as u8) << 1;

        for &expected in SIGNATURE {
            if bs.read_bits_leq32(8)? as u8 != expected {
                return malformed_stream_error("header: signature mismatch");
            }
        }

        match (packet_type, self.stage) {
            (PACKET_TYPE_IDENTIFICATION, Stage::Identification) => self.read_identification(bs),
            (PACKET_TYPE_COMMENTS, Stage::Comments) => self.read_comments(bs),
            (PACKET_TYPE_SETUP, Stage::Setup) => self.read_setup(bs),
            _ => malformed_stream_error("header: unexpected packet type for stream state"),
        }
    }

    fn read_identification(&mut self, bs: &mut BitReaderRtl<'_>) -> Result<()> {
        if bs.read_bits_leq32(8)? as u8 != FORMAT_VERSION {
            return unsupported_error("identification: format version");
        }

        let channels = bs.read_bits_leq32(8)? as usize;

        if channels < 1 || channels > MAX_CHANNELS {
            return malformed_stream_error("identification: channel count");
        }

        let rate = bs.read_bits_leq32(32)?;

        if rate == 0 {
            return malformed_stream_error("identification: sample rate");
        }

        let quality = bs.read_bits_leq32(8)? as u8;

        if quality > MAX_QUALITY {
            return unsupported_error("identification: quality");
        }

        let bs0_exp = bs.read_bits_leq32(4)? as u8;
        let bs1_exp = bs.read_bits_leq32(4)? as u8;

        if bs0_exp < MIN_BLOCK_SIZE_EXP || bs1_exp > MAX_BLOCK_SIZE_EXP || bs0_exp > bs1_exp {
            return malformed_stream_error("identification: block sizes");
        }

        if !bs.read_bool()? {
            return malformed_stream_error("identification: framing bit");
        }

        self.info =
            Some(StreamInfo { channels, rate, quality, n0: 1 << bs0_exp, n1: 1 << bs1_exp });

        self.stage = Stage::Comments;
        Ok(())
    }

    fn read_comments(&mut self, bs: &mut BitReaderRtl<'_>) -> Result<()> {
        self.vendor = read_string(bs)?;

        let count = bs.read_bits_leq32(32)?;

        for _ in 0..count {
            self.comments.push(read_string(bs)?);
        }

        if !bs.read_bool()? {
            return malformed_stream_error("comments: framing bit");
        }

        self.stage = Stage::Setup;
        Ok(())
    }

    fn read_setup(&mut self, bs: &mut BitReaderRtl<'_>) -> Result<()> {
        let Some(info) = &self.info else {
            return malformed_stream_error("setup: identification header missing");
        };

        if bs.read_bits_leq32(8)? != 1 {
            return unsupported_error("setup: codebook count");
        }

        let codebook = Codebook::read(bs)?;

        if bs.read_bits_leq32(8)? as usize != FLOOR_BANDS {
            return unsupported_error("setup: floor band count");
        }

        if !bs.read_bool()? {
            return malformed_stream_error("setup: framing bit");
        }

        if bs.bits_left() >= 8 {
            debug!("setup header has {} trailing bits", bs.bits_left());
        }

        self.dsp = Some(Dsp::new(info.channels, info.n0, info.n1));
        self.codebook = Some(codebook);

        self.stage = Stage::Audio;
        Ok(())
    }

    fn read_audio(&mut self, bs: &mut BitReaderRtl<'_>) -> Result<AudioBuffer> {
        if self.stage != Stage::Audio {
            return malformed_stream_error("audio: audio packet before headers");
        }

        if self.ended {
            return malformed_stream_error("audio: audio packet after end of stream");
        }

        // Unwraps would be sound at this stage, but keep every failure an explicit error.
        let (Some(info), Some(codebook), Some(dsp)) =
            (&self.info, &self.codebook, &mut self.dsp)
        else {
            return malformed_stream_error("audio: stream state missing");
        };

        let block_flag = bs.read_bool()?;

        // The transmitted previous window flag is ignored. The decoder derives the left overlap
        // from its own lapping state, which is authoritative after a seek.
        let (_prev_window_flag, next_window_flag) = if block_flag {
            (bs.read_bool()?, bs.read_bool()?)
        }
        else {
            (false, false)
        };

        let eos = bs.read_bool()?;

        let granule =
            u64::from(bs.read_bits_leq32(32)?) | (u64::from(bs.read_bits_leq32(32)?) << 32);

        let n = if block_flag { info.n1 } else { info.n0 };
        let m = n / 2;

        // Parse every channel's coefficients before touching any DSP state.
        let mut coeffs = vec![0.0f32; info.channels * m];

        for channel in coeffs.chunks_exact_mut(m) {
            if info.quality == MAX_QUALITY {
                for c in channel.iter_mut() {
                    *c = f32::from_bits(bs.read_bits_leq32(32)?);
                }
            }
            else {
                read_channel_vq(bs, channel, codebook)?;
            }
        }

        if bs.bits_left() >= 8 {
            debug!("audio packet has {} trailing bits", bs.bits_left());
        }

        // The packet is fully parsed; synthesize.
        let prev_flag =
            dsp.lapping_state.as_ref().map_or(true, |lap| lap.prev_block_size == info.n1);

        let render_len = dsp.render_len(n);

        let mut out = AudioBuffer::new(info.channels, render_len);

        let win = dsp.windows.window(block_flag, prev_flag, next_window_flag);

        let mdct = if block_flag { &mut dsp.mdct_long } else { &mut dsp.mdct_short };

        for (ch, channel) in dsp.channels.iter_mut().enumerate() {
            channel.coeffs[..m].copy_from_slice(&coeffs[ch * m..(ch + 1) * m]);
            channel.synth(n, &dsp.lapping_state, win, mdct, out.chan_mut(ch));
        }

        dsp.lapping_state = Some(LappingState { prev_block_size: n });

        if let Some(last) = self.last_granule {
            if granule <= last {
                warn!("granule position went backwards: {} after {}", granule, last);
            }
        }
        self.last_granule = Some(granule);

        // A granule position short of the natural sample count marks encoder padding to trim.
        let natural = self.rendered + render_len as u64;

        if granule < natural {
            let trim = (natural - granule) as usize;
            out.truncate(render_len.saturating_sub(trim));
        }

        self.rendered = granule;
        self.ended = eos;

        Ok(out)
    }
}

/// Read one channel's floor envelope and vector-quantized coefficients.
fn read_channel_vq(
    bs: &mut BitReaderRtl<'_>,
    coeffs: &mut [f32],
    codebook: &Codebook,
) -> Result<()> {
    let band_width = floor::band_width(coeffs.len());

    let mut amps = [0.0f32; FLOOR_BANDS];

    for amp in amps.iter_mut() {
        *amp = floor::amplitude(bs.read_bits_leq32(FLOOR_AMP_BITS)?);
    }

    let dim = codebook.dimensions();
    let index_bits = codebook.index_bits();

    for (j, group) in coeffs.chunks_exact_mut(dim).enumerate() {
        let index = bs.read_bits_leq32(index_bits)?;

        let entry = codebook.entry(index)?;

        let amp = amps[(j * dim) / band_width];

        for (c, &e) in group.iter_mut().zip(entry) {
            *c = e * amp;
        }
    }

    Ok(())
}

fn read_string(bs: &mut BitReaderRtl<'_>) -> Result<String> {
    let len = bs.read_bits_leq32(32)?;

    // Reject lengths the packet cannot possibly hold before allocating.
    if u64::from(len) * 8 > bs.bits_left() {
        return malformed_stream_error("header: string length exceeds packet");
    }

    let mut bytes = Vec::with_capacity(len as usize);

    for _ in 0..len {
        bytes.push(bs.read_bits_leq32(8)? as u8);
    }

    String::from_utf8(bytes).or(malformed_stream_error("header: string is not utf-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{open_encoder, EncoderOptions};
    use cantata_core::errors::Error;

    use std::f32::consts;

    /// Encode one second of a quiet 220 Hz sine at the given quality and return the packets.
    fn sine_stream(quality: u8) -> Vec<Packet> {
        let spec = SignalSpec::new(8000, 1);
        let mut encoder = open_encoder(spec, quality, &EncoderOptions::default()).unwrap();

        let samples: Vec<f32> = (0..8000)
            .map(|t| 0.3 * (2.0 * consts::PI * 220.0 * t as f32 / 8000.0).sin())
            .collect();

        let mut packets = encoder.encode(&AudioBuffer::from_planes(vec![samples])).unwrap();
        packets.extend(encoder.finish().unwrap());
        packets
    }

    /// Overwrite `width` bits at bit position `pos` of an LSB-first packed buffer.
    fn patch_bits(buf: &mut [u8], pos: usize, value: u32, width: u32) {
        for k in 0..width as usize {
            let bit = (value >> k) & 1;
            let byte = (pos + k) / 8;
            let mask = 1u8 << ((pos + k) % 8);

            if bit == 1 {
                buf[byte] |= mask;
            }
            else {
                buf[byte] &= !mask;
            }
        }
    }

    #[test]
    fn verify_audio_before_headers_is_malformed() {
        let packets = sine_stream(3);

        let mut decoder = open_decoder();

        // Packet 3 is the first audio packet.
        let err = decoder.decode(&packets[3]).unwrap_err();
        assert!(matches!(err, Error::MalformedStream(_)));
    }

    #[test]
    fn verify_headers_out_of_order_are_malformed() {
        let packets = sine_stream(3);

        let mut decoder = open_decoder();
        decoder.decode(&packets[0]).unwrap();

        // Presenting the setup header where the comments header belongs is fatal.
        let err = decoder.decode(&packets[2]).unwrap_err();
        assert!(matches!(err, Error::MalformedStream(_)));
    }

    #[test]
    fn verify_corrupt_codebook_index() {
        let packets = sine_stream(3);

        let mut decoder = open_decoder();

        // Decode the headers and the first three audio packets cleanly.
        let mut clean_samples = 0;

        for packet in &packets[..6] {
            clean_samples += decoder.decode(packet).unwrap().frames();
        }

        // Quality 3 yields a 169 entry codebook addressed by 8-bit indices. Overwrite the first
        // index field of the next packet with the first out-of-range value. A steady tone keeps
        // every block long, so the field begins after the 5 flag bits, the 64 granule bits, and
        // the 16 six-bit floor amplitudes.
        let mut data = packets[6].buf().to_vec();
        patch_bits(&mut data, 69 + 96, 169, 8);

        let corrupt = Packet::new_from_buf(packets[6].granule, data);

        let err = decoder.decode(&corrupt).unwrap_err();
        assert!(matches!(err, Error::InvalidCodebookIndex(169)));

        // Earlier packets produced output, and the failure poisons the decoder.
        assert!(clean_samples > 0);

        let err = decoder.decode(&packets[7]).unwrap_err();
        assert!(matches!(err, Error::MalformedStream(_)));
    }

    #[test]
    fn verify_truncated_audio_packet() {
        let packets = sine_stream(3);

        let mut decoder = open_decoder();

        for packet in &packets[..3] {
            decoder.decode(packet).unwrap();
        }

        let data = packets[3].buf()[..8].to_vec();
        let truncated = Packet::new_from_buf(packets[3].granule, data);

        assert!(matches!(decoder.decode(&truncated), Err(Error::OutOfBounds)));
    }
}
