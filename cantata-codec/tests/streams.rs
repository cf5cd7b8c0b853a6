// Cantata
// Copyright (c) 2026 The Cantata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end encode and decode tests over whole streams.

use std::f32::consts;

use cantata_codec::{open_decoder, open_encoder, EncoderOptions, MAX_QUALITY};
use cantata_core::audio::{AudioBuffer, SignalSpec};
use cantata_core::errors::Error;
use cantata_core::formats::Packet;

/// Encode a planar signal in 1000-frame chunks and return the full packet sequence.
fn encode_all(planes: Vec<Vec<f32>>, rate: u32, quality: u8) -> Vec<Packet> {
    let spec = SignalSpec::new(rate, planes.len());
    let mut encoder = open_encoder(spec, quality, &EncoderOptions::default()).unwrap();

    let frames = planes[0].len();
    let mut packets = Vec::new();

    let mut pos = 0;
    while pos < frames {
        let end = (pos + 1000).min(frames);

        let chunk: Vec<Vec<f32>> = planes.iter().map(|p| p[pos..end].to_vec()).collect();

        packets.extend(encoder.encode(&AudioBuffer::from_planes(chunk)).unwrap());
        pos = end;
    }

    packets.extend(encoder.finish().unwrap());
    packets
}

/// Decode a packet sequence back into planar audio.
fn decode_all(packets: &[Packet], n_channels: usize) -> Vec<Vec<f32>> {
    let mut decoder = open_decoder();

    let mut planes = vec![Vec::new(); n_channels];

    for packet in packets {
        let buf = decoder.decode(packet).unwrap();

        for (ch, plane) in planes.iter_mut().enumerate() {
            if !buf.is_empty() {
                plane.extend_from_slice(buf.chan(ch));
            }
        }
    }

    planes
}

fn is_audio_packet(packet: &Packet) -> bool {
    packet.buf()[0] & 1 == 0
}

/// Returns the block flag of an audio packet.
fn is_long_block(packet: &Packet) -> bool {
    (packet.buf()[0] >> 1) & 1 == 1
}

#[test]
fn verify_silence_stream() {
    // One second of 44.1 kHz mono silence.
    let packets = encode_all(vec![vec![0.0; 44100]], 44100, 5);

    // Exactly one of each header packet type, in order, ahead of all audio packets.
    let headers: Vec<u8> =
        packets.iter().filter(|p| !is_audio_packet(p)).map(|p| p.buf()[0]).collect();
    assert_eq!(headers, &[1, 3, 5]);
    assert!(packets[3..].iter().all(is_audio_packet));

    let planes = decode_all(&packets, 1);

    assert_eq!(planes[0].len(), 44100);
    assert!(planes[0].iter().all(|&s| s == 0.0));
}

#[test]
fn verify_lossless_round_trip_steady() {
    // A stationary two-tone stereo signal keeps every block long.
    let left: Vec<f32> = (0..8000)
        .map(|t| {
            let t = t as f32 / 8000.0;
            0.4 * (2.0 * consts::PI * 220.0 * t).sin() + 0.2 * (2.0 * consts::PI * 633.0 * t).sin()
        })
        .collect();

    let right: Vec<f32> =
        (0..8000).map(|t| 0.5 * (2.0 * consts::PI * 441.0 * t as f32 / 8000.0).cos()).collect();

    let source = vec![left, right];

    let packets = encode_all(source.clone(), 8000, MAX_QUALITY);
    let decoded = decode_all(&packets, 2);

    for (plane, src) in decoded.iter().zip(&source) {
        assert_eq!(plane.len(), src.len());

        for (&d, &s) in plane.iter().zip(src) {
            assert!((d - s).abs() < 1e-3);
        }
    }
}

#[test]
fn verify_lossless_round_trip_transient() {
    // Silence, then an abrupt burst, then a steady tone. The burst must force a window switch
    // and reconstruction must hold across the short/long transitions.
    let mut source = vec![0.0f32; 3000];

    for t in 0..500 {
        source.push(0.8 * (2.0 * consts::PI * 1800.0 * t as f32 / 8000.0).sin());
    }

    for t in 0..4500 {
        source.push(0.3 * (2.0 * consts::PI * 330.0 * t as f32 / 8000.0).sin());
    }

    let packets = encode_all(vec![source.clone()], 8000, MAX_QUALITY);

    let n_short = packets.iter().filter(|p| is_audio_packet(p) && !is_long_block(p)).count();
    let n_long = packets.iter().filter(|p| is_audio_packet(p) && is_long_block(p)).count();

    assert!(n_short > 0);
    assert!(n_long > 0);

    let decoded = decode_all(&packets, 1);

    assert_eq!(decoded[0].len(), source.len());

    for (&d, &s) in decoded[0].iter().zip(&source) {
        assert!((d - s).abs() < 1e-3);
    }
}

#[test]
fn verify_granules_strictly_monotonic() {
    let source: Vec<f32> =
        (0..20000).map(|t| 0.5 * (2.0 * consts::PI * 100.0 * t as f32 / 16000.0).sin()).collect();

    let packets = encode_all(vec![source], 16000, 2);

    let granules: Vec<u64> =
        packets.iter().filter(|p| is_audio_packet(p)).map(|p| p.granule).collect();

    assert!(granules.windows(2).all(|w| w[0] < w[1]));

    // The final granule records the exact source length.
    assert_eq!(*granules.last().unwrap(), 20000);
}

#[test]
fn verify_audio_first_stream_rejected() {
    let packets = encode_all(vec![vec![0.1; 4000]], 8000, 4);

    let first_audio = packets.iter().find(|p| is_audio_packet(p)).unwrap();

    let mut decoder = open_decoder();

    assert!(matches!(decoder.decode(first_audio), Err(Error::MalformedStream(_))));

    // The decoder is desynchronized; even the valid headers are now refused.
    assert!(matches!(decoder.decode(&packets[0]), Err(Error::MalformedStream(_))));
}

#[test]
fn verify_reset_resumes_mid_stream() {
    let source: Vec<f32> =
        (0..12000).map(|t| 0.6 * (2.0 * consts::PI * 250.0 * t as f32 / 8000.0).sin()).collect();

    let packets = encode_all(vec![source], 8000, MAX_QUALITY);

    // First pass, recording the output of every packet.
    let mut decoder = open_decoder();
    let first_pass: Vec<Vec<f32>> = packets
        .iter()
        .map(|p| {
            let buf = decoder.decode(p).unwrap();
            if buf.num_channels() > 0 { buf.chan(0).to_vec() } else { Vec::new() }
        })
        .collect();

    // Seek: reset and resume a few packets back. The first resumed packet only primes the
    // overlap buffer; every packet after it must reproduce the first pass exactly.
    let resume = packets.len() - 6;

    decoder.reset();

    assert!(decoder.decode(&packets[resume]).unwrap().is_empty());

    for (packet, expected) in packets[resume + 1..].iter().zip(&first_pass[resume + 1..]) {
        assert_eq!(decoder.decode(packet).unwrap().chan(0), expected.as_slice());
    }
}

#[test]
fn verify_open_encoder_rejects_unsupported() {
    let opts = EncoderOptions::default();

    assert!(matches!(
        open_encoder(SignalSpec::new(44100, 0), 5, &opts),
        Err(Error::Unsupported(_))
    ));

    assert!(matches!(
        open_encoder(SignalSpec::new(0, 2), 5, &opts),
        Err(Error::Unsupported(_))
    ));

    assert!(matches!(
        open_encoder(SignalSpec::new(44100, 2), MAX_QUALITY + 1, &opts),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn verify_comments_round_trip() {
    let spec = SignalSpec::new(8000, 1);

    let opts = EncoderOptions {
        comments: vec![
            ("TITLE".to_string(), "Cantata Test".to_string()),
            ("TRACKNUMBER".to_string(), "7".to_string()),
        ],
    };

    let mut encoder = open_encoder(spec, 5, &opts).unwrap();

    let mut packets = encoder.encode(&AudioBuffer::from_planes(vec![vec![0.0; 100]])).unwrap();
    packets.extend(encoder.finish().unwrap());

    let mut decoder = open_decoder();
    for packet in &packets {
        decoder.decode(packet).unwrap();
    }

    assert!(decoder.vendor().starts_with("cantata "));
    assert_eq!(decoder.comments(), &["TITLE=Cantata Test", "TRACKNUMBER=7"]);

    let spec = decoder.signal_spec().unwrap();
    assert_eq!(spec.rate, 8000);
    assert_eq!(spec.channels, 1);
}
