// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A pure Rust decoder core for the Free Lossless Audio Codec (FLAC) stream format.
//!
//! This crate reconstructs interleaved integer PCM, channel by channel, from a seekable FLAC
//! byte stream, with bit-exact fidelity to the encoder's input and support for random access to
//! any sample position. It owns the hard part of a FLAC decoder: a bit-level reader that decodes
//! Rice-coded residuals with precomputed lookup tables while tracking CRC-8/CRC-16 over the
//! underlying bytes; a frame and subframe decoder that reconstructs audio from fixed and
//! linear-predictive residuals and inverts inter-channel decorrelation; and a sample-accurate
//! seek engine that combines an optional seek-point index with a binary-search sync scan.
//!
//! Out of scope: the byte source's own I/O backend beyond the two implementations provided here,
//! command-line parsing, container/WAV muxing, metadata blocks other than `STREAMINFO` and
//! `SEEKTABLE`, and whole-stream MD5 verification.

mod checksum;
mod decoder;
mod errors;
mod frame;
mod frame_decoder;
mod io;
mod meta;
mod subframe;

pub use decoder::Decoder;
pub use errors::{Error, Result};
pub use frame::{BlockingStrategy, ChannelAssignment, FrameHeader};
pub use io::{ByteSource, FileSource, MemorySource};
pub use meta::{SeekPoint, SeekTable, StreamInfo};
