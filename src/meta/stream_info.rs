// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, invariant_error, Result};
use crate::frame::FrameHeader;
use crate::io::{BitReader, MemorySource};

/// The `STREAMINFO` metadata block: the one block every FLAC stream must carry, and the only
/// one the decoder cannot proceed without.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub num_channels: u8,
    pub bit_depth: u16,
    pub total_samples: u64,
    pub md5: [u8; 16],
}

/// Raw, on-wire length of the `STREAMINFO` block.
pub const STREAM_INFO_BLOCK_LEN: usize = 34;

impl StreamInfo {
    /// Parse and validate a 34-byte `STREAMINFO` payload.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() != STREAM_INFO_BLOCK_LEN {
            return decode_error("streaminfo block is not 34 bytes");
        }

        let mut r = BitReader::new(MemorySource::new(data.to_vec()));

        let min_block_size = r.read_uint(16)? as u16;
        let max_block_size = r.read_uint(16)? as u16;
        let min_frame_size = r.read_uint(24)?;
        let max_frame_size = r.read_uint(24)?;
        let sample_rate = r.read_uint(20)?;
        let num_channels = r.read_uint(3)? as u8 + 1;
        let bit_depth = r.read_uint(5)? as u16 + 1;
        let total_samples = (u64::from(r.read_uint(18)?) << 18) | u64::from(r.read_uint(18)?);

        let mut md5 = [0u8; 16];
        r.read_exact(&mut md5)?;

        let info = StreamInfo {
            min_block_size,
            max_block_size,
            min_frame_size,
            max_frame_size,
            sample_rate,
            num_channels,
            bit_depth,
            total_samples,
            md5,
        };

        info.validate()?;
        Ok(info)
    }

    fn validate(&self) -> Result<()> {
        if self.min_block_size < 16 {
            return invariant_error("streaminfo: minimum block size less than 16");
        }
        if self.max_block_size < self.min_block_size {
            return invariant_error("streaminfo: maximum block size less than minimum");
        }
        if self.min_frame_size != 0 && self.max_frame_size != 0 && self.max_frame_size < self.min_frame_size {
            return invariant_error("streaminfo: maximum frame size less than minimum");
        }
        if self.sample_rate == 0 || self.sample_rate > 655_350 {
            return invariant_error("streaminfo: sample rate out of range");
        }
        if self.num_channels < 1 || self.num_channels > 8 {
            return invariant_error("streaminfo: channel count out of range");
        }
        if self.bit_depth < 4 || self.bit_depth > 32 {
            return invariant_error("streaminfo: bit depth out of range");
        }
        Ok(())
    }

    /// Cross-check a parsed frame header against this stream's declared properties. Per the
    /// corrected semantics: a header field is only checked when the header actually declares a
    /// value — `None` means "inherit from STREAMINFO" and is never a mismatch.
    pub fn check_frame(&self, header: &FrameHeader) -> Result<()> {
        if header.num_channels != u16::from(self.num_channels) {
            return invariant_error("frame channel count does not match streaminfo");
        }

        if let Some(rate) = header.sample_rate {
            if rate != self.sample_rate {
                return invariant_error("frame sample rate does not match streaminfo");
            }
        }

        if let Some(depth) = header.bit_depth {
            if depth != self.bit_depth {
                return invariant_error("frame bit depth does not match streaminfo");
            }
        }

        if header.block_size > u32::from(self.max_block_size) {
            return invariant_error("frame block size exceeds streaminfo maximum");
        }

        if self.total_samples != 0 && u64::from(header.block_size) > self.total_samples {
            return invariant_error("frame block size exceeds total sample count");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_stream_info(
        min_block: u16,
        max_block: u16,
        min_frame: u32,
        max_frame: u32,
        rate: u32,
        channels: u8,
        depth: u16,
        total_samples: u64,
    ) -> Vec<u8> {
        let mut bits: u128 = 0;
        let mut len = 0u32;
        macro_rules! push {
            ($val:expr, $n:expr) => {{
                bits = (bits << $n) | (($val as u128) & ((1u128 << $n) - 1));
                len += $n;
            }};
        }
        push!(min_block, 16);
        push!(max_block, 16);
        push!(min_frame, 24);
        push!(max_frame, 24);
        push!(rate, 20);
        push!(channels - 1, 3);
        push!(depth - 1, 5);
        push!(total_samples, 36);

        while len % 8 != 0 {
            bits <<= 1;
            len += 1;
        }

        let mut out = Vec::new();
        for i in (0..len / 8).rev() {
            out.push(((bits >> (i * 8)) & 0xff) as u8);
        }
        out.extend_from_slice(&[0u8; 16]); // md5 placeholder
        out
    }

    #[test]
    fn parses_minimal_mono_stream_info() {
        let bytes = encode_stream_info(16, 16, 0, 0, 8000, 1, 8, 16);
        let info = StreamInfo::read(&bytes).unwrap();
        assert_eq!(info.min_block_size, 16);
        assert_eq!(info.max_block_size, 16);
        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.num_channels, 1);
        assert_eq!(info.bit_depth, 8);
        assert_eq!(info.total_samples, 16);
        assert_eq!(info.md5, [0u8; 16]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(StreamInfo::read(&[0u8; 10]).is_err());
    }

    #[test]
    fn rejects_block_size_below_sixteen() {
        let bytes = encode_stream_info(8, 16, 0, 0, 8000, 1, 8, 16);
        assert!(StreamInfo::read(&bytes).is_err());
    }
}
