// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, Result};
use crate::io::{BitReader, ByteSource};

/// The 14 most-significant bits every audio frame begins with.
const FRAME_SYNC: u16 = 0x3ffe;

/// Cap on a UTF-8-encoded `sample_offset` (variable blocking).
const SAMPLE_OFFSET_MAX: u64 = (1 << 36) - 1;

/// Cap on a UTF-8-encoded `frame_index` (fixed blocking).
const FRAME_INDEX_MAX: u64 = (1 << 31) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingStrategy {
    Fixed,
    Variable,
}

/// How the two channels of a stereo frame are decorrelated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAssignment {
    /// Every channel is stored independently; the payload carries `num_channels` subframes.
    Independent,
    /// Channel 0 is Left, channel 1 is Left-minus-Right.
    LeftSide,
    /// Channel 0 is Mid (average), channel 1 is Left-minus-Right.
    MidSide,
    /// Channel 0 is Left-minus-Right, channel 1 is Right.
    RightSide,
}

/// A parsed frame header: everything needed to decode and cross-check the subframes that
/// follow it.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub blocking_strategy: BlockingStrategy,
    /// Set when `blocking_strategy` is `Fixed`.
    pub frame_index: Option<u32>,
    /// Set when `blocking_strategy` is `Variable`.
    pub sample_offset: Option<u64>,
    pub block_size: u32,
    /// `None` means "inherit from STREAMINFO".
    pub sample_rate: Option<u32>,
    pub num_channels: u16,
    pub channel_assignment: ChannelAssignment,
    /// `None` means "inherit from STREAMINFO".
    pub bit_depth: Option<u16>,
}

impl FrameHeader {
    /// Parse one frame header starting at the current reader position. Returns `Ok(None)` only
    /// when the stream ends cleanly before the first sync byte; any other truncation is an
    /// error.
    pub fn read<S: ByteSource>(reader: &mut BitReader<S>) -> Result<Option<Self>> {
        reader.reset_crcs();

        let first_byte = match reader.read_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };

        let second_byte = reader.read_uint(8)? as u8;
        let sync = (u16::from(first_byte) << 6) | u16::from(second_byte >> 2);
        if sync != FRAME_SYNC {
            return decode_error("sync");
        }

        if second_byte & 0b10 != 0 {
            return decode_error("frame header reserved bit is set");
        }

        let blocking_strategy =
            if second_byte & 0b01 == 0 { BlockingStrategy::Fixed } else { BlockingStrategy::Variable };

        let block_size_code = reader.read_uint(4)? as u8;
        let sample_rate_code = reader.read_uint(4)? as u8;
        let channel_assignment_code = reader.read_uint(4)? as u8;
        let bit_depth_code = reader.read_uint(3)? as u8;

        if reader.read_uint(1)? != 0 {
            return decode_error("frame header reserved bit is set");
        }

        let (frame_index, sample_offset) = match blocking_strategy {
            BlockingStrategy::Fixed => {
                let value = read_utf8_be(reader)?;
                if value > FRAME_INDEX_MAX {
                    return decode_error("frame index exceeds 31 bits");
                }
                (Some(value as u32), None)
            }
            BlockingStrategy::Variable => {
                let value = read_utf8_be(reader)?;
                if value > SAMPLE_OFFSET_MAX {
                    return decode_error("sample offset exceeds 36 bits");
                }
                (None, Some(value))
            }
        };

        let block_size = match block_size_code {
            0 => return decode_error("block size set to reserved value"),
            1 => 192,
            2..=5 => 576 * (1u32 << (block_size_code - 2)),
            6 => reader.read_uint(8)? + 1,
            7 => {
                let size = reader.read_uint(16)?;
                if size == 0xffff {
                    return decode_error("block size not allowed to be 65536");
                }
                size + 1
            }
            8..=15 => 256 * (1u32 << (block_size_code - 8)),
            _ => unreachable!(),
        };

        let sample_rate = match sample_rate_code {
            0 => None,
            1 => Some(88_200),
            2 => Some(176_400),
            3 => Some(192_000),
            4 => Some(8_000),
            5 => Some(16_000),
            6 => Some(22_050),
            7 => Some(24_000),
            8 => Some(32_000),
            9 => Some(44_100),
            10 => Some(48_000),
            11 => Some(96_000),
            12 => Some(reader.read_uint(8)?),
            13 => Some(reader.read_uint(16)?),
            14 => Some(reader.read_uint(16)? * 10),
            15 => return decode_error("sample rate set to reserved value"),
            _ => unreachable!(),
        };

        let (num_channels, channel_assignment) = match channel_assignment_code {
            0..=7 => (u16::from(channel_assignment_code) + 1, ChannelAssignment::Independent),
            8 => (2, ChannelAssignment::LeftSide),
            9 => (2, ChannelAssignment::RightSide),
            10 => (2, ChannelAssignment::MidSide),
            _ => return decode_error("channel assignment set to reserved value"),
        };

        let bit_depth = match bit_depth_code {
            0 => None,
            1 => Some(8),
            2 => Some(12),
            4 => Some(16),
            5 => Some(20),
            6 => Some(24),
            _ => return decode_error("bit depth set to reserved value"),
        };

        let computed_crc8 = reader.crc8();
        let expected_crc8 = reader.read_uint(8)? as u8;
        if expected_crc8 != computed_crc8 {
            return decode_error("crc8");
        }

        Ok(Some(FrameHeader {
            blocking_strategy,
            frame_index,
            sample_offset,
            block_size,
            sample_rate,
            num_channels,
            channel_assignment,
            bit_depth,
        }))
    }

    /// The absolute sample index this frame starts at, given the stream's declared maximum
    /// block size (used when no seek table entry is available and for fixed-blocking streams
    /// that only carry a frame index).
    pub fn sample_offset(&self, max_block_size: u32) -> u64 {
        match self.sample_offset {
            Some(offset) => offset,
            None => u64::from(self.frame_index.unwrap_or(0)) * u64::from(max_block_size),
        }
    }
}

/// Decode a big-endian UTF-8-style variable-length integer (up to 36 bits of payload).
fn read_utf8_be<S: ByteSource>(reader: &mut BitReader<S>) -> Result<u64> {
    let first = reader.read_uint(8)? as u8;
    let leading_ones = first.leading_ones();

    if leading_ones == 0 {
        return Ok(u64::from(first));
    }
    if leading_ones == 1 || leading_ones == 8 {
        return decode_error("malformed utf-8 style integer");
    }

    let mask = 0xffu8 >> (leading_ones + 1);
    let mut value = u64::from(first & mask);

    for _ in 0..(leading_ones - 1) {
        let cont = reader.read_uint(8)? as u8;
        if cont & 0xc0 != 0x80 {
            return decode_error("malformed utf-8 style integer continuation byte");
        }
        value = (value << 6) | u64::from(cont & 0x3f);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    fn encode_header(block_size: u32, sample_rate_code: u8, channels_code: u8, bit_depth_code: u8, frame_index: u8) -> Vec<u8> {
        let block_size_code = match block_size {
            192 => 1,
            576 => 2,
            4096 => 12,
            _ => panic!("unsupported test block size"),
        };

        let byte0 = 0xffu8;
        let byte1 = 0xf8u8; // reserved=0, blocking=fixed
        let byte2 = (block_size_code << 4) | sample_rate_code;
        let byte3 = (channels_code << 4) | (bit_depth_code << 1);

        let mut out = vec![byte0, byte1, byte2, byte3, frame_index];

        use crate::checksum::Monitor;
        let mut crc = crate::checksum::Crc8::new(0);
        crc.process_buf_bytes(&out);
        out.push(crc.crc());
        out
    }

    #[test]
    fn parses_minimal_fixed_block_header() {
        let bytes = encode_header(4096, 4, 0, 1, 0);
        let mut r = BitReader::new(MemorySource::new(bytes));
        let header = FrameHeader::read(&mut r).unwrap().unwrap();
        assert_eq!(header.blocking_strategy, BlockingStrategy::Fixed);
        assert_eq!(header.frame_index, Some(0));
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.sample_rate, Some(8_000));
        assert_eq!(header.num_channels, 1);
        assert_eq!(header.channel_assignment, ChannelAssignment::Independent);
        assert_eq!(header.bit_depth, Some(8));
    }

    #[test]
    fn rejects_bad_sync_code() {
        let mut bytes = encode_header(4096, 4, 0, 1, 0);
        bytes[0] = 0x00;
        let mut r = BitReader::new(MemorySource::new(bytes));
        assert!(matches!(FrameHeader::read(&mut r), Err(crate::errors::Error::InvalidData(_))));
    }

    #[test]
    fn rejects_crc8_mismatch() {
        let mut bytes = encode_header(4096, 4, 0, 1, 0);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let mut r = BitReader::new(MemorySource::new(bytes));
        assert!(matches!(FrameHeader::read(&mut r), Err(crate::errors::Error::InvalidData(_))));
    }

    #[test]
    fn returns_none_at_clean_eof() {
        let mut r = BitReader::new(MemorySource::new(vec![]));
        assert!(FrameHeader::read(&mut r).unwrap().is_none());
    }

    #[test]
    fn utf8_decode_round_trips_small_and_multibyte_values() {
        let bytes = vec![0x24, 0xc2, 0xa2, 0xe0, 0xa4, 0xb9];
        let mut r = BitReader::new(MemorySource::new(bytes));
        assert_eq!(read_utf8_be(&mut r).unwrap(), 36);
        assert_eq!(read_utf8_be(&mut r).unwrap(), 162);
        assert_eq!(read_utf8_be(&mut r).unwrap(), 2361);
    }

    #[test]
    fn sample_offset_falls_back_to_frame_index_times_max_block_size() {
        let header = FrameHeader {
            blocking_strategy: BlockingStrategy::Fixed,
            frame_index: Some(3),
            sample_offset: None,
            block_size: 4096,
            sample_rate: None,
            num_channels: 1,
            channel_assignment: ChannelAssignment::Independent,
            bit_depth: None,
        };
        assert_eq!(header.sample_offset(4096), 3 * 4096);
    }
}
