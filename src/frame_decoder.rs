// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives subframe decoding for every channel of one block, inverts inter-channel
//! decorrelation, and verifies the frame's CRC-16.

use crate::errors::{decode_error, invariant_error, Result};
use crate::frame::{ChannelAssignment, FrameHeader};
use crate::io::{BitReader, ByteSource};
use crate::meta::StreamInfo;
use crate::subframe::decode_subframe;

/// The largest block size a frame header can declare (block-size code 7, 16-bit field plus one).
const MAX_BLOCK_SIZE: usize = 65536;

/// Reconstructs interleaved PCM one block at a time, reusing two channel-sized scratch buffers
/// across calls.
pub struct FrameDecoder {
    bit_depth: u32,
    temp0: Vec<i64>,
    temp1: Vec<i64>,
}

impl FrameDecoder {
    pub fn new(bit_depth: u32) -> Self {
        FrameDecoder { bit_depth, temp0: vec![0i64; MAX_BLOCK_SIZE], temp1: vec![0i64; MAX_BLOCK_SIZE] }
    }

    /// Decode the next frame, writing `block_size` samples per channel into `out[ch][off..]`.
    /// Returns `None` at a clean end of stream (no bytes left before the sync byte).
    pub fn decode_block<S: ByteSource>(
        &mut self,
        reader: &mut BitReader<S>,
        stream_info: &StreamInfo,
        out: &mut [Vec<i64>],
        off: usize,
    ) -> Result<Option<(FrameHeader, u32)>> {
        let start = reader.position().0;

        let header = match FrameHeader::read(reader)? {
            Some(h) => h,
            None => return Ok(None),
        };

        stream_info.check_frame(&header)?;

        if out.len() != header.num_channels as usize {
            return invariant_error("output channel count does not match frame");
        }

        let block_size = header.block_size as usize;
        let depth = u32::from(header.bit_depth.unwrap_or(stream_info.bit_depth));

        match header.channel_assignment {
            ChannelAssignment::Independent => {
                for ch in 0..out.len() {
                    decode_subframe(reader, depth, &mut self.temp0[..block_size])?;
                    out[ch][off..off + block_size].copy_from_slice(&self.temp0[..block_size]);
                }
            }
            ChannelAssignment::LeftSide => {
                decode_subframe(reader, depth, &mut self.temp0[..block_size])?;
                decode_subframe(reader, depth + 1, &mut self.temp1[..block_size])?;
                for i in 0..block_size {
                    let left = self.temp0[i];
                    let side = self.temp1[i];
                    out[0][off + i] = left;
                    out[1][off + i] = left - side;
                }
            }
            ChannelAssignment::RightSide => {
                decode_subframe(reader, depth + 1, &mut self.temp0[..block_size])?;
                decode_subframe(reader, depth, &mut self.temp1[..block_size])?;
                for i in 0..block_size {
                    let side = self.temp0[i];
                    let right = self.temp1[i];
                    out[0][off + i] = side + right;
                    out[1][off + i] = right;
                }
            }
            ChannelAssignment::MidSide => {
                decode_subframe(reader, depth, &mut self.temp0[..block_size])?;
                decode_subframe(reader, depth + 1, &mut self.temp1[..block_size])?;
                for i in 0..block_size {
                    let mid = self.temp0[i];
                    let side = self.temp1[i];
                    // Recover the bit that floor((L+R)/2) discarded from the parity of `side`
                    // (L+R and L-R always share parity), then invert in twice the precision.
                    let mid2 = (mid << 1) | (side & 1);
                    out[0][off + i] = (mid2 + side) >> 1;
                    out[1][off + i] = (mid2 - side) >> 1;
                }
            }
        }

        if reader.position().1 != 0 {
            let padding = 8 - reader.position().1;
            if reader.read_uint(padding)? != 0 {
                return decode_error("frame footer padding is not 0");
            }
        }

        let computed_crc16 = reader.crc16();
        let expected_crc16 = reader.read_uint(16)? as u16;
        if expected_crc16 != computed_crc16 {
            return decode_error("crc16");
        }

        let end = reader.position().0;
        let frame_size = end - start;
        if frame_size < 10 {
            return invariant_error("frame size below the 10-byte floor");
        }
        if frame_size > u64::from(u32::MAX) {
            return invariant_error("frame size exceeds u32 range");
        }
        let frame_size = frame_size as u32;

        if stream_info.min_frame_size != 0
            && stream_info.max_frame_size != 0
            && (frame_size < stream_info.min_frame_size || frame_size > stream_info.max_frame_size)
        {
            return invariant_error("frame size outside streaminfo min/max range");
        }

        Ok(Some((header, frame_size)))
    }
}
