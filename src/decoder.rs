// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level stream driver: reads the magic and metadata chain, hands audio blocks off to
//! [`FrameDecoder`], and implements sample-accurate seeking.

use log::{debug, trace, warn};

use crate::errors::{decode_error, invariant_error, Error, Result};
use crate::frame::FrameHeader;
use crate::frame_decoder::FrameDecoder;
use crate::io::{BitReader, ByteSource};
use crate::meta::{MetadataBlockHeader, MetadataBlockType, SeekTable, StreamInfo};

/// The four magic bytes every FLAC stream starts with.
const FLAC_MAGIC: [u8; 4] = *b"fLaC";

/// A sample-gap threshold past which an imprecise seek-table hit is abandoned in favor of a
/// binary-search sync scan.
const SEEK_TABLE_SLOP: u64 = 300_000;

/// Binary search over the byte range narrows to this width before handing off to a final
/// linear scan for the first valid frame.
const SYNC_SCAN_WINDOW: u64 = 100_000;

/// Decodes a FLAC stream: metadata ingestion, audio block iteration, and seeking.
pub struct Decoder<S: ByteSource> {
    reader: BitReader<S>,
    stream_info: StreamInfo,
    seek_table: Option<SeekTable>,
    frame_decoder: FrameDecoder,
    metadata_end_pos: u64,
    /// Scratch channel buffers used only by `seek`, sized to the largest frame a header can
    /// declare (not just `stream_info.max_block_size`, since a malformed-but-parseable header
    /// could declare up to 65536 samples).
    scratch: Vec<Vec<i64>>,
}

impl<S: ByteSource> Decoder<S> {
    /// Open a stream: validate the magic, ingest every metadata block up to and including the
    /// last one, and construct the frame decoder from the mandatory `STREAMINFO`.
    pub fn new(source: S) -> Result<Self> {
        let mut reader = BitReader::new(source);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != FLAC_MAGIC {
            return decode_error("missing flac stream marker");
        }

        let mut stream_info: Option<StreamInfo> = None;
        let mut seek_table: Option<SeekTable> = None;

        loop {
            let header = MetadataBlockHeader::read(&mut reader)?;
            let mut block = vec![0u8; header.block_len as usize];
            reader.read_exact(&mut block)?;

            match header.block_type {
                MetadataBlockType::StreamInfo => {
                    if stream_info.is_some() {
                        return invariant_error("more than one streaminfo block");
                    }
                    stream_info = Some(StreamInfo::read(&block)?);
                }
                MetadataBlockType::SeekTable => {
                    if seek_table.is_some() {
                        return invariant_error("more than one seek table block");
                    }
                    seek_table = Some(SeekTable::read(&block)?);
                }
                MetadataBlockType::Other(code) => {
                    trace!("discarding {} bytes of metadata block type {}", block.len(), code);
                }
            }

            if header.is_last {
                break;
            }
        }

        let stream_info = match stream_info {
            Some(info) => info,
            None => return invariant_error("stream is missing its streaminfo block"),
        };

        let metadata_end_pos = reader.position().0;
        debug!(
            "metadata ingested: {} channel(s), {} Hz, {}-bit, first frame at byte {}",
            stream_info.num_channels, stream_info.sample_rate, stream_info.bit_depth, metadata_end_pos
        );

        let frame_decoder = FrameDecoder::new(u32::from(stream_info.bit_depth));
        let num_channels = stream_info.num_channels as usize;
        let scratch = vec![vec![0i64; 65536]; num_channels];

        Ok(Decoder { reader, stream_info, seek_table, frame_decoder, metadata_end_pos, scratch })
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.stream_info
    }

    pub fn seek_table(&self) -> Option<&SeekTable> {
        self.seek_table.as_ref()
    }

    /// Decode the next audio block into `out[ch][off..off + samples]`. Returns the number of
    /// samples decoded per channel, or 0 at the clean end of the stream.
    pub fn read_audio_block(&mut self, out: &mut [Vec<i64>], off: usize) -> Result<usize> {
        match self.frame_decoder.decode_block(&mut self.reader, &self.stream_info, out, off)? {
            Some((header, _frame_size)) => Ok(header.block_size as usize),
            None => Ok(0),
        }
    }

    /// Seek to `target_sample` and decode the block that contains it, copying
    /// `[target_sample - block_start, block_size)` into `out[ch][off..]`.
    pub fn seek(&mut self, target_sample: u64, out: &mut [Vec<i64>], off: usize) -> Result<usize> {
        if self.stream_info.total_samples != 0 && target_sample >= self.stream_info.total_samples {
            return decode_error("seek target is at or past the end of the stream");
        }

        let (table_sample, table_offset) = match &self.seek_table {
            Some(table) if !table.is_empty() => table.best_seek(target_sample),
            _ => (0, 0),
        };

        let table_usable = self.seek_table.as_ref().map(|t| !t.is_empty()).unwrap_or(false);
        let use_sync_scan = !table_usable || target_sample - table_sample > SEEK_TABLE_SLOP;

        let abs_pos = if use_sync_scan {
            let (offset, _header) = self.seek_by_sync_scan(target_sample)?;
            offset
        } else {
            self.metadata_end_pos + table_offset
        };

        self.reader.seek(abs_pos)?;

        loop {
            let decoded =
                self.frame_decoder.decode_block(&mut self.reader, &self.stream_info, &mut self.scratch, 0)?;

            let (header, _frame_size) = match decoded {
                Some(h) => h,
                None => return decode_error("reached end of stream before the target sample"),
            };

            let block_start = header.sample_offset(u32::from(self.stream_info.max_block_size));
            let block_size = u64::from(header.block_size);

            if target_sample >= block_start && target_sample < block_start + block_size {
                let start = (target_sample - block_start) as usize;
                let count = block_size as usize - start;

                for (dst, src) in out.iter_mut().zip(self.scratch.iter()) {
                    dst[off..off + count].copy_from_slice(&src[start..start + count]);
                }

                return Ok(count);
            }
        }
    }

    /// Binary search `[metadata_end_pos, stream length)` for the first frame at or after
    /// `target`, narrowing by frame sample offsets until the window is small enough for a final
    /// linear scan.
    fn seek_by_sync_scan(&mut self, target: u64) -> Result<(u64, FrameHeader)> {
        let length = self.reader.source().length();
        let mut lo = self.metadata_end_pos;
        let mut hi = length;

        while hi.saturating_sub(lo) > SYNC_SCAN_WINDOW {
            let mid = lo + (hi - lo) / 2;

            match self.next_frame(mid)? {
                Some((offset, header)) => {
                    let sample = header.sample_offset(u32::from(self.stream_info.max_block_size));
                    if sample > target {
                        hi = offset;
                    } else {
                        lo = offset + 1;
                    }
                }
                None => hi = mid,
            }
        }

        match self.next_frame(lo)? {
            Some(found) => Ok(found),
            None => decode_error("sync scan found no frame before the end of the stream"),
        }
    }

    /// Scan forward from `pos` for the `FF F8..F9..` sync pattern, attempting to parse a frame
    /// header at each candidate. A candidate that fails to parse as a valid header is not a
    /// frame boundary; scanning resumes two bytes past it. Returns `None` only at true EOF.
    fn next_frame(&mut self, pos: u64) -> Result<Option<(u64, FrameHeader)>> {
        let mut scan_from = pos;

        loop {
            self.reader.seek(scan_from)?;

            let candidate = {
                let mut prev: Option<u8> = None;
                loop {
                    let byte = match self.reader.read_byte()? {
                        Some(b) => b,
                        None => return Ok(None),
                    };
                    if let Some(p) = prev {
                        if p == 0xff && (byte & 0xfe) == 0xf8 {
                            break self.reader.position().0 - 2;
                        }
                    }
                    prev = Some(byte);
                }
            };

            self.reader.seek(candidate)?;
            match FrameHeader::read(&mut self.reader) {
                Ok(Some(header)) => return Ok(Some((candidate, header))),
                Ok(None) => return Ok(None),
                Err(Error::InvalidData(msg)) => {
                    warn!("rejected sync candidate at byte {}: {}", candidate, msg);
                    scan_from = candidate + 2;
                }
                Err(Error::UnexpectedEof) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}
