// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, Result};

/// On-wire length of a single seek point entry.
const SEEK_POINT_LEN: usize = 18;

/// Sentinel sample number marking a placeholder seek point, skipped during lookup.
const PLACEHOLDER_SAMPLE: u64 = u64::MAX;

/// A single entry in a `SEEKTABLE` block: the sample number a frame starts at, the byte offset
/// of that frame (relative to the first audio frame), and the number of samples the frame holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPoint {
    pub sample: u64,
    pub offset: u64,
    pub frame_samples: u16,
}

impl SeekPoint {
    fn is_placeholder(&self) -> bool {
        self.sample == PLACEHOLDER_SAMPLE
    }
}

/// A parsed `SEEKTABLE` block: a sorted index of approximate sample-to-byte-offset mappings
/// used to accelerate seeking.
#[derive(Debug, Clone, Default)]
pub struct SeekTable {
    points: Vec<SeekPoint>,
}

impl SeekTable {
    /// Parse a `SEEKTABLE` payload. Placeholder points (`sample == 0xFFFFFFFFFFFFFFFF`) are kept
    /// in their on-wire position but are never returned by `best_seek`.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() % SEEK_POINT_LEN != 0 {
            return decode_error("seek table length is not a multiple of 18 bytes");
        }

        let mut points = Vec::with_capacity(data.len() / SEEK_POINT_LEN);
        let mut last_real_sample: Option<u64> = None;

        for chunk in data.chunks_exact(SEEK_POINT_LEN) {
            let sample = u64::from_be_bytes(chunk[0..8].try_into().unwrap());
            let offset = u64::from_be_bytes(chunk[8..16].try_into().unwrap());
            let frame_samples = u16::from_be_bytes(chunk[16..18].try_into().unwrap());

            let point = SeekPoint { sample, offset, frame_samples };

            if !point.is_placeholder() {
                if let Some(last) = last_real_sample {
                    if sample < last {
                        return decode_error("seek table points are not in ascending order");
                    }
                }
                last_real_sample = Some(sample);
            }

            points.push(point);
        }

        Ok(SeekTable { points })
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(SeekPoint::is_placeholder)
    }

    pub fn points(&self) -> &[SeekPoint] {
        &self.points
    }

    /// Return the seek point with the greatest sample number not exceeding `target_sample`,
    /// falling back to the stream origin when the table is empty or every point starts after
    /// the target.
    pub fn best_seek(&self, target_sample: u64) -> (u64, u64) {
        let mut best = (0u64, 0u64);

        for point in &self.points {
            if point.is_placeholder() {
                continue;
            }
            if point.sample > target_sample {
                continue;
            }
            if point.sample >= best.0 {
                best = (point.sample, point.offset);
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_point(sample: u64, offset: u64, frame_samples: u16) -> [u8; 18] {
        let mut buf = [0u8; 18];
        buf[0..8].copy_from_slice(&sample.to_be_bytes());
        buf[8..16].copy_from_slice(&offset.to_be_bytes());
        buf[16..18].copy_from_slice(&frame_samples.to_be_bytes());
        buf
    }

    #[test]
    fn parses_ascending_seek_points() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_point(0, 0, 4096));
        data.extend_from_slice(&encode_point(4096, 8192, 4096));
        data.extend_from_slice(&encode_point(8192, 16384, 4096));

        let table = SeekTable::read(&data).unwrap();
        assert_eq!(table.points().len(), 3);
        assert!(!table.is_empty());
    }

    #[test]
    fn rejects_misaligned_length() {
        assert!(SeekTable::read(&[0u8; 10]).is_err());
    }

    #[test]
    fn rejects_out_of_order_points() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_point(4096, 8192, 4096));
        data.extend_from_slice(&encode_point(0, 0, 4096));
        assert!(SeekTable::read(&data).is_err());
    }

    #[test]
    fn placeholder_points_are_skipped_and_do_not_break_ordering() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_point(0, 0, 4096));
        data.extend_from_slice(&encode_point(PLACEHOLDER_SAMPLE, 0, 0));
        data.extend_from_slice(&encode_point(4096, 8192, 4096));

        let table = SeekTable::read(&data).unwrap();
        assert_eq!(table.best_seek(5000), (4096, 8192));
    }

    #[test]
    fn best_seek_falls_back_to_origin() {
        let table = SeekTable::read(&[]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.best_seek(1000), (0, 0));
    }

    #[test]
    fn best_seek_picks_closest_point_not_exceeding_target() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_point(0, 0, 4096));
        data.extend_from_slice(&encode_point(4096, 8192, 4096));
        data.extend_from_slice(&encode_point(8192, 16384, 4096));

        let table = SeekTable::read(&data).unwrap();
        assert_eq!(table.best_seek(6000), (4096, 8192));
        assert_eq!(table.best_seek(100_000), (8192, 16384));
    }
}
