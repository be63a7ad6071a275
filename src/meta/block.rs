// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, Result};
use crate::io::{BitReader, ByteSource};

/// The metadata block types this crate interprets. Every other type is retained opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataBlockType {
    StreamInfo,
    SeekTable,
    Other(u8),
}

impl MetadataBlockType {
    fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(MetadataBlockType::StreamInfo),
            3 => Ok(MetadataBlockType::SeekTable),
            127 => decode_error("reserved metadata block type"),
            other => Ok(MetadataBlockType::Other(other)),
        }
    }
}

pub struct MetadataBlockHeader {
    pub is_last: bool,
    pub block_type: MetadataBlockType,
    pub block_len: u32,
}

impl MetadataBlockHeader {
    pub fn read<S: ByteSource>(reader: &mut BitReader<S>) -> Result<Self> {
        let is_last = reader.read_uint(1)? == 1;
        let code = reader.read_uint(7)? as u8;
        let block_len = reader.read_uint(24)?;

        Ok(MetadataBlockHeader { is_last, block_type: MetadataBlockType::from_code(code)?, block_len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    #[test]
    fn reads_streaminfo_header() {
        // last=1, type=0, length=34.
        let bytes = [0b1000_0000u8, 0x00, 0x00, 0x22];
        let mut r = BitReader::new(MemorySource::new(bytes.to_vec()));
        let hdr = MetadataBlockHeader::read(&mut r).unwrap();
        assert!(hdr.is_last);
        assert_eq!(hdr.block_type, MetadataBlockType::StreamInfo);
        assert_eq!(hdr.block_len, 34);
    }

    #[test]
    fn rejects_reserved_block_type() {
        let bytes = [0b0111_1111u8, 0xff, 0x00, 0x00];
        let mut r = BitReader::new(MemorySource::new(bytes.to_vec()));
        assert!(MetadataBlockHeader::read(&mut r).is_err());
    }
}
