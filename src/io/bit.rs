// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use once_cell::sync::Lazy;

use crate::checksum::{Crc16, Crc8, Monitor};
use crate::errors::{decode_error, eof_error, Error, Result};
use crate::io::source::ByteSource;

/// Size of the internal byte buffer refilled from the underlying `ByteSource`.
const BUF_LEN: usize = 4096;

/// Width, in bits, of the Rice decode lookup window.
const RICE_LOOKUP_BITS: u32 = 13;
const RICE_LOOKUP_LEN: usize = 1 << RICE_LOOKUP_BITS;
const RICE_LOOKUP_MASK: u32 = (RICE_LOOKUP_LEN as u32) - 1;

/// Highest Rice parameter a 5-bit residual coding-method field can carry.
const RICE_MAX_PARAM: usize = 30;

/// Residuals are decoded four at a time when the lookahead window supports it.
const RICE_BATCH_CHUNK: usize = 4;

struct RiceTable {
    /// Bits consumed for a given 13-bit lookahead window, or 0 if the code is longer than 13
    /// bits and must fall back to the scalar path.
    consumed: Box<[u8; RICE_LOOKUP_LEN]>,
    value: Box<[i32; RICE_LOOKUP_LEN]>,
}

fn zigzag_decode(i: u64) -> i32 {
    let v = (i >> 1) as i64;
    let sign = -((i & 1) as i64);
    (v ^ sign) as i32
}

fn build_rice_tables() -> Vec<RiceTable> {
    (0..=RICE_MAX_PARAM)
        .map(|param| {
            let param = param as u32;
            let mut consumed = Box::new([0u8; RICE_LOOKUP_LEN]);
            let mut value = Box::new([0i32; RICE_LOOKUP_LEN]);

            let mut i: u64 = 0;
            loop {
                let num_bits = (i >> param) + 1 + u64::from(param);
                if num_bits > u64::from(RICE_LOOKUP_BITS) {
                    break;
                }

                let r_mask = (1u64 << param) - 1;
                let bits = (1u64 << param) | (i & r_mask);
                let shift = RICE_LOOKUP_BITS - num_bits as u32;

                for j in 0..(1u32 << shift) {
                    let idx = ((bits << shift) as u32 | j) as usize;
                    consumed[idx] = num_bits as u8;
                    value[idx] = zigzag_decode(i);
                }

                i += 1;
            }

            RiceTable { consumed, value }
        })
        .collect()
}

static RICE_TABLES: Lazy<Vec<RiceTable>> = Lazy::new(build_rice_tables);

/// Reads big-endian bits on top of a [`ByteSource`], maintaining a byte buffer, a bit
/// accumulator, and running CRC-8/CRC-16 accumulators over the bytes consumed since the last
/// reset.
pub struct BitReader<S: ByteSource> {
    source: S,

    buf: Box<[u8; BUF_LEN]>,
    buf_len: usize,
    buf_pos: usize,
    buf_start_pos: u64,

    bits: u64,
    bits_len: u32,

    crc8: Crc8,
    crc16: Crc16,
    crc_start: usize,
}

impl<S: ByteSource> BitReader<S> {
    pub fn new(source: S) -> Self {
        let pos = source.position();
        BitReader {
            source,
            buf: Box::new([0u8; BUF_LEN]),
            buf_len: 0,
            buf_pos: 0,
            buf_start_pos: pos,
            bits: 0,
            bits_len: 0,
            crc8: Crc8::new(0),
            crc16: Crc16::new(0),
            crc_start: 0,
        }
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Byte offset of the next bit this reader will yield, and the bit offset (0..8) within
    /// that byte.
    pub fn position(&self) -> (u64, u8) {
        let pending_bytes = u64::from((self.bits_len + 7) / 8);
        let byte_pos = self.buf_start_pos + self.buf_pos as u64 - pending_bytes;
        let bit_pos = ((8 - self.bits_len % 8) % 8) as u8;
        (byte_pos, bit_pos)
    }

    /// Reposition to an absolute byte offset, discarding both buffers and the running CRCs.
    pub fn seek(&mut self, byte_pos: u64) -> Result<()> {
        self.source.seek(byte_pos)?;
        self.buf_len = 0;
        self.buf_pos = 0;
        self.buf_start_pos = byte_pos;
        self.bits = 0;
        self.bits_len = 0;
        self.crc_start = 0;
        self.crc8.reset(0);
        self.crc16.reset(0);
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        // Commit every byte pulled from the current buffer (and not yet flushed) to the running
        // CRCs before the buffer's contents are discarded.
        self.update_crcs(0);

        self.buf_start_pos += self.buf_len as u64;

        match self.source.read(&mut self.buf[..])? {
            Some(n) => {
                debug_assert!(n > 0);
                self.buf_len = n;
            }
            None => {
                self.buf_len = 0;
            }
        }

        self.buf_pos = 0;
        self.crc_start = 0;
        Ok(())
    }

    #[inline(always)]
    fn next_byte(&mut self) -> Result<u8> {
        if self.buf_pos >= self.buf_len {
            self.refill()?;
            if self.buf_pos >= self.buf_len {
                return eof_error();
            }
        }

        let byte = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Ok(byte)
    }

    /// Pulls a byte into the bit accumulator without the EOF-to-error path, for the Rice batch
    /// fast path's refill step. Returns `false` if no more bytes are currently buffered.
    #[inline(always)]
    fn try_fill_from_buffer(&mut self) -> bool {
        if self.buf_pos >= self.buf_len || self.bits_len > 56 {
            return false;
        }
        self.bits = (self.bits << 8) | u64::from(self.buf[self.buf_pos]);
        self.buf_pos += 1;
        self.bits_len += 8;
        true
    }

    /// Read the next `n` (0..=32) bits, most-significant-bit first.
    #[inline(always)]
    pub fn read_uint(&mut self, n: u8) -> Result<u32> {
        debug_assert!(n <= 32);

        while self.bits_len < u32::from(n) {
            let byte = self.next_byte()?;
            self.bits = (self.bits << 8) | u64::from(byte);
            self.bits_len += 8;
        }

        let shift = self.bits_len - u32::from(n);
        let result = if n == 32 {
            (self.bits >> shift) as u32
        } else {
            ((self.bits >> shift) & ((1u64 << n) - 1)) as u32
        };

        self.bits_len -= u32::from(n);
        Ok(result)
    }

    /// Read `n` (1..=32) bits and sign-extend the result.
    #[inline(always)]
    pub fn read_signed(&mut self, n: u8) -> Result<i32> {
        let u = self.read_uint(n)?;
        Ok(sign_extend_u32_to_i32(u, n))
    }

    /// Count zero bits up to and including the terminating one bit; returns the zero count.
    #[inline(always)]
    pub fn read_unary_zeros(&mut self) -> Result<u32> {
        let mut count = 0u32;
        while self.read_uint(1)? == 0 {
            count += 1;
        }
        Ok(count)
    }

    /// Read a byte-aligned byte, or `None` at end of stream.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        debug_assert_eq!(self.bits_len % 8, 0, "read_byte called off a byte boundary");

        if self.bits_len >= 8 {
            return self.read_uint(8).map(|v| Some(v as u8));
        }

        match self.next_byte() {
            Ok(b) => Ok(Some(b)),
            Err(Error::UnexpectedEof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fill a byte-aligned buffer, failing on a short read.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(self.bits_len % 8, 0, "read_exact called off a byte boundary");

        for slot in buf.iter_mut() {
            *slot = self.read_uint(8)? as u8;
        }
        Ok(())
    }

    /// Reset both CRC accumulators; subsequent `crc8()`/`crc16()` calls cover bytes consumed
    /// from this point forward.
    pub fn reset_crcs(&mut self) {
        debug_assert_eq!(self.bits_len % 8, 0, "reset_crcs called off a byte boundary");
        self.crc_start = self.buf_pos - (self.bits_len / 8) as usize;
        self.crc8.reset(0);
        self.crc16.reset(0);
    }

    fn update_crcs(&mut self, unused_trailing_bytes: usize) {
        let end = self.buf_pos - unused_trailing_bytes;
        for i in self.crc_start..end {
            let byte = self.buf[i];
            self.crc8.process_byte(byte);
            self.crc16.process_byte(byte);
        }
        self.crc_start = end;
    }

    /// CRC-8 over every byte consumed since the last reset (trailing unread buffered bytes
    /// excluded). Byte-aligned only.
    pub fn crc8(&mut self) -> u8 {
        debug_assert_eq!(self.bits_len % 8, 0, "crc8 read off a byte boundary");
        self.update_crcs((self.bits_len / 8) as usize);
        self.crc8.crc()
    }

    /// CRC-16 over every byte consumed since the last reset (trailing unread buffered bytes
    /// excluded). Byte-aligned only.
    pub fn crc16(&mut self) -> u16 {
        debug_assert_eq!(self.bits_len % 8, 0, "crc16 read off a byte boundary");
        self.update_crcs((self.bits_len / 8) as usize);
        self.crc16.crc()
    }

    /// Decode `end - start` signed Rice-coded residuals with parameter `param` into
    /// `out[start..end]`.
    pub fn read_rice_batch(&mut self, param: u8, out: &mut [i64], start: usize, end: usize) -> Result<()> {
        if param as usize > RICE_MAX_PARAM {
            return decode_error("rice parameter out of range");
        }

        let table = &RICE_TABLES[param as usize];
        let unary_limit = 1u64 << (53 - u32::from(param));

        let mut pos = start;
        let needed = (RICE_BATCH_CHUNK as u32) * RICE_LOOKUP_BITS;

        // Batch path: decode four residuals at a time from the lookup table. Windows are only
        // peeked (not committed) until all four in the group resolve, so a miss partway through
        // never double-consumes or double-writes a residual.
        while pos + RICE_BATCH_CHUNK <= end {
            while self.bits_len < needed {
                if !self.try_fill_from_buffer() {
                    break;
                }
            }
            if self.bits_len < needed {
                break;
            }

            let mut windows = [0usize; RICE_BATCH_CHUNK];
            let mut total_consumed = 0u32;
            let mut miss = false;

            for w in windows.iter_mut() {
                let shift = self.bits_len - total_consumed - RICE_LOOKUP_BITS;
                let window = ((self.bits >> shift) & u64::from(RICE_LOOKUP_MASK)) as usize;
                let consumed = table.consumed[window];
                if consumed == 0 {
                    miss = true;
                    break;
                }
                *w = window;
                total_consumed += u32::from(consumed);
            }

            if miss {
                break;
            }

            self.bits_len -= total_consumed;
            for (i, &window) in windows.iter().enumerate() {
                out[pos + i] = i64::from(table.value[window]);
            }
            pos += RICE_BATCH_CHUNK;
        }

        // Scalar path: handles the tail, any group the batch path couldn't fill, and any code
        // longer than the lookup window.
        while pos < end {
            let mut q: u64 = 0;
            while self.read_uint(1)? == 0 {
                q += 1;
                if q >= unary_limit {
                    return decode_error("rice residual too large");
                }
            }
            let r = u64::from(self.read_uint(param.into())?);
            let combined = (q << param) | r;
            out[pos] = i64::from(zigzag_decode(combined));
            pos += 1;
        }

        Ok(())
    }
}

/// Sign-extend the low `n` bits of `u` (treated as an `n`-bit two's complement value) to `i32`.
#[inline(always)]
pub fn sign_extend_u32_to_i32(u: u32, n: u8) -> i32 {
    if n == 0 {
        return 0;
    }
    let shift = 32 - u32::from(n);
    ((u << shift) as i32) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::source::MemorySource;

    fn reader(bytes: &[u8]) -> BitReader<MemorySource> {
        BitReader::new(MemorySource::new(bytes.to_vec()))
    }

    #[test]
    fn read_uint_round_trips_every_width() {
        let mut r = reader(&[0b1011_0110, 0b1100_1010, 0b0001_1111, 0b1111_1111]);
        assert_eq!(r.read_uint(4).unwrap(), 0b1011);
        assert_eq!(r.read_uint(4).unwrap(), 0b0110);
        assert_eq!(r.read_uint(16).unwrap(), 0b1100_1010_0001_1111);
        assert_eq!(r.read_uint(8).unwrap(), 0b1111_1111);
    }

    #[test]
    fn read_uint_32_uses_full_mask() {
        let mut r = reader(&[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(r.read_uint(32).unwrap(), 0xffff_ffff);
    }

    #[test]
    fn read_signed_sign_extends() {
        let mut r = reader(&[0b1000_0000]);
        assert_eq!(r.read_signed(4).unwrap(), -8);

        let mut r2 = reader(&[0b0111_0000]);
        assert_eq!(r2.read_signed(4).unwrap(), 7);
    }

    #[test]
    fn read_byte_reports_eof_as_none() {
        let mut r = reader(&[0xab]);
        assert_eq!(r.read_byte().unwrap(), Some(0xab));
        assert_eq!(r.read_byte().unwrap(), None);
    }

    #[test]
    fn eof_mid_field_is_an_error() {
        let mut r = reader(&[0xff]);
        assert!(matches!(r.read_uint(16), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn crc8_matches_known_value() {
        // CRC-8/CCITT (poly 0x07, normal form, init 0) over ASCII "123456789" is 0xF4.
        let mut r = reader(b"123456789");
        r.reset_crcs();
        for _ in 0..9 {
            r.read_uint(8).unwrap();
        }
        assert_eq!(r.crc8(), 0xf4);
    }

    #[test]
    fn rice_batch_matches_scalar_decode_for_small_values() {
        // Encode values [0, -1, 1, -2] with param 2 by hand: zigzag(0)=0, zigzag(-1)=1,
        // zigzag(1)=2, zigzag(-2)=3; each fits entirely in the remainder (q=0) since param=2
        // covers values 0..=3 in the remainder alone.
        let param = 2u8;
        let mut bits: Vec<u8> = Vec::new();
        let mut acc: u64 = 0;
        let mut acc_len = 0u32;
        for &zz in &[0u32, 1, 2, 3] {
            // unary terminator '1' then 2-bit remainder.
            acc = (acc << 1) | 1;
            acc_len += 1;
            acc = (acc << 2) | u64::from(zz);
            acc_len += 2;
        }
        while acc_len % 8 != 0 {
            acc <<= 1;
            acc_len += 1;
        }
        for i in (0..acc_len / 8).rev() {
            bits.push(((acc >> (i * 8)) & 0xff) as u8);
        }

        let mut r = reader(&bits);
        let mut out = [0i64; 4];
        r.read_rice_batch(param, &mut out, 0, 4).unwrap();
        assert_eq!(out, [0, -1, 1, -2]);
    }

    #[test]
    fn rice_batch_falls_back_to_scalar_for_long_codes() {
        // param=0, value 20 -> zigzag(20)=40 -> q=40, 40 unary zero bits then a terminating 1,
        // far longer than the 13-bit lookup window, forcing the scalar path.
        let mut bits = Vec::new();
        let mut bitbuf = String::new();
        bitbuf.push_str(&"0".repeat(40));
        bitbuf.push('1');
        while bitbuf.len() % 8 != 0 {
            bitbuf.push('0');
        }
        for chunk in bitbuf.as_bytes().chunks(8) {
            let mut byte = 0u8;
            for &c in chunk {
                byte = (byte << 1) | (c - b'0');
            }
            bits.push(byte);
        }

        let mut r = reader(&bits);
        let mut out = [0i64; 1];
        r.read_rice_batch(0, &mut out, 0, 1).unwrap();
        assert_eq!(out[0], 20);
    }

    #[test]
    fn position_tracks_byte_and_bit_offset() {
        let mut r = reader(&[0xff, 0x00]);
        assert_eq!(r.position(), (0, 0));
        r.read_uint(3).unwrap();
        assert_eq!(r.position(), (0, 3));
        r.read_uint(5).unwrap();
        assert_eq!(r.position(), (1, 0));
    }
}
