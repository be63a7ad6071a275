// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{decode_error, Result};
use crate::io::{BitReader, ByteSource};

/// Coefficients of the fixed-order finite-difference predictors, applied to the previous `k`
/// reconstructed outputs, most-recent first.
const FIXED_COEFFS: [&[i64]; 5] = [&[], &[1], &[2, -1], &[3, -3, 1], &[4, -6, 4, -1]];

/// Decode one channel's subframe at the given nominal bit depth into `out`, whose length is the
/// block size. `out` is fully overwritten.
pub fn decode_subframe<S: ByteSource>(reader: &mut BitReader<S>, bit_depth: u32, out: &mut [i64]) -> Result<()> {
    if reader.read_uint(1)? != 0 {
        return decode_error("subframe padding bit is not 0");
    }

    let subframe_type = reader.read_uint(6)?;

    let wastebits = if reader.read_uint(1)? == 1 { reader.read_unary_zeros()? + 1 } else { 0 };
    if wastebits > bit_depth {
        return decode_error("wasted bits exceed subframe bit depth");
    }
    let depth = bit_depth - wastebits;

    match subframe_type {
        0x00 => decode_constant(reader, depth, out)?,
        0x01 => decode_verbatim(reader, depth, out)?,
        0x08..=0x0c => decode_fixed(reader, depth, subframe_type - 0x08, out)?,
        0x20..=0x3f => decode_lpc(reader, depth, subframe_type - 0x1f, out)?,
        _ => return decode_error("subframe type set to reserved value"),
    }

    if wastebits > 0 {
        for sample in out.iter_mut() {
            *sample <<= wastebits;
        }
    }

    let lo = -(1i64 << (bit_depth - 1));
    let hi = 1i64 << (bit_depth - 1);
    if out.iter().any(|&v| v < lo || v >= hi) {
        return decode_error("decoded subframe sample exceeds declared bit depth");
    }

    Ok(())
}

fn decode_constant<S: ByteSource>(reader: &mut BitReader<S>, depth: u32, out: &mut [i64]) -> Result<()> {
    let value = i64::from(reader.read_signed(depth as u8)?);
    out.fill(value);
    Ok(())
}

fn decode_verbatim<S: ByteSource>(reader: &mut BitReader<S>, depth: u32, out: &mut [i64]) -> Result<()> {
    for sample in out.iter_mut() {
        *sample = i64::from(reader.read_signed(depth as u8)?);
    }
    Ok(())
}

fn decode_fixed<S: ByteSource>(reader: &mut BitReader<S>, depth: u32, order: u32, out: &mut [i64]) -> Result<()> {
    let order = order as usize;
    if order > out.len() {
        return decode_error("fixed predictor order exceeds block size");
    }

    decode_verbatim(reader, depth, &mut out[..order])?;
    decode_residual(reader, order, out)?;

    let coeffs = FIXED_COEFFS[order];
    for i in order..out.len() {
        let mut predicted = 0i64;
        for (j, &c) in coeffs.iter().enumerate() {
            predicted += c * out[i - 1 - j];
        }
        out[i] += predicted;
    }

    Ok(())
}

fn decode_lpc<S: ByteSource>(reader: &mut BitReader<S>, depth: u32, order: u32, out: &mut [i64]) -> Result<()> {
    let order = order as usize;
    if order > out.len() {
        return decode_error("lpc order exceeds block size");
    }

    decode_verbatim(reader, depth, &mut out[..order])?;

    let precision_code = reader.read_uint(4)? as u8;
    if precision_code == 15 {
        return decode_error("lpc coefficient precision set to reserved value");
    }
    let precision = precision_code + 1;

    let shift = reader.read_signed(5)?;
    if shift < 0 {
        return decode_error("lpc shift is negative");
    }
    let shift = shift as u32;

    let mut coeffs = Vec::with_capacity(order);
    for _ in 0..order {
        coeffs.push(i64::from(reader.read_signed(precision)?));
    }

    decode_residual(reader, order, out)?;

    for i in order..out.len() {
        let mut predicted = 0i64;
        for (j, &c) in coeffs.iter().enumerate() {
            predicted += c * out[i - 1 - j];
        }
        out[i] += predicted >> shift;
    }

    Ok(())
}

/// Read Rice/binary-escape-coded residuals for positions `warmup..out.len()`.
fn decode_residual<S: ByteSource>(reader: &mut BitReader<S>, warmup: usize, out: &mut [i64]) -> Result<()> {
    let method = reader.read_uint(2)?;
    let width = match method {
        0 => 4u8,
        1 => 5u8,
        _ => return decode_error("residual coding method set to reserved value"),
    };

    let partition_order = reader.read_uint(4)?;
    let num_partitions = 1usize << partition_order;
    let block_size = out.len();

    if block_size % num_partitions != 0 {
        return decode_error("partition count does not divide block size");
    }
    let part_len = block_size / num_partitions;

    if warmup > part_len {
        return decode_error("residual partition too small for predictor order");
    }

    decode_rice_partition(reader, width, &mut out[warmup..part_len])?;

    for chunk in out[part_len..].chunks_mut(part_len) {
        decode_rice_partition(reader, width, chunk)?;
    }

    Ok(())
}

fn decode_rice_partition<S: ByteSource>(reader: &mut BitReader<S>, width: u8, buf: &mut [i64]) -> Result<()> {
    let param = reader.read_uint(width)?;
    let escape = (1u32 << width) - 1;

    if param == escape {
        let bit_width = reader.read_uint(5)? as u8;
        for slot in buf.iter_mut() {
            *slot = i64::from(reader.read_signed(bit_width)?);
        }
    } else {
        let len = buf.len();
        reader.read_rice_batch(param as u8, buf, 0, len)?;
    }

    Ok(())
}
