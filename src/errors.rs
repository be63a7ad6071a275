// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// The distinct, observable categories of failure a decode operation can raise.
#[derive(Debug)]
pub enum Error {
    /// The byte source ended in the middle of a field. Terminal for the operation in progress.
    UnexpectedEof,
    /// The bitstream is malformed: a sync mismatch, a reserved bit or code, a CRC mismatch,
    /// nonzero padding, a residual overflow, or an out-of-range LPC result. Terminal for the
    /// frame being decoded, except during sync-scan where it is caught and treated as "not a
    /// frame here, keep scanning".
    InvalidData(&'static str),
    /// An internal invariant was violated: StreamInfo contradicts a frame, metadata blocks
    /// arrived out of order, or a frame size came out below the 10-byte floor. Terminal for the
    /// stream.
    InvariantViolation(&'static str),
    /// The underlying byte source reported an I/O failure.
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEof => write!(f, "unexpected end of stream"),
            Error::InvalidData(msg) => write!(f, "malformed flac stream: {}", msg),
            Error::InvariantViolation(msg) => write!(f, "invariant violated: {}", msg),
            Error::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(err),
        }
    }
}

/// Convenience constructor mirroring the shape of the other `..._error` helpers below; used at
/// every call site instead of building an `Err(Error::...)` by hand.
#[inline(always)]
pub fn eof_error<T>() -> Result<T> {
    Err(Error::UnexpectedEof)
}

#[inline(always)]
pub fn decode_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::InvalidData(msg))
}

#[inline(always)]
pub fn invariant_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::InvariantViolation(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_eof_maps_to_unexpected_eof() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        match Error::from(io_err) {
            Error::UnexpectedEof => {}
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
    }

    #[test]
    fn io_other_maps_to_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        match Error::from(io_err) {
            Error::Io(_) => {}
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
