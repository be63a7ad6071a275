// flac-core
// Copyright (c) 2019-2026 The flac-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Random-access byte sources and the big-endian bit reader built on top of them.

mod bit;
mod source;

pub use bit::BitReader;
pub use source::{ByteSource, FileSource, MemorySource};
