// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic: expected {expected:?}, found {found:02X?}")]
    BadMagic { expected: &'static str, found: [u8; 8] },

    #[error("unsupported container version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("truncated container: {context}")]
    Truncated { context: String },

    #[error("corrupt container at record {index}: {reason}")]
    CorruptRecord { index: usize, reason: String },

    #[error("payload checksum mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("malformed single-record header: {reason}")]
    MalformedHeader { reason: String },
}

pub type Result<T> = std::result::Result<T, ContainerError>;
