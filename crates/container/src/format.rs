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

//! Binary container byte layout.
//!
//! All multi-byte fields are little-endian.
//!
//! ```text
//! Header (64 bytes)
//! ┌────────────┬──────────┬────────────────┬─────────────┬─────────────────┬────────────┐
//! │ magic (8B) │ ver (4B) │ seq_count (8B) │ bases (8B)  │ compressed (8B) │ rsvd (28B) │
//! │ "INCHRSIL" │ u32 = 1  │ u64            │ u64         │ u64             │ zeroes     │
//! └────────────┴──────────┴────────────────┴─────────────┴─────────────────┴────────────┘
//!
//! Metadata slot (280 bytes, one per record)
//! ┌──────────────────────┬─────────────────────┬──────────────────────────────┐
//! │ length_in_bases (8B) │ payload_offset (8B) │ name (256B, NUL-padded UTF-8)│
//! └──────────────────────┴─────────────────────┴──────────────────────────────┘
//! ```
//!
//! `payload_offset` is relative to the end of the metadata block. Payloads
//! are tightly packed in slot order; each is exactly
//! `packed_len(length_in_bases)` bytes. An optional 32-byte trailer holds a
//! CRC32 (LE) of the concatenated payload bytes plus 28 reserved zeroes.

use crate::error::{ContainerError, Result};

/// 8-byte magic of the binary container. The ASCII header variant spells
/// the full project name instead; see [`crate::single`].
pub const MAGIC: &[u8; 8] = b"INCHRSIL";

pub const VERSION: u32 = 1;

pub const HEADER_LEN: usize = 64;

pub const META_SLOT_LEN: usize = 280;

/// Size of the name field inside a metadata slot; byte 255 is always NUL.
pub const NAME_LEN: usize = 256;

pub const TRAILER_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub sequence_count:  u64,
    pub total_bases:     u64,
    pub compressed_size: u64,
}

impl Header {
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..8].copy_from_slice(MAGIC);
        buf[8..12].copy_from_slice(&VERSION.to_le_bytes());
        buf[12..20].copy_from_slice(&self.sequence_count.to_le_bytes());
        buf[20..28].copy_from_slice(&self.total_bases.to_le_bytes());
        buf[28..36].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf
    }

    pub fn parse(buf: &[u8; HEADER_LEN]) -> Result<Self> {
        if &buf[0..8] != MAGIC {
            let mut found = [0u8; 8];
            found.copy_from_slice(&buf[0..8]);
            return Err(ContainerError::BadMagic {
                expected: "INCHRSIL",
                found,
            });
        }
        let version = u32::from_le_bytes(buf[8..12].try_into().expect("4-byte slice"));
        if version != VERSION {
            return Err(ContainerError::UnsupportedVersion {
                found:    version,
                expected: VERSION,
            });
        }
        Ok(Self {
            sequence_count:  u64::from_le_bytes(buf[12..20].try_into().expect("8-byte slice")),
            total_bases:     u64::from_le_bytes(buf[20..28].try_into().expect("8-byte slice")),
            compressed_size: u64::from_le_bytes(buf[28..36].try_into().expect("8-byte slice")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot {
    pub length_in_bases: u64,
    pub payload_offset:  u64,
    pub name:            String,
}

impl Slot {
    pub fn to_bytes(&self) -> [u8; META_SLOT_LEN] {
        let mut buf = [0u8; META_SLOT_LEN];
        buf[0..8].copy_from_slice(&self.length_in_bases.to_le_bytes());
        buf[8..16].copy_from_slice(&self.payload_offset.to_le_bytes());
        // NUL terminator enforced at byte 255: at most 255 name bytes.
        let name = self.name.as_bytes();
        let take = name.len().min(NAME_LEN - 1);
        buf[16..16 + take].copy_from_slice(&name[..take]);
        buf
    }

    pub fn parse(buf: &[u8; META_SLOT_LEN]) -> Self {
        let name_field = &buf[16..16 + NAME_LEN];
        let end = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LEN - 1);
        Self {
            length_in_bases: u64::from_le_bytes(buf[0..8].try_into().expect("8-byte slice")),
            payload_offset:  u64::from_le_bytes(buf[8..16].try_into().expect("8-byte slice")),
            name:            String::from_utf8_lossy(&name_field[..end]).into_owned(),
        }
    }
}
