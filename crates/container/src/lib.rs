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

//! On-disk container formats for 2-bit packed nucleotide payloads.
//!
//! Two sibling formats share the project magic:
//!
//! - The **binary container** ([`ContainerWriter`] / [`ContainerReader`]):
//!   a fixed 64-byte header starting with the 8 ASCII bytes `INCHRSIL`,
//!   one 280-byte metadata slot per record, tightly packed payloads in slot
//!   order, and an optional 32-byte CRC trailer. Produced by the offline
//!   packer, which may hold many records per file.
//! - The **single-record variant** ([`single`]): a human-readable ASCII
//!   header starting with `INCHROSIL\n` followed by the raw payload.
//!   Emitted by the server, one record per file.
//!
//! Readers tell them apart by the first bytes: `INCHRSIL` (binary) versus
//! `INCHROSIL\n` (ASCII, newline-terminated).
//!
//! Files of either format become visible only after the final byte is
//! flushed: writers stage to a `.tmp` sibling and rename into place.

mod error;
mod format;
mod reader;
mod writer;

pub mod single;

pub use error::{ContainerError, Result};
pub use format::{HEADER_LEN, MAGIC, META_SLOT_LEN, NAME_LEN, TRAILER_LEN, VERSION};
pub use reader::{ContainerReader, RecordMeta};
pub use writer::{ContainerSummary, ContainerWriter};
