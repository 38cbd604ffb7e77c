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

//! Binary container writer.

use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use inchrosil_codec::{Crc32, encode};
use tracing::debug;

use crate::{
    error::Result,
    format::{Header, Slot, TRAILER_LEN},
};

struct PendingRecord {
    name:    String,
    bases:   u64,
    payload: Vec<u8>,
}

/// What a finished container holds; mirrors the header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSummary {
    pub sequence_count:  u64,
    pub total_bases:     u64,
    pub compressed_size: u64,
}

/// Accumulates records in memory, then writes one container atomically.
///
/// The writer packs each sequence on `add_record`, builds the full metadata
/// block in memory on `finish`, streams payloads after it and publishes the
/// file with a rename so readers never observe a partial container.
#[derive(Default)]
pub struct ContainerWriter {
    records: Vec<PendingRecord>,
}

impl ContainerWriter {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Queue one record. The sequence must already be validated; `N` packs
    /// as `A` per the codec contract.
    pub fn add_record(&mut self, name: impl Into<String>, sequence: &[u8]) {
        self.records.push(PendingRecord {
            name:    name.into(),
            bases:   sequence.len() as u64,
            payload: encode(sequence),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize { self.records.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Write the container to `path` and return the header totals.
    pub fn finish(self, path: impl AsRef<Path>) -> Result<ContainerSummary> {
        let path = path.as_ref();

        let mut slots = Vec::with_capacity(self.records.len());
        let mut offset = 0u64;
        let mut total_bases = 0u64;
        for record in &self.records {
            slots.push(Slot {
                length_in_bases: record.bases,
                payload_offset:  offset,
                name:            record.name.clone(),
            });
            offset += record.payload.len() as u64;
            total_bases += record.bases;
        }

        let header = Header {
            sequence_count: self.records.len() as u64,
            total_bases,
            compressed_size: offset,
        };

        let tmp = stage_path(path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        let mut out = BufWriter::new(file);

        out.write_all(&header.to_bytes())?;
        for slot in &slots {
            out.write_all(&slot.to_bytes())?;
        }
        let mut crc = Crc32::new();
        for record in &self.records {
            crc.update(&record.payload);
            out.write_all(&record.payload)?;
        }
        let mut trailer = [0u8; TRAILER_LEN];
        trailer[0..4].copy_from_slice(&crc.finalize().to_le_bytes());
        out.write_all(&trailer)?;

        out.flush()?;
        out.into_inner().map_err(std::io::IntoInnerError::into_error)?.sync_all()?;
        fs::rename(&tmp, path)?;

        debug!(
            path = %path.display(),
            sequences = header.sequence_count,
            bases = header.total_bases,
            "container written"
        );

        Ok(ContainerSummary {
            sequence_count:  header.sequence_count,
            total_bases:     header.total_bases,
            compressed_size: header.compressed_size,
        })
    }
}

/// Staging sibling for write-then-rename publication.
pub(crate) fn stage_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map_or_else(
        || std::ffi::OsString::from("container"),
        std::ffi::OsStr::to_os_string,
    );
    name.push(".tmp");
    path.with_file_name(name)
}
