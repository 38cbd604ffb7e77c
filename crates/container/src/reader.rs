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

//! Binary container reader.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use inchrosil_codec::{Crc32, decode, packed_len};

use crate::{
    error::{ContainerError, Result},
    format::{HEADER_LEN, Header, META_SLOT_LEN, Slot, TRAILER_LEN},
};

/// Public view of one metadata slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMeta {
    pub name:            String,
    pub length_in_bases: u64,
}

/// Validating reader over a binary container file.
///
/// `open` checks magic, version and that every slot's payload span fits the
/// file; payload access is lazy. On any shortfall the error names the
/// offending record index.
#[derive(Debug)]
pub struct ContainerReader {
    file:         File,
    header:       Header,
    slots:        Vec<Slot>,
    payload_base: u64,
    trailer_crc:  Option<u32>,
}

impl ContainerReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;

        let mut header_buf = [0u8; HEADER_LEN];
        file.read_exact(&mut header_buf).map_err(|e| truncated(e, "64-byte header"))?;
        let header = Header::parse(&header_buf)?;

        let count = usize::try_from(header.sequence_count).map_err(|_| {
            ContainerError::Truncated {
                context: format!("implausible sequence_count {}", header.sequence_count),
            }
        })?;

        // Size-check the metadata region before allocating slot storage, so
        // a corrupt count cannot ask for an absurd allocation.
        let file_len = file.metadata()?.len();
        let metadata_end = header
            .sequence_count
            .checked_mul(META_SLOT_LEN as u64)
            .and_then(|m| m.checked_add(HEADER_LEN as u64))
            .ok_or_else(|| ContainerError::Truncated {
                context: format!("implausible sequence_count {}", header.sequence_count),
            })?;
        if file_len < metadata_end {
            let complete = (file_len.saturating_sub(HEADER_LEN as u64)) / META_SLOT_LEN as u64;
            return Err(ContainerError::CorruptRecord {
                index:  usize::try_from(complete).unwrap_or(usize::MAX),
                reason: "truncated metadata slot".to_string(),
            });
        }

        let mut slots = Vec::with_capacity(count);
        let mut slot_buf = [0u8; META_SLOT_LEN];
        for index in 0..count {
            file.read_exact(&mut slot_buf)
                .map_err(|_| ContainerError::CorruptRecord {
                    index,
                    reason: "truncated metadata slot".to_string(),
                })?;
            slots.push(Slot::parse(&slot_buf));
        }

        let payload_base = metadata_end;
        let payload_end = payload_base + header.compressed_size;

        // Locate the first record whose span falls outside the payload
        // region, both against the declared size and the actual file.
        for (index, slot) in slots.iter().enumerate() {
            let packed = packed_bytes(slot, index)? as u64;
            let span_end = slot.payload_offset + packed;
            if span_end > header.compressed_size || payload_base + span_end > file_len {
                return Err(ContainerError::CorruptRecord {
                    index,
                    reason: format!(
                        "payload span {}..{} exceeds container",
                        slot.payload_offset, span_end
                    ),
                });
            }
        }

        let trailer_crc = if file_len == payload_end {
            None
        } else if file_len == payload_end + TRAILER_LEN as u64 {
            file.seek(SeekFrom::Start(payload_end))?;
            let mut trailer = [0u8; TRAILER_LEN];
            file.read_exact(&mut trailer).map_err(|e| truncated(e, "trailer"))?;
            Some(u32::from_le_bytes(trailer[0..4].try_into().expect("4-byte slice")))
        } else {
            return Err(ContainerError::Truncated {
                context: format!(
                    "file is {file_len} bytes, expected {payload_end} or {}",
                    payload_end + TRAILER_LEN as u64
                ),
            });
        };

        Ok(Self {
            file,
            header,
            slots,
            payload_base,
            trailer_crc,
        })
    }

    #[must_use]
    pub fn sequence_count(&self) -> u64 { self.header.sequence_count }

    #[must_use]
    pub fn total_bases(&self) -> u64 { self.header.total_bases }

    #[must_use]
    pub fn compressed_size(&self) -> u64 { self.header.compressed_size }

    #[must_use]
    pub fn has_trailer(&self) -> bool { self.trailer_crc.is_some() }

    /// Slot metadata in record order.
    #[must_use]
    pub fn records(&self) -> Vec<RecordMeta> {
        self.slots
            .iter()
            .map(|slot| RecordMeta {
                name:            slot.name.clone(),
                length_in_bases: slot.length_in_bases,
            })
            .collect()
    }

    /// Raw packed payload of record `index`.
    pub fn payload(&mut self, index: usize) -> Result<Vec<u8>> {
        let slot = self.slots.get(index).ok_or_else(|| ContainerError::CorruptRecord {
            index,
            reason: "no such record".to_string(),
        })?;
        let packed = packed_bytes(slot, index)?;
        let offset = self.payload_base + slot.payload_offset;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut payload = vec![0u8; packed];
        self.file
            .read_exact(&mut payload)
            .map_err(|_| ContainerError::CorruptRecord {
                index,
                reason: "payload shorter than metadata claims".to_string(),
            })?;
        Ok(payload)
    }

    /// Decoded nucleotide sequence of record `index`.
    pub fn sequence(&mut self, index: usize) -> Result<Vec<u8>> {
        let payload = self.payload(index)?;
        let bases = usize::try_from(self.slots[index].length_in_bases).map_err(|_| {
            ContainerError::CorruptRecord {
                index,
                reason: "length does not fit in memory".to_string(),
            }
        })?;
        Ok(decode(&payload, bases))
    }

    /// Verify the trailer CRC over the payload region, when present.
    pub fn verify(&mut self) -> Result<()> {
        let Some(stored) = self.trailer_crc else {
            return Ok(());
        };
        self.file.seek(SeekFrom::Start(self.payload_base))?;
        let mut crc = Crc32::new();
        let mut remaining = self.header.compressed_size;
        let mut buf = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let take = buf.len().min(usize::try_from(remaining).unwrap_or(buf.len()));
            self.file
                .read_exact(&mut buf[..take])
                .map_err(|e| truncated(e, "payload region"))?;
            crc.update(&buf[..take]);
            remaining -= take as u64;
        }
        let computed = crc.finalize();
        if computed == stored {
            Ok(())
        } else {
            Err(ContainerError::ChecksumMismatch { stored, computed })
        }
    }
}

fn packed_bytes(slot: &Slot, index: usize) -> Result<usize> {
    usize::try_from(slot.length_in_bases)
        .map(packed_len)
        .map_err(|_| ContainerError::CorruptRecord {
            index,
            reason: "length does not fit in memory".to_string(),
        })
}

fn truncated(err: std::io::Error, context: &str) -> ContainerError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ContainerError::Truncated {
            context: context.to_string(),
        }
    } else {
        ContainerError::Io(err)
    }
}
