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

//! Server single-record files.
//!
//! The debug-friendly sibling of the binary container: an ASCII header
//! block terminated by `---`, then the raw packed payload.
//!
//! ```text
//! INCHROSIL
//! ID: seq1
//! Client: 127.0.0.1:54321
//! Format: FASTA
//! Length: 16
//! Checksum: 0x0A1B2C3D
//! Timestamp: 2025-06-01T12:00:00Z
//! ---
//! <payload bytes>
//! ```
//!
//! The first line spells the full project name; binary containers start
//! with the 8-byte `INCHRSIL` instead, which is how readers tell the two
//! apart.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use crate::{
    error::{ContainerError, Result},
    writer::stage_path,
};

/// First line of every single-record file.
pub const ASCII_MAGIC: &str = "INCHROSIL";

const SEPARATOR: &str = "---";

/// Name pattern for server output files.
#[must_use]
pub fn output_file_name(seq_id: u64) -> String { format!("dna_output_{seq_id}.ich") }

/// Header fields of a single-record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleRecordMeta {
    pub id:        String,
    pub client:    String,
    pub format:    String,
    /// Sequence length in bases (not payload bytes).
    pub length:    u64,
    /// CRC32 of the validated sequence bytes, not of the payload.
    pub checksum:  u32,
    pub timestamp: String,
}

/// Write one record atomically: staged to a `.tmp` sibling, synced, then
/// renamed into place so readers never observe a partial file.
pub fn write(path: impl AsRef<Path>, meta: &SingleRecordMeta, payload: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let header = format!(
        "{ASCII_MAGIC}\nID: {}\nClient: {}\nFormat: {}\nLength: {}\nChecksum: 0x{:08X}\nTimestamp: {}\n{SEPARATOR}\n",
        meta.id, meta.client, meta.format, meta.length, meta.checksum, meta.timestamp,
    );

    let tmp = stage_path(path);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(header.as_bytes())?;
    file.write_all(payload)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a single-record file back, returning header fields and payload.
pub fn read(path: impl AsRef<Path>) -> Result<(SingleRecordMeta, Vec<u8>)> {
    let bytes = fs::read(path.as_ref())?;

    let mut id = None;
    let mut client = None;
    let mut format = None;
    let mut length = None;
    let mut checksum = None;
    let mut timestamp = None;

    let mut offset = 0;
    let mut first = true;
    loop {
        let rest = &bytes[offset..];
        let Some(nl) = rest.iter().position(|&b| b == b'\n') else {
            return Err(malformed("missing `---` separator"));
        };
        let line = std::str::from_utf8(&rest[..nl])
            .map_err(|_| malformed("non-UTF-8 header line"))?;
        offset += nl + 1;

        if first {
            if line != ASCII_MAGIC {
                return Err(malformed("first line is not INCHROSIL"));
            }
            first = false;
            continue;
        }
        if line == SEPARATOR {
            break;
        }
        let Some((key, value)) = line.split_once(": ") else {
            return Err(malformed(&format!("unparseable header line {line:?}")));
        };
        match key {
            "ID" => id = Some(value.to_string()),
            "Client" => client = Some(value.to_string()),
            "Format" => format = Some(value.to_string()),
            "Length" => {
                length = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| malformed("Length is not an integer"))?,
                );
            }
            "Checksum" => {
                let hex = value
                    .strip_prefix("0x")
                    .ok_or_else(|| malformed("Checksum missing 0x prefix"))?;
                checksum = Some(
                    u32::from_str_radix(hex, 16)
                        .map_err(|_| malformed("Checksum is not hex"))?,
                );
            }
            "Timestamp" => timestamp = Some(value.to_string()),
            // Unknown keys are tolerated for forward compatibility.
            _ => {}
        }
    }

    let meta = SingleRecordMeta {
        id:        id.ok_or_else(|| malformed("missing ID"))?,
        client:    client.ok_or_else(|| malformed("missing Client"))?,
        format:    format.ok_or_else(|| malformed("missing Format"))?,
        length:    length.ok_or_else(|| malformed("missing Length"))?,
        checksum:  checksum.ok_or_else(|| malformed("missing Checksum"))?,
        timestamp: timestamp.ok_or_else(|| malformed("missing Timestamp"))?,
    };
    Ok((meta, bytes[offset..].to_vec()))
}

fn malformed(reason: &str) -> ContainerError {
    ContainerError::MalformedHeader {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> SingleRecordMeta {
        SingleRecordMeta {
            id:        "seq1".to_string(),
            client:    "127.0.0.1:54321".to_string(),
            format:    "FASTA".to_string(),
            length:    16,
            checksum:  0x0A1B_2C3D,
            timestamp: "2025-06-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn output_file_name_pattern() {
        assert_eq!(output_file_name(0), "dna_output_0.ich");
        assert_eq!(output_file_name(42), "dna_output_42.ich");
    }

    #[test]
    fn write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(output_file_name(1));
        let payload = [0x1B, 0x1B, 0x1B, 0x1B];

        write(&path, &sample_meta(), &payload).unwrap();
        let (meta, read_payload) = read(&path).unwrap();

        assert_eq!(meta, sample_meta());
        assert_eq!(read_payload, payload);
        assert!(!stage_path(&path).exists());
    }

    #[test]
    fn header_layout_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.ich");
        write(&path, &sample_meta(), &[0xAA]).unwrap();

        let bytes = fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("INCHROSIL\n"));
        assert!(text.contains("ID: seq1\n"));
        assert!(text.contains("Client: 127.0.0.1:54321\n"));
        assert!(text.contains("Format: FASTA\n"));
        assert!(text.contains("Length: 16\n"));
        assert!(text.contains("Checksum: 0x0A1B2C3D\n"));
        assert!(text.contains("\n---\n"));
        assert_eq!(bytes.last(), Some(&0xAA));
    }

    #[test]
    fn payload_may_contain_separator_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tricky.ich");
        let payload = b"---\n---\n";
        write(&path, &sample_meta(), payload).unwrap();
        let (_, read_payload) = read(&path).unwrap();
        assert_eq!(read_payload, payload);
    }

    #[test]
    fn rejects_binary_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ich");
        fs::write(&path, b"INCHRSIL\0\0\0\0").unwrap();
        assert!(matches!(
            read(&path),
            Err(ContainerError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn rejects_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.ich");
        fs::write(&path, b"INCHROSIL\nID: x\n---\n").unwrap();
        assert!(matches!(
            read(&path),
            Err(ContainerError::MalformedHeader { .. })
        ));
    }
}
