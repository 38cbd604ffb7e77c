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

use std::fs;

use inchrosil_container::{
    ContainerError, ContainerReader, ContainerWriter, HEADER_LEN, META_SLOT_LEN,
};
use tempfile::TempDir;

#[test]
fn write_then_read_two_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pack.ich");

    let mut writer = ContainerWriter::new();
    writer.add_record("seq1", b"ACGT");
    writer.add_record("seq2", b"TTTT");
    let summary = writer.finish(&path).unwrap();

    assert_eq!(summary.sequence_count, 2);
    assert_eq!(summary.total_bases, 8);
    assert_eq!(summary.compressed_size, 2);

    let mut reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.sequence_count(), 2);
    assert_eq!(reader.total_bases(), 8);
    assert_eq!(reader.compressed_size(), 2);
    assert!(reader.has_trailer());
    reader.verify().unwrap();

    let records = reader.records();
    assert_eq!(records[0].name, "seq1");
    assert_eq!(records[0].length_in_bases, 4);
    assert_eq!(records[1].name, "seq2");

    assert_eq!(reader.sequence(0).unwrap(), b"ACGT");
    assert_eq!(reader.sequence(1).unwrap(), b"TTTT");
    assert_eq!(reader.payload(0).unwrap(), vec![0x1B]);
    assert_eq!(reader.payload(1).unwrap(), vec![0xFF]);
}

#[test]
fn many_records_with_partial_final_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("many.ich");

    let sequences: Vec<Vec<u8>> = (1..=32)
        .map(|len| b"ACGTN".iter().copied().cycle().take(len).collect())
        .collect();

    let mut writer = ContainerWriter::new();
    for (i, seq) in sequences.iter().enumerate() {
        writer.add_record(format!("record_{i}"), seq);
    }
    writer.finish(&path).unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    reader.verify().unwrap();
    for (i, seq) in sequences.iter().enumerate() {
        // N packs as A, so compare against the coerced form.
        let expected: Vec<u8> = seq.iter().map(|&b| if b == b'N' { b'A' } else { b }).collect();
        assert_eq!(reader.sequence(i).unwrap(), expected, "record {i}");
    }
}

#[test]
fn reader_accepts_trailerless_container() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trailerless.ich");

    let mut writer = ContainerWriter::new();
    writer.add_record("seq1", b"ACGT");
    writer.finish(&path).unwrap();

    // Strip the 32-byte trailer; older writers did not emit one.
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 32]).unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    assert!(!reader.has_trailer());
    reader.verify().unwrap();
    assert_eq!(reader.sequence(0).unwrap(), b"ACGT");
}

#[test]
fn corrupted_trailer_crc_is_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crc.ich");

    let mut writer = ContainerWriter::new();
    writer.add_record("seq1", b"ACGTACGT");
    writer.finish(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let trailer_crc_at = bytes.len() - 32;
    bytes[trailer_crc_at] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    assert!(matches!(
        reader.verify(),
        Err(ContainerError::ChecksumMismatch { .. })
    ));
}

#[test]
fn flipped_payload_bit_fails_verification() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flip.ich");

    let mut writer = ContainerWriter::new();
    writer.add_record("seq1", b"ACGTACGTACGT");
    writer.finish(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let payload_at = HEADER_LEN + META_SLOT_LEN;
    bytes[payload_at] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    assert!(matches!(
        reader.verify(),
        Err(ContainerError::ChecksumMismatch { .. })
    ));
}

#[test]
fn truncated_payload_names_the_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.ich");

    let mut writer = ContainerWriter::new();
    writer.add_record("seq1", b"ACGT");
    writer.add_record("seq2", b"GGGGGGGG");
    writer.finish(&path).unwrap();

    // Cut into the second record's payload and drop the trailer.
    let bytes = fs::read(&path).unwrap();
    let second_payload_at = HEADER_LEN + 2 * META_SLOT_LEN + 1;
    fs::write(&path, &bytes[..=second_payload_at]).unwrap();

    match ContainerReader::open(&path) {
        Err(ContainerError::CorruptRecord { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected CorruptRecord for record 1, got {other:?}"),
    }
}

#[test]
fn bad_magic_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notacontainer.ich");
    fs::write(&path, [0u8; 256]).unwrap();

    assert!(matches!(
        ContainerReader::open(&path),
        Err(ContainerError::BadMagic { .. })
    ));
}

#[test]
fn empty_name_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("anon.ich");

    let mut writer = ContainerWriter::new();
    writer.add_record("", b"ACGT");
    writer.finish(&path).unwrap();

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.records()[0].name, "");
}
