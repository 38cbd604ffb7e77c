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

//! Per-record processing.

use std::{path::Path, sync::atomic::Ordering};

use chrono::{SecondsFormat, Utc};
use inchrosil_base::{PipelineMetrics, SequenceRecord};
use inchrosil_codec::{checksum, encode, validate};
use inchrosil_container::single::{self, SingleRecordMeta};
use tracing::{debug, error, warn};

/// Run one record through validate → checksum → encode → persist.
///
/// Returns `true` when the record was durably stored. Rejections and I/O
/// failures update the metric counters and drop the record; persistence is
/// at-most-once, so there is no retry.
pub(crate) fn process_record(
    record: &SequenceRecord,
    out_dir: &Path,
    metrics: &PipelineMetrics,
) -> bool {
    if let Err(invalid) = validate(&record.sequence) {
        metrics.validation_errors.fetch_add(1, Ordering::Relaxed);
        warn!(
            seq_id = record.seq_id,
            origin = %record.origin,
            %invalid,
            "rejected sequence"
        );
        return false;
    }

    let crc = checksum::crc32(&record.sequence);
    let payload = encode(&record.sequence);

    let meta = SingleRecordMeta {
        id:        record.id.clone(),
        client:    record.origin.clone(),
        format:    record.format.to_string(),
        length:    record.sequence.len() as u64,
        checksum:  crc,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    let path = out_dir.join(single::output_file_name(record.seq_id));
    match single::write(&path, &meta, &payload) {
        Ok(()) => {
            metrics.sequences_stored.fetch_add(1, Ordering::Relaxed);
            metrics
                .bytes_processed
                .fetch_add(record.sequence.len() as u64, Ordering::Relaxed);
            debug!(seq_id = record.seq_id, bases = record.sequence.len(), path = %path.display(), "sequence stored");
            true
        }
        Err(err) => {
            metrics.storage_errors.fetch_add(1, Ordering::Relaxed);
            error!(seq_id = record.seq_id, %err, path = %path.display(), "failed to persist sequence");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use bytes::Bytes;
    use inchrosil_base::FormatHint;
    use inchrosil_codec::crc32;

    use super::*;

    fn record(seq_id: u64, sequence: &'static [u8]) -> SequenceRecord {
        SequenceRecord {
            seq_id,
            id: "r".to_string(),
            format: FormatHint::Raw,
            origin: "test:1".to_string(),
            sequence: Bytes::from_static(sequence),
            quality: None,
            received_at: Instant::now(),
        }
    }

    #[test]
    fn valid_record_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = PipelineMetrics::new();

        assert!(process_record(&record(3, b"ACGT"), dir.path(), &metrics));

        let path = dir.path().join("dna_output_3.ich");
        let (meta, payload) = single::read(&path).unwrap();
        assert_eq!(meta.length, 4);
        assert_eq!(meta.format, "RAW");
        assert_eq!(meta.checksum, crc32(b"ACGT"));
        assert_eq!(payload, vec![0x1B]);

        let snap = metrics.snapshot();
        assert_eq!(snap.sequences_stored, 1);
        assert_eq!(snap.bytes_processed, 4);
        assert_eq!(snap.total_errors(), 0);
    }

    #[test]
    fn invalid_byte_is_counted_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = PipelineMetrics::new();

        assert!(!process_record(&record(7, b"ATCGX"), dir.path(), &metrics));

        assert!(!dir.path().join("dna_output_7.ich").exists());
        let snap = metrics.snapshot();
        assert_eq!(snap.validation_errors, 1);
        assert_eq!(snap.sequences_stored, 0);
    }

    #[test]
    fn unwritable_directory_counts_storage_error() {
        let metrics = PipelineMetrics::new();
        let missing = Path::new("/nonexistent-inchrosil-out-dir");

        assert!(!process_record(&record(1, b"ACGT"), missing, &metrics));
        assert_eq!(metrics.snapshot().storage_errors, 1);
    }

    #[test]
    fn checksum_covers_bases_not_payload() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = PipelineMetrics::new();
        process_record(&record(9, b"ACGTACGTACGTACGT"), dir.path(), &metrics);

        let (meta, payload) = single::read(dir.path().join("dna_output_9.ich")).unwrap();
        assert_eq!(meta.checksum, crc32(b"ACGTACGTACGTACGT"));
        assert_ne!(meta.checksum, crc32(&payload));
    }
}
