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

//! The unit of work flowing through the pipeline.

use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The wire format a record was observed in.
///
/// Used for reporting only; it never alters how a sequence is encoded.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::Display, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum FormatHint {
    #[default]
    #[display("RAW")]
    Raw,
    #[display("FASTA")]
    Fasta,
    #[display("FASTQ")]
    Fastq,
}

/// One nucleotide sequence on its way from ingress to persistence.
///
/// Created by the frame parser, stamped with `seq_id` and `origin` by the
/// ingress layer, owned by the work queue while pending, and dropped once a
/// worker has persisted (or rejected) it.
///
/// Invariant: `sequence` is non-empty, contains no ASCII whitespace, and is
/// never mutated after the record is enqueued.
#[derive(Debug, Clone)]
pub struct SequenceRecord {
    /// Process-wide monotonically increasing id, assigned at enqueue time.
    pub seq_id:      u64,
    /// Opaque textual identifier from the record header; may be empty.
    pub id:          String,
    /// The wire format this record arrived in.
    pub format:      FormatHint,
    /// Stable descriptor of the source, `ip:port` for network records.
    pub origin:      String,
    /// The nucleotide bytes, whitespace already stripped.
    pub sequence:    Bytes,
    /// FASTQ quality block; never written into the 2-bit container.
    pub quality:     Option<Bytes>,
    /// Monotonic timestamp taken when the record left the parser.
    pub received_at: Instant,
}

impl SequenceRecord {
    /// Length of the sequence in bases.
    #[must_use]
    pub fn len(&self) -> usize { self.sequence.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.sequence.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_hint_display() {
        assert_eq!(FormatHint::Raw.to_string(), "RAW");
        assert_eq!(FormatHint::Fasta.to_string(), "FASTA");
        assert_eq!(FormatHint::Fastq.to_string(), "FASTQ");
    }
}
