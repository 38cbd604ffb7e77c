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

//! Streaming frame parser.
//!
//! Turns an arbitrary byte stream into a lazy sequence of records. Records
//! are newline-delimited; format detection happens per line, not per
//! stream:
//!
//! - `>` opens a FASTA record; following plain lines accumulate into the
//!   sequence until the next header or end of stream
//! - `@` opens a FASTQ record: the next line is the sequence, the line
//!   after it is the `+` separator (skipped), then the quality block
//! - `+` outside a FASTQ context is separator noise and is dropped
//! - anything else with no active context is a RAW record, one per line
//!
//! The parser strips every ASCII whitespace byte from sequences, never
//! validates the alphabet (the worker pool does) and never fails: malformed
//! framing is either dropped or downgraded. A FASTQ record cut off before
//! its quality line is emitted as FASTA with whatever sequence was
//! collected.

use std::time::Instant;

use bytes::{Bytes, BytesMut};
use inchrosil_base::{FormatHint, SequenceRecord};

/// A parsed record, minus the `seq_id` and `origin` the ingress layer
/// stamps on acceptance.
#[derive(Debug, Clone)]
pub struct SequenceDraft {
    pub id:          String,
    pub format:      FormatHint,
    pub sequence:    Bytes,
    pub quality:     Option<Bytes>,
    /// Taken at the moment the record left the parser.
    pub received_at: Instant,
}

impl SequenceDraft {
    /// Promote the draft to a full record, stamping identity and origin.
    #[must_use]
    pub fn into_record(self, seq_id: u64, origin: impl Into<String>) -> SequenceRecord {
        SequenceRecord {
            seq_id,
            id: self.id,
            format: self.format,
            origin: origin.into(),
            sequence: self.sequence,
            quality: self.quality,
            received_at: self.received_at,
        }
    }
}

enum State {
    Idle,
    Fasta {
        id:       String,
        seq:      Vec<u8>,
        oversize: bool,
    },
    /// `@` header seen, sequence line pending.
    FastqSeq { id: String },
    /// Sequence consumed, `+` separator line pending.
    FastqSep {
        id:       String,
        seq:      Vec<u8>,
        oversize: bool,
    },
    /// Separator consumed, quality line pending.
    FastqQual {
        id:       String,
        seq:      Vec<u8>,
        oversize: bool,
    },
}

/// Per-connection incremental parser.
///
/// Feed bytes with [`push_bytes`](Self::push_bytes), harvest complete
/// records with [`drain`](Self::drain), and flush the tail with
/// [`finish`](Self::finish) when the stream closes.
pub struct FrameParser {
    buf:         BytesMut,
    state:       State,
    max_seq_len: usize,
    dropped:     u64,
}

impl FrameParser {
    #[must_use]
    pub fn new(max_seq_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            state: State::Idle,
            max_seq_len,
            dropped: 0,
        }
    }

    /// Append raw bytes from the stream.
    pub fn push_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }

    /// Consume as many complete records as the buffered bytes allow.
    pub fn drain(&mut self, out: &mut Vec<SequenceDraft>) {
        while let Some(line) = self.next_line() {
            self.consume_line(&line, out);
        }
    }

    /// End-of-stream: treat any unterminated final line as complete and
    /// flush the active record. A FASTQ record still waiting for its
    /// quality block is downgraded to FASTA.
    pub fn finish(&mut self, out: &mut Vec<SequenceDraft>) {
        self.drain(out);
        if !self.buf.is_empty() {
            let mut tail = std::mem::take(&mut self.buf);
            if tail.last() == Some(&b'\r') {
                tail.truncate(tail.len() - 1);
            }
            let tail = tail.freeze();
            self.consume_line(&tail, out);
        }
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle | State::FastqSeq { .. } => {}
            State::Fasta { id, seq, oversize }
            | State::FastqSep { id, seq, oversize }
            | State::FastqQual { id, seq, oversize } => {
                self.emit(id, FormatHint::Fasta, seq, None, oversize, out);
            }
        }
    }

    /// Number of records dropped since the last call (oversize sequences).
    /// Resets the counter.
    pub fn take_dropped(&mut self) -> u64 { std::mem::take(&mut self.dropped) }

    /// Next complete line, `\n` consumed and trailing `\r` stripped.
    fn next_line(&mut self) -> Option<Bytes> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(pos - 1);
        }
        Some(line.freeze())
    }

    fn consume_line(&mut self, line: &[u8], out: &mut Vec<SequenceDraft>) {
        if line.is_empty() {
            return;
        }
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => self.open_or_raw(line, out),
            State::Fasta {
                id,
                mut seq,
                mut oversize,
            } => match line[0] {
                b'>' | b'@' => {
                    self.emit(id, FormatHint::Fasta, seq, None, oversize, out);
                    self.open_or_raw(line, out);
                }
                // Separator noise inside a FASTA body.
                b'+' => self.state = State::Fasta { id, seq, oversize },
                _ => {
                    self.accumulate(&mut seq, &mut oversize, line);
                    self.state = State::Fasta { id, seq, oversize };
                }
            },
            State::FastqSeq { id } => {
                let mut seq = Vec::new();
                let mut oversize = false;
                self.accumulate(&mut seq, &mut oversize, line);
                self.state = State::FastqSep { id, seq, oversize };
            }
            // The `+` separator line is skipped whatever it contains.
            State::FastqSep { id, seq, oversize } => {
                self.state = State::FastqQual { id, seq, oversize };
            }
            State::FastqQual { id, seq, oversize } => {
                let quality = Bytes::copy_from_slice(line);
                self.emit(id, FormatHint::Fastq, seq, Some(quality), oversize, out);
            }
        }
    }

    /// Handle a line with no active record context.
    fn open_or_raw(&mut self, line: &[u8], out: &mut Vec<SequenceDraft>) {
        match line[0] {
            b'>' => {
                self.state = State::Fasta {
                    id:       header_id(&line[1..]),
                    seq:      Vec::new(),
                    oversize: false,
                };
            }
            b'@' => {
                self.state = State::FastqSeq {
                    id: header_id(&line[1..]),
                };
            }
            // Lone separator with nothing to separate.
            b'+' => {}
            _ => {
                let mut seq = Vec::new();
                let mut oversize = false;
                self.accumulate(&mut seq, &mut oversize, line);
                self.emit(String::new(), FormatHint::Raw, seq, None, oversize, out);
            }
        }
    }

    /// Append the whitespace-stripped line to an accumulating sequence,
    /// dropping the whole record once it would exceed `max_seq_len`.
    fn accumulate(&self, seq: &mut Vec<u8>, oversize: &mut bool, line: &[u8]) {
        if *oversize {
            return;
        }
        let stripped: Vec<u8> = line
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        if seq.len() + stripped.len() > self.max_seq_len {
            *oversize = true;
            seq.clear();
        } else {
            seq.extend_from_slice(&stripped);
        }
    }

    fn emit(
        &mut self,
        id: String,
        format: FormatHint,
        seq: Vec<u8>,
        quality: Option<Bytes>,
        oversize: bool,
        out: &mut Vec<SequenceDraft>,
    ) {
        if oversize {
            self.dropped += 1;
            return;
        }
        if seq.is_empty() {
            return;
        }
        out.push(SequenceDraft {
            id,
            format,
            sequence: Bytes::from(seq),
            quality,
            received_at: Instant::now(),
        });
    }
}

/// First whitespace-separated token of a header line body; empty allowed.
fn header_id(rest: &[u8]) -> String {
    let token = rest
        .split(|b: &u8| b.is_ascii_whitespace())
        .find(|t| !t.is_empty())
        .unwrap_or(&[]);
    String::from_utf8_lossy(token).into_owned()
}
