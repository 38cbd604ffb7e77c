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

//! Client driver.
//!
//! Streams sequences to the ingress server in the newline-delimited wire
//! format the server's frame parser understands. Three modes plus a
//! built-in smoke test:
//!
//! - `File`: re-frame the records of a FASTA/FASTQ/raw file
//! - `Interactive`: one raw record per stdin line, `quit`/`exit`/`q` ends
//! - `Stress`: N uniformly-random sequences of a given length
//! - `Single` (default): one built-in test sequence
//!
//! The client never retries on the wire; any send error ends the run.

pub mod session;

use std::path::{Path, PathBuf};

use inchrosil_base::{DEFAULT_PORT, MAX_SEQ_LEN};
use inchrosil_parser::{FrameParser, SequenceDraft};
use rand::{Rng, SeedableRng, rngs::StdRng};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

pub use crate::session::{Session, SessionState, SessionSummary};

/// The record sent when no mode is selected.
const TEST_SEQUENCE: &str = "ACGTACGTTAGCATCGGATCCTAGACGTACGT";

/// Default record length for stress mode.
pub const DEFAULT_STRESS_LEN: usize = 1000;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("failed to connect to {addr}"))]
    Connect {
        addr:   String,
        #[snafu(source)]
        source: std::io::Error,
    },

    #[snafu(display("failed to send to server"))]
    Send {
        #[snafu(source)]
        source: std::io::Error,
    },

    #[snafu(display("failed to read input file {path}"))]
    ReadInput {
        path:   String,
        #[snafu(source)]
        source: std::io::Error,
    },

    #[snafu(display("failed to read standard input"))]
    Stdin {
        #[snafu(source)]
        source: std::io::Error,
    },
}

/// What to send once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// One built-in test sequence.
    Single,
    /// Re-frame the records of a sequence file.
    File(PathBuf),
    /// One raw record per stdin line.
    Interactive,
    /// `count` random records of `length` bases.
    Stress { count: u64, length: usize },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host:         String,
    pub port:         u16,
    pub mode:         Mode,
    /// Progress line cadence in records; 0 disables progress output.
    pub report_every: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host:         "127.0.0.1".to_string(),
            port:         DEFAULT_PORT,
            mode:         Mode::Single,
            report_every: 100,
        }
    }
}

/// Run one client session to completion.
pub async fn run(config: ClientConfig) -> Result<SessionSummary, ClientError> {
    let addr = format!("{}:{}", config.host, config.port);
    let mut session = Session::connect(&addr, config.report_every).await?;

    match &config.mode {
        Mode::Single => {
            session
                .send_frame(format!("{TEST_SEQUENCE}\n").as_bytes())
                .await?;
        }
        Mode::File(path) => send_file(&mut session, path).await?,
        Mode::Interactive => send_interactive(&mut session).await?,
        Mode::Stress { count, length } => send_stress(&mut session, *count, *length).await?,
    }

    let summary = session.finish().await?;
    info!(%summary, "session complete");
    Ok(summary)
}

/// Producer-side framing: the exact byte shape the server's parser
/// reassembles into the same record.
fn frame(draft: &SequenceDraft) -> Vec<u8> {
    use inchrosil_base::FormatHint;

    let mut out = Vec::with_capacity(draft.sequence.len() + draft.id.len() + 8);
    match draft.format {
        FormatHint::Fasta => {
            out.push(b'>');
            out.extend_from_slice(draft.id.as_bytes());
            out.push(b'\n');
            out.extend_from_slice(&draft.sequence);
            out.push(b'\n');
        }
        FormatHint::Fastq => {
            out.push(b'@');
            out.extend_from_slice(draft.id.as_bytes());
            out.push(b'\n');
            out.extend_from_slice(&draft.sequence);
            out.extend_from_slice(b"\n+\n");
            match &draft.quality {
                Some(quality) => out.extend_from_slice(quality),
                // Synthetic top-quality run when the source had none.
                None => out.extend_from_slice(&vec![b'I'; draft.sequence.len()]),
            }
            out.push(b'\n');
        }
        FormatHint::Raw => {
            out.extend_from_slice(&draft.sequence);
            out.push(b'\n');
        }
    }
    out
}

/// Reassemble records from a file with the same rules the server parser
/// applies, then send each as one framed message.
async fn send_file(session: &mut Session, path: &Path) -> Result<(), ClientError> {
    let bytes = tokio::fs::read(path).await.context(ReadInputSnafu {
        path: path.display().to_string(),
    })?;

    let mut parser = FrameParser::new(MAX_SEQ_LEN);
    let mut drafts = Vec::new();
    parser.push_bytes(&bytes);
    parser.finish(&mut drafts);

    info!(records = drafts.len(), path = %path.display(), "sending file");
    for draft in &drafts {
        session.send_frame(&frame(draft)).await?;
    }
    Ok(())
}

/// Read stdin line by line, sending each non-empty line as a raw record.
async fn send_interactive(session: &mut Session) -> Result<(), ClientError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await.context(StdinSnafu)? else {
            break;
        };
        let trimmed = line.trim();
        if matches!(trimmed, "quit" | "exit" | "q") {
            break;
        }
        let stripped: String = trimmed.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if stripped.is_empty() {
            continue;
        }
        session.send_frame(format!("{stripped}\n").as_bytes()).await?;
    }
    Ok(())
}

/// Send `count` uniformly-random records of `length` bases.
async fn send_stress(session: &mut Session, count: u64, length: usize) -> Result<(), ClientError> {
    let mut rng = StdRng::from_entropy();
    let mut message = Vec::with_capacity(length + 1);
    for _ in 0..count {
        message.clear();
        message.extend((0..length).map(|_| random_base(&mut rng)));
        message.push(b'\n');
        session.send_frame(&message).await?;
    }
    Ok(())
}

fn random_base(rng: &mut StdRng) -> u8 {
    const ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];
    ALPHABET[rng.gen_range(0..ALPHABET.len())]
}
