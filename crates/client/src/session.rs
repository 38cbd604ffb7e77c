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

//! Client session: connection lifecycle and framed sends.

use std::time::{Duration, Instant};

use snafu::ResultExt;
use tokio::{io::AsyncWriteExt, net::TcpStream};
use tracing::{debug, info};

use crate::{ClientError, ConnectSnafu, SendSnafu};

/// Where a client run is in its lifecycle.
///
/// `Disconnected → Connecting → Connected → Sending* → Closing → Done`;
/// send errors jump to `Closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Sending,
    Closing,
    Done,
}

/// Result of a completed client run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("sent {records} records ({bytes} bytes) in {}ms", elapsed.as_millis())]
pub struct SessionSummary {
    pub records: u64,
    pub bytes:   u64,
    pub elapsed: Duration,
}

/// One TCP session to the server. The server is a pure sink, so the
/// session only ever writes.
pub struct Session {
    stream:       TcpStream,
    state:        SessionState,
    records:      u64,
    bytes:        u64,
    started:      Instant,
    report_every: u64,
}

impl Session {
    /// Connect to `addr`, moving through `Connecting` into `Connected`.
    pub async fn connect(addr: &str, report_every: u64) -> Result<Self, ClientError> {
        debug!(state = %SessionState::Connecting, %addr, "connecting");
        let stream = TcpStream::connect(addr)
            .await
            .context(ConnectSnafu { addr })?;
        debug!(state = %SessionState::Connected, %addr, "connected");
        Ok(Self {
            stream,
            state: SessionState::Connected,
            records: 0,
            bytes: 0,
            started: Instant::now(),
            report_every,
        })
    }

    /// Send one framed record. A failed send moves the session to
    /// `Closing`; the run terminates with the error.
    pub async fn send_frame(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        self.state = SessionState::Sending;
        if let Err(err) = self.stream.write_all(frame).await {
            self.state = SessionState::Closing;
            return Err(err).context(SendSnafu);
        }
        self.records += 1;
        self.bytes += frame.len() as u64;
        if self.report_every > 0 && self.records.is_multiple_of(self.report_every) {
            info!(records = self.records, bytes = self.bytes, "progress");
        }
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> SessionState { self.state }

    #[must_use]
    pub const fn records_sent(&self) -> u64 { self.records }

    /// Flush, close the write half and finish the run.
    pub async fn finish(mut self) -> Result<SessionSummary, ClientError> {
        self.state = SessionState::Closing;
        self.stream.shutdown().await.context(SendSnafu)?;
        self.state = SessionState::Done;
        let summary = SessionSummary {
            records: self.records,
            bytes:   self.bytes,
            elapsed: self.started.elapsed(),
        };
        debug!(state = %self.state, %summary, "session finished");
        Ok(summary)
    }
}
