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

//! Shared building blocks for the inchrosil pipeline: the sequence record
//! that flows from ingress to the workers, the pipeline-wide metric
//! counters, and the tunable defaults every component agrees on.

pub mod metrics;
pub mod record;

pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use record::{FormatHint, SequenceRecord};

/// Default TCP port the ingress server listens on.
pub const DEFAULT_PORT: u16 = 9090;

/// Default capacity of the bounded work queue between ingress and workers.
pub const QUEUE_CAPACITY: usize = 1024;

/// Soft cap on concurrently served client connections. Connections beyond
/// the cap are accepted and immediately closed with no data read.
pub const MAX_CLIENTS: usize = 16;

/// Maximum bytes read from a socket in one receive call.
pub const RECV_CHUNK: usize = 64 * 1024;

/// Upper bound on the length of a single sequence, in bases. Records
/// exceeding this are dropped and counted as parsing errors.
pub const MAX_SEQ_LEN: usize = 1 << 30;

/// Environment variable that relocates server output files. Unset means
/// the current working directory.
pub const OUT_DIR_ENV: &str = "INCHROSIL_OUT_DIR";
