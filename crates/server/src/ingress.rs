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

//! Listener setup and the accept loop.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use bon::Builder;
use inchrosil_base::{
    DEFAULT_PORT, MAX_CLIENTS, MAX_SEQ_LEN, PipelineMetrics, RECV_CHUNK, SequenceRecord,
};
use inchrosil_common_queue::WorkQueue;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{BindSnafu, IngressHandle, Result, connection};

/// Ingress tunables. Defaults mirror the pipeline-wide constants.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct IngressConfig {
    /// Listen address; port 0 picks an ephemeral port.
    #[builder(default = format!("0.0.0.0:{DEFAULT_PORT}"))]
    pub bind_addr:   String,
    /// Soft cap on concurrent connections; excess ones are accepted and
    /// immediately closed with no data read.
    #[builder(default = MAX_CLIENTS)]
    pub max_clients: usize,
    /// Receive buffer size per read call.
    #[builder(default = RECV_CHUNK)]
    pub recv_chunk:  usize,
    /// Sequences longer than this are dropped as parsing errors.
    #[builder(default = MAX_SEQ_LEN)]
    pub max_seq_len: usize,
}

impl Default for IngressConfig {
    fn default() -> Self { Self::builder().build() }
}

/// Bind the listener and spawn the accept loop.
///
/// Fails fast on bind errors (the only fatal server-side error); once this
/// returns the service is accepting connections.
pub async fn start_ingress(
    config: IngressConfig,
    queue: WorkQueue<SequenceRecord>,
    metrics: Arc<PipelineMetrics>,
) -> Result<IngressHandle> {
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .context(BindSnafu {
            addr: config.bind_addr.clone(),
        })?;
    let local_addr = listener.local_addr().context(BindSnafu {
        addr: config.bind_addr.clone(),
    })?;
    info!(%local_addr, max_clients = config.max_clients, "dna ingress listening");

    let cancellation_token = CancellationToken::new();
    let join_handle = tokio::spawn(accept_loop(
        listener,
        config,
        queue,
        metrics,
        cancellation_token.clone(),
    ));

    Ok(IngressHandle {
        join_handle,
        cancellation_token,
        local_addr,
    })
}

async fn accept_loop(
    listener: TcpListener,
    config: IngressConfig,
    queue: WorkQueue<SequenceRecord>,
    metrics: Arc<PipelineMetrics>,
    token: CancellationToken,
) {
    // seq_ids are stamped at enqueue time and strictly increase across the
    // whole process lifetime.
    let seq_counter = Arc::new(AtomicU64::new(0));
    let mut readers = JoinSet::new();

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    metrics.total_connections.fetch_add(1, Ordering::Relaxed);
                    let active = metrics.active_connections.load(Ordering::Relaxed);
                    if active >= config.max_clients as u64 {
                        warn!(%peer, active, cap = config.max_clients, "client cap reached, closing connection");
                        drop(stream);
                        continue;
                    }
                    metrics.active_connections.fetch_add(1, Ordering::Relaxed);
                    info!(%peer, "accepted connection");
                    readers.spawn(connection::run(
                        stream,
                        peer,
                        connection::ConnectionCtx {
                            queue:       queue.clone(),
                            metrics:     Arc::clone(&metrics),
                            seq_counter: Arc::clone(&seq_counter),
                            token:       token.child_token(),
                            recv_chunk:  config.recv_chunk,
                            max_seq_len: config.max_seq_len,
                        },
                    ));
                }
                Err(err) => error!(%err, "failed to accept connection"),
            },
        }
    }

    // Stop accepting, then drive every live reader to completion; their
    // child tokens are already cancelled, so each flushes its parser tail
    // and exits.
    drop(listener);
    while readers.join_next().await.is_some() {}
    info!("ingress stopped");
}
