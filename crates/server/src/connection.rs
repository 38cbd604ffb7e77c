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

//! Per-connection reader.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use inchrosil_base::{PipelineMetrics, SequenceRecord};
use inchrosil_common_queue::WorkQueue;
use inchrosil_parser::{FrameParser, SequenceDraft};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) struct ConnectionCtx {
    pub queue:       WorkQueue<SequenceRecord>,
    pub metrics:     Arc<PipelineMetrics>,
    pub seq_counter: Arc<AtomicU64>,
    pub token:       CancellationToken,
    pub recv_chunk:  usize,
    pub max_seq_len: usize,
}

/// Read the socket until close, cancellation or a closed queue, feeding the
/// frame parser and enqueueing complete records.
///
/// End-of-stream (zero read, error or cancellation) flushes the parser tail
/// before the reader exits; tail pushes hitting a closed queue are
/// tolerated, that is the normal shutdown race.
pub(crate) async fn run(
    mut stream: tokio::net::TcpStream,
    peer: SocketAddr,
    ctx: ConnectionCtx,
) {
    let origin = peer.to_string();
    let mut parser = FrameParser::new(ctx.max_seq_len);
    let mut drafts: Vec<SequenceDraft> = Vec::new();
    let mut buf = vec![0u8; ctx.recv_chunk];
    let mut queue_closed = false;

    loop {
        tokio::select! {
            () = ctx.token.cancelled() => {
                debug!(%peer, "connection cancelled by shutdown");
                break;
            }
            read = stream.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    ctx.metrics.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
                    parser.push_bytes(&buf[..n]);
                    parser.drain(&mut drafts);
                    ctx.metrics.parsing_errors.fetch_add(parser.take_dropped(), Ordering::Relaxed);
                    if !enqueue(&mut drafts, &origin, &ctx) {
                        queue_closed = true;
                        break;
                    }
                }
                Err(err) => {
                    debug!(%peer, %err, "read failed, treating as close");
                    break;
                }
            },
        }
    }

    if !queue_closed {
        parser.finish(&mut drafts);
        ctx.metrics
            .parsing_errors
            .fetch_add(parser.take_dropped(), Ordering::Relaxed);
        let _ = enqueue(&mut drafts, &origin, &ctx);
    }

    ctx.metrics.active_connections.fetch_sub(1, Ordering::Relaxed);
    debug!(%peer, "connection closed");
}

/// Stamp and push drained records; returns `false` once the queue reports
/// closed, which aborts the connection.
fn enqueue(drafts: &mut Vec<SequenceDraft>, origin: &str, ctx: &ConnectionCtx) -> bool {
    for draft in drafts.drain(..) {
        let seq_id = ctx.seq_counter.fetch_add(1, Ordering::Relaxed);
        let record = draft.into_record(seq_id, origin);
        // Backpressure: push blocks when the queue is full. Runs under
        // block_in_place so a stalled worker pool does not wedge the
        // reactor thread.
        let pushed = tokio::task::block_in_place(|| ctx.queue.push(record));
        match pushed {
            Ok(()) => {
                ctx.metrics
                    .sequences_accepted
                    .fetch_add(1, Ordering::Relaxed);
            }
            Err(_closed) => return false,
        }
    }
    true
}
