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

//! TCP ingress.
//!
//! Accepts client connections and feeds the work queue: one accept loop,
//! one reader task per connection. Each reader owns a receive buffer and a
//! frame parser, stamps drained records with `origin = ip:port` and the
//! next global `seq_id`, and pushes them into the bounded queue. The server
//! is a pure sink; nothing is ever written back to clients.

mod connection;
mod ingress;

use std::net::SocketAddr;

use snafu::Snafu;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use ingress::{IngressConfig, start_ingress};

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum IngressError {
    #[snafu(display("failed to bind tcp listener on {addr}"))]
    Bind {
        addr:   String,
        #[snafu(source)]
        source: std::io::Error,
    },
}

type Result<T> = std::result::Result<T, IngressError>;

/// Handle for managing the running ingress service.
///
/// The listener is bound before this handle exists, so the service is
/// accepting connections as soon as `start_ingress` returns. The handle
/// provides graceful shutdown: cancelling stops the accept loop and drives
/// every per-connection reader to flush its parser tail and exit.
pub struct IngressHandle {
    /// Join handle for the accept-loop task.
    join_handle:        JoinHandle<()>,
    /// Token for signalling shutdown.
    cancellation_token: CancellationToken,
    /// The address the listener actually bound (useful with port 0).
    local_addr:         SocketAddr,
}

impl IngressHandle {
    /// The bound listen address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr { self.local_addr }

    /// Signals the ingress to begin graceful shutdown.
    ///
    /// Triggers the shutdown process but does not wait for completion; use
    /// [`wait_for_stop`](Self::wait_for_stop) for that.
    pub fn shutdown(&self) { self.cancellation_token.cancel(); }

    /// Waits for the accept loop and every connection reader to finish.
    pub async fn wait_for_stop(self) {
        if let Err(err) = self.join_handle.await {
            tracing::error!(%err, "ingress task failed");
        }
    }

    /// Checks if the ingress task has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool { self.join_handle.is_finished() }
}
