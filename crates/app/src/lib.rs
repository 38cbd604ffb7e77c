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

//! Application orchestration.
//!
//! The orchestrator owns the work queue and the worker pool, starts the
//! ingress server and the periodic status reporter, and drives coordinated
//! shutdown: stop accepting, drain the readers, close the queue, join the
//! workers. All threads are joined before `run` returns.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use bon::Builder;
use inchrosil_base::{
    DEFAULT_PORT, MAX_CLIENTS, MAX_SEQ_LEN, PipelineMetrics, QUEUE_CAPACITY, RECV_CHUNK,
    SequenceRecord,
};
use inchrosil_common_queue::WorkQueue;
use inchrosil_common_telemetry as telemetry;
use inchrosil_pipeline::{PersistConfig, WorkerPool};
use inchrosil_server::{IngressConfig, IngressHandle, start_ingress};
use snafu::{ResultExt, Whatever};
use telemetry::logging::LoggingOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Configuration for the whole server application.
#[derive(Debug, Clone, Builder)]
pub struct AppConfig {
    /// Interface the ingress binds.
    #[builder(default = "0.0.0.0".to_string())]
    pub host:            String,
    /// TCP port; 0 picks an ephemeral port (tests).
    #[builder(default = DEFAULT_PORT)]
    pub port:            u16,
    /// Where workers put output files; `None` falls back to
    /// `INCHROSIL_OUT_DIR` or the current directory.
    pub out_dir:         Option<PathBuf>,
    /// Worker threads; 0 means one per CPU core.
    #[builder(default = 0)]
    pub workers:         usize,
    #[builder(default = QUEUE_CAPACITY)]
    pub queue_capacity:  usize,
    #[builder(default = MAX_CLIENTS)]
    pub max_clients:     usize,
    #[builder(default = RECV_CHUNK)]
    pub recv_chunk:      usize,
    #[builder(default = MAX_SEQ_LEN)]
    pub max_seq_len:     usize,
    /// Cadence of the one-line status summary.
    #[builder(default = Duration::from_secs(10))]
    pub status_interval: Duration,
    #[builder(default)]
    pub logging:         LoggingOptions,
}

impl Default for AppConfig {
    fn default() -> Self { Self::builder().build() }
}

impl AppConfig {
    #[must_use]
    pub fn open(self) -> App { App { config: self } }
}

/// The assembled application, ready to start.
pub struct App {
    config: AppConfig,
}

impl App {
    /// Build the pipeline and start serving.
    ///
    /// Infrastructure failures (bind, worker spawn) are the only errors;
    /// per-record problems are counters, not errors.
    pub async fn start(&self) -> Result<RunningApp, Whatever> {
        let metrics = Arc::new(PipelineMetrics::new());
        let queue: WorkQueue<SequenceRecord> = WorkQueue::bounded(self.config.queue_capacity);

        let persist = self.config.out_dir.as_ref().map_or_else(PersistConfig::default, |dir| {
            PersistConfig {
                out_dir: dir.clone(),
            }
        });

        let pool = WorkerPool::start(
            self.config.workers,
            queue.clone(),
            Arc::clone(&metrics),
            persist,
        )
        .whatever_context("failed to start worker pool")?;

        let ingress_config = IngressConfig::builder()
            .bind_addr(format!("{}:{}", self.config.host, self.config.port))
            .max_clients(self.config.max_clients)
            .recv_chunk(self.config.recv_chunk)
            .max_seq_len(self.config.max_seq_len)
            .build();
        let ingress = start_ingress(ingress_config, queue.clone(), Arc::clone(&metrics))
            .await
            .whatever_context("failed to start ingress")?;

        let status_token = CancellationToken::new();
        let status_task = tokio::spawn(status_reporter(
            Arc::clone(&metrics),
            self.config.status_interval,
            status_token.clone(),
        ));

        Ok(RunningApp {
            ingress,
            queue,
            pool,
            metrics,
            status_task,
            status_token,
        })
    }

    /// Run until Ctrl-C / SIGTERM, then shut down in order.
    pub async fn run(self) -> Result<(), Whatever> {
        let _guards = telemetry::logging::init_global_logging("inchrosil", &self.config.logging);
        telemetry::panic_hook::set_panic_hook();

        let running = self.start().await?;
        info!(addr = %running.local_addr(), "inchrosil server ready");

        shutdown_signal().await;
        running.shutdown().await;
        Ok(())
    }
}

/// Handle over a started application.
pub struct RunningApp {
    ingress:      IngressHandle,
    queue:        WorkQueue<SequenceRecord>,
    pool:         WorkerPool,
    metrics:      Arc<PipelineMetrics>,
    status_task:  tokio::task::JoinHandle<()>,
    status_token: CancellationToken,
}

impl RunningApp {
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr { self.ingress.local_addr() }

    #[must_use]
    pub fn metrics(&self) -> Arc<PipelineMetrics> { Arc::clone(&self.metrics) }

    /// Coordinated shutdown: stop accepting and cancel readers (they flush
    /// parser tails first), close the queue, drain and join the workers,
    /// stop the reporter. Everything accepted by the ingress has been
    /// persisted or counted by the time this returns.
    pub async fn shutdown(self) {
        info!("shutting down");
        self.ingress.shutdown();
        self.ingress.wait_for_stop().await;

        self.queue.close();
        let pool = self.pool;
        if let Err(err) = tokio::task::spawn_blocking(move || pool.join()).await {
            error!(%err, "worker pool join failed");
        }

        self.status_token.cancel();
        let _ = self.status_task.await;

        info!("final status: {}", self.metrics.snapshot());
    }
}

/// Periodic one-line status summary.
async fn status_reporter(
    metrics: Arc<PipelineMetrics>,
    period: Duration,
    token: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = interval.tick() => info!("status: {}", metrics.snapshot()),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C signal"); },
        () = terminate => { info!("Received terminate signal"); },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_pipeline_tunables() {
        let config = AppConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.queue_capacity, QUEUE_CAPACITY);
        assert_eq!(config.max_clients, MAX_CLIENTS);
        assert_eq!(config.workers, 0);
        assert!(config.out_dir.is_none());
    }
}
