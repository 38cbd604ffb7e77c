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

//! The worker pool.
//!
//! `W` dedicated OS threads loop on the work queue; blocking `pop` is the
//! only suspension point. Shutdown is driven entirely through the queue:
//! once the orchestrator closes it, every worker drains the remainder,
//! observes the shutdown marker and exits. `join` then collects the
//! threads.

use std::{
    env, io,
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
};

use inchrosil_base::{OUT_DIR_ENV, PipelineMetrics, SequenceRecord};
use inchrosil_common_queue::{Popped, WorkQueue};
use tracing::{debug, info};

use crate::worker::process_record;

/// Where workers put `dna_output_<seq_id>.ich` files.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    pub out_dir: PathBuf,
}

impl Default for PersistConfig {
    /// `INCHROSIL_OUT_DIR` when set, the current directory otherwise.
    fn default() -> Self {
        Self {
            out_dir: env::var_os(OUT_DIR_ENV).map_or_else(|| PathBuf::from("."), PathBuf::from),
        }
    }
}

/// Handle over the running worker threads.
pub struct WorkerPool {
    handles: Vec<JoinHandle<u64>>,
}

impl WorkerPool {
    /// Spawn `workers` threads (0 means one per CPU core) draining `queue`.
    ///
    /// The output directory is created if missing so the first record does
    /// not pay for the failure path.
    pub fn start(
        workers: usize,
        queue: WorkQueue<SequenceRecord>,
        metrics: Arc<PipelineMetrics>,
        config: PersistConfig,
    ) -> io::Result<Self> {
        let workers = if workers == 0 {
            thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            workers
        };
        std::fs::create_dir_all(&config.out_dir)?;

        info!(workers, out_dir = %config.out_dir.display(), "starting worker pool");

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let queue = queue.clone();
            let metrics = Arc::clone(&metrics);
            let out_dir = config.out_dir.clone();
            let handle = thread::Builder::new()
                .name(format!("dna-worker-{i}"))
                .spawn(move || {
                    let mut processed = 0u64;
                    loop {
                        match queue.pop() {
                            Popped::Item(record) => {
                                if process_record(&record, &out_dir, &metrics) {
                                    processed += 1;
                                }
                            }
                            Popped::Shutdown => break,
                        }
                    }
                    debug!(worker = i, processed, "worker draining complete");
                    processed
                })?;
            handles.push(handle);
        }

        Ok(Self { handles })
    }

    #[must_use]
    pub fn worker_count(&self) -> usize { self.handles.len() }

    /// Wait for every worker to exit. Call after closing the queue;
    /// otherwise this blocks until the queue is closed elsewhere.
    pub fn join(self) {
        let mut stored = 0u64;
        for handle in self.handles {
            match handle.join() {
                Ok(count) => stored += count,
                Err(_) => tracing::error!("worker thread panicked"),
            }
        }
        info!(stored, "worker pool stopped");
    }
}
