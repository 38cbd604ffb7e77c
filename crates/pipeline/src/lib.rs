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

//! The CPU side of the pipeline: a pool of OS worker threads draining the
//! work queue. Each record goes through validate → checksum → encode →
//! persist; failures are counted and logged, never propagated — a worker
//! only exits on the queue's shutdown signal.

mod pool;
mod worker;

pub use pool::{PersistConfig, WorkerPool};
