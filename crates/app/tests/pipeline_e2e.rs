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

//! End-to-end: a real socket into a running app, files out.

use std::{path::Path, time::Duration};

use inchrosil_app::{AppConfig, RunningApp};
use inchrosil_base::PipelineMetrics;
use inchrosil_codec::crc32;
use inchrosil_container::single;
use tempfile::TempDir;
use tokio::{io::AsyncWriteExt, net::TcpStream};

async fn start_app(out_dir: &Path) -> RunningApp {
    AppConfig::builder()
        .host("127.0.0.1".to_string())
        .port(0)
        .out_dir(out_dir.to_path_buf())
        .workers(2)
        .status_interval(Duration::from_secs(3600))
        .build()
        .open()
        .start()
        .await
        .unwrap()
}

/// Wait until the pipeline has resolved `accepted` records into stores or
/// errors, or panic after a few seconds.
async fn wait_for_resolved(metrics: &PipelineMetrics, accepted: u64) {
    for _ in 0..100 {
        let snap = metrics.snapshot();
        if snap.sequences_accepted >= accepted
            && snap.sequences_stored + snap.total_errors() >= accepted
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "pipeline did not settle: {:?}",
        metrics.snapshot()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_pipeline_scenarios() {
    let out_dir = TempDir::new().unwrap();
    let app = start_app(out_dir.path()).await;
    let metrics = app.metrics();

    let mut client = TcpStream::connect(app.local_addr()).await.unwrap();
    // One connection, five records in order:
    //   0: raw 16-mer        -> payload 0x1B x4
    //   1: FASTA seq1 ACGT   -> payload 0x1B
    //   2: FASTA seq2 GGGG   -> payload 0xAA
    //   3: FASTQ r ACGT      -> payload 0x1B, quality discarded
    //   4: raw with invalid byte -> validation error, no file
    client
        .write_all(b"ACGTACGTACGTACGT\n>seq1\nACGT\n>seq2\nGGGG\n@r\nACGT\n+\nIIII\nATCGX\n")
        .await
        .unwrap();
    client.shutdown().await.unwrap();
    drop(client);

    wait_for_resolved(&metrics, 5).await;
    app.shutdown().await;

    let snap = metrics.snapshot();
    assert_eq!(snap.sequences_accepted, 5);
    assert_eq!(snap.sequences_stored, 4);
    assert_eq!(snap.validation_errors, 1);
    assert_eq!(snap.storage_errors, 0);

    // Record 0: raw 16-mer.
    let (meta, payload) = single::read(out_dir.path().join("dna_output_0.ich")).unwrap();
    assert_eq!(meta.length, 16);
    assert_eq!(meta.format, "RAW");
    assert_eq!(meta.id, "");
    assert!(meta.client.starts_with("127.0.0.1:"));
    assert_eq!(meta.checksum, crc32(b"ACGTACGTACGTACGT"));
    assert_eq!(payload, vec![0x1B, 0x1B, 0x1B, 0x1B]);

    // Records 1 and 2: the FASTA pair, distinct increasing seq_ids.
    let (meta1, payload1) = single::read(out_dir.path().join("dna_output_1.ich")).unwrap();
    assert_eq!(meta1.id, "seq1");
    assert_eq!(meta1.format, "FASTA");
    assert_eq!(meta1.length, 4);
    assert_eq!(payload1, vec![0x1B]);

    let (meta2, payload2) = single::read(out_dir.path().join("dna_output_2.ich")).unwrap();
    assert_eq!(meta2.id, "seq2");
    assert_eq!(payload2, vec![0xAA]);

    // Record 3: FASTQ; quality must not appear anywhere in the file.
    let (meta3, payload3) = single::read(out_dir.path().join("dna_output_3.ich")).unwrap();
    assert_eq!(meta3.id, "r");
    assert_eq!(meta3.format, "FASTQ");
    assert_eq!(payload3, vec![0x1B]);
    let raw = std::fs::read(out_dir.path().join("dna_output_3.ich")).unwrap();
    assert!(
        !raw.windows(4).any(|w| w == b"IIII"),
        "quality block leaked into the persisted file"
    );

    // Record 4 failed validation: seq_id gap in the output directory.
    assert!(!out_dir.path().join("dna_output_4.ich").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_resolves_all_accepted_records() {
    let out_dir = TempDir::new().unwrap();
    let app = start_app(out_dir.path()).await;
    let metrics = app.metrics();

    let mut client = TcpStream::connect(app.local_addr()).await.unwrap();
    let mut payload = Vec::new();
    for _ in 0..200 {
        payload.extend_from_slice(b"ACGTACGTACGTACGTACGTACGTACGTACGT\n");
    }
    client.write_all(&payload).await.unwrap();
    client.shutdown().await.unwrap();

    // Shut down while records may still be queued; everything accepted
    // must be persisted or counted before shutdown returns.
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(client);
    app.shutdown().await;

    let snap = metrics.snapshot();
    assert_eq!(
        snap.sequences_stored + snap.total_errors(),
        snap.sequences_accepted,
        "accepted records left unresolved after shutdown: {snap:?}"
    );

    let outputs = std::fs::read_dir(out_dir.path()).unwrap().count();
    assert_eq!(outputs as u64, snap.sequences_stored);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_concurrent_connections_interleave_safely() {
    let out_dir = TempDir::new().unwrap();
    let app = start_app(out_dir.path()).await;
    let metrics = app.metrics();

    let addr = app.local_addr();
    let writers: Vec<_> = (0..2)
        .map(|_| {
            tokio::spawn(async move {
                let mut client = TcpStream::connect(addr).await.unwrap();
                for _ in 0..50 {
                    client.write_all(b"ACGTACGT\n").await.unwrap();
                }
                client.shutdown().await.unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    wait_for_resolved(&metrics, 100).await;
    app.shutdown().await;

    let snap = metrics.snapshot();
    assert_eq!(snap.sequences_accepted, 100);
    assert_eq!(snap.sequences_stored, 100);
    assert_eq!(snap.total_connections, 2);

    // seq_ids are unique: 100 distinct output files.
    let outputs = std::fs::read_dir(out_dir.path()).unwrap().count();
    assert_eq!(outputs, 100);
}
