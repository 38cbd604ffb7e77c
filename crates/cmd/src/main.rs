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

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use inchrosil_app::AppConfig;
use inchrosil_base::{DEFAULT_PORT, MAX_SEQ_LEN};
use inchrosil_client::{ClientConfig, DEFAULT_STRESS_LEN, Mode};
use inchrosil_codec::{crc32, validate};
use inchrosil_common_telemetry as telemetry;
use inchrosil_container::{ContainerReader, ContainerWriter};
use inchrosil_parser::FrameParser;
use snafu::{ResultExt, Whatever};
use tracing::warn;

#[derive(Debug, Parser)]
#[clap(
    name = "inchrosil",
    about = "DNA ingestion and compression pipeline",
    version
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Server(ServerArgs),
    Client(ClientArgs),
    Pack(PackArgs),
    Unpack(UnpackArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Starts the DNA ingestion server.
Examples:

inchrosil server
inchrosil server 9191

")]
struct ServerArgs {
    /// TCP port to listen on.
    #[arg(value_name = "PORT")]
    port: Option<u16>,
}

impl ServerArgs {
    async fn run(&self) -> Result<(), Whatever> {
        let app = AppConfig::builder()
            .port(self.port.unwrap_or(DEFAULT_PORT))
            .build()
            .open();
        app.run().await
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Streams sequences to a running server. With no mode flag a single built-in
test sequence is sent.
Examples:

inchrosil client localhost
inchrosil client localhost 9191 --file genome.fasta
inchrosil client localhost --interactive
inchrosil client localhost --stress 10000 --length 500

")]
struct ClientArgs {
    /// Server host name or address.
    host: String,

    /// Server port.
    #[arg(value_name = "PORT")]
    port: Option<u16>,

    /// Send the records of a FASTA/FASTQ/raw file.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["interactive", "stress"])]
    file: Option<PathBuf>,

    /// Read raw records from stdin; quit/exit/q ends the session.
    #[arg(long, conflicts_with = "stress")]
    interactive: bool,

    /// Send COUNT random sequences.
    #[arg(long, value_name = "COUNT")]
    stress: Option<u64>,

    /// Length in bases of each stress-mode sequence.
    #[arg(long, value_name = "BASES", requires = "stress")]
    length: Option<usize>,
}

impl ClientArgs {
    async fn run(&self) -> Result<(), Whatever> {
        let mode = if let Some(path) = &self.file {
            Mode::File(path.clone())
        } else if self.interactive {
            Mode::Interactive
        } else if let Some(count) = self.stress {
            Mode::Stress {
                count,
                length: self.length.unwrap_or(DEFAULT_STRESS_LEN),
            }
        } else {
            Mode::Single
        };

        let summary = inchrosil_client::run(ClientConfig {
            host: self.host.clone(),
            port: self.port.unwrap_or(DEFAULT_PORT),
            mode,
            report_every: 100,
        })
        .await
        .whatever_context("client session failed")?;

        println!("{summary}");
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Packs the records of a FASTA file into one binary container. Records with
out-of-alphabet bytes are skipped with a warning.
Examples:

inchrosil pack genome.fasta genome.ich

")]
struct PackArgs {
    /// Input sequence file.
    input:  PathBuf,
    /// Output container path.
    output: PathBuf,
}

impl PackArgs {
    fn run(&self) -> Result<(), Whatever> {
        let bytes = std::fs::read(&self.input)
            .whatever_context(format!("failed to read {}", self.input.display()))?;

        let mut parser = FrameParser::new(MAX_SEQ_LEN);
        let mut drafts = Vec::new();
        parser.push_bytes(&bytes);
        parser.finish(&mut drafts);

        let mut writer = ContainerWriter::new();
        let mut skipped = 0usize;
        for (i, draft) in drafts.iter().enumerate() {
            if let Err(invalid) = validate(&draft.sequence) {
                warn!(record = i, id = %draft.id, %invalid, "skipping record");
                skipped += 1;
                continue;
            }
            let name = if draft.id.is_empty() {
                format!("record_{i}")
            } else {
                draft.id.clone()
            };
            writer.add_record(name, &draft.sequence);
        }

        let summary = writer
            .finish(&self.output)
            .whatever_context(format!("failed to write {}", self.output.display()))?;

        println!(
            "packed {} sequences, {} bases, {} payload bytes -> {}",
            summary.sequence_count,
            summary.total_bases,
            summary.compressed_size,
            self.output.display()
        );
        if skipped > 0 {
            println!("skipped {skipped} invalid records");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Reads a binary container back, verifies it and prints its inventory.
Examples:

inchrosil unpack genome.ich
inchrosil unpack genome.ich --fasta > genome.fasta

")]
struct UnpackArgs {
    /// Container to read.
    input: PathBuf,

    /// Dump the decoded records as FASTA on stdout.
    #[arg(long)]
    fasta: bool,
}

impl UnpackArgs {
    fn run(&self) -> Result<(), Whatever> {
        let mut reader = ContainerReader::open(&self.input)
            .whatever_context(format!("failed to open {}", self.input.display()))?;
        reader
            .verify()
            .whatever_context("container failed verification")?;

        println!(
            "sequence_count={} total_bases={} compressed_size={}",
            reader.sequence_count(),
            reader.total_bases(),
            reader.compressed_size()
        );

        let records = reader.records();
        for (i, record) in records.iter().enumerate() {
            let sequence = reader
                .sequence(i)
                .whatever_context(format!("failed to read record {i}"))?;
            if self.fasta {
                println!(">{}", record.name);
                println!("{}", String::from_utf8_lossy(&sequence));
            } else {
                println!(
                    "{i}\t{}\t{} bases\tcrc 0x{:08X}",
                    record.name,
                    record.length_in_bases,
                    crc32(&sequence)
                );
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    human_panic::setup_panic!();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version are not failures.
            let is_usage_error = err.use_stderr();
            let _ = err.print();
            return if is_usage_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let result = match cli.commands {
        Commands::Server(args) => args.run().await,
        Commands::Client(args) => {
            let _guards = telemetry::logging::init_tracing_subscriber("inchrosil");
            args.run().await
        }
        Commands::Pack(args) => {
            let _guards = telemetry::logging::init_tracing_subscriber("inchrosil");
            args.run()
        }
        Commands::Unpack(args) => args.run(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
