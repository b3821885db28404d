//! pin-ledger command line entry point
//!
//! Uploads files to the pinning service and reads or appends ledger records.
//! Results are printed to stdout as JSON.

use std::path::{Path, PathBuf};
#[cfg(feature = "rest-api")]
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use pin_ledger::telemetry::{self, LogFormat};
use pin_ledger::{LedgerAdapter, Settings, UploadRequest, Uploader};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(name = "pin-ledger", version = VERSION, about)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pin one or more files and print their CIDs in argument order
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Pin a file and record its CID on the ledger under a camp label
    Append {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        camp: String,
    },
    /// Print every record stored in the ledger contract
    Records,
    /// Print the accounts known to the node
    Accounts,
    /// Serve the REST API
    #[cfg(feature = "rest-api")]
    Serve {
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen: std::net::SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_format)?;
    info!("pin-ledger v{}", VERSION);

    let result = run(cli.command, &cli.settings).await;

    telemetry::shutdown_telemetry();
    result
}

async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Command::Upload { files } => {
            let uploader = Uploader::from_settings(settings)?;
            let mut requests = Vec::with_capacity(files.len());
            for path in &files {
                requests.push(UploadRequest::new(label_for(path), read_file(path).await?));
            }
            let cids = uploader.upload_batch(requests).await?;
            print_json(&cids)
        }
        Command::Append { file, camp } => {
            let adapter = LedgerAdapter::from_settings(settings).await?;
            let content = read_file(&file).await?;
            let receipt = adapter.append_record(&label_for(&file), content, &camp).await?;
            print_json(&receipt)
        }
        Command::Records => {
            let adapter = LedgerAdapter::from_settings(settings).await?;
            print_json(&adapter.list_records().await?)
        }
        Command::Accounts => {
            let adapter = LedgerAdapter::from_settings(settings).await?;
            print_json(&adapter.list_accounts().await?)
        }
        #[cfg(feature = "rest-api")]
        Command::Serve { listen } => {
            let adapter = Arc::new(LedgerAdapter::from_settings(settings).await?);
            // Connect up front so a misconfigured node fails at startup.
            adapter.ensure_connected().await?;
            pin_ledger::rest_api::run_server(adapter, listen).await?;
            Ok(())
        }
    }
}

/// Files are pinned under their file name
fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
