//! Bulk Orders CLI
//!
//! Command-line interface for ingesting bulk order uploads from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- template > orders.csv
//! cargo run -- --store store.json ingest --uploader acme orders.csv > result.json
//! cargo run -- --store store.json ingest --uploader acme --strategy sync --format csv orders.csv
//! cargo run -- --store store.json ingest --uploader acme --max-concurrent 8 --chunk-size 1000 orders.csv
//! cargo run -- --store store.json batches --page 0 --page-size 20
//! ```
//!
//! Results are written to stdout. Logs go to stderr and are filtered with
//! `RUST_LOG` (default `info`).
//!
//! # Processing Strategies
//!
//! - **sync**: Rows processed one after another
//! - **async**: Rows processed concurrently, bounded by `--max-concurrent` (default)
//!
//! # Exit Codes
//!
//! - 0: Success (row-level failures are reported in the result, not here)
//! - 1: Error (file not found, structurally invalid file, no data rows, etc.)

use bulk_order_engine::cli;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(&args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
