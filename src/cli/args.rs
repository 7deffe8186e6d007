use crate::core::BatchConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ingest bulk order uploads with per-row idempotency
#[derive(Parser, Debug)]
#[command(name = "bulk-orders")]
#[command(about = "Ingest bulk order uploads with per-row idempotency", long_about = None)]
pub struct CliArgs {
    /// JSON file holding orders and batches between runs
    #[arg(
        long = "store",
        global = true,
        env = "BULK_STORE",
        value_name = "PATH",
        help = "Snapshot file for orders and batches (in-memory only when omitted)"
    )]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest one CSV upload as a new batch
    Ingest(IngestArgs),
    /// List past batches, newest first
    Batches(BatchesArgs),
    /// Print the CSV template header
    Template,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Input CSV file path containing order rows
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Uploader identity; idempotency keys are scoped to it
    #[arg(long = "uploader", env = "BULK_UPLOADER", value_name = "ID")]
    pub uploader: String,

    /// Processing strategy to use for the upload
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for bounded concurrency"
    )]
    pub strategy: StrategyType,

    /// Maximum number of rows processed concurrently (async mode only)
    #[arg(
        long = "max-concurrent",
        env = "BULK_MAX_CONCURRENT",
        value_name = "COUNT",
        help = "Maximum number of rows processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_rows: Option<usize>,

    /// Records decoded per read (async mode only)
    #[arg(
        long = "chunk-size",
        value_name = "SIZE",
        help = "Number of records decoded per read (default: 500)"
    )]
    pub chunk_size: Option<usize>,

    /// Output format for the batch result
    #[arg(long = "format", value_name = "FORMAT", default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct BatchesArgs {
    /// Zero-based page number
    #[arg(long = "page", default_value_t = 0)]
    pub page: usize,

    #[arg(long = "page-size", default_value_t = 20)]
    pub page_size: usize,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// How an ingestion result is printed
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full result as pretty JSON
    Json,
    /// One line per row outcome
    Csv,
}

impl IngestArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take the defaults; zero values fall back to the
    /// defaults with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.max_concurrent_rows.is_some() || self.chunk_size.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.max_concurrent_rows
                    .unwrap_or(default.max_concurrent_rows),
                self.chunk_size.unwrap_or(default.read_chunk_size),
            )
        } else {
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ingest_args(args: &[&str]) -> IngestArgs {
        match CliArgs::try_parse_from(args).unwrap().command {
            Command::Ingest(ingest) => ingest,
            other => panic!("Expected ingest, got {:?}", other),
        }
    }

    #[rstest]
    #[case::default_strategy(&["program", "ingest", "--uploader", "acme", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "ingest", "--uploader", "acme", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "ingest", "--uploader", "acme", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        assert_eq!(ingest_args(args).strategy, expected);
    }

    #[test]
    fn test_ingest_defaults() {
        let parsed = ingest_args(&["program", "ingest", "--uploader", "acme", "input.csv"]);
        assert_eq!(parsed.uploader, "acme");
        assert_eq!(parsed.input_file, PathBuf::from("input.csv"));
        assert_eq!(parsed.format, OutputFormat::Json);
        assert_eq!(parsed.to_batch_config(), BatchConfig::default());
    }

    #[rstest]
    #[case::all_defaults(&["program", "ingest", "--uploader", "a", "input.csv"], num_cpus::get(), 500)]
    #[case::custom_max_concurrent(&["program", "ingest", "--uploader", "a", "--max-concurrent", "8", "input.csv"], 8, 500)]
    #[case::custom_chunk(&["program", "ingest", "--uploader", "a", "--chunk-size", "50", "input.csv"], num_cpus::get(), 50)]
    #[case::zero_values(
        &["program", "ingest", "--uploader", "a", "--max-concurrent", "0", "--chunk-size", "0", "input.csv"],
        num_cpus::get(),
        500
    )]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_max_concurrent: usize,
        #[case] expected_chunk: usize,
    ) {
        let config = ingest_args(args).to_batch_config();

        assert_eq!(config.max_concurrent_rows, expected_max_concurrent);
        assert_eq!(config.read_chunk_size, expected_chunk);
    }

    #[test]
    fn test_global_store_after_subcommand() {
        let parsed =
            CliArgs::try_parse_from(["program", "batches", "--store", "state.json"]).unwrap();
        assert_eq!(parsed.store, Some(PathBuf::from("state.json")));
    }

    #[rstest]
    #[case::defaults(&["program", "batches"], 0, 20)]
    #[case::custom(&["program", "batches", "--page", "2", "--page-size", "5"], 2, 5)]
    fn test_batches_paging(#[case] args: &[&str], #[case] page: usize, #[case] page_size: usize) {
        match CliArgs::try_parse_from(args).unwrap().command {
            Command::Batches(batches) => {
                assert_eq!(batches.page, page);
                assert_eq!(batches.page_size, page_size);
            }
            other => panic!("Expected batches, got {:?}", other),
        }
    }

    #[rstest]
    #[case::missing_command(&["program"])]
    #[case::missing_input(&["program", "ingest", "--uploader", "acme"])]
    #[case::invalid_strategy(&["program", "ingest", "--uploader", "acme", "--strategy", "invalid", "input.csv"])]
    #[case::invalid_format(&["program", "ingest", "--uploader", "acme", "--format", "xml", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
