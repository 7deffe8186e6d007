//! Command execution
//!
//! Loads the snapshot named by `--store`, runs one subcommand against the
//! restored stores, and saves the snapshot again. Results go to `output`;
//! diagnostics go through `tracing`.

use super::args::{CliArgs, Command, IngestArgs, OutputFormat, StrategyType};
use crate::core::{InMemoryBatchRepository, InMemoryOrderRepository};
use crate::io::{write_json, write_outcomes_csv, write_template_csv, Snapshot};
use crate::strategy::{create_strategy, list_batches, IngestRequest, Repositories};
use crate::types::{IngestError, PageRequest, Scope};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Run a parsed command line, writing its result to `output`
pub fn run(args: &CliArgs, output: &mut dyn Write) -> Result<(), IngestError> {
    match &args.command {
        Command::Template => write_template_csv(output),
        Command::Ingest(ingest) => {
            let stores = Stores::load(args.store.as_deref())?;
            let result = run_ingest(ingest, &stores, output);
            // A failed upload still leaves a FAILED batch worth keeping
            stores.save(args.store.as_deref())?;
            result
        }
        Command::Batches(batches) => {
            let stores = Stores::load(args.store.as_deref())?;
            let page = list_batches(
                &stores.repositories(),
                PageRequest::new(batches.page, batches.page_size),
            )?;
            write_json(&page, output)
        }
    }
}

fn run_ingest(
    args: &IngestArgs,
    stores: &Stores,
    output: &mut dyn Write,
) -> Result<(), IngestError> {
    let config = match args.strategy {
        StrategyType::Async => Some(args.to_batch_config()),
        StrategyType::Sync => None,
    };
    let strategy = create_strategy(args.strategy, config);
    let request = IngestRequest::new(&args.input_file, Scope::new(args.uploader.as_str()));

    let result = strategy.ingest(&request, &stores.repositories())?;

    match args.format {
        OutputFormat::Json => write_json(&result, output),
        OutputFormat::Csv => write_outcomes_csv(&result, output),
    }
}

/// Concrete stores behind the repository traits, kept for snapshotting
struct Stores {
    orders: Arc<InMemoryOrderRepository>,
    batches: Arc<InMemoryBatchRepository>,
}

impl Stores {
    fn load(path: Option<&Path>) -> Result<Self, IngestError> {
        let snapshot = match path {
            Some(path) => Snapshot::load(path)?,
            None => Snapshot::default(),
        };
        let (orders, batches) = snapshot.restore();
        Ok(Self {
            orders: Arc::new(orders),
            batches: Arc::new(batches),
        })
    }

    fn save(&self, path: Option<&Path>) -> Result<(), IngestError> {
        let Some(path) = path else {
            return Ok(());
        };
        let snapshot = Snapshot::capture(&self.orders, &self.batches);
        snapshot.save(path)?;
        info!(
            path = %path.display(),
            orders = snapshot.orders.len(),
            batches = snapshot.batches.len(),
            "store saved"
        );
        Ok(())
    }

    fn repositories(&self) -> Repositories {
        Repositories::new(self.orders.clone(), self.batches.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_template_needs_no_store() {
        let args = CliArgs::try_parse_from(["program", "template"]).unwrap();
        let mut output = Vec::new();

        run(&args, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("clientReference,clientName,clientEmail,"));
        assert!(text.trim_end().ends_with("specialInstructions"));
    }

    #[test]
    fn test_failed_ingest_is_saved_to_store() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("empty.csv");
        std::fs::write(&input, "").unwrap();
        let store = dir.path().join("store.json");

        let args = CliArgs::try_parse_from([
            "program",
            "--store",
            store.to_str().unwrap(),
            "ingest",
            "--uploader",
            "acme",
            input.to_str().unwrap(),
        ])
        .unwrap();
        let result = run(&args, &mut Vec::new());

        assert!(matches!(result, Err(IngestError::Structural { .. })));
        let snapshot = Snapshot::load(&store).unwrap();
        assert_eq!(snapshot.batches.len(), 1);
        assert!(snapshot.orders.is_empty());
    }
}
