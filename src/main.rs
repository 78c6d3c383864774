//! # Animal Health News
//!
//! A scraping pipeline that turns a list of news-article URLs into a
//! structured CSV dataset about animal-disease reporting.
//!
//! ## Features
//!
//! - Renders every article in a headless Chromium session, so
//!   script-built pages are read as a reader would see them
//! - Extracts title, body, language, publication date, location, disease,
//!   source class, named entities and 50/100/150-word summaries
//! - Keyword lists come from a built-in lexicon or a YAML file
//! - Writes checkpoints every few tasks and a final BOM-prefixed CSV
//! - Every input URL yields one row, with a status saying whether it worked
//!
//! ## Usage
//!
//! ```sh
//! animal_health_news -i urls.csv -o dataset.csv
//! animal_health_news --report dataset.csv
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Loading**: Read `(code, lien)` tasks from the input CSV
//! 2. **Fetching**: Navigate one reusable browser tab to each URL in order
//! 3. **Extraction**: Derive every field from the rendered page
//! 4. **Output**: Checkpoint periodically, then write the final dataset

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod batch;
mod cli;
mod extractors;
mod fetcher;
mod models;
mod outputs;
mod processor;
mod tasks;
mod utils;

use batch::BatchRunner;
use cli::Cli;
use extractors::FieldExtractors;
use extractors::lexicon::Lexicon;
use fetcher::chrome::ChromeLauncher;
use outputs::dataset::{ResultStore, read_records, write_records};
use outputs::report::BatchReport;
use processor::ArticleProcessor;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("animal_health_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    if let Some(path) = &args.report {
        let records = read_records(path).await?;
        info!(path = %path.display(), rows = records.len(), "Loaded dataset");
        BatchReport::from_records(&records).log();
        return Ok(());
    }
    let Some(input) = &args.input else {
        return Err("an input CSV is required (--input or NEWS_INPUT)".into());
    };

    let lexicon = match &args.lexicon {
        Some(path) => Lexicon::load(path).await?,
        None => Lexicon::default(),
    };

    // Fail before launching a browser if results could not be saved.
    if let Err(e) = ensure_writable_dir(&args.checkpoint_dir).await {
        error!(
            path = %args.checkpoint_dir.display(),
            error = %e,
            "Checkpoint directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = ensure_writable_dir(parent).await {
            error!(path = %parent.display(), error = %e, "Output directory is not writable");
            return Err(e);
        }
    }

    let tasks = tasks::load_tasks(input).await?;
    if tasks.is_empty() {
        warn!("Input has no tasks; writing an empty dataset");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if batch::watch_interrupts(signal::ctrl_c, stop_tx).await {
            error!("Second interrupt; aborting without writing the dataset");
            std::process::exit(130);
        }
    });

    let processor = ArticleProcessor::new(FieldExtractors::new(lexicon));
    let store = ResultStore::new(&args.checkpoint_dir, Local::now().date_naive());
    let runner = BatchRunner::new(&processor, &store, args.batch_settings());
    let launcher = ChromeLauncher::new(args.fetch_config());

    let records = match runner.run(&launcher, &tasks, stop_rx).await {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Could not start the browser; nothing was scraped");
            return Err(e.into());
        }
    };

    if records.len() < tasks.len() {
        warn!(
            processed = records.len(),
            total = tasks.len(),
            "Run was interrupted; writing partial results"
        );
    }
    write_records(&records, &args.output).await?;
    BatchReport::from_records(&records).log();

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        output = %args.output.display(),
        "Execution complete"
    );

    Ok(())
}
