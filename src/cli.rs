//! Command-line interface definitions.
//!
//! All paths can also be provided through environment variables, which is
//! how scheduled runs are configured.

use crate::batch::BatchSettings;
use crate::fetcher::FetchConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Scrape animal-health news articles into a CSV dataset.
///
/// # Examples
///
/// ```sh
/// # Basic usage
/// animal_health_news -i urls.csv
///
/// # Custom lexicon, visible browser, slower pacing
/// animal_health_news -i urls.csv -l lexicon.yaml --headful -d 5 --jitter-ms 2000
///
/// # Value distributions of a finished dataset
/// animal_health_news --report dataset_maladies_animales_final.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input CSV with `code` and `lien` columns
    #[arg(short, long, env = "NEWS_INPUT", required_unless_present = "report")]
    pub input: Option<PathBuf>,

    /// Summarize an existing dataset instead of scraping
    #[arg(long, conflicts_with = "input")]
    pub report: Option<PathBuf>,

    /// Final dataset path
    #[arg(
        short,
        long,
        env = "NEWS_OUTPUT",
        default_value = "dataset_maladies_animales_final.csv"
    )]
    pub output: PathBuf,

    /// Directory for intermediate checkpoint files
    #[arg(short, long, env = "NEWS_CHECKPOINT_DIR", default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Write a checkpoint every N tasks (0 disables checkpoints)
    #[arg(long, default_value_t = 10)]
    pub checkpoint_every: usize,

    /// Seconds to wait between two tasks
    #[arg(short, long, default_value_t = 3.0)]
    pub delay_secs: f64,

    /// Upper bound of a random extra wait between tasks, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub jitter_ms: u64,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    #[arg(long, default_value_t = 30)]
    pub navigation_timeout_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub ready_timeout_secs: u64,

    /// Pause after the page is ready, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub settle_ms: u64,

    /// Pause after scrolling to mid page, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub scroll_pause_ms: u64,

    /// Chrome/Chromium executable (detected when omitted)
    #[arg(long, env = "CHROME")]
    pub chrome: Option<PathBuf>,

    /// Restart the browser after this many fetch errors in a row (0 never restarts)
    #[arg(long, default_value_t = 3)]
    pub max_consecutive_failures: usize,

    /// Optional path to a lexicon.yaml file
    #[arg(short, long, env = "NEWS_LEXICON")]
    pub lexicon: Option<PathBuf>,
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            headless: !self.headful,
            executable: self.chrome.clone(),
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            ready_timeout: Duration::from_secs(self.ready_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_ms),
            scroll_pause: Duration::from_millis(self.scroll_pause_ms),
        }
    }

    /// Negative or non-finite delays are treated as zero.
    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            delay: Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO),
            jitter: Duration::from_millis(self.jitter_ms),
            checkpoint_every: self.checkpoint_every,
            max_consecutive_failures: self.max_consecutive_failures,
            ..BatchSettings::default()
        }
    }
}
