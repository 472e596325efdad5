//! Command-line interface and harvest orchestration

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::client::ProductionMailClient;
use crate::config::Config;
use crate::corpus::{read_corpus, CorpusStats};
use crate::error::Result;
use crate::formatter::CorpusWriter;
use crate::harvester::{CorpusHarvester, HarvestEvent, HarvestSummary};

#[derive(Parser, Debug)]
#[command(name = "gmail-corpus")]
#[command(version)]
#[command(about = "Harvest Gmail messages into a labeled text corpus", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".gmail-corpus/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize read-only Gmail access and cache the token
    Auth {
        /// Discard the cached token and authorize again
        #[arg(long)]
        force: bool,
    },

    /// Fetch messages and write corpus records
    Harvest(HarvestArgs),

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Summarize a corpus file by category
    Stats {
        /// Corpus file to read
        corpus: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the configuration file, all optional
#[derive(Args, Debug, Default, Clone)]
pub struct HarvestArgs {
    /// Verbatim Gmail search query (replaces category/date filter)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Gmail category to search, e.g. updates or social
    #[arg(long)]
    pub category: Option<String>,

    /// Only messages before this date (YYYY-MM-DD)
    #[arg(long)]
    pub before: Option<NaiveDate>,

    /// Only messages after this date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<NaiveDate>,

    /// Maximum number of records to write
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Sequence id of the first record
    #[arg(long)]
    pub start: Option<u64>,

    /// Write the corpus to this file instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl HarvestArgs {
    /// Apply command-line overrides on top of a parsed configuration, then
    /// validate the result
    ///
    /// Any of `--category`, `--before` or `--after` drops a raw query coming
    /// from the file; `--query` takes precedence over all three.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if self.category.is_some() || self.before.is_some() || self.after.is_some() {
            config.query.raw = None;
        }
        if let Some(query) = &self.query {
            config.query.raw = Some(query.clone());
        }
        if let Some(category) = &self.category {
            config.query.category = category.clone();
        }
        if let Some(before) = self.before {
            config.query.before = before;
        }
        if let Some(after) = self.after {
            config.query.after = after;
        }
        if let Some(limit) = self.limit {
            config.harvest.limit = limit;
        }
        if let Some(start) = self.start {
            config.harvest.start_sequence_id = start;
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }
        config.validate()
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and leave a one-line note on stderr
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }
}

/// Run the harvest subcommand end to end
///
/// Loads configuration, authorizes, and streams records to the configured
/// output. Progress and logs go to stderr; the corpus goes to stdout unless
/// an output file is configured.
pub async fn run_harvest(cli: &Cli, args: &HarvestArgs, multi: MultiProgress) -> Result<HarvestSummary> {
    let reporter = ProgressReporter::with_multi_progress(multi);

    let config_spinner = reporter.add_spinner("Loading configuration...");
    let mut config = Config::read(&cli.config).await?;
    args.apply_to(&mut config)?;
    let query = config.query.to_query();
    let strategy = config.body.body_strategy()?;
    reporter.finish_spinner(&config_spinner, &format!("Query: {}", query));

    let auth_spinner = reporter.add_spinner("Authorizing with Gmail API...");
    let hub = crate::auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authorized");

    let client = ProductionMailClient::new(hub, config.retry.max_retries);
    let harvester = CorpusHarvester::new(Box::new(client)).with_body_strategy(strategy);

    let sink: Box<dyn Write> = match &config.output.path {
        Some(path) => Box::new(io::BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    let mut writer =
        CorpusWriter::new(sink).with_separator_for_skipped(config.output.separator_for_skipped);

    let progress = reporter.add_progress_bar(config.harvest.limit, "records");
    let started = Instant::now();

    let result = harvester
        .harvest_into(
            &query,
            config.harvest.limit,
            config.harvest.start_sequence_id,
            &mut writer,
            |event| match event {
                HarvestEvent::Record(record) => {
                    progress.inc(1);
                    progress.set_message(format!("last id {}", record.sequence_id));
                }
                HarvestEvent::Skipped { .. } | HarvestEvent::Finished(_) => {}
            },
        )
        .await;

    progress.finish_and_clear();
    let summary = result?;

    info!(
        "Wrote {} records in {:.1}s",
        writer.records_written(),
        started.elapsed().as_secs_f64()
    );
    Ok(summary)
}

/// Print a harvest summary to stderr
pub fn print_summary(summary: &HarvestSummary) {
    eprintln!("\n========================================");
    eprintln!("Harvest Summary");
    eprintln!("========================================");
    eprintln!("Pages fetched: {}", summary.pages_fetched);
    eprintln!("Messages processed: {}", summary.messages_processed);
    eprintln!("Records written: {}", summary.records_emitted);
    eprintln!("Skipped (empty body): {}", summary.skipped_empty_body);
    eprintln!("Skipped (no category): {}", summary.skipped_no_category);
    eprintln!("Estimated bytes fetched: {}", summary.total_size_estimate);
    eprintln!("Next sequence id: {}", summary.next_sequence_id);
    eprintln!("Limit reached: {}", summary.limit_reached);
    eprintln!("========================================");
}

/// Read a corpus file and compute its category counts
pub fn corpus_stats(path: &std::path::Path) -> Result<CorpusStats> {
    let file = File::open(path)?;
    let documents = read_corpus(BufReader::new(file))?;
    Ok(CorpusStats::from_documents(&documents))
}
