use anyhow::Result;
use clap::Parser;
use gmail_corpus::auth::{self, READONLY_SCOPE};
use gmail_corpus::cli::{self, Cli, Commands};
use gmail_corpus::config::Config;
use gmail_corpus::error::CorpusError;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                let _ = self.multi.println(msg);
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // aws-lc-rs everywhere except Windows, where ring avoids the NASM/CMake toolchain
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_corpus=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gmail_corpus=info,warn"))
    };

    // Logs print above progress bars on stderr; stdout is reserved for the corpus
    let multi_progress = Arc::new(MultiProgress::new());
    let make_writer = MultiProgressMakeWriter {
        multi: Arc::clone(&multi_progress),
    };

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(make_writer)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(make_writer)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    match &cli.command {
        Commands::Auth { force } => {
            tracing::info!("Authorizing with Gmail API...");

            if *force && cli.token_cache.exists() {
                tokio::fs::remove_file(&cli.token_cache).await?;
                tracing::info!("Removed existing token cache");
            }

            let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;

            eprintln!("Successfully authorized read-only Gmail access");
            eprintln!("Token cached at: {:?}", cli.token_cache);

            // Same scope as the token, otherwise the hub starts another flow
            let (_, profile) = hub
                .users()
                .get_profile("me")
                .add_scope(READONLY_SCOPE)
                .doit()
                .await
                .map_err(CorpusError::from)?;
            eprintln!(
                "Connected to account: {}",
                profile.email_address.unwrap_or_default()
            );

            Ok(())
        }

        Commands::Harvest(args) => {
            tracing::info!("Starting corpus harvest");

            let summary = cli::run_harvest(&cli, args, (*multi_progress).clone()).await?;
            cli::print_summary(&summary);

            Ok(())
        }

        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");

            if output.exists() && !force {
                return Err(CorpusError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(output).await?;

            eprintln!("Created example configuration file at: {:?}", output);
            eprintln!("\nKey settings to review:");
            eprintln!("  - query.category / before / after: which messages to list");
            eprintln!("  - harvest.start_sequence_id: id of the first record");
            eprintln!("  - harvest.limit: maximum number of records");
            eprintln!("  - output.path: corpus file (stdout when unset)");

            Ok(())
        }

        Commands::Stats { corpus, json } => {
            let stats = cli::corpus_stats(corpus)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Documents: {}", stats.documents);
                if let (Some(first), Some(last)) = (stats.first_sequence_id, stats.last_sequence_id) {
                    println!("Sequence ids: {}..={}", first, last);
                }
                for (category, count) in &stats.per_category {
                    println!("  {:<10} {}", category, count);
                }
                println!("Unlabeled: {}", stats.unlabeled);
            }

            Ok(())
        }
    }
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(corpus_err) = error.downcast_ref::<CorpusError>() {
        match corpus_err {
            CorpusError::AuthError(_) => {
                eprintln!("\nHint: Make sure your credentials.json file is valid.");
                eprintln!("      Try running: gmail-corpus auth --force");
            }
            CorpusError::RateLimitExceeded { .. } => {
                eprintln!("\nHint: You've hit Gmail API rate limits.");
                eprintln!("      Set retry.max_retries in the config to retry automatically.");
            }
            CorpusError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: gmail-corpus init-config --force");
            }
            _ => {}
        }
    }
}
