//! Gmail Corpus Harvester
//!
//! Pulls messages matching a Gmail search query and writes them as a
//! labeled plain-text corpus for text-classification experiments.
//!
//! # Overview
//!
//! - **Authentication**: read-only OAuth2 with token caching
//! - **Harvesting**: sequential paginated listing and fetching with a record limit
//! - **Classification**: category codes derived from Gmail label ids
//! - **Decoding**: base64url body extraction from the MIME tree
//! - **Formatting**: `.I`/`.L`/`.D`/`.F`/`.S`/`.M` record blocks
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_corpus::{auth, client::ProductionMailClient, config::Config};
//! use gmail_corpus::{CorpusHarvester, CorpusWriter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         ".gmail-corpus/token.json".as_ref(),
//!     )
//!     .await?;
//!
//!     let client = ProductionMailClient::new(hub, config.retry.max_retries);
//!     let harvester = CorpusHarvester::new(Box::new(client));
//!
//!     let mut writer = CorpusWriter::new(std::io::stdout());
//!     let summary = harvester
//!         .harvest_into(
//!             &config.query.to_query(),
//!             config.harvest.limit,
//!             config.harvest.start_sequence_id,
//!             &mut writer,
//!             |_| {},
//!         )
//!         .await?;
//!     eprintln!("{} records", summary.records_emitted);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authorization and Gmail API initialization
//! - [`client`] - Mail service trait and the Gmail-backed implementation
//! - [`classifier`] - Label id to category code mapping
//! - [`cli`] - Command-line interface and harvest orchestration
//! - [`config`] - Configuration management
//! - [`corpus`] - Reading corpus files back
//! - [`decoder`] - Body part selection and base64url decoding
//! - [`error`] - Error types and result aliases
//! - [`formatter`] - Record rendering and the corpus writer
//! - [`harvester`] - Paginated harvest loop
//! - [`headers`] - Date/From/Subject extraction
//! - [`models`] - Core data structures

pub mod auth;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod corpus;
pub mod decoder;
pub mod error;
pub mod formatter;
pub mod harvester;
pub mod headers;
pub mod models;

pub use error::{CorpusError, Result};

pub use models::{
    BodyPart, CategoryCode, ExtractedHeaders, Header, MessageDetail, MessagePage, MessageSummary,
    OutputRecord,
};

pub use classifier::classify;
pub use decoder::{decode_body, BodyStrategy};
pub use formatter::{format_record, CorpusWriter};
pub use headers::extract_headers;

pub use harvester::{extract_record, CorpusHarvester, Extraction, HarvestEvent, HarvestSummary, SkipReason};

pub use client::{MailClient, ProductionMailClient};

pub use config::Config;

pub use corpus::{read_corpus, CorpusDocument, CorpusStats};

pub use cli::{Cli, Commands, HarvestArgs, ProgressReporter};
