//! Paginated corpus harvesting
//!
//! [`CorpusHarvester::run`] walks the listing page by page, fetches each
//! message in turn and yields one [`HarvestEvent`] per processed message,
//! finishing with a [`HarvestSummary`]. Requests are strictly sequential and
//! the first listing or fetch error ends the stream.

use async_stream::stream;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::io::Write;
use std::pin::Pin;
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::client::MailClient;
use crate::decoder::{decode_body, BodyStrategy};
use crate::error::{CorpusError, Result};
use crate::formatter::CorpusWriter;
use crate::headers::extract_headers;
use crate::models::{MessageDetail, OutputRecord};

/// Why a fetched message produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// No primary body part, undecodable data, or only whitespace
    EmptyBody,
    /// No category marker among the labels
    NoCategory,
    /// The message carried no body parts at all
    NoParts,
}

impl SkipReason {
    /// Whether the skipped message still leaves a blank line in the corpus.
    /// A message without parts never reaches the per-part output path, so
    /// it leaves nothing.
    pub fn leaves_separator(self) -> bool {
        !matches!(self, SkipReason::NoParts)
    }
}

/// Outcome of running one message through the extraction path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Record(OutputRecord),
    Skipped(SkipReason),
}

/// Decode, classify and extract headers for one message
///
/// The body is checked first, so a message with an empty body is reported
/// as `EmptyBody` even when it also lacks a category.
pub fn extract_record(detail: &MessageDetail, sequence_id: u64, strategy: &BodyStrategy) -> Extraction {
    if detail.body_parts.is_empty() {
        return Extraction::Skipped(SkipReason::NoParts);
    }

    let body = match decode_body(&detail.body_parts, strategy) {
        Some(body) => body,
        None => return Extraction::Skipped(SkipReason::EmptyBody),
    };

    let categories = classify(&detail.label_ids);
    if categories.is_empty() {
        return Extraction::Skipped(SkipReason::NoCategory);
    }

    Extraction::Record(OutputRecord {
        sequence_id,
        categories,
        headers: extract_headers(&detail.headers),
        body,
    })
}

/// Counters for one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
    pub pages_fetched: usize,
    pub messages_processed: usize,
    pub records_emitted: u64,
    /// Includes messages without any body part
    pub skipped_empty_body: usize,
    pub skipped_no_category: usize,
    /// Sum of the service's size estimates, for diagnostics only
    pub total_size_estimate: i64,
    /// Sequence id the next record would have received
    pub next_sequence_id: u64,
    pub limit_reached: bool,
}

/// Events yielded by a harvest stream
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    Record(OutputRecord),
    Skipped { message_id: String, reason: SkipReason },
    Finished(HarvestSummary),
}

/// Loop state threaded through the page/message iteration
#[derive(Debug)]
struct HarvestState {
    page_token: String,
    start_sequence_id: u64,
    limit: u64,
    summary: HarvestSummary,
}

impl HarvestState {
    fn new(start_sequence_id: u64, limit: u64) -> Self {
        Self {
            page_token: String::new(),
            start_sequence_id,
            limit,
            summary: HarvestSummary {
                next_sequence_id: start_sequence_id,
                ..Default::default()
            },
        }
    }

    fn limit_reached(&self) -> bool {
        self.summary.next_sequence_id - self.start_sequence_id >= self.limit
    }

    fn record_fetch(&mut self, detail: &MessageDetail) {
        self.summary.messages_processed += 1;
        self.summary.total_size_estimate += detail.size_estimate;
    }

    fn record_emitted(&mut self) {
        self.summary.next_sequence_id += 1;
        self.summary.records_emitted += 1;
        self.summary.limit_reached = self.limit_reached();
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::EmptyBody | SkipReason::NoParts => self.summary.skipped_empty_body += 1,
            SkipReason::NoCategory => self.summary.skipped_no_category += 1,
        }
    }
}

/// Drives a [`MailClient`] across listing pages and turns messages into records
pub struct CorpusHarvester {
    client: Box<dyn MailClient>,
    body_strategy: BodyStrategy,
}

impl CorpusHarvester {
    pub fn new(client: Box<dyn MailClient>) -> Self {
        Self {
            client,
            body_strategy: BodyStrategy::default(),
        }
    }

    pub fn with_body_strategy(mut self, strategy: BodyStrategy) -> Self {
        self.body_strategy = strategy;
        self
    }

    /// Harvest up to `limit` records for `query`, numbering from `start_sequence_id`
    ///
    /// The stream is lazy and finite. Once the limit is reached no further
    /// message in the current page is fetched and no further page is listed.
    /// `start_sequence_id + limit` must fit in a `u64`; otherwise the stream
    /// yields a single error before any request.
    /// A listing or fetch error is yielded once and ends the stream without
    /// a `Finished` event.
    pub fn run<'a>(
        &'a self,
        query: &'a str,
        limit: u64,
        start_sequence_id: u64,
    ) -> Pin<Box<dyn Stream<Item = Result<HarvestEvent>> + Send + 'a>> {
        Box::pin(stream! {
            if start_sequence_id.checked_add(limit).is_none() {
                yield Err(CorpusError::ConfigError(format!(
                    "start sequence id {} plus limit {} exceeds the sequence id range",
                    start_sequence_id, limit
                )));
                return;
            }

            let mut state = HarvestState::new(start_sequence_id, limit);

            if state.limit_reached() {
                info!("Record limit is 0, nothing to harvest");
                state.summary.limit_reached = true;
                yield Ok(HarvestEvent::Finished(state.summary));
                return;
            }

            info!("Harvesting up to {} records for query '{}'", limit, query);

            'pages: loop {
                let page = match self.client.list_message_ids(query, &state.page_token).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("Unable to retrieve messages: {}", e);
                        yield Err(e);
                        return;
                    }
                };
                state.summary.pages_fetched += 1;

                info!("Processing {} messages", page.messages.len());

                for summary in &page.messages {
                    let detail = match self.client.get_message(&summary.id).await {
                        Ok(detail) => detail,
                        Err(e) => {
                            warn!("Unable to retrieve message {}: {}", summary.id, e);
                            yield Err(e);
                            return;
                        }
                    };
                    state.record_fetch(&detail);

                    match extract_record(&detail, state.summary.next_sequence_id, &self.body_strategy) {
                        Extraction::Record(record) => {
                            debug!(
                                "Message {} -> record {} ({} categories)",
                                detail.id,
                                record.sequence_id,
                                record.categories.len()
                            );
                            state.record_emitted();
                            yield Ok(HarvestEvent::Record(record));

                            if state.limit_reached() {
                                info!("Reached record limit of {}", limit);
                                break 'pages;
                            }
                        }
                        Extraction::Skipped(reason) => {
                            match reason {
                                SkipReason::NoCategory => {
                                    info!("No category label found for message {}", detail.id)
                                }
                                SkipReason::EmptyBody => {
                                    debug!("Message {} has no usable body", detail.id)
                                }
                                SkipReason::NoParts => {
                                    debug!("Message {} has no body parts", detail.id)
                                }
                            }
                            state.record_skip(reason);
                            yield Ok(HarvestEvent::Skipped {
                                message_id: detail.id.clone(),
                                reason,
                            });
                        }
                    }
                }

                match page.next_page_token {
                    Some(token) => state.page_token = token,
                    None => break,
                }
            }

            info!(
                "Harvest complete: {} records from {} messages ({} bytes estimated)",
                state.summary.records_emitted,
                state.summary.messages_processed,
                state.summary.total_size_estimate
            );
            yield Ok(HarvestEvent::Finished(state.summary));
        })
    }

    /// Run a harvest and write every event to `writer`
    ///
    /// Records are flushed as they arrive, so output written before a fatal
    /// error stays in place. `on_event` observes each event after it has been
    /// written.
    pub async fn harvest_into<W, F>(
        &self,
        query: &str,
        limit: u64,
        start_sequence_id: u64,
        writer: &mut CorpusWriter<W>,
        mut on_event: F,
    ) -> Result<HarvestSummary>
    where
        W: Write,
        F: FnMut(&HarvestEvent),
    {
        let mut events = self.run(query, limit, start_sequence_id);
        let mut summary = None;

        while let Some(event) = events.next().await {
            let event = event?;
            match &event {
                HarvestEvent::Record(record) => writer.write_record(record)?,
                HarvestEvent::Skipped { reason, .. } => {
                    if reason.leaves_separator() {
                        writer.write_skip_separator()?;
                    }
                }
                HarvestEvent::Finished(finished) => summary = Some(finished.clone()),
            }
            on_event(&event);
        }

        summary.ok_or_else(|| CorpusError::ApiError("harvest ended without a summary".to_string()))
    }
}
