//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use gmail_corpus::client::MailClient;
use gmail_corpus::decoder::encode_base64url;
use gmail_corpus::error::{CorpusError, Result};
use gmail_corpus::models::{BodyPart, Header, MessageDetail, MessagePage};
use mockall::mock;
use std::collections::HashMap;
use std::sync::Mutex;

/// Base64url-encode a plain-text body the way the service delivers it
pub fn encode_body(text: &str) -> String {
    encode_base64url(text.as_bytes())
}

/// Create a message whose primary part "0" carries `body`
pub fn message_detail(id: &str, labels: &[&str], body: &str, headers: &[(&str, &str)]) -> MessageDetail {
    MessageDetail {
        id: id.to_string(),
        size_estimate: body.len() as i64 + 100,
        label_ids: labels.iter().map(|l| l.to_string()).collect(),
        body_parts: vec![BodyPart::new("0", encode_body(body)).with_mime_type("text/plain")],
        headers: headers.iter().map(|(n, v)| Header::new(*n, *v)).collect(),
    }
}

/// A categorized message with the usual three headers
pub fn social_message(id: &str, body: &str) -> MessageDetail {
    message_detail(
        id,
        &["CATEGORY_SOCIAL", "INBOX"],
        body,
        &[("Date", "Mon"), ("From", "a@b.com"), ("Subject", "Hi")],
    )
}

/// In-memory mail service that serves fixed pages and records every call
///
/// Page `n` is served for the token returned by page `n - 1`; the first page
/// is served for the empty token.
#[derive(Default)]
pub struct ScriptedMailClient {
    pages: Vec<(Vec<String>, Option<String>)>,
    messages: HashMap<String, MessageDetail>,
    fail_on_fetch: Option<String>,
    fail_on_page: Option<usize>,
    pub listed_tokens: Mutex<Vec<String>>,
    pub listed_queries: Mutex<Vec<String>>,
    pub fetched_ids: Mutex<Vec<String>>,
}

impl ScriptedMailClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page; its next token is set automatically when another page follows
    pub fn with_page(mut self, messages: Vec<MessageDetail>) -> Self {
        let ids = messages.iter().map(|m| m.id.clone()).collect();
        for message in messages {
            self.messages.insert(message.id.clone(), message);
        }
        let next_token = format!("page-{}", self.pages.len());
        if let Some(last) = self.pages.last_mut() {
            last.1 = Some(next_token);
        }
        self.pages.push((ids, None));
        self
    }

    /// Make fetching `id` fail with a server error
    pub fn failing_fetch(mut self, id: &str) -> Self {
        self.fail_on_fetch = Some(id.to_string());
        self
    }

    /// Make listing the page at `index` fail with a server error
    pub fn failing_page(mut self, index: usize) -> Self {
        self.fail_on_page = Some(index);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched_ids.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.listed_tokens.lock().unwrap().clone()
    }

    fn page_index(&self, token: &str) -> Option<usize> {
        if token.is_empty() {
            return Some(0);
        }
        self.pages
            .iter()
            .position(|(_, next)| next.as_deref() == Some(token))
            .map(|i| i + 1)
    }
}

#[async_trait]
impl MailClient for ScriptedMailClient {
    async fn list_message_ids(&self, query: &str, page_token: &str) -> Result<MessagePage> {
        self.listed_tokens.lock().unwrap().push(page_token.to_string());
        self.listed_queries.lock().unwrap().push(query.to_string());

        let index = self
            .page_index(page_token)
            .ok_or_else(|| CorpusError::BadRequest(format!("unknown page token {}", page_token)))?;

        if self.fail_on_page == Some(index) {
            return Err(CorpusError::ServerError {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }

        match self.pages.get(index) {
            Some((ids, next)) => Ok(MessagePage::new(ids.clone(), next.clone())),
            None => Ok(MessagePage::default()),
        }
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail> {
        self.fetched_ids.lock().unwrap().push(id.to_string());

        if self.fail_on_fetch.as_deref() == Some(id) {
            return Err(CorpusError::ServerError {
                status: 500,
                message: "internal error".to_string(),
            });
        }

        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| CorpusError::MessageNotFound(id.to_string()))
    }
}

// Mock implementation of MailClient for testing
mock! {
    pub MailClient {}

    #[async_trait::async_trait]
    impl MailClient for MailClient {
        async fn list_message_ids(&self, query: &str, page_token: &str) -> Result<MessagePage>;
        async fn get_message(&self, id: &str) -> Result<MessageDetail>;
    }
}
