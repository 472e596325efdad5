//! Mail service adapter: the trait the harvester drives and its Gmail implementation

use async_trait::async_trait;
use google_gmail1::api::{Message, MessagePart};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{GmailHub, READONLY_SCOPE};
use crate::decoder::encode_base64url;
use crate::error::{CorpusError, Result};
use crate::models::{BodyPart, Header, MessageDetail, MessagePage};

/// Operations the harvester needs from an authorized mail connection
#[async_trait]
pub trait MailClient: Send + Sync {
    /// List one page of message IDs matching a query.
    /// An empty `page_token` requests the first page.
    async fn list_message_ids(&self, query: &str, page_token: &str) -> Result<MessagePage>;

    /// Fetch a message with labels, headers and body parts
    async fn get_message(&self, id: &str) -> Result<MessageDetail>;
}

/// Gmail client over an authenticated `google-gmail1` hub
///
/// Requests are issued one at a time. With `max_retries = 0` (the default
/// configuration) the first failure is returned as-is; otherwise transient
/// failures are retried with exponential backoff.
pub struct ProductionMailClient {
    hub: GmailHub,
    max_retries: u32,
}

impl ProductionMailClient {
    pub fn new(hub: GmailHub, max_retries: u32) -> Self {
        Self { hub, max_retries }
    }

    /// Check if an error is retryable
    fn should_retry(error: &CorpusError) -> bool {
        error.is_transient()
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    let wait = match &e {
                        CorpusError::RateLimitExceeded { retry_after } => {
                            std::cmp::max(delay, Duration::from_secs(*retry_after))
                        }
                        _ => delay,
                    };
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MailClient for ProductionMailClient {
    async fn list_message_ids(&self, query: &str, page_token: &str) -> Result<MessagePage> {
        Self::with_retry("list_message_ids", self.max_retries, || async {
            let mut call = self
                .hub
                .users()
                .messages_list("me")
                .q(query)
                .max_results(100);

            if !page_token.is_empty() {
                call = call.page_token(page_token);
            }

            let (_, response) = call.add_scope(READONLY_SCOPE).doit().await?;

            let ids: Vec<String> = response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|msg_ref| msg_ref.id)
                .collect();

            debug!("Listed {} message IDs", ids.len());
            Ok(MessagePage::new(ids, response.next_page_token))
        })
        .await
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail> {
        Self::with_retry("get_message", self.max_retries, || async {
            let (_, message) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("full")
                .add_scope(READONLY_SCOPE)
                .doit()
                .await?;

            message_to_detail(message)
        })
        .await
    }
}

#[async_trait]
impl<C: MailClient + ?Sized> MailClient for Arc<C> {
    async fn list_message_ids(&self, query: &str, page_token: &str) -> Result<MessagePage> {
        self.as_ref().list_message_ids(query, page_token).await
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail> {
        self.as_ref().get_message(id).await
    }
}

/// Convert a Gmail API message into a `MessageDetail`
///
/// Body parts are the payload's children. A single-part message has no
/// children, so the payload itself becomes the only part.
pub fn message_to_detail(message: Message) -> Result<MessageDetail> {
    let id = message
        .id
        .ok_or_else(|| CorpusError::InvalidMessageFormat("Missing message ID".to_string()))?;

    let mut detail = MessageDetail {
        id,
        size_estimate: message.size_estimate.map(i64::from).unwrap_or_default(),
        label_ids: message.label_ids.unwrap_or_default(),
        ..Default::default()
    };

    if let Some(mut payload) = message.payload {
        detail.headers = payload
            .headers
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| match (h.name, h.value) {
                (Some(name), Some(value)) => Some(Header { name, value }),
                _ => None,
            })
            .collect();

        let children = payload.parts.take().unwrap_or_default();
        detail.body_parts = if children.is_empty() {
            vec![convert_part(payload)]
        } else {
            children.into_iter().map(convert_part).collect()
        };
    }

    Ok(detail)
}

/// google-gmail1 decodes part data eagerly; re-encode it to the wire form
fn convert_part(part: MessagePart) -> BodyPart {
    BodyPart {
        part_id: part.part_id.unwrap_or_default(),
        mime_type: part.mime_type,
        encoded_data: part
            .body
            .and_then(|body| body.data)
            .map(|bytes| encode_base64url(&bytes)),
        parts: part
            .parts
            .unwrap_or_default()
            .into_iter()
            .map(convert_part)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{decode_body, BodyStrategy};
    use google_gmail1::api::{MessagePartBody, MessagePartHeader};

    fn header(name: &str, value: &str) -> MessagePartHeader {
        MessagePartHeader {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
        }
    }

    fn text_part(part_id: &str, mime: &str, text: &str) -> MessagePart {
        MessagePart {
            part_id: Some(part_id.to_string()),
            mime_type: Some(mime.to_string()),
            body: Some(MessagePartBody {
                data: Some(text.as_bytes().to_vec()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_should_retry_transient_only() {
        assert!(ProductionMailClient::should_retry(&CorpusError::ServerError {
            status: 500,
            message: "Internal error".to_string(),
        }));
        assert!(ProductionMailClient::should_retry(&CorpusError::NetworkError(
            "connection reset".to_string()
        )));
        assert!(!ProductionMailClient::should_retry(&CorpusError::Forbidden(
            "revoked".to_string()
        )));
    }

    #[test]
    fn test_message_to_detail_multipart() {
        let message = Message {
            id: Some("m1".to_string()),
            size_estimate: Some(2048),
            label_ids: Some(vec!["INBOX".to_string(), "CATEGORY_SOCIAL".to_string()]),
            payload: Some(MessagePart {
                part_id: Some(String::new()),
                mime_type: Some("multipart/alternative".to_string()),
                headers: Some(vec![
                    header("From", "a@b.com"),
                    MessagePartHeader {
                        name: Some("X-Empty".to_string()),
                        value: None,
                    },
                ]),
                parts: Some(vec![
                    text_part("0", "text/plain", "Hello"),
                    text_part("1", "text/html", "<p>Hello</p>"),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let detail = message_to_detail(message).unwrap();
        assert_eq!(detail.id, "m1");
        assert_eq!(detail.size_estimate, 2048);
        assert_eq!(detail.label_ids.len(), 2);
        assert_eq!(detail.headers, vec![Header::new("From", "a@b.com")]);
        assert_eq!(detail.body_parts.len(), 2);
        assert_eq!(detail.body_parts[0].part_id, "0");
        assert_eq!(
            decode_body(&detail.body_parts, &BodyStrategy::PartId("0".to_string())),
            Some("Hello".to_string())
        );
    }

    #[test]
    fn test_message_to_detail_single_part_payload() {
        let mut payload = text_part("", "text/plain", "  single part body ");
        payload.headers = Some(vec![header("Subject", "Hi")]);

        let message = Message {
            id: Some("m2".to_string()),
            payload: Some(payload),
            ..Default::default()
        };

        let detail = message_to_detail(message).unwrap();
        assert_eq!(detail.body_parts.len(), 1);
        assert_eq!(detail.size_estimate, 0);
        assert_eq!(
            decode_body(&detail.body_parts, &BodyStrategy::FirstTextPlain),
            Some("single part body".to_string())
        );
    }

    #[test]
    fn test_message_to_detail_requires_id() {
        let result = message_to_detail(Message::default());
        assert!(matches!(result, Err(CorpusError::InvalidMessageFormat(_))));
    }

    #[tokio::test]
    async fn test_with_retry_disabled_fails_fast() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = ProductionMailClient::with_retry("test_op", 0, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CorpusError::NetworkError("timeout".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_transient_error() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = ProductionMailClient::with_retry("test_op", 3, || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err(CorpusError::ServerError {
                        status: 503,
                        message: "unavailable".to_string(),
                    })
                } else {
                    Ok("page")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_never_retries_permanent_errors() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = ProductionMailClient::with_retry("test_op", 3, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CorpusError::Forbidden("token revoked".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(CorpusError::Forbidden(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
