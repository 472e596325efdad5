use thiserror::Error;

/// Type alias for Result with CorpusError
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Error types for the corpus harvester
///
/// The API-facing variants (`ApiError` through `BadRequest`) are the fetch
/// failures that abort a harvest. Body decoding problems and category misses
/// never surface here; they are filtering outcomes handled in the pipeline.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded - may retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Access forbidden (403), usually a revoked or under-scoped token
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The service returned a message we cannot map
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// A corpus file could not be parsed
    #[error("Invalid corpus: {0}")]
    CorpusFormat(String),

    /// IO error (output stream, config and token files)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CorpusError {
    /// Check if the error is transient and could succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CorpusError::RateLimitExceeded { .. }
                | CorpusError::ServerError { .. }
                | CorpusError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether this error came from listing or fetching messages
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            CorpusError::ApiError(_)
                | CorpusError::RateLimitExceeded { .. }
                | CorpusError::NetworkError(_)
                | CorpusError::ServerError { .. }
                | CorpusError::MessageNotFound(_)
                | CorpusError::Forbidden(_)
                | CorpusError::BadRequest(_)
                | CorpusError::InvalidMessageFormat(_)
        )
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Only the delay-seconds form is honoured. Missing or unparsable values
/// fall back to 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

impl From<google_gmail1::Error> for CorpusError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    429 => CorpusError::RateLimitExceeded {
                        retry_after: parse_retry_after_header(response),
                    },
                    404 => CorpusError::MessageNotFound("Resource not found".to_string()),
                    400 => CorpusError::BadRequest(message),
                    401 | 403 => CorpusError::Forbidden(message),
                    500..=599 => CorpusError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => CorpusError::ApiError(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => CorpusError::BadRequest(format!("{}", err)),
            google_gmail1::Error::HttpError(ref err) => {
                CorpusError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => CorpusError::NetworkError(err.to_string()),
            _ => CorpusError::ApiError(error.to_string()),
        }
    }
}
