//! OAuth2 authorization for the Gmail API
//!
//! The harvester only needs an authorized client; this module builds one from
//! an installed-app credentials file (or environment variables) and a token
//! cache that is reused across runs.

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::env;
use std::path::Path;
use tracing::{debug, info};
use yup_oauth2::ApplicationSecret;

use crate::error::{CorpusError, Result};

/// Read-only access is all the harvester requires
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

pub const READONLY_SCOPES: &[&str] = &[READONLY_SCOPE];

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Initialize an authorized Gmail API hub
///
/// Credentials come from `credentials_path` when it exists, otherwise from
/// the `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET` environment variables. On
/// first use the installed-app flow opens a local redirect listener; the
/// resulting token is persisted to `token_cache_path` and reused afterwards.
pub async fn initialize_gmail_hub(
    credentials_path: &Path,
    token_cache_path: &Path,
) -> Result<GmailHub> {
    let secret = if credentials_path.exists() {
        yup_oauth2::read_application_secret(credentials_path)
            .await
            .map_err(|e| CorpusError::AuthError(format!("Failed to read credentials: {}", e)))?
    } else {
        debug!("No credentials file at {:?}, trying environment", credentials_path);
        load_credentials_from_env()?
    };

    if let Some(parent) = token_cache_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| CorpusError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Obtain the token up front so the flow runs before any output is written
    auth.token(READONLY_SCOPES)
        .await
        .map_err(|e| CorpusError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if token_cache_path.exists() {
        secure_token_file(token_cache_path).await?;
    }
    info!("Authorized Gmail access (token cache {:?})", token_cache_path);

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| CorpusError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Load OAuth2 credentials from environment variables
///
/// - `GMAIL_CLIENT_ID`: OAuth2 client ID
/// - `GMAIL_CLIENT_SECRET`: OAuth2 client secret
/// - `GMAIL_REDIRECT_URI`: optional, defaults to http://localhost:8080
pub fn load_credentials_from_env() -> Result<ApplicationSecret> {
    let client_id = env::var("GMAIL_CLIENT_ID")
        .map_err(|_| CorpusError::ConfigError("GMAIL_CLIENT_ID not set".to_string()))?;
    let client_secret = env::var("GMAIL_CLIENT_SECRET")
        .map_err(|_| CorpusError::ConfigError("GMAIL_CLIENT_SECRET not set".to_string()))?;
    let redirect_uri = env::var("GMAIL_REDIRECT_URI")
        .unwrap_or_else(|_| "http://localhost:8080".to_string());

    Ok(ApplicationSecret {
        client_id,
        client_secret,
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        redirect_uris: vec![redirect_uri],
        ..Default::default()
    })
}

/// Restrict the token cache to its owner (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
