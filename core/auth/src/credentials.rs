//! The persisted credential record and its file store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use tubeup_common::{Error, Result};

use crate::oauth::{expires_soon, AuthConfig, AuthManager, Tokens, GOOGLE_AUTH_URL};
use crate::secrets::ClientSecrets;

/// OAuth2 credential bundle shared between setup and upload.
///
/// Serialized as the JSON object stored in `secrets.json`. Every field
/// except `expiry` is required to rebuild a working client.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialRecord {
    /// Access token.
    pub token: String,
    pub refresh_token: String,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    /// Scopes the token was granted for.
    pub scopes: Vec<String>,
    /// When `token` expires. Unknown expiry counts as not expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[zeroize(skip)]
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl CredentialRecord {
    /// Assemble a record from a completed code exchange.
    pub fn from_tokens(tokens: Tokens, secrets: &ClientSecrets, scopes: Vec<String>) -> Self {
        let config = AuthConfig::from_secrets(secrets, None);

        Self {
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_uri: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scopes,
            expiry: Some(tokens.expires_at),
        }
    }

    /// Check if the access token is known to be expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.expiry.map(expires_soon).unwrap_or(false)
    }

    /// OAuth2 configuration able to refresh this record.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: self.token_uri.clone(),
            redirect_url: None,
        }
    }

    /// Replace the access token with a refreshed one.
    pub fn apply_refresh(&mut self, tokens: Tokens) {
        self.token = tokens.access_token;
        self.refresh_token = tokens.refresh_token;
        self.expiry = Some(tokens.expires_at);
    }
}

/// File-backed storage for a single [`CredentialRecord`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the credential file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored record.
    ///
    /// # Errors
    /// - File missing ([`Error::Precondition`])
    /// - Malformed or incomplete JSON ([`Error::Serialization`])
    pub async fn load(&self) -> Result<CredentialRecord> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Precondition(format!(
                    "Error: {} not found! Please run tubeup-setup first.",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&json).map_err(|e| {
            Error::Serialization(format!("Invalid credential file {}: {}", self.path.display(), e))
        })
    }

    /// Persist a record, replacing any previous one.
    ///
    /// # Postconditions
    /// - The file holds exactly the serialized record
    /// - On failure the previous file, if any, is untouched
    ///
    /// # Errors
    /// - Serialization or I/O failure
    pub async fn save(&self, record: &CredentialRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| Error::Serialization(format!("Failed to serialize credentials: {}", e)))?;

        let tmp_path = self.tmp_path();

        // A stale temp file would keep its old mode; start from a new inode.
        match tokio::fs::remove_file(&tmp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = write_private(&tmp_path, &json).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!("Wrote credentials to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Create `path` readable by the owner only and write `contents` to it.
async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

/// Load the stored credentials, refreshing the access token if it expired.
///
/// The refreshed token lives only in the returned value; the file keeps
/// the record written by setup.
///
/// # Errors
/// - Missing or malformed credential file
/// - Refresh rejected by the token endpoint or network failure
pub async fn load_fresh(store: &CredentialStore) -> Result<CredentialRecord> {
    let mut record = store.load().await?;

    if record.is_expired() {
        info!("Refreshing expired access token");

        let manager = AuthManager::new(record.auth_config())?;
        let tokens = manager.refresh_token(&record.refresh_token).await?;
        record.apply_refresh(tokens);
    }

    Ok(record)
}
