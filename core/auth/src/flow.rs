//! Installed-application authorization flow.
//!
//! Obtaining credentials and persisting them are separate steps: the flow
//! returns a [`CredentialRecord`] and leaves writing it to the caller, so a
//! failed write can be retried without sending the user through the browser
//! again.

use tracing::{debug, info};

use tubeup_common::{Error, Result};

use crate::callback::CallbackServer;
use crate::credentials::CredentialRecord;
use crate::oauth::{AuthConfig, AuthManager};
use crate::secrets::ClientSecrets;

/// Scopes needed to upload and manage videos.
pub const YOUTUBE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube",
];

/// Configuration for the installed-app flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Scopes to request.
    pub scopes: Vec<String>,
    /// Loopback port for the redirect; 0 picks an ephemeral port.
    pub port: u16,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            scopes: YOUTUBE_SCOPES.iter().map(|s| s.to_string()).collect(),
            port: 0,
        }
    }
}

/// Shows the authorization URL to the user.
pub trait FlowDelegate: Send + Sync {
    /// Called once with the URL the user has to open.
    fn present_user_url(&self, url: &str);
}

/// Delegate that only prints the URL.
pub struct StdoutDelegate;

impl FlowDelegate for StdoutDelegate {
    fn present_user_url(&self, url: &str) {
        println!(
            "Please visit this URL to authorize this application: {}",
            url
        );
    }
}

/// Authorization-code flow with a loopback redirect.
pub struct InstalledFlow {
    secrets: ClientSecrets,
    config: FlowConfig,
    delegate: Box<dyn FlowDelegate>,
}

impl InstalledFlow {
    /// Create a flow for the given application secrets.
    pub fn new(secrets: ClientSecrets, config: FlowConfig) -> Self {
        Self {
            secrets,
            config,
            delegate: Box::new(StdoutDelegate),
        }
    }

    /// Replace the delegate that presents the authorization URL.
    pub fn with_delegate(mut self, delegate: impl FlowDelegate + 'static) -> Self {
        self.delegate = Box::new(delegate);
        self
    }

    /// Run the flow to completion and return the obtained credentials.
    ///
    /// Blocks until the browser redirect arrives; there is no timeout.
    ///
    /// # Postconditions
    /// - Returned record carries a refresh token and the requested scopes
    ///
    /// # Errors
    /// - Loopback listener could not be bound
    /// - Provider denied access or returned a mismatched state
    /// - Code exchange failed
    pub async fn obtain(&self) -> Result<CredentialRecord> {
        let server = CallbackServer::bind(self.config.port).await?;
        let redirect_uri = server.redirect_uri();

        let manager = AuthManager::new(AuthConfig::from_secrets(
            &self.secrets,
            Some(redirect_uri.clone()),
        ))?;
        let pending = manager.authorization_url(&self.config.scopes);

        debug!("Redirect URI: {}", redirect_uri);
        self.delegate.present_user_url(&pending.url);

        let callback = server.wait_for_code().await?;

        if callback.state.as_deref() != Some(pending.csrf_state.as_str()) {
            return Err(Error::Authentication(
                "State mismatch in authorization response; possible CSRF attempt".to_string(),
            ));
        }

        info!("Received authorization code, exchanging for tokens");
        let tokens = manager
            .exchange_code(&callback.code, pending.pkce_verifier)
            .await?;

        Ok(CredentialRecord::from_tokens(
            tokens,
            &self.secrets,
            self.config.scopes.clone(),
        ))
    }
}
