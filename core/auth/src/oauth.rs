//! OAuth2 authorization-code exchange and token refresh.

use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};

use tubeup_common::{Error, Result};

use crate::secrets::ClientSecrets;

/// OAuth2 authorization endpoint used when none is configured.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
/// OAuth2 token endpoint used when none is configured.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// OAuth2 tokens with expiration tracking.
#[derive(Debug, Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

/// Whether a token expiring at `expires_at` should be treated as expired.
pub(crate) fn expires_soon(expires_at: DateTime<Utc>) -> bool {
    // Consider expired if less than 5 minutes remaining
    expires_at < Utc::now() + Duration::minutes(5)
}

/// Configuration for OAuth2 authentication.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    /// Loopback redirect; only needed for the authorization-code leg.
    pub redirect_url: Option<String>,
}

impl AuthConfig {
    /// Build a configuration from console client secrets.
    pub fn from_secrets(secrets: &ClientSecrets, redirect_url: Option<String>) -> Self {
        Self {
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            auth_url: if secrets.auth_uri.is_empty() {
                GOOGLE_AUTH_URL.to_string()
            } else {
                secrets.auth_uri.clone()
            },
            token_url: if secrets.token_uri.is_empty() {
                GOOGLE_TOKEN_URL.to_string()
            } else {
                secrets.token_uri.clone()
            },
            redirect_url,
        }
    }
}

/// An authorization request waiting for the user's consent.
pub struct PendingAuthorization {
    /// URL the user must visit.
    pub url: String,
    /// CSRF state expected back on the redirect.
    pub csrf_state: String,
    /// PKCE verifier to send with the code exchange.
    pub pkce_verifier: PkceCodeVerifier,
}

/// OAuth2 authentication manager for the YouTube Data API.
pub struct AuthManager {
    client: ConfiguredClient,
    http: reqwest::Client,
}

impl AuthManager {
    /// Create a new authentication manager.
    ///
    /// # Errors
    /// - Malformed auth, token or redirect URL
    /// - HTTP client construction failure
    pub fn new(config: AuthConfig) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.client_id))
            .set_client_secret(ClientSecret::new(config.client_secret))
            .set_auth_uri(
                AuthUrl::new(config.auth_url)
                    .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(config.token_url)
                    .map_err(|e| Error::InvalidInput(format!("Invalid token URL: {}", e)))?,
            )
            .set_auth_type(AuthType::RequestBody);

        if let Some(redirect_url) = config.redirect_url {
            client = client.set_redirect_uri(
                RedirectUrl::new(redirect_url)
                    .map_err(|e| Error::InvalidInput(format!("Invalid redirect URL: {}", e)))?,
            );
        }

        // Token endpoint responses are never followed through redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, http })
    }

    /// Generate the authorization URL for the user to visit.
    ///
    /// Requests offline access with a consent prompt so that a refresh
    /// token is always issued, and attaches a fresh PKCE challenge.
    pub fn authorization_url(&self, scopes: &[String]) -> PendingAuthorization {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        PendingAuthorization {
            url: auth_url.to_string(),
            csrf_state: csrf_token.secret().clone(),
            pkce_verifier,
        }
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Preconditions
    /// - `code` is a valid authorization code from the OAuth2 callback
    /// - `pkce_verifier` belongs to the request that produced `code`
    ///
    /// # Postconditions
    /// - Returns access and refresh tokens
    ///
    /// # Errors
    /// - Invalid authorization code
    /// - No refresh token in the response
    /// - Network errors
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token exchange failed: {}", e)))?;

        let access_token = token_result.access_token().secret().clone();
        let refresh_token = token_result
            .refresh_token()
            .ok_or_else(|| {
                Error::Authentication("No refresh token received. Ensure 'offline' access and 'consent' prompt were requested.".to_string())
            })?
            .secret()
            .clone();

        Ok(Tokens {
            access_token,
            refresh_token,
            expires_at: expiry_from(token_result.expires_in()),
        })
    }

    /// Refresh an access token using the refresh token.
    ///
    /// # Preconditions
    /// - `refresh_token` is a valid refresh token
    ///
    /// # Postconditions
    /// - Returns new tokens (access token is refreshed)
    ///
    /// # Errors
    /// - Invalid or revoked refresh token
    /// - Network errors
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token refresh failed: {}", e)))?;

        let access_token = token_result.access_token().secret().clone();

        // Refresh tokens may or may not be returned in refresh response
        let new_refresh_token = token_result
            .refresh_token()
            .map(|t| t.secret().clone())
            .unwrap_or_else(|| refresh_token.to_string());

        Ok(Tokens {
            access_token,
            refresh_token: new_refresh_token,
            expires_at: expiry_from(token_result.expires_in()),
        })
    }

}

fn expiry_from(expires_in: Option<std::time::Duration>) -> DateTime<Utc> {
    let expires_in =
        expires_in.unwrap_or_else(|| std::time::Duration::from_secs(DEFAULT_TOKEN_LIFETIME_SECS));

    Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1))
}
