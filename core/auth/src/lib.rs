//! OAuth2 credentials for the YouTube Data API.
//!
//! This crate covers the whole credential lifecycle:
//! - parsing the application's `client_secrets.json`
//! - the installed-app authorization-code flow with a loopback redirect
//! - the persisted [`CredentialRecord`] and its file store
//! - expiry-driven refresh of a loaded record

pub mod callback;
pub mod credentials;
pub mod flow;
pub mod oauth;
pub mod secrets;

pub use callback::{AuthorizationCode, CallbackServer};
pub use credentials::{load_fresh, CredentialRecord, CredentialStore};
pub use flow::{FlowConfig, FlowDelegate, InstalledFlow, StdoutDelegate, YOUTUBE_SCOPES};
pub use oauth::{AuthConfig, AuthManager, PendingAuthorization, Tokens};
pub use secrets::ClientSecrets;
