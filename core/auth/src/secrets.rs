//! Application client secrets as downloaded from the Google Cloud Console.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tubeup_common::{Error, Result};

/// OAuth2 client configuration for one application.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// The console wraps the secrets in an `installed` or `web` key.
#[derive(Deserialize)]
struct ConsoleFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a client secrets document.
    ///
    /// # Errors
    /// - Malformed JSON
    /// - Neither an `installed` nor a `web` section is present
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConsoleFile = serde_json::from_str(json)
            .map_err(|e| Error::Serialization(format!("Invalid client secrets: {}", e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            Error::InvalidInput(
                "Client secrets must contain an 'installed' or 'web' section".to_string(),
            )
        })
    }

    /// Read and parse a client secrets file.
    ///
    /// # Errors
    /// - File missing ([`Error::Precondition`])
    /// - Read failure or malformed content
    pub async fn load(path: &Path) -> Result<Self> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Precondition(format!(
                    "Error: {} not found!",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "1234-abc.apps.googleusercontent.com",
            "project_id": "tubeup-test",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
            "client_secret": "s3cr3t",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn test_parse_installed_section() {
        let secrets = ClientSecrets::from_json(INSTALLED).unwrap();

        assert_eq!(secrets.client_id, "1234-abc.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "s3cr3t");
        assert_eq!(secrets.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(secrets.project_id.as_deref(), Some("tubeup-test"));
        assert_eq!(secrets.redirect_uris, vec!["http://localhost".to_string()]);
    }

    #[test]
    fn test_parse_web_section() {
        let json = r#"{"web": {
            "client_id": "web-id",
            "client_secret": "web-secret",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token"
        }}"#;

        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "web-id");
        assert!(secrets.redirect_uris.is_empty());
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let result = ClientSecrets::from_json(r#"{"other": {}}"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secrets = ClientSecrets::from_json(INSTALLED).unwrap();
        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("s3cr3t"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secrets.json");

        let err = ClientSecrets::load(&path).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }
}
