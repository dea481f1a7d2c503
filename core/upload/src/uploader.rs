//! Upload orchestration: credentials, request and chunk loop.

use std::path::Path;

use tracing::{debug, info};

use tubeup_auth::{load_fresh, CredentialRecord, CredentialStore};
use tubeup_common::{Error, Result};

use crate::client::YouTubeClient;
use crate::metadata::UploadRequest;
use crate::resumable::{ChunkOutcome, ResumableUpload, UploadProgress};

/// Default resumable upload endpoint.
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Default chunk size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Short playback URL prefix.
pub const DEFAULT_WATCH_URL_BASE: &str = "https://youtu.be/";

/// Uploader configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub upload_base: String,
    pub chunk_size: usize,
    pub watch_url_base: String,
    pub user_agent: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            watch_url_base: DEFAULT_WATCH_URL_BASE.to_string(),
            user_agent: concat!("tubeup/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub video_id: String,
    pub title: String,
    pub url: String,
}

/// Receives upload lifecycle events.
pub trait UploadObserver {
    /// Credentials are loaded and the transfer is about to begin.
    fn started(&mut self, _request: &UploadRequest) {}

    /// A non-final chunk was acknowledged.
    fn progress(&mut self, _progress: UploadProgress) {}
}

/// Observer that ignores every event.
impl UploadObserver for () {}

/// Uploads local video files with stored credentials.
pub struct Uploader {
    store: CredentialStore,
    config: UploadConfig,
}

impl Uploader {
    pub fn new(store: CredentialStore, config: UploadConfig) -> Self {
        Self { store, config }
    }

    /// Upload `file_path` as a private video with `description`.
    ///
    /// The title is the file name without its extension.
    ///
    /// # Preconditions
    /// - `file_path` is an existing regular file
    /// - Credentials were written by setup
    ///
    /// # Errors
    /// - Missing video file, checked before any credential or network access
    /// - Missing or malformed credentials, refresh failure
    /// - Network or platform error during the transfer
    pub async fn upload(
        &self,
        file_path: &Path,
        description: &str,
        observer: &mut dyn UploadObserver,
    ) -> Result<UploadOutcome> {
        ensure_video_file(file_path)?;
        let credentials = self.load_credentials().await?;
        self.upload_with(&credentials, file_path, description, observer)
            .await
    }

    /// Read the stored credentials, refreshing the access token if expired.
    pub async fn load_credentials(&self) -> Result<CredentialRecord> {
        load_fresh(&self.store).await
    }

    /// Upload with credentials that were already loaded.
    ///
    /// # Errors
    /// - File unreadable
    /// - Network or platform error during the transfer
    pub async fn upload_with(
        &self,
        credentials: &CredentialRecord,
        file_path: &Path,
        description: &str,
        observer: &mut dyn UploadObserver,
    ) -> Result<UploadOutcome> {
        let client = YouTubeClient::new(
            credentials,
            &self.config.upload_base,
            &self.config.user_agent,
        )?;

        let request = UploadRequest::new(file_path, description);
        observer.started(&request);

        let mut upload = ResumableUpload::open(&client, &request, self.config.chunk_size).await?;
        info!(
            "Uploading {} ({} bytes, {})",
            file_path.display(),
            upload.total_size(),
            request.content_type
        );

        let video = loop {
            match upload.next_chunk().await? {
                ChunkOutcome::InProgress(progress) => observer.progress(progress),
                ChunkOutcome::Complete(video) => break video,
            }
        };

        debug!("Upload finished with video id {}", video.id);

        Ok(UploadOutcome {
            url: format!("{}{}", self.config.watch_url_base, video.id),
            title: video.snippet.title,
            video_id: video.id,
        })
    }
}

/// Fail with a precondition error unless `path` is a regular file.
pub fn ensure_video_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::Precondition(format!(
            "Error: File not found: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = UploadConfig::default();

        assert_eq!(config.chunk_size, 1048576);
        assert_eq!(
            config.upload_base,
            "https://www.googleapis.com/upload/youtube/v3"
        );
        assert_eq!(config.watch_url_base, "https://youtu.be/");
        assert!(config.user_agent.starts_with("tubeup/"));
    }

    #[tokio::test]
    async fn test_missing_file_checked_before_credentials() {
        let dir = TempDir::new().unwrap();
        let uploader = Uploader::new(
            CredentialStore::new(dir.path().join("secrets.json")),
            UploadConfig::default(),
        );
        let missing = dir.path().join("missing.mp4");

        let err = uploader.upload(&missing, "desc", &mut ()).await.unwrap_err();

        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(
            err.to_string(),
            format!("Error: File not found: {}", missing.display())
        );
    }

    #[tokio::test]
    async fn test_directory_is_not_a_video_file() {
        let dir = TempDir::new().unwrap();
        let uploader = Uploader::new(
            CredentialStore::new(dir.path().join("secrets.json")),
            UploadConfig::default(),
        );

        let err = uploader.upload(dir.path(), "desc", &mut ()).await.unwrap_err();
        assert!(err.to_string().starts_with("Error: File not found:"));
    }

    #[tokio::test]
    async fn test_missing_credentials_reported() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"data").unwrap();

        let uploader = Uploader::new(
            CredentialStore::new(dir.path().join("secrets.json")),
            UploadConfig::default(),
        );

        let err = uploader.upload(&video, "desc", &mut ()).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(err.to_string().contains("Please run tubeup-setup first"));
    }
}
