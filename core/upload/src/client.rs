//! YouTube Data API client for resumable uploads.

use bytes::Bytes;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use tubeup_auth::CredentialRecord;
use tubeup_common::{Error, Result};

use crate::metadata::{Video, VideoMetadata};

/// Response to one chunk of a resumable upload.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkResponse {
    /// More bytes are needed; the next chunk starts at `next_offset`.
    Incomplete { next_offset: u64 },
    /// Upload finished and the video resource was created.
    Complete(Video),
}

/// Error body returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    reason: String,
}

/// YouTube Data API client.
pub struct YouTubeClient {
    http: Client,
    access_token: String,
    upload_base: String,
}

impl YouTubeClient {
    /// Create a client authorized by `credentials`.
    ///
    /// # Errors
    /// - HTTP client construction failure
    pub fn new(credentials: &CredentialRecord, upload_base: &str, user_agent: &str) -> Result<Self> {
        // 308 means "resume incomplete" here, never a redirect to follow.
        let http = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            access_token: credentials.token.clone(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Start a resumable upload session.
    ///
    /// # Postconditions
    /// - Returns the session URI that accepts the media chunks
    ///
    /// # Errors
    /// - Network errors
    /// - Platform rejected the metadata or the credentials
    pub async fn start_resumable_upload(
        &self,
        metadata: &VideoMetadata,
        content_type: &str,
        total_size: u64,
    ) -> Result<String> {
        let mut url = Url::parse(&format!("{}/videos", self.upload_base))
            .map_err(|e| Error::InvalidInput(format!("Invalid upload URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("part", metadata.parts());

        let response = self
            .http
            .post(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header("X-Upload-Content-Length", total_size.to_string())
            .header("X-Upload-Content-Type", content_type)
            .json(metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start resumable upload: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        // Extract upload URI from Location header
        let upload_uri = response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| Error::Network("No upload URI in response".to_string()))?
            .to_str()
            .map_err(|e| Error::Network(format!("Invalid upload URI: {}", e)))?
            .to_string();

        debug!("Resumable session started: {}", upload_uri);
        Ok(upload_uri)
    }

    /// Upload a chunk to a resumable upload session.
    ///
    /// An empty `data` asks the session for its status without sending
    /// bytes, which is also how a zero-length file is uploaded.
    pub async fn upload_chunk(
        &self,
        upload_uri: &str,
        data: Bytes,
        start_byte: u64,
        total_size: u64,
    ) -> Result<ChunkResponse> {
        let content_range = if data.is_empty() {
            format!("bytes */{}", total_size)
        } else {
            let end_byte = start_byte + data.len() as u64 - 1;
            format!("bytes {}-{}/{}", start_byte, end_byte, total_size)
        };

        debug!("PUT {} ({})", upload_uri, content_range);

        let response = self
            .http
            .put(upload_uri)
            .header(header::CONTENT_LENGTH, data.len().to_string())
            .header(header::CONTENT_RANGE, content_range)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload chunk: {}", e)))?;

        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let video: Video = response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse upload response: {}", e)))?;
            Ok(ChunkResponse::Complete(video))
        } else if status == StatusCode::PERMANENT_REDIRECT {
            // 308 Resume Incomplete; Range says what the server kept.
            let next_offset = response
                .headers()
                .get(header::RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_range_end)
                .map(|end| end + 1)
                .unwrap_or(0);
            Ok(ChunkResponse::Incomplete { next_offset })
        } else {
            Err(api_error(response).await)
        }
    }
}

/// Last byte index from a `Range: bytes=0-N` header.
fn parse_range_end(range: &str) -> Option<u64> {
    range
        .trim()
        .strip_prefix("bytes=")?
        .split_once('-')?
        .1
        .trim()
        .parse()
        .ok()
}

/// Turn a non-success response into a platform error.
async fn api_error(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .errors
                .into_iter()
                .map(|item| item.reason)
                .find(|reason| !reason.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            Error::api(status.as_u16(), reason, envelope.error.message)
        }
        Err(_) => Error::api(
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            body,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_end() {
        assert_eq!(parse_range_end("bytes=0-1048575"), Some(1048575));
        assert_eq!(parse_range_end(" bytes=0-42 "), Some(42));
        assert_eq!(parse_range_end("bytes=0-"), None);
        assert_eq!(parse_range_end("0-42"), None);
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = r#"{
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{"domain": "youtube.quota", "reason": "quotaExceeded"}]
            }
        }"#;

        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.errors[0].reason, "quotaExceeded");
        assert!(envelope.error.message.contains("quota"));
    }
}
