//! Video resource metadata sent with an upload and returned on completion.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned to every upload ("People & Blogs").
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// Fallback when the extension does not name a known video container.
const OCTET_STREAM: &str = "application/octet-stream";

/// Visibility of an uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Private,
    Unlisted,
    Public,
}

/// The `snippet` part of a video resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_id: String,
    /// Only present in responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// The `status` part of a video resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub privacy_status: PrivacyStatus,
    #[serde(default)]
    pub self_declared_made_for_kids: bool,
    /// Processing state reported by the platform ("uploaded", "processed", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<String>,
}

/// Request body of a video insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub snippet: Snippet,
    pub status: Status,
}

impl VideoMetadata {
    /// Metadata with the fixed upload defaults: category 22, private,
    /// not made for kids, no tags.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            snippet: Snippet {
                title: title.into(),
                description: description.into(),
                tags: Vec::new(),
                category_id: DEFAULT_CATEGORY_ID.to_string(),
                published_at: None,
            },
            status: Status {
                privacy_status: PrivacyStatus::Private,
                self_declared_made_for_kids: false,
                upload_status: None,
            },
        }
    }

    /// Resource parts the request sets, as passed in the `part` parameter.
    pub fn parts(&self) -> &'static str {
        "snippet,status"
    }
}

/// Video resource returned when an upload completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub snippet: Snippet,
    #[serde(default)]
    pub status: Option<Status>,
}

/// Everything needed to upload one local file.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub metadata: VideoMetadata,
    /// MIME type announced for the media content.
    pub content_type: String,
}

impl UploadRequest {
    /// Build the request for `file_path`, titled after the file name.
    pub fn new(file_path: impl Into<PathBuf>, description: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let metadata = VideoMetadata::new(default_title(&file_path), description);
        let content_type = content_type_for(&file_path).to_string();

        Self {
            file_path,
            metadata,
            content_type,
        }
    }

    pub fn title(&self) -> &str {
        &self.metadata.snippet.title
    }
}

/// File base name without its last extension.
pub fn default_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// MIME type for a video file, guessed from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return OCTET_STREAM,
    };

    match ext.as_str() {
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mpeg" | "mpg" => "video/mpeg",
        "3gp" => "video/3gpp",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title_strips_last_extension() {
        assert_eq!(default_title(Path::new("/videos/holiday.mp4")), "holiday");
        assert_eq!(default_title(Path::new("clip.final.mov")), "clip.final");
        assert_eq!(default_title(Path::new("raw")), "raw");
    }

    #[test]
    fn test_request_defaults() {
        let request = UploadRequest::new("/tmp/My Trip.MP4", "Summer 2024");

        assert_eq!(request.title(), "My Trip");
        assert_eq!(request.metadata.snippet.description, "Summer 2024");
        assert_eq!(request.metadata.snippet.category_id, "22");
        assert!(request.metadata.snippet.tags.is_empty());
        assert_eq!(request.metadata.status.privacy_status, PrivacyStatus::Private);
        assert!(!request.metadata.status.self_declared_made_for_kids);
        assert_eq!(request.content_type, "video/mp4");
    }

    #[test]
    fn test_metadata_wire_format() {
        let metadata = VideoMetadata::new("title", "desc");
        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "snippet": {
                    "title": "title",
                    "description": "desc",
                    "tags": [],
                    "categoryId": "22"
                },
                "status": {
                    "privacyStatus": "private",
                    "selfDeclaredMadeForKids": false
                }
            })
        );
        assert_eq!(metadata.parts(), "snippet,status");
    }

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(content_type_for(Path::new("a.webm")), "video/webm");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_video_response_parsing() {
        let json = r#"{
            "kind": "youtube#video",
            "etag": "abc",
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "publishedAt": "2024-05-01T12:00:00Z",
                "channelId": "UC123",
                "title": "holiday",
                "description": "Summer",
                "categoryId": "22"
            },
            "status": {
                "uploadStatus": "uploaded",
                "privacyStatus": "private",
                "selfDeclaredMadeForKids": false
            }
        }"#;

        let video: Video = serde_json::from_str(json).unwrap();

        assert_eq!(video.id, "dQw4w9WgXcQ");
        assert_eq!(video.snippet.title, "holiday");
        assert!(video.snippet.published_at.is_some());
        let status = video.status.unwrap();
        assert_eq!(status.upload_status.as_deref(), Some("uploaded"));
        assert_eq!(status.privacy_status, PrivacyStatus::Private);
    }
}
