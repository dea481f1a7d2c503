//! Resumable video upload to the YouTube Data API.
//!
//! - [`UploadRequest`]: the fixed metadata sent with every upload
//! - [`YouTubeClient`]: session initiation and chunk transfer over HTTP
//! - [`ResumableUpload`]: the chunk-by-chunk state machine
//! - [`Uploader`]: credentials, request and chunk loop wired together

pub mod client;
pub mod metadata;
pub mod resumable;
pub mod uploader;

pub use client::{ChunkResponse, YouTubeClient};
pub use metadata::{PrivacyStatus, Snippet, Status, UploadRequest, Video, VideoMetadata};
pub use resumable::{ChunkOutcome, ResumableUpload, UploadProgress, UploadState};
pub use uploader::{ensure_video_file, UploadConfig, UploadObserver, UploadOutcome, Uploader};
