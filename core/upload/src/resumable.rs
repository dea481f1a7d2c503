//! Chunk-by-chunk resumable upload.
//!
//! A [`ResumableUpload`] moves through `Idle -> Uploading -> Complete`, or
//! ends in `Failed` as soon as any step errors. Each call to
//! [`ResumableUpload::next_chunk`] transmits at most one chunk; the caller
//! drives the loop and sees progress between chunks. The session URI lives
//! only in memory, so an interrupted process cannot resume.

use std::io::SeekFrom;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use tubeup_common::{Error, Result};

use crate::client::{ChunkResponse, YouTubeClient};
use crate::metadata::{UploadRequest, Video};

/// Lifecycle of a resumable upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// No session started yet.
    Idle,
    /// Session open, chunks in flight.
    Uploading,
    Complete,
    Failed,
}

/// Bytes acknowledged by the server so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_size: u64,
}

impl UploadProgress {
    /// Fraction complete in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_size == 0 {
            return 1.0;
        }
        self.bytes_sent.min(self.total_size) as f64 / self.total_size as f64
    }

    /// Whole percent complete, truncated.
    pub fn percent(&self) -> u32 {
        (self.progress() * 100.0) as u32
    }
}

/// Result of transmitting one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    InProgress(UploadProgress),
    Complete(Video),
}

/// A single resumable upload of one local file.
pub struct ResumableUpload<'a> {
    client: &'a YouTubeClient,
    request: &'a UploadRequest,
    file: File,
    total_size: u64,
    chunk_size: usize,
    session_uri: Option<String>,
    offset: u64,
    state: UploadState,
}

impl<'a> ResumableUpload<'a> {
    /// Open the file behind `request` for chunked transfer.
    ///
    /// # Preconditions
    /// - `chunk_size` is non-zero
    ///
    /// # Errors
    /// - File cannot be opened or sized
    pub async fn open(
        client: &'a YouTubeClient,
        request: &'a UploadRequest,
        chunk_size: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("Chunk size must be non-zero".to_string()));
        }

        let file = File::open(&request.file_path).await?;
        let total_size = file.metadata().await?.len();

        Ok(Self {
            client,
            request,
            file,
            total_size,
            chunk_size,
            session_uri: None,
            offset: 0,
            state: UploadState::Idle,
        })
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Transmit the next chunk, starting the session first if needed.
    ///
    /// # Errors
    /// - Called after the upload completed or failed
    /// - Network or platform error; the upload is then `Failed`
    pub async fn next_chunk(&mut self) -> Result<ChunkOutcome> {
        match self.state {
            UploadState::Complete => {
                return Err(Error::InvalidState("Upload already complete".to_string()))
            }
            UploadState::Failed => {
                return Err(Error::InvalidState("Upload already failed".to_string()))
            }
            UploadState::Idle | UploadState::Uploading => {}
        }

        let result = self.transmit_next().await;

        self.state = match &result {
            Ok(ChunkOutcome::InProgress(_)) => UploadState::Uploading,
            Ok(ChunkOutcome::Complete(_)) => UploadState::Complete,
            Err(_) => UploadState::Failed,
        };

        result
    }

    async fn transmit_next(&mut self) -> Result<ChunkOutcome> {
        let session_uri = match &self.session_uri {
            Some(uri) => uri.clone(),
            None => {
                let uri = self
                    .client
                    .start_resumable_upload(
                        &self.request.metadata,
                        &self.request.content_type,
                        self.total_size,
                    )
                    .await?;
                self.session_uri = Some(uri.clone());
                uri
            }
        };

        let chunk = self.read_chunk().await?;
        let sent_up_to = self.offset + chunk.len() as u64;

        match self
            .client
            .upload_chunk(&session_uri, chunk, self.offset, self.total_size)
            .await?
        {
            ChunkResponse::Complete(video) => Ok(ChunkOutcome::Complete(video)),
            ChunkResponse::Incomplete { next_offset } => {
                if next_offset > sent_up_to {
                    return Err(Error::Network(format!(
                        "Server acknowledged {} bytes but only {} were sent",
                        next_offset, sent_up_to
                    )));
                }
                if next_offset <= self.offset {
                    return Err(Error::Network(format!(
                        "Upload made no progress at byte {}",
                        self.offset
                    )));
                }

                debug!("Server has {} of {} bytes", next_offset, self.total_size);
                self.offset = next_offset;

                Ok(ChunkOutcome::InProgress(UploadProgress {
                    bytes_sent: self.offset,
                    total_size: self.total_size,
                }))
            }
        }
    }

    /// Read the bytes from the current offset, at most one chunk.
    async fn read_chunk(&mut self) -> Result<Bytes> {
        let remaining = self.total_size.saturating_sub(self.offset);
        let len = remaining.min(self.chunk_size as u64) as usize;

        let mut buf = vec![0u8; len];
        if len > 0 {
            self.file.seek(SeekFrom::Start(self.offset)).await?;
            self.file.read_exact(&mut buf).await?;
        }

        Ok(Bytes::from(buf))
    }
}
