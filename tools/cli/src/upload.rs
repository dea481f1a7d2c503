//! `tubeup-upload`: upload one video file as a private video.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, warn};

use tubeup_auth::CredentialStore;
use tubeup_common::Error;
use tubeup_upload::{
    ensure_video_file, UploadConfig, UploadObserver, UploadProgress, UploadRequest, Uploader,
};

#[derive(Debug, Parser)]
#[command(name = "tubeup-upload")]
#[command(about = "Upload a video to YouTube")]
#[command(version)]
pub struct UploadArgs {
    /// Path to the video file.
    pub file: PathBuf,

    /// Video description.
    pub description: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Credentials written by tubeup-setup.
    #[arg(long, env = "TUBEUP_SECRETS", default_value = "secrets.json")]
    pub secrets: PathBuf,
}

/// Writes upload progress to the console.
struct ConsoleProgress<'a, W: Write> {
    out: &'a mut W,
}

impl<W: Write> ConsoleProgress<'_, W> {
    fn say(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(format_args!("{}\n", line)) {
            warn!("Could not write to the console: {}", e);
        }
    }
}

impl<W: Write> UploadObserver for ConsoleProgress<'_, W> {
    fn started(&mut self, _request: &UploadRequest) {
        self.say(format_args!("Starting upload..."));
    }

    fn progress(&mut self, progress: UploadProgress) {
        self.say(format_args!("Uploaded {}%", progress.percent()));
    }
}

/// Upload the file named in `args`.
///
/// Messages for the user go to `out`. Returns `false` after reporting the
/// reason when anything fails.
pub async fn run<W: Write>(args: &UploadArgs, out: &mut W) -> bool {
    run_with(args, UploadConfig::default(), out).await
}

/// [`run`] against a custom upload configuration.
pub async fn run_with<W: Write>(args: &UploadArgs, config: UploadConfig, out: &mut W) -> bool {
    match upload(args, config, out).await {
        Ok(success) => success,
        Err(e) => {
            warn!("Could not write to the console: {}", e);
            false
        }
    }
}

async fn upload<W: Write>(
    args: &UploadArgs,
    config: UploadConfig,
    out: &mut W,
) -> io::Result<bool> {
    if let Err(e) = ensure_video_file(&args.file) {
        writeln!(out, "{}", e)?;
        return Ok(false);
    }

    let uploader = Uploader::new(CredentialStore::new(&args.secrets), config);

    let credentials = match uploader.load_credentials().await {
        Ok(credentials) => credentials,
        Err(e @ Error::Precondition(_)) => {
            writeln!(out, "{}", e)?;
            return Ok(false);
        }
        Err(e) => {
            debug!("Credential load failed ({} error)", e.category());
            writeln!(out, "Error loading credentials: {}", e)?;
            return Ok(false);
        }
    };

    let mut progress = ConsoleProgress { out: &mut *out };
    let result = uploader
        .upload_with(&credentials, &args.file, &args.description, &mut progress)
        .await;

    match result {
        Ok(outcome) => {
            writeln!(out)?;
            writeln!(out, "Upload Complete!")?;
            writeln!(out, "Video ID: {}", outcome.video_id)?;
            writeln!(out, "Title: {}", outcome.title)?;
            writeln!(out, "URL: {}", outcome.url)?;
            Ok(true)
        }
        Err(e) => {
            debug!("Upload failed ({} error)", e.category());
            if e.is_platform() {
                writeln!(out, "An HTTP error occurred: {}", e)?;
            } else {
                writeln!(out, "An error occurred: {}", e)?;
            }
            Ok(false)
        }
    }
}
