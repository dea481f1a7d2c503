//! `tubeup-setup`: authorize the application and store the credentials.

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use tubeup_auth::{
    ClientSecrets, CredentialRecord, CredentialStore, FlowConfig, FlowDelegate, InstalledFlow,
};
use tubeup_common::{Error, Result};

const SETUP_GUIDANCE: &str = "\
Please follow these steps:
1. Go to Google Cloud Console (https://console.cloud.google.com)
2. Create a new project or select an existing one
3. Enable the YouTube Data API v3
4. Go to Credentials
5. Create OAuth 2.0 Client ID (Desktop Application)
6. Download the client configuration
7. Rename it to client_secrets.json and place it in this directory";

#[derive(Debug, Parser)]
#[command(name = "tubeup-setup")]
#[command(about = "Authorize tubeup to upload videos to your YouTube channel")]
#[command(version)]
pub struct SetupArgs {
    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// OAuth client configuration downloaded from the Google Cloud Console.
    #[arg(long, env = "TUBEUP_CLIENT_SECRETS", default_value = "client_secrets.json")]
    pub client_secrets: PathBuf,

    /// Where to write the obtained credentials.
    #[arg(long, env = "TUBEUP_SECRETS", default_value = "secrets.json")]
    pub secrets: PathBuf,

    /// Only print the authorization URL instead of opening a browser.
    #[arg(long)]
    pub no_browser: bool,
}

/// Prints the authorization URL and optionally opens it.
struct BrowserDelegate {
    open_browser: bool,
}

impl FlowDelegate for BrowserDelegate {
    fn present_user_url(&self, url: &str) {
        println!("Please visit this URL to authorize this application: {}", url);

        if self.open_browser {
            if let Err(e) = open::that(url) {
                warn!("Could not open a browser: {}", e);
            }
        }
    }
}

/// Run the authorization flow and persist the credentials.
///
/// Messages for the user go to `out`. Returns `false` after reporting the
/// reason when anything fails.
pub async fn run<W: Write>(args: &SetupArgs, out: &mut W) -> bool {
    let delegate = BrowserDelegate {
        open_browser: !args.no_browser,
    };
    run_with(args, delegate, out, read_confirmation).await
}

/// [`run`] with a custom URL delegate and retry confirmation.
pub async fn run_with<W, D, F, Fut>(
    args: &SetupArgs,
    delegate: D,
    out: &mut W,
    confirm: F,
) -> bool
where
    W: Write,
    D: FlowDelegate + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    match authorize(args, delegate, out, confirm).await {
        Ok(success) => success,
        Err(e) => {
            warn!("Could not write to the console: {}", e);
            false
        }
    }
}

async fn authorize<W, D, F, Fut>(
    args: &SetupArgs,
    delegate: D,
    out: &mut W,
    confirm: F,
) -> io::Result<bool>
where
    W: Write,
    D: FlowDelegate + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let secrets = match ClientSecrets::load(&args.client_secrets).await {
        Ok(secrets) => secrets,
        Err(e @ Error::Precondition(_)) => {
            writeln!(out, "{}", e)?;
            writeln!(out)?;
            writeln!(out, "{}", SETUP_GUIDANCE)?;
            return Ok(false);
        }
        Err(e) => {
            writeln!(out, "An error occurred: {}", e)?;
            return Ok(false);
        }
    };

    let flow = InstalledFlow::new(secrets, FlowConfig::default()).with_delegate(delegate);

    let record = match flow.obtain().await {
        Ok(record) => record,
        Err(e) => {
            writeln!(out, "An error occurred: {}", e)?;
            return Ok(false);
        }
    };

    let store = CredentialStore::new(&args.secrets);
    match save_with_retry(&store, &record, out, confirm).await? {
        Ok(()) => {
            writeln!(out)?;
            writeln!(
                out,
                "Credentials successfully saved to {}!",
                store.path().display()
            )?;
            Ok(true)
        }
        Err(e) => {
            writeln!(out, "An error occurred: {}", e)?;
            Ok(false)
        }
    }
}

/// Write `record`, asking through `confirm` whether to try again after
/// each failure.
///
/// The record stays in memory between attempts, so a retry never repeats
/// the browser flow. The outer error is a console write failure.
pub async fn save_with_retry<W, F, Fut>(
    store: &CredentialStore,
    record: &CredentialRecord,
    out: &mut W,
    mut confirm: F,
) -> io::Result<Result<()>>
where
    W: Write,
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    loop {
        match store.save(record).await {
            Ok(()) => {
                info!("Credentials written to {}", store.path().display());
                return Ok(Ok(()));
            }
            Err(e) => {
                writeln!(out, "Failed to save credentials: {}", e)?;
                write!(
                    out,
                    "Retry saving credentials to {}? [y/N] ",
                    store.path().display()
                )?;
                out.flush()?;

                if !confirm().await {
                    return Ok(Err(e));
                }
            }
        }
    }
}

/// Read a yes/no answer from the terminal without blocking the runtime.
async fn read_confirmation() -> bool {
    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map(|_| line)
    })
    .await;

    match answer {
        Ok(Ok(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> CredentialRecord {
        CredentialRecord {
            token: "ya29.access".to_string(),
            refresh_token: "1//refresh".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/youtube".to_string()],
            expiry: None,
        }
    }

    #[test]
    fn test_args_defaults() {
        let args = SetupArgs::parse_from(["tubeup-setup"]);

        assert!(!args.verbose);
        assert!(!args.no_browser);
        assert_eq!(args.secrets, PathBuf::from("secrets.json"));
    }

    fn args_in(dir: &TempDir) -> SetupArgs {
        SetupArgs {
            verbose: false,
            client_secrets: dir.path().join("client_secrets.json"),
            secrets: dir.path().join("secrets.json"),
            no_browser: true,
        }
    }

    #[tokio::test]
    async fn test_missing_client_secrets_prints_guidance() {
        let dir = TempDir::new().unwrap();
        let args = args_in(&dir);
        let mut out = Vec::new();

        assert!(!run(&args, &mut out).await);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            format!("Error: {} not found!", args.client_secrets.display())
        );
        assert_eq!(lines[1], "");
        assert_eq!(
            &lines[2..],
            &[
                "Please follow these steps:",
                "1. Go to Google Cloud Console (https://console.cloud.google.com)",
                "2. Create a new project or select an existing one",
                "3. Enable the YouTube Data API v3",
                "4. Go to Credentials",
                "5. Create OAuth 2.0 Client ID (Desktop Application)",
                "6. Download the client configuration",
                "7. Rename it to client_secrets.json and place it in this directory",
            ]
        );
        assert!(!args.secrets.exists());
    }

    #[tokio::test]
    async fn test_malformed_client_secrets_reports_error() {
        let dir = TempDir::new().unwrap();
        let args = args_in(&dir);
        std::fs::write(&args.client_secrets, "{\"other\": {}}").unwrap();
        let mut out = Vec::new();

        assert!(!run(&args, &mut out).await);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("An error occurred: Invalid input:"));
    }

    #[tokio::test]
    async fn test_save_retry_after_failure() {
        let dir = TempDir::new().unwrap();
        let target_dir = dir.path().join("later");
        let store = CredentialStore::new(target_dir.join("secrets.json"));
        let mut attempts = 0;
        let mut out = Vec::new();

        save_with_retry(&store, &record(), &mut out, || {
            attempts += 1;
            std::fs::create_dir(&target_dir).unwrap();
            async { true }
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(attempts, 1);
        assert_eq!(store.load().await.unwrap(), record());

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Failed to save credentials: "));
        assert!(text.contains(&format!(
            "Retry saving credentials to {}? [y/N] ",
            store.path().display()
        )));
    }

    #[tokio::test]
    async fn test_save_gives_up_when_declined() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("missing").join("secrets.json"));
        let mut out = Vec::new();

        let err = save_with_retry(&store, &record(), &mut out, || async { false })
            .await
            .unwrap()
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!store.exists());
    }
}
