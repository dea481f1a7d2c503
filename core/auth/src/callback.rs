//! Loopback HTTP listener that receives the OAuth2 redirect.
//!
//! The server binds `127.0.0.1` on the requested port (0 picks an ephemeral
//! one), answers the first redirect that carries a `code` or an `error`,
//! and hands the result to the waiting flow through a oneshot channel.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use tubeup_common::{Error, Result};

/// How long to wait for in-flight browser connections after the code arrived.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

const SUCCESS_PAGE: &str = "<html><head><title>tubeup</title></head><body>\
    The authentication flow has completed. You may close this window.</body></html>";

const FAILURE_PAGE: &str = "<html><head><title>tubeup</title></head><body>\
    Authorization failed. Check the terminal for details.</body></html>";

/// Authorization code delivered by the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    /// CSRF state echoed by the provider.
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

type CodeSender = Arc<Mutex<Option<oneshot::Sender<Result<AuthorizationCode>>>>>;

/// Running loopback redirect listener.
pub struct CallbackServer {
    addr: SocketAddr,
    code_rx: oneshot::Receiver<Result<AuthorizationCode>>,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Bind the listener and start serving.
    ///
    /// # Errors
    /// - The port is unavailable
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
        let addr = listener.local_addr()?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let sender: CodeSender = Arc::new(Mutex::new(Some(code_tx)));

        let app = Router::new()
            .route("/", get(handle_redirect))
            .with_state(sender);

        debug!("Callback server listening on {}", addr);

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            if let Err(e) = server.await {
                tracing::warn!("Callback server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            code_rx,
            shutdown_tx,
            handle,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Redirect URI to register with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}/", self.addr.ip(), self.addr.port())
    }

    /// Block until the browser redirect arrives, then shut the server down.
    ///
    /// # Errors
    /// - The provider reported an error (e.g. the user denied access)
    /// - The server stopped before a redirect arrived
    pub async fn wait_for_code(self) -> Result<AuthorizationCode> {
        debug!("Waiting for the authorization redirect");

        let result = self.code_rx.await.map_err(|_| {
            Error::Authentication("Callback server stopped before the redirect arrived".to_string())
        })?;

        let _ = self.shutdown_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, self.handle).await.is_err() {
            debug!("Callback server did not shut down within {:?}", SHUTDOWN_GRACE);
        }

        result
    }
}

async fn handle_redirect(
    State(sender): State<CodeSender>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, Html<&'static str>) {
    let (outcome, response) = match params {
        RedirectParams {
            error: Some(error),
            error_description,
            ..
        } => {
            let message = match error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            };
            (
                Err(Error::Authentication(format!(
                    "Authorization was not granted: {}",
                    message
                ))),
                (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE)),
            )
        }
        RedirectParams {
            code: Some(code),
            state,
            ..
        } => (
            Ok(AuthorizationCode { code, state }),
            (StatusCode::OK, Html(SUCCESS_PAGE)),
        ),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Html("<html><body>No <code>code</code> in URL</body></html>"),
            )
        }
    };

    let tx = sender.lock().ok().and_then(|mut guard| guard.take());
    if let Some(tx) = tx {
        let _ = tx.send(outcome);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receives_code_on_ephemeral_port() {
        let server = CallbackServer::bind(0).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);

        let url = format!("{}?code=4%2Fabc&state=xyz&scope=youtube", server.redirect_uri());
        let request = tokio::spawn(async move { reqwest::get(url).await });

        let code = server.wait_for_code().await.unwrap();
        assert_eq!(code.code, "4/abc");
        assert_eq!(code.state.as_deref(), Some("xyz"));

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("You may close this window"));
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let server = CallbackServer::bind(0).await.unwrap();
        let url = format!("{}?error=access_denied", server.redirect_uri());
        tokio::spawn(async move { reqwest::get(url).await });

        let err = server.wait_for_code().await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn test_request_without_code_keeps_waiting() {
        let server = CallbackServer::bind(0).await.unwrap();
        let base = server.redirect_uri();

        let stray = reqwest::get(&base).await.unwrap();
        assert_eq!(stray.status(), reqwest::StatusCode::BAD_REQUEST);

        let url = format!("{}?code=later", base);
        tokio::spawn(async move { reqwest::get(url).await });

        assert_eq!(server.wait_for_code().await.unwrap().code, "later");
    }

    #[tokio::test]
    async fn test_redirect_uri_format() {
        let server = CallbackServer::bind(0).await.unwrap();
        let uri = server.redirect_uri();

        assert!(uri.starts_with("http://127.0.0.1:"));
        assert!(uri.ends_with('/'));
    }
}
