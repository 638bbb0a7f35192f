//! Loopback listener that captures the identity provider redirect.
//!
//! The listener binds the host and port of the configured redirect URI,
//! accepts the first request on its path, hands the query parameters back and
//! shuts down. Later requests get a 410: the code may only be used once.

use super::flow::CallbackParams;
use crate::error::Error;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{net::TcpListener, sync::oneshot, time::timeout};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const DONE_PAGE: &str = "<!doctype html><html><body><p>Sign-in received. You can close this window and return to the terminal.</p></body></html>";
const GONE_PAGE: &str = "<!doctype html><html><body><p>This sign-in link was already used.</p></body></html>";

type Slot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// A bound loopback listener waiting for one redirect.
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
}

impl CallbackListener {
    /// Binds the redirect URI's host and port.
    ///
    /// # Errors
    /// Returns `Error::Validation` for non-loopback or non-http redirect URIs and
    /// `Error::Network` if the port cannot be bound.
    pub async fn bind(redirect_uri: &Url) -> Result<Self, Error> {
        if redirect_uri.scheme() != "http" {
            return Err(Error::Validation(format!(
                "redirect URI {redirect_uri} is not a local http address; use `imglab callback` instead"
            )));
        }

        let host = redirect_uri
            .host_str()
            .ok_or_else(|| Error::Validation("redirect URI has no host".to_string()))?;

        let host = match host {
            "localhost" => "127.0.0.1",
            other => other.trim_start_matches('[').trim_end_matches(']'),
        };

        let port = redirect_uri.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .or_else(|_| format!("[{host}]:{port}").parse::<SocketAddr>())
            .map_err(|_| Error::Validation(format!("redirect host {host} is not an IP address")))?;

        if !addr.ip().is_loopback() {
            return Err(Error::Validation(format!(
                "redirect host {host} is not a loopback address"
            )));
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Network(format!("failed to listen on {addr}: {e}")))?;

        debug!("listening for redirect on {addr}");

        Ok(Self {
            listener,
            path: redirect_uri.path().to_string(),
        })
    }

    /// # Errors
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for the first redirect, up to `wait`.
    ///
    /// # Errors
    /// Returns `Error::Network` on timeout or if the server fails.
    #[instrument(skip(self))]
    pub async fn wait(self, wait: Duration) -> Result<CallbackParams, Error> {
        let (params_tx, params_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let Self { listener, path } = self;

        let slot: Slot = Arc::new(Mutex::new(Some(params_tx)));
        let app = Router::new().route(&path, get(receive)).with_state(slot);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let received = timeout(wait, params_rx).await;

        // Stop serving whatever happened; graceful shutdown lets the browser get its page.
        let _ = stop_tx.send(());
        match timeout(Duration::from_secs(5), server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!("callback server error: {e}"),
            Ok(Err(e)) => warn!("callback server task failed: {e}"),
            Err(_) => warn!("callback server did not shut down in time"),
        }

        match received {
            Ok(Ok(params)) => {
                info!("redirect received");
                Ok(params)
            }
            Ok(Err(_)) => Err(Error::Network("callback listener stopped".to_string())),
            Err(_) => Err(Error::Network(format!(
                "no sign-in redirect within {} seconds",
                wait.as_secs()
            ))),
        }
    }
}

async fn receive(State(slot): State<Slot>, Query(params): Query<CallbackParams>) -> impl IntoResponse {
    let sender = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };

    match sender {
        Some(tx) => {
            if tx.send(params).is_err() {
                warn!("redirect arrived after the listener gave up");
            }
            (StatusCode::OK, Html(DONE_PAGE))
        }
        None => (StatusCode::GONE, Html(GONE_PAGE)),
    }
}
