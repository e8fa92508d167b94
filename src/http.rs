//! HTTP transport in front of the [`Dispatcher`].
//!
//! - `POST /slack` normalizes a real Slack request (headers and body) into
//!   a [`WebRequest`] and answers with the resulting [`WebResponse`].
//! - `POST /invoke` accepts a raw invocation payload, either a web request
//!   envelope or a queue batch, and returns the dispatcher's output verbatim.
//! - `GET /health` answers `ok`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatch::{Dispatcher, WebRequest, WebResponse};
use crate::{AppError, Result};

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

async fn slack_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = WebRequest {
        headers: header_map(&headers),
        body: Some(String::from_utf8_lossy(&body).into_owned()),
        is_base64_encoded: false,
    };
    into_http_response(dispatcher.handle_web_request(&request).await)
}

async fn invoke(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    match dispatcher.dispatch(&body).await {
        Ok(Some(output)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            output,
        )
            .into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err @ AppError::UnsupportedPayload(_)) => {
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
        .collect()
}

fn into_http_response(response: WebResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response
        .headers
        .get("content-type")
        .cloned()
        .unwrap_or_else(|| "text/plain".to_owned());
    (status, [(header::CONTENT_TYPE, content_type)], response.body).into_response()
}

/// Build the application router.
#[must_use]
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/slack", post(slack_request))
        .route("/invoke", post(invoke))
        .with_state(dispatcher)
}

/// Bind the inbound transport on all interfaces.
///
/// # Errors
///
/// Returns `AppError::Config` if the port cannot be bound.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {addr}: {err}")))
}

/// Serve requests until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    ct: CancellationToken,
) -> Result<()> {
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "http transport listening"),
        Err(err) => warn!(%err, "http transport listening on unknown address"),
    }

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(ct.cancelled_owned())
        .await
        .map_err(|err| AppError::Io(format!("http server failed: {err}")))
}
