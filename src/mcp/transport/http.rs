//! HTTP transport with optional Server-Sent Events streaming.
//!
//! One POST to the MCP endpoint is one dispatch cycle:
//!
//! | Reply                                   | Response                          |
//! |-----------------------------------------|-----------------------------------|
//! | none (notification)                     | `202 Accepted`, empty body        |
//! | one terminal message                    | `200`, `application/json`         |
//! | streamed, client accepts SSE            | `200`, `text/event-stream`        |
//! | streamed, client does not accept SSE    | `200`, terminal message as JSON   |
//!
//! The session id travels in the `Mcp-Session-Id` header; a request without
//! one starts a new session and the id is returned in the same header.
//! Other HTTP methods on the endpoint are answered with `405`.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;

use super::{encode, Transport};
use crate::mcp::protocol::{JsonRpcError, JsonRpcMessage};
use crate::mcp::server::McpServer;
use crate::mcp::session::Session;

/// Request and response header carrying the session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Content type of streamed replies.
pub const EVENT_STREAM: &str = "text/event-stream; charset=UTF-8";

/// Messages buffered between the dispatcher and the response body.
const CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
struct HttpState {
    server: Arc<McpServer>,
}

/// One HTTP exchange, forwarding messages to the response body.
struct HttpExchange {
    session_id: String,
    sender: mpsc::Sender<JsonRpcMessage>,
}

impl Transport for HttpExchange {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send(&mut self, message: JsonRpcMessage) -> io::Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }
}

/// Builds the router serving `server` at `path`.
#[must_use]
pub fn router(server: Arc<McpServer>, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_post).fallback(method_not_allowed))
        .layer(TraceLayer::new_for_http())
        .with_state(HttpState { server })
}

/// Serves `server` on `bind` until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(server: Arc<McpServer>, bind: SocketAddr, path: &str) -> io::Result<()> {
    let app = router(server, path);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(address = %listener.local_addr()?, path = %path, "HTTP transport listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(unix)]
    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
    tracing::info!("Shutdown signal received");
}

async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/event-stream"))
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map_or_else(Session::generate_id, str::to_string)
}

fn with_session(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

fn json_response(message: &JsonRpcMessage) -> Response {
    match encode(message) {
        Ok(json) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            json,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialise reply");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn sse_event(message: &JsonRpcMessage) -> Result<Bytes, io::Error> {
    encode(message).map(|json| Bytes::from(format!("data: {json}\n\n")))
}

async fn handle_post(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = session_id(&headers);

    let Ok(raw) = String::from_utf8(body.to_vec()) else {
        let error: JsonRpcMessage = JsonRpcError::parse_error().into();
        return with_session(json_response(&error), &session_id);
    };

    let (sender, mut receiver) = mpsc::channel(CHANNEL_CAPACITY);
    let mut exchange = HttpExchange {
        session_id: session_id.clone(),
        sender,
    };
    let server = Arc::clone(&state.server);
    let runtime = tokio::runtime::Handle::current();

    // Handlers produce their messages synchronously.
    tokio::task::spawn_blocking(move || {
        let reply = server.handle_raw(exchange.session_id(), &raw);
        if let Err(e) = runtime.block_on(exchange.stream(reply)) {
            tracing::debug!(error = %e, "Stopped streaming reply");
        }
    });

    let Some(first) = receiver.recv().await else {
        return with_session(StatusCode::ACCEPTED.into_response(), &session_id);
    };

    if first.is_terminal() {
        return with_session(json_response(&first), &session_id);
    }

    if !accepts_event_stream(&headers) {
        while let Some(message) = receiver.recv().await {
            if message.is_terminal() {
                return with_session(json_response(&message), &session_id);
            }
        }
        tracing::error!("Reply ended without a terminal message");
        return with_session(StatusCode::INTERNAL_SERVER_ERROR.into_response(), &session_id);
    }

    let events = tokio_stream::once(first)
        .chain(ReceiverStream::new(receiver))
        .map(|message| sse_event(&message));

    let response = (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM))],
        Body::from_stream(events),
    )
        .into_response();
    with_session(response, &session_id)
}
