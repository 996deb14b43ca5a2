//! Transports carrying MCP messages.
//!
//! Two transports share the [`Transport`] contract:
//!
//! - [`stdio`]: newline-delimited JSON over stdin/stdout, one session per
//!   process, strictly sequential
//! - [`http`]: one POST per dispatch cycle, session correlated by the
//!   `Mcp-Session-Id` header, streamed replies as Server-Sent Events
//!
//! Both hand inbound text to [`McpServer::handle_raw`] and write every
//! message of the resulting [`Reply`] in order.
//!
//! [`McpServer::handle_raw`]: crate::mcp::server::McpServer::handle_raw

use std::future::Future;
use std::io;

use crate::mcp::protocol::JsonRpcMessage;
use crate::mcp::server::Reply;

pub mod http;
pub mod stdio;

pub use http::{router, serve, SESSION_HEADER};
pub use stdio::StdioTransport;

/// What every transport provides to the dispatcher.
pub trait Transport {
    /// The session this transport is serving.
    fn session_id(&self) -> &str;

    /// Writes one message.
    fn send(&mut self, message: JsonRpcMessage) -> impl Future<Output = io::Result<()>>;

    /// Writes every message of `reply`, in order.
    ///
    /// Stops at the first failed write.
    fn stream(&mut self, reply: Reply) -> impl Future<Output = io::Result<()>> {
        async move {
            for message in reply.into_messages() {
                self.send(message).await?;
            }
            Ok(())
        }
    }
}

/// Serialises `message` as one line of JSON without a trailing newline.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn encode(message: &JsonRpcMessage) -> io::Result<String> {
    message
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
