//! stdio transport for MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! The loop is strictly sequential: a request, including every message it
//! streams, is fully written before the next line is read.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::{encode, Transport};
use crate::mcp::protocol::{JsonRpcError, JsonRpcMessage};
use crate::mcp::server::McpServer;
use crate::mcp::session::Session;

/// Longest accepted message line in bytes, excluding the line ending.
pub const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// One line of input as read by [`StdioTransport::read_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A decoded line with its ending stripped.
    Text(String),
    /// The line was not valid UTF-8.
    InvalidUtf8,
    /// The line exceeded [`MAX_LINE_LENGTH`] and was discarded.
    TooLong,
}

/// A line-oriented MCP transport.
///
/// Reads JSON-RPC messages from `R` and writes replies to `W`. The session id
/// is generated once, so one process serves exactly one session.
pub struct StdioTransport<R = BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    /// Buffered input.
    reader: R,
    /// Output sink.
    writer: W,
    /// Process-lifetime session id.
    session_id: String,
}

impl StdioTransport {
    /// Creates a transport over the process stdin and stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over arbitrary streams.
    #[must_use]
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            session_id: Session::generate_id(),
        }
    }

    /// Returns the writer, for inspecting output in tests.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the input is closed (EOF). Lines longer than
    /// [`MAX_LINE_LENGTH`] are skipped up to the next newline and reported as
    /// [`Line::TooLong`]; undecodable lines as [`Line::InvalidUtf8`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<Line>> {
        let mut buf = Vec::new();
        let mut overflow = false;
        let mut bytes_read = 0usize;

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }

            let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (&available[..=pos], true),
                None => (available, false),
            };
            let len = chunk.len();
            bytes_read += len;

            if !overflow {
                if buf.len() + len > MAX_LINE_LENGTH + 2 {
                    overflow = true;
                    buf = Vec::new();
                } else {
                    buf.extend_from_slice(chunk);
                }
            }

            self.reader.consume(len);
            if done {
                break;
            }
        }

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }

        if overflow || buf.len() > MAX_LINE_LENGTH {
            return Ok(Some(Line::TooLong));
        }

        Ok(Some(String::from_utf8(buf).map_or(Line::InvalidUtf8, Line::Text)))
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Serves `server` until the input reaches EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self, server: &McpServer) -> io::Result<()> {
        tracing::info!(session_id = %self.session_id, "stdio transport started");
        while self.step(server).await? {}
        tracing::info!("stdin closed, stopping");
        Ok(())
    }

    /// Reads and handles one line.
    ///
    /// Returns `false` once the input is closed.
    async fn step(&mut self, server: &McpServer) -> io::Result<bool> {
        let line = match self.read_line().await? {
            None => return Ok(false),
            Some(Line::Text(line)) => line,
            Some(Line::InvalidUtf8) => {
                tracing::warn!("discarding line that is not valid UTF-8");
                self.send(JsonRpcError::parse_error().into()).await?;
                return Ok(true);
            }
            Some(Line::TooLong) => {
                tracing::warn!(limit = MAX_LINE_LENGTH, "discarding oversized line");
                self.send(
                    JsonRpcError::invalid_request(
                        None,
                        format!("Message exceeds {MAX_LINE_LENGTH} bytes."),
                    )
                    .into(),
                )
                .await?;
                return Ok(true);
            }
        };

        if line.trim().is_empty() {
            return Ok(true);
        }

        let reply = server.handle_raw(&self.session_id, &line);
        self.stream(reply).await?;
        Ok(true)
    }

    /// Serves `server` until EOF or a termination signal.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(unix)]
    pub async fn run_with_shutdown(&mut self, server: &McpServer) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                running = self.step(server) => {
                    if !running? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Serves `server` until EOF or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(windows)]
    pub async fn run_with_shutdown(&mut self, server: &McpServer) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                running = self.step(server) => {
                    if !running? {
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send(&mut self, message: JsonRpcMessage) -> io::Result<()> {
        let json = encode(&message)?;
        self.write_raw(&json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{JsonRpcResponse, RequestId};

    fn transport(input: &str) -> StdioTransport<&[u8], Vec<u8>> {
        StdioTransport::with_io(input.as_bytes(), Vec::new())
    }

    #[test]
    fn transport_default() {
        let transport = StdioTransport::default();
        assert!(!transport.session_id().is_empty());
    }

    #[tokio::test]
    async fn read_line_strips_line_endings() {
        let mut transport = transport("first\r\nsecond\nlast");
        assert_eq!(transport.read_line().await.unwrap(), Some(Line::Text("first".into())));
        assert_eq!(transport.read_line().await.unwrap(), Some(Line::Text("second".into())));
        assert_eq!(transport.read_line().await.unwrap(), Some(Line::Text("last".into())));
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_line_reports_invalid_utf8_and_resumes() {
        let input: &[u8] = b"\xff\xfe garbage\nok\n";
        let mut transport = StdioTransport::with_io(input, Vec::new());
        assert_eq!(transport.read_line().await.unwrap(), Some(Line::InvalidUtf8));
        assert_eq!(transport.read_line().await.unwrap(), Some(Line::Text("ok".into())));
    }

    #[tokio::test]
    async fn read_line_discards_oversized_lines() {
        let mut input = vec![b'x'; MAX_LINE_LENGTH + 1];
        input.extend_from_slice(b"\nnext\n");
        let mut transport = StdioTransport::with_io(input.as_slice(), Vec::new());
        assert_eq!(transport.read_line().await.unwrap(), Some(Line::TooLong));
        assert_eq!(transport.read_line().await.unwrap(), Some(Line::Text("next".into())));
    }

    #[tokio::test]
    async fn line_at_the_limit_is_accepted() {
        let mut input = vec![b'x'; MAX_LINE_LENGTH];
        input.extend_from_slice(b"\r\n");
        let mut transport = StdioTransport::with_io(input.as_slice(), Vec::new());
        match transport.read_line().await.unwrap() {
            Some(Line::Text(line)) => assert_eq!(line.len(), MAX_LINE_LENGTH),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_writes_one_line_per_message() {
        let mut transport = transport("");
        let response = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({
                "message": "hello world",
                "nested": {"key": "value"}
            }),
        );
        transport.send(response.into()).await.unwrap();
        transport
            .send(JsonRpcError::method_not_found(RequestId::Number(2), "test/method").into())
            .await
            .unwrap();

        let output = String::from_utf8(transport.into_writer()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(output.ends_with('\n'));
        assert!(lines[0].contains("hello world"));
        assert!(lines[1].contains("-32601"));
    }

    #[tokio::test]
    async fn run_answers_until_eof() {
        let server = McpServer::builder().build();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            "not json\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
        );
        let mut transport = transport(input);
        transport.run(&server).await.unwrap();

        let output = String::from_utf8(transport.into_writer()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], -32700);
    }
}
