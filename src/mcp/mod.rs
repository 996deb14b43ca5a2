//! Model Context Protocol (MCP) server engine.
//!
//! The engine turns registered tools, resources and prompts into a JSON-RPC
//! 2.0 service speaking MCP. It owns the session lifecycle, request routing,
//! pagination, completions and log filtering; transports only move text.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          McpServer                           │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────────┐     │
//! │   │  Transport  │───▶│ Dispatcher  │───▶│  Primitives  │     │
//! │   │ stdio/HTTP  │◀───│  (methods)  │    │ tool/res/pr. │     │
//! │   └─────────────┘    └─────────────┘    └──────────────┘     │
//! │          │                  │                  │             │
//! │          ▼                  ▼                  ▼             │
//! │   ┌───────────────┐  ┌──────────────┐  ┌───────────────┐     │
//! │   │ JSON-RPC wire │  │   Sessions   │  │ Content/Reply │     │
//! │   └───────────────┘  └──────────────┘  └───────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Versions
//!
//! `2025-06-18`, `2025-03-26` and `2024-11-05` are accepted by default; the
//! list is configurable and the newest entry is offered when a client does
//! not ask for one.

pub mod completion;
pub mod content;
pub mod context;
pub mod pagination;
pub mod primitive;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;
pub mod uri_template;

pub use completion::{CallbackOutput, Completion, CompletionEnum, CompletionResponse};
pub use content::{Content, Response, Role};
pub use context::{AllowAll, Authorizer, Capabilities, ServerContext, ServerInfo};
pub use primitive::{
    Output, Prompt, PromptArgument, Request, Resource, Tool, ToolAnnotations, ValidationError,
};
pub use protocol::{
    JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, MessageError, RequestId,
};
pub use server::{McpServer, Reply, ServerBuilder};
pub use session::{InMemorySessionStore, LogLevel, Session, SessionStore};
pub use transport::StdioTransport;
pub use uri_template::{TemplateValue, UriTemplate, Variables};
