//! mcp-engine: a Model Context Protocol server engine
//!
//! This library lets an application expose tools, resources and prompts to
//! AI clients over MCP, using JSON-RPC 2.0 over stdio or HTTP.
//!
//! # Architecture
//!
//! The application provides the primitives. The engine handles the protocol:
//!
//! - **Lifecycle**: `initialize` negotiation and per-session state
//! - **Routing**: list, call, read, get, completion and logging methods
//! - **Streaming**: tools may yield progress and log notifications before
//!   their final result
//! - **Transports**: newline-delimited stdio and HTTP with Server-Sent Events
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation
//! - [`demo`] — Example primitives served by the binary

pub mod config;
pub mod demo;
pub mod error;
pub mod mcp;
