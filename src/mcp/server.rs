//! MCP method dispatcher.
//!
//! [`McpServer`] turns one inbound line or HTTP body into zero or more
//! outbound JSON-RPC messages:
//!
//! 1. **Parse**: envelope validation (`-32700` / `-32600`)
//! 2. **Session**: load the caller's [`Session`] from the store
//! 3. **Dispatch**: route reserved methods, then custom [`Method`]s
//! 4. **Persist**: write the session back
//!
//! Notifications never produce a reply. Streaming tool and prompt handlers
//! yield a [`Reply::Stream`] whose items are notifications followed by
//! exactly one terminal response or error.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::error::{InvalidArgument, McpError};
use crate::mcp::completion::CompletionResponse;
use crate::mcp::content::{ContentKind, Response};
use crate::mcp::context::{Authorizer, Capabilities, ServerContext, ServerInfo};
use crate::mcp::pagination::{Page, Paginator};
use crate::mcp::primitive::{Output, Prompt, Request, Resource, Tool, ValidationError};
use crate::mcp::protocol::{
    methods, parse_message, IncomingMessage, JsonRpcMessage, MessageError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, OutgoingNotification, RequestId,
};
use crate::mcp::session::{InMemorySessionStore, LogLevel, Session, SessionStore, Sessions};

/// Protocol versions supported by default, newest first.
pub const DEFAULT_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

/// A custom JSON-RPC method.
pub trait Method: Send + Sync {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns a protocol error to be sent to the client.
    fn handle(
        &self,
        request: &JsonRpcRequest,
        context: &ServerContext,
        session: &mut Session,
    ) -> Result<Value, McpError>;
}

impl<F> Method for F
where
    F: Fn(&JsonRpcRequest, &ServerContext, &mut Session) -> Result<Value, McpError> + Send + Sync,
{
    fn handle(
        &self,
        request: &JsonRpcRequest,
        context: &ServerContext,
        session: &mut Session,
    ) -> Result<Value, McpError> {
        self(request, context, session)
    }
}

/// The messages produced by one dispatch cycle.
pub enum Reply {
    /// Nothing to send (the input was a notification).
    None,
    /// A single terminal message.
    Single(JsonRpcMessage),
    /// Notifications followed by one terminal message, produced lazily.
    Stream(Box<dyn Iterator<Item = JsonRpcMessage> + Send>),
}

impl Reply {
    /// Returns every message of the reply, in emission order.
    #[must_use]
    pub fn into_messages(self) -> Box<dyn Iterator<Item = JsonRpcMessage> + Send> {
        match self {
            Self::None => Box::new(std::iter::empty()),
            Self::Single(message) => Box::new(std::iter::once(message)),
            Self::Stream(stream) => stream,
        }
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Single(message) => f.debug_tuple("Single").field(message).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// What a reserved-method handler produced.
enum Outcome {
    Result(Value),
    Messages(Reply),
}

type Finisher = Box<dyn FnOnce(Vec<Response>) -> Result<Value, McpError> + Send>;

/// Drains primitive responses, forwarding notifications as they arrive and
/// folding everything else into one terminal message.
struct StreamingReply {
    id: RequestId,
    responses: Box<dyn Iterator<Item = Response> + Send>,
    collected: Vec<Response>,
    log_level: LogLevel,
    finish: Option<Finisher>,
}

impl StreamingReply {
    fn new(id: RequestId, output: Output, log_level: LogLevel, finish: Finisher) -> Self {
        Self {
            id,
            responses: output.into_responses(),
            collected: Vec::new(),
            log_level,
            finish: Some(finish),
        }
    }

    /// Collects eagerly produced output into the smallest reply.
    fn into_reply(self, streaming: bool) -> Reply {
        if streaming {
            return Reply::Stream(Box::new(self));
        }
        let mut messages: Vec<JsonRpcMessage> = self.collect();
        if messages.len() == 1 {
            if let Some(message) = messages.pop() {
                return Reply::Single(message);
            }
        }
        Reply::Stream(Box::new(messages.into_iter()))
    }
}

impl Iterator for StreamingReply {
    type Item = JsonRpcMessage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finish.is_none() {
            return None;
        }

        for response in self.responses.by_ref() {
            let ContentKind::Notification { method, params } = response.content().kind() else {
                self.collected.push(response);
                continue;
            };
            if response
                .log_level()
                .is_some_and(|level| !level.should_emit(self.log_level))
            {
                continue;
            }
            return Some(OutgoingNotification::new(method.clone(), params.clone()).into());
        }

        let finish = self.finish.take()?;
        let collected = std::mem::take(&mut self.collected);
        Some(match finish(collected) {
            Ok(result) => JsonRpcResponse::success(self.id.clone(), result).into(),
            Err(error) => error.into_response(Some(self.id.clone())).into(),
        })
    }
}

/// The MCP protocol engine.
pub struct McpServer {
    context: ServerContext,
    sessions: Sessions,
    methods: HashMap<String, Box<dyn Method>>,
}

impl McpServer {
    /// Starts building a server with default settings.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server snapshot.
    #[must_use]
    pub const fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Returns the session repository.
    #[must_use]
    pub const fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Handles one raw inbound message for `session_id`.
    ///
    /// Malformed input produces an error reply, except for malformed
    /// notifications, which are dropped. It never fails.
    #[must_use]
    pub fn handle_raw(&self, session_id: &str, raw: &str) -> Reply {
        match parse_message(raw) {
            Ok(message) => self.handle_message(session_id, message),
            Err(MessageError::Reply(error)) => {
                tracing::debug!(
                    session_id = %session_id,
                    code = error.error.code,
                    "Rejected malformed message"
                );
                Reply::Single(error.into())
            }
            Err(MessageError::Discard(error)) => {
                tracing::debug!(
                    session_id = %session_id,
                    reason = %error.error.message,
                    "Dropped malformed notification"
                );
                Reply::None
            }
        }
    }

    /// Handles one parsed inbound message for `session_id`.
    #[must_use]
    pub fn handle_message(&self, session_id: &str, message: IncomingMessage) -> Reply {
        match message {
            IncomingMessage::Request(mut request) => {
                request.session_id = Some(session_id.to_string());
                self.handle_request(session_id, &request)
            }
            IncomingMessage::Notification(notification) => {
                self.handle_notification(session_id, &notification);
                Reply::None
            }
        }
    }

    fn handle_request(&self, session_id: &str, request: &JsonRpcRequest) -> Reply {
        tracing::debug!(method = %request.method, session_id = %session_id, "Dispatching request");

        let mut session = self.sessions.load(session_id);
        let outcome = self.dispatch(request, &mut session);
        self.sessions.save(&session);

        match outcome {
            Ok(Outcome::Result(result)) => {
                Reply::Single(JsonRpcResponse::success(request.id.clone(), result).into())
            }
            Ok(Outcome::Messages(reply)) => reply,
            Err(error) => {
                tracing::debug!(method = %request.method, error = %error, "Request failed");
                Reply::Single(error.into_response(Some(request.id.clone())).into())
            }
        }
    }

    fn handle_notification(&self, session_id: &str, notification: &JsonRpcNotification) {
        if notification.method != methods::INITIALIZED {
            tracing::debug!(method = %notification.method, "Ignoring notification");
            return;
        }

        let mut session = self.sessions.load(session_id);
        if session.mark_initialized() {
            tracing::info!(session_id = %session_id, "Session initialised");
            self.sessions.save(&session);
        } else {
            tracing::warn!(
                session_id = %session_id,
                "Received initialized notification before initialize"
            );
        }
    }

    fn dispatch(&self, request: &JsonRpcRequest, session: &mut Session) -> Result<Outcome, McpError> {
        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request, session)?,
            methods::PING => json!({}),
            methods::TOOLS_LIST => self.handle_tools_list(request, session)?,
            methods::TOOLS_CALL => return self.handle_tools_call(request, session),
            methods::RESOURCES_LIST => self.handle_resources_list(request, session, false)?,
            methods::RESOURCES_TEMPLATES_LIST => {
                self.handle_resources_list(request, session, true)?
            }
            methods::RESOURCES_READ => self.handle_resources_read(request, session)?,
            methods::PROMPTS_LIST => self.handle_prompts_list(request, session)?,
            methods::PROMPTS_GET => return self.handle_prompts_get(request, session),
            methods::COMPLETION_COMPLETE => self.handle_completion(request, session)?,
            methods::LOGGING_SET_LEVEL => self.handle_set_level(request, session)?,
            other => match self.methods.get(other) {
                Some(method) => method.handle(request, &self.context, session)?,
                None => return Err(McpError::method_not_found(other)),
            },
        };
        Ok(Outcome::Result(result))
    }

    /// Handles the initialize request.
    fn handle_initialize(
        &self,
        request: &JsonRpcRequest,
        session: &mut Session,
    ) -> Result<Value, McpError> {
        let supported = self.context.supported_protocol_versions();

        let version = match request.params.get("protocolVersion") {
            None | Some(Value::Null) => self
                .context
                .latest_protocol_version()
                .ok_or_else(|| McpError::Internal("No protocol versions configured".into()))?
                .to_string(),
            Some(Value::String(requested)) if supported.contains(requested) => requested.clone(),
            Some(Value::String(requested)) => {
                return Err(McpError::InvalidParams {
                    message: "Unsupported protocol version".into(),
                    data: Some(json!({ "supported": supported, "requested": requested })),
                });
            }
            Some(_) => {
                return Err(McpError::invalid_params(
                    "The protocolVersion field must be a string.",
                ))
            }
        };

        let client_capabilities = request
            .params
            .get("capabilities")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        session.begin_initialization(version.clone(), client_capabilities);
        tracing::info!(
            session_id = %session.id(),
            protocol_version = %version,
            "Initialising session"
        );

        let mut result = Map::new();
        result.insert("protocolVersion".into(), Value::String(version));
        result.insert("capabilities".into(), self.context.capabilities().to_json());
        result.insert("serverInfo".into(), json!(self.context.server_info()));
        if let Some(instructions) = self.context.instructions() {
            result.insert("instructions".into(), instructions.into());
        }
        Ok(Value::Object(result))
    }

    fn paginate(
        &self,
        request: &JsonRpcRequest,
        key: &str,
        items: Vec<Value>,
    ) -> Result<Value, McpError> {
        let per_page = match request.params.get("per_page") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        McpError::invalid_params("The per_page field must be a positive integer.")
                    })?,
            ),
        };
        let page: Page<Value> =
            self.context
                .paginator()
                .paginate(items, per_page, request.string_param("cursor"));
        page.into_result(key).map_err(internal)
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest, session: &Session) -> Result<Value, McpError> {
        let tools = self
            .context
            .tools(session)
            .into_iter()
            .map(|tool| tool.to_listing())
            .collect();
        self.paginate(request, "tools", tools)
    }

    fn handle_resources_list(
        &self,
        request: &JsonRpcRequest,
        session: &Session,
        templated: bool,
    ) -> Result<Value, McpError> {
        let (resources, key) = if templated {
            (self.context.resource_templates(session), "resourceTemplates")
        } else {
            (self.context.resources(session), "resources")
        };
        let listings = resources
            .into_iter()
            .map(|resource| resource.to_listing(templated))
            .collect();
        self.paginate(request, key, listings)
    }

    fn handle_prompts_list(&self, request: &JsonRpcRequest, session: &Session) -> Result<Value, McpError> {
        let prompts = self
            .context
            .prompts(session)
            .into_iter()
            .map(|prompt| prompt.to_listing())
            .collect();
        self.paginate(request, "prompts", prompts)
    }

    /// Handles the tools/call request.
    fn handle_tools_call(
        &self,
        request: &JsonRpcRequest,
        session: &Session,
    ) -> Result<Outcome, McpError> {
        let name = required_string(request, "name")?;
        let tool = self.context.find_tool(session, name)?;
        let primitive_request = primitive_request(request, session, "arguments");

        tracing::debug!(tool = %name, "Calling tool");

        let (output, streaming) = match tool.handle(&primitive_request) {
            Ok(output) => {
                let streaming = matches!(output, Output::Stream(_));
                (output, streaming)
            }
            Err(error) => {
                tracing::debug!(tool = %name, error = %error, "Tool argument validation failed");
                (Response::error(error.to_string()).into(), false)
            }
        };

        let reply = StreamingReply::new(
            request.id.clone(),
            output,
            session.log_level(),
            Box::new(tool_result),
        );
        Ok(Outcome::Messages(reply.into_reply(streaming)))
    }

    /// Handles the prompts/get request.
    fn handle_prompts_get(
        &self,
        request: &JsonRpcRequest,
        session: &Session,
    ) -> Result<Outcome, McpError> {
        let name = required_string(request, "name")?;
        let prompt = self.context.find_prompt(session, name)?;
        let primitive_request = primitive_request(request, session, "arguments");

        let output = prompt
            .handle(&primitive_request)
            .map_err(|error: ValidationError| McpError::invalid_params(error.to_string()))?;
        let streaming = matches!(output, Output::Stream(_));

        let description = prompt.description().to_string();
        let reply = StreamingReply::new(
            request.id.clone(),
            output,
            session.log_level(),
            Box::new(move |responses| prompt_result(description, responses)),
        );
        Ok(Outcome::Messages(reply.into_reply(streaming)))
    }

    /// Handles the resources/read request.
    fn handle_resources_read(
        &self,
        request: &JsonRpcRequest,
        session: &Session,
    ) -> Result<Value, McpError> {
        let uri = required_string(request, "uri")?;
        let (resource, variables) = self.context.find_resource(session, uri)?;

        let arguments: Map<String, Value> = variables
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        let primitive_request = Request::new(arguments)
            .with_meta(meta(request))
            .with_session_id(session.id())
            .with_uri(uri);

        tracing::debug!(uri = %uri, "Reading resource");

        let output = resource
            .handle(&primitive_request)
            .map_err(|error| McpError::invalid_params(error.to_string()))?;

        let mut contents = Vec::new();
        for response in output.into_responses() {
            if response.is_error() {
                return Err(McpError::Internal(error_text(&response)));
            }
            let entry = response
                .content()
                .to_resource(uri, resource.mime_type())
                .map_err(internal)?;
            contents.push(entry);
        }
        Ok(json!({ "contents": contents }))
    }

    /// Handles the completion/complete request.
    fn handle_completion(&self, request: &JsonRpcRequest, session: &Session) -> Result<Value, McpError> {
        if !self.context.capabilities().completions {
            return Err(McpError::method_not_found(&request.method));
        }

        let reference = request
            .params
            .get("ref")
            .and_then(Value::as_object)
            .ok_or_else(|| McpError::invalid_params("The ref field is required."))?;
        let argument = request
            .params
            .get("argument")
            .and_then(Value::as_object)
            .ok_or_else(|| McpError::invalid_params("The argument field is required."))?;
        let argument_name = argument
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| McpError::invalid_params("The argument.name field is required."))?;
        let partial = argument.get("value").and_then(Value::as_str).unwrap_or_default();

        let field = |key: &str| {
            reference
                .get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| McpError::invalid_params(format!("The ref.{key} field is required.")))
        };

        let completion = match reference.get("type").and_then(Value::as_str) {
            Some("ref/prompt") => self
                .context
                .find_prompt(session, field("name")?)?
                .complete(argument_name),
            Some("ref/resource") => self
                .context
                .find_resource_ref(session, field("uri")?)?
                .complete(argument_name),
            _ => {
                return Err(McpError::invalid_params(
                    "The ref.type field must be ref/prompt or ref/resource.",
                ))
            }
        };

        let response = completion.map_or_else(CompletionResponse::empty, |c| c.resolve(partial));
        Ok(json!({ "completion": response }))
    }

    /// Handles the logging/setLevel request.
    fn handle_set_level(
        &self,
        request: &JsonRpcRequest,
        session: &mut Session,
    ) -> Result<Value, McpError> {
        if !self.context.capabilities().logging {
            return Err(McpError::method_not_found(&request.method));
        }

        let level = required_string(request, "level")?;
        let level: LogLevel = level
            .parse()
            .map_err(|_| McpError::invalid_params(format!("Invalid log level [{level}].")))?;

        session.set_log_level(level);
        tracing::debug!(session_id = %session.id(), level = %level, "Log level changed");
        Ok(json!({}))
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("context", &self.context)
            .field("sessions", &self.sessions)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn internal(error: impl std::fmt::Display) -> McpError {
    tracing::error!(error = %error, "Internal error while building result");
    McpError::Internal(error.to_string())
}

fn required_string<'a>(request: &'a JsonRpcRequest, key: &str) -> Result<&'a str, McpError> {
    request
        .string_param(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| McpError::invalid_params(format!("The {key} field is required.")))
}

fn meta(request: &JsonRpcRequest) -> Map<String, Value> {
    request
        .params
        .get("_meta")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn primitive_request(request: &JsonRpcRequest, session: &Session, key: &str) -> Request {
    let arguments = request
        .params
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    Request::new(arguments)
        .with_meta(meta(request))
        .with_session_id(session.id())
}

fn error_text(response: &Response) -> String {
    response
        .content()
        .as_text()
        .unwrap_or("Internal error")
        .to_string()
}

/// Builds a `tools/call` result.
fn tool_result(responses: Vec<Response>) -> Result<Value, McpError> {
    let mut content = Vec::with_capacity(responses.len());
    let mut structured = None;
    let mut is_error = false;

    for response in &responses {
        is_error |= response.is_error();
        if let ContentKind::Structured { value } = response.content().kind() {
            structured = Some(value.clone());
        }
        content.push(response.content().to_tool().map_err(internal)?);
    }

    let mut result = Map::new();
    result.insert("content".into(), Value::Array(content));
    result.insert("isError".into(), Value::Bool(is_error));
    if let Some(structured) = structured {
        result.insert("structuredContent".into(), structured);
    }
    Ok(Value::Object(result))
}

/// Builds a `prompts/get` result.
fn prompt_result(description: String, responses: Vec<Response>) -> Result<Value, McpError> {
    let mut messages = Vec::with_capacity(responses.len());

    for response in &responses {
        if response.is_error() {
            return Err(McpError::Internal(error_text(response)));
        }
        let content = response.content().to_prompt().map_err(internal)?;
        messages.push(json!({ "role": response.role(), "content": content }));
    }

    Ok(json!({ "description": description, "messages": messages }))
}

/// Assembles an [`McpServer`].
pub struct ServerBuilder {
    context: ServerContext,
    methods: HashMap<String, Box<dyn Method>>,
    store: Option<Arc<dyn SessionStore>>,
    default_log_level: LogLevel,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    /// A builder with default settings and no primitives.
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: ServerContext::new(
                ServerInfo::default(),
                DEFAULT_PROTOCOL_VERSIONS.iter().map(|v| (*v).to_string()).collect(),
                Capabilities::default(),
                Paginator::new(15, 50),
            ),
            methods: HashMap::new(),
            store: None,
            default_log_level: LogLevel::default(),
        }
    }

    /// A builder configured from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .server_info(&config.server.name, &config.server.version)
            .instructions(config.server.instructions.clone())
            .protocol_versions(config.server.supported_protocol_versions.clone())
            .capabilities(Capabilities {
                logging: config.capabilities.logging,
                completions: config.capabilities.completions,
            })
            .pagination(
                config.pagination.default_per_page,
                config.pagination.max_per_page,
            )
            .default_log_level(config.logging.default_client_level)
    }

    /// Sets the name and version reported in `serverInfo`.
    #[must_use]
    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.context.set_server_info(ServerInfo {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    /// Sets the `instructions` sent in the `initialize` result.
    #[must_use]
    pub fn instructions(mut self, instructions: Option<String>) -> Self {
        self.context.set_instructions(instructions);
        self
    }

    /// Sets the supported protocol versions, newest first.
    #[must_use]
    pub fn protocol_versions(mut self, versions: Vec<String>) -> Self {
        self.context.set_supported_protocol_versions(versions);
        self
    }

    /// Sets the optional capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.context.set_capabilities(capabilities);
        self
    }

    /// Sets the default and maximum page sizes.
    #[must_use]
    pub fn pagination(mut self, default_per_page: usize, max_per_page: usize) -> Self {
        self.context
            .set_paginator(Paginator::new(default_per_page, max_per_page));
        self
    }

    /// Sets the log level given to new sessions.
    #[must_use]
    pub const fn default_log_level(mut self, level: LogLevel) -> Self {
        self.default_log_level = level;
        self
    }

    /// Registers a tool.
    #[must_use]
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.context.add_tool(Arc::new(tool));
        self
    }

    /// Registers a resource or resource template.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource URI is not a valid URI template.
    pub fn resource(
        mut self,
        resource: impl Resource + 'static,
    ) -> Result<Self, InvalidArgument> {
        self.context.add_resource(Arc::new(resource))?;
        Ok(self)
    }

    /// Registers a prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Prompt + 'static) -> Self {
        self.context.add_prompt(Arc::new(prompt));
        self
    }

    /// Registers a custom method.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is empty or a reserved MCP method.
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Method + 'static,
    ) -> Result<Self, InvalidArgument> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidArgument::new("method name may not be empty"));
        }
        if methods::RESERVED.contains(&name.as_str()) {
            return Err(InvalidArgument::new(format!(
                "method name '{name}' is reserved"
            )));
        }
        self.methods.insert(name, Box::new(method));
        Ok(self)
    }

    /// Sets the authorization gate.
    #[must_use]
    pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.context.set_authorizer(Arc::new(authorizer));
        self
    }

    /// Sets the session store; an in-memory store is used otherwise.
    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> McpServer {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
        McpServer {
            context: self.context,
            sessions: Sessions::new(store, self.default_log_level),
            methods: self.methods,
        }
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("context", &self.context)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("default_log_level", &self.default_log_level)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown;

    impl Tool for Countdown {
        fn name(&self) -> &str {
            "countdown"
        }

        fn description(&self) -> &str {
            "Counts down"
        }

        fn handle(&self, _request: &Request) -> Result<Output, ValidationError> {
            Ok(Output::stream(vec![
                Response::log(LogLevel::Debug, "hidden"),
                Response::notification(methods::PROGRESS, Map::new()),
                Response::text("done"),
            ]))
        }
    }

    fn server() -> McpServer {
        McpServer::builder().tool(Countdown).build()
    }

    fn messages(reply: Reply) -> Vec<Value> {
        reply
            .into_messages()
            .map(|m| serde_json::to_value(&m).unwrap())
            .collect()
    }

    #[test]
    fn notification_produces_no_reply() {
        let reply = server().handle_raw("s", r#"{"jsonrpc":"2.0","method":"ping"}"#);
        assert!(matches!(reply, Reply::None));

        let reply = server().handle_raw("s", r#"{"jsonrpc":"2.0","method":"ping","params":[1]}"#);
        assert!(matches!(reply, Reply::None));
    }

    #[test]
    fn malformed_json_yields_parse_error() {
        let out = messages(server().handle_raw("s", "{not json"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["error"]["code"], -32700);
        assert_eq!(out[0]["id"], Value::Null);
    }

    #[test]
    fn ping_returns_empty_object() {
        let out = messages(server().handle_raw("s", r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#));
        assert_eq!(out[0]["result"], json!({}));
    }

    #[test]
    fn unknown_method_names_method() {
        let out = messages(server().handle_raw("s", r#"{"jsonrpc":"2.0","id":1,"method":"nope/x"}"#));
        assert_eq!(out[0]["error"]["code"], -32601);
        assert!(out[0]["error"]["message"].as_str().unwrap().contains("nope/x"));
    }

    #[test]
    fn streaming_filters_logs_below_session_level() {
        let raw = r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"countdown"}}"#;
        let out = messages(server().handle_raw("s", raw));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["method"], "notifications/progress");
        assert!(out[0].get("id").is_none());
        assert_eq!(out[1]["result"]["content"][0]["text"], "done");
    }

    #[test]
    fn session_state_survives_between_requests() {
        let server = server();
        let init = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{}}}"#;
        let _ = messages(server.handle_raw("s", init));
        let _ = server.handle_raw("s", r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(server.sessions().load("s").is_initialized());
        assert!(!server.sessions().load("other").is_initialized());
    }

    #[test]
    fn builder_from_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "server": {"name": "configured", "supported_protocol_versions": ["2025-03-26"]},
                "capabilities": {"completions": false},
                "logging": {"default_client_level": "error"}
            }"#,
        )
        .unwrap();
        let server = ServerBuilder::from_config(&config).build();

        assert_eq!(server.context().server_info().name, "configured");
        assert_eq!(server.context().latest_protocol_version(), Some("2025-03-26"));
        assert!(!server.context().capabilities().completions);
        assert_eq!(server.sessions().load("s").log_level(), LogLevel::Error);
    }

    #[test]
    fn reserved_method_names_are_rejected() {
        let handler = |_: &JsonRpcRequest,
                       _: &ServerContext,
                       _: &mut Session|
         -> Result<Value, McpError> { Ok(json!({})) };
        assert!(McpServer::builder().method("tools/call", handler).is_err());
        assert!(McpServer::builder().method("", handler).is_err());
        assert!(McpServer::builder().method("custom/echo", handler).is_ok());
    }

    #[test]
    fn custom_method_is_dispatched() {
        let server = McpServer::builder()
            .method(
                "custom/echo",
                |request: &JsonRpcRequest,
                 _: &ServerContext,
                 _: &mut Session|
                 -> Result<Value, McpError> { Ok(Value::Object(request.params.clone())) },
            )
            .unwrap()
            .build();
        let out = messages(server.handle_raw(
            "s",
            r#"{"jsonrpc":"2.0","id":"a","method":"custom/echo","params":{"x":1}}"#,
        ));
        assert_eq!(out[0]["id"], "a");
        assert_eq!(out[0]["result"], json!({"x": 1}));
    }
}
