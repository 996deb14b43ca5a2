//! Tools, resources and prompts.
//!
//! Primitives are plain trait objects registered on the server builder.
//! Each exposes its listing metadata and a `handle` entry point that binds
//! the request arguments and produces [`Response`] items, either all at
//! once or as a lazy stream.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::mcp::completion::Completion;
use crate::mcp::content::Response;
use crate::mcp::session::Session;

/// Argument binding failed.
///
/// The dispatcher turns this into an `isError` tool result or a `-32602`
/// prompt error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .messages.join(" "))]
pub struct ValidationError {
    /// Individual failure messages, in the order found.
    pub messages: Vec<String>,
}

impl ValidationError {
    /// A single-message validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    /// Combines several messages.
    #[must_use]
    pub const fn many(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

/// The arguments and context handed to a primitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    arguments: Map<String, Value>,
    meta: Map<String, Value>,
    session_id: Option<String>,
    uri: Option<String>,
}

impl Request {
    /// Creates a request from an argument map.
    #[must_use]
    pub fn new(arguments: Map<String, Value>) -> Self {
        Self {
            arguments,
            ..Self::default()
        }
    }

    /// Attaches the request-level `_meta` object.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    /// Attaches the session id.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attaches the resource URI being read.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Returns every argument.
    #[must_use]
    pub const fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Returns one argument.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Returns a string argument, if present and a string.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Returns a required, non-empty string argument.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the argument is missing, null, empty
    /// or not a string.
    pub fn require_string(&self, key: &str) -> Result<&str, ValidationError> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Err(Self::required(key)),
            Some(Value::String(s)) if s.is_empty() => Err(Self::required(key)),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ValidationError::new(format!(
                "The {key} field must be a string."
            ))),
        }
    }

    fn required(key: &str) -> ValidationError {
        ValidationError::new(format!("The {key} field is required."))
    }

    /// Returns the request `_meta` object.
    #[must_use]
    pub const fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Returns `_meta.progressToken`, if the client sent one.
    #[must_use]
    pub fn progress_token(&self) -> Option<&Value> {
        self.meta.get("progressToken")
    }

    /// Returns the session id.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the resource URI being read.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

/// The output of a primitive handler.
pub enum Output {
    /// Every response, available at once.
    Responses(Vec<Response>),
    /// Responses produced lazily, in order.
    ///
    /// Notification responses are forwarded as they are produced; the rest
    /// make up the final result.
    Stream(Box<dyn Iterator<Item = Response> + Send>),
}

impl Output {
    /// Wraps a lazy iterator.
    #[must_use]
    pub fn stream<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Response>,
        I::IntoIter: Send + 'static,
    {
        Self::Stream(Box::new(responses.into_iter()))
    }

    /// Turns the output into an iterator over its responses.
    #[must_use]
    pub fn into_responses(self) -> Box<dyn Iterator<Item = Response> + Send> {
        match self {
            Self::Responses(responses) => Box::new(responses.into_iter()),
            Self::Stream(stream) => stream,
        }
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Responses(responses) => f.debug_tuple("Responses").field(responses).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Response> for Output {
    fn from(response: Response) -> Self {
        Self::Responses(vec![response])
    }
}

impl From<Vec<Response>> for Output {
    fn from(responses: Vec<Response>) -> Self {
        Self::Responses(responses)
    }
}

/// Behaviour hints published with a tool.
///
/// Unset hints are omitted from the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destructive_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    idempotent_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    /// No hints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the human-readable title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The tool does not modify its environment.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only_hint = Some(value);
        self
    }

    /// The tool may perform destructive updates.
    #[must_use]
    pub const fn destructive(mut self, value: bool) -> Self {
        self.destructive_hint = Some(value);
        self
    }

    /// Repeated calls with the same arguments have no additional effect.
    #[must_use]
    pub const fn idempotent(mut self, value: bool) -> Self {
        self.idempotent_hint = Some(value);
        self
    }

    /// The tool interacts with external entities.
    #[must_use]
    pub const fn open_world(mut self, value: bool) -> Self {
        self.open_world_hint = Some(value);
        self
    }

    /// Returns `true` if no hint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Converts the hints to the plain map published in listings.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A tool the client may call.
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Optional display title.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments.
    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    /// JSON Schema of the structured output, if the tool produces one.
    fn output_schema(&self) -> Option<Value> {
        None
    }

    /// Behaviour hints.
    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::default()
    }

    /// Extra `_meta` published in the listing.
    fn meta(&self) -> Option<Map<String, Value>> {
        None
    }

    /// Whether the tool is offered to `session` at all.
    fn should_register(&self, _session: &Session) -> bool {
        true
    }

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the arguments cannot be bound.
    fn handle(&self, request: &Request) -> Result<Output, ValidationError>;

    /// Builds the `tools/list` entry.
    fn to_listing(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("name".into(), self.name().into());
        if let Some(title) = self.title() {
            entry.insert("title".into(), title.into());
        }
        entry.insert("description".into(), self.description().into());
        entry.insert("inputSchema".into(), self.input_schema());
        if let Some(schema) = self.output_schema() {
            entry.insert("outputSchema".into(), schema);
        }
        let annotations = self.annotations();
        if !annotations.is_empty() {
            entry.insert("annotations".into(), Value::Object(annotations.to_map()));
        }
        if let Some(meta) = self.meta() {
            entry.insert("_meta".into(), Value::Object(meta));
        }
        Value::Object(entry)
    }
}

/// One declared prompt argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    pub required: bool,
}

impl PromptArgument {
    /// A required argument.
    #[must_use]
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: true,
        }
    }

    /// An optional argument.
    #[must_use]
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
        }
    }
}

/// A prompt template the client may retrieve.
pub trait Prompt: Send + Sync {
    /// Unique prompt name.
    fn name(&self) -> &str;

    /// Optional display title.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Declared arguments.
    fn arguments(&self) -> Vec<PromptArgument> {
        Vec::new()
    }

    /// Completion strategy for `argument`, if any.
    fn complete(&self, _argument: &str) -> Option<Completion> {
        None
    }

    /// Extra `_meta` published in the listing.
    fn meta(&self) -> Option<Map<String, Value>> {
        None
    }

    /// Whether the prompt is offered to `session` at all.
    fn should_register(&self, _session: &Session) -> bool {
        true
    }

    /// Renders the prompt messages.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the arguments cannot be bound.
    fn handle(&self, request: &Request) -> Result<Output, ValidationError>;

    /// Builds the `prompts/list` entry.
    fn to_listing(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("name".into(), self.name().into());
        if let Some(title) = self.title() {
            entry.insert("title".into(), title.into());
        }
        entry.insert("description".into(), self.description().into());
        entry.insert(
            "arguments".into(),
            serde_json::to_value(self.arguments()).unwrap_or_else(|_| json!([])),
        );
        if let Some(meta) = self.meta() {
            entry.insert("_meta".into(), Value::Object(meta));
        }
        Value::Object(entry)
    }
}

/// A static or templated resource the client may read.
///
/// The resource is a template when its URI contains at least one
/// `{variable}`.
pub trait Resource: Send + Sync {
    /// Resource name.
    fn name(&self) -> &str;

    /// Optional display title.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Human-readable description.
    fn description(&self) -> &str;

    /// The URI, or an RFC 6570 URI template.
    fn uri(&self) -> &str;

    /// MIME type of the contents.
    fn mime_type(&self) -> &str {
        "text/plain"
    }

    /// Completion strategy for a template variable, if any.
    fn complete(&self, _argument: &str) -> Option<Completion> {
        None
    }

    /// Extra `_meta` published in the listing.
    fn meta(&self) -> Option<Map<String, Value>> {
        None
    }

    /// Whether the resource is offered to `session` at all.
    fn should_register(&self, _session: &Session) -> bool {
        true
    }

    /// Produces the contents.
    ///
    /// Template variables extracted from the URI are available as request
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the arguments cannot be bound.
    fn handle(&self, request: &Request) -> Result<Output, ValidationError>;

    /// Builds the `resources/list` or `resources/templates/list` entry.
    fn to_listing(&self, templated: bool) -> Value {
        let mut entry = Map::new();
        entry.insert("name".into(), self.name().into());
        if let Some(title) = self.title() {
            entry.insert("title".into(), title.into());
        }
        entry.insert("description".into(), self.description().into());
        let key = if templated { "uriTemplate" } else { "uri" };
        entry.insert(key.into(), self.uri().into());
        entry.insert("mimeType".into(), self.mime_type().into());
        if let Some(meta) = self.meta() {
            entry.insert("_meta".into(), Value::Object(meta));
        }
        Value::Object(entry)
    }
}

/// A borrowed primitive, as presented to the authorization gate.
#[derive(Clone, Copy)]
pub enum PrimitiveRef<'a> {
    /// A tool.
    Tool(&'a dyn Tool),
    /// A resource or resource template.
    Resource(&'a dyn Resource),
    /// A prompt.
    Prompt(&'a dyn Prompt),
}

impl PrimitiveRef<'_> {
    /// Returns the primitive kind as a lowercase word.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Tool(_) => "tool",
            Self::Resource(_) => "resource",
            Self::Prompt(_) => "prompt",
        }
    }

    /// Returns the primitive name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Tool(tool) => tool.name(),
            Self::Resource(resource) => resource.name(),
            Self::Prompt(prompt) => prompt.name(),
        }
    }
}

impl std::fmt::Debug for PrimitiveRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveRef")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn annotations(&self) -> ToolAnnotations {
            ToolAnnotations::new().read_only(true)
        }

        fn handle(&self, request: &Request) -> Result<Output, ValidationError> {
            let text = request.require_string("text")?;
            Ok(Response::text(text).into())
        }
    }

    fn args(value: Value) -> Request {
        Request::new(crate::mcp::protocol::into_params(value))
    }

    #[test]
    fn require_string_messages() {
        assert_eq!(
            args(json!({})).require_string("name").unwrap_err().to_string(),
            "The name field is required."
        );
        assert_eq!(
            args(json!({"name": ""})).require_string("name").unwrap_err().to_string(),
            "The name field is required."
        );
        assert_eq!(
            args(json!({"name": 5})).require_string("name").unwrap_err().to_string(),
            "The name field must be a string."
        );
        assert_eq!(
            args(json!({"name": "Ada"})).require_string("name").unwrap(),
            "Ada"
        );
    }

    #[test]
    fn validation_messages_join_with_space() {
        let error = ValidationError::many(vec!["First.".into(), "Second.".into()]);
        assert_eq!(error.to_string(), "First. Second.");
    }

    #[test]
    fn progress_token_comes_from_meta() {
        let mut meta = Map::new();
        meta.insert("progressToken".into(), json!("abc"));
        let request = Request::default().with_meta(meta);
        assert_eq!(request.progress_token(), Some(&json!("abc")));
    }

    #[test]
    fn tool_listing_shape() {
        let listing = Echo.to_listing();
        assert_eq!(listing["name"], "echo");
        assert_eq!(listing["inputSchema"]["type"], "object");
        assert_eq!(listing["annotations"], json!({"readOnlyHint": true}));
        assert!(listing.get("outputSchema").is_none());
    }

    #[test]
    fn output_stream_preserves_order() {
        let output = Output::stream(vec![Response::text("a"), Response::text("b")]);
        let texts: Vec<String> = output
            .into_responses()
            .filter_map(|r| r.content().as_text().map(str::to_string))
            .collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn handle_propagates_validation() {
        assert!(Echo.handle(&args(json!({}))).is_err());
        assert!(Echo.handle(&args(json!({"text": "hi"}))).is_ok());
    }
}
