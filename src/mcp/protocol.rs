//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the core message types used in the Model Context Protocol.
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way message (no `id`, no response expected)
//!
//! # Validation Order
//!
//! [`parse_message`] checks, in order: well-formed JSON (`-32700`), a
//! `jsonrpc` member equal to `"2.0"`, a non-empty string `method`, an `id`
//! that is a string or integer, and an object `params` (`-32600` for each).
//! A missing or `null` `id` marks the message a notification. Once the
//! `jsonrpc` member checks out, a notification that fails a later check is
//! reported as [`MessageError::Discard`] and never answered.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::McpError;

/// Reserved method and notification names.
pub mod methods {
    /// Capability negotiation.
    pub const INITIALIZE: &str = "initialize";
    /// Client acknowledgement of initialisation.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Liveness check.
    pub const PING: &str = "ping";
    /// Tool listing.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Tool invocation.
    pub const TOOLS_CALL: &str = "tools/call";
    /// Static resource listing.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Resource template listing.
    pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";
    /// Resource read.
    pub const RESOURCES_READ: &str = "resources/read";
    /// Prompt listing.
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Prompt retrieval.
    pub const PROMPTS_GET: &str = "prompts/get";
    /// Argument completion.
    pub const COMPLETION_COMPLETE: &str = "completion/complete";
    /// Session log level.
    pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
    /// Server-to-client log message.
    pub const LOG_MESSAGE: &str = "notifications/message";
    /// Server-to-client progress update.
    pub const PROGRESS: &str = "notifications/progress";

    /// All names that custom methods may not claim.
    pub const RESERVED: [&str; 12] = [
        INITIALIZE,
        INITIALIZED,
        PING,
        TOOLS_LIST,
        TOOLS_CALL,
        RESOURCES_LIST,
        RESOURCES_TEMPLATES_LIST,
        RESOURCES_READ,
        PROMPTS_LIST,
        PROMPTS_GET,
        COMPLETION_COMPLETE,
        LOGGING_SET_LEVEL,
    ];
}

/// A JSON-RPC 2.0 request ID.
///
/// Per the MCP specification, IDs must be strings or integers, never floats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl RequestId {
    /// Extracts a request ID from a raw JSON value.
    ///
    /// Returns `None` for floats, booleans, objects and arrays.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Number),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect a response from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Parameters for the method (empty when omitted).
    pub params: Map<String, Value>,

    /// Session the request arrived on, filled in by the dispatcher.
    pub session_id: Option<String>,
}

impl JsonRpcRequest {
    /// Creates a request with the given parameters.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params: into_params(params),
            session_id: None,
        }
    }

    /// Returns a string parameter, if present.
    #[must_use]
    pub fn string_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcNotification {
    /// The notification method.
    pub method: String,

    /// Parameters for the notification (empty when omitted).
    pub params: Map<String, Value>,
}

/// An outgoing JSON-RPC 2.0 notification (server to client).
///
/// Used for sending progress updates and other notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Parameters for the notification, omitted when empty.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }

    /// Creates a progress notification.
    #[must_use]
    pub fn progress(
        progress_token: &Value,
        progress: u32,
        total: Option<u32>,
        message: Option<&str>,
    ) -> Self {
        let mut params = Map::new();
        params.insert("progressToken".to_string(), progress_token.clone());
        params.insert("progress".to_string(), progress.into());
        if let Some(total) = total {
            params.insert("total".to_string(), total.into());
        }
        if let Some(message) = message {
            params.insert("message".to_string(), message.into());
        }
        Self::new(methods::PROGRESS, params)
    }
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }

    /// Creates a success response with an empty object result.
    #[must_use]
    pub fn empty(id: RequestId) -> Self {
        Self::success(id, Value::Object(Map::new()))
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Server-defined error.
    ServerError(i32),
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(code) => code,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ServerError(_) => "Server error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<McpError> for JsonRpcErrorData {
    fn from(error: McpError) -> Self {
        let code = error.error_code();
        let data = error.data().cloned();
        let message = error.to_string();
        let mut out = Self::with_message(code, message);
        out.data = data;
        out
    }
}

/// A JSON-RPC 2.0 error response.
///
/// When the request ID could not be determined, `id` serialises as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to (if known).
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }

    /// Creates an error response from a protocol error.
    #[must_use]
    pub fn from_mcp(id: Option<RequestId>, error: McpError) -> Self {
        Self::new(id, error.into())
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, message),
        )
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::from_mcp(Some(id), McpError::method_not_found(method))
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, message),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::InternalError, message),
        )
    }
}

/// Any message the server writes to a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    /// A successful response.
    Response(JsonRpcResponse),
    /// An error response.
    Error(JsonRpcError),
    /// A server-initiated notification.
    Notification(OutgoingNotification),
}

impl JsonRpcMessage {
    /// Returns `true` for responses and errors, the messages that end an exchange.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Notification(_))
    }

    /// Returns the request ID this message answers, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Response(resp) => Some(&resp.id),
            Self::Error(err) => err.id.as_ref(),
            Self::Notification(_) => None,
        }
    }

    /// Serialises the message to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for JsonRpcMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Response(resp) => resp.serialize(serializer),
            Self::Error(err) => err.serialize(serializer),
            Self::Notification(notif) => notif.serialize(serializer),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(value: JsonRpcResponse) -> Self {
        Self::Response(value)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(value: JsonRpcError) -> Self {
        Self::Error(value)
    }
}

impl From<OutgoingNotification> for JsonRpcMessage {
    fn from(value: OutgoingNotification) -> Self {
        Self::Notification(value)
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the parameters of this message.
    #[must_use]
    pub const fn params(&self) -> &Map<String, Value> {
        match self {
            Self::Request(req) => &req.params,
            Self::Notification(notif) => &notif.params,
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Why an inbound message was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageError {
    /// The sender expects this error response.
    Reply(JsonRpcError),
    /// An invalid notification. It is logged and dropped, since a message
    /// without an `id` is never answered.
    Discard(JsonRpcError),
}

impl MessageError {
    /// Returns the underlying error response.
    #[must_use]
    pub fn into_error(self) -> JsonRpcError {
        match self {
            Self::Reply(error) | Self::Discard(error) => error,
        }
    }

    /// Returns the error response to send, if any.
    #[must_use]
    pub fn into_reply(self) -> Option<JsonRpcError> {
        match self {
            Self::Reply(error) => Some(error),
            Self::Discard(_) => None,
        }
    }
}

impl From<JsonRpcError> for MessageError {
    fn from(error: JsonRpcError) -> Self {
        Self::Reply(error)
    }
}

/// Parses a JSON string into an incoming message.
///
/// # Errors
///
/// Returns a [`MessageError`] if the JSON is malformed or not a valid
/// message. The error carries the request ID whenever one could be read.
pub fn parse_message(json: &str) -> Result<IncomingMessage, MessageError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;

    let Value::Object(mut obj) = value else {
        return Err(JsonRpcError::invalid_request(
            None,
            "Request must be a JSON object",
        )
        .into());
    };

    // A null id is treated the same as an absent one.
    let raw_id = obj.remove("id").filter(|v| !v.is_null());
    let id = raw_id.as_ref().and_then(RequestId::from_value);

    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(JsonRpcError::invalid_request(
            id,
            "jsonrpc field must be \"2.0\"",
        )
        .into());
    }

    let reject = |error: JsonRpcError| {
        if raw_id.is_none() {
            MessageError::Discard(error)
        } else {
            MessageError::Reply(error)
        }
    };

    let method = match obj.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => {
            return Err(reject(JsonRpcError::invalid_request(
                id,
                "method field must be a non-empty string",
            )))
        }
    };

    if raw_id.is_some() && id.is_none() {
        return Err(reject(JsonRpcError::invalid_request(
            None,
            "id field must be a string or integer",
        )));
    }

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params,
        Some(_) => {
            return Err(reject(JsonRpcError::invalid_request(
                id,
                "params field must be an object",
            )))
        }
    };

    Ok(match id {
        Some(id) => IncomingMessage::Request(JsonRpcRequest {
            id,
            method,
            params,
            session_id: None,
        }),
        None => IncomingMessage::Notification(JsonRpcNotification { method, params }),
    })
}

/// Converts an arbitrary JSON value into a params map.
///
/// Non-object values yield an empty map.
#[must_use]
pub fn into_params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "initialize");
        assert!(req.params.is_empty());
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn parse_null_id_is_notification() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "ping"}"#;
        assert!(matches!(
            parse_message(json).unwrap(),
            IncomingMessage::Notification(_)
        ));
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn parse_invalid_json() {
        let json = "not valid json";
        let err = parse_message(json).unwrap_err().into_error();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert!(err.id.is_none());
    }

    #[test]
    fn parse_missing_jsonrpc() {
        let json = r#"{"id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err().into_error();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err().into_error();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn parse_empty_method() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": ""}"#;
        let err = parse_message(json).unwrap_err().into_error();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn parse_float_id_rejected() {
        let json = r#"{"jsonrpc": "2.0", "id": 1.5, "method": "ping"}"#;
        let err = parse_message(json).unwrap_err().into_error();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert!(err.id.is_none());
    }

    #[test]
    fn parse_non_object_params_rejected() {
        let json = r#"{"jsonrpc": "2.0", "id": 7, "method": "ping", "params": [1, 2]}"#;
        let err = parse_message(json).unwrap_err().into_error();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::Number(7)));
    }

    #[test]
    fn invalid_notifications_are_discarded() {
        for json in [
            r#"{"jsonrpc": "2.0", "method": ""}"#,
            r#"{"jsonrpc": "2.0", "method": "ping", "params": [1]}"#,
            r#"{"jsonrpc": "2.0", "id": null, "method": 5}"#,
        ] {
            let err = parse_message(json).unwrap_err();
            assert!(matches!(err, MessageError::Discard(_)), "{json}");
            assert!(err.into_reply().is_none());
        }
    }

    #[test]
    fn wrong_version_without_id_is_still_answered() {
        let json = r#"{"jsonrpc": "1.0", "method": "ping"}"#;
        let err = parse_message(json).unwrap_err();
        assert!(matches!(err, MessageError::Reply(_)));
    }

    #[test]
    fn parse_batch_rejected() {
        let json = r#"[{"jsonrpc": "2.0", "id": 1, "method": "ping"}]"#;
        let err = parse_message(json).unwrap_err().into_error();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn serialise_empty_result_as_object() {
        let json = serde_json::to_string(&JsonRpcResponse::empty(RequestId::Number(3))).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":3,"result":{}}"#);
    }

    #[test]
    fn serialise_error_response() {
        let error = JsonRpcError::method_not_found(RequestId::Number(1), "unknown/method");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
    }

    #[test]
    fn serialise_parse_error_with_null_id() {
        let json = serde_json::to_string(&JsonRpcError::parse_error()).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#
        );
    }

    #[test]
    fn notification_omits_empty_params() {
        let notif = OutgoingNotification::new("notifications/tools/list_changed", Map::new());
        let json = JsonRpcMessage::from(notif).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}"#
        );
    }

    #[test]
    fn progress_notification_shape() {
        let notif = OutgoingNotification::progress(&json!("tok"), 2, Some(5), None);
        let value = serde_json::to_value(&notif).unwrap();
        assert_eq!(value["params"]["progressToken"], "tok");
        assert_eq!(value["params"]["progress"], 2);
        assert_eq!(value["params"]["total"], 5);
        assert!(value["params"].get("message").is_none());
    }

    #[test]
    fn mcp_error_carries_data() {
        let error = JsonRpcError::from_mcp(
            Some(RequestId::Number(9)),
            McpError::InvalidParams {
                message: "Unsupported protocol version".into(),
                data: Some(json!({"requested": "x"})),
            },
        );
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["error"]["code"], -32602);
        assert_eq!(value["error"]["data"]["requested"], "x");
    }

    #[test]
    fn terminal_messages() {
        let result: JsonRpcMessage = JsonRpcResponse::empty(RequestId::Number(1)).into();
        let notif: JsonRpcMessage = OutgoingNotification::new("x", Map::new()).into();
        assert!(result.is_terminal());
        assert!(!notif.is_terminal());
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
