//! Integration tests for MCP protocol handling.
//!
//! These tests drive the engine through [`McpServer::handle_raw`], the same
//! entry point both transports use, and check the JSON-RPC messages that
//! come back.

use serde_json::{json, Map, Value};

use mcp_engine::demo;
use mcp_engine::error::McpError;
use mcp_engine::mcp::content::Response;
use mcp_engine::mcp::context::ServerContext;
use mcp_engine::mcp::primitive::{Output, PrimitiveRef, Request, Resource, Tool, ValidationError};
use mcp_engine::mcp::protocol::{methods, parse_message, IncomingMessage, JsonRpcRequest, RequestId};
use mcp_engine::mcp::server::{McpServer, Reply, ServerBuilder};
use mcp_engine::mcp::session::{LogLevel, Session, SessionState};

// =============================================================================
// Helpers
// =============================================================================

const SESSION: &str = "test-session";

fn demo_server() -> McpServer {
    demo::register(McpServer::builder()).unwrap().build()
}

fn send(server: &McpServer, message: &Value) -> Vec<Value> {
    messages(server.handle_raw(SESSION, &message.to_string()))
}

fn messages(reply: Reply) -> Vec<Value> {
    reply
        .into_messages()
        .map(|m| serde_json::to_value(&m).unwrap())
        .collect()
}

fn request(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

/// Sends one request and returns its only message.
fn call(server: &McpServer, method: &str, params: Value) -> Value {
    let mut replies = send(server, &request(1, method, params));
    assert_eq!(replies.len(), 1, "expected exactly one message");
    replies.remove(0)
}

fn initialise(server: &McpServer) {
    let reply = call(
        server,
        "initialize",
        json!({"protocolVersion": "2025-03-26", "capabilities": {}}),
    );
    assert!(reply.get("result").is_some());
    let ack = send(
        server,
        &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    );
    assert!(ack.is_empty());
}

/// A tool streaming two progress notifications before its result.
struct Uploader;

impl Tool for Uploader {
    fn name(&self) -> &str {
        "upload"
    }

    fn description(&self) -> &str {
        "Uploads in two steps"
    }

    fn handle(&self, _request: &Request) -> Result<Output, ValidationError> {
        let progress = |n: u32| {
            let mut params = Map::new();
            params.insert("progressToken".into(), json!("up"));
            params.insert("progress".into(), n.into());
            Response::notification(methods::PROGRESS, params)
        };
        Ok(Output::stream(vec![
            progress(1),
            progress(2),
            Response::text("uploaded"),
        ]))
    }
}

/// A template resource echoing its extracted variable.
struct EchoUser;

impl Resource for EchoUser {
    fn name(&self) -> &str {
        "echo-user"
    }

    fn description(&self) -> &str {
        "Echoes the user id"
    }

    fn uri(&self) -> &str {
        "file://users/{userId}"
    }

    fn handle(&self, request: &Request) -> Result<Output, ValidationError> {
        let id = request.require_string("userId")?;
        Ok(Response::text(format!("user={id}")).into())
    }
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_null_id_is_notification() {
    let json = r#"{"jsonrpc": "2.0", "id": null, "method": "notifications/initialized"}"#;
    assert!(matches!(
        parse_message(json),
        Ok(IncomingMessage::Notification(_))
    ));
}

#[test]
fn test_parse_rejects_wrong_version() {
    let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "ping"}"#;
    let err = parse_message(json).unwrap_err().into_error();
    assert_eq!(err.error.code, -32600);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_notifications_never_get_a_reply() {
    let server = demo_server();
    for method in ["notifications/initialized", "notifications/cancelled", "tools/list"] {
        let replies = send(&server, &json!({"jsonrpc": "2.0", "method": method}));
        assert!(replies.is_empty(), "{method} produced a reply");
    }
}

#[test]
fn test_malformed_notifications_are_dropped() {
    let server = demo_server();
    for message in [
        json!({"jsonrpc": "2.0", "method": ""}),
        json!({"jsonrpc": "2.0", "method": "ping", "params": [1]}),
        json!({"jsonrpc": "2.0", "id": null, "method": 42}),
    ] {
        assert!(send(&server, &message).is_empty(), "{message} produced a reply");
    }

    // Without a valid jsonrpc member the sender cannot be classified.
    let replies = send(&server, &json!({"jsonrpc": "1.0", "method": "ping"}));
    assert_eq!(replies[0]["error"]["code"], -32600);
}

#[test]
fn test_session_lifecycle() {
    let server = demo_server();
    assert_eq!(
        server.sessions().load(SESSION).state(),
        SessionState::Uninitialized
    );

    call(&server, "initialize", json!({"protocolVersion": "2025-03-26"}));
    assert_eq!(
        server.sessions().load(SESSION).state(),
        SessionState::Initializing
    );

    send(
        &server,
        &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    );
    let session = server.sessions().load(SESSION);
    assert_eq!(session.state(), SessionState::Initialized);
    assert_eq!(session.protocol_version(), Some("2025-03-26"));
}

#[test]
fn test_initialize_reports_capabilities_and_instructions() {
    let server = demo::register(McpServer::builder().instructions(Some("Be nice.".into())))
        .unwrap()
        .build();
    let reply = call(&server, "initialize", json!({}));
    let result = &reply["result"];

    assert_eq!(result["protocolVersion"], "2025-06-18");
    assert_eq!(result["instructions"], "Be nice.");
    assert_eq!(result["serverInfo"]["name"], "mcp-engine");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    assert!(result["capabilities"].get("logging").is_some());
    assert!(result["capabilities"].get("completions").is_some());
}

#[test]
fn test_initialize_rejects_unsupported_version() {
    let server = McpServer::builder()
        .protocol_versions(vec!["2025-03-26".into()])
        .build();
    let reply = call(&server, "initialize", json!({"protocolVersion": "2024-11-05"}));

    assert_eq!(
        reply["error"],
        json!({
            "code": -32602,
            "message": "Unsupported protocol version",
            "data": {"supported": ["2025-03-26"], "requested": "2024-11-05"}
        })
    );
}

#[test]
fn test_unknown_method() {
    let server = demo_server();
    let reply = call(&server, "does/not/exist", json!({}));
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["id"], 1);
}

#[test]
fn test_malformed_json_gets_parse_error() {
    let server = demo_server();
    let replies = messages(server.handle_raw(SESSION, "{ not json"));
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[0]["id"], Value::Null);
}

// =============================================================================
// Tool Tests
// =============================================================================

#[test]
fn test_say_hi_tool() {
    let server = demo_server();
    initialise(&server);

    let reply = call(
        &server,
        "tools/call",
        json!({"name": "say-hi-tool", "arguments": {"name": "John Doe"}}),
    );
    assert_eq!(
        reply["result"],
        json!({
            "content": [{"type": "text", "text": "Hello, John Doe!"}],
            "isError": false
        })
    );
}

#[test]
fn test_say_hi_tool_validation_is_a_tool_error() {
    let server = demo_server();
    let reply = call(
        &server,
        "tools/call",
        json!({"name": "say-hi-tool", "arguments": {"name": ""}}),
    );
    assert_eq!(
        reply["result"],
        json!({
            "content": [{"type": "text", "text": "The name field is required."}],
            "isError": true
        })
    );
}

#[test]
fn test_unknown_tool() {
    let server = demo_server();
    let reply = call(&server, "tools/call", json!({"name": "nope"}));
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["message"], "Tool [nope] not found.");

    let reply = call(&server, "tools/call", json!({}));
    assert_eq!(reply["error"]["code"], -32602);
}

#[test]
fn test_streaming_tool_emits_notifications_first() {
    let server = McpServer::builder().tool(Uploader).build();
    let replies = send(
        &server,
        &request(7, "tools/call", json!({"name": "upload"})),
    );

    assert_eq!(replies.len(), 3);
    for notification in &replies[..2] {
        assert_eq!(notification["method"], "notifications/progress");
        assert!(notification.get("id").is_none());
    }
    assert_eq!(replies[0]["params"]["progress"], 1);
    assert_eq!(replies[1]["params"]["progress"], 2);
    assert_eq!(replies[2]["id"], 7);
    assert_eq!(replies[2]["result"]["content"][0]["text"], "uploaded");
}

#[test]
fn test_log_notifications_follow_session_level() {
    let server = demo_server();

    let replies = send(
        &server,
        &request(1, "tools/call", json!({"name": "countdown", "arguments": {"from": 3}})),
    );
    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0]["method"], "notifications/message");
    assert_eq!(replies[0]["params"]["level"], "info");

    let reply = call(&server, "logging/setLevel", json!({"level": "warning"}));
    assert_eq!(reply["result"], json!({}));

    let replies = send(
        &server,
        &request(2, "tools/call", json!({"name": "countdown", "arguments": {"from": 3}})),
    );
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["result"]["content"][0]["text"], "Liftoff!");
}

#[test]
fn test_set_level_rejects_unknown_level() {
    let server = demo_server();
    let reply = call(&server, "logging/setLevel", json!({"level": "loud"}));
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["message"], "Invalid log level [loud].");
    assert_eq!(server.sessions().load(SESSION).log_level(), LogLevel::Info);
}

// =============================================================================
// Resource Tests
// =============================================================================

#[test]
fn test_read_template_resource_extracts_variable() {
    let server = McpServer::builder().resource(EchoUser).unwrap().build();
    let reply = call(&server, "resources/read", json!({"uri": "file://users/123"}));

    assert_eq!(
        reply["result"]["contents"],
        json!([{"uri": "file://users/123", "mimeType": "text/plain", "text": "user=123"}])
    );
}

#[test]
fn test_resource_listings_split_static_and_templates() {
    let server = demo_server();

    let reply = call(&server, "resources/list", json!({}));
    let resources = reply["result"]["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["uri"], "app://info");

    let reply = call(&server, "resources/templates/list", json!({}));
    let templates = reply["result"]["resourceTemplates"].as_array().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["uriTemplate"], "file://users/{userId}");
}

#[test]
fn test_resource_error_response_is_internal_error() {
    let server = demo_server();
    let reply = call(&server, "resources/read", json!({"uri": "file://users/42"}));
    assert_eq!(reply["error"]["code"], -32603);
    assert_eq!(reply["error"]["message"], "User [42] not found.");
}

#[test]
fn test_unknown_resource() {
    let server = demo_server();
    let reply = call(&server, "resources/read", json!({"uri": "ftp://nothing"}));
    assert_eq!(reply["error"]["code"], -32602);

    let reply = call(&server, "resources/read", json!({}));
    assert_eq!(reply["error"]["code"], -32602);
}

// =============================================================================
// Prompt Tests
// =============================================================================

#[test]
fn test_get_prompt() {
    let server = demo_server();
    let reply = call(
        &server,
        "prompts/get",
        json!({"name": "greeting", "arguments": {"name": "Ada", "style": "pirate"}}),
    );
    let result = &reply["result"];
    assert_eq!(result["description"], "Greets a person in the requested style.");
    let messages = result["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"]["text"], "Hello, Ada!");
}

#[test]
fn test_prompt_validation_is_invalid_params() {
    let server = demo_server();
    let reply = call(&server, "prompts/get", json!({"name": "greeting", "arguments": {}}));
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["message"], "The name field is required.");
}

// =============================================================================
// Completion Tests
// =============================================================================

#[test]
fn test_complete_prompt_argument() {
    let server = demo_server();
    let reply = call(
        &server,
        "completion/complete",
        json!({
            "ref": {"type": "ref/prompt", "name": "greeting"},
            "argument": {"name": "style", "value": "F"}
        }),
    );
    assert_eq!(
        reply["result"]["completion"],
        json!({"values": ["formal"], "hasMore": false})
    );
}

#[test]
fn test_complete_resource_template_variable() {
    let server = demo_server();
    let reply = call(
        &server,
        "completion/complete",
        json!({
            "ref": {"type": "ref/resource", "uri": "file://users/{userId}"},
            "argument": {"name": "userId", "value": ""}
        }),
    );
    assert_eq!(reply["result"]["completion"]["values"], json!(["1", "2", "3"]));
}

#[test]
fn test_complete_without_strategy_is_empty() {
    let server = demo_server();
    let reply = call(
        &server,
        "completion/complete",
        json!({
            "ref": {"type": "ref/prompt", "name": "greeting"},
            "argument": {"name": "name", "value": "A"}
        }),
    );
    assert_eq!(reply["result"]["completion"]["values"], json!([]));
    assert_eq!(reply["result"]["completion"]["hasMore"], false);
}

#[test]
fn test_disabled_capabilities_are_method_not_found() {
    let server = demo::register(McpServer::builder().capabilities(
        mcp_engine::mcp::context::Capabilities {
            logging: false,
            completions: false,
        },
    ))
    .unwrap()
    .build();

    let reply = call(&server, "logging/setLevel", json!({"level": "debug"}));
    assert_eq!(reply["error"]["code"], -32601);

    let reply = call(
        &server,
        "completion/complete",
        json!({
            "ref": {"type": "ref/prompt", "name": "greeting"},
            "argument": {"name": "style", "value": ""}
        }),
    );
    assert_eq!(reply["error"]["code"], -32601);
}

// =============================================================================
// Pagination Tests
// =============================================================================

struct Numbered(String);

impl Tool for Numbered {
    fn name(&self) -> &str {
        &self.0
    }

    fn description(&self) -> &str {
        "numbered"
    }

    fn handle(&self, _request: &Request) -> Result<Output, ValidationError> {
        Ok(Response::text(self.0.clone()).into())
    }
}

#[test]
fn test_pagination_visits_every_tool_once() {
    let names: Vec<String> = (0..8).map(|i| format!("tool-{i}")).collect();
    let server = names
        .iter()
        .fold(McpServer::builder().pagination(3, 5), |builder, name| {
            builder.tool(Numbered(name.clone()))
        })
        .build();

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let mut params = json!({});
        if let Some(cursor) = &cursor {
            params["cursor"] = json!(cursor);
        }
        let reply = call(&server, "tools/list", params);
        let result = &reply["result"];
        for tool in result["tools"].as_array().unwrap() {
            seen.push(tool["name"].as_str().unwrap().to_string());
        }
        pages += 1;
        match result.get("nextCursor").and_then(Value::as_str) {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen, names);
}

#[test]
fn test_per_page_is_clamped_to_maximum() {
    let server = (0..8)
        .fold(McpServer::builder().pagination(3, 5), |builder, i| {
            builder.tool(Numbered(format!("tool-{i}")))
        })
        .build();
    let reply = call(&server, "tools/list", json!({"per_page": 100}));
    assert_eq!(reply["result"]["tools"].as_array().unwrap().len(), 5);
}

// =============================================================================
// Authorization And Custom Method Tests
// =============================================================================

#[test]
fn test_authorizer_refusal_is_unauthorized() {
    let server = demo::register(McpServer::builder().authorizer(
        |_session: &Session, primitive: PrimitiveRef<'_>| primitive.name() != "say-hi-tool",
    ))
    .unwrap()
    .build();

    let reply = call(
        &server,
        "tools/call",
        json!({"name": "say-hi-tool", "arguments": {"name": "Eve"}}),
    );
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["message"], "Unauthorized.");

    let reply = call(&server, "tools/list", json!({}));
    let tools = reply["result"]["tools"].as_array().unwrap();
    assert!(tools.iter().all(|tool| tool["name"] != "say-hi-tool"));
}

fn echo_method(
    request: &JsonRpcRequest,
    _context: &ServerContext,
    _session: &mut Session,
) -> Result<Value, McpError> {
    Ok(Value::Object(request.params.clone()))
}

#[test]
fn test_custom_method() {
    let server = McpServer::builder()
        .method("x/echo", echo_method)
        .unwrap()
        .build();
    let reply = call(&server, "x/echo", json!({"a": 1}));
    assert_eq!(reply["result"], json!({"a": 1}));
}

#[test]
fn test_reserved_method_names_are_rejected() {
    let builder: ServerBuilder = McpServer::builder();
    assert!(builder.method("tools/call", echo_method).is_err());
    assert!(McpServer::builder().method("", echo_method).is_err());
}
