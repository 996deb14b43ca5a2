//! End-to-end tests for the stdio transport over in-memory streams.

use serde_json::Value;

use mcp_engine::demo;
use mcp_engine::mcp::server::McpServer;
use mcp_engine::mcp::transport::stdio::MAX_LINE_LENGTH;
use mcp_engine::mcp::transport::StdioTransport;

fn run(input: &str) -> Vec<Value> {
    run_bytes(input.as_bytes())
}

fn run_bytes(input: &[u8]) -> Vec<Value> {
    let server = demo::register(McpServer::builder()).unwrap().build();
    let mut transport = StdioTransport::with_io(input, Vec::new());

    tokio_test::block_on(transport.run(&server)).unwrap();

    let output = String::from_utf8(transport.into_writer()).unwrap();
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn full_session() {
    let input = [
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{}}}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"say-hi-tool","arguments":{"name":"John Doe"}}}"#,
    ]
    .join("\n");

    let replies = run(&input);
    assert_eq!(replies.len(), 3);

    assert_eq!(replies[0]["id"], 1);
    assert_eq!(replies[0]["result"]["protocolVersion"], "2024-11-05");

    assert_eq!(replies[1]["id"], 2);
    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    assert!(tools.iter().any(|tool| tool["name"] == "say-hi-tool"));

    assert_eq!(replies[2]["id"], 3);
    assert_eq!(replies[2]["result"]["content"][0]["text"], "Hello, John Doe!");
}

#[test]
fn streamed_messages_are_written_in_order() {
    let input = r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"countdown","arguments":{"from":2},"_meta":{"progressToken":"t"}}}"#;

    let replies = run(input);
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["method"], "notifications/progress");
    assert_eq!(replies[0]["params"]["progressToken"], "t");
    assert_eq!(replies[0]["params"]["progress"], 1);
    assert_eq!(replies[1]["params"]["progress"], 2);
    assert!(replies[1].get("id").is_none());
    assert_eq!(replies[2]["id"], 9);
    assert_eq!(replies[2]["result"]["content"][0]["text"], "Liftoff!");
}

#[test]
fn errors_do_not_stop_the_loop() {
    let input = [
        "this is not json",
        r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
    ]
    .join("\r\n");

    let replies = run(&input);
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[1]["error"]["code"], -32600);
    assert_eq!(replies[2]["result"], serde_json::json!({}));
}

#[test]
fn one_session_per_process() {
    let input = [
        r#"{"jsonrpc":"2.0","id":1,"method":"logging/setLevel","params":{"level":"error"}}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"countdown","arguments":{"from":3}}}"#,
    ]
    .join("\n");

    let replies = run(&input);
    // The info-level countdown logs are filtered by the level set earlier.
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1]["id"], 2);
}

#[test]
fn invalid_utf8_is_a_parse_error_and_the_loop_continues() {
    let mut input = b"\xff\xfe garbage\n".to_vec();
    input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
    input.push(b'\n');

    let replies = run_bytes(&input);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[0]["id"], Value::Null);
    assert_eq!(replies[1]["id"], 1);
    assert_eq!(replies[1]["result"], serde_json::json!({}));
}

#[test]
fn oversized_line_is_rejected_and_the_loop_continues() {
    let mut input = vec![b' '; MAX_LINE_LENGTH + 1];
    input.push(b'\n');
    input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);

    let replies = run_bytes(&input);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"]["code"], -32600);
    assert_eq!(replies[1]["id"], 2);
}
