use pretty_assertions::assert_eq;
use std::io::Cursor;

use serde_json::{json, Value};
use swat_core::error::AppError;
use swat_copilot_lib::mcp::{error_codes, JsonRpcId, McpServer, PROTOCOL_VERSION, SERVER_NAME};
use swat_docs::corpus::{Chunker, Document};
use swat_docs::embeddings::Embedder;
use swat_docs::index::build_index;
use swat_docs::tool::DocsContext;

struct VowelEmbedder;

impl Embedder for VowelEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        Ok("aeiou"
            .chars()
            .map(|v| input.chars().filter(|c| c.eq_ignore_ascii_case(&v)).count() as f32 + 0.5)
            .collect())
    }
}

fn server() -> McpServer {
    let docs = vec![Document::from_pages(
        "manual.pdf",
        [(255, "CN2 is the SCS runoff curve number for moisture condition II.")],
    )];
    let index = build_index(&docs, &Chunker::default(), &VowelEmbedder, "mock").expect("build");
    McpServer::new(DocsContext::ready(index, Box::new(VowelEmbedder)))
}

fn call(server: &McpServer, request: Value) -> Value {
    let resp = server
        .handle_line(&request.to_string())
        .expect("response expected");
    serde_json::to_value(resp).expect("encode")
}

#[test]
fn initialize_reports_server_info_and_tools_capability() {
    let resp = call(
        &server(),
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    );
    assert_eq!(resp["id"], json!(1));
    assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);
    assert_eq!(resp["result"]["capabilities"]["tools"], json!({}));
}

#[test]
fn tools_list_exposes_search_documentation() {
    let resp = call(
        &server(),
        json!({"jsonrpc": "2.0", "id": "list-1", "method": "tools/list"}),
    );
    assert_eq!(resp["id"], json!("list-1"));
    let tools = resp["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "search_documentation");
}

#[test]
fn tools_call_round_trip_returns_cited_text() {
    let resp = call(
        &server(),
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "search_documentation",
                "arguments": {"query": "What is CN2?", "top_k": 1}
            }
        }),
    );
    assert_eq!(resp["result"]["isError"], json!(false));
    let text = resp["result"]["content"][0]["text"].as_str().expect("text");
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    assert!(text.contains("Source: manual.pdf | Page: 255"));
    assert!(text.contains("CN2 is the SCS runoff curve number"));
}

#[test]
fn tool_level_errors_are_results_not_protocol_errors() {
    let resp = call(
        &server(),
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {"name": "search_documentation", "arguments": {"query": "x", "top_k": 99}}
        }),
    );
    assert_eq!(resp.get("error"), None);
    assert_eq!(resp["result"]["isError"], json!(true));
    let text = resp["result"]["content"][0]["text"].as_str().expect("text");
    assert!(text.starts_with("Invalid argument: "));
}

#[test]
fn protocol_errors_use_json_rpc_codes() {
    let s = server();

    let unknown_tool = call(
        &s,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "run_model"}}),
    );
    assert_eq!(unknown_tool["error"]["code"], json!(error_codes::INVALID_PARAMS));

    let unknown_method = call(&s, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}));
    assert_eq!(unknown_method["error"]["code"], json!(error_codes::METHOD_NOT_FOUND));

    let wrong_version = call(&s, json!({"jsonrpc": "1.0", "id": 4, "method": "ping"}));
    assert_eq!(wrong_version["error"]["code"], json!(error_codes::INVALID_REQUEST));

    let parse = s.handle_line("{not json").expect("response");
    assert_eq!(parse.id, None);
    assert_eq!(parse.error.expect("error").code, error_codes::PARSE_ERROR);

    let missing_method = s
        .handle_line(r#"{"jsonrpc": "2.0", "id": 5}"#)
        .expect("response");
    assert_eq!(missing_method.id, Some(JsonRpcId::Number(5.into())));
    assert_eq!(missing_method.error.expect("error").code, error_codes::INVALID_REQUEST);
}

#[test]
fn notifications_and_blank_lines_get_no_response() {
    let s = server();
    assert_eq!(
        s.handle_line(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#),
        None
    );
    assert_eq!(s.handle_line("   "), None);
}

#[test]
fn run_answers_each_request_line_until_eof() {
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}).to_string(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        "garbage".to_string(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string(),
    ]
    .join("\n");

    let mut out: Vec<u8> = Vec::new();
    server()
        .run(Cursor::new(input), &mut out)
        .expect("run");

    let lines: Vec<Value> = String::from_utf8(out)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], json!(1));
    assert_eq!(lines[1]["error"]["code"], json!(error_codes::PARSE_ERROR));
    assert_eq!(lines[2], json!({"jsonrpc": "2.0", "id": 2, "result": {}}));
}

#[test]
fn non_utf8_line_is_a_parse_error_and_the_loop_continues() {
    let mut input: Vec<u8> = Vec::new();
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"x\xff\"}\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");

    let mut out: Vec<u8> = Vec::new();
    server().run(Cursor::new(input), &mut out).expect("run");

    let lines: Vec<Value> = String::from_utf8(out)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
    assert_eq!(lines[1]["id"], Value::Null);
    assert_eq!(lines[1]["error"]["code"], json!(error_codes::PARSE_ERROR));
    assert_eq!(lines[2], json!({"jsonrpc": "2.0", "id": 3, "result": {}}));
}

#[test]
fn float_and_large_ids_are_echoed_back() {
    let s = server();

    let float_id = call(&s, json!({"jsonrpc": "2.0", "id": 1.5, "method": "ping"}));
    assert_eq!(float_id["id"], json!(1.5));
    assert_eq!(float_id["result"], json!({}));

    let big_id = call(&s, json!({"jsonrpc": "2.0", "id": u64::MAX, "method": "ping"}));
    assert_eq!(big_id["id"], json!(u64::MAX));
    assert_eq!(big_id["result"], json!({}));
}
