//! MCP JSON-RPC protocol types and the stdio request loop.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use swat_core::error::{codes, AppError};
use swat_docs::tool::{tool_definition, DocsContext, TOOL_NAME};
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "swat-copilot";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(serde_json::Number),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<JsonRpcId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Standard JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const NOTIFICATION_PREFIX: &str = "notifications/";
}

pub struct McpServer {
    ctx: DocsContext,
}

impl McpServer {
    pub fn new(ctx: DocsContext) -> Self {
        Self { ctx }
    }

    /// Handles one newline-delimited message. `None` means nothing is written back
    /// (blank lines and notifications).
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                return Some(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(raw.clone()) {
            Ok(r) => r,
            Err(e) => {
                let id = raw
                    .get("id")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok());
                return Some(JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        if request.id.is_none() || request.method.starts_with(methods::NOTIFICATION_PREFIX) {
            debug!(method = %request.method, "notification received");
            return None;
        }

        Some(self.dispatch(request))
    }

    fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "dispatching request");
        let id = request.id;
        match request.method.as_str() {
            methods::INITIALIZE => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            methods::PING => JsonRpcResponse::success(id, json!({})),
            methods::TOOLS_LIST => {
                JsonRpcResponse::success(id, json!({ "tools": [tool_definition()] }))
            }
            methods::TOOLS_CALL => self.call_tool(id, request.params),
            other => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        }
    }

    fn call_tool(&self, id: Option<JsonRpcId>, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or(Value::Null);
        let name = match params.get("name").and_then(Value::as_str) {
            Some(n) => n,
            None => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Invalid params: missing tool name",
                )
            }
        };
        if name != TOOL_NAME {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {name}"),
            );
        }

        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let out = self.ctx.search_documentation(&args);
        JsonRpcResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": out.text }],
                "isError": out.is_error
            }),
        )
    }

    /// Serves requests until EOF. Only I/O failures on the transport end the loop.
    pub fn run<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> Result<(), AppError> {
        info!(ready = self.ctx.is_ready(), "MCP server listening on stdio");
        let mut buf: Vec<u8> = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(io_err("Failed to read request"))?;
            if read == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line),
                Err(e) => {
                    warn!(error = %e, "request is not valid UTF-8");
                    Some(JsonRpcResponse::error(
                        None,
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ))
                }
            };
            let Some(response) = response else {
                continue;
            };
            let encoded = serde_json::to_string(&response).map_err(|e| {
                AppError::new(codes::SERVER_IO_FAILED, "Failed to encode response")
                    .with_details(e.to_string())
            })?;
            writeln!(writer, "{encoded}").map_err(io_err("Failed to write response"))?;
            writer.flush().map_err(io_err("Failed to flush response"))?;
        }
        info!("stdin closed; MCP server stopping");
        Ok(())
    }
}

fn io_err(message: &str) -> impl Fn(std::io::Error) -> AppError + '_ {
    move |e| AppError::new(codes::SERVER_IO_FAILED, message).with_details(e.to_string())
}
