//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! Newline-delimited JSON-RPC over stdio. Stdout carries protocol frames
//! only; all logging goes to stderr.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in the initialize handshake.
pub const SERVER_NAME: &str = "mcp-fault-diagnosis";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request. `id` is absent for notifications.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response. Exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    /// Echoed request id, `null` when the request could not be parsed.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: is_error.then_some(true),
        }
    }
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP server exposing the diagnosis engine and tree sessions as tools.
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve over the process's stdin and stdout until EOF.
    pub async fn run(&self) -> std::io::Result<()> {
        debug!("Listening for JSON-RPC on stdin");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC from `reader` to `writer` until EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let Some(response) = self.handle_message(&line).await else {
                continue;
            };

            let frame = serde_json::to_string(&response)?;
            debug!(response = %frame, "Sending response");
            writer.write_all(frame.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        Ok(())
    }

    /// Handle one raw frame. `None` means nothing should be written back.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        debug!(request = %trimmed, "Received request");

        match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(Self::handle_initialize(request.id)),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                debug!(method = %request.method, "Notification received");
                None
            }
            "tools/list" => Some(JsonRpcResponse::success(
                request.id,
                json!({ "tools": tool_definitions() }),
            )),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(request.id, json!({}))),
            method if is_notification => {
                debug!(method = %method, "Unknown notification, ignoring");
                None
            }
            method => {
                error!(method = %method, "Unknown method");
                Some(JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                ))
            }
        }
    }

    fn handle_initialize(id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e));
            }
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let result = match handle_tool_call(&self.state, &params.name, params.arguments).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => ToolCallResult::text(text, false),
                Err(e) => ToolCallResult::text(format!("Error: serialization failed: {}", e), true),
            },
            Err(e) => {
                info!(tool = %params.name, error = %e, "Tool call rejected");
                ToolCallResult::text(format!("Error: {}", e), true)
            }
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        }
    }
}

fn session_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "session_id": { "type": "string", "description": "Tree session id from tree_start" }
        },
        "required": ["session_id"],
        "additionalProperties": false
    })
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {}, "additionalProperties": false })
}

fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Every tool this server exposes, in listing order.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(
            "diagnosis_analyze",
            "Run text, media and (optionally) decision tree analysis over the submitted evidence and return ranked diagnoses with a session summary.",
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Free-text fault description" },
                    "files": {
                        "type": "array",
                        "description": "Media artifact descriptors",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "mime_type": { "type": "string" },
                                "size_bytes": { "type": "integer", "minimum": 0 }
                            },
                            "required": ["name", "mime_type"]
                        }
                    },
                    "tree_session_id": {
                        "type": "string",
                        "description": "Include this decision tree session as a diagnosis source"
                    }
                },
                "additionalProperties": false
            }),
        ),
        tool(
            "tree_start",
            "Start a decision tree session at the root question.",
            empty_schema(),
        ),
        tool(
            "tree_current",
            "Show the current question, path length, running confidence and completion flag.",
            session_schema(),
        ),
        tool(
            "tree_select",
            "Answer the current question. Returns advanced, completed (with solution) or exhausted.",
            json!({
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" },
                    "option_id": { "type": "string", "description": "Id of an option of the current node" }
                },
                "required": ["session_id", "option_id"],
                "additionalProperties": false
            }),
        ),
        tool(
            "tree_reset",
            "Return a session to the root with an empty path.",
            session_schema(),
        ),
        tool(
            "tree_path",
            "Full traversal history of a session.",
            session_schema(),
        ),
        tool("tree_end", "Drop a tree session.", session_schema()),
        tool(
            "learning_metrics",
            "Current process-wide learning statistics.",
            empty_schema(),
        ),
        tool(
            "catalog_node",
            "Look up a decision tree node by id.",
            json!({
                "type": "object",
                "properties": {
                    "node_id": { "type": "string" }
                },
                "required": ["node_id"],
                "additionalProperties": false
            }),
        ),
    ]
}
