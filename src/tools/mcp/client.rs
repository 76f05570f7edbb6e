//! Line-delimited JSON-RPC client for one MCP server
//!
//! Servers are child processes spoken to over stdin/stdout. The transport is
//! any async reader/writer pair, so an in-process server works the same way.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::protocol::*;
use crate::core::{ParleyError, Result};

/// Bound on the handshake and listing requests
const SETUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Variables passed through to server processes besides the configured ones
const INHERITED_ENV: &[&str] = &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER"];

type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

pub struct McpClient {
    server: String,
    next_id: AtomicU64,
    writer: Mutex<Writer>,
    reader: Mutex<Reader>,
    child: Mutex<Option<Child>>,
}

impl McpClient {
    /// Wrap an already-connected transport
    pub fn new(
        server: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            server: server.into(),
            next_id: AtomicU64::new(1),
            writer: Mutex::new(Box::new(writer)),
            reader: Mutex::new(BufReader::new(Box::new(reader))),
            child: Mutex::new(None),
        }
    }

    /// Spawn a server process in `working_dir` and perform the handshake
    pub async fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        working_dir: &Path,
    ) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        cmd.env_clear();
        for key in INHERITED_ENV {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }
        cmd.envs(env);

        let mut child = cmd.spawn().map_err(|e| {
            ParleyError::mcp(format!("Failed to start server '{}' ({}): {}", server, command, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ParleyError::mcp(format!("No stdin for server '{}'", server)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ParleyError::mcp(format!("No stdout for server '{}'", server)))?;

        let client = Self::new(server, stdout, stdin);
        *client.child.lock().await = Some(child);

        client.initialize().await?;
        Ok(client)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// MCP initialize handshake
    pub async fn initialize(&self) -> Result<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION,
            capabilities: json!({}),
            client_info: ClientInfo {
                name: "parley",
                version: env!("CARGO_PKG_VERSION"),
            },
        };

        let response = self
            .request_within(SETUP_TIMEOUT, "initialize", Some(serde_json::to_value(&params)?))
            .await?;
        debug!(server = %self.server, response = %response, "MCP server initialized");

        self.notify("notifications/initialized").await
    }

    /// All tools the server offers, following pagination
    pub async fn list_tools(&self) -> Result<Vec<McpToolDefinition>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({"cursor": c}));
            let value = self.request_within(SETUP_TIMEOUT, "tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(value)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    /// Call a tool; the caller bounds how long this may take
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let value = self
            .request("tools/call", Some(json!({"name": name, "arguments": arguments})))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Stop the server process, if this client owns one
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!(server = %self.server, error = %e, "Failed to stop MCP server");
            } else {
                debug!(server = %self.server, "MCP server stopped");
            }
        }
    }

    async fn request_within(
        &self,
        limit: Duration,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        tokio::time::timeout(limit, self.request(method, params))
            .await
            .map_err(|_| {
                ParleyError::mcp(format!(
                    "Server '{}' did not answer {} within {}s",
                    self.server,
                    method,
                    limit.as_secs()
                ))
            })?
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        self.send_line(line).await?;
        self.read_response(id).await?.into_result()
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let line = serde_json::to_string(&JsonRpcNotification::new(method))?;
        self.send_line(line).await
    }

    async fn send_line(&self, mut line: String) -> Result<()> {
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read lines until the response with `expected` arrives
    async fn read_response(&self, expected: u64) -> Result<JsonRpcResponse> {
        let mut reader = self.reader.lock().await;
        let mut buf = String::new();

        loop {
            buf.clear();
            if reader.read_line(&mut buf).await? == 0 {
                return Err(ParleyError::mcp(format!(
                    "Server '{}' closed its output",
                    self.server
                )));
            }

            let line = buf.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcResponse>(line) {
                Ok(response) if response.id == Some(expected) => return Ok(response),
                Ok(_) => debug!(server = %self.server, line, "Skipping unrelated message"),
                Err(e) => debug!(server = %self.server, error = %e, "Skipping non-JSON line"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, DuplexStream};

    /// Answers each request line with the next canned result, skipping notifications
    async fn serve(stream: DuplexStream, results: Vec<Value>) {
        let (read, mut write) = split(stream);
        let mut lines = BufReader::new(read).lines();
        let mut results = results.into_iter();

        while let Ok(Some(line)) = lines.next_line().await {
            let request: Value = serde_json::from_str(&line).unwrap();
            let Some(id) = request.get("id").cloned() else {
                continue;
            };
            let Some(result) = results.next() else { break };
            let reply = json!({"jsonrpc": "2.0", "id": id, "result": result});
            // a server notification the client has to skip
            let noise = json!({"jsonrpc": "2.0", "method": "notifications/message"});
            let out = format!("{}\n{}\n", noise, reply);
            write.write_all(out.as_bytes()).await.unwrap();
        }
    }

    fn connect(results: Vec<Value>) -> McpClient {
        let (client_end, server_end) = duplex(64 * 1024);
        tokio::spawn(serve(server_end, results));
        let (read, write) = split(client_end);
        McpClient::new("stub", read, write)
    }

    #[tokio::test]
    async fn test_handshake_and_paginated_listing() {
        let client = connect(vec![
            json!({"protocolVersion": PROTOCOL_VERSION, "capabilities": {}}),
            json!({"tools": [{"name": "a", "inputSchema": {"type": "object"}}], "nextCursor": "p2"}),
            json!({"tools": [{"name": "b", "description": "second"}]}),
        ]);

        client.initialize().await.unwrap();
        let tools = client.list_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(tools[1].description, "second");
        assert_eq!(tools[1].input_schema, json!({"type": "object"}));
    }

    #[tokio::test]
    async fn test_call_tool_parses_content() {
        let client = connect(vec![json!({
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "image", "data": "cG5n", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "file:///x"}}
            ]
        })]);

        let result = client.call_tool("echo", json!({"text": "hello"})).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 3);
        assert!(matches!(result.content[2], McpContent::Unsupported));
    }

    #[tokio::test]
    async fn test_rpc_error_and_closed_stream() {
        let (client_end, server_end) = duplex(1024);
        tokio::spawn(async move {
            let (read, mut write) = split(server_end);
            let mut lines = BufReader::new(read).lines();
            if let Ok(Some(_)) = lines.next_line().await {
                let reply = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
                write.write_all(format!("{}\n", reply).as_bytes()).await.unwrap();
            }
            // read the second request, then hang up without answering
            let _ = lines.next_line().await;
        });
        let (read, write) = split(client_end);
        let client = McpClient::new("stub", read, write);

        let err = client.call_tool("nope", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "MCP error: JSON-RPC error -32601: Method not found");

        let err = client.call_tool("nope", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("closed its output"));
    }
}
