//! MCP server tools
//!
//! When the working directory holds an `mcp.json`, the conversation is bound
//! to the tools of the stdio servers it lists instead of the built-in tools.
//! A file that cannot be read, or a server that fails to start, falls back
//! to the built-ins. Servers live for one conversation and are stopped with
//! [`McpSession::shutdown`].

pub mod client;
pub mod protocol;
pub mod tool;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::{ParleyError, Result, ToolsConfig};
use crate::tools::context::ToolContext;
use crate::tools::registry::{Capability, ToolRegistry};

pub use client::McpClient;
pub use tool::McpTool;

/// File name looked up in the working directory
pub const MCP_CONFIG_FILE: &str = "mcp.json";

/// One server entry of `mcp.json`
#[derive(Debug, Clone, Deserialize)]
pub struct McpServerConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parsed `mcp.json`: servers by name
#[derive(Debug, Clone, Default)]
pub struct McpConfig {
    pub servers: BTreeMap<String, McpServerConfig>,
}

impl McpConfig {
    /// Accepts `{"mcpServers": {...}}` or a bare map of servers
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let servers = match value {
            serde_json::Value::Object(mut object) => match object.remove("mcpServers") {
                Some(servers) => servers,
                None => serde_json::Value::Object(object),
            },
            _ => return Err(ParleyError::config("mcp.json must contain a JSON object")),
        };

        let servers = serde_json::from_value(servers)
            .map_err(|e| ParleyError::config(format!("Invalid server list in mcp.json: {}", e)))?;
        Ok(Self { servers })
    }

    /// Read a config file; `Ok(None)` when it does not exist
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ParleyError::with_context(
                    format!("Reading {}", path.display()),
                    e,
                ))
            }
        };

        let value = serde_json::from_str(&content).map_err(|e| {
            ParleyError::config(format!("Invalid JSON in {}: {}", path.display(), e))
        })?;
        Self::from_value(value).map(Some)
    }
}

/// Running MCP servers for one conversation
pub struct McpSession {
    clients: Vec<Arc<McpClient>>,
}

impl McpSession {
    /// Start every configured server and collect its tools
    pub async fn connect(config: &McpConfig, working_dir: &Path) -> Result<(Self, Vec<McpTool>)> {
        let mut session = Self {
            clients: Vec::new(),
        };
        let mut tools = Vec::new();

        for (name, server) in &config.servers {
            match session.start(name, server, working_dir).await {
                Ok(mut server_tools) => tools.append(&mut server_tools),
                Err(e) => {
                    session.shutdown().await;
                    return Err(e);
                }
            }
        }

        Ok((session, tools))
    }

    async fn start(
        &mut self,
        name: &str,
        server: &McpServerConfig,
        working_dir: &Path,
    ) -> Result<Vec<McpTool>> {
        let command = server.command.as_deref().ok_or_else(|| {
            let transport = server.url.as_deref().unwrap_or("unknown transport");
            ParleyError::config(format!(
                "MCP server '{}' has no command ({}); only stdio servers are supported",
                name, transport
            ))
        })?;

        let client = Arc::new(
            McpClient::spawn(name, command, &server.args, &server.env, working_dir).await?,
        );
        self.clients.push(client.clone());

        let definitions = client.list_tools().await?;
        info!(server = name, tools = definitions.len(), "MCP server started");

        Ok(definitions
            .into_iter()
            .map(|definition| McpTool::new(definition, client.clone()))
            .collect())
    }

    /// Number of running servers
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Stop all servers
    pub async fn shutdown(&self) {
        for client in &self.clients {
            client.shutdown().await;
        }
    }
}

/// Tools for a conversation: MCP tools when `mcp.json` is usable, else the built-ins
pub async fn load_tools(
    context: ToolContext,
    config: &ToolsConfig,
) -> (ToolRegistry, Option<McpSession>) {
    let path = context.working_dir().join(MCP_CONFIG_FILE);

    let connected = match McpConfig::load(&path).await {
        Ok(None) => {
            debug!(path = %path.display(), "No MCP config, using built-in tools");
            None
        }
        Ok(Some(mcp)) => match McpSession::connect(&mcp, context.working_dir()).await {
            Ok(connected) => Some(connected),
            Err(e) => {
                warn!(error = %e, "MCP servers unavailable, using built-in tools");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "Cannot use {}, using built-in tools", MCP_CONFIG_FILE);
            None
        }
    };

    match connected {
        Some((session, tools)) => {
            let mut registry = ToolRegistry::new(context);
            for tool in tools {
                debug!(tool = tool.name(), server = tool.server(), "Binding MCP tool");
                registry.register(tool);
            }
            (registry, Some(session))
        }
        None => (ToolRegistry::with_builtin_tools(context, config), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STUB_SERVER: &str = r#"read line
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"stub","version":"0"}}}'
read line
read line
printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","description":"Echo text","inputSchema":{"type":"object","properties":{"text":{"type":"string"}},"required":["text"]}}]}}'
read line
printf '%s\n' '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"pong"}]}}'
"#;

    fn write_stub(dir: &Path) {
        std::fs::write(dir.join("stub.sh"), STUB_SERVER).unwrap();
        std::fs::write(
            dir.join(MCP_CONFIG_FILE),
            json!({"mcpServers": {"stub": {"command": "sh", "args": ["stub.sh"]}}}).to_string(),
        )
        .unwrap();
    }

    fn tool_names(registry: &ToolRegistry) -> Vec<String> {
        registry
            .definitions()
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    #[test]
    fn test_config_shapes() {
        let wrapped = McpConfig::from_value(json!({
            "mcpServers": {"weather": {"command": "npx", "args": ["-y", "weather-mcp"]}}
        }))
        .unwrap();
        assert_eq!(wrapped.servers["weather"].args, vec!["-y", "weather-mcp"]);

        let bare = McpConfig::from_value(json!({
            "math": {"command": "python", "env": {"DEBUG": "1"}}
        }))
        .unwrap();
        assert_eq!(bare.servers["math"].env["DEBUG"], "1");

        assert!(McpConfig::from_value(json!([1, 2])).is_err());
        assert!(McpConfig::from_value(json!({"x": {"args": "not a list"}})).is_err());
    }

    #[tokio::test]
    async fn test_without_config_uses_builtin_tools() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, session) =
            load_tools(ToolContext::new(dir.path()), &ToolsConfig::default()).await;
        assert!(session.is_none());
        assert!(registry.contains("readFile"));
    }

    #[tokio::test]
    async fn test_broken_config_falls_back_to_builtin_tools() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MCP_CONFIG_FILE), "{not json").unwrap();
        let (registry, session) =
            load_tools(ToolContext::new(dir.path()), &ToolsConfig::default()).await;
        assert!(session.is_none());
        assert_eq!(registry.len(), 6);

        let missing = json!({"ghost": {"command": "/definitely/not/a/server"}});
        std::fs::write(dir.path().join(MCP_CONFIG_FILE), missing.to_string()).unwrap();
        let (registry, session) =
            load_tools(ToolContext::new(dir.path()), &ToolsConfig::default()).await;
        assert!(session.is_none());
        assert!(registry.contains("writeFile"));

        let remote = json!({"remote": {"url": "http://localhost:9000/mcp"}});
        std::fs::write(dir.path().join(MCP_CONFIG_FILE), remote.to_string()).unwrap();
        let (_, session) = load_tools(ToolContext::new(dir.path()), &ToolsConfig::default()).await;
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_binds_server_tools_instead_of_builtins() {
        let dir = tempfile::tempdir().unwrap();
        write_stub(dir.path());

        let (registry, session) =
            load_tools(ToolContext::new(dir.path()), &ToolsConfig::default()).await;
        let session = session.expect("stub server should start");
        assert_eq!(session.len(), 1);
        assert_eq!(tool_names(&registry), vec!["echo"]);

        // arguments are still checked against the server's schema
        let err = registry.invoke("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidArguments { .. }));

        let parts = registry.invoke("echo", json!({"text": "ping"})).await.unwrap();
        assert_eq!(parts[0].as_text(), Some("pong"));

        session.shutdown().await;
    }
}
