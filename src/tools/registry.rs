//! Tool registry - manages and dispatches tool calls
//!
//! Central hub for registering capabilities and routing tool calls to them.
//! Arguments are checked against each capability's declared input schema
//! before the capability runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{ContentPart, ParleyError, Result, ToolDefinition, ToolsConfig};
use crate::tools::cli::ExecuteCliTool;
use crate::tools::context::ToolContext;
use crate::tools::files::{
    CreateDirectoryTool, ListFilesTool, ReadFileTool, RemoveFilesTool, SaveImageTool,
    WriteFileTool,
};
use crate::tools::validation;

/// A named operation the model may request
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique tool name exposed to the model
    fn name(&self) -> &str;

    /// What the tool does, shown to the model
    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn input_schema(&self) -> serde_json::Value;

    /// Run the tool with already-validated arguments
    async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<Vec<ContentPart>>;
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Capability>>,
    context: ToolContext,
}

impl ToolRegistry {
    /// Create an empty registry bound to a conversation's tool context
    pub fn new(context: ToolContext) -> Self {
        Self {
            tools: HashMap::new(),
            context,
        }
    }

    /// Create a registry with the built-in file tools, plus `executeCli`
    /// when a CLI program is configured
    pub fn with_builtin_tools(context: ToolContext, config: &ToolsConfig) -> Self {
        let mut registry = Self::new(context);
        registry.register(ReadFileTool);
        registry.register(WriteFileTool);
        registry.register(ListFilesTool);
        registry.register(CreateDirectoryTool);
        registry.register(RemoveFilesTool);
        registry.register(SaveImageTool);

        if let Some(program) = config.cli_program.as_deref().filter(|p| !p.trim().is_empty()) {
            registry.register(ExecuteCliTool::new(program));
        }

        registry
    }

    /// Register a capability, replacing any previous one with the same name
    pub fn register(&mut self, capability: impl Capability + 'static) {
        self.register_arc(Arc::new(capability));
    }

    /// Register a shared capability
    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        self.tools.insert(capability.name().to_string(), capability);
    }

    /// Tool definitions sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| {
                ToolDefinition::function(tool.name(), tool.description(), tool.input_schema())
            })
            .collect();
        definitions.sort_by(|a, b| a.name().cmp(b.name()));
        definitions
    }

    /// Whether a tool with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The context handed to every invocation
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Validate arguments and execute a tool
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<Vec<ContentPart>> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ParleyError::ToolNotFound(name.to_string()))?;

        validation::validate(&tool.input_schema(), &arguments)
            .map_err(|reason| ParleyError::invalid_arguments(name, reason))?;

        debug!(tool = name, "Invoking tool");
        tool.invoke(arguments, &self.context).await
    }
}
