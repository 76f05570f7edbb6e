//! Execute CLI tool
//!
//! Runs one configured program with model-supplied arguments through the
//! shell, from the working directory. Only registered when a program is set
//! in `[tools] cli_program`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use crate::core::{ContentPart, Result};
use crate::tools::context::ToolContext;
use crate::tools::registry::Capability;

/// Runs `<program> <command>` and returns its stdout
pub struct ExecuteCliTool {
    program: String,
    description: String,
}

impl ExecuteCliTool {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let description = format!(
            "Execute a `{}` command. Pass only the arguments; the program name is prepended.",
            program
        );
        Self {
            program,
            description,
        }
    }
}

#[async_trait]
impl Capability for ExecuteCliTool {
    fn name(&self) -> &str {
        "executeCli"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Arguments passed to the program"
                }
            },
            "required": ["command"]
        })
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let command = arguments["command"].as_str().unwrap_or_default();
        let line = format!("{} {}", self.program, command);
        debug!(command = %line, "Executing CLI command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .current_dir(ctx.working_dir())
            .output()
            .await;

        let text = match output {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = if stderr.trim().is_empty() {
                    format!("Command failed: {} ({})", line, output.status)
                } else {
                    format!("Command failed: {}\n{}", line, stderr.trim_end())
                };
                format!("Error executing command: {}", reason)
            }
            Err(e) => format!("Error executing command: {}", e),
        };

        Ok(vec![ContentPart::text(text)])
    }
}
