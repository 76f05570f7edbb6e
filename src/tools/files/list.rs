//! List files tool
//!
//! Lists files relative to the working directory. Recursion descends a single
//! level, which keeps listings of large trees readable for the model.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use walkdir::WalkDir;

use crate::core::{ContentPart, Result};
use crate::tools::context::ToolContext;
use crate::tools::files::{io_message, text_result};
use crate::tools::registry::Capability;

/// Lists files in a directory
pub struct ListFilesTool;

impl ListFilesTool {
    fn recursive(arguments: &Value) -> bool {
        match arguments.get("recursive") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag != "false",
            _ => true,
        }
    }

    fn exclusions(arguments: &Value) -> Vec<String> {
        arguments
            .get("exclude")
            .and_then(Value::as_str)
            .map(|raw| {
                raw.split(',')
                    .map(|prefix| prefix.trim().to_string())
                    .filter(|prefix| !prefix.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn list(directory: &Path, ctx: &ToolContext, recursive: bool, exclude: &[String]) -> String {
        let max_depth = if recursive { 2 } else { 1 };
        let mut files = Vec::new();

        let walker = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = ctx.relative(entry.path());
                !exclude.iter().any(|prefix| relative.starts_with(prefix.as_str()))
            });

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    files.push(ctx.relative(entry.path()));
                }
                Ok(_) => {}
                Err(e) if e.depth() == 0 => {
                    return match e.io_error() {
                        Some(io) => io_message(io, "Directory not found"),
                        None => e.to_string(),
                    };
                }
                Err(_) => {}
            }
        }

        files.join("\n")
    }
}

#[async_trait]
impl Capability for ListFilesTool {
    fn name(&self) -> &str {
        "listFiles"
    }

    fn description(&self) -> &str {
        "List files in a directory relative to the current directory. \
         Subdirectories are included one level deep unless recursive is false."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (defaults to the current directory)"
                },
                "recursive": {
                    "type": ["boolean", "string"],
                    "description": "Include files of subdirectories (default true)"
                },
                "exclude": {
                    "type": "string",
                    "description": "Comma-separated path prefixes to skip"
                }
            }
        })
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let directory = match arguments.get("path").and_then(Value::as_str) {
            Some(path) if !path.trim().is_empty() => ctx.readable_path(path)?,
            _ => ctx.working_dir().to_path_buf(),
        };

        if !tokio::fs::try_exists(&directory).await.unwrap_or(false) {
            return Ok(text_result("Directory not found"));
        }

        let recursive = Self::recursive(&arguments);
        let exclude = Self::exclusions(&arguments);
        let listing = Self::list(&directory, ctx, recursive, &exclude);

        Ok(text_result(listing))
    }
}
