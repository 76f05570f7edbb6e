//! Remove files tool
//!
//! Only paths the agent created during this conversation may be removed.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{ContentPart, Result};
use crate::tools::context::ToolContext;
use crate::tools::files::text_result;
use crate::tools::registry::Capability;

/// Removes files or directories previously created by the agent
pub struct RemoveFilesTool;

impl RemoveFilesTool {
    async fn remove_one(raw: &str, ctx: &ToolContext) -> String {
        let Ok(path) = ctx.writable_path(raw) else {
            return format!("{}: Access denied - path outside current directory", raw);
        };

        if !ctx.created().contains(&path) {
            return format!("{}: You can just delete files previously created by the agent", raw);
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(_) => {
                ctx.created().forget(&path);
                return format!("{}: File or directory not found", raw);
            }
        };

        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map(|_| "Directory removed successfully")
        } else {
            tokio::fs::remove_file(&path)
                .await
                .map(|_| "File removed successfully")
        };

        match removed {
            Ok(outcome) => {
                ctx.created().forget(&path);
                format!("{}: {}", raw, outcome)
            }
            Err(e) => format!("{}: Error removing - {}", raw, e),
        }
    }
}

#[async_trait]
impl Capability for RemoveFilesTool {
    fn name(&self) -> &str {
        "removeFiles"
    }

    fn description(&self) -> &str {
        "Remove files or directories. Only paths created by the agent in this conversation can be removed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ],
                    "description": "File or directory path(s) to remove"
                }
            },
            "required": ["files"]
        })
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolContext) -> Result<Vec<ContentPart>> {
        let files: Vec<String> = match &arguments["files"] {
            Value::String(file) => vec![file.clone()],
            Value::Array(files) => files
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let mut lines = Vec::with_capacity(files.len());
        for file in &files {
            lines.push(Self::remove_one(file, ctx).await);
        }

        Ok(text_result(lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removes_only_created_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mine.txt"), "x").unwrap();
        std::fs::write(dir.path().join("theirs.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("build")).unwrap();
        let ctx = ToolContext::new(dir.path());
        ctx.created().record(ctx.resolve("mine.txt"));
        ctx.created().record(ctx.resolve("build"));

        let parts = RemoveFilesTool
            .invoke(json!({"files": ["mine.txt", "theirs.txt", "build"]}), &ctx)
            .await
            .unwrap();

        assert_eq!(
            parts[0].as_text().unwrap(),
            "mine.txt: File removed successfully\n\
             theirs.txt: You can just delete files previously created by the agent\n\
             build: Directory removed successfully"
        );
        assert!(!dir.path().join("mine.txt").exists());
        assert!(dir.path().join("theirs.txt").exists());
        assert!(ctx.created().list().is_empty());
    }

    #[tokio::test]
    async fn test_single_string_and_outside_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());

        let parts = RemoveFilesTool
            .invoke(json!({"files": "../elsewhere"}), &ctx)
            .await
            .unwrap();
        assert_eq!(
            parts[0].as_text().unwrap(),
            "../elsewhere: Access denied - path outside current directory"
        );
    }

    #[tokio::test]
    async fn test_vanished_path_is_forgotten() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        ctx.created().record(ctx.resolve("gone.txt"));

        let parts = RemoveFilesTool
            .invoke(json!({"files": "gone.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(parts[0].as_text().unwrap(), "gone.txt: File or directory not found");
        assert!(ctx.created().list().is_empty());
    }
}
