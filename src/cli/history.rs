//! History viewer
//!
//! Pretty-prints a history file written by `ask --history`.

use std::fmt::Write as _;
use std::path::Path;

use console::style;
use serde_json::Value;

use crate::core::{ContentPart, Message, ParleyError, Result};

/// Render a history file for the terminal
pub async fn render_history(path: &Path) -> Result<String> {
    let shown = path.display();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            ParleyError::input(format!("History file '{}' not found", shown))
        }
        _ => ParleyError::input(format!("Error reading history file: {}", e)),
    })?;

    let value: Value = serde_json::from_str(&content)
        .map_err(|_| ParleyError::input(format!("Invalid JSON in history file '{}'", shown)))?;

    let Value::Array(entries) = value else {
        return Err(ParleyError::input(
            "Invalid history file format - expected an array",
        ));
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", style(format!("History from file: {}", shown)).bold());

    for (index, entry) in entries.into_iter().enumerate() {
        let _ = writeln!(out, "\n{}", style(format!("[#{}]", index + 1)).dim());
        match serde_json::from_value::<Message>(entry) {
            Ok(message) => render_message(&mut out, &message),
            Err(_) => {
                let _ = writeln!(out, "{}", style("(unsupported message format)").yellow());
            }
        }
    }

    Ok(out)
}

fn render_message(out: &mut String, message: &Message) {
    match message {
        Message::System { content } => {
            let _ = writeln!(out, "{}", style("SYSTEM:").yellow().bold());
            render_parts(out, content);
        }
        Message::User { content } => {
            let _ = writeln!(out, "{}", style("USER:").blue().bold());
            render_parts(out, content);
        }
        Message::Assistant { content, .. } => {
            let _ = writeln!(out, "{}", style("ASSISTANT:").blue().bold());
            render_parts(out, content);
        }
        Message::AssistantWithToolCalls { tool_calls } => {
            let _ = writeln!(out, "{}", style("ASSISTANT WITH TOOL:").blue().bold());
            for call in tool_calls {
                let _ = writeln!(
                    out,
                    "{} {}({})",
                    style("INVOKE TOOL:").magenta().bold(),
                    style(&call.name).cyan(),
                    format_arguments(&call.arguments)
                );
            }
        }
        Message::Tool {
            tool_name, result, ..
        } => {
            let _ = writeln!(
                out,
                "{} {}",
                style("TOOL RESPONSE:").magenta().bold(),
                style(tool_name).cyan()
            );
            render_parts(out, result);
        }
    }
}

fn render_parts(out: &mut String, parts: &[ContentPart]) {
    for part in parts {
        match part {
            ContentPart::Text { text } => {
                let _ = writeln!(out, "{}", text.trim());
            }
            ContentPart::Image { mime_type, .. } => {
                let _ = writeln!(out, "{}", style(format!("(image: {})", mime_type)).dim());
            }
        }
    }
}

fn format_arguments(arguments: &Value) -> String {
    match arguments {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{}: {}", style(key).dim(), style(value).yellow())
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolCallRequest;
    use serde_json::json;

    #[tokio::test]
    async fn test_renders_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        let messages = vec![
            Message::user("What is in x.txt?"),
            Message::tool_calls(vec![ToolCallRequest::new("c1", "readFile", json!({"file": "x.txt"}))]),
            Message::tool_result("c1", "readFile", vec![ContentPart::text("hello\n")]),
            Message::assistant("The file says hello"),
        ];
        std::fs::write(&path, serde_json::to_string(&messages).unwrap()).unwrap();

        let out = console::strip_ansi_codes(&render_history(&path).await.unwrap()).into_owned();
        assert!(out.contains("[#1]\nUSER:\nWhat is in x.txt?"));
        assert!(out.contains("INVOKE TOOL: readFile(file: x.txt)"));
        assert!(out.contains("TOOL RESPONSE: readFile\nhello\n"));
        assert!(out.contains("[#4]\nASSISTANT:\nThe file says hello"));
    }

    #[tokio::test]
    async fn test_errors() {
        let dir = tempfile::tempdir().unwrap();

        let err = render_history(&dir.path().join("absent.json")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[").unwrap();
        assert!(render_history(&bad).await.unwrap_err().to_string().starts_with("Invalid JSON"));

        let object = dir.path().join("object.json");
        std::fs::write(&object, "{}").unwrap();
        assert!(render_history(&object)
            .await
            .unwrap_err()
            .to_string()
            .contains("expected an array"));
    }

    #[tokio::test]
    async fn test_unknown_entries_are_marked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, r#"[{"role":"wizard","content":"x"}]"#).unwrap();

        let out = console::strip_ansi_codes(&render_history(&path).await.unwrap()).into_owned();
        assert!(out.contains("(unsupported message format)"));
    }
}
