//! History persistence
//!
//! The history file is a JSON array of non-system messages. It is rewritten
//! in full after every finished turn and after every caught failure.

use std::path::Path;

use tracing::{debug, warn};

use crate::core::{Message, ParleyError, Result};

/// Write the non-system messages to `path`, replacing prior content
pub async fn persist<'a, I>(messages: I, path: &Path) -> Result<()>
where
    I: IntoIterator<Item = &'a Message>,
{
    let history: Vec<&Message> = messages.into_iter().filter(|m| !m.is_system()).collect();
    let json = serde_json::to_string(&history)?;

    tokio::fs::write(path, json).await.map_err(|e| {
        ParleyError::with_context(format!("Failed to write history {}", path.display()), e)
    })?;

    debug!(path = %path.display(), messages = history.len(), "History persisted");
    Ok(())
}

/// Read the history file as raw JSON
///
/// An absent or unreadable file yields an empty array; shape problems are
/// left to `Conversation::load`, which ignores anything malformed.
pub async fn read(path: &Path) -> serde_json::Value {
    let empty = serde_json::Value::Array(Vec::new());

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return empty,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read history; starting empty");
            return empty;
        }
    };

    if content.trim().is_empty() {
        return empty;
    }

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed history; starting empty");
            empty
        }
    }
}

/// Load the history file into messages; anything absent or malformed is empty
pub async fn load(path: &Path) -> Vec<Message> {
    match serde_json::from_value(read(path).await) {
        Ok(messages) => messages,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "History is not a message array; starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContentPart, ToolCallRequest};
    use serde_json::json;

    #[tokio::test]
    async fn test_roundtrip_excludes_system() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let messages = vec![
            Message::system("instructions"),
            Message::user("What is in x.txt?"),
            Message::tool_calls(vec![ToolCallRequest::new("call_1", "readFile", json!({"file": "x.txt"}))]),
            Message::tool_result("call_1", "readFile", vec![ContentPart::text("hello")]),
            Message::assistant_structured("{\"a\":1}", json!({"a": 1})),
        ];

        persist(&messages, &path).await.unwrap();
        let loaded = load(&path).await;

        assert_eq!(loaded, messages[1..].to_vec());
    }

    #[tokio::test]
    async fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        persist(&[Message::user("one"), Message::assistant("two")], &path).await.unwrap();
        persist(&[Message::user("three")], &path).await.unwrap();

        assert_eq!(load(&path).await, vec![Message::user("three")]);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).await.is_empty());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(load(&bad).await.is_empty());

        let object = dir.path().join("object.json");
        std::fs::write(&object, "{\"role\":\"user\"}").unwrap();
        assert!(load(&object).await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/history.json");
        assert!(persist(&[Message::user("x")], &path).await.is_err());
    }
}
