//! Output schema for structured answers
//!
//! A flat mapping of field names to descriptions. When set, the final answer
//! must be a JSON object that carries every declared field.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{ParleyError, Result};

/// Named fields the final answer must contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSchema {
    fields: BTreeMap<String, String>,
}

impl OutputSchema {
    /// Create a schema from `(name, description)` pairs
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a schema from a JSON object; non-string descriptions are stringified
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ParleyError::input("Output schema must be a JSON object"))?;

        Ok(Self::new(object.iter().map(|(name, description)| {
            let description = match description {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), description)
        })))
    }

    /// Read and parse a schema file
    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ParleyError::input(format!(
                "Cannot read output schema {}: {}",
                path.display(),
                e
            ))
        })?;

        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            ParleyError::input(format!(
                "Invalid JSON in output schema {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_value(&value)
    }

    /// Load a schema file. A missing or unparsable file is logged and yields no schema.
    pub async fn load(path: &Path) -> Option<Self> {
        match Self::read(path).await {
            Ok(schema) => Some(schema),
            Err(e) => {
                warn!("{}; answering in free text", e);
                None
            }
        }
    }

    /// Field names in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON Schema equivalent, for providers with native structured output
    pub fn json_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(name, description)| {
                (
                    name.clone(),
                    serde_json::json!({"type": "string", "description": description}),
                )
            })
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.fields.keys().collect::<Vec<_>>(),
        })
    }

    /// Instructions appended to the prompt so the model answers in shape
    pub fn format_instructions(&self) -> String {
        let mut out = String::from(
            "Respond only with a JSON object in a ```json code block, using exactly these fields:\n\n```json\n{\n",
        );
        let last = self.fields.len().saturating_sub(1);
        for (i, (name, description)) in self.fields.iter().enumerate() {
            let comma = if i < last { "," } else { "" };
            out.push_str(&format!("  \"{}\": string{}  // {}\n", name, comma, description));
        }
        out.push_str("}\n```");
        out
    }

    /// Parse a model answer into a JSON object carrying every declared field
    pub fn parse(&self, text: &str) -> Result<serde_json::Value> {
        let candidate = extract_json(text)
            .ok_or_else(|| ParleyError::schema(format!("no JSON object found in: {}", preview(text))))?;

        let value: serde_json::Value = serde_json::from_str(candidate)
            .map_err(|e| ParleyError::schema(format!("{} in: {}", e, preview(text))))?;

        let object = value
            .as_object()
            .ok_or_else(|| ParleyError::schema("expected a JSON object"))?;

        let missing: Vec<&str> = self
            .field_names()
            .filter(|name| !object.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(ParleyError::schema(format!(
                "missing field(s): {}",
                missing.join(", ")
            )));
        }

        Ok(value)
    }
}

/// Locate the JSON payload: a fenced ```json block, or the outermost braces
fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let open = trimmed.find('{')?;
    let close = trimmed.rfind('}')?;
    (close > open).then(|| &trimmed[open..=close])
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
