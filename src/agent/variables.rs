//! Variable resolution for prompt templates
//!
//! Replaces `{name}` placeholders using an asynchronous parameter source.
//! Each distinct name is resolved once. Placeholders without a value stay in
//! the output untouched, and substituted text is never scanned again.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::debug;

use crate::core::{ParleyError, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z0-9_-]+)\}").expect("valid placeholder regex"));

/// A source of template parameter values
#[async_trait]
pub trait ParamSource: Send + Sync {
    /// Look up a value; `Ok(None)` means the parameter is not defined
    async fn resolve(&self, name: &str) -> Result<Option<String>>;
}

#[async_trait]
impl ParamSource for HashMap<String, String> {
    async fn resolve(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

/// A parameter value, either given inline or read from a file on first use
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Literal(String),
    File(PathBuf),
}

/// Named parameters collected from the command line
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a literal value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values
            .insert(name.into(), ParamValue::Literal(value.into()));
        self
    }

    /// Set an optional value; `None` leaves the parameter undefined
    pub fn set_opt(&mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    /// Set a value read lazily from `path`
    pub fn set_file(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.values.insert(name.into(), ParamValue::File(path.into()));
        self
    }

    /// Parse a `key=value` assignment; `key=@path` defers to the file content
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            ParleyError::input(format!(
                "Invalid parameter '{}': expected key=value",
                assignment
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ParleyError::input(format!(
                "Invalid parameter '{}': empty key",
                assignment
            )));
        }

        match value.strip_prefix('@') {
            Some(path) if !path.is_empty() => self.set_file(key, path),
            _ => self.set(key, value),
        };
        Ok(())
    }

    /// Literal value of a parameter, if set inline
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Literal(value)) => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

#[async_trait]
impl ParamSource for Params {
    async fn resolve(&self, name: &str) -> Result<Option<String>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Literal(value)) => Ok(Some(value.clone())),
            Some(ParamValue::File(path)) => {
                debug!(param = name, path = %path.display(), "Reading deferred parameter");
                tokio::fs::read_to_string(path).await.map(Some).map_err(|e| {
                    ParleyError::input(format!(
                        "Cannot read parameter '{}' from {}: {}",
                        name,
                        path.display(),
                        e
                    ))
                })
            }
        }
    }
}

/// Substitute every `{name}` placeholder whose value the source defines
pub async fn resolve_variables(template: &str, params: &dyn ParamSource) -> Result<String> {
    let names: Vec<&str> = PLACEHOLDER
        .captures_iter(template)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
        .collect();

    let mut values: HashMap<&str, Option<String>> = HashMap::new();
    for name in names {
        if !values.contains_key(name) {
            let value = params.resolve(name).await?;
            values.insert(name, value);
        }
    }

    if values.values().all(Option::is_none) {
        return Ok(template.to_string());
    }

    let output = PLACEHOLDER.replace_all(template, |captures: &Captures| {
        let whole = &captures[0];
        match values.get(&captures[1]) {
            Some(Some(value)) => value.clone(),
            _ => whole.to_string(),
        }
    });

    Ok(output.into_owned())
}
