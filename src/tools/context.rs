//! Tool context - per-conversation state shared by the built-in tools
//!
//! Holds the directory the agent is confined to, the extra read-only roots,
//! and the registry of paths the agent created during this conversation.
//! Deletions are restricted to those paths.

use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use crate::core::{ParleyError, Result};

/// Paths created by the agent in the current conversation
#[derive(Debug, Default)]
pub struct CreatedPaths {
    paths: Mutex<Vec<PathBuf>>,
}

impl CreatedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a path the agent created
    pub fn record(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Ok(mut paths) = self.paths.lock() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    /// Whether the agent created this path
    pub fn contains(&self, path: &Path) -> bool {
        self.paths
            .lock()
            .map(|paths| paths.iter().any(|p| p == path))
            .unwrap_or(false)
    }

    /// Stop tracking a path
    pub fn forget(&self, path: &Path) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.retain(|p| p != path);
        }
    }

    /// Snapshot of tracked paths in creation order
    pub fn list(&self) -> Vec<PathBuf> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

/// State handed to every tool invocation
#[derive(Debug)]
pub struct ToolContext {
    working_dir: PathBuf,
    read_roots: Vec<PathBuf>,
    created: CreatedPaths,
}

impl ToolContext {
    /// Create a context confined to `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: normalize(&working_dir.into()),
            read_roots: Vec::new(),
            created: CreatedPaths::new(),
        }
    }

    /// Create a context for the current process directory
    pub fn current_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Allow read-only tools to access these extra directories
    pub fn with_read_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.read_roots = roots
            .into_iter()
            .map(|root| normalize(&expand_tilde(&root.to_string_lossy())))
            .collect();
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn created(&self) -> &CreatedPaths {
        &self.created
    }

    /// Resolve a tool-supplied path: expand `~`, anchor relative paths at the
    /// working directory, and collapse `.` and `..` without touching the disk
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let expanded = expand_tilde(raw.trim());
        if expanded.is_absolute() {
            normalize(&expanded)
        } else {
            normalize(&self.working_dir.join(expanded))
        }
    }

    /// Resolve a path that will be modified; must stay inside the working directory
    pub fn writable_path(&self, raw: &str) -> Result<PathBuf> {
        let path = self.resolve(raw);
        if path.starts_with(&self.working_dir) {
            Ok(path)
        } else {
            Err(ParleyError::access_denied(raw.to_string()))
        }
    }

    /// Resolve a path that will only be read; the read roots are allowed too
    pub fn readable_path(&self, raw: &str) -> Result<PathBuf> {
        let path = self.resolve(raw);
        let allowed = path.starts_with(&self.working_dir)
            || self.read_roots.iter().any(|root| path.starts_with(root));
        if allowed {
            Ok(path)
        } else {
            Err(ParleyError::access_denied(raw.to_string()))
        }
    }

    /// Display form of a path relative to the working directory
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.working_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

fn expand_tilde(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Lexically normalize a path
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
