//! Tools module - capabilities the model can invoke
//!
//! The registry validates arguments and dispatches to capabilities; the
//! context carries per-conversation state such as created paths. Tools come
//! from the built-in set or from MCP servers listed in `mcp.json`.

pub mod cli;
pub mod context;
pub mod files;
pub mod mcp;
pub mod registry;
pub mod validation;

pub use context::{CreatedPaths, ToolContext};
pub use mcp::{load_tools, McpSession};
pub use registry::{Capability, ToolRegistry};
