//! File tools module
//!
//! Tools for reading, writing, listing and cleaning up files in the working
//! directory. Each tool enforces its own path policy through `ToolContext`.

mod directory;
mod image;
mod list;
mod read;
mod remove;
mod write;

pub use directory::CreateDirectoryTool;
pub use image::SaveImageTool;
pub use list::ListFilesTool;
pub use read::ReadFileTool;
pub use remove::RemoveFilesTool;
pub use write::WriteFileTool;

use std::io;

use crate::core::ContentPart;

/// Map common I/O failures to the short messages the model sees
pub(crate) fn io_message(err: &io::Error, not_found: &str) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => not_found.to_string(),
        io::ErrorKind::PermissionDenied => "Access denied".to_string(),
        _ => err.to_string(),
    }
}

/// Single text part result
pub(crate) fn text_result(text: impl Into<String>) -> Vec<ContentPart> {
    vec![ContentPart::text(text)]
}
