//! Image attachments for user messages
//!
//! Every image must exist and have a known MIME type before it is attached;
//! otherwise the turn fails with an input error and nothing is sent.

use std::path::{Path, PathBuf};

use crate::core::{ContentPart, ParleyError, Result};

/// MIME type for an image path, by extension
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/vnd.microsoft.icon",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(mime)
}

/// Split a comma-separated image list, dropping blanks
pub fn split_image_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load images as content parts, in order
pub async fn load_images(paths: &[String]) -> Result<Vec<ContentPart>> {
    let mut parts = Vec::with_capacity(paths.len());
    for raw in paths {
        parts.push(load_image(raw).await?);
    }
    Ok(parts)
}

async fn load_image(raw: &str) -> Result<ContentPart> {
    let path = absolute(raw)?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ParleyError::input(format!(
            "Image file not found: {}",
            path.display()
        )));
    }

    let mime = image_mime_type(&path).ok_or_else(|| {
        ParleyError::input(format!("Unsupported image type: {}", path.display()))
    })?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        ParleyError::input(format!("Cannot read image {}: {}", path.display(), e))
    })?;

    Ok(ContentPart::image(mime, &bytes))
}

fn absolute(raw: &str) -> Result<PathBuf> {
    let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
