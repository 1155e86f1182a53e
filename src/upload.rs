//! Image attachments copied into `<data-dir>/uploads/`.

use std::fs;
use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use crate::config::UploadsConfig;
use crate::error::{Error, Result};
use crate::storage::{Storage, UPLOADS_DIR};

const FILE_PREFIX: &str = "task-image-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mimetype: &'static str,
    /// Path relative to the data directory, stored as the task's `imageUrl`
    pub url: String,
}

fn mimetype(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Check extension and size, then copy `source` under a fresh name.
pub fn store_image(storage: &Storage, config: &UploadsConfig, source: &Path) -> Result<UploadedImage> {
    let original_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidArgument(format!("invalid file path: {}", source.display())))?
        .to_string();

    let extension = source
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let allowed = config
        .allowed_extensions
        .iter()
        .any(|ext| ext.trim().eq_ignore_ascii_case(&extension));
    if extension.is_empty() || !allowed {
        return Err(Error::InvalidArgument(format!(
            "only image files are allowed ({})",
            config.allowed_extensions.join(", ")
        )));
    }

    let metadata = fs::metadata(source).map_err(|err| {
        Error::InvalidArgument(format!("cannot read {}: {err}", source.display()))
    })?;
    if !metadata.is_file() {
        return Err(Error::InvalidArgument(format!(
            "not a file: {}",
            source.display()
        )));
    }
    if metadata.len() > config.max_bytes {
        return Err(Error::InvalidArgument(format!(
            "file is {} bytes, limit is {} bytes",
            metadata.len(),
            config.max_bytes
        )));
    }

    let filename = format!("{FILE_PREFIX}{}.{extension}", Uuid::new_v4().simple());
    let destination = storage.uploads_dir().join(&filename);
    fs::create_dir_all(storage.uploads_dir())?;
    let size = fs::copy(source, &destination)?;
    tracing::info!(file = %filename, size, "image stored");

    Ok(UploadedImage {
        url: format!("{UPLOADS_DIR}/{filename}"),
        filename,
        original_name,
        size,
        mimetype: mimetype(&extension),
    })
}

/// Remove a stored image by its `imageUrl`. Unknown or foreign paths are ignored.
pub fn remove_image(storage: &Storage, url: &str) -> Result<bool> {
    let Some(filename) = url.strip_prefix(&format!("{UPLOADS_DIR}/")) else {
        return Ok(false);
    };
    if !filename.starts_with(FILE_PREFIX) || filename.contains(['/', '\\']) {
        return Ok(false);
    }
    match fs::remove_file(storage.uploads_dir().join(filename)) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(Error::Io(err)),
    }
}
