//! Image upload checks and storage.

use std::path::Path;

use uuid::Uuid;

use super::error::ApiError;

/// Image formats accepted for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    /// Detect the format from the file's leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageKind::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageKind::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageKind::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(ImageKind::Webp)
            }
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }
}

/// Check an upload against the MIME whitelist, its magic bytes and the size
/// limit.
pub fn validate_image(
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<ImageKind, ApiError> {
    if bytes.len() > max_bytes {
        return Err(ApiError::FileTooLarge { max_bytes });
    }

    let declared = content_type
        .and_then(ImageKind::from_mime)
        .ok_or_else(|| {
            ApiError::InvalidFileFormat(format!(
                "unsupported content type {}",
                content_type.unwrap_or("(none)")
            ))
        })?;

    match ImageKind::sniff(bytes) {
        Some(actual) if actual == declared => Ok(actual),
        _ => Err(ApiError::InvalidFileFormat(
            "file content does not match its content type".to_string(),
        )),
    }
}

/// Write the image under a fresh random name; returns that name.
pub async fn store_image(dir: &Path, kind: ImageKind, bytes: &[u8]) -> Result<String, ApiError> {
    let filename = format!("{}.{}", Uuid::new_v4(), kind.extension());
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&filename), bytes).await?;
    Ok(filename)
}

/// Remove a previously stored image, ignoring files that are already gone.
///
/// Names containing path separators are refused so a stored value can never
/// point outside `dir`.
pub async fn remove_image(dir: &Path, filename: &str) {
    if filename.contains(['/', '\\']) || filename.starts_with('.') {
        tracing::warn!(filename, "refusing to delete suspicious avatar name");
        return;
    }
    match tokio::fs::remove_file(dir.join(filename)).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(filename, error = %err, "failed to delete old image"),
    }
}
