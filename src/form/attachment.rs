//! Attachment rules: allowed type and a size cap.

use std::path::Path;

use super::input::Attachment;
use crate::error::ValidationError;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "mp4"];
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "video/mp4"];
/// 20 MiB.
pub const MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

/// Lower-cased text after the last `.` of the base name, or empty when
/// there is no dot. A dotfile such as `.png` counts as extension `png`.
pub fn extension_of(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);
    base.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Accept or reject an uploaded file as a whole.
pub fn check(attachment: &Attachment) -> Result<(), ValidationError> {
    let extension = extension_of(&attachment.filename);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::FileType);
    }
    if !ALLOWED_MIME_TYPES.contains(&attachment.declared_mime_type.as_str()) {
        return Err(ValidationError::FileMimeType);
    }
    if attachment.size_bytes > MAX_ATTACHMENT_BYTES {
        return Err(ValidationError::FileTooLarge);
    }
    Ok(())
}
