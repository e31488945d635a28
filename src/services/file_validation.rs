use mime::Mime;

use crate::utils::error::{AppError, AppResult};

pub const MAX_FILES_PER_UPLOAD: usize = 20;

const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/zip",
    "application/x-rar-compressed",
];

/// Parses a declared content type and checks it against the allow-list.
/// Any `image/*` or `video/*` type is accepted. Returns the essence string
/// (no parameters), lowercased.
pub fn validate_mime_type(content_type: &str) -> AppResult<String> {
    let parsed: Mime = content_type
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("File type {} not allowed", content_type)))?;

    let essence = parsed.essence_str().to_lowercase();
    let allowed = parsed.type_() == mime::IMAGE
        || parsed.type_() == mime::VIDEO
        || ALLOWED_MIME_TYPES.contains(&essence.as_str());

    if !allowed {
        return Err(AppError::Validation(format!(
            "File type {} not allowed",
            essence
        )));
    }

    Ok(essence)
}

pub fn validate_file_count(count: usize) -> AppResult<()> {
    if count == 0 {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    if count > MAX_FILES_PER_UPLOAD {
        return Err(AppError::Validation(format!(
            "Too many files: {} (max {})",
            count, MAX_FILES_PER_UPLOAD
        )));
    }

    Ok(())
}

pub fn validate_file_size(size: u64, max_file_size: u64) -> AppResult<()> {
    if size > max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File too large: {} bytes (max {} bytes)",
            size, max_file_size
        )));
    }

    Ok(())
}
