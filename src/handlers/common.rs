//! Shared multipart upload plumbing
//!
//! Uploads stream chunk-wise to a temporary file and are size-capped during
//! the stream, so an oversized body never lands on disk in full.

use std::path::Path;

use axum::extract::multipart::Field;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};

/// Lowercased extension of a file name, empty when absent
pub(crate) fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Content type for the document extensions served by the portal
pub(crate) fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Stream a multipart field to `path`, enforcing `max_size` as bytes arrive.
/// Returns the number of bytes written. The caller owns cleanup of the
/// target file on error.
pub(crate) async fn stream_to_file(
    field: &mut Field<'_>,
    path: &Path,
    max_size: usize,
) -> AppResult<i64> {
    let mut file = fs::File::create(path).await?;
    let mut size: i64 = 0;

    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                size += chunk.len() as i64;
                if size > max_size as i64 {
                    return Err(AppError::PayloadTooLarge(format!(
                        "最大允许 {}MB",
                        max_size / (1024 * 1024)
                    )));
                }
                file.write_all(&chunk).await?;
            }
            Ok(None) => break,
            Err(e) => {
                let message = e.to_string().to_lowercase();
                if message.contains("length limit") || message.contains("body limit") {
                    return Err(AppError::PayloadTooLarge(format!(
                        "最大允许 {}MB",
                        max_size / (1024 * 1024)
                    )));
                }
                return Err(AppError::BadRequest(
                    "上传文件失败，请检查网络连接后重试".to_string(),
                ));
            }
        }
    }

    file.flush().await?;
    Ok(size)
}

/// Best-effort temp file removal. Cleanup failures are logged, not
/// escalated: the operation they belong to has already failed or finished.
pub(crate) async fn remove_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!("Failed to remove temp file {}: {}", path.display(), e);
    }
}
