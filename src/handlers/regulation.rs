//! Regulation repository handlers
//!
//! Department-scoped document CRUD: upload (admin), listing, inline view,
//! download, and delete (admin). Uploads land in a temp file first and are
//! moved into the department directory only after all checks pass; failed
//! uploads never leave an artifact behind.

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tokio::fs;
use tokio_util::io::ReaderStream;

use crate::entity::regulation_file::{self, is_valid_department};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::common;
use crate::middleware::CurrentUser;
use crate::routes::ApiResponse;
use crate::state::AppState;

const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "doc", "docx", "xls", "xlsx"];

/// Document streamed to a temp location, not yet accepted
struct IncomingDocument {
    temp_path: PathBuf,
    original_name: String,
    size: i64,
    content_type: String,
}

/// POST /api/regulation/upload (admin only)
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<regulation_file::Model>>> {
    if !current_user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let (document, department) = receive_document(&state, &mut multipart).await?;
    let document = document.ok_or_else(|| AppError::BadRequest("请上传文件".to_string()))?;

    let result = store_document(&state, &current_user, &document, department.as_deref()).await;
    if result.is_err() {
        common::remove_temp(&document.temp_path).await;
    }
    let record = result?;

    tracing::info!(
        "Regulation file uploaded: {} -> {} by {}",
        record.original_name,
        record.department,
        current_user.username
    );

    Ok(Json(ApiResponse::success_with("文件上传成功", record)))
}

/// Collect the file and department fields from the multipart body. Field
/// order is not guaranteed, so both are gathered before validation.
async fn receive_document(
    state: &AppState,
    multipart: &mut Multipart,
) -> AppResult<(Option<IncomingDocument>, Option<String>)> {
    let tmp_dir = state.config.tmp_dir();
    fs::create_dir_all(&tmp_dir).await?;

    let mut document: Option<IncomingDocument> = None;
    let mut department: Option<String> = None;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard_staged(&mut document).await;
                return Err(AppError::BadRequest(format!("上传数据无效: {}", e)));
            }
        };

        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("department") => match field.text().await {
                Ok(text) => department = Some(text.trim().to_string()),
                Err(e) => {
                    discard_staged(&mut document).await;
                    return Err(AppError::BadRequest(format!("上传数据无效: {}", e)));
                }
            },
            Some("file") => {
                // A repeated file field replaces the earlier one
                discard_staged(&mut document).await;

                let original_name = field.file_name().unwrap_or("").to_string();
                let ext = common::extension_of(&original_name);
                if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(AppError::BadRequest(
                        "只支持PDF、Word、Excel文件格式 (.pdf, .doc, .docx, .xls, .xlsx)"
                            .to_string(),
                    ));
                }

                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| common::mime_for_extension(&ext).to_string());

                let temp_path = tmp_dir.join(format!("regulation-{}.{}", uuid::Uuid::new_v4(), ext));
                match common::stream_to_file(&mut field, &temp_path, state.config.max_regulation_size)
                    .await
                {
                    Ok(size) => {
                        document = Some(IncomingDocument {
                            temp_path,
                            original_name,
                            size,
                            content_type,
                        });
                    }
                    Err(e) => {
                        common::remove_temp(&temp_path).await;
                        return Err(e);
                    }
                }
            }
            _ => {}
        }
    }

    Ok((document, department))
}

/// Remove the temp file behind an already-staged document, if any
async fn discard_staged(document: &mut Option<IncomingDocument>) {
    if let Some(staged) = document.take() {
        common::remove_temp(&staged.temp_path).await;
    }
}

/// Validate the department, move the temp file into the department
/// directory, and insert the record
async fn store_document(
    state: &AppState,
    current_user: &CurrentUser,
    document: &IncomingDocument,
    department: Option<&str>,
) -> AppResult<regulation_file::Model> {
    let department = department
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::BadRequest("请指定部门".to_string()))?;
    if !is_valid_department(department) {
        return Err(AppError::BadRequest("无效的部门名称".to_string()));
    }

    let department_dir = state.config.regulation_dir(department);
    fs::create_dir_all(&department_dir).await?;

    let file_name = format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        document.original_name
    );
    let file_path = department_dir.join(&file_name);
    fs::rename(&document.temp_path, &file_path).await?;

    let now = chrono::Utc::now();
    let record = regulation_file::ActiveModel {
        department: Set(department.to_string()),
        file_name: Set(file_name),
        original_name: Set(document.original_name.clone()),
        file_path: Set(file_path.to_string_lossy().into_owned()),
        file_size: Set(document.size),
        file_type: Set(document.content_type.clone()),
        uploaded_by: Set(current_user.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(record.insert(&state.db).await?)
}

/// GET /api/regulation/department/:department
pub async fn get_files_by_department(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<regulation_file::Model>>>> {
    if !is_valid_department(&department) {
        return Err(AppError::BadRequest("无效的部门名称".to_string()));
    }

    let files = regulation_file::Entity::find()
        .filter(regulation_file::Column::Department.eq(&department))
        .order_by_desc(regulation_file::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::success(files)))
}

/// GET /api/regulation/view/:id
///
/// Serves the document inline so browsers open it instead of downloading
pub async fn view_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let file = find_file(&state, id).await?;

    let handle = fs::File::open(&file.file_path)
        .await
        .map_err(|_| AppError::NotFound("文件不存在".to_string()))?;
    let body = Body::from_stream(ReaderStream::new(handle));

    let content_type = common::mime_for_extension(&common::extension_of(&file.original_name));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, "inline")
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /api/regulation/download/:id
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let file = find_file(&state, id).await?;

    let handle = fs::File::open(&file.file_path)
        .await
        .map_err(|_| AppError::NotFound("文件不存在".to_string()))?;
    let body = Body::from_stream(ReaderStream::new(handle));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(&file.original_name),
        )
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// DELETE /api/regulation/:id (admin only)
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !current_user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let file = find_file(&state, id).await?;

    // Physical removal is best-effort; the record always goes
    if let Err(e) = fs::remove_file(&file.file_path).await {
        tracing::error!("Failed to remove file {}: {}", file.file_path, e);
    }

    regulation_file::Entity::delete_by_id(file.id)
        .exec(&state.db)
        .await?;

    tracing::info!(
        "Regulation file deleted: {} by {}",
        file.original_name,
        current_user.username
    );

    Ok(Json(ApiResponse::success_msg("文件删除成功")))
}

async fn find_file(state: &AppState, id: i64) -> AppResult<regulation_file::Model> {
    regulation_file::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("文件不存在")
}

/// Content-Disposition for downloads. Non-ASCII original names get the
/// RFC 5987 `filename*` form next to an ASCII fallback.
fn attachment_disposition(original_name: &str) -> String {
    if original_name.is_ascii() {
        return format!("attachment; filename=\"{}\"", original_name);
    }

    let ascii: String = original_name
        .chars()
        .filter(|c| c.is_ascii() && *c != '"')
        .collect();
    let fallback = if ascii.is_empty() { "file" } else { &ascii };
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(original_name)
    )
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(*byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
