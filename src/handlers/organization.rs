//! Organization chart handlers
//!
//! Spreadsheet import plus the tree/node read endpoints. The import pipeline
//! is: multipart upload → temp file → reader → validation → atomic replace,
//! with the temp artifact removed on every path.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use tokio::fs;

use crate::entity::organization_node::{Model, TreeNode};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::common;
use crate::org::{reader, TreeAssembler};
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Import result payload
#[derive(Debug, Serialize)]
pub struct UploadData {
    #[serde(rename = "totalNodes")]
    pub total_nodes: u64,
    pub nodes: usize,
}

/// POST /api/organization/upload
pub async fn upload_sheet(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadData>>> {
    let temp_path = receive_sheet(&state, &mut multipart).await?;

    let result = import_sheet(&state, &temp_path).await;
    common::remove_temp(&temp_path).await;
    let (total_nodes, parsed_rows) = result?;

    tracing::info!("Organization chart rebuilt: {} nodes", total_nodes);

    Ok(Json(ApiResponse::success_with(
        "组织架构更新成功",
        UploadData {
            total_nodes,
            nodes: parsed_rows,
        },
    )))
}

/// Stream the uploaded workbook to a temp file, enforcing extension and size
async fn receive_sheet(state: &AppState, multipart: &mut Multipart) -> AppResult<PathBuf> {
    let tmp_dir = state.config.tmp_dir();
    fs::create_dir_all(&tmp_dir).await?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("上传数据无效: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let ext = common::extension_of(&file_name);
        if !matches!(ext.as_str(), "xlsx" | "xls") {
            return Err(AppError::BadRequest(
                "只支持Excel文件格式 (.xlsx, .xls)".to_string(),
            ));
        }

        let temp_path = tmp_dir.join(format!("org-{}.{}", uuid::Uuid::new_v4(), ext));
        match common::stream_to_file(&mut field, &temp_path, state.config.max_sheet_size).await {
            Ok(_) => return Ok(temp_path),
            Err(e) => {
                common::remove_temp(&temp_path).await;
                return Err(e);
            }
        }
    }

    Err(AppError::BadRequest("请上传Excel文件".to_string()))
}

/// Parse, validate, and atomically replace the persisted tree.
/// Returns (inserted node count, parsed row count).
async fn import_sheet(state: &AppState, path: &FsPath) -> AppResult<(u64, usize)> {
    // calamine is synchronous; keep the parse off the async workers
    let path_buf = path.to_path_buf();
    let rows = tokio::task::spawn_blocking(move || reader::parse_workbook(&path_buf))
        .await
        .map_err(|e| AppError::Internal(format!("parse task failed: {}", e)))??;

    TreeAssembler::validate(&rows)?;

    let assembler = TreeAssembler::new(state.db.clone());
    let total = assembler.replace(&rows).await?;
    Ok((total, rows.len()))
}

/// GET /api/organization/tree
pub async fn get_tree(State(state): State<AppState>) -> AppResult<Json<ApiResponse<TreeNode>>> {
    let assembler = TreeAssembler::new(state.db.clone());
    match assembler.get_tree().await? {
        Some(tree) => Ok(Json(ApiResponse::success(tree))),
        None => Ok(Json(ApiResponse::null_data("暂无组织架构数据"))),
    }
}

/// GET /api/organization/nodes
pub async fn get_nodes(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Model>>>> {
    let assembler = TreeAssembler::new(state.db.clone());
    let nodes = assembler.get_all_nodes().await?;
    Ok(Json(ApiResponse::success(nodes)))
}

/// GET /api/organization/nodes/:id
pub async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Model>>> {
    let assembler = TreeAssembler::new(state.db.clone());
    let node = assembler
        .get_node_by_id(id)
        .await?
        .ok_or_not_found("节点不存在")?;
    Ok(Json(ApiResponse::success(node)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::connect_and_migrate;
    use crate::entity::organization_node::NodeType;
    use crate::org::NodeRow;

    async fn test_state() -> AppState {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        AppState::new(db, Config::default())
    }

    fn row(name: &str, level: i32, order: i32, parent: Option<&str>) -> NodeRow {
        NodeRow {
            name: name.to_string(),
            node_type: NodeType::Department,
            level,
            order_index: order,
            leader_name: None,
            parent_name: parent.map(str::to_string),
            personnel: None,
        }
    }

    #[tokio::test]
    async fn test_tree_endpoint_empty_and_populated() {
        let state = test_state().await;

        let Json(response) = get_tree(State(state.clone())).await.unwrap();
        assert!(response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("暂无组织架构数据"));

        let assembler = TreeAssembler::new(state.db.clone());
        assembler
            .replace(&[row("根", 0, 1, None), row("客堂", 1, 1, Some("根"))])
            .await
            .unwrap();

        let Json(response) = get_tree(State(state.clone())).await.unwrap();
        let tree = response.data.unwrap();
        assert_eq!(tree.name, "根");
        assert_eq!(tree.children.len(), 1);
    }

    #[tokio::test]
    async fn test_node_endpoint_not_found() {
        let state = test_state().await;
        let err = get_node(State(state), Path(999)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_import_leaves_no_temp_files() {
        use axum::body::Body;
        use axum::extract::FromRequest;
        use axum::http::Request;

        let dir = tempfile::tempdir().unwrap();
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        let config = Config {
            upload_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let state = AppState::new(db, config);

        // A .xlsx that is not actually a workbook fails at the parse step,
        // after the upload already landed in the temp directory
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"bad.xlsx\"\r\n",
            "Content-Type: application/octet-stream\r\n",
            "\r\n",
            "not a workbook\r\n",
            "--XBOUNDARY--\r\n"
        );
        let request = Request::builder()
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let multipart = Multipart::from_request(request, &()).await.unwrap();

        assert!(upload_sheet(State(state.clone()), multipart).await.is_err());

        let mut entries = fs::read_dir(state.config.tmp_dir()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
