use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::auth_layer;
use crate::state::AppState;

pub mod health;

/// API response wrapper: `{success, message?, data?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn null_data(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration (intranet deployment, all origins allowed)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/me", get(handlers::auth::me))
        // Organization chart routes
        .route(
            "/organization/upload",
            post(handlers::organization::upload_sheet)
                .layer(DefaultBodyLimit::max(state.config.max_sheet_size)),
        )
        .route("/organization/tree", get(handlers::organization::get_tree))
        .route("/organization/nodes", get(handlers::organization::get_nodes))
        .route("/organization/nodes/:id", get(handlers::organization::get_node))
        // Regulation repository routes
        .route(
            "/regulation/upload",
            post(handlers::regulation::upload_file)
                .layer(DefaultBodyLimit::max(state.config.max_regulation_size)),
        )
        .route(
            "/regulation/department/:department",
            get(handlers::regulation::get_files_by_department),
        )
        .route("/regulation/view/:id", get(handlers::regulation::view_file))
        .route("/regulation/download/:id", get(handlers::regulation::download_file))
        .route("/regulation/:id", delete(handlers::regulation::delete_file));

    // Static file service for the frontend SPA
    let static_dir = "webapp/dist";
    let index_file = format!("{}/index.html", static_dir);
    let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(serve_dir)
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
