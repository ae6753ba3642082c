//! Authentication handlers
//!
//! Implements login, current-user, and registration endpoints

use axum::{extract::State, Extension, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::entity::user::{self, UserResponse};
use crate::error::{AppError, AppResult, OptionExt};
use crate::middleware::auth::issue_token;
use crate::middleware::CurrentUser;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response payload
#[derive(Debug, Serialize)]
pub struct LoginData {
    pub user: UserResponse,
    pub token: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginData>>> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("用户名和密码不能为空".to_string()));
    }

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(&state.db)
        .await?;

    // Unknown user and wrong password share one message
    let Some(db_user) = found else {
        tracing::warn!("Login failed: user not found - {}", req.username);
        return Err(AppError::Unauthorized("用户名或密码错误".to_string()));
    };

    let password_valid = bcrypt::verify(&req.password, &db_user.password).unwrap_or(false);
    if !password_valid {
        tracing::warn!("Login failed: wrong password - {}", req.username);
        return Err(AppError::Unauthorized("用户名或密码错误".to_string()));
    }

    let token = issue_token(&db_user, &state.config.auth)?;
    tracing::info!("User logged in: {}", db_user.username);

    Ok(Json(ApiResponse::success_with(
        "登录成功",
        LoginData {
            user: db_user.into(),
            token,
        },
    )))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let model = user::Entity::find_by_id(current_user.id)
        .one(&state.db)
        .await?
        .ok_or_not_found("用户不存在")?;

    Ok(Json(ApiResponse::success(model.into())))
}

/// Register request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("用户名和密码不能为空".to_string()));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("用户名已存在".to_string()));
    }

    let role = user::role::normalize(req.role.as_deref().unwrap_or(user::role::USER));
    let hashed = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

    let now = chrono::Utc::now();
    let account = user::ActiveModel {
        username: Set(req.username.clone()),
        password: Set(hashed),
        role: Set(role.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = account.insert(&state.db).await?;

    tracing::info!("User registered: {} ({})", created.username, created.role);

    Ok(Json(ApiResponse::success_with("注册成功", created.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::connect_and_migrate;

    async fn test_state() -> AppState {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        AppState::new(db, Config::default())
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let state = test_state().await;

        let req = RegisterRequest {
            username: "abbot".to_string(),
            password: "secret".to_string(),
            role: Some("admin".to_string()),
        };
        let Json(response) = register(State(state.clone()), Json(req)).await.unwrap();
        assert!(response.success);
        assert_eq!(response.data.as_ref().unwrap().role, "admin");

        let req = LoginRequest {
            username: "abbot".to_string(),
            password: "secret".to_string(),
        };
        let Json(response) = login(State(state.clone()), Json(req)).await.unwrap();
        let data = response.data.unwrap();
        assert_eq!(data.user.username, "abbot");
        assert!(!data.token.is_empty());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = test_state().await;

        let req = RegisterRequest {
            username: "monk".to_string(),
            password: "secret".to_string(),
            role: None,
        };
        register(State(state.clone()), Json(req)).await.unwrap();

        let req = LoginRequest {
            username: "monk".to_string(),
            password: "wrong".to_string(),
        };
        let err = login(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let state = test_state().await;

        let req = RegisterRequest {
            username: "monk".to_string(),
            password: "secret".to_string(),
            role: None,
        };
        register(State(state.clone()), Json(req)).await.unwrap();

        let req = RegisterRequest {
            username: "monk".to_string(),
            password: "other".to_string(),
            role: None,
        };
        let err = register(State(state), Json(req)).await.unwrap_err();
        assert!(err.to_string().contains("用户名已存在"));
    }
}
