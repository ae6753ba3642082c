//! Authentication middleware
//!
//! Bearer-token (JWT) authentication for API routes. Public paths pass
//! through untouched; everything else requires a valid token whose subject
//! still exists in the user table.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AuthConfig;
use crate::entity::user;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Token claims: user id, username, role, expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: String,
    pub exp: i64,
}

/// Sign a token for an authenticated user
pub fn issue_token(user: &user::Model, auth: &AuthConfig) -> AppResult<String> {
    let expires = chrono::Utc::now() + chrono::Duration::days(auth.token_ttl_days);
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        exp: expires.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
}

/// Decode and verify a token; None for invalid or expired tokens
pub fn decode_token(token: &str, auth: &AuthConfig) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Authenticated user attached to request extensions
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == user::role::ADMIN
    }
}

/// Paths that don't require authentication
fn is_public_path(path: &str) -> bool {
    // Non-API routes are static frontend files
    if !path.starts_with("/api") {
        return true;
    }
    if path == "/api/health" {
        return true;
    }
    if path == "/api/auth/login" || path == "/api/auth/register" {
        return true;
    }
    // Organization chart endpoints are open to the whole intranet
    if path.starts_with("/api/organization") {
        return true;
    }
    false
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_public_path(&path) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("未授权，请先登录");
    };

    let Some(claims) = decode_token(token, &state.config.auth) else {
        return unauthorized("Token无效或已过期");
    };

    // Re-check the subject against the user table so deleted accounts lose
    // access immediately even with an unexpired token
    match user::Entity::find_by_id(claims.sub).one(&state.db).await {
        Ok(Some(model)) => {
            let current_user = CurrentUser {
                id: model.id,
                username: model.username,
                role: model.role,
            };
            request.extensions_mut().insert(current_user);
            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!("Token subject no longer exists: {}", claims.username);
            unauthorized("Token无效或已过期")
        }
        Err(e) => {
            tracing::error!("Database error during auth: {}", e);
            AppError::Database(e).into_response()
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": message})),
    )
        .into_response()
}
