//! Authentication API routes

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use studybuddy::routes::JsonBody;
use studybuddy::{AuthenticatedUser, StudyError, StudyResult};

use super::jwt::{TokenError, TokenPair, TokenType};
use super::service::{AuthService, Credentials, User, UserResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: String,
}

/// Token pair plus the user it was issued for
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserResponse,
}

/// Routes reachable without a token
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

/// Routes behind the auth middleware
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/me", get(me))
}

fn issue_for(state: &AppState, user: User) -> StudyResult<AuthResponse> {
    let tokens = state
        .jwt
        .issue_pair(&user.id_hex(), &user.email, user.account_type)
        .map_err(|e: TokenError| StudyError::Internal(e.to_string()))?;
    Ok(AuthResponse {
        tokens,
        user: user.into(),
    })
}

async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> StudyResult<impl IntoResponse> {
    let user = AuthService::new((*state.db).clone())
        .register(credentials)
        .await?;
    Ok((StatusCode::CREATED, Json(issue_for(&state, user)?)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> StudyResult<Json<AuthResponse>> {
    let user = AuthService::new((*state.db).clone())
        .login(&credentials)
        .await?;
    tracing::info!(user_id = %user.id_hex(), "User logged in");
    Ok(Json(issue_for(&state, user)?))
}

/// Exchange a refresh token for a new pair. The user is re-read so a changed
/// account type shows up in the new access token.
async fn refresh(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> StudyResult<Json<AuthResponse>> {
    let unauthorized = || StudyError::Unauthorized("Invalid or expired refresh token".to_string());
    if request.refresh_token.trim().is_empty() {
        return Err(StudyError::validation("refreshToken is required"));
    }
    let claims = state
        .jwt
        .verify(request.refresh_token.trim(), TokenType::Refresh)
        .map_err(|_| unauthorized())?;

    let user = match AuthService::new((*state.db).clone())
        .find_by_id(&claims.sub)
        .await
    {
        Ok(user) => user,
        Err(StudyError::NotFound { .. }) => return Err(unauthorized()),
        Err(e) => return Err(e),
    };
    Ok(Json(issue_for(&state, user)?))
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> StudyResult<Json<UserResponse>> {
    let user = AuthService::new((*state.db).clone())
        .find_by_id(&user.user_id)
        .await?;
    Ok(Json(user.into()))
}
