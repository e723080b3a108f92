//! Bearer token authentication middleware

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use studybuddy::{AuthenticatedUser, StudyError};

use super::jwt::TokenType;
use crate::state::AppState;

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Verify an access token and insert the caller as `AuthenticatedUser`.
/// No database access: the account type comes from the token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return StudyError::Unauthorized("Missing bearer token".to_string()).into_response();
    };

    let claims = match state.jwt.verify(token, TokenType::Access) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected token: {}", e);
            return StudyError::Unauthorized("Invalid or expired token".to_string())
                .into_response();
        }
    };

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.sub,
        account_type: claims.account_type,
    });
    next.run(request).await
}
