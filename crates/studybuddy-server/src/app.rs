//! Router assembly

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;
use crate::{auth, billing, notion};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        // Development: echo the caller's origin
        return layer.allow_origin(AllowOrigin::mirror_request());
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(auth::routes::public_routes())
        .merge(billing::routes::webhook_routes())
        .with_state(state.clone());

    // Everything else needs a valid access token
    let protected_routes = Router::new()
        .merge(auth::routes::protected_routes())
        .merge(billing::routes::protected_routes())
        .merge(notion::routes::notion_routes())
        .with_state(state.clone())
        .merge(studybuddy::routes::configure(state.study.clone()))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public_routes.merge(protected_routes))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins()))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "studybuddy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenType;
    use crate::config::Config;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::net::SocketAddr;
    use studybuddy::{AccountType, MongoDb};
    use tower::ServiceExt;

    const BOUNDARY: &str = "studybuddy-test-boundary";

    fn test_config(extra: &str) -> Config {
        toml::from_str(&format!(
            "jwt_secret = \"router-test-secret-0123\"\nstripe_webhook_secret = \"whsec_test\"\n{}",
            extra
        ))
        .unwrap()
    }

    /// State over a lazy client pointing at a closed port: anything that
    /// reaches the database fails, so these tests cover the checks before it
    async fn test_state(config: Config) -> Arc<AppState> {
        let db = MongoDb::connect_lazy("mongodb://127.0.0.1:1", "studybuddy_test")
            .await
            .unwrap();
        Arc::new(AppState::new(db, config).unwrap())
    }

    fn access_token(state: &AppState) -> String {
        state
            .jwt
            .issue("64b7f0c2a1b2c3d4e5f60718", "a@example.com", AccountType::Free, TokenType::Access)
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(test_config("")).await);
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let state = test_state(test_config("")).await;
        for (method, uri) in [
            ("GET", "/api/flashcards"),
            ("GET", "/api/uploads"),
            ("POST", "/api/quizzes/generate"),
            ("GET", "/api/folders"),
            ("GET", "/api/auth/me"),
            ("POST", "/api/checkout/session"),
            ("GET", "/api/notion/pages"),
        ] {
            let app = build_router(state.clone());
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app, request).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert_eq!(body["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn test_invalid_and_refresh_tokens_are_rejected() {
        let state = test_state(test_config("")).await;
        let refresh = state
            .jwt
            .issue("64b7f0c2a1b2c3d4e5f60718", "a@example.com", AccountType::Free, TokenType::Refresh)
            .unwrap();

        for token in ["garbage", refresh.as_str()] {
            let app = build_router(state.clone());
            let request = Request::get("/api/flashcards")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap();
            let (status, _) = send(app, request).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let state = test_state(test_config("")).await;
        let token = access_token(&state);
        let app = build_router(state);
        let (status, _) = send(
            app,
            json_request("POST", "/api/auth/refresh", None, json!({ "refreshToken": token })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_required_fields() {
        let state = test_state(test_config("")).await;
        let token = access_token(&state);

        let cases = [
            ("/api/auth/register", None, json!({ "email": "not-an-email", "password": "password123" })),
            ("/api/auth/register", None, json!({ "email": "a@example.com", "password": "short" })),
            ("/api/flashcards", Some(token.as_str()), json!({ "sessionName": "Cells" })),
            ("/api/flashcards/generate", Some(token.as_str()), json!({})),
            ("/api/uploads/text", Some(token.as_str()), json!({ "transcript": "  " })),
            ("/api/notion/import", Some(token.as_str()), json!({})),
            ("/api/notion/import", Some(token.as_str()), json!({ "pageId": "../users/me" })),
        ];
        for (uri, token, body) in cases {
            let app = build_router(state.clone());
            let (status, response) = send(app, json_request("POST", uri, token, body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(response["code"], "VALIDATION_ERROR", "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_generation_without_openai_key_is_500() {
        let state = test_state(test_config("")).await;
        let token = access_token(&state);
        let app = build_router(state);
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/api/summaries/generate",
                Some(&token),
                json!({ "uploadId": "64b7f0c2a1b2c3d4e5f60719" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_checkout_without_stripe_is_500() {
        let state = test_state(test_config("")).await;
        let token = access_token(&state);
        let app = build_router(state);
        let (status, body) = send(
            app,
            json_request("POST", "/api/checkout/session", Some(&token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_webhook_with_bad_signature_is_400() {
        let state = test_state(test_config("")).await;
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "client_reference_id": "64b7f0c2a1b2c3d4e5f60718" } }
        })
        .to_string();
        let now = chrono::Utc::now().timestamp();

        for signature in [
            None,
            Some(format!("t={},v1={}", now, "ab".repeat(32))),
            Some("garbage".to_string()),
        ] {
            let mut builder = Request::post("/api/webhook");
            if let Some(signature) = &signature {
                builder = builder.header("Stripe-Signature", signature.as_str());
            }
            let request = builder.body(Body::from(payload.clone())).unwrap();
            let (status, body) = send(build_router(state.clone()), request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{:?}", signature);
            assert_eq!(body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_oversize_upload_is_400() {
        let state = test_state(test_config("")).await;
        let token = access_token(&state);
        let limit = state.study.config.max_upload_bytes;

        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.txt\"\r\nContent-Type: text/plain\r\n\r\n",
            b = BOUNDARY
        )
        .into_bytes();
        body.extend(std::iter::repeat(b'a').take(limit + 1));
        body.extend(format!("\r\n--{}--\r\n", BOUNDARY).into_bytes());

        let request = Request::post("/api/uploads")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(build_router(state), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    /// Health request as seen from `peer`, optionally carrying X-Forwarded-For
    fn health_from(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
        let mut builder = Request::get("/health");
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("X-Forwarded-For", forwarded_for);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let peer: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let state = test_state(test_config("rate_limit_max_requests = 2")).await;
        for expected in [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS] {
            let request = health_from("198.51.100.4:40000", None);
            let (status, _) = send(build_router(state.clone()), request).await;
            assert_eq!(status, expected);
        }

        // Another client is unaffected
        let request = health_from("198.51.100.5:40000", None);
        let (status, _) = send(build_router(state), request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_ignores_rotating_forwarded_for() {
        let state = test_state(test_config("rate_limit_max_requests = 2")).await;
        let mut statuses = Vec::new();
        for i in 0..4 {
            let forwarded = format!("203.0.113.{}", i);
            let request = health_from("198.51.100.9:40000", Some(&forwarded));
            let (status, _) = send(build_router(state.clone()), request).await;
            statuses.push(status);
        }
        assert_eq!(
            statuses,
            [
                StatusCode::OK,
                StatusCode::OK,
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::TOO_MANY_REQUESTS,
            ]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_trusts_forwarded_for_behind_proxy() {
        let state = test_state(test_config(
            "rate_limit_max_requests = 1\ntrust_proxy = true",
        ))
        .await;
        // One proxy address, two distinct clients behind it
        for forwarded in ["203.0.113.1", "203.0.113.2"] {
            let request = health_from("10.0.0.1:40000", Some(forwarded));
            let (status, _) = send(build_router(state.clone()), request).await;
            assert_eq!(status, StatusCode::OK, "{}", forwarded);
        }
        let request = health_from("10.0.0.1:40000", Some("203.0.113.1"));
        let (status, _) = send(build_router(state), request).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_cors_layer_accepts_lists() {
        // Invalid entries are skipped rather than failing startup
        let _ = cors_layer(&["http://localhost:3000".to_string(), "bad\norigin".to_string()]);
        let _ = cors_layer(&[]);
    }
}
