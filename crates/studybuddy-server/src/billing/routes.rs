//! Checkout, cancellation and webhook routes

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use studybuddy::{AuthenticatedUser, StudyError, StudyResult};

use super::stripe::{CheckoutParams, StripeClient};
use super::webhook::{billing_action, verify_signature, StripeEvent};
use crate::auth::{AuthService, BillingTarget, BillingUpdate};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(rename = "priceId")]
    pub price_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Routes behind the auth middleware
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checkout/session", post(create_checkout_session))
        .route("/checkout/cancel", post(cancel_subscription))
}

/// Webhook route, authenticated by its signature
pub fn webhook_routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(handle_webhook))
}

fn stripe(state: &AppState) -> StudyResult<&StripeClient> {
    state
        .stripe
        .as_ref()
        .ok_or_else(|| StudyError::NotConfigured("STRIPE_SECRET_KEY is not set".to_string()))
}

async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Bytes,
) -> StudyResult<Json<CheckoutResponse>> {
    let stripe = stripe(&state)?;
    // The body is optional
    let request: CheckoutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CheckoutRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| StudyError::validation(format!("Invalid request body: {}", e)))?
    };
    let price_id = request
        .price_id
        .filter(|p| !p.trim().is_empty())
        .or_else(|| state.config.stripe_price_id.clone())
        .ok_or_else(|| StudyError::validation("priceId is required"))?;

    let account = AuthService::new((*state.db).clone())
        .find_by_id(&user.user_id)
        .await?;
    let session = stripe
        .create_checkout_session(CheckoutParams {
            price_id: &price_id,
            user_id: &user.user_id,
            email: &account.email,
            customer_id: account.stripe_customer_id.as_deref(),
        })
        .await?;

    tracing::info!(user_id = %user.user_id, session_id = %session.id, "Checkout session created");
    Ok(Json(CheckoutResponse {
        url: session.url,
        session_id: session.id,
    }))
}

async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> StudyResult<Json<Value>> {
    let stripe = stripe(&state)?;
    let service = AuthService::new((*state.db).clone());
    let account = service.find_by_id(&user.user_id).await?;
    let subscription_id = account
        .stripe_subscription_id
        .ok_or_else(|| StudyError::validation("No active subscription"))?;

    let subscription = stripe.cancel_at_period_end(&subscription_id).await?;
    service
        .update_billing(
            BillingTarget::User(&user.user_id),
            &BillingUpdate {
                status: Some(subscription.status.clone()),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(user_id = %user.user_id, subscription_id = %subscription.id, "Subscription set to cancel");
    Ok(Json(json!({
        "message": "Subscription will be canceled at the end of the billing period",
        "status": subscription.status,
        "cancelAtPeriodEnd": subscription.cancel_at_period_end,
    })))
}

/// Verify the signature over the raw body, then apply the event. Events that
/// need no action are acknowledged.
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StudyResult<Json<Value>> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| StudyError::NotConfigured("STRIPE_WEBHOOK_SECRET is not set".to_string()))?;

    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());
    verify_signature(&body, signature, secret, chrono::Utc::now().timestamp()).map_err(|e| {
        tracing::warn!("Webhook rejected: {}", e);
        StudyError::validation(format!("Webhook signature verification failed: {}", e))
    })?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| StudyError::validation(format!("Invalid webhook payload: {}", e)))?;

    match billing_action(&event) {
        Some(action) => {
            let matched = AuthService::new((*state.db).clone())
                .update_billing(action.target.as_target(), &action.update)
                .await?;
            if matched {
                tracing::info!(event_id = %event.id, event_type = %event.event_type, "Billing updated");
            } else {
                tracing::warn!(event_id = %event.id, event_type = %event.event_type, "No user for billing event");
            }
        }
        None => {
            tracing::debug!(event_type = %event.event_type, "Ignoring webhook event");
        }
    }

    Ok(Json(json!({ "received": true })))
}
