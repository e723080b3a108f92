//! Stripe webhook signature check and event handling

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use studybuddy::AccountType;

use crate::auth::{BillingTarget, BillingUpdate};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    #[error("Malformed Stripe-Signature header")]
    Malformed,

    #[error("Signature timestamp outside tolerance")]
    Expired,

    #[error("No matching signature")]
    Mismatch,
}

/// Check a `Stripe-Signature` header (`t=...,v1=...[,v1=...]`) against the
/// raw payload. Any `v1` entry may match.
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Stripe event envelope
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// A user update derived from an event
#[derive(Debug, PartialEq)]
pub struct BillingAction {
    pub target: BillingTargetId,
    pub update: BillingUpdate,
}

/// Owned counterpart of `BillingTarget`
#[derive(Debug, PartialEq)]
pub enum BillingTargetId {
    User(String),
    Customer(String),
}

impl BillingTargetId {
    pub fn as_target(&self) -> BillingTarget<'_> {
        match self {
            BillingTargetId::User(id) => BillingTarget::User(id),
            BillingTargetId::Customer(id) => BillingTarget::Customer(id),
        }
    }
}

fn str_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map an event to the user update it implies. `None` for event types that
/// need no action or lack the identifiers to act on.
pub fn billing_action(event: &StripeEvent) -> Option<BillingAction> {
    let object = &event.data.object;
    let by_customer = || str_field(object, "customer").map(BillingTargetId::Customer);

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let user_id = str_field(object, "client_reference_id")?;
            Some(BillingAction {
                target: BillingTargetId::User(user_id),
                update: BillingUpdate {
                    account_type: Some(AccountType::Paid),
                    customer_id: str_field(object, "customer"),
                    subscription_id: str_field(object, "subscription"),
                    status: Some("active".to_string()),
                    ..Default::default()
                },
            })
        }
        "invoice.payment_succeeded" => Some(BillingAction {
            target: by_customer()?,
            update: BillingUpdate {
                account_type: Some(AccountType::Paid),
                status: Some("active".to_string()),
                ..Default::default()
            },
        }),
        "invoice.payment_failed" => Some(BillingAction {
            target: by_customer()?,
            update: BillingUpdate {
                status: Some("past_due".to_string()),
                ..Default::default()
            },
        }),
        "customer.subscription.updated" => {
            let status = str_field(object, "status")?;
            let account_type = if matches!(status.as_str(), "active" | "trialing") {
                AccountType::Paid
            } else {
                AccountType::Free
            };
            Some(BillingAction {
                target: by_customer()?,
                update: BillingUpdate {
                    account_type: Some(account_type),
                    subscription_id: str_field(object, "id"),
                    status: Some(status),
                    ..Default::default()
                },
            })
        }
        "customer.subscription.deleted" => Some(BillingAction {
            target: by_customer()?,
            update: BillingUpdate {
                account_type: Some(AccountType::Free),
                clear_subscription: true,
                status: Some("canceled".to_string()),
                ..Default::default()
            },
        }),
        _ => None,
    }
}
