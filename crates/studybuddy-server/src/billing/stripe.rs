//! Minimal Stripe REST client (form-encoded requests, bearer secret key)

use serde::de::DeserializeOwned;
use serde::Deserialize;

use studybuddy::{StudyError, StudyResult};

use crate::config::Config;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// Parameters of a subscription checkout
#[derive(Debug, Clone)]
pub struct CheckoutParams<'a> {
    pub price_id: &'a str,
    pub user_id: &'a str,
    pub email: &'a str,
    /// Existing Stripe customer, reused instead of creating a new one
    pub customer_id: Option<&'a str>,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_url: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, api_url: &str, secret_key: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            success_url: "http://localhost:3000/billing/success".to_string(),
            cancel_url: "http://localhost:3000/billing/cancel".to_string(),
        }
    }

    pub fn with_redirects(mut self, success_url: &str, cancel_url: &str) -> Self {
        self.success_url = success_url.to_string();
        self.cancel_url = cancel_url.to_string();
        self
    }

    /// `None` when no secret key is configured
    pub fn from_config(config: &Config, http: reqwest::Client) -> Option<Self> {
        let key = config.stripe_secret_key.as_ref()?;
        let mut client = Self::new(http, &config.stripe_api_url, key.clone());
        if let (Some(success), Some(cancel)) =
            (&config.stripe_success_url, &config.stripe_cancel_url)
        {
            client = client.with_redirects(success, cancel);
        }
        Some(client)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> StudyResult<T> {
        let response = self
            .http
            .post(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StudyError::Upstream(format!(
                "Stripe returned {} for {}: {}",
                status, path, body
            )));
        }
        Ok(response.json::<T>().await?)
    }

    /// Create a subscription Checkout session tied to the user
    pub async fn create_checkout_session(
        &self,
        params: CheckoutParams<'_>,
    ) -> StudyResult<CheckoutSession> {
        let mut form = vec![
            ("mode", "subscription"),
            ("line_items[0][price]", params.price_id),
            ("line_items[0][quantity]", "1"),
            ("client_reference_id", params.user_id),
            ("success_url", self.success_url.as_str()),
            ("cancel_url", self.cancel_url.as_str()),
        ];
        match params.customer_id {
            Some(customer) => form.push(("customer", customer)),
            None => form.push(("customer_email", params.email)),
        }
        self.post_form("/v1/checkout/sessions", &form).await
    }

    /// Cancel at the end of the current billing period
    pub async fn cancel_at_period_end(&self, subscription_id: &str) -> StudyResult<Subscription> {
        self.post_form(
            &format!("/v1/subscriptions/{}", subscription_id),
            &[("cancel_at_period_end", "true")],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> StripeClient {
        StripeClient::new(reqwest::Client::new(), &server.uri(), "sk_test_123")
            .with_redirects("http://app.test/ok", "http://app.test/cancel")
    }

    #[tokio::test]
    async fn test_checkout_session_reuses_customer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("mode=subscription"))
            .and(body_string_contains("client_reference_id=user-1"))
            .and(body_string_contains("customer=cus_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.test/cs_test_1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server)
            .create_checkout_session(CheckoutParams {
                price_id: "price_1",
                user_id: "user-1",
                email: "a@example.com",
                customer_id: Some("cus_9"),
            })
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(
            session.url.as_deref(),
            Some("https://checkout.stripe.test/cs_test_1")
        );
    }

    #[tokio::test]
    async fn test_checkout_session_new_customer_uses_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(body_string_contains("customer_email=a%40example.com"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "cs_2" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server)
            .create_checkout_session(CheckoutParams {
                price_id: "price_1",
                user_id: "user-1",
                email: "a@example.com",
                customer_id: None,
            })
            .await
            .unwrap();
        assert_eq!(session.id, "cs_2");
        assert!(session.url.is_none());
    }

    #[tokio::test]
    async fn test_cancel_and_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/subscriptions/sub_1"))
            .and(body_string_contains("cancel_at_period_end=true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "sub_1",
                "status": "active",
                "cancel_at_period_end": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/subscriptions/sub_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such subscription"))
            .mount(&server)
            .await;

        let stripe = client(&server);
        let subscription = stripe.cancel_at_period_end("sub_1").await.unwrap();
        assert!(subscription.cancel_at_period_end);
        assert_eq!(subscription.status, "active");

        let err = stripe.cancel_at_period_end("sub_missing").await.unwrap_err();
        assert!(matches!(err, StudyError::Upstream(_)));
    }
}
