//! Stripe checkout gateway.
//!
//! Talks to the payment processor's hosted-checkout API. The rest of the
//! crate depends only on the `CheckoutGateway` trait; Stripe specifics
//! (form encoding, minor units, metadata correlation) stay here.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::{
    config::StripeConfig,
    error::{AppError, AppResult},
};

/// Request to open a hosted checkout session for one payment
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub payment_id: i32,
    pub amount: Decimal,
    pub description: String,
}

/// A freshly created checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Paid,
    Unpaid,
    Unknown,
}

/// Session state as reported by the processor
#[derive(Debug, Clone)]
pub struct SessionDetails {
    pub session_id: String,
    pub status: SessionStatus,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    /// Correlation metadata written at session creation
    pub payment_id: Option<i32>,
    pub payer_email: Option<String>,
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Create a hosted checkout session; the payment id travels as
    /// correlation metadata and comes back on retrieval.
    async fn create_session(&self, request: &CreateSessionRequest) -> AppResult<CheckoutSession>;

    /// Fetch session state from the processor
    async fn retrieve_session(&self, session_id: &str) -> AppResult<SessionDetails>;
}

pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.secret_key)
    }

    /// Stripe amounts are integer minor units (cents)
    fn minor_units(amount: Decimal) -> AppResult<i64> {
        (amount * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| AppError::Internal(format!("Amount {} out of range", amount)))
    }
}

#[async_trait]
impl CheckoutGateway for StripeGateway {
    async fn create_session(&self, request: &CreateSessionRequest) -> AppResult<CheckoutSession> {
        let unit_amount = Self::minor_units(request.amount)?;

        // Stripe lets the redirect carry the session id back to us.
        let success_url = format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.config.success_url);

        let form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                self.config.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.description.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "metadata[payment_id]".to_string(),
                request.payment_id.to_string(),
            ),
        ];

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Idempotency-Key", format!("payment-{}", request.payment_id))
            .form(&form_params)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Stripe unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Stripe unreachable: {}", e)))?;

        if !status.is_success() {
            tracing::error!("Stripe session creation failed: status={}, body={}", status, body);
            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            return Err(AppError::PaymentGateway(message));
        }

        let session: StripeSessionResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::PaymentGateway(format!("Unexpected Stripe response: {}", e)))?;

        let checkout_url = session.url.ok_or_else(|| {
            AppError::PaymentGateway("Stripe session has no checkout URL".to_string())
        })?;

        tracing::info!("Created checkout session {} for payment {}", session.id, request.payment_id);

        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> AppResult<SessionDetails> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Stripe unreachable: {}", e)))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::InvalidSession(format!(
                "Unknown checkout session: {}",
                session_id
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Stripe unreachable: {}", e)))?;

        if !status.is_success() {
            tracing::error!("Stripe session retrieval failed: status={}, body={}", status, body);
            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            return Err(AppError::PaymentGateway(message));
        }

        let session: StripeSessionResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::PaymentGateway(format!("Unexpected Stripe response: {}", e)))?;

        let status = match session.payment_status.as_deref() {
            Some("paid") => SessionStatus::Paid,
            Some("unpaid") => SessionStatus::Unpaid,
            _ => SessionStatus::Unknown,
        };

        Ok(SessionDetails {
            session_id: session.id,
            status,
            amount: session.amount_total.map(|cents| Decimal::new(cents, 2)),
            currency: session.currency,
            payment_id: session
                .metadata
                .get("payment_id")
                .and_then(|v| v.parse().ok()),
            payer_email: session.customer_details.and_then(|c| c.email),
        })
    }
}

// ---------------------------------------------------------------------------
// Stripe API types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    customer_details: Option<StripeCustomerDetails>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> StripeConfig {
        StripeConfig {
            secret_key: "sk_test_abc123".to_string(),
            api_base_url: base_url.to_string(),
            currency: "usd".to_string(),
            success_url: "http://localhost:8080/api/v1/payments/success".to_string(),
            cancel_url: "http://localhost:8080/api/v1/payments/cancel".to_string(),
        }
    }

    #[tokio::test]
    async fn create_session_posts_amount_in_minor_units() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(body_string_contains("unit_amount%5D=995"))
            .and(body_string_contains("metadata%5Bpayment_id%5D=42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "url": "https://checkout.stripe.com/c/pay/cs_test_123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(test_config(&server.uri())).unwrap();
        let session = gateway
            .create_session(&CreateSessionRequest {
                payment_id: 42,
                amount: Decimal::new(995, 2),
                description: "Borrowing fee for \"Book 1\"".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_123");
        assert_eq!(
            session.checkout_url,
            "https://checkout.stripe.com/c/pay/cs_test_123"
        );
    }

    #[tokio::test]
    async fn create_session_surfaces_gateway_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": { "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(test_config(&server.uri())).unwrap();
        let err = gateway
            .create_session(&CreateSessionRequest {
                payment_id: 1,
                amount: Decimal::ONE,
                description: "fee".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PaymentGateway(msg) if msg.contains("declined")));
    }

    #[tokio::test]
    async fn retrieve_session_maps_paid_status_and_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "payment_status": "paid",
                "amount_total": 995,
                "currency": "usd",
                "metadata": { "payment_id": "42" },
                "customer_details": { "email": "reader@example.com" }
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(test_config(&server.uri())).unwrap();
        let details = gateway.retrieve_session("cs_test_123").await.unwrap();

        assert_eq!(details.status, SessionStatus::Paid);
        assert_eq!(details.payment_id, Some(42));
        assert_eq!(details.amount, Some(Decimal::new(995, 2)));
        assert_eq!(details.payer_email.as_deref(), Some("reader@example.com"));
    }

    #[tokio::test]
    async fn retrieve_unknown_session_is_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "message": "No such checkout.session: 'cs_missing'" }
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(test_config(&server.uri())).unwrap();
        let err = gateway.retrieve_session("cs_missing").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidSession(_)));
    }

    #[tokio::test]
    async fn retrieve_unpaid_session_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_open",
                "payment_status": "unpaid",
                "metadata": { "payment_id": "7" }
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(test_config(&server.uri())).unwrap();
        let details = gateway.retrieve_session("cs_open").await.unwrap();

        assert_eq!(details.status, SessionStatus::Unpaid);
    }
}
