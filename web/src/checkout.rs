//! Hosted checkout client for the payment provider.
//!
//! Creates a checkout session per booking through the provider's
//! form-encoded REST API. The booking id travels in the session metadata and
//! in the payment intent metadata, which is where the webhook handler reads
//! it back from.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use transfer_core::booking::Booking;
use transfer_core::environment::{CheckoutGateway, CheckoutSession};
use transfer_core::error::GatewayError;

/// Connection settings for the checkout API.
#[derive(Clone)]
pub struct CheckoutClientConfig {
    /// Secret API key, sent as a bearer token
    pub api_key: String,
    /// API base, e.g. `https://api.stripe.com/v1`
    pub api_url: String,
    /// Where the hosted page sends the customer after paying
    pub success_url: String,
    /// Where the hosted page sends the customer on cancel
    pub cancel_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for CheckoutClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutClientConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("success_url", &self.success_url)
            .field("cancel_url", &self.cancel_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// [`CheckoutGateway`] over the provider's checkout sessions endpoint.
#[derive(Clone, Debug)]
pub struct HostedCheckoutClient {
    client: Client,
    config: CheckoutClientConfig,
}

impl HostedCheckoutClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: CheckoutClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn form(&self, booking: &Booking, amount_minor: u64, currency: &str) -> Vec<(&'static str, String)> {
        let booking_id = booking.id.to_string();
        let mut form = vec![
            ("mode", "payment".to_string()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("client_reference_id", booking_id.clone()),
            ("customer_email", booking.customer.email.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", currency.to_string()),
            ("line_items[0][price_data][unit_amount]", amount_minor.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("Transfer: {} to {}", booking.pickup_location, booking.dropoff_location),
            ),
            ("metadata[booking_id]", booking_id.clone()),
            ("payment_intent_data[metadata][booking_id]", booking_id),
        ];
        if let Some(code) = &booking.reference_code {
            form.push(("metadata[reference_code]", code.as_str().to_string()));
        }
        form
    }
}

#[async_trait]
impl CheckoutGateway for HostedCheckoutClient {
    async fn create_checkout(
        &self,
        booking: &Booking,
        amount_minor: u64,
        currency: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.config.api_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .header("Idempotency-Key", format!("checkout-{}", booking.id))
            .form(&self.form(booking, amount_minor, currency))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Other {
                        message: e.to_string(),
                    }
                }
            })?;

        match response.status() {
            StatusCode::OK => {
                let session = response
                    .json::<SessionResponse>()
                    .await
                    .map_err(|e| GatewayError::Other {
                        message: format!("unreadable checkout session: {e}"),
                    })?;
                tracing::info!(booking_id = %booking.id, session_id = %session.id, "Checkout session created");
                Ok(CheckoutSession {
                    session_id: session.id,
                    url: session.url,
                })
            }
            status if status.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                let reason = serde_json::from_str::<ErrorResponse>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                Err(GatewayError::Rejected { reason })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(GatewayError::Other {
                    message: format!("status {}: {body}", status.as_u16()),
                })
            }
        }
    }
}
