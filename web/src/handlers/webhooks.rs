//! Payment provider webhooks.

use crate::middleware::CorrelationId;
use crate::{AppState, WebResult};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;
use transfer_core::error::WebhookError;
use transfer_core::payment::{PaymentEvent, PaymentEventOutcome};
use transfer_runtime::payment::SIGNATURE_HEADER;

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always `true`
    pub received: bool,
    /// What this delivery did
    pub outcome: &'static str,
}

/// Receives a payment event.
///
/// The signature is checked over the raw body before anything is parsed.
/// Without a configured signing secret every delivery is rejected.
/// Redelivered events are acknowledged with `already_processed` so the
/// provider stops retrying.
///
/// ```text
/// POST /api/webhooks/payments
/// Payment-Signature: t=1718000000,v1=<hex>
/// ```
pub async fn payment_event(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    headers: HeaderMap,
    body: Bytes,
) -> WebResult<Json<WebhookAck>> {
    let Some(verifier) = &state.verifier else {
        tracing::error!(correlation_id = %correlation_id, "Payment webhook received but no signing secret is configured");
        return Err(WebhookError::InvalidSignature("no signing secret configured".to_string()).into());
    };
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    verifier.verify(signature, &body, state.clock.now())?;

    let event = PaymentEvent::from_json(&body)?;
    let outcome = state.payments.process(&event).await?;

    if let PaymentEventOutcome::AlreadyProcessed { booking_id } = &outcome {
        tracing::info!(
            correlation_id = %correlation_id,
            event_id = %event.event_id,
            booking_id = %booking_id,
            "Duplicate payment event acknowledged"
        );
    }

    Ok(Json(WebhookAck {
        received: true,
        outcome: outcome.as_str(),
    }))
}
