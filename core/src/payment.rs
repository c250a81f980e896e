//! Payment-provider events and the booking transition they call for.
//!
//! Parsing and planning are pure. Applying a plan is the store's job, through
//! a single conditional write per booking (see
//! [`BookingStore`](crate::environment::BookingStore)).

use crate::booking::UnpaidOutcome;
use crate::error::WebhookError;
use crate::types::{BookingId, Price};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type sent when a checkout session finishes
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
/// Event type sent when a checkout session expires unpaid
pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";
/// Event type sent when a payment attempt fails
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Payment status the provider reports for a captured checkout
pub const PAID: &str = "paid";

/// Event types the engine reacts to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    /// Checkout completed (may or may not be paid)
    CheckoutCompleted,
    /// Checkout expired
    CheckoutExpired,
    /// Payment failed
    PaymentFailed,
    /// Anything else; acknowledged and ignored
    Other(String),
}

impl PaymentEventKind {
    /// Classifies a provider event type
    #[must_use]
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            CHECKOUT_COMPLETED => Self::CheckoutCompleted,
            CHECKOUT_EXPIRED => Self::CheckoutExpired,
            PAYMENT_FAILED => Self::PaymentFailed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Provider event type text
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckoutCompleted => CHECKOUT_COMPLETED,
            Self::CheckoutExpired => CHECKOUT_EXPIRED,
            Self::PaymentFailed => PAYMENT_FAILED,
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for PaymentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: EventObject,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct EventObject {
    id: Option<String>,
    amount_total: Option<u64>,
    amount: Option<u64>,
    currency: Option<String>,
    payment_status: Option<String>,
    payment_intent: Option<String>,
    metadata: Metadata,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Metadata {
    booking_id: Option<String>,
}

/// A verified payment-provider event, reduced to what the engine needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Provider event id
    pub event_id: String,
    /// Event kind
    pub kind: PaymentEventKind,
    /// Booking named in the metadata
    pub booking_id: Option<BookingId>,
    /// Provider payment status (`paid`, `unpaid`, ...)
    pub payment_status: Option<String>,
    /// Amount in provider minor units
    pub amount_minor: Option<u64>,
    /// Currency code
    pub currency: Option<String>,
    /// Payment intent id, or the object id when absent
    pub provider_transaction_id: Option<String>,
}

impl PaymentEvent {
    /// Parses a provider envelope.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::Malformed`] when the body is not a valid envelope or
    ///   the booking id is not a UUID
    pub fn from_json(body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;
        let object = envelope.data.object;

        let booking_id = object
            .metadata
            .booking_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<BookingId>()
                    .map_err(|e| WebhookError::Malformed(format!("booking_id '{id}': {e}")))
            })
            .transpose()?;

        Ok(Self {
            event_id: envelope.id,
            kind: PaymentEventKind::from_type(&envelope.event_type),
            booking_id,
            payment_status: object.payment_status,
            amount_minor: object.amount_total.or(object.amount),
            currency: object.currency,
            provider_transaction_id: object.payment_intent.or(object.id),
        })
    }

    /// Decides what this event should do to its booking.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::MissingBookingId`] for a handled event type without a
    ///   booking id
    /// - [`WebhookError::Malformed`] for a paid checkout without an amount
    pub fn plan(&self) -> Result<PaymentTransition, WebhookError> {
        let booking_id = match &self.kind {
            PaymentEventKind::Other(event_type) => {
                return Ok(PaymentTransition::Ignore {
                    reason: format!("unhandled event type {event_type}"),
                });
            }
            _ => self.booking_id.ok_or(WebhookError::MissingBookingId)?,
        };

        Ok(match self.kind {
            PaymentEventKind::CheckoutCompleted => {
                let status = self.payment_status.as_deref().unwrap_or("");
                if status == PAID {
                    let amount = self.amount_minor.ok_or_else(|| {
                        WebhookError::Malformed("paid checkout without amount_total".into())
                    })?;
                    PaymentTransition::Confirm {
                        booking_id,
                        amount: Price::from_minor_units(amount),
                        currency: self.currency.clone(),
                        provider_transaction_id: self
                            .provider_transaction_id
                            .clone()
                            .unwrap_or_else(|| self.event_id.clone()),
                    }
                } else {
                    PaymentTransition::Ignore {
                        reason: format!("checkout completed with payment status '{status}'"),
                    }
                }
            }
            PaymentEventKind::CheckoutExpired => PaymentTransition::Unpaid {
                booking_id,
                outcome: UnpaidOutcome::Expired,
            },
            PaymentEventKind::PaymentFailed | PaymentEventKind::Other(_) => {
                PaymentTransition::Unpaid {
                    booking_id,
                    outcome: UnpaidOutcome::Failed,
                }
            }
        })
    }
}

/// What a payment event asks the store to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentTransition {
    /// Mark paid and confirmed if not already paid
    Confirm {
        /// Booking to confirm
        booking_id: BookingId,
        /// Captured amount
        amount: Price,
        /// Currency, when reported
        currency: Option<String>,
        /// Provider transaction id
        provider_transaction_id: String,
    },
    /// Mark failed/expired if still pending
    Unpaid {
        /// Booking affected
        booking_id: BookingId,
        /// Failure or expiry
        outcome: UnpaidOutcome,
    },
    /// Acknowledge without touching any booking
    Ignore {
        /// Why the event was ignored
        reason: String,
    },
}

/// Result of processing one delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentEventOutcome {
    /// Booking moved to confirmed/paid by this delivery
    Confirmed {
        /// Booking confirmed
        booking_id: BookingId,
    },
    /// Booking moved to payment_failed by this delivery
    Failed {
        /// Booking affected
        booking_id: BookingId,
    },
    /// Booking moved to payment_expired by this delivery
    Expired {
        /// Booking affected
        booking_id: BookingId,
    },
    /// The booking was already past this transition; nothing changed
    AlreadyProcessed {
        /// Booking named by the event
        booking_id: BookingId,
    },
    /// Event type or payload does not call for a transition
    Ignored {
        /// Why
        reason: String,
    },
}

impl PaymentEventOutcome {
    /// Short label used in responses and metrics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Failed { .. } => "failed",
            Self::Expired { .. } => "expired",
            Self::AlreadyProcessed { .. } => "already_processed",
            Self::Ignored { .. } => "ignored",
        }
    }

    /// Whether this delivery changed booking state
    #[must_use]
    pub const fn applied(&self) -> bool {
        matches!(
            self,
            Self::Confirmed { .. } | Self::Failed { .. } | Self::Expired { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_123",
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[test]
    fn test_completed_paid_plans_confirmation() {
        let booking_id = BookingId::new();
        let body = envelope(
            CHECKOUT_COMPLETED,
            &json!({
                "id": "cs_1",
                "amount_total": 4800,
                "currency": "usd",
                "payment_status": "paid",
                "payment_intent": "pi_1",
                "metadata": { "booking_id": booking_id.to_string() }
            }),
        );
        let event = PaymentEvent::from_json(&body).unwrap();
        assert_eq!(event.kind, PaymentEventKind::CheckoutCompleted);
        assert_eq!(
            event.plan().unwrap(),
            PaymentTransition::Confirm {
                booking_id,
                amount: Price::new(48),
                currency: Some("usd".into()),
                provider_transaction_id: "pi_1".into(),
            }
        );
    }

    #[test]
    fn test_completed_unpaid_is_ignored() {
        let body = envelope(
            CHECKOUT_COMPLETED,
            &json!({
                "payment_status": "unpaid",
                "metadata": { "booking_id": BookingId::new().to_string() }
            }),
        );
        let plan = PaymentEvent::from_json(&body).unwrap().plan().unwrap();
        assert!(matches!(plan, PaymentTransition::Ignore { .. }));
    }

    #[test]
    fn test_failed_event_reads_amount_field() {
        let booking_id = BookingId::new();
        let body = envelope(
            PAYMENT_FAILED,
            &json!({
                "id": "pi_9",
                "amount": 2500,
                "metadata": { "booking_id": booking_id.to_string() }
            }),
        );
        let event = PaymentEvent::from_json(&body).unwrap();
        assert_eq!(event.amount_minor, Some(2500));
        assert_eq!(event.provider_transaction_id.as_deref(), Some("pi_9"));
        assert_eq!(
            event.plan().unwrap(),
            PaymentTransition::Unpaid {
                booking_id,
                outcome: UnpaidOutcome::Failed
            }
        );
    }

    #[test]
    fn test_paid_checkout_without_amount_is_malformed() {
        let body = envelope(
            CHECKOUT_COMPLETED,
            &json!({
                "payment_status": "paid",
                "metadata": { "booking_id": BookingId::new().to_string() }
            }),
        );
        let err = PaymentEvent::from_json(&body).unwrap().plan().unwrap_err();
        assert!(matches!(err, WebhookError::Malformed(_)));
    }

    #[test]
    fn test_missing_booking_id_is_rejected() {
        let body = envelope(CHECKOUT_EXPIRED, &json!({ "metadata": {} }));
        let err = PaymentEvent::from_json(&body).unwrap().plan().unwrap_err();
        assert_eq!(err, WebhookError::MissingBookingId);
    }

    #[test]
    fn test_unknown_type_is_ignored_without_booking_id() {
        let body = envelope("charge.refunded", &json!({}));
        let plan = PaymentEvent::from_json(&body).unwrap().plan().unwrap();
        assert!(matches!(plan, PaymentTransition::Ignore { .. }));
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            PaymentEvent::from_json(b"not json"),
            Err(WebhookError::Malformed(_))
        ));
        let body = envelope(
            CHECKOUT_EXPIRED,
            &json!({ "metadata": { "booking_id": "not-a-uuid" } }),
        );
        assert!(matches!(
            PaymentEvent::from_json(&body),
            Err(WebhookError::Malformed(_))
        ));
    }
}
