//! Payment webhook handling: signature verification and idempotent
//! application of provider events.
//!
//! Every transition is one conditional write in the store. Only the delivery
//! whose write was applied executes side effects, so redelivered or
//! concurrent duplicates never send a second confirmation or trigger a second
//! dispatch.

use crate::booking::generate_reference_code;
use crate::config::PaymentConfig;
use crate::fanout::NotificationFanout;
use crate::metrics::PaymentMetrics;
use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use transfer_core::booking::{PaymentConfirmation, PaymentDetails, UnpaidOutcome};
use transfer_core::environment::{BookingStore, Clock, DispatchScheduler};
use transfer_core::error::WebhookError;
use transfer_core::notification::{
    BookingEffect, Effects, confirmation_effects, payment_failed_effects,
};
use transfer_core::payment::{PaymentEvent, PaymentEventOutcome, PaymentTransition};
use transfer_core::types::BookingId;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "Payment-Signature";

// ═══════════════════════════════════════════════════════════
// Signature verification
// ═══════════════════════════════════════════════════════════

/// Verifies `t=<unix>,v1=<hex>` signatures over `"<t>.<body>"`.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Creates a verifier for `secret`
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>, tolerance: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            tolerance,
        }
    }

    /// Computes the hex signature for `timestamp` and `body`.
    #[must_use]
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> String {
        hex::encode(self.mac(timestamp, body))
    }

    /// Builds a complete header value for `body` signed at `timestamp`.
    #[must_use]
    pub fn header_value(&self, timestamp: i64, body: &[u8]) -> String {
        format!("t={timestamp},v1={}", self.sign(timestamp, body))
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length.
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return Vec::new();
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }

    /// Checks `header` against `body` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidSignature`] when the header is missing,
    /// malformed, outside the tolerance window or does not match.
    pub fn verify(
        &self,
        header: Option<&str>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), WebhookError> {
        let header =
            header.ok_or_else(|| WebhookError::InvalidSignature("missing signature header".into()))?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.trim().parse::<i64>().ok(),
                Some(("v1", value)) => candidates.push(value.trim()),
                _ => {}
            }
        }
        let timestamp = timestamp
            .ok_or_else(|| WebhookError::InvalidSignature("missing or invalid timestamp".into()))?;
        if candidates.is_empty() {
            return Err(WebhookError::InvalidSignature("no v1 signature".into()));
        }

        let skew = now.timestamp().abs_diff(timestamp);
        if skew > self.tolerance.as_secs() {
            return Err(WebhookError::InvalidSignature(format!(
                "timestamp outside tolerance ({skew}s)"
            )));
        }

        let expected = self.mac(timestamp, body);
        let matched = candidates.iter().any(|candidate| {
            hex::decode(candidate).is_ok_and(|given| constant_time_eq(&given, &expected))
        });
        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature("signature mismatch".into()))
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Event processing
// ═══════════════════════════════════════════════════════════

/// Applies payment events to bookings.
#[derive(Clone)]
pub struct PaymentEventProcessor {
    bookings: Arc<dyn BookingStore>,
    fanout: NotificationFanout,
    scheduler: Arc<dyn DispatchScheduler>,
    clock: Arc<dyn Clock>,
    config: PaymentConfig,
}

impl PaymentEventProcessor {
    /// Creates a processor
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        fanout: NotificationFanout,
        scheduler: Arc<dyn DispatchScheduler>,
        clock: Arc<dyn Clock>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            bookings,
            fanout,
            scheduler,
            clock,
            config,
        }
    }

    /// Processes one delivery.
    ///
    /// Idempotent: a delivery that finds the booking already past the
    /// transition returns [`PaymentEventOutcome::AlreadyProcessed`] and has
    /// no side effects.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::MissingBookingId`] / [`WebhookError::Malformed`] for
    ///   unusable events
    /// - [`WebhookError::BookingNotFound`] when the booking does not exist
    /// - [`WebhookError::Store`] on storage failure
    pub async fn process(&self, event: &PaymentEvent) -> Result<PaymentEventOutcome, WebhookError> {
        let result = self.apply(event).await;
        match &result {
            Ok(outcome) => {
                PaymentMetrics::record_event(event.kind.to_string(), outcome.as_str());
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.kind,
                    booking_id = ?event.booking_id,
                    error = %e,
                    "Payment event rejected"
                );
                PaymentMetrics::record_event(event.kind.to_string(), "rejected");
            }
        }
        result
    }

    async fn apply(&self, event: &PaymentEvent) -> Result<PaymentEventOutcome, WebhookError> {
        match event.plan()? {
            PaymentTransition::Ignore { reason } => {
                tracing::info!(
                    event_id = %event.event_id,
                    event_type = %event.kind,
                    reason = %reason,
                    "Payment event ignored"
                );
                Ok(PaymentEventOutcome::Ignored { reason })
            }
            PaymentTransition::Confirm {
                booking_id,
                amount,
                currency,
                provider_transaction_id,
            } => {
                let confirmation = PaymentConfirmation {
                    reference_code: generate_reference_code(),
                    details: PaymentDetails {
                        amount,
                        currency: currency.unwrap_or_else(|| self.config.currency.clone()),
                        provider_transaction_id,
                        provider_event_id: Some(event.event_id.clone()),
                        paid_at: self.clock.now(),
                    },
                };
                match self.bookings.confirm_payment(booking_id, &confirmation).await? {
                    Some(booking) => {
                        tracing::info!(
                            booking_id = %booking.id,
                            event_id = %event.event_id,
                            reference_code = ?booking.reference_code,
                            amount = %amount,
                            "Payment confirmed"
                        );
                        if amount != booking.total_price {
                            tracing::warn!(
                                booking_id = %booking.id,
                                captured = %amount,
                                expected = %booking.total_price,
                                "Captured amount differs from booking total"
                            );
                        }
                        self.execute(confirmation_effects(&booking, self.config.auto_dispatch));
                        Ok(PaymentEventOutcome::Confirmed { booking_id })
                    }
                    None => self.not_applied(event, booking_id, true).await,
                }
            }
            PaymentTransition::Unpaid { booking_id, outcome } => {
                let at = self.clock.now();
                match self.bookings.record_unpaid_outcome(booking_id, outcome, at).await? {
                    Some(booking) => {
                        tracing::info!(
                            booking_id = %booking.id,
                            event_id = %event.event_id,
                            status = %booking.status,
                            "Payment outcome recorded"
                        );
                        match outcome {
                            UnpaidOutcome::Failed => {
                                self.execute(payment_failed_effects(&booking));
                                Ok(PaymentEventOutcome::Failed { booking_id })
                            }
                            UnpaidOutcome::Expired => Ok(PaymentEventOutcome::Expired { booking_id }),
                        }
                    }
                    None => self.not_applied(event, booking_id, false).await,
                }
            }
        }
    }

    /// The conditional write matched nothing: either the booking is missing
    /// or it is already past this transition.
    ///
    /// A capture for a booking that already failed or expired leaves the
    /// booking closed; the money has to be returned by hand.
    async fn not_applied(
        &self,
        event: &PaymentEvent,
        booking_id: BookingId,
        captured: bool,
    ) -> Result<PaymentEventOutcome, WebhookError> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or(WebhookError::BookingNotFound(booking_id))?;
        if captured && booking.payment_status.is_closed_unpaid() {
            tracing::warn!(
                booking_id = %booking_id,
                event_id = %event.event_id,
                payment_status = %booking.payment_status,
                "Payment captured for a closed booking, refund required"
            );
            PaymentMetrics::record_event(event.kind.to_string(), "refund_required");
        }
        tracing::info!(
            booking_id = %booking_id,
            event_id = %event.event_id,
            event_type = %event.kind,
            status = %booking.status,
            payment_status = %booking.payment_status,
            "Payment event skipped, already processed"
        );
        Ok(PaymentEventOutcome::AlreadyProcessed { booking_id })
    }

    fn execute(&self, effects: Effects) {
        for effect in effects {
            match effect {
                BookingEffect::Notify(request) => self.fanout.notify(request),
                BookingEffect::ScheduleDispatch(booking_id) => self.scheduler.schedule(booking_id),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("whsec_test", Duration::from_secs(300))
    }

    #[test]
    fn test_valid_signature_is_accepted() {
        let v = verifier();
        let body = br#"{"id":"evt_1"}"#;
        let header = v.header_value(now().timestamp(), body);
        assert!(v.verify(Some(&header), body, now()).is_ok());
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let v = verifier();
        let header = v.header_value(now().timestamp(), b"original");
        let err = v.verify(Some(&header), b"tampered", now()).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature(_)));
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let v = verifier();
        let ts = now().timestamp() - 301;
        let header = v.header_value(ts, b"body");
        assert!(v.verify(Some(&header), b"body", now()).is_err());
    }

    #[test]
    fn test_wrong_secret_and_garbage_headers() {
        let other = WebhookVerifier::new("other", Duration::from_secs(300));
        let header = other.header_value(now().timestamp(), b"body");
        assert!(verifier().verify(Some(&header), b"body", now()).is_err());
        assert!(verifier().verify(None, b"body", now()).is_err());
        assert!(verifier().verify(Some("v1=abc"), b"body", now()).is_err());
        assert!(verifier().verify(Some("t=1,v1=zz"), b"body", now()).is_err());
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let v = verifier();
        let ts = now().timestamp();
        let header = format!("t={ts},v1=deadbeef,v1={}", v.sign(ts, b"body"));
        assert!(v.verify(Some(&header), b"body", now()).is_ok());
    }

    proptest! {
        #[test]
        fn prop_signed_body_verifies(body in prop::collection::vec(any::<u8>(), 0..256)) {
            let v = verifier();
            let header = v.header_value(now().timestamp(), &body);
            prop_assert!(v.verify(Some(&header), &body, now()).is_ok());
        }

        #[test]
        fn prop_flipped_byte_is_rejected(
            body in prop::collection::vec(any::<u8>(), 1..256),
            index in any::<usize>(),
        ) {
            let v = verifier();
            let header = v.header_value(now().timestamp(), &body);
            let mut tampered = body.clone();
            let i = index % tampered.len();
            tampered[i] ^= 0x01;
            prop_assert!(v.verify(Some(&header), &tampered, now()).is_err());
        }
    }
}
