//! Integration tests for payment event processing
//!
//! Every delivery goes through the in-memory store's conditional writes, so
//! these tests exercise the same idempotency path production uses.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{Harness, WAIT, event};
use std::sync::Arc;
use transfer_core::booking::{BookingStatus, PaymentStatus, WorkflowStatus};
use transfer_core::error::WebhookError;
use transfer_core::notification::NotificationType;
use transfer_core::payment::PaymentEventOutcome;
use transfer_core::types::{BookingId, Price, ReferenceCode};
use transfer_runtime::PaymentConfig;
use transfer_testing::fixtures;

// ============================================================================
// Confirmation
// ============================================================================

#[tokio::test]
async fn test_confirmation_marks_booking_paid() {
    let h = Harness::new();
    let booking = h.pending_booking();

    let outcome = h
        .processor()
        .process(&event(&fixtures::checkout_completed("evt_1", booking.id, 2500)))
        .await
        .unwrap();

    assert_eq!(outcome, PaymentEventOutcome::Confirmed { booking_id: booking.id });
    let stored = h.store.booking(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.workflow_status, WorkflowStatus::PendingDispatch);

    let details = stored.payment_details.unwrap();
    assert_eq!(details.amount, Price::new(25));
    assert_eq!(details.currency, "usd");
    assert_eq!(details.provider_transaction_id, "pi_evt_1");
    assert_eq!(details.provider_event_id.as_deref(), Some("evt_1"));
    assert_eq!(details.paid_at, h.now());
}

#[tokio::test]
async fn test_redelivered_confirmation_has_effects_once() {
    let h = Harness::new();
    let booking = h.pending_booking();
    let processor = h.processor();
    let body = fixtures::checkout_completed("evt_1", booking.id, 2500);

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(processor.process(&event(&body)).await.unwrap());
    }

    assert_eq!(outcomes[0], PaymentEventOutcome::Confirmed { booking_id: booking.id });
    assert_eq!(outcomes[1], PaymentEventOutcome::AlreadyProcessed { booking_id: booking.id });
    assert_eq!(outcomes[2], PaymentEventOutcome::AlreadyProcessed { booking_id: booking.id });

    // customer email + admin email + admin sms
    assert!(h.notifier.wait_for(3, WAIT).await);
    h.settle().await;
    assert_eq!(h.notifier.sent().len(), 3);
    assert_eq!(h.notifier.deliveries(booking.id, NotificationType::BookingConfirmation), 1);
    assert_eq!(h.notifier.deliveries(booking.id, NotificationType::AdminNewBooking), 2);
    assert_eq!(h.scheduler.scheduled(), vec![booking.id]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_deliveries_apply_once() {
    let h = Harness::new();
    let booking = h.pending_booking();
    let processor = Arc::new(h.processor());
    let body = fixtures::checkout_completed("evt_dup", booking.id, 2500);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let processor = Arc::clone(&processor);
            let event = event(&body);
            tokio::spawn(async move { processor.process(&event).await })
        })
        .collect();

    let mut confirmed = 0;
    let mut skipped = 0;
    for handle in futures::future::join_all(handles).await {
        match handle.unwrap().unwrap() {
            PaymentEventOutcome::Confirmed { .. } => confirmed += 1,
            PaymentEventOutcome::AlreadyProcessed { .. } => skipped += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(skipped, 7);
    assert!(h.notifier.wait_for(3, WAIT).await);
    h.settle().await;
    assert_eq!(h.notifier.deliveries(booking.id, NotificationType::BookingConfirmation), 1);
    assert_eq!(h.scheduler.scheduled().len(), 1);
}

#[tokio::test]
async fn test_existing_reference_code_is_kept() {
    let h = Harness::new();
    let booking = fixtures::pending_booking_with_reference(h.now(), "TRF-KEEP01");
    h.store.put_booking(booking.clone());

    h.processor()
        .process(&event(&fixtures::checkout_completed("evt_1", booking.id, 2500)))
        .await
        .unwrap();

    let stored = h.store.booking(booking.id).unwrap();
    assert_eq!(stored.reference_code, Some(ReferenceCode::new("TRF-KEEP01")));
}

#[tokio::test]
async fn test_missing_reference_code_is_stamped() {
    let h = Harness::new();
    let booking = h.pending_booking();
    assert!(booking.reference_code.is_none());

    h.processor()
        .process(&event(&fixtures::checkout_completed("evt_1", booking.id, 2500)))
        .await
        .unwrap();

    let code = h.store.booking(booking.id).unwrap().reference_code.unwrap();
    assert!(code.as_str().starts_with(ReferenceCode::PREFIX));
}

#[tokio::test]
async fn test_auto_dispatch_can_be_disabled() {
    let h = Harness::new();
    let booking = h.pending_booking();

    h.processor_with(PaymentConfig::default().with_auto_dispatch(false))
        .process(&event(&fixtures::checkout_completed("evt_1", booking.id, 2500)))
        .await
        .unwrap();

    assert!(h.scheduler.scheduled().is_empty());
    assert!(h.notifier.wait_for(3, WAIT).await);
}

#[tokio::test]
async fn test_capture_after_failure_or_expiry_leaves_booking_closed() {
    let cases: [(fn(&str, BookingId) -> Vec<u8>, BookingStatus, PaymentStatus); 2] = [
        (fixtures::payment_failed, BookingStatus::PaymentFailed, PaymentStatus::Failed),
        (fixtures::checkout_expired, BookingStatus::PaymentExpired, PaymentStatus::Expired),
    ];
    for (closing, status, payment_status) in cases {
        let h = Harness::new();
        let booking = h.pending_booking();
        let processor = h.processor();

        processor
            .process(&event(&closing("evt_closed", booking.id)))
            .await
            .unwrap();
        h.settle().await;
        let sent_before = h.notifier.sent().len();

        let outcome = processor
            .process(&event(&fixtures::checkout_completed("evt_ok", booking.id, 2500)))
            .await
            .unwrap();

        assert_eq!(outcome, PaymentEventOutcome::AlreadyProcessed { booking_id: booking.id });
        let stored = h.store.booking(booking.id).unwrap();
        assert_eq!(stored.status, status);
        assert_eq!(stored.payment_status, payment_status);
        assert!(stored.payment_details.is_none());
        assert_eq!(stored.workflow_status, WorkflowStatus::AwaitingPayment);

        h.settle().await;
        assert!(h.scheduler.scheduled().is_empty());
        assert_eq!(h.notifier.sent().len(), sent_before);
    }
}

// ============================================================================
// Failure and expiry
// ============================================================================

#[tokio::test]
async fn test_expiry_after_payment_is_a_no_op() {
    let h = Harness::new();
    let booking = h.pending_booking();
    let processor = h.processor();

    processor
        .process(&event(&fixtures::checkout_completed("evt_1", booking.id, 2500)))
        .await
        .unwrap();
    let outcome = processor
        .process(&event(&fixtures::checkout_expired("evt_2", booking.id)))
        .await
        .unwrap();

    assert_eq!(outcome, PaymentEventOutcome::AlreadyProcessed { booking_id: booking.id });
    let stored = h.store.booking(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_expiry_of_pending_booking() {
    let h = Harness::new();
    let booking = h.pending_booking();

    let outcome = h
        .processor()
        .process(&event(&fixtures::checkout_expired("evt_1", booking.id)))
        .await
        .unwrap();

    assert_eq!(outcome, PaymentEventOutcome::Expired { booking_id: booking.id });
    let stored = h.store.booking(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::PaymentExpired);
    assert_eq!(stored.payment_status, PaymentStatus::Expired);
    h.settle().await;
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_payment_failed_twice_notifies_once() {
    let h = Harness::new();
    let booking = h.pending_booking();
    let processor = h.processor();

    let first = processor
        .process(&event(&fixtures::payment_failed("evt_1", booking.id)))
        .await
        .unwrap();
    let second = processor
        .process(&event(&fixtures::payment_failed("evt_2", booking.id)))
        .await
        .unwrap();

    assert_eq!(first, PaymentEventOutcome::Failed { booking_id: booking.id });
    assert_eq!(second, PaymentEventOutcome::AlreadyProcessed { booking_id: booking.id });

    let stored = h.store.booking(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::PaymentFailed);
    assert_eq!(stored.payment_status, PaymentStatus::Failed);

    assert!(h.notifier.wait_for(1, WAIT).await);
    h.settle().await;
    assert_eq!(h.notifier.deliveries(booking.id, NotificationType::PaymentFailed), 1);
    assert!(h.scheduler.scheduled().is_empty());
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_unknown_booking_is_not_found() {
    let h = Harness::new();
    let unknown = BookingId::new();

    let err = h
        .processor()
        .process(&event(&fixtures::checkout_completed("evt_1", unknown, 2500)))
        .await
        .unwrap_err();

    assert_eq!(err, WebhookError::BookingNotFound(unknown));
    h.settle().await;
    assert!(h.notifier.sent().is_empty());
    assert!(h.scheduler.scheduled().is_empty());
}

#[tokio::test]
async fn test_missing_booking_id_is_rejected() {
    let h = Harness::new();
    let body = br#"{"id":"evt_1","type":"checkout.session.expired","data":{"object":{"metadata":{}}}}"#;

    let err = h.processor().process(&event(body)).await.unwrap_err();

    assert_eq!(err, WebhookError::MissingBookingId);
}

#[tokio::test]
async fn test_unhandled_event_is_ignored() {
    let h = Harness::new();
    let booking = h.pending_booking();

    let outcome = h
        .processor()
        .process(&event(&fixtures::unhandled_event("evt_1")))
        .await
        .unwrap();

    assert!(matches!(outcome, PaymentEventOutcome::Ignored { .. }));
    assert!(!outcome.applied());
    assert_eq!(h.store.booking(booking.id).unwrap(), booking);
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_confirmation_dispatches_in_background() {
    let h = Harness::new();
    h.store.add_vehicle(fixtures::vehicle("Camry", "sedan"));
    h.store.add_driver(fixtures::driver("Luis", Some(4.8)));
    let booking = h.pending_booking();

    h.dispatching_processor()
        .process(&event(&fixtures::checkout_completed("evt_1", booking.id, 2500)))
        .await
        .unwrap();

    assert!(h.wait_for_assignment(&booking).await);
    assert_eq!(h.store.assignments_for(booking.id).len(), 1);
    assert_eq!(
        h.store.booking(booking.id).unwrap().workflow_status,
        WorkflowStatus::Assigned
    );
}
