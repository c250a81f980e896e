//! Mock collaborators: clock, notifier, checkout gateway, dispatch scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use transfer_core::booking::Booking;
use transfer_core::environment::{
    CheckoutGateway, CheckoutSession, Clock, DispatchScheduler, Notifier,
};
use transfer_core::error::{GatewayError, NotifyError};
use transfer_core::notification::{Channel, NotificationRequest, NotificationType};
use transfer_core::types::BookingId;

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use transfer_testing::mocks::FixedClock;
/// use transfer_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

/// Notifier that records every delivery and can fail chosen channels.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(NotificationRequest, Channel)>>>,
    failing: Arc<Mutex<HashSet<Channel>>>,
}

impl RecordingNotifier {
    /// Creates a notifier that delivers everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery on `channel` fail
    #[must_use]
    pub fn failing_on(self, channel: Channel) -> Self {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(channel);
        }
        self
    }

    /// Every successful delivery so far
    #[must_use]
    pub fn sent(&self) -> Vec<(NotificationRequest, Channel)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Deliveries of `kind` for `booking_id`, summed over channels
    #[must_use]
    pub fn deliveries(&self, booking_id: BookingId, kind: NotificationType) -> usize {
        self.sent()
            .iter()
            .filter(|(req, _)| req.booking_id == booking_id && req.notification_type == kind)
            .count()
    }

    /// Waits until at least `n` deliveries were recorded or `timeout` passes.
    /// Returns whether the target was reached.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.sent().len() >= n).await
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, request: &NotificationRequest, channel: Channel) -> Result<(), NotifyError> {
        let fails = self.failing.lock().map(|f| f.contains(&channel)).unwrap_or(false);
        if fails {
            return Err(NotifyError::Undeliverable(format!("{channel} provider down")));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((request.clone(), channel));
        }
        Ok(())
    }
}

/// Dispatch scheduler that only records the bookings it was asked to dispatch.
#[derive(Clone, Default)]
pub struct RecordingDispatchScheduler {
    scheduled: Arc<Mutex<Vec<BookingId>>>,
}

impl RecordingDispatchScheduler {
    /// Creates an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookings scheduled so far, in order
    #[must_use]
    pub fn scheduled(&self) -> Vec<BookingId> {
        self.scheduled.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DispatchScheduler for RecordingDispatchScheduler {
    fn schedule(&self, booking_id: BookingId) {
        if let Ok(mut scheduled) = self.scheduled.lock() {
            scheduled.push(booking_id);
        }
    }
}

/// Checkout gateway returning a canned session or a canned failure.
#[derive(Clone, Debug)]
pub struct MockCheckoutGateway {
    /// Whether to simulate success or failure.
    pub should_succeed: bool,
    calls: Arc<Mutex<Vec<(BookingId, u64)>>>,
}

impl Default for MockCheckoutGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCheckoutGateway {
    /// Create a gateway that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            should_succeed: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a gateway that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_succeed: false,
            ..Self::new()
        }
    }

    /// `(booking, amount in minor units)` for each call
    #[must_use]
    pub fn calls(&self) -> Vec<(BookingId, u64)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CheckoutGateway for MockCheckoutGateway {
    async fn create_checkout(
        &self,
        booking: &Booking,
        amount_minor: u64,
        _currency: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((booking.id, amount_minor));
        }
        if self.should_succeed {
            Ok(CheckoutSession {
                session_id: format!("cs_test_{}", booking.id.as_uuid().simple()),
                url: format!("https://checkout.test/pay/{}", booking.id),
            })
        } else {
            Err(GatewayError::Timeout)
        }
    }
}

/// Polls `condition` every few milliseconds until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
