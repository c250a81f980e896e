//! Shared wiring for runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use transfer_core::booking::Booking;
use transfer_core::environment::Clock;
use transfer_core::payment::PaymentEvent;
use transfer_runtime::{
    DispatchConfig, DispatchEngine, EngineDispatchScheduler, FanoutConfig, NotificationFanout,
    PaymentConfig, PaymentEventProcessor,
};
use transfer_testing::mocks::wait_until;
use transfer_testing::{
    FixedClock, InMemoryStore, RecordingDispatchScheduler, RecordingNotifier, fixtures, test_clock,
};

pub const WAIT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub store: InMemoryStore,
    pub notifier: RecordingNotifier,
    pub scheduler: RecordingDispatchScheduler,
    pub clock: FixedClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::new())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self {
            store: InMemoryStore::new(),
            notifier,
            scheduler: RecordingDispatchScheduler::new(),
            clock: test_clock(),
        }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn fanout(&self) -> NotificationFanout {
        NotificationFanout::new(
            Arc::new(self.notifier.clone()),
            FanoutConfig::default()
                .with_admin_email("ops@example.com")
                .with_admin_phone("+18095550000"),
        )
    }

    /// Processor that records dispatch requests instead of running them
    pub fn processor(&self) -> PaymentEventProcessor {
        self.processor_with(PaymentConfig::default())
    }

    pub fn processor_with(&self, config: PaymentConfig) -> PaymentEventProcessor {
        PaymentEventProcessor::new(
            Arc::new(self.store.clone()),
            self.fanout(),
            Arc::new(self.scheduler.clone()),
            Arc::new(self.clock.clone()),
            config,
        )
    }

    /// Processor wired to a real dispatch engine
    pub fn dispatching_processor(&self) -> PaymentEventProcessor {
        PaymentEventProcessor::new(
            Arc::new(self.store.clone()),
            self.fanout(),
            Arc::new(EngineDispatchScheduler::new(Arc::new(self.engine()))),
            Arc::new(self.clock.clone()),
            PaymentConfig::default(),
        )
    }

    pub fn engine(&self) -> DispatchEngine {
        DispatchEngine::new(
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            self.fanout(),
            Arc::new(self.clock.clone()),
            DispatchConfig::default(),
        )
    }

    /// Stores and returns a pending booking
    pub fn pending_booking(&self) -> Booking {
        let booking = fixtures::pending_booking(self.now());
        self.store.put_booking(booking.clone());
        booking
    }

    /// Stores a booking that is already paid
    pub fn confirmed_booking(&self) -> Booking {
        let mut booking = fixtures::pending_booking(self.now());
        booking.status = transfer_core::booking::BookingStatus::Confirmed;
        booking.payment_status = transfer_core::booking::PaymentStatus::Paid;
        booking.workflow_status = transfer_core::booking::WorkflowStatus::PendingDispatch;
        self.store.put_booking(booking.clone());
        booking
    }

    /// Lets spawned deliveries run, then checks nothing more arrived
    pub async fn settle(&self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pub async fn wait_for_assignment(&self, booking: &Booking) -> bool {
        let store = self.store.clone();
        let id = booking.id;
        wait_until(WAIT, move || !store.assignments_for(id).is_empty()).await
    }
}

pub fn event(body: &[u8]) -> PaymentEvent {
    PaymentEvent::from_json(body).expect("fixture envelope parses")
}
