//! Injected dependencies.
//!
//! Services receive these as `Arc<dyn Trait>` so production (`PostgreSQL`,
//! real clock) and test (in-memory, fixed clock) implementations are
//! interchangeable.
//!
//! # Atomicity contract
//!
//! Every method that changes shared state is a single conditional write. The
//! `Option` returned by the compare-and-set methods is `Some` only for the one
//! caller whose write was applied; every concurrent or repeated caller gets
//! `None` and must treat the call as a no-op.

use crate::booking::{Booking, PaymentConfirmation, UnpaidOutcome};
use crate::error::{GatewayError, NotifyError, StoreError};
use crate::fleet::{AssignmentStatus, DispatchAuditEntry, Driver, TripAssignment, Vehicle};
use crate::notification::{Channel, NotificationRequest};
use crate::pricing::{ActiveDiscount, PricingCatalog};
use crate::types::{AssignmentId, BookingId, DriverId, VehicleId, VehicleKind};
use crate::zone::HotelZone;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Booking persistence.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a new booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Loads a booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Marks the booking paid and confirmed unless it is already paid (or
    /// refunded). Stamps the reference code only if absent and sets the
    /// workflow to pending dispatch.
    ///
    /// Returns the updated booking when this call applied the change, `None`
    /// when the booking is missing or was already paid.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn confirm_payment(
        &self,
        id: BookingId,
        confirmation: &PaymentConfirmation,
    ) -> Result<Option<Booking>, StoreError>;

    /// Moves a booking that is still pending on both status markers to the
    /// failed or expired outcome.
    ///
    /// Returns the updated booking when this call applied the change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn record_unpaid_outcome(
        &self,
        id: BookingId,
        outcome: UnpaidOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<Booking>, StoreError>;
}

/// Read-only fleet data.
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Drivers with `active` status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn active_drivers(&self) -> Result<Vec<Driver>, StoreError>;

    /// Loads one driver regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError>;

    /// Vehicles of `kind` with `available` status, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn available_vehicles(&self, kind: &VehicleKind) -> Result<Vec<Vehicle>, StoreError>;
}

/// Trip assignment persistence.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// The booking's active assignment, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn active_assignment_for_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<TripAssignment>, StoreError>;

    /// Drivers holding an active assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn busy_driver_ids(&self) -> Result<HashSet<DriverId>, StoreError>;

    /// Vehicles bound to an active assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn bound_vehicle_ids(&self) -> Result<HashSet<VehicleId>, StoreError>;

    /// Inserts the assignment and sets the booking's workflow to `assigned`
    /// as one unit.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BookingAlreadyAssigned`] if the booking already has an
    ///   active assignment
    /// - [`StoreError::DriverBusy`] if the driver already has one
    /// - [`StoreError`] if the write fails
    async fn create_assignment(&self, assignment: &TripAssignment) -> Result<(), StoreError>;

    /// Loads one assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<TripAssignment>, StoreError>;

    /// Moves the assignment from `from` to `to` if its status is still
    /// `from`, updating the booking when `to` implies a booking transition.
    ///
    /// Returns `None` when the status had already changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn advance_assignment(
        &self,
        id: AssignmentId,
        from: AssignmentStatus,
        to: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<TripAssignment>, StoreError>;

    /// Appends a dispatch decision to the audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn append_audit(&self, entry: &DispatchAuditEntry) -> Result<(), StoreError>;
}

/// Read-only pricing configuration.
#[async_trait]
pub trait PricingStore: Send + Sync {
    /// Vehicle classes and rules in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn load_catalog(&self) -> Result<PricingCatalog, StoreError>;

    /// The discount record in force at `now`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn active_discount(&self, now: DateTime<Utc>) -> Result<Option<ActiveDiscount>, StoreError>;

    /// Hotel zone lookup table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn hotel_zones(&self) -> Result<Vec<HotelZone>, StoreError>;
}

/// Delivers one notification over one channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `request` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if delivery fails.
    async fn deliver(&self, request: &NotificationRequest, channel: Channel) -> Result<(), NotifyError>;
}

/// Checkout session handed back to the customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider session id
    pub session_id: String,
    /// Hosted payment page
    pub url: String,
}

/// Starts a hosted checkout with the payment provider.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Creates a checkout session for `booking`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the provider call fails.
    async fn create_checkout(
        &self,
        booking: &Booking,
        amount_minor: u64,
        currency: &str,
    ) -> Result<CheckoutSession, GatewayError>;
}

/// Triggers automatic dispatch for a newly paid booking.
pub trait DispatchScheduler: Send + Sync {
    /// Schedules dispatch; returns immediately.
    fn schedule(&self, booking_id: BookingId);
}
