//! Error types for the booking engine.
//!
//! Every error maps onto one [`ErrorKind`], which is the taxonomy callers use to
//! decide how a failure is surfaced (validation / not-found / conflict are
//! reported to the caller verbatim, internal failures are logged).

use crate::booking::BookingStatus;
use crate::fleet::AssignmentStatus;
use crate::types::{AssignmentId, BookingId, DriverId, VehicleId, VehicleKind};
use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input. No side effects happened.
    Validation,
    /// Referenced entity does not exist. No side effects happened.
    NotFound,
    /// Request conflicts with current state; safe to retry later.
    Conflict,
    /// Request could not be authenticated (bad webhook signature).
    Unauthorized,
    /// Storage or other infrastructure failure.
    Internal,
}

// ═══════════════════════════════════════════════════════════
// Storage
// ═══════════════════════════════════════════════════════════

/// Failures reported by store implementations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Unique constraint: booking already has an active assignment.
    #[error("Booking {booking_id} already has an active assignment")]
    BookingAlreadyAssigned {
        /// Booking that is already bound
        booking_id: BookingId,
    },

    /// Unique constraint: driver already has an active assignment.
    #[error("Driver {driver_id} already has an active assignment")]
    DriverBusy {
        /// Driver that is already bound
        driver_id: DriverId,
    },

    /// Unique constraint: vehicle already bound to an active assignment.
    #[error("Vehicle {vehicle_id} already has an active assignment")]
    VehicleBusy {
        /// Vehicle that is already bound
        vehicle_id: VehicleId,
    },

    /// A persisted value could not be decoded into a domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Lock poisoning or similar in-process failure.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BookingAlreadyAssigned { .. }
            | Self::DriverBusy { .. }
            | Self::VehicleBusy { .. } => ErrorKind::Conflict,
            Self::Database(_) | Self::Corrupt(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Fares
// ═══════════════════════════════════════════════════════════

/// Fare computation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FareError {
    /// A required request field was empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Trip type was not `one_way` or `round_trip`.
    #[error("Unknown trip type: {0}")]
    InvalidTripType(String),

    /// No vehicle class could be selected for the request.
    #[error("No vehicle class available for {0}")]
    NoVehicleClass(String),

    /// Loading pricing configuration failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FareError {
    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) | Self::InvalidTripType(_) => ErrorKind::Validation,
            Self::NoVehicleClass(_) => ErrorKind::NotFound,
            Self::Store(e) => e.kind(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Bookings
// ═══════════════════════════════════════════════════════════

/// Booking creation and lookup failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookingError {
    /// Request failed validation.
    #[error("Invalid booking request: {0}")]
    Validation(String),

    /// Booking does not exist.
    #[error("Booking {0} not found")]
    NotFound(BookingId),

    /// Fare could not be computed.
    #[error(transparent)]
    Fare(#[from] FareError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Fare(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Payment webhooks
// ═══════════════════════════════════════════════════════════

/// Payment-provider event failures. None of these change booking state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WebhookError {
    /// Envelope signature missing, malformed, stale or wrong.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Envelope could not be parsed.
    #[error("Malformed payment event: {0}")]
    Malformed(String),

    /// Event metadata carries no booking id.
    #[error("Payment event has no booking id in metadata")]
    MissingBookingId,

    /// Event references a booking that does not exist.
    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WebhookError {
    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSignature(_) => ErrorKind::Unauthorized,
            Self::Malformed(_) | Self::MissingBookingId => ErrorKind::Validation,
            Self::BookingNotFound(_) => ErrorKind::NotFound,
            Self::Store(e) => e.kind(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Dispatch
// ═══════════════════════════════════════════════════════════

/// Dispatch assignment failures.
///
/// The display strings are the reasons returned to dispatch callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    /// Request failed validation.
    #[error("Invalid dispatch request: {0}")]
    Validation(String),

    /// Booking does not exist.
    #[error("Booking not found")]
    BookingNotFound(BookingId),

    /// Booking is not confirmed by payment, or is already finished.
    #[error("Booking is {status} and cannot be dispatched")]
    BookingNotDispatchable {
        /// Current booking status
        status: BookingStatus,
    },

    /// Booking already carries an active assignment.
    #[error("Booking already has an active assignment")]
    AlreadyAssigned {
        /// The booking
        booking_id: BookingId,
    },

    /// No vehicle of the requested class is available.
    #[error("No available vehicle of type {vehicle_type}")]
    NoAvailableVehicle {
        /// Requested vehicle type
        vehicle_type: VehicleKind,
    },

    /// Every active driver already has an active assignment.
    #[error("All drivers are busy")]
    AllDriversBusy,

    /// Assignment does not exist.
    #[error("Assignment not found")]
    AssignmentNotFound(AssignmentId),

    /// Requested status change is not the next lifecycle step.
    #[error("Cannot move assignment from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: AssignmentStatus,
        /// Requested status
        to: AssignmentStatus,
    },

    /// Assignment status changed concurrently.
    #[error("Assignment status changed concurrently, expected {expected}")]
    StaleTransition {
        /// Status the caller expected to advance from
        expected: AssignmentStatus,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(StoreError),
}

impl DispatchError {
    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidTransition { .. } => ErrorKind::Validation,
            Self::BookingNotFound(_) | Self::AssignmentNotFound(_) => ErrorKind::NotFound,
            Self::BookingNotDispatchable { .. }
            | Self::AlreadyAssigned { .. }
            | Self::NoAvailableVehicle { .. }
            | Self::AllDriversBusy
            | Self::StaleTransition { .. } => ErrorKind::Conflict,
            Self::Store(e) => e.kind(),
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BookingAlreadyAssigned { booking_id } => Self::AlreadyAssigned { booking_id },
            other => Self::Store(other),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Downstream collaborators
// ═══════════════════════════════════════════════════════════

/// Notification delivery failure. Never propagated past the fanout.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotifyError {
    /// Request had no channel to deliver on.
    #[error("No delivery channel for notification")]
    NoChannel,

    /// Every hinted channel failed.
    #[error("Delivery failed on all channels: {0}")]
    Undeliverable(String),
}

/// Checkout-session creation failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// Provider rejected the request.
    #[error("Checkout rejected: {reason}")]
    Rejected {
        /// Rejection reason
        reason: String,
    },

    /// Provider timed out.
    #[error("Checkout gateway timeout")]
    Timeout,

    /// Other provider failure.
    #[error("Checkout error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}
