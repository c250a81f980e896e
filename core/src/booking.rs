//! Booking record and its payment state machine.
//!
//! A booking moves through three independent markers:
//!
//! ```text
//! status:          pending ─► confirmed ─► in_progress ─► completed
//!                     │
//!                     ├─► payment_failed
//!                     └─► payment_expired
//!
//! payment_status:  pending ─► paid            (terminal, idempotent)
//!                     └─► failed | expired  (terminal)
//!
//! workflow_status: awaiting_payment ─► pending_dispatch ─► assigned ─► in_progress ─► completed
//! ```
//!
//! `status` only becomes `confirmed` as a consequence of `payment_status`
//! becoming `paid`; the store applies both in one conditional write.

use crate::macros::text_enum;
use crate::pricing::{FareQuote, PriceSource, TripType};
use crate::types::{BookingId, Price, ReferenceCode, VehicleKind, ZoneCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Trip-level booking status
    pub enum BookingStatus {
        /// Created, waiting for payment
        Pending => "pending",
        /// Payment captured
        Confirmed => "confirmed",
        /// Driver has started the trip
        InProgress => "in_progress",
        /// Trip finished
        Completed => "completed",
        /// Cancelled by policy
        Cancelled => "cancelled",
        /// Provider reported a failed payment
        PaymentFailed => "payment_failed",
        /// Checkout session expired unpaid
        PaymentExpired => "payment_expired",
    }
}

impl BookingStatus {
    /// Whether a driver may be dispatched: only once payment has confirmed
    /// the booking
    #[must_use]
    pub const fn is_dispatchable(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Terminal statuses never change again
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::PaymentFailed | Self::PaymentExpired
        )
    }
}

text_enum! {
    /// Payment status of a booking
    pub enum PaymentStatus {
        /// No outcome yet
        Pending => "pending",
        /// Captured; terminal
        Paid => "paid",
        /// Provider reported failure
        Failed => "failed",
        /// Checkout expired
        Expired => "expired",
        /// Refunded after capture
        Refunded => "refunded",
    }
}

impl PaymentStatus {
    /// Whether a completion event may still confirm the booking.
    ///
    /// Only `pending` does: `paid` is already applied, and `failed`,
    /// `expired` and `refunded` are closed.
    #[must_use]
    pub const fn accepts_confirmation(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether a captured payment arriving now needs a manual refund
    #[must_use]
    pub const fn is_closed_unpaid(&self) -> bool {
        matches!(self, Self::Failed | Self::Expired)
    }
}

text_enum! {
    /// Dispatch progress marker, distinct from payment and trip status
    pub enum WorkflowStatus {
        /// Waiting for the payment provider
        AwaitingPayment => "awaiting_payment",
        /// Paid, no driver bound yet
        PendingDispatch => "pending_dispatch",
        /// Driver and vehicle bound
        Assigned => "assigned",
        /// Trip underway
        InProgress => "in_progress",
        /// Trip finished
        Completed => "completed",
    }
}

/// Customer contact details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number (SMS notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Record stamped on a booking when its payment is captured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Amount captured, whole units
    pub amount: Price,
    /// ISO currency code as sent by the provider
    pub currency: String,
    /// Provider transaction / payment intent id
    pub provider_transaction_id: String,
    /// Provider event id that confirmed the payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_event_id: Option<String>,
    /// When the engine applied the confirmation
    pub paid_at: DateTime<Utc>,
}

/// Free-form details blob: trip type, pricing provenance, applied discount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    /// One-way or round-trip
    pub trip_type: TripType,
    /// Whether the price came from a rule or the class minimum
    pub price_source: PriceSource,
    /// Base price before discount and multiplier
    pub base_price: Price,
    /// Price without discount (same multiplier as the total)
    pub original_price: Price,
    /// Discount percent applied (0 when none)
    pub discount_percent: f64,
    /// Resolved origin zone
    #[serde(default)]
    pub origin_zone: Option<ZoneCode>,
    /// Resolved destination zone
    #[serde(default)]
    pub destination_zone: Option<ZoneCode>,
    /// Vehicle class name used for pricing
    pub vehicle_class: String,
    /// Customer notes (flight number, luggage)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookingDetails {
    /// Builds the details blob from a fare quote
    #[must_use]
    pub fn from_quote(quote: &FareQuote, notes: Option<String>) -> Self {
        Self {
            trip_type: quote.trip_type,
            price_source: quote.price_source,
            base_price: quote.base_price,
            original_price: quote.original_price,
            discount_percent: quote.discount_percent,
            origin_zone: quote.origin_zone.clone(),
            destination_zone: quote.destination_zone.clone(),
            vehicle_class: quote.vehicle_class.clone(),
            notes,
        }
    }
}

/// Data needed to insert a new booking. Fare is already computed.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBooking {
    /// Pre-generated reference code
    pub reference_code: Option<ReferenceCode>,
    /// Customer contact
    pub customer: CustomerContact,
    /// Pickup location text
    pub pickup_location: String,
    /// Dropoff location text
    pub dropoff_location: String,
    /// Pickup time
    pub pickup_at: DateTime<Utc>,
    /// Passenger count
    pub passengers: u16,
    /// Requested vehicle type
    pub vehicle_type: VehicleKind,
    /// Computed total
    pub total_price: Price,
    /// Pricing provenance
    pub details: BookingDetails,
}

/// A customer's requested trip plus its payment and fulfilment state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id
    pub id: BookingId,
    /// Human reference code, assigned exactly once
    pub reference_code: Option<ReferenceCode>,
    /// Customer contact
    pub customer: CustomerContact,
    /// Pickup location text
    pub pickup_location: String,
    /// Dropoff location text
    pub dropoff_location: String,
    /// Pickup time
    pub pickup_at: DateTime<Utc>,
    /// Passenger count
    pub passengers: u16,
    /// Requested vehicle type
    pub vehicle_type: VehicleKind,
    /// Computed total
    pub total_price: Price,
    /// Trip status
    pub status: BookingStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Dispatch progress
    pub workflow_status: WorkflowStatus,
    /// Stamped when payment is captured
    pub payment_details: Option<PaymentDetails>,
    /// Pricing provenance
    pub details: BookingDetails,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Materialises a freshly created booking
    #[must_use]
    pub fn create(id: BookingId, new: NewBooking, now: DateTime<Utc>) -> Self {
        Self {
            id,
            reference_code: new.reference_code,
            customer: new.customer,
            pickup_location: new.pickup_location,
            dropoff_location: new.dropoff_location,
            pickup_at: new.pickup_at,
            passengers: new.passengers,
            vehicle_type: new.vehicle_type,
            total_price: new.total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            workflow_status: WorkflowStatus::AwaitingPayment,
            payment_details: None,
            details: new.details,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether payment has been captured
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Paid)
    }

    /// Applies a payment confirmation in memory.
    ///
    /// Returns `false` without touching the booking unless both `status`
    /// and `payment_status` are still `pending`. Store implementations call
    /// this under their own atomicity guarantee.
    pub fn apply_confirmation(&mut self, confirmation: &PaymentConfirmation) -> bool {
        if self.status != BookingStatus::Pending || !self.payment_status.accepts_confirmation() {
            return false;
        }
        if self.reference_code.is_none() {
            self.reference_code = Some(confirmation.reference_code.clone());
        }
        self.payment_status = PaymentStatus::Paid;
        self.status = BookingStatus::Confirmed;
        if self.workflow_status == WorkflowStatus::AwaitingPayment {
            self.workflow_status = WorkflowStatus::PendingDispatch;
        }
        self.payment_details = Some(confirmation.details.clone());
        self.updated_at = confirmation.details.paid_at;
        true
    }

    /// Applies a failure or expiry outcome in memory.
    ///
    /// Only a booking that is still `pending` on both markers is affected.
    pub fn apply_unpaid_outcome(&mut self, outcome: UnpaidOutcome, now: DateTime<Utc>) -> bool {
        if self.status != BookingStatus::Pending || self.payment_status != PaymentStatus::Pending {
            return false;
        }
        self.status = outcome.booking_status();
        self.payment_status = outcome.payment_status();
        self.updated_at = now;
        true
    }
}

/// Conditional update applied when a completion event reports `paid`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Reference code to stamp if the booking has none yet
    pub reference_code: ReferenceCode,
    /// Payment record
    pub details: PaymentDetails,
}

/// Terminal outcome of an unpaid checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpaidOutcome {
    /// Provider reported a failed payment
    Failed,
    /// Checkout session expired
    Expired,
}

impl UnpaidOutcome {
    /// Booking status after this outcome
    #[must_use]
    pub const fn booking_status(self) -> BookingStatus {
        match self {
            Self::Failed => BookingStatus::PaymentFailed,
            Self::Expired => BookingStatus::PaymentExpired,
        }
    }

    /// Payment status after this outcome
    #[must_use]
    pub const fn payment_status(self) -> PaymentStatus {
        match self {
            Self::Failed => PaymentStatus::Failed,
            Self::Expired => PaymentStatus::Expired,
        }
    }
}
