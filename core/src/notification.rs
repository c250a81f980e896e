//! Notification requests and the side effects produced by state transitions.
//!
//! Transitions return effects as values; the runtime executes them after the
//! state change has committed. Nothing here performs I/O.

use crate::booking::Booking;
use crate::fleet::{Driver, TripAssignment, Vehicle};
use crate::macros::text_enum;
use crate::types::BookingId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use smallvec::{SmallVec, smallvec};

text_enum! {
    /// Who a notification is for
    pub enum RecipientKind {
        /// The booking's customer
        Customer => "customer",
        /// Operations staff
        Admin => "admin",
        /// The assigned driver
        Driver => "driver",
    }
}

text_enum! {
    /// Delivery channel hint
    pub enum Channel {
        /// Email
        Email => "email",
        /// SMS
        Sms => "sms",
    }
}

text_enum! {
    /// Milestone that triggered a notification
    pub enum NotificationType {
        /// Payment captured, booking confirmed
        BookingConfirmation => "booking_confirmation",
        /// New paid booking, for operations
        AdminNewBooking => "admin_new_booking",
        /// Driver bound to a trip
        DriverAssignment => "driver_assignment",
        /// Payment attempt failed
        PaymentFailed => "payment_failed",
    }
}

/// Where to deliver. Admin addresses are filled in by the fanout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
}

impl Recipient {
    /// Address for `channel`, if known
    #[must_use]
    pub fn address(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Email => self.email.as_deref(),
            Channel::Sms => self.phone.as_deref(),
        }
    }
}

/// Channel hints; one or two entries in practice.
pub type Channels = SmallVec<[Channel; 2]>;

/// One logical notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Recipient role
    pub recipient_kind: RecipientKind,
    /// Recipient addresses
    pub recipient: Recipient,
    /// Booking the notification is about
    pub booking_id: BookingId,
    /// Milestone
    pub notification_type: NotificationType,
    /// Channels to attempt
    pub channels: Channels,
    /// Template data
    pub payload: serde_json::Value,
}

fn customer_channels(booking: &Booking) -> Channels {
    if booking.customer.phone.is_some() {
        smallvec![Channel::Email, Channel::Sms]
    } else {
        smallvec![Channel::Email]
    }
}

fn customer(booking: &Booking) -> Recipient {
    Recipient {
        name: Some(booking.customer.name.clone()),
        email: Some(booking.customer.email.clone()),
        phone: booking.customer.phone.clone(),
    }
}

fn booking_payload(booking: &Booking) -> serde_json::Value {
    json!({
        "reference_code": booking.reference_code,
        "customer_name": booking.customer.name,
        "pickup_location": booking.pickup_location,
        "dropoff_location": booking.dropoff_location,
        "pickup_at": booking.pickup_at,
        "passengers": booking.passengers,
        "vehicle_type": booking.vehicle_type,
        "total_price": booking.total_price,
        "trip_type": booking.details.trip_type,
    })
}

impl NotificationRequest {
    /// Customer confirmation after payment capture
    #[must_use]
    pub fn booking_confirmation(booking: &Booking) -> Self {
        Self {
            recipient_kind: RecipientKind::Customer,
            recipient: customer(booking),
            booking_id: booking.id,
            notification_type: NotificationType::BookingConfirmation,
            channels: customer_channels(booking),
            payload: booking_payload(booking),
        }
    }

    /// Operations alert for a new paid booking
    #[must_use]
    pub fn admin_new_booking(booking: &Booking) -> Self {
        let mut payload = booking_payload(booking);
        payload["customer_email"] = json!(booking.customer.email);
        payload["customer_phone"] = json!(booking.customer.phone);
        Self {
            recipient_kind: RecipientKind::Admin,
            recipient: Recipient::default(),
            booking_id: booking.id,
            notification_type: NotificationType::AdminNewBooking,
            channels: smallvec![Channel::Email, Channel::Sms],
            payload,
        }
    }

    /// Customer notice that the payment failed
    #[must_use]
    pub fn payment_failed(booking: &Booking) -> Self {
        Self {
            recipient_kind: RecipientKind::Customer,
            recipient: customer(booking),
            booking_id: booking.id,
            notification_type: NotificationType::PaymentFailed,
            channels: smallvec![Channel::Email],
            payload: booking_payload(booking),
        }
    }

    /// Driver alert for a new assignment
    #[must_use]
    pub fn driver_assignment(
        booking: &Booking,
        driver: &Driver,
        vehicle: &Vehicle,
        assignment: &TripAssignment,
    ) -> Self {
        let mut channels = Channels::new();
        if driver.phone.is_some() {
            channels.push(Channel::Sms);
        }
        if driver.email.is_some() {
            channels.push(Channel::Email);
        }
        let mut payload = booking_payload(booking);
        payload["assignment_id"] = json!(assignment.id);
        payload["vehicle"] = json!(vehicle.label);
        payload["customer_phone"] = json!(booking.customer.phone);
        Self {
            recipient_kind: RecipientKind::Driver,
            recipient: Recipient {
                name: Some(driver.name.clone()),
                email: driver.email.clone(),
                phone: driver.phone.clone(),
            },
            booking_id: booking.id,
            notification_type: NotificationType::DriverAssignment,
            channels,
            payload,
        }
    }
}

/// Per-channel delivery results for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Channels that delivered
    pub delivered: Channels,
    /// Channels that failed, with the reason
    pub failed: Vec<(Channel, String)>,
}

impl DeliveryReport {
    /// At least one channel delivered and at least one failed
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.delivered.is_empty() && !self.failed.is_empty()
    }
}

/// Side effect requested by a state transition.
#[derive(Clone, Debug, PartialEq)]
pub enum BookingEffect {
    /// Send a notification (fire-and-forget)
    Notify(NotificationRequest),
    /// Run automatic dispatch for the booking
    ScheduleDispatch(BookingId),
}

/// Effects of one transition; never more than a handful.
pub type Effects = SmallVec<[BookingEffect; 4]>;

/// Effects of a booking becoming paid: customer and admin notifications, and
/// automatic dispatch when enabled.
#[must_use]
pub fn confirmation_effects(booking: &Booking, auto_dispatch: bool) -> Effects {
    let mut effects: Effects = smallvec![
        BookingEffect::Notify(NotificationRequest::booking_confirmation(booking)),
        BookingEffect::Notify(NotificationRequest::admin_new_booking(booking)),
    ];
    if auto_dispatch {
        effects.push(BookingEffect::ScheduleDispatch(booking.id));
    }
    effects
}

/// Effects of a booking's payment failing.
#[must_use]
pub fn payment_failed_effects(booking: &Booking) -> Effects {
    smallvec![BookingEffect::Notify(NotificationRequest::payment_failed(booking))]
}
