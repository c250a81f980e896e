//! Fixture builders for bookings, fleet, pricing data and payment-provider
//! envelopes.

use chrono::{DateTime, Duration, Utc};
use transfer_core::booking::{Booking, BookingDetails, CustomerContact, NewBooking};
use transfer_core::fleet::{Driver, DriverStatus, Vehicle, VehicleStatus};
use transfer_core::payment::{CHECKOUT_COMPLETED, CHECKOUT_EXPIRED, PAYMENT_FAILED};
use transfer_core::pricing::{
    ActiveDiscount, PriceSource, PricingCatalog, PricingRule, TripType, VehicleClass,
};
use transfer_core::types::{
    BookingId, DiscountId, DriverId, Price, PricingRuleId, ReferenceCode, VehicleClassId,
    VehicleId, VehicleKind, ZoneCode,
};
use serde_json::json;
use transfer_core::zone::HotelZone;
use uuid::Uuid;

/// Id of the fixture sedan class
pub const SEDAN_CLASS: VehicleClassId = VehicleClassId::from_uuid(Uuid::from_u128(0x5ed4));
/// Id of the fixture SUV class
pub const SUV_CLASS: VehicleClassId = VehicleClassId::from_uuid(Uuid::from_u128(0x5b7));

/// An active driver with the given rating and no vehicle
#[must_use]
pub fn driver(name: &str, rating: Option<f64>) -> Driver {
    Driver {
        id: DriverId::new(),
        name: name.to_string(),
        phone: Some("+18095550100".to_string()),
        email: None,
        status: DriverStatus::Active,
        rating,
        vehicle_id: None,
    }
}

/// An available vehicle of `kind`
#[must_use]
pub fn vehicle(label: &str, kind: &str) -> Vehicle {
    Vehicle {
        id: VehicleId::new(),
        label: label.to_string(),
        vehicle_type: VehicleKind::new(kind),
        capacity: 4,
        status: VehicleStatus::Available,
    }
}

/// A pending, unpaid sedan booking picking up a day after `now`
#[must_use]
pub fn pending_booking(now: DateTime<Utc>) -> Booking {
    Booking::create(
        BookingId::new(),
        NewBooking {
            reference_code: None,
            customer: CustomerContact {
                name: "Ana Perez".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
            },
            pickup_location: "PUJ Airport".to_string(),
            dropoff_location: "Hard Rock Hotel".to_string(),
            pickup_at: now + Duration::days(1),
            passengers: 2,
            vehicle_type: VehicleKind::default(),
            total_price: Price::new(25),
            details: BookingDetails {
                trip_type: TripType::OneWay,
                price_source: PriceSource::Rule,
                base_price: Price::new(25),
                original_price: Price::new(25),
                discount_percent: 0.0,
                origin_zone: Some(ZoneCode::new("PUJ")),
                destination_zone: Some(ZoneCode::new("BAV")),
                vehicle_class: "Sedan".to_string(),
                notes: None,
            },
        },
        now,
    )
}

/// A booking that already carries a reference code
#[must_use]
pub fn pending_booking_with_reference(now: DateTime<Utc>, code: &str) -> Booking {
    let mut booking = pending_booking(now);
    booking.reference_code = Some(ReferenceCode::new(code));
    booking
}

/// Sedan (minimum fare 35) and SUV (no minimum fare) classes
#[must_use]
pub fn vehicle_classes() -> Vec<VehicleClass> {
    vec![
        VehicleClass {
            id: SEDAN_CLASS,
            name: "Sedan".to_string(),
            minimum_fare: Some(Price::new(35)),
            active: true,
        },
        VehicleClass {
            id: SUV_CLASS,
            name: "SUV".to_string(),
            minimum_fare: None,
            active: true,
        },
    ]
}

/// A pricing rule in force
#[must_use]
pub fn rule(class: VehicleClassId, origin: &str, destination: &str, base: u64) -> PricingRule {
    PricingRule {
        id: PricingRuleId::new(),
        vehicle_class_id: class,
        origin_zone: ZoneCode::new(origin),
        destination: destination.to_string(),
        base_price: Price::new(base),
        active: true,
    }
}

/// Catalog pricing PUJ → BAV at `base` for sedans
#[must_use]
pub fn catalog_with_base(base: u64) -> PricingCatalog {
    PricingCatalog {
        vehicle_classes: vehicle_classes(),
        rules: vec![
            rule(SEDAN_CLASS, "PUJ", "BAV", base),
            rule(SUV_CLASS, "PUJ", "BAV", base + 20),
        ],
    }
}

/// A Bavaro / La Romana hotel table
#[must_use]
pub fn hotel_zones() -> Vec<HotelZone> {
    vec![
        HotelZone {
            hotel_name: "Hard Rock Hotel".to_string(),
            zone_code: ZoneCode::new("BAV"),
            search_terms: vec![
                "hard rock".to_string(),
                "bavaro".to_string(),
                "macao".to_string(),
            ],
        },
        HotelZone {
            hotel_name: "Casa de Campo".to_string(),
            zone_code: ZoneCode::new("LRM"),
            search_terms: vec!["la romana".to_string()],
        },
    ]
}

/// An open-ended discount of `percent`
#[must_use]
pub fn discount(percent: f64) -> ActiveDiscount {
    ActiveDiscount {
        id: DiscountId::new(),
        percent,
        valid_from: None,
        valid_to: None,
        version: 1,
    }
}

// ============================================================================
// Payment-provider envelopes
// ============================================================================

fn envelope(event_id: &str, event_type: &str, object: serde_json::Value) -> Vec<u8> {
    json!({
        "id": event_id,
        "type": event_type,
        "data": { "object": object },
    })
    .to_string()
    .into_bytes()
}

/// `checkout.session.completed` with `payment_status: paid`
#[must_use]
pub fn checkout_completed(event_id: &str, booking_id: BookingId, amount_minor: u64) -> Vec<u8> {
    envelope(
        event_id,
        CHECKOUT_COMPLETED,
        json!({
            "id": format!("cs_{event_id}"),
            "amount_total": amount_minor,
            "currency": "usd",
            "payment_status": "paid",
            "payment_intent": format!("pi_{event_id}"),
            "metadata": { "booking_id": booking_id.to_string() },
        }),
    )
}

/// `checkout.session.expired`
#[must_use]
pub fn checkout_expired(event_id: &str, booking_id: BookingId) -> Vec<u8> {
    envelope(
        event_id,
        CHECKOUT_EXPIRED,
        json!({
            "id": format!("cs_{event_id}"),
            "payment_status": "unpaid",
            "metadata": { "booking_id": booking_id.to_string() },
        }),
    )
}

/// `payment_intent.payment_failed`
#[must_use]
pub fn payment_failed(event_id: &str, booking_id: BookingId) -> Vec<u8> {
    envelope(
        event_id,
        PAYMENT_FAILED,
        json!({
            "id": format!("pi_{event_id}"),
            "amount": 2500,
            "currency": "usd",
            "metadata": { "booking_id": booking_id.to_string() },
        }),
    )
}

/// An event type the engine does not handle
#[must_use]
pub fn unhandled_event(event_id: &str) -> Vec<u8> {
    envelope(event_id, "customer.created", json!({ "id": "cus_1" }))
}
