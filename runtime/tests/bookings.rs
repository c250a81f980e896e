//! Integration tests for fare quoting and booking creation

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use chrono::Duration;
use common::Harness;
use std::sync::Arc;
use transfer_core::booking::{BookingStatus, PaymentStatus, WorkflowStatus};
use transfer_core::error::{BookingError, ErrorKind, FareError};
use transfer_core::pricing::{FareRequest, PriceSource, TripType};
use transfer_core::types::{Price, VehicleKind, ZoneCode};
use transfer_core::zone::KeywordZoneResolver;
use transfer_runtime::{BookingRequest, BookingService, FareService, PaymentConfig};
use transfer_testing::{MockCheckoutGateway, fixtures};

fn fare_service(h: &Harness) -> FareService {
    FareService::new(
        Arc::new(h.store.clone()),
        Arc::new(KeywordZoneResolver::new(fixtures::hotel_zones())),
        Arc::new(h.clock.clone()),
    )
}

fn booking_service(h: &Harness, gateway: &MockCheckoutGateway, config: PaymentConfig) -> BookingService {
    BookingService::new(
        Arc::new(h.store.clone()),
        fare_service(h),
        Arc::new(gateway.clone()),
        Arc::new(h.clock.clone()),
        config,
    )
}

fn priced_harness() -> Harness {
    let h = Harness::new();
    h.store.set_catalog(fixtures::catalog_with_base(25));
    h.store.set_hotel_zones(fixtures::hotel_zones());
    h
}

fn request(h: &Harness) -> BookingRequest {
    BookingRequest {
        customer_name: "Ana Perez".to_string(),
        customer_email: "ana@example.com".to_string(),
        customer_phone: Some("+18095551234".to_string()),
        pickup_location: "Punta Cana Airport (PUJ)".to_string(),
        dropoff_location: "Hard Rock Hotel & Casino".to_string(),
        pickup_at: h.now() + Duration::days(3),
        passengers: 2,
        vehicle_type: None,
        vehicle_class_id: None,
        trip_type: None,
        notes: Some("Two surfboards".to_string()),
    }
}

fn fare(origin: &str, destination: &str, trip_type: Option<&str>) -> FareRequest {
    FareRequest {
        origin: origin.to_string(),
        destination: destination.to_string(),
        vehicle_type: None,
        vehicle_class_id: None,
        trip_type: trip_type.map(str::to_string),
    }
}

// ============================================================================
// Fares
// ============================================================================

#[tokio::test]
async fn test_quote_resolves_zones_and_rule() {
    let h = priced_harness();

    let quote = fare_service(&h)
        .quote(&fare("PUJ airport", "Hard Rock Hotel", None))
        .await
        .unwrap();

    assert_eq!(quote.origin_zone, Some(ZoneCode::new("PUJ")));
    assert_eq!(quote.destination_zone, Some(ZoneCode::new("BAV")));
    assert_eq!(quote.price_source, PriceSource::Rule);
    assert_eq!(quote.total_price, Price::new(25));
    assert_eq!(quote.vehicle_class, "Sedan");
}

#[tokio::test]
async fn test_quote_applies_discount_and_round_trip() {
    let h = priced_harness();
    h.store.set_discount(Some(fixtures::discount(20.0)));

    let quote = fare_service(&h)
        .quote(&fare("PUJ", "Bavaro beach villa", Some("round_trip")))
        .await
        .unwrap();

    assert_eq!(quote.trip_type, TripType::RoundTrip);
    assert_eq!(quote.base_price, Price::new(25));
    assert_eq!(quote.total_price, Price::new(38));
    assert!((quote.discount_percent - 20.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_expired_discount_is_ignored() {
    let h = priced_harness();
    let mut discount = fixtures::discount(50.0);
    discount.valid_to = Some(h.now() - Duration::days(1));
    h.store.set_discount(Some(discount));

    let quote = fare_service(&h).quote(&fare("PUJ", "Hard Rock", None)).await.unwrap();

    assert_eq!(quote.total_price, Price::new(25));
}

#[tokio::test]
async fn test_unknown_route_falls_back_to_minimum_fare() {
    let h = priced_harness();

    let quote = fare_service(&h)
        .quote(&fare("Santo Domingo", "Casa de Campo", None))
        .await
        .unwrap();

    assert_eq!(quote.price_source, PriceSource::MinimumFare);
    assert_eq!(quote.destination_zone, Some(ZoneCode::new("LRM")));
    assert_eq!(quote.total_price, Price::new(35));
}

#[tokio::test]
async fn test_invalid_fare_requests() {
    let h = priced_harness();
    let fares = fare_service(&h);

    let err = fares.quote(&fare("", "Hard Rock", None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = fares.quote(&fare("PUJ", "Hard Rock", Some("both_ways"))).await.unwrap_err();
    assert_eq!(err, FareError::InvalidTripType("both_ways".to_string()));

    let empty = Harness::new();
    let err = fare_service(&empty).quote(&fare("PUJ", "Hard Rock", None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Booking creation
// ============================================================================

#[tokio::test]
async fn test_create_stores_booking_and_starts_checkout() {
    let h = priced_harness();
    let gateway = MockCheckoutGateway::new();
    let service = booking_service(&h, &gateway, PaymentConfig::default());

    let created = service.create(request(&h)).await.unwrap();

    let booking = &created.booking;
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.workflow_status, WorkflowStatus::AwaitingPayment);
    assert_eq!(booking.total_price, Price::new(25));
    assert_eq!(booking.vehicle_type, VehicleKind::new("sedan"));
    assert_eq!(booking.details.notes.as_deref(), Some("Two surfboards"));
    assert!(booking.reference_code.is_some());

    assert!(created.checkout.is_some());
    assert!(created.warnings.is_empty());
    assert!(!created.below_minimum_charge);
    assert_eq!(gateway.calls(), vec![(booking.id, 2500)]);
    assert_eq!(h.store.booking(booking.id).as_ref(), Some(booking));
    assert_eq!(service.get(booking.id).await.unwrap(), *booking);
}

#[tokio::test]
async fn test_checkout_failure_is_a_warning() {
    let h = priced_harness();
    let gateway = MockCheckoutGateway::failing();
    let service = booking_service(&h, &gateway, PaymentConfig::default());

    let created = service.create(request(&h)).await.unwrap();

    assert!(created.checkout.is_none());
    assert_eq!(created.warnings.len(), 1);
    assert!(created.warnings[0].starts_with("checkout unavailable"));
    assert!(h.store.booking(created.booking.id).is_some());
}

#[tokio::test]
async fn test_below_minimum_charge_skips_checkout() {
    let h = priced_harness();
    let gateway = MockCheckoutGateway::new();
    let config = PaymentConfig::default().with_minimum_charge(Price::new(30));
    let service = booking_service(&h, &gateway, config);

    let created = service.create(request(&h)).await.unwrap();

    assert!(created.below_minimum_charge);
    assert!(created.checkout.is_none());
    assert!(gateway.calls().is_empty());
    assert_eq!(created.booking.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_invalid_booking_requests_store_nothing() {
    let h = priced_harness();
    let gateway = MockCheckoutGateway::new();
    let service = booking_service(&h, &gateway, PaymentConfig::default());

    let cases = [
        BookingRequest {
            customer_name: "  ".to_string(),
            ..request(&h)
        },
        BookingRequest {
            customer_email: "not-an-email".to_string(),
            ..request(&h)
        },
        BookingRequest {
            passengers: 0,
            ..request(&h)
        },
        BookingRequest {
            pickup_at: h.now() - Duration::hours(1),
            ..request(&h)
        },
    ];
    for case in cases {
        let err = service.create(case).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)), "{err:?}");
    }
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_get_unknown_booking() {
    let h = priced_harness();
    let service = booking_service(&h, &MockCheckoutGateway::new(), PaymentConfig::default());
    let id = transfer_core::types::BookingId::new();

    assert_eq!(service.get(id).await.unwrap_err(), BookingError::NotFound(id));
}
