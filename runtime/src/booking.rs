//! Booking creation and lookup.

use crate::config::PaymentConfig;
use crate::fare::FareService;
use crate::metrics::BookingMetrics;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use transfer_core::booking::{Booking, BookingDetails, CustomerContact, NewBooking};
use transfer_core::environment::{BookingStore, CheckoutGateway, CheckoutSession, Clock};
use transfer_core::error::BookingError;
use transfer_core::pricing::FareRequest;
use transfer_core::types::{BookingId, ReferenceCode, VehicleClassId, VehicleKind};

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERENCE_LENGTH: usize = 6;

/// Generates a `TRF-XXXXXX` reference code.
#[must_use]
pub fn generate_reference_code() -> ReferenceCode {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_LENGTH)
        .map(|_| char::from(REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())]))
        .collect();
    ReferenceCode::new(format!("{}{suffix}", ReferenceCode::PREFIX))
}

/// A customer's booking request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Customer name
    pub customer_name: String,
    /// Customer email
    pub customer_email: String,
    /// Customer phone
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Pickup location text
    pub pickup_location: String,
    /// Dropoff location text
    pub dropoff_location: String,
    /// Pickup time
    pub pickup_at: DateTime<Utc>,
    /// Passenger count
    pub passengers: u16,
    /// Vehicle class name
    #[serde(default)]
    pub vehicle_type: Option<String>,
    /// Explicit vehicle class
    #[serde(default)]
    pub vehicle_class_id: Option<VehicleClassId>,
    /// `one_way` or `round_trip`
    #[serde(default)]
    pub trip_type: Option<String>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    fn validate(&self, now: DateTime<Utc>) -> Result<(), BookingError> {
        let required = [
            ("customer_name", &self.customer_name),
            ("customer_email", &self.customer_email),
            ("pickup_location", &self.pickup_location),
            ("dropoff_location", &self.dropoff_location),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(BookingError::Validation(format!("{field} is required")));
        }
        if !self.customer_email.contains('@') {
            return Err(BookingError::Validation("customer_email is not an email address".into()));
        }
        if self.passengers == 0 {
            return Err(BookingError::Validation("passengers must be at least 1".into()));
        }
        if self.pickup_at < now {
            return Err(BookingError::Validation("pickup_at is in the past".into()));
        }
        Ok(())
    }

    fn fare_request(&self) -> FareRequest {
        FareRequest {
            origin: self.pickup_location.clone(),
            destination: self.dropoff_location.clone(),
            vehicle_type: self.vehicle_type.clone(),
            vehicle_class_id: self.vehicle_class_id,
            trip_type: self.trip_type.clone(),
        }
    }
}

/// Result of creating a booking.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BookingCreated {
    /// The stored booking
    pub booking: Booking,
    /// Checkout session, when one was created
    pub checkout: Option<CheckoutSession>,
    /// Total is below what the provider can charge; booking stays unpaid
    pub below_minimum_charge: bool,
    /// Soft failures that did not prevent creation
    pub warnings: Vec<String>,
}

/// Creates bookings with a computed fare and starts checkout.
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingStore>,
    fares: FareService,
    checkout: Arc<dyn CheckoutGateway>,
    clock: Arc<dyn Clock>,
    config: PaymentConfig,
}

impl BookingService {
    /// Creates a booking service
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        fares: FareService,
        checkout: Arc<dyn CheckoutGateway>,
        clock: Arc<dyn Clock>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            bookings,
            fares,
            checkout,
            clock,
            config,
        }
    }

    /// Validates the request, prices it, stores the booking and starts
    /// checkout.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError`] for invalid requests, fare failures and store
    /// failures. Checkout failures are reported in
    /// [`BookingCreated::warnings`].
    pub async fn create(&self, request: BookingRequest) -> Result<BookingCreated, BookingError> {
        let now = self.clock.now();
        request.validate(now)?;

        let quote = self.fares.quote(&request.fare_request()).await?;

        let new = NewBooking {
            reference_code: Some(generate_reference_code()),
            customer: CustomerContact {
                name: request.customer_name.trim().to_string(),
                email: request.customer_email.trim().to_string(),
                phone: request.customer_phone.filter(|p| !p.trim().is_empty()),
            },
            pickup_location: request.pickup_location.trim().to_string(),
            dropoff_location: request.dropoff_location.trim().to_string(),
            pickup_at: request.pickup_at,
            passengers: request.passengers,
            vehicle_type: VehicleKind::new(&quote.vehicle_class),
            total_price: quote.total_price,
            details: BookingDetails::from_quote(&quote, request.notes),
        };
        let booking = Booking::create(BookingId::new(), new, now);
        self.bookings.insert_booking(&booking).await?;

        tracing::info!(
            booking_id = %booking.id,
            reference_code = ?booking.reference_code,
            total = %booking.total_price,
            price_source = %booking.details.price_source,
            "Booking created"
        );

        if booking.total_price < self.config.minimum_charge {
            tracing::warn!(
                booking_id = %booking.id,
                total = %booking.total_price,
                minimum = %self.config.minimum_charge,
                "Booking total below minimum charge, left unpaid"
            );
            BookingMetrics::record_created("below_minimum");
            return Ok(BookingCreated {
                booking,
                checkout: None,
                below_minimum_charge: true,
                warnings: Vec::new(),
            });
        }

        let mut warnings = Vec::new();
        let checkout = match self
            .checkout
            .create_checkout(&booking, booking.total_price.minor_units(), &self.config.currency)
            .await
        {
            Ok(session) => {
                BookingMetrics::record_created("started");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(booking_id = %booking.id, error = %e, "Checkout session not created");
                BookingMetrics::record_created("failed");
                warnings.push(format!("checkout unavailable: {e}"));
                None
            }
        };

        Ok(BookingCreated {
            booking,
            checkout,
            below_minimum_charge: false,
            warnings,
        })
    }

    /// Loads a booking.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] or a store error.
    pub async fn get(&self, id: BookingId) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }
}
