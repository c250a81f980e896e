//! Row decoding and value conversion shared by the store modules.

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use std::str::FromStr;
use transfer_core::booking::{Booking, BookingDetails, CustomerContact, PaymentDetails};
use transfer_core::error::StoreError;
use transfer_core::fleet::{Driver, TripAssignment, Vehicle};
use transfer_core::types::{
    AssignmentId, BookingId, DriverId, Price, ReferenceCode, VehicleId, VehicleKind,
};
use uuid::Uuid;

pub(crate) const BOOKING_COLUMNS: &str = r"
    id, reference_code, customer_name, customer_email, customer_phone,
    pickup_location, dropoff_location, pickup_at, passengers, vehicle_type,
    total_price, status, payment_status, workflow_status, details,
    payment_details, created_at, updated_at
";

pub(crate) const DRIVER_COLUMNS: &str = "id, name, phone, email, status, rating, vehicle_id";

pub(crate) const VEHICLE_COLUMNS: &str = "id, label, vehicle_type, capacity, status";

pub(crate) const ASSIGNMENT_COLUMNS: &str =
    "id, booking_id, driver_id, vehicle_id, method, status, assigned_at, updated_at";

/// Maps a driver error to [`StoreError::Database`].
pub(crate) fn db(context: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Database(format!("{context}: {e}"))
}

fn corrupt(column: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{column}: {e}"))
}

pub(crate) fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(|e| corrupt(column, e))
}

fn parse<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let text: String = get(row, column)?;
    text.parse().map_err(|e| corrupt(column, e))
}

pub(crate) fn price(row: &PgRow, column: &str) -> Result<Price, StoreError> {
    let units: i64 = get(row, column)?;
    u64::try_from(units)
        .map(Price::new)
        .map_err(|e| corrupt(column, e))
}

pub(crate) fn optional_price(row: &PgRow, column: &str) -> Result<Option<Price>, StoreError> {
    let units: Option<i64> = get(row, column)?;
    units
        .map(|u| u64::try_from(u).map(Price::new).map_err(|e| corrupt(column, e)))
        .transpose()
}

/// Converts a price for binding to a `BIGINT` column.
pub(crate) fn price_param(price: Price) -> Result<i64, StoreError> {
    i64::try_from(price.units()).map_err(|e| StoreError::Database(format!("price out of range: {e}")))
}

pub(crate) fn booking(row: &PgRow) -> Result<Booking, StoreError> {
    let passengers: i32 = get(row, "passengers")?;
    let details: Json<BookingDetails> = get(row, "details")?;
    let payment_details: Option<Json<PaymentDetails>> = get(row, "payment_details")?;
    let vehicle_type: String = get(row, "vehicle_type")?;
    let reference_code: Option<String> = get(row, "reference_code")?;

    Ok(Booking {
        id: BookingId::from_uuid(get(row, "id")?),
        reference_code: reference_code.map(ReferenceCode::new),
        customer: CustomerContact {
            name: get(row, "customer_name")?,
            email: get(row, "customer_email")?,
            phone: get(row, "customer_phone")?,
        },
        pickup_location: get(row, "pickup_location")?,
        dropoff_location: get(row, "dropoff_location")?,
        pickup_at: get(row, "pickup_at")?,
        passengers: u16::try_from(passengers).map_err(|e| corrupt("passengers", e))?,
        vehicle_type: VehicleKind::new(vehicle_type),
        total_price: price(row, "total_price")?,
        status: parse(row, "status")?,
        payment_status: parse(row, "payment_status")?,
        workflow_status: parse(row, "workflow_status")?,
        payment_details: payment_details.map(|j| j.0),
        details: details.0,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub(crate) fn driver(row: &PgRow) -> Result<Driver, StoreError> {
    let vehicle_id: Option<Uuid> = get(row, "vehicle_id")?;
    Ok(Driver {
        id: DriverId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        phone: get(row, "phone")?,
        email: get(row, "email")?,
        status: parse(row, "status")?,
        rating: get(row, "rating")?,
        vehicle_id: vehicle_id.map(VehicleId::from_uuid),
    })
}

pub(crate) fn vehicle(row: &PgRow) -> Result<Vehicle, StoreError> {
    let capacity: i32 = get(row, "capacity")?;
    let vehicle_type: String = get(row, "vehicle_type")?;
    Ok(Vehicle {
        id: VehicleId::from_uuid(get(row, "id")?),
        label: get(row, "label")?,
        vehicle_type: VehicleKind::new(vehicle_type),
        capacity: u16::try_from(capacity).map_err(|e| corrupt("capacity", e))?,
        status: parse(row, "status")?,
    })
}

pub(crate) fn assignment(row: &PgRow) -> Result<TripAssignment, StoreError> {
    Ok(TripAssignment {
        id: AssignmentId::from_uuid(get(row, "id")?),
        booking_id: BookingId::from_uuid(get(row, "booking_id")?),
        driver_id: DriverId::from_uuid(get(row, "driver_id")?),
        vehicle_id: VehicleId::from_uuid(get(row, "vehicle_id")?),
        method: parse(row, "method")?,
        status: parse(row, "status")?,
        assigned_at: get(row, "assigned_at")?,
        updated_at: get(row, "updated_at")?,
    })
}
