//! `BookingStore` over the `bookings` table.
//!
//! Payment transitions are single `UPDATE ... WHERE <guard> RETURNING`
//! statements, so of any number of concurrent deliveries exactly one gets a
//! row back. Both guards require a booking still `pending` on `status` and
//! `payment_status`, so `paid`, `failed` and `expired` are final.

use crate::PostgresStore;
use crate::rows::{self, BOOKING_COLUMNS, db, price_param};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use transfer_core::booking::{Booking, PaymentConfirmation, UnpaidOutcome};
use transfer_core::environment::BookingStore;
use transfer_core::error::StoreError;
use transfer_core::types::{BookingId, ReferenceCode};

#[async_trait]
impl BookingStore for PostgresStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO bookings (
                id, reference_code, customer_name, customer_email, customer_phone,
                pickup_location, dropoff_location, pickup_at, passengers, vehicle_type,
                total_price, status, payment_status, workflow_status, details,
                payment_details, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.reference_code.as_ref().map(ReferenceCode::as_str))
        .bind(&booking.customer.name)
        .bind(&booking.customer.email)
        .bind(booking.customer.phone.as_deref())
        .bind(&booking.pickup_location)
        .bind(&booking.dropoff_location)
        .bind(booking.pickup_at)
        .bind(i32::from(booking.passengers))
        .bind(booking.vehicle_type.as_str())
        .bind(price_param(booking.total_price)?)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.workflow_status.as_str())
        .bind(Json(&booking.details))
        .bind(booking.payment_details.as_ref().map(Json))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db("Failed to insert booking"))?;

        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("Failed to load booking"))?;

        row.as_ref().map(rows::booking).transpose()
    }

    async fn confirm_payment(
        &self,
        id: BookingId,
        confirmation: &PaymentConfirmation,
    ) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE bookings
            SET payment_status = 'paid',
                status = 'confirmed',
                workflow_status = CASE
                    WHEN workflow_status = 'awaiting_payment' THEN 'pending_dispatch'
                    ELSE workflow_status
                END,
                reference_code = COALESCE(reference_code, $2),
                payment_details = $3,
                updated_at = $4
            WHERE id = $1
              AND status = 'pending'
              AND payment_status = 'pending'
            RETURNING {BOOKING_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(confirmation.reference_code.as_str())
        .bind(Json(&confirmation.details))
        .bind(confirmation.details.paid_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to confirm payment"))?;

        row.as_ref().map(rows::booking).transpose()
    }

    async fn record_unpaid_outcome(
        &self,
        id: BookingId,
        outcome: UnpaidOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE bookings
            SET status = $2,
                payment_status = $3,
                updated_at = $4
            WHERE id = $1
              AND status = 'pending'
              AND payment_status = 'pending'
            RETURNING {BOOKING_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(outcome.booking_status().as_str())
        .bind(outcome.payment_status().as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to record payment outcome"))?;

        row.as_ref().map(rows::booking).transpose()
    }
}
