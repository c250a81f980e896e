//! Booking creation and lookup.

use crate::middleware::CorrelationId;
use crate::{AppState, WebResult};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
};
use transfer_core::booking::Booking;
use transfer_core::types::BookingId;
use transfer_runtime::{BookingCreated, BookingRequest};

/// Creates a booking and starts checkout.
///
/// Returns `201` with the stored booking, the checkout session (if any) and
/// soft warnings such as a checkout failure or a total below the minimum
/// charge.
///
/// ```text
/// POST /api/bookings
/// ```
pub async fn create(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> WebResult<(StatusCode, Json<BookingCreated>)> {
    let Json(request) = payload?;
    let created = state.bookings.create(request).await?;

    if !created.warnings.is_empty() {
        tracing::warn!(
            correlation_id = %correlation_id,
            booking_id = %created.booking.id,
            warnings = ?created.warnings,
            "Booking created with warnings"
        );
    }
    Ok((StatusCode::CREATED, Json(created)))
}

/// Fetches a booking.
///
/// ```text
/// GET /api/bookings/:id
/// ```
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<BookingId>, PathRejection>,
) -> WebResult<Json<Booking>> {
    let Path(id) = id?;
    Ok(Json(state.bookings.get(id).await?))
}
