//! Manual dispatch and trip progression.

use crate::middleware::CorrelationId;
use crate::{AppState, WebResult};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use transfer_core::fleet::{AssignmentStatus, TripAssignment};
use transfer_core::types::AssignmentId;
use transfer_runtime::{DispatchRequest, DispatchResult};

/// Successful dispatch body.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    /// Always `true`; failures use the error body
    pub success: bool,
    /// Assignment, driver, vehicle and message
    #[serde(flatten)]
    pub result: DispatchResult,
}

/// Requested lifecycle step.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// Next status
    pub status: AssignmentStatus,
}

/// Assigns a driver and vehicle to a booking.
///
/// Conflicts (already assigned, no vehicle, all drivers busy) return `409`
/// with the reason string.
///
/// ```text
/// POST /api/dispatch
/// {"booking_id": "...", "preferred_driver_id": "...", "vehicle_type": "suv"}
/// ```
pub async fn assign(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> WebResult<Json<DispatchResponse>> {
    let Json(request) = payload?;
    tracing::debug!(
        correlation_id = %correlation_id,
        booking_id = %request.booking_id,
        preferred_driver_id = ?request.preferred_driver_id,
        "Dispatch requested"
    );
    let result = state.dispatch.assign(&request).await?;
    Ok(Json(DispatchResponse {
        success: true,
        result,
    }))
}

/// Moves an assignment to its next status.
///
/// ```text
/// POST /api/assignments/:id/status
/// {"status": "accepted"}
/// ```
pub async fn advance(
    State(state): State<AppState>,
    id: Result<Path<AssignmentId>, PathRejection>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> WebResult<Json<TripAssignment>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    Ok(Json(state.dispatch.advance(id, update.status).await?))
}
