//! Fare quotes.

use crate::{AppState, WebResult};
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use transfer_core::pricing::{FareQuote, FareRequest};

/// Quotes a fare for a route.
///
/// ```text
/// POST /api/fares/quote
/// {"origin": "PUJ airport", "destination": "Hard Rock Hotel", "vehicle_type": "Sedan"}
/// ```
pub async fn quote(
    State(state): State<AppState>,
    payload: Result<Json<FareRequest>, JsonRejection>,
) -> WebResult<Json<FareQuote>> {
    let Json(request) = payload?;
    let quote = state.fares.quote(&request).await?;
    Ok(Json(quote))
}
