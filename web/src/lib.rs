//! Axum HTTP surface for the transfer booking engine.
//!
//! Handlers are thin: they extract the request, call one runtime service and
//! map the result. Domain errors become responses through [`AppError`], so
//! every failure has the same `{"code", "error"}` body.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET  | `/health` | liveness |
//! | POST | `/api/fares/quote` | fare quote |
//! | POST | `/api/bookings` | create booking, start checkout |
//! | GET  | `/api/bookings/:id` | fetch booking |
//! | POST | `/api/webhooks/payments` | payment event (signature verified) |
//! | POST | `/api/dispatch` | assign driver and vehicle |
//! | POST | `/api/assignments/:id/status` | advance trip |
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(store, collaborators, payment, dispatch, fanout);
//! let app = transfer_web::router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checkout;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::AppError;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer};
pub use state::{AppState, Collaborators};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/fares/quote", post(handlers::fares::quote))
        .route("/api/bookings", post(handlers::bookings::create))
        .route("/api/bookings/:id", get(handlers::bookings::get))
        .route("/api/webhooks/payments", post(handlers::webhooks::payment_event))
        .route("/api/dispatch", post(handlers::dispatch::assign))
        .route("/api/assignments/:id/status", post(handlers::dispatch::advance))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
