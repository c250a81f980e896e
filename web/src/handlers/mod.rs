//! HTTP handlers, one module per resource.

pub mod bookings;
pub mod dispatch;
pub mod fares;
pub mod health;
pub mod webhooks;
