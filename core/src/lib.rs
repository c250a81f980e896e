//! # Transfer Core
//!
//! Domain model for the transfer booking engine: quote → pay → dispatch.
//!
//! This crate is the functional core. It holds the records, their state
//! machines, the fare calculator and the error taxonomy, and declares the
//! traits through which the imperative shell (`transfer-runtime`) reaches
//! storage, notifications, the payment provider and the clock. Nothing here
//! performs I/O.
//!
//! ## Modules
//!
//! - [`types`]: identifiers and value objects
//! - [`booking`]: booking record and payment state machine
//! - [`fleet`]: drivers, vehicles, trip assignments and their lifecycle
//! - [`zone`]: location → pricing zone strategy
//! - [`pricing`]: catalog, active discount, fare calculator
//! - [`payment`]: provider events and the transitions they plan
//! - [`notification`]: notification requests and transition effects
//! - [`environment`]: injected dependency traits
//! - [`error`]: error enums and their [`ErrorKind`](error::ErrorKind)
//!
//! ## Example
//!
//! ```
//! use transfer_core::pricing::{FareCalculator, FareRequest, PricingCatalog, VehicleClass};
//! use transfer_core::types::{Price, VehicleClassId};
//! use transfer_core::zone::KeywordZoneResolver;
//!
//! let catalog = PricingCatalog {
//!     vehicle_classes: vec![VehicleClass {
//!         id: VehicleClassId::new(),
//!         name: "Sedan".into(),
//!         minimum_fare: Some(Price::new(40)),
//!         active: true,
//!     }],
//!     rules: vec![],
//! };
//! let request = FareRequest {
//!     origin: "PUJ".into(),
//!     destination: "Somewhere new".into(),
//!     ..FareRequest::default()
//! };
//! let quote = FareCalculator::compute(
//!     &request,
//!     &catalog,
//!     &KeywordZoneResolver::new(vec![]),
//!     None,
//!     chrono::Utc::now(),
//! )?;
//! assert_eq!(quote.total_price, Price::new(40));
//! # Ok::<(), transfer_core::error::FareError>(())
//! ```

#![forbid(unsafe_code)]

pub mod macros;

pub mod booking;
pub mod environment;
pub mod error;
pub mod fleet;
pub mod notification;
pub mod payment;
pub mod pricing;
pub mod types;
pub mod zone;

pub use macros::UnknownVariant;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
