//! # Transfer Runtime
//!
//! Imperative shell for the transfer booking engine. Each service owns its
//! collaborators as `Arc<dyn Trait>` from `transfer_core::environment` and
//! turns domain decisions into store writes, logs, metrics and
//! fire-and-forget notifications.
//!
//! ## Services
//!
//! - [`fare::FareService`]: quotes fares from the catalog and active discount
//! - [`booking::BookingService`]: creates bookings and starts checkout
//! - [`payment::PaymentEventProcessor`]: applies provider events idempotently
//! - [`payment::WebhookVerifier`]: checks webhook signatures
//! - [`dispatch::DispatchEngine`]: binds drivers and vehicles, advances trips
//! - [`dispatch::EngineDispatchScheduler`]: background dispatch after payment
//! - [`fanout::NotificationFanout`]: background notification delivery
//!
//! ## Wiring
//!
//! ```ignore
//! let fanout = NotificationFanout::new(Arc::new(LoggingNotifier), FanoutConfig::default());
//! let engine = Arc::new(DispatchEngine::new(
//!     store.clone(), store.clone(), store.clone(), fanout.clone(), clock.clone(),
//!     DispatchConfig::default(),
//! ));
//! let processor = PaymentEventProcessor::new(
//!     store.clone(), fanout, Arc::new(EngineDispatchScheduler::new(engine.clone())),
//!     clock, PaymentConfig::default(),
//! );
//! ```

#![forbid(unsafe_code)]

pub mod booking;
pub mod config;
pub mod dispatch;
pub mod fanout;
pub mod fare;
pub mod metrics;
pub mod payment;

pub use booking::{BookingCreated, BookingRequest, BookingService};
pub use config::{DispatchConfig, FanoutConfig, PaymentConfig};
pub use dispatch::{DispatchEngine, DispatchRequest, DispatchResult, EngineDispatchScheduler};
pub use fanout::{LoggingNotifier, NotificationFanout};
pub use fare::FareService;
pub use payment::{PaymentEventProcessor, WebhookVerifier};
