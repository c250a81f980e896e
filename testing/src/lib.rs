//! # Transfer Testing
//!
//! Testing utilities for the transfer booking engine.
//!
//! This crate provides:
//! - [`store::InMemoryStore`]: every store trait, atomically, in memory
//! - [`mocks`]: fixed clock, recording notifier, recording dispatch
//!   scheduler, mock checkout gateway
//! - [`fixtures`]: drivers, vehicles, bookings and pricing data
//!
//! ## Example
//!
//! ```ignore
//! use transfer_testing::{fixtures, mocks::test_clock, store::InMemoryStore};
//!
//! #[tokio::test]
//! async fn test_dispatch() {
//!     let store = InMemoryStore::new();
//!     store.add_vehicle(fixtures::vehicle("Camry", "sedan"));
//!     store.add_driver(fixtures::driver("Luis", Some(4.9)));
//!     store.put_booking(fixtures::pending_booking(test_clock().now()));
//!     // build a DispatchEngine over Arc::new(store.clone()) ...
//! }
//! ```

pub mod fixtures;
pub mod mocks;
pub mod store;

pub use mocks::{
    FixedClock, MockCheckoutGateway, RecordingDispatchScheduler, RecordingNotifier, test_clock,
};
pub use store::InMemoryStore;
