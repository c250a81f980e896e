//! Drivers, vehicles and trip assignments.
//!
//! Drivers and vehicles are owned by fleet management and are read-only here.
//! A [`TripAssignment`] is created by dispatch and then advances one step at a
//! time through its lifecycle:
//!
//! ```text
//! assigned → accepted → en_route_pickup → arrived → in_progress → completed
//! ```

use crate::booking::{BookingStatus, WorkflowStatus};
use crate::macros::text_enum;
use crate::types::{AssignmentId, BookingId, DriverId, Price, VehicleId, VehicleKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

text_enum! {
    /// Employment status of a driver
    pub enum DriverStatus {
        /// Available for dispatch
        Active => "active",
        /// Not working
        Inactive => "inactive",
        /// Temporarily away
        OnLeave => "on_leave",
    }
}

text_enum! {
    /// Operational status of a vehicle
    pub enum VehicleStatus {
        /// Ready for trips
        Available => "available",
        /// In the workshop
        Maintenance => "maintenance",
        /// Out of the fleet
        Inactive => "inactive",
    }
}

/// A driver as seen by dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// Driver id
    pub id: DriverId,
    /// Display name
    pub name: String,
    /// Phone for SMS alerts
    #[serde(default)]
    pub phone: Option<String>,
    /// Email for assignment alerts
    #[serde(default)]
    pub email: Option<String>,
    /// Employment status
    pub status: DriverStatus,
    /// Customer rating, 0 to 5
    #[serde(default)]
    pub rating: Option<f64>,
    /// Vehicle normally driven by this driver
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
}

impl Driver {
    /// Rating used for selection; unrated drivers score 0
    #[must_use]
    pub fn score(&self) -> f64 {
        self.rating.filter(|r| r.is_finite()).unwrap_or(0.0)
    }

    /// Whether the driver may be dispatched at all
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, DriverStatus::Active)
    }

    /// Selection order: higher score first, then lower id.
    #[must_use]
    pub fn dispatch_order(&self, other: &Self) -> Ordering {
        other
            .score()
            .total_cmp(&self.score())
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A vehicle as seen by dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Vehicle id
    pub id: VehicleId,
    /// Label shown to dispatchers (make, model, plate)
    pub label: String,
    /// Vehicle class
    pub vehicle_type: VehicleKind,
    /// Seat count
    pub capacity: u16,
    /// Operational status
    pub status: VehicleStatus,
}

text_enum! {
    /// Lifecycle of a trip assignment
    pub enum AssignmentStatus {
        /// Bound by dispatch, not yet seen by the driver
        Assigned => "assigned",
        /// Driver accepted the trip
        Accepted => "accepted",
        /// Driver is on the way to pickup
        EnRoutePickup => "en_route_pickup",
        /// Driver is at pickup
        Arrived => "arrived",
        /// Passenger on board
        InProgress => "in_progress",
        /// Trip finished; terminal
        Completed => "completed",
    }
}

impl AssignmentStatus {
    /// Statuses that count towards the one-active-assignment constraints
    pub const ACTIVE: &'static [Self] = &[
        Self::Assigned,
        Self::Accepted,
        Self::EnRoutePickup,
        Self::Arrived,
        Self::InProgress,
    ];

    /// Whether this status holds the booking and the driver
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// The single permitted next status
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Assigned => Some(Self::Accepted),
            Self::Accepted => Some(Self::EnRoutePickup),
            Self::EnRoutePickup => Some(Self::Arrived),
            Self::Arrived => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Whether `to` is the next step from this status
    #[must_use]
    pub fn can_advance_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    /// Booking status and workflow marker implied by reaching this status
    #[must_use]
    pub const fn booking_transition(&self) -> Option<(BookingStatus, WorkflowStatus)> {
        match self {
            Self::InProgress => Some((BookingStatus::InProgress, WorkflowStatus::InProgress)),
            Self::Completed => Some((BookingStatus::Completed, WorkflowStatus::Completed)),
            _ => None,
        }
    }
}

text_enum! {
    /// How an assignment was chosen
    pub enum AssignmentMethod {
        /// Highest-rated free driver
        Auto => "auto",
        /// Dispatcher named a preferred driver
        Manual => "manual",
    }
}

/// Binding of one booking to one driver and one vehicle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripAssignment {
    /// Assignment id
    pub id: AssignmentId,
    /// Booking served
    pub booking_id: BookingId,
    /// Driver bound
    pub driver_id: DriverId,
    /// Vehicle bound
    pub vehicle_id: VehicleId,
    /// Selection method
    pub method: AssignmentMethod,
    /// Lifecycle status
    pub status: AssignmentStatus,
    /// Creation time
    pub assigned_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

/// Assignment about to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAssignment {
    /// Booking served
    pub booking_id: BookingId,
    /// Driver bound
    pub driver_id: DriverId,
    /// Vehicle bound
    pub vehicle_id: VehicleId,
    /// Selection method
    pub method: AssignmentMethod,
}

impl NewAssignment {
    /// Materialises the assignment in `assigned` status
    #[must_use]
    pub fn into_assignment(self, id: AssignmentId, now: DateTime<Utc>) -> TripAssignment {
        TripAssignment {
            id,
            booking_id: self.booking_id,
            driver_id: self.driver_id,
            vehicle_id: self.vehicle_id,
            method: self.method,
            status: AssignmentStatus::Assigned,
            assigned_at: now,
            updated_at: now,
        }
    }
}

/// Append-only record of a dispatch decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchAuditEntry {
    /// Booking served
    pub booking_id: BookingId,
    /// Assignment created
    pub assignment_id: AssignmentId,
    /// Driver chosen
    pub driver_id: DriverId,
    /// Driver name at decision time
    pub driver_name: String,
    /// Driver rating at decision time
    pub driver_rating: Option<f64>,
    /// Vehicle chosen
    pub vehicle_id: VehicleId,
    /// Vehicle label at decision time
    pub vehicle_label: String,
    /// Selection method
    pub method: AssignmentMethod,
    /// Free-text explanation of the choice
    pub reason: String,
    /// Booking total at decision time
    pub booking_total: Price,
    /// Decision time
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(rating: Option<f64>) -> Driver {
        Driver {
            id: DriverId::new(),
            name: "Luis".into(),
            phone: None,
            email: None,
            status: DriverStatus::Active,
            rating,
            vehicle_id: None,
        }
    }

    #[test]
    fn test_lifecycle_is_linear() {
        let mut status = AssignmentStatus::Assigned;
        let mut steps = 0;
        while let Some(next) = status.next() {
            assert!(status.can_advance_to(next));
            assert!(status.is_active());
            status = next;
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert_eq!(status, AssignmentStatus::Completed);
        assert!(!status.is_active());
    }

    #[test]
    fn test_skipping_is_not_allowed() {
        assert!(!AssignmentStatus::Assigned.can_advance_to(AssignmentStatus::Arrived));
        assert!(!AssignmentStatus::Arrived.can_advance_to(AssignmentStatus::Accepted));
        assert!(!AssignmentStatus::Completed.can_advance_to(AssignmentStatus::Assigned));
    }

    #[test]
    fn test_active_list_matches_predicate() {
        for status in AssignmentStatus::ALL {
            assert_eq!(AssignmentStatus::ACTIVE.contains(status), status.is_active());
        }
    }

    #[test]
    fn test_dispatch_order_prefers_rating_then_id() {
        let high = driver(Some(4.9));
        let low = driver(Some(4.2));
        let unrated = driver(None);
        let mut drivers = vec![unrated.clone(), low.clone(), high.clone()];
        drivers.sort_by(Driver::dispatch_order);
        assert_eq!(drivers[0].id, high.id);
        assert_eq!(drivers[2].id, unrated.id);

        let a = driver(Some(4.5));
        let b = driver(Some(4.5));
        let expected = a.id.min(b.id);
        let mut tied = vec![a, b];
        tied.sort_by(Driver::dispatch_order);
        assert_eq!(tied[0].id, expected);
    }
}
