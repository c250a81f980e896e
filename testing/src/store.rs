//! In-memory implementation of every store trait.
//!
//! All state sits behind one mutex so each conditional write is atomic, the
//! same guarantee the `PostgreSQL` store gets from single-statement updates
//! and partial unique indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use transfer_core::booking::{Booking, PaymentConfirmation, UnpaidOutcome, WorkflowStatus};
use transfer_core::environment::{AssignmentStore, BookingStore, FleetStore, PricingStore};
use transfer_core::error::StoreError;
use transfer_core::fleet::{
    AssignmentStatus, DispatchAuditEntry, Driver, TripAssignment, Vehicle, VehicleStatus,
};
use transfer_core::pricing::{ActiveDiscount, PricingCatalog};
use transfer_core::types::{AssignmentId, BookingId, DriverId, VehicleId, VehicleKind};
use transfer_core::zone::HotelZone;

#[derive(Default)]
struct State {
    bookings: HashMap<BookingId, Booking>,
    drivers: HashMap<DriverId, Driver>,
    vehicles: HashMap<VehicleId, Vehicle>,
    assignments: HashMap<AssignmentId, TripAssignment>,
    audit: Vec<DispatchAuditEntry>,
    catalog: PricingCatalog,
    discount: Option<ActiveDiscount>,
    hotel_zones: Vec<HotelZone>,
}

/// In-memory store for tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Internal("Mutex lock failed".to_string()))
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> Option<R> {
        self.state.lock().ok().map(|mut state| f(&mut state))
    }

    /// Adds a driver
    pub fn add_driver(&self, driver: Driver) {
        self.with(|s| s.drivers.insert(driver.id, driver));
    }

    /// Adds a vehicle
    pub fn add_vehicle(&self, vehicle: Vehicle) {
        self.with(|s| s.vehicles.insert(vehicle.id, vehicle));
    }

    /// Adds or replaces a booking
    pub fn put_booking(&self, booking: Booking) {
        self.with(|s| s.bookings.insert(booking.id, booking));
    }

    /// Adds an assignment without any checks
    pub fn put_assignment(&self, assignment: TripAssignment) {
        self.with(|s| s.assignments.insert(assignment.id, assignment));
    }

    /// Replaces the pricing catalog
    pub fn set_catalog(&self, catalog: PricingCatalog) {
        self.with(|s| s.catalog = catalog);
    }

    /// Sets the discount record
    pub fn set_discount(&self, discount: Option<ActiveDiscount>) {
        self.with(|s| s.discount = discount);
    }

    /// Replaces the hotel zone table
    pub fn set_hotel_zones(&self, zones: Vec<HotelZone>) {
        self.with(|s| s.hotel_zones = zones);
    }

    /// Snapshot of a booking
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.with(|s| s.bookings.get(&id).cloned()).flatten()
    }

    /// Every assignment, any status
    #[must_use]
    pub fn assignments(&self) -> Vec<TripAssignment> {
        self.with(|s| s.assignments.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Assignments for one booking, any status
    #[must_use]
    pub fn assignments_for(&self, booking_id: BookingId) -> Vec<TripAssignment> {
        self.assignments()
            .into_iter()
            .filter(|a| a.booking_id == booking_id)
            .collect()
    }

    /// Audit trail in append order
    #[must_use]
    pub fn audit_log(&self) -> Vec<DispatchAuditEntry> {
        self.with(|s| s.audit.clone()).unwrap_or_default()
    }
}

impl State {
    fn active(&self) -> impl Iterator<Item = &TripAssignment> {
        self.assignments.values().filter(|a| a.status.is_active())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.bookings.contains_key(&booking.id) {
            return Err(StoreError::Database(format!("duplicate booking {}", booking.id)));
        }
        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn confirm_payment(
        &self,
        id: BookingId,
        confirmation: &PaymentConfirmation,
    ) -> Result<Option<Booking>, StoreError> {
        let mut state = self.lock()?;
        let Some(booking) = state.bookings.get_mut(&id) else {
            return Ok(None);
        };
        Ok(booking.apply_confirmation(confirmation).then(|| booking.clone()))
    }

    async fn record_unpaid_outcome(
        &self,
        id: BookingId,
        outcome: UnpaidOutcome,
        at: DateTime<Utc>,
    ) -> Result<Option<Booking>, StoreError> {
        let mut state = self.lock()?;
        let Some(booking) = state.bookings.get_mut(&id) else {
            return Ok(None);
        };
        Ok(booking.apply_unpaid_outcome(outcome, at).then(|| booking.clone()))
    }
}

#[async_trait]
impl FleetStore for InMemoryStore {
    async fn active_drivers(&self) -> Result<Vec<Driver>, StoreError> {
        let state = self.lock()?;
        let mut drivers: Vec<Driver> = state.drivers.values().filter(|d| d.is_active()).cloned().collect();
        drivers.sort_by_key(|d| d.id);
        Ok(drivers)
    }

    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        Ok(self.lock()?.drivers.get(&id).cloned())
    }

    async fn available_vehicles(&self, kind: &VehicleKind) -> Result<Vec<Vehicle>, StoreError> {
        let state = self.lock()?;
        let mut vehicles: Vec<Vehicle> = state
            .vehicles
            .values()
            .filter(|v| v.status == VehicleStatus::Available && &v.vehicle_type == kind)
            .cloned()
            .collect();
        vehicles.sort_by_key(|v| v.id);
        Ok(vehicles)
    }
}

#[async_trait]
impl AssignmentStore for InMemoryStore {
    async fn active_assignment_for_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<TripAssignment>, StoreError> {
        Ok(self.lock()?.active().find(|a| a.booking_id == booking_id).cloned())
    }

    async fn busy_driver_ids(&self) -> Result<HashSet<DriverId>, StoreError> {
        Ok(self.lock()?.active().map(|a| a.driver_id).collect())
    }

    async fn bound_vehicle_ids(&self) -> Result<HashSet<VehicleId>, StoreError> {
        Ok(self.lock()?.active().map(|a| a.vehicle_id).collect())
    }

    async fn create_assignment(&self, assignment: &TripAssignment) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.active().any(|a| a.booking_id == assignment.booking_id) {
            return Err(StoreError::BookingAlreadyAssigned {
                booking_id: assignment.booking_id,
            });
        }
        if state.active().any(|a| a.driver_id == assignment.driver_id) {
            return Err(StoreError::DriverBusy {
                driver_id: assignment.driver_id,
            });
        }
        if state.active().any(|a| a.vehicle_id == assignment.vehicle_id) {
            return Err(StoreError::VehicleBusy {
                vehicle_id: assignment.vehicle_id,
            });
        }
        let booking = state
            .bookings
            .get_mut(&assignment.booking_id)
            .ok_or_else(|| StoreError::Database(format!("booking {} missing", assignment.booking_id)))?;
        booking.workflow_status = WorkflowStatus::Assigned;
        booking.updated_at = assignment.assigned_at;
        state.assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<TripAssignment>, StoreError> {
        Ok(self.lock()?.assignments.get(&id).cloned())
    }

    async fn advance_assignment(
        &self,
        id: AssignmentId,
        from: AssignmentStatus,
        to: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<TripAssignment>, StoreError> {
        let mut state = self.lock()?;
        let Some(assignment) = state.assignments.get_mut(&id).filter(|a| a.status == from) else {
            return Ok(None);
        };
        assignment.status = to;
        assignment.updated_at = at;
        let updated = assignment.clone();

        if let Some((status, workflow)) = to.booking_transition() {
            if let Some(booking) = state.bookings.get_mut(&updated.booking_id) {
                booking.status = status;
                booking.workflow_status = workflow;
                booking.updated_at = at;
            }
        }
        Ok(Some(updated))
    }

    async fn append_audit(&self, entry: &DispatchAuditEntry) -> Result<(), StoreError> {
        self.lock()?.audit.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl PricingStore for InMemoryStore {
    async fn load_catalog(&self) -> Result<PricingCatalog, StoreError> {
        Ok(self.lock()?.catalog.clone())
    }

    async fn active_discount(&self, now: DateTime<Utc>) -> Result<Option<ActiveDiscount>, StoreError> {
        Ok(self
            .lock()?
            .discount
            .clone()
            .filter(|d| d.is_in_force(now)))
    }

    async fn hotel_zones(&self) -> Result<Vec<HotelZone>, StoreError> {
        Ok(self.lock()?.hotel_zones.clone())
    }
}
