//! Dispatch assignment engine.
//!
//! Binds a free driver and a compatible vehicle to a confirmed booking. The
//! busy checks are advisory: the store's one-active-assignment constraints
//! per driver and per vehicle are what settle races. A dispatch that loses a
//! race gets [`StoreError::DriverBusy`] or [`StoreError::VehicleBusy`] and
//! retries without that driver or vehicle.

use crate::config::DispatchConfig;
use crate::fanout::NotificationFanout;
use crate::metrics::DispatchMetrics;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use transfer_core::booking::Booking;
use transfer_core::environment::{AssignmentStore, BookingStore, Clock, DispatchScheduler, FleetStore};
use transfer_core::error::{DispatchError, StoreError};
use transfer_core::fleet::{
    AssignmentMethod, AssignmentStatus, DispatchAuditEntry, Driver, NewAssignment, TripAssignment,
    Vehicle,
};
use transfer_core::notification::NotificationRequest;
use transfer_core::types::{AssignmentId, BookingId, DriverId, VehicleId, VehicleKind};

/// A dispatch request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Booking to serve
    pub booking_id: BookingId,
    /// Driver the dispatcher would like to use
    #[serde(default)]
    pub preferred_driver_id: Option<DriverId>,
    /// Vehicle class override
    #[serde(default)]
    pub vehicle_type: Option<String>,
    /// Pickup time override; informational
    #[serde(default)]
    pub pickup_datetime: Option<chrono::DateTime<chrono::Utc>>,
}

impl DispatchRequest {
    /// Automatic dispatch for `booking_id`
    #[must_use]
    pub fn auto(booking_id: BookingId) -> Self {
        Self {
            booking_id,
            ..Self::default()
        }
    }
}

/// A successful dispatch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchResult {
    /// The assignment created
    pub assignment: TripAssignment,
    /// Driver bound
    pub driver: Driver,
    /// Vehicle bound
    pub vehicle: Vehicle,
    /// Human-readable summary
    pub message: String,
}

/// Selects and binds drivers and vehicles; advances assignments.
#[derive(Clone)]
pub struct DispatchEngine {
    bookings: Arc<dyn BookingStore>,
    fleet: Arc<dyn FleetStore>,
    assignments: Arc<dyn AssignmentStore>,
    fanout: NotificationFanout,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
}

impl DispatchEngine {
    /// Creates a dispatch engine
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        fleet: Arc<dyn FleetStore>,
        assignments: Arc<dyn AssignmentStore>,
        fanout: NotificationFanout,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            bookings,
            fleet,
            assignments,
            fanout,
            clock,
            config,
        }
    }

    /// Assigns a driver and vehicle to the booking.
    ///
    /// Either the assignment is fully recorded (row inserted, booking marked
    /// `assigned`) or nothing changed.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::BookingNotFound`]
    /// - [`DispatchError::BookingNotDispatchable`] unless payment has confirmed the booking
    /// - [`DispatchError::AlreadyAssigned`] if the booking has an active assignment
    /// - [`DispatchError::NoAvailableVehicle`] if no vehicle of the class is free
    /// - [`DispatchError::AllDriversBusy`] if every active driver is busy
    /// - [`DispatchError::Store`] on storage failure
    pub async fn assign(&self, request: &DispatchRequest) -> Result<DispatchResult, DispatchError> {
        let started = Instant::now();
        let result = self.try_assign(request).await;
        match &result {
            Ok(done) => DispatchMetrics::record(done.assignment.method.as_str(), "assigned", started.elapsed()),
            Err(e) => {
                let method = if request.preferred_driver_id.is_some() { "manual" } else { "auto" };
                DispatchMetrics::record(method, dispatch_outcome(e), started.elapsed());
                tracing::warn!(booking_id = %request.booking_id, error = %e, "Dispatch failed");
            }
        }
        result
    }

    async fn try_assign(&self, request: &DispatchRequest) -> Result<DispatchResult, DispatchError> {
        let booking = self
            .bookings
            .get_booking(request.booking_id)
            .await?
            .ok_or(DispatchError::BookingNotFound(request.booking_id))?;
        if !booking.status.is_dispatchable() {
            return Err(DispatchError::BookingNotDispatchable {
                status: booking.status,
            });
        }
        if self
            .assignments
            .active_assignment_for_booking(booking.id)
            .await?
            .is_some()
        {
            return Err(DispatchError::AlreadyAssigned {
                booking_id: booking.id,
            });
        }

        let vehicle_type = self.vehicle_type_for(request, &booking);
        let vehicles = self.fleet.available_vehicles(&vehicle_type).await?;
        if vehicles.is_empty() {
            return Err(DispatchError::NoAvailableVehicle { vehicle_type });
        }

        if let Some(driver_id) = request.preferred_driver_id {
            if let Some(result) = self.try_preferred(&booking, driver_id, &vehicles, &vehicle_type).await? {
                return Ok(result);
            }
        }

        self.assign_best(&booking, &vehicles, &vehicle_type).await
    }

    fn vehicle_type_for(&self, request: &DispatchRequest, booking: &Booking) -> VehicleKind {
        request
            .vehicle_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(VehicleKind::new)
            .or_else(|| (!booking.vehicle_type.as_str().is_empty()).then(|| booking.vehicle_type.clone()))
            .unwrap_or_else(|| self.config.default_vehicle_type.clone())
    }

    /// Preferred-driver path. `Ok(None)` means fall back to scoring.
    async fn try_preferred(
        &self,
        booking: &Booking,
        driver_id: DriverId,
        vehicles: &[Vehicle],
        vehicle_type: &VehicleKind,
    ) -> Result<Option<DispatchResult>, DispatchError> {
        let Some(driver) = self.fleet.get_driver(driver_id).await?.filter(Driver::is_active) else {
            tracing::info!(booking_id = %booking.id, driver_id = %driver_id, "Preferred driver not active, using automatic selection");
            return Ok(None);
        };
        if self.assignments.busy_driver_ids().await?.contains(&driver_id) {
            tracing::info!(booking_id = %booking.id, driver_id = %driver_id, "Preferred driver busy, using automatic selection");
            return Ok(None);
        }

        let mut lost_vehicles: HashSet<VehicleId> = HashSet::new();
        loop {
            let mut bound = self.assignments.bound_vehicle_ids().await?;
            bound.extend(&lost_vehicles);
            let vehicle = pick_vehicle(&driver, vehicles, &bound)
                .ok_or_else(|| DispatchError::NoAvailableVehicle {
                    vehicle_type: vehicle_type.clone(),
                })?
                .clone();

            match self.bind(booking, driver.clone(), vehicle, AssignmentMethod::Manual).await {
                Ok(result) => return Ok(Some(result)),
                Err(DispatchError::Store(StoreError::DriverBusy { driver_id })) => {
                    tracing::info!(booking_id = %booking.id, driver_id = %driver_id, "Preferred driver taken concurrently, using automatic selection");
                    return Ok(None);
                }
                Err(DispatchError::Store(StoreError::VehicleBusy { vehicle_id })) => {
                    tracing::debug!(booking_id = %booking.id, vehicle_id = %vehicle_id, "Vehicle taken concurrently, retrying");
                    lost_vehicles.insert(vehicle_id);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Scoring path: highest rating, ties by lowest driver id.
    async fn assign_best(
        &self,
        booking: &Booking,
        vehicles: &[Vehicle],
        vehicle_type: &VehicleKind,
    ) -> Result<DispatchResult, DispatchError> {
        let mut lost_races: HashSet<DriverId> = HashSet::new();
        let mut lost_vehicles: HashSet<VehicleId> = HashSet::new();
        loop {
            let busy = self.assignments.busy_driver_ids().await?;
            let mut free: Vec<Driver> = self
                .fleet
                .active_drivers()
                .await?
                .into_iter()
                .filter(|d| d.is_active() && !busy.contains(&d.id) && !lost_races.contains(&d.id))
                .collect();
            if free.is_empty() {
                return Err(DispatchError::AllDriversBusy);
            }
            free.sort_by(Driver::dispatch_order);
            let driver = free.swap_remove(0);

            let mut bound = self.assignments.bound_vehicle_ids().await?;
            bound.extend(&lost_vehicles);
            let vehicle = pick_vehicle(&driver, vehicles, &bound)
                .ok_or_else(|| DispatchError::NoAvailableVehicle {
                    vehicle_type: vehicle_type.clone(),
                })?
                .clone();

            match self.bind(booking, driver, vehicle, AssignmentMethod::Auto).await {
                Err(DispatchError::Store(StoreError::DriverBusy { driver_id })) => {
                    tracing::debug!(booking_id = %booking.id, driver_id = %driver_id, "Driver taken concurrently, retrying");
                    lost_races.insert(driver_id);
                }
                Err(DispatchError::Store(StoreError::VehicleBusy { vehicle_id })) => {
                    tracing::debug!(booking_id = %booking.id, vehicle_id = %vehicle_id, "Vehicle taken concurrently, retrying");
                    lost_vehicles.insert(vehicle_id);
                }
                other => return other,
            }
        }
    }

    async fn bind(
        &self,
        booking: &Booking,
        driver: Driver,
        vehicle: Vehicle,
        method: AssignmentMethod,
    ) -> Result<DispatchResult, DispatchError> {
        let now = self.clock.now();
        let assignment = NewAssignment {
            booking_id: booking.id,
            driver_id: driver.id,
            vehicle_id: vehicle.id,
            method,
        }
        .into_assignment(AssignmentId::new(), now);

        self.assignments.create_assignment(&assignment).await?;

        let reason = match method {
            AssignmentMethod::Manual => "preferred driver".to_string(),
            AssignmentMethod::Auto => format!("highest rated free driver ({:.1})", driver.score()),
        };
        let audit = DispatchAuditEntry {
            booking_id: booking.id,
            assignment_id: assignment.id,
            driver_id: driver.id,
            driver_name: driver.name.clone(),
            driver_rating: driver.rating,
            vehicle_id: vehicle.id,
            vehicle_label: vehicle.label.clone(),
            method,
            reason,
            booking_total: booking.total_price,
            recorded_at: now,
        };
        if let Err(e) = self.assignments.append_audit(&audit).await {
            tracing::error!(assignment_id = %assignment.id, error = %e, "Failed to append dispatch audit entry");
        }

        tracing::info!(
            booking_id = %booking.id,
            assignment_id = %assignment.id,
            driver_id = %driver.id,
            driver_name = %driver.name,
            driver_rating = ?driver.rating,
            vehicle_id = %vehicle.id,
            vehicle = %vehicle.label,
            method = %method,
            "Driver assigned"
        );

        self.fanout.notify(NotificationRequest::driver_assignment(
            booking,
            &driver,
            &vehicle,
            &assignment,
        ));

        let message = format!("{} assigned with {}", driver.name, vehicle.label);
        Ok(DispatchResult {
            assignment,
            driver,
            vehicle,
            message,
        })
    }

    /// Moves an assignment one step along its lifecycle.
    ///
    /// Reaching `in_progress` or `completed` updates the booking in the same
    /// write.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::AssignmentNotFound`]
    /// - [`DispatchError::InvalidTransition`] if `next` is not the next step
    /// - [`DispatchError::StaleTransition`] if the status changed concurrently
    /// - [`DispatchError::Store`] on storage failure
    pub async fn advance(
        &self,
        assignment_id: AssignmentId,
        next: AssignmentStatus,
    ) -> Result<TripAssignment, DispatchError> {
        let current = self
            .assignments
            .get_assignment(assignment_id)
            .await?
            .ok_or(DispatchError::AssignmentNotFound(assignment_id))?;
        if !current.status.can_advance_to(next) {
            return Err(DispatchError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let updated = self
            .assignments
            .advance_assignment(assignment_id, current.status, next, self.clock.now())
            .await?
            .ok_or(DispatchError::StaleTransition {
                expected: current.status,
            })?;

        tracing::info!(
            assignment_id = %assignment_id,
            booking_id = %updated.booking_id,
            from = %current.status,
            to = %next,
            "Assignment advanced"
        );
        Ok(updated)
    }
}

/// The driver's own vehicle if it is available and unbound, else the
/// lowest-id available unbound vehicle.
fn pick_vehicle<'a>(
    driver: &Driver,
    vehicles: &'a [Vehicle],
    bound: &HashSet<VehicleId>,
) -> Option<&'a Vehicle> {
    let free = || vehicles.iter().filter(|v| !bound.contains(&v.id));
    driver
        .vehicle_id
        .and_then(|own| free().find(|v| v.id == own))
        .or_else(|| free().min_by_key(|v| v.id))
}

const fn dispatch_outcome(err: &DispatchError) -> &'static str {
    match err {
        DispatchError::AlreadyAssigned { .. } => "already_assigned",
        DispatchError::NoAvailableVehicle { .. } => "no_vehicle",
        DispatchError::AllDriversBusy => "all_busy",
        DispatchError::BookingNotFound(_) => "not_found",
        DispatchError::BookingNotDispatchable { .. } => "not_dispatchable",
        _ => "error",
    }
}

/// Runs automatic dispatch in the background when a payment confirms.
#[derive(Clone)]
pub struct EngineDispatchScheduler {
    engine: Arc<DispatchEngine>,
}

impl EngineDispatchScheduler {
    /// Creates a scheduler over `engine`
    #[must_use]
    pub const fn new(engine: Arc<DispatchEngine>) -> Self {
        Self { engine }
    }
}

impl DispatchScheduler for EngineDispatchScheduler {
    fn schedule(&self, booking_id: BookingId) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(booking_id = %booking_id, "No async runtime available, booking left pending dispatch");
            return;
        };
        let engine = Arc::clone(&self.engine);
        handle.spawn(async move {
            if let Err(e) = engine.assign(&DispatchRequest::auto(booking_id)).await {
                tracing::warn!(
                    booking_id = %booking_id,
                    error = %e,
                    "Automatic dispatch failed, booking left pending dispatch"
                );
            }
        });
    }
}
