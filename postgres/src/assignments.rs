//! `AssignmentStore` over `trip_assignments` and `dispatch_audit_log`.
//!
//! The partial unique indexes `ux_active_assignment_per_booking`,
//! `ux_active_assignment_per_driver` and `ux_active_assignment_per_vehicle`
//! reject a second active assignment; the resulting `23505` errors are mapped
//! to typed conflicts by constraint name.

use crate::PostgresStore;
use crate::rows::{self, ASSIGNMENT_COLUMNS, db, price_param};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashSet;
use transfer_core::environment::AssignmentStore;
use transfer_core::error::StoreError;
use transfer_core::fleet::{AssignmentStatus, DispatchAuditEntry, TripAssignment};
use transfer_core::types::{AssignmentId, BookingId, DriverId, VehicleId};
use uuid::Uuid;

const BOOKING_CONSTRAINT: &str = "ux_active_assignment_per_booking";
const DRIVER_CONSTRAINT: &str = "ux_active_assignment_per_driver";
const VEHICLE_CONSTRAINT: &str = "ux_active_assignment_per_vehicle";

fn active_statuses() -> Vec<&'static str> {
    AssignmentStatus::ACTIVE.iter().map(AssignmentStatus::as_str).collect()
}

fn insert_error(assignment: &TripAssignment, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(BOOKING_CONSTRAINT) => {
                    return StoreError::BookingAlreadyAssigned {
                        booking_id: assignment.booking_id,
                    };
                }
                Some(DRIVER_CONSTRAINT) => {
                    return StoreError::DriverBusy {
                        driver_id: assignment.driver_id,
                    };
                }
                Some(VEHICLE_CONSTRAINT) => {
                    return StoreError::VehicleBusy {
                        vehicle_id: assignment.vehicle_id,
                    };
                }
                _ => {}
            }
        }
    }
    StoreError::Database(format!("Failed to create assignment: {e}"))
}

#[async_trait]
impl AssignmentStore for PostgresStore {
    async fn active_assignment_for_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<TripAssignment>, StoreError> {
        let row = sqlx::query(&format!(
            r"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM trip_assignments
            WHERE booking_id = $1 AND status = ANY($2)
            "
        ))
        .bind(booking_id.as_uuid())
        .bind(active_statuses())
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to load active assignment"))?;

        row.as_ref().map(rows::assignment).transpose()
    }

    async fn busy_driver_ids(&self) -> Result<HashSet<DriverId>, StoreError> {
        let rows = sqlx::query("SELECT driver_id FROM trip_assignments WHERE status = ANY($1)")
            .bind(active_statuses())
            .fetch_all(&self.pool)
            .await
            .map_err(db("Failed to load busy drivers"))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("driver_id")
                    .map(DriverId::from_uuid)
                    .map_err(db("Failed to decode driver id"))
            })
            .collect()
    }

    async fn bound_vehicle_ids(&self) -> Result<HashSet<VehicleId>, StoreError> {
        let rows = sqlx::query("SELECT vehicle_id FROM trip_assignments WHERE status = ANY($1)")
            .bind(active_statuses())
            .fetch_all(&self.pool)
            .await
            .map_err(db("Failed to load bound vehicles"))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("vehicle_id")
                    .map(VehicleId::from_uuid)
                    .map_err(db("Failed to decode vehicle id"))
            })
            .collect()
    }

    async fn create_assignment(&self, assignment: &TripAssignment) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db("Failed to begin transaction"))?;

        sqlx::query(
            r"
            INSERT INTO trip_assignments (
                id, booking_id, driver_id, vehicle_id, method, status, assigned_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(assignment.id.as_uuid())
        .bind(assignment.booking_id.as_uuid())
        .bind(assignment.driver_id.as_uuid())
        .bind(assignment.vehicle_id.as_uuid())
        .bind(assignment.method.as_str())
        .bind(assignment.status.as_str())
        .bind(assignment.assigned_at)
        .bind(assignment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error(assignment, e))?;

        let updated = sqlx::query(
            r"
            UPDATE bookings
            SET workflow_status = 'assigned', updated_at = $2
            WHERE id = $1
            ",
        )
        .bind(assignment.booking_id.as_uuid())
        .bind(assignment.assigned_at)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to mark booking assigned"))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Database(format!(
                "booking {} missing",
                assignment.booking_id
            )));
        }

        tx.commit().await.map_err(db("Failed to commit assignment"))?;
        Ok(())
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<TripAssignment>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM trip_assignments WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to load assignment"))?;

        row.as_ref().map(rows::assignment).transpose()
    }

    async fn advance_assignment(
        &self,
        id: AssignmentId,
        from: AssignmentStatus,
        to: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<TripAssignment>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db("Failed to begin transaction"))?;

        let row = sqlx::query(&format!(
            r"
            UPDATE trip_assignments
            SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {ASSIGNMENT_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db("Failed to advance assignment"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let updated = rows::assignment(&row)?;

        if let Some((status, workflow)) = to.booking_transition() {
            sqlx::query(
                r"
                UPDATE bookings
                SET status = $2, workflow_status = $3, updated_at = $4
                WHERE id = $1
                ",
            )
            .bind(updated.booking_id.as_uuid())
            .bind(status.as_str())
            .bind(workflow.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(db("Failed to update booking status"))?;
        }

        tx.commit().await.map_err(db("Failed to commit status change"))?;
        Ok(Some(updated))
    }

    async fn append_audit(&self, entry: &DispatchAuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO dispatch_audit_log (
                booking_id, assignment_id, driver_id, driver_name, driver_rating,
                vehicle_id, vehicle_label, method, reason, booking_total, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(entry.booking_id.as_uuid())
        .bind(entry.assignment_id.as_uuid())
        .bind(entry.driver_id.as_uuid())
        .bind(&entry.driver_name)
        .bind(entry.driver_rating)
        .bind(entry.vehicle_id.as_uuid())
        .bind(&entry.vehicle_label)
        .bind(entry.method.as_str())
        .bind(&entry.reason)
        .bind(price_param(entry.booking_total)?)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(db("Failed to append dispatch audit entry"))?;

        Ok(())
    }
}
