//! `FleetStore` over the `drivers` and `vehicles` tables.

use crate::PostgresStore;
use crate::rows::{self, DRIVER_COLUMNS, VEHICLE_COLUMNS, db};
use async_trait::async_trait;
use transfer_core::environment::FleetStore;
use transfer_core::error::StoreError;
use transfer_core::fleet::{Driver, Vehicle};
use transfer_core::types::{DriverId, VehicleKind};

#[async_trait]
impl FleetStore for PostgresStore {
    async fn active_drivers(&self) -> Result<Vec<Driver>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers WHERE status = 'active' ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to load drivers"))?;

        rows.iter().map(rows::driver).collect()
    }

    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        let row = sqlx::query(&format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("Failed to load driver"))?;

        row.as_ref().map(rows::driver).transpose()
    }

    async fn available_vehicles(&self, kind: &VehicleKind) -> Result<Vec<Vehicle>, StoreError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {VEHICLE_COLUMNS}
            FROM vehicles
            WHERE status = 'available' AND lower(vehicle_type) = $1
            ORDER BY id
            "
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to load vehicles"))?;

        rows.iter().map(rows::vehicle).collect()
    }
}
