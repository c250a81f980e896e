//! `PricingStore` over the configuration tables.

use crate::PostgresStore;
use crate::rows::{db, get, optional_price, price};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use transfer_core::environment::PricingStore;
use transfer_core::error::StoreError;
use transfer_core::pricing::{ActiveDiscount, PricingCatalog, PricingRule, VehicleClass};
use transfer_core::types::{DiscountId, PricingRuleId, VehicleClassId, ZoneCode};
use transfer_core::zone::HotelZone;
use uuid::Uuid;

fn vehicle_class(row: &PgRow) -> Result<VehicleClass, StoreError> {
    Ok(VehicleClass {
        id: VehicleClassId::from_uuid(get::<Uuid>(row, "id")?),
        name: get(row, "name")?,
        minimum_fare: optional_price(row, "minimum_fare")?,
        active: get(row, "active")?,
    })
}

fn pricing_rule(row: &PgRow) -> Result<PricingRule, StoreError> {
    Ok(PricingRule {
        id: PricingRuleId::from_uuid(get::<Uuid>(row, "id")?),
        vehicle_class_id: VehicleClassId::from_uuid(get::<Uuid>(row, "vehicle_class_id")?),
        origin_zone: ZoneCode::new(get::<String>(row, "origin_zone")?),
        destination: get(row, "destination")?,
        base_price: price(row, "base_price")?,
        active: get(row, "active")?,
    })
}

#[async_trait]
impl PricingStore for PostgresStore {
    async fn load_catalog(&self) -> Result<PricingCatalog, StoreError> {
        let classes = sqlx::query(
            r"
            SELECT id, name, minimum_fare, active
            FROM vehicle_classes
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to load vehicle classes"))?;

        let rules = sqlx::query(
            r"
            SELECT id, vehicle_class_id, origin_zone, destination, base_price, active
            FROM pricing_rules
            ORDER BY sort_order, id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to load pricing rules"))?;

        Ok(PricingCatalog {
            vehicle_classes: classes.iter().map(vehicle_class).collect::<Result<_, _>>()?,
            rules: rules.iter().map(pricing_rule).collect::<Result<_, _>>()?,
        })
    }

    async fn active_discount(&self, now: DateTime<Utc>) -> Result<Option<ActiveDiscount>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT id, percent, valid_from, valid_to, version
            FROM global_discounts
            WHERE active
              AND (valid_from IS NULL OR valid_from <= $1)
              AND (valid_to IS NULL OR valid_to > $1)
            ORDER BY version DESC, updated_at DESC
            LIMIT 1
            ",
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to load active discount"))?;

        row.map(|row| {
            Ok::<_, StoreError>(ActiveDiscount {
                id: DiscountId::from_uuid(get::<Uuid>(&row, "id")?),
                percent: get(&row, "percent")?,
                valid_from: get(&row, "valid_from")?,
                valid_to: get(&row, "valid_to")?,
                version: get(&row, "version")?,
            })
        })
        .transpose()
    }

    async fn hotel_zones(&self) -> Result<Vec<HotelZone>, StoreError> {
        let rows = sqlx::query(
            "SELECT hotel_name, zone_code, search_terms FROM hotel_zones ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to load hotel zones"))?;

        rows.iter()
            .map(|row| {
                Ok::<_, StoreError>(HotelZone {
                    hotel_name: get(row, "hotel_name")?,
                    zone_code: ZoneCode::new(get::<String>(row, "zone_code")?),
                    search_terms: get(row, "search_terms")?,
                })
            })
            .collect()
    }
}
