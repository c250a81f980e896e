//! Fare calculation.
//!
//! [`FareCalculator::compute`] is a pure function of the request, the pricing
//! catalog, the zone resolver, the active discount and the evaluation time.
//!
//! # Rounding
//!
//! Prices are whole currency units, rounded half away from zero. Order of
//! operations is fixed:
//!
//! ```text
//! one_way = round(base × (1 − discount/100))
//! total   = one_way                      (one way)
//! total   = round(one_way × 1.9)         (round trip)
//! ```
//!
//! so `round_trip.total == round(one_way.total × 1.9)` holds exactly.

use crate::error::FareError;
use crate::macros::text_enum;
use crate::types::{DiscountId, Price, PricingRuleId, VehicleClassId, ZoneCode};
use crate::zone::ZoneResolver;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base price used when a vehicle class has no minimum fare configured.
pub const FALLBACK_BASE_PRICE: Price = Price::new(50);

text_enum! {
    /// One-way or return trip
    pub enum TripType {
        /// Single leg
        OneWay => "one_way",
        /// Outbound and return legs
        RoundTrip => "round_trip",
    }
}

impl Default for TripType {
    fn default() -> Self {
        Self::OneWay
    }
}

text_enum! {
    /// Where a base price came from
    pub enum PriceSource {
        /// A pricing rule matched
        Rule => "rule",
        /// No rule matched; class minimum fare (or the fallback) was used
        MinimumFare => "minimum_fare",
    }
}

/// Pricing category of a vehicle (Sedan, SUV, Van, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleClass {
    /// Class id
    pub id: VehicleClassId,
    /// Display name, matched case-insensitively against requests
    pub name: String,
    /// Minimum fare when no rule matches
    #[serde(default)]
    pub minimum_fare: Option<Price>,
    /// Whether the class is offered
    pub active: bool,
}

/// Static fare for (vehicle class, origin zone, destination).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    /// Rule id
    pub id: PricingRuleId,
    /// Vehicle class the rule prices
    pub vehicle_class_id: VehicleClassId,
    /// Origin zone code
    pub origin_zone: ZoneCode,
    /// Destination zone code or literal destination text
    pub destination: String,
    /// Base price
    pub base_price: Price,
    /// Whether the rule is in force
    pub active: bool,
}

/// Read-only pricing configuration, rules in evaluation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingCatalog {
    /// Vehicle classes in display order
    pub vehicle_classes: Vec<VehicleClass>,
    /// Rules in evaluation order
    pub rules: Vec<PricingRule>,
}

/// The platform-wide discount in force, injected into each computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveDiscount {
    /// Discount record id
    pub id: DiscountId,
    /// Percentage off the base price
    pub percent: f64,
    /// Start of validity (inclusive)
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    /// End of validity (exclusive)
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    /// Configuration version, bumped on every edit
    pub version: i64,
}

impl ActiveDiscount {
    /// Whether the discount applies at `now`
    #[must_use]
    pub fn is_in_force(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| now >= from) && self.valid_to.is_none_or(|to| now < to)
    }

    /// Percent to apply at `now`: 0 outside the window, clamped to 0..=100
    #[must_use]
    pub fn effective_percent(&self, now: DateTime<Utc>) -> f64 {
        if !self.is_in_force(now) || !self.percent.is_finite() || self.percent <= 0.0 {
            return 0.0;
        }
        self.percent.min(100.0)
    }
}

/// A fare request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareRequest {
    /// Pickup location text
    pub origin: String,
    /// Dropoff location text
    pub destination: String,
    /// Vehicle class name (`Sedan`, `suv`, ...)
    #[serde(default)]
    pub vehicle_type: Option<String>,
    /// Explicit vehicle class; takes precedence over the name
    #[serde(default)]
    pub vehicle_class_id: Option<VehicleClassId>,
    /// `one_way` (default) or `round_trip`
    #[serde(default)]
    pub trip_type: Option<String>,
}

impl FareRequest {
    /// Parsed trip type
    ///
    /// # Errors
    ///
    /// Returns [`FareError::InvalidTripType`] for unknown values.
    pub fn trip_type(&self) -> Result<TripType, FareError> {
        match self.trip_type.as_deref().map(str::trim) {
            None | Some("") => Ok(TripType::OneWay),
            Some(text) => text
                .parse()
                .map_err(|_| FareError::InvalidTripType(text.to_string())),
        }
    }
}

/// A computed fare.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FareQuote {
    /// Amount to charge
    pub total_price: Price,
    /// Same trip without the discount
    pub original_price: Price,
    /// Base price from the rule or fallback
    pub base_price: Price,
    /// Discount applied (0 when none)
    pub discount_percent: f64,
    /// Resolved origin zone
    pub origin_zone: Option<ZoneCode>,
    /// Resolved destination zone
    pub destination_zone: Option<ZoneCode>,
    /// Rule or fallback
    pub price_source: PriceSource,
    /// Rule that priced the trip
    pub rule_id: Option<PricingRuleId>,
    /// Vehicle class used
    pub vehicle_class_id: VehicleClassId,
    /// Vehicle class name
    pub vehicle_class: String,
    /// Trip type
    pub trip_type: TripType,
}

/// Applies a percentage discount and rounds to whole units.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn apply_discount(base: Price, percent: f64) -> Price {
    if percent <= 0.0 {
        return base;
    }
    let discounted = (base.units() as f64 * (1.0 - percent.min(100.0) / 100.0)).round();
    Price::new(discounted.max(0.0) as u64)
}

/// Applies the 1.9× round-trip multiplier, rounding half up.
#[must_use]
pub const fn round_trip_price(one_way: Price) -> Price {
    Price::new(one_way.units().saturating_mul(19).saturating_add(5) / 10)
}

/// Stateless fare calculator.
#[derive(Clone, Copy, Debug, Default)]
pub struct FareCalculator;

impl FareCalculator {
    /// Computes the fare for `request`.
    ///
    /// # Errors
    ///
    /// - [`FareError::MissingField`] when origin or destination is empty
    /// - [`FareError::InvalidTripType`] for an unknown trip type
    /// - [`FareError::NoVehicleClass`] when no vehicle class can be selected
    pub fn compute(
        request: &FareRequest,
        catalog: &PricingCatalog,
        zones: &dyn ZoneResolver,
        discount: Option<&ActiveDiscount>,
        now: DateTime<Utc>,
    ) -> Result<FareQuote, FareError> {
        let origin = request.origin.trim();
        let destination = request.destination.trim();
        if origin.is_empty() {
            return Err(FareError::MissingField("origin"));
        }
        if destination.is_empty() {
            return Err(FareError::MissingField("destination"));
        }
        let trip_type = request.trip_type()?;

        let origin_zone = zones.resolve(origin);
        let destination_zone = zones.resolve(destination);

        let class = select_vehicle_class(catalog, request)?;

        let rule = origin_zone.as_ref().and_then(|origin_zone| {
            find_rule(catalog, class, origin_zone, destination, destination_zone.as_ref())
        });

        let (base_price, price_source, rule_id) = match rule {
            Some(rule) => (rule.base_price, PriceSource::Rule, Some(rule.id)),
            None => (
                class
                    .minimum_fare
                    .filter(|p| !p.is_zero())
                    .unwrap_or(FALLBACK_BASE_PRICE),
                PriceSource::MinimumFare,
                None,
            ),
        };

        let discount_percent = discount.map_or(0.0, |d| d.effective_percent(now));
        let one_way = apply_discount(base_price, discount_percent);
        let (total_price, original_price) = match trip_type {
            TripType::OneWay => (one_way, base_price),
            TripType::RoundTrip => (round_trip_price(one_way), round_trip_price(base_price)),
        };

        Ok(FareQuote {
            total_price,
            original_price,
            base_price,
            discount_percent,
            origin_zone,
            destination_zone,
            price_source,
            rule_id,
            vehicle_class_id: class.id,
            vehicle_class: class.name.clone(),
            trip_type,
        })
    }
}

fn select_vehicle_class<'a>(
    catalog: &'a PricingCatalog,
    request: &FareRequest,
) -> Result<&'a VehicleClass, FareError> {
    if let Some(id) = request.vehicle_class_id {
        return catalog
            .vehicle_classes
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| FareError::NoVehicleClass(id.to_string()));
    }

    let name = request.vehicle_type.as_deref().map_or("", str::trim);
    let active = || catalog.vehicle_classes.iter().filter(|c| c.active);
    active()
        .find(|c| !name.is_empty() && c.name.trim().eq_ignore_ascii_case(name))
        .or_else(|| active().next())
        .ok_or_else(|| FareError::NoVehicleClass(name.to_string()))
}

/// A rule destination matches the literal text either way round, or the
/// zone code the destination resolved to.
fn destination_matches(rule_destination: &str, destination: &str, zone: Option<&ZoneCode>) -> bool {
    let rule_dest = rule_destination.trim().to_lowercase();
    if rule_dest.is_empty() {
        return false;
    }
    let dest = destination.to_lowercase();
    rule_dest == dest
        || dest.contains(&rule_dest)
        || rule_dest.contains(&dest)
        || zone.is_some_and(|z| z.eq_ignore_case(&rule_dest))
}

fn find_rule<'a>(
    catalog: &'a PricingCatalog,
    class: &VehicleClass,
    origin_zone: &ZoneCode,
    destination: &str,
    destination_zone: Option<&ZoneCode>,
) -> Option<&'a PricingRule> {
    catalog.rules.iter().find(|r| {
        r.active
            && r.vehicle_class_id == class.id
            && r.origin_zone.eq_ignore_case(origin_zone.as_str())
            && destination_matches(&r.destination, destination, destination_zone)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::zone::{HotelZone, KeywordZoneResolver};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn sedan() -> VehicleClass {
        VehicleClass {
            id: VehicleClassId::from_uuid(uuid::Uuid::from_u128(1)),
            name: "Sedan".into(),
            minimum_fare: Some(Price::new(35)),
            active: true,
        }
    }

    fn suv() -> VehicleClass {
        VehicleClass {
            id: VehicleClassId::from_uuid(uuid::Uuid::from_u128(2)),
            name: "SUV".into(),
            minimum_fare: None,
            active: true,
        }
    }

    fn rule(class: &VehicleClass, origin: &str, destination: &str, base: u64) -> PricingRule {
        PricingRule {
            id: PricingRuleId::new(),
            vehicle_class_id: class.id,
            origin_zone: ZoneCode::new(origin),
            destination: destination.into(),
            base_price: Price::new(base),
            active: true,
        }
    }

    fn catalog(base: u64) -> PricingCatalog {
        PricingCatalog {
            vehicle_classes: vec![sedan(), suv()],
            rules: vec![
                rule(&sedan(), "PUJ", "BAV", base),
                rule(&suv(), "PUJ", "BAV", base + 20),
            ],
        }
    }

    fn zones() -> KeywordZoneResolver {
        KeywordZoneResolver::new(vec![HotelZone {
            hotel_name: "Hard Rock Hotel".into(),
            zone_code: ZoneCode::new("BAV"),
            search_terms: vec!["bavaro".into()],
        }])
    }

    fn request(trip_type: &str) -> FareRequest {
        FareRequest {
            origin: "PUJ Airport".into(),
            destination: "Hard Rock Hotel Punta Cana".into(),
            vehicle_type: Some("sedan".into()),
            vehicle_class_id: None,
            trip_type: Some(trip_type.into()),
        }
    }

    fn discount(percent: f64) -> ActiveDiscount {
        ActiveDiscount {
            id: DiscountId::new(),
            percent,
            valid_from: None,
            valid_to: None,
            version: 1,
        }
    }

    fn quote(req: &FareRequest, cat: &PricingCatalog, d: Option<&ActiveDiscount>) -> FareQuote {
        FareCalculator::compute(req, cat, &zones(), d, now()).unwrap()
    }

    #[test]
    fn test_base_25_one_way_and_round_trip() {
        let cat = catalog(25);
        let one_way = quote(&request("one_way"), &cat, None);
        assert_eq!(one_way.total_price, Price::new(25));
        assert_eq!(one_way.price_source, PriceSource::Rule);
        assert_eq!(one_way.origin_zone.unwrap().as_str(), "PUJ");
        assert_eq!(one_way.destination_zone.unwrap().as_str(), "BAV");

        let round_trip = quote(&request("round_trip"), &cat, None);
        assert_eq!(round_trip.total_price, Price::new(48));
        assert_eq!(round_trip.original_price, Price::new(48));
    }

    #[test]
    fn test_eighty_percent_discount() {
        let cat = catalog(100);
        let d = discount(80.0);
        let one_way = quote(&request("one_way"), &cat, Some(&d));
        assert_eq!(one_way.total_price, Price::new(20));
        assert_eq!(one_way.original_price, Price::new(100));
        assert!((one_way.discount_percent - 80.0).abs() < f64::EPSILON);

        let round_trip = quote(&request("round_trip"), &cat, Some(&d));
        assert_eq!(round_trip.total_price, Price::new(38));
        assert_eq!(round_trip.original_price, Price::new(190));
    }

    #[test]
    fn test_vehicle_class_name_is_case_insensitive() {
        let mut req = request("one_way");
        req.vehicle_type = Some("suv".into());
        let q = quote(&req, &catalog(25), None);
        assert_eq!(q.vehicle_class, "SUV");
        assert_eq!(q.total_price, Price::new(45));
    }

    #[test]
    fn test_explicit_class_id_takes_precedence() {
        let mut req = request("one_way");
        req.vehicle_type = Some("sedan".into());
        req.vehicle_class_id = Some(suv().id);
        let q = quote(&req, &catalog(25), None);
        assert_eq!(q.vehicle_class_id, suv().id);
    }

    #[test]
    fn test_unknown_class_name_falls_back_to_first_active() {
        let mut req = request("one_way");
        req.vehicle_type = Some("limousine".into());
        let q = quote(&req, &catalog(25), None);
        assert_eq!(q.vehicle_class, "Sedan");
    }

    #[test]
    fn test_literal_destination_rule() {
        let mut cat = catalog(25);
        cat.rules.insert(0, rule(&sedan(), "PUJ", "Cap Cana Marina", 60));
        let mut req = request("one_way");
        req.destination = "cap cana marina, dock 3".into();
        let q = quote(&req, &cat, None);
        assert_eq!(q.base_price, Price::new(60));
        assert!(q.destination_zone.is_none());
    }

    #[test]
    fn test_zone_code_rule_matches_resolved_hotel() {
        let mut req = request("one_way");
        req.destination = "Hard Rock Hotel".into();
        let q = quote(&req, &catalog(25), None);
        assert_eq!(q.base_price, Price::new(25));
        assert_eq!(q.destination_zone, Some(ZoneCode::new("BAV")));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut cat = catalog(25);
        cat.rules.push(rule(&sedan(), "PUJ", "BAV", 99));
        let q = quote(&request("one_way"), &cat, None);
        assert_eq!(q.base_price, Price::new(25));
    }

    #[test]
    fn test_inactive_rule_is_skipped() {
        let mut cat = catalog(25);
        cat.rules[0].active = false;
        let q = quote(&request("one_way"), &cat, None);
        assert_eq!(q.price_source, PriceSource::MinimumFare);
        assert_eq!(q.base_price, Price::new(35));
    }

    #[test]
    fn test_fallback_without_minimum_fare_is_50() {
        let mut req = request("one_way");
        req.vehicle_type = Some("suv".into());
        req.destination = "Santo Domingo".into();
        let q = quote(&req, &catalog(25), None);
        assert_eq!(q.price_source, PriceSource::MinimumFare);
        assert_eq!(q.base_price, FALLBACK_BASE_PRICE);
    }

    #[test]
    fn test_expired_discount_is_ignored() {
        let mut d = discount(50.0);
        d.valid_to = Some(now() - Duration::days(1));
        let q = quote(&request("one_way"), &catalog(100), Some(&d));
        assert_eq!(q.total_price, Price::new(100));
        assert!(q.discount_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_discount_over_100_is_clamped() {
        let q = quote(&request("one_way"), &catalog(100), Some(&discount(150.0)));
        assert_eq!(q.total_price, Price::ZERO);
    }

    #[test]
    fn test_validation_errors() {
        let mut req = request("one_way");
        req.origin = "  ".into();
        let err = FareCalculator::compute(&req, &catalog(25), &zones(), None, now()).unwrap_err();
        assert_eq!(err, FareError::MissingField("origin"));

        let req = request("return");
        let err = FareCalculator::compute(&req, &catalog(25), &zones(), None, now()).unwrap_err();
        assert_eq!(err, FareError::InvalidTripType("return".into()));

        let empty = PricingCatalog::default();
        let err =
            FareCalculator::compute(&request("one_way"), &empty, &zones(), None, now()).unwrap_err();
        assert!(matches!(err, FareError::NoVehicleClass(_)));
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(apply_discount(Price::new(25), 10.0), Price::new(23));
        assert_eq!(apply_discount(Price::new(15), 10.0), Price::new(14));
        assert_eq!(round_trip_price(Price::new(25)), Price::new(48));
        assert_eq!(round_trip_price(Price::new(15)), Price::new(29));
    }

    proptest! {
        #[test]
        fn prop_round_trip_law(base in 1u64..5_000, percent in 0.0f64..100.0) {
            let cat = catalog(base);
            let d = discount(percent);
            let one_way = quote(&request("one_way"), &cat, Some(&d));
            let round_trip = quote(&request("round_trip"), &cat, Some(&d));
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let expected = (one_way.total_price.units() as f64 * 1.9).round() as u64;
            prop_assert_eq!(round_trip.total_price.units(), expected);
        }

        #[test]
        fn prop_fare_is_deterministic(base in 1u64..5_000, percent in 0.0f64..100.0, rt in any::<bool>()) {
            let cat = catalog(base);
            let d = discount(percent);
            let req = request(if rt { "round_trip" } else { "one_way" });
            prop_assert_eq!(quote(&req, &cat, Some(&d)), quote(&req, &cat, Some(&d)));
        }

        #[test]
        fn prop_discount_never_raises_price(base in 1u64..5_000, percent in 0.0f64..100.0) {
            let q = quote(&request("round_trip"), &catalog(base), Some(&discount(percent)));
            prop_assert!(q.total_price <= q.original_price);
        }
    }
}
