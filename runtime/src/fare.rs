//! Fare quoting service.

use crate::metrics::FareMetrics;
use std::sync::Arc;
use transfer_core::environment::{Clock, PricingStore};
use transfer_core::error::FareError;
use transfer_core::pricing::{FareCalculator, FareQuote, FareRequest};
use transfer_core::zone::ZoneResolver;

/// Loads the catalog and active discount, then runs the calculator.
///
/// The discount is fetched once per quote so the calculation itself stays a
/// pure function of its inputs.
#[derive(Clone)]
pub struct FareService {
    pricing: Arc<dyn PricingStore>,
    zones: Arc<dyn ZoneResolver>,
    clock: Arc<dyn Clock>,
}

impl FareService {
    /// Creates a fare service
    #[must_use]
    pub fn new(
        pricing: Arc<dyn PricingStore>,
        zones: Arc<dyn ZoneResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pricing,
            zones,
            clock,
        }
    }

    /// Quotes a fare.
    ///
    /// # Errors
    ///
    /// Returns [`FareError`] for invalid requests, a missing vehicle class or
    /// a pricing store failure.
    pub async fn quote(&self, request: &FareRequest) -> Result<FareQuote, FareError> {
        let now = self.clock.now();
        let catalog = self.pricing.load_catalog().await?;
        let discount = self.pricing.active_discount(now).await?;

        let quote =
            FareCalculator::compute(request, &catalog, self.zones.as_ref(), discount.as_ref(), now)?;

        FareMetrics::record_quote(quote.price_source.as_str());
        tracing::debug!(
            origin = %request.origin,
            destination = %request.destination,
            origin_zone = ?quote.origin_zone,
            destination_zone = ?quote.destination_zone,
            vehicle_class = %quote.vehicle_class,
            price_source = %quote.price_source,
            discount_version = ?discount.as_ref().map(|d| d.version),
            total = %quote.total_price,
            "Fare quoted"
        );
        Ok(quote)
    }
}
