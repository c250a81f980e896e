//! Location text → pricing zone.
//!
//! [`ZoneResolver`] is the seam; [`KeywordZoneResolver`] is the shipped
//! heuristic (case-insensitive substring matching, first match wins). A
//! geocoding resolver can replace it without touching fares or dispatch.

use crate::types::ZoneCode;
use serde::{Deserialize, Serialize};

/// Maps free-text locations to coarse pricing zones.
pub trait ZoneResolver: Send + Sync {
    /// Returns the zone for `location`, or `None` when nothing matches.
    fn resolve(&self, location: &str) -> Option<ZoneCode>;
}

/// Hotel lookup row: a hotel name plus alternate search terms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelZone {
    /// Canonical hotel name
    pub hotel_name: String,
    /// Zone the hotel belongs to
    pub zone_code: ZoneCode,
    /// Alternate spellings, resort names, neighbourhoods
    #[serde(default)]
    pub search_terms: Vec<String>,
}

/// Fixed airport alias set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AirportAlias {
    /// Airport zone
    pub zone_code: ZoneCode,
    /// Lowercase fragments that identify the airport
    pub aliases: Vec<String>,
}

impl AirportAlias {
    /// Creates an alias set; fragments are lowercased
    #[must_use]
    pub fn new(zone_code: impl AsRef<str>, aliases: &[&str]) -> Self {
        Self {
            zone_code: ZoneCode::new(zone_code),
            aliases: aliases.iter().map(|a| a.trim().to_lowercase()).collect(),
        }
    }
}

/// Substring heuristic: airport aliases, then hotel names, then search terms.
#[derive(Clone, Debug, Default)]
pub struct KeywordZoneResolver {
    airports: Vec<AirportAlias>,
    hotels: Vec<HotelZone>,
}

impl KeywordZoneResolver {
    /// Creates a resolver with the default airport aliases and the given hotel table
    #[must_use]
    pub fn new(hotels: Vec<HotelZone>) -> Self {
        Self {
            airports: Self::default_airports(),
            hotels,
        }
    }

    /// Airports served out of the box
    #[must_use]
    pub fn default_airports() -> Vec<AirportAlias> {
        vec![AirportAlias::new(
            "PUJ",
            &["puj", "punta cana airport", "punta cana international"],
        )]
    }

    /// Replaces the airport alias set
    #[must_use]
    pub fn with_airports(mut self, airports: Vec<AirportAlias>) -> Self {
        self.airports = airports;
        self
    }

    /// Hotel table in scan order
    #[must_use]
    pub fn hotels(&self) -> &[HotelZone] {
        &self.hotels
    }
}

fn contains_fragment(haystack: &str, fragment: &str) -> bool {
    let fragment = fragment.trim().to_lowercase();
    !fragment.is_empty() && haystack.contains(&fragment)
}

impl ZoneResolver for KeywordZoneResolver {
    fn resolve(&self, location: &str) -> Option<ZoneCode> {
        let text = location.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        let airport = self
            .airports
            .iter()
            .find(|a| a.aliases.iter().any(|alias| contains_fragment(&text, alias)));
        if let Some(airport) = airport {
            return Some(airport.zone_code.clone());
        }

        if let Some(hotel) = self
            .hotels
            .iter()
            .find(|h| contains_fragment(&text, &h.hotel_name))
        {
            return Some(hotel.zone_code.clone());
        }

        self.hotels
            .iter()
            .find(|h| h.search_terms.iter().any(|term| contains_fragment(&text, term)))
            .map(|h| h.zone_code.clone())
    }
}
