//! Identifiers and value objects shared by every part of the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a booking
    BookingId
);
uuid_id!(
    /// Unique identifier for a driver
    DriverId
);
uuid_id!(
    /// Unique identifier for a vehicle
    VehicleId
);
uuid_id!(
    /// Unique identifier for a trip assignment
    AssignmentId
);
uuid_id!(
    /// Unique identifier for a vehicle class (pricing category)
    VehicleClassId
);
uuid_id!(
    /// Unique identifier for a pricing rule
    PricingRuleId
);
uuid_id!(
    /// Unique identifier for a global discount record
    DiscountId
);

// ============================================================================
// Price (whole currency units)
// ============================================================================

/// A price in whole currency units.
///
/// Every fare is rounded to the nearest unit before it is stored, so the
/// engine never carries fractional amounts. Conversion to the payment
/// provider's minor units happens at the edge via [`Price::minor_units`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Zero units
    pub const ZERO: Self = Self(0);

    /// Creates a price from whole units
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the amount in whole units
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0
    }

    /// Returns the amount in minor units (cents)
    #[must_use]
    pub const fn minor_units(&self) -> u64 {
        self.0.saturating_mul(100)
    }

    /// Builds a price from provider minor units, rounding half away from zero
    #[must_use]
    pub const fn from_minor_units(minor: u64) -> Self {
        Self(minor.saturating_add(50) / 100)
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Vehicle kind
// ============================================================================

/// Normalised vehicle type name (`sedan`, `suv`, `van`, ...).
///
/// Stored lowercase and trimmed so lookups are case-insensitive everywhere.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VehicleKind(String);

impl VehicleKind {
    /// Default vehicle type when a booking does not name one
    pub const DEFAULT: &'static str = "sedan";

    /// Creates a normalised vehicle kind
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// Returns the normalised name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a free-text name
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other.trim().to_lowercase()
    }
}

impl Default for VehicleKind {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl From<String> for VehicleKind {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for VehicleKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<VehicleKind> for String {
    fn from(value: VehicleKind) -> Self {
        value.0
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Zone code
// ============================================================================

/// Coarse pricing zone (airport code such as `PUJ`, or a hotel-cluster code).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneCode(String);

impl ZoneCode {
    /// Creates a zone code; codes compare exactly but are stored trimmed
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_string())
    }

    /// Returns the code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive equality against free text
    #[must_use]
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for ZoneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Reference code
// ============================================================================

/// Human-facing booking reference (e.g. `TRF-7K2QXA`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceCode(String);

impl ReferenceCode {
    /// Prefix carried by every generated reference code
    pub const PREFIX: &'static str = "TRF-";

    /// Wraps an existing reference code
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
