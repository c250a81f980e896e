//! Typed configuration for the runtime services.
//!
//! Values are read from the environment by the web crate and handed to the
//! services through these structs.

use std::time::Duration;
use transfer_core::types::{Price, VehicleKind};

/// Payment handling settings.
#[derive(Clone, Debug)]
pub struct PaymentConfig {
    /// Shared secret for webhook signatures; `None` disables verification
    pub webhook_secret: Option<String>,
    /// Accepted clock skew for signature timestamps
    pub signature_tolerance: Duration,
    /// Currency used for checkout sessions and as the fallback on events
    pub currency: String,
    /// Smallest total the provider will charge
    pub minimum_charge: Price,
    /// Whether a confirmed payment triggers automatic dispatch
    pub auto_dispatch: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            signature_tolerance: Duration::from_secs(300),
            currency: "usd".to_string(),
            minimum_charge: Price::new(1),
            auto_dispatch: true,
        }
    }
}

impl PaymentConfig {
    /// Sets the webhook secret
    #[must_use]
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Sets the signature tolerance
    #[must_use]
    pub const fn with_signature_tolerance(mut self, tolerance: Duration) -> Self {
        self.signature_tolerance = tolerance;
        self
    }

    /// Sets the checkout currency
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Sets the minimum chargeable amount
    #[must_use]
    pub const fn with_minimum_charge(mut self, minimum: Price) -> Self {
        self.minimum_charge = minimum;
        self
    }

    /// Enables or disables automatic dispatch on payment
    #[must_use]
    pub const fn with_auto_dispatch(mut self, enabled: bool) -> Self {
        self.auto_dispatch = enabled;
        self
    }
}

/// Dispatch settings.
#[derive(Clone, Debug, Default)]
pub struct DispatchConfig {
    /// Vehicle type used when neither the request nor the booking names one
    pub default_vehicle_type: VehicleKind,
}

impl DispatchConfig {
    /// Sets the default vehicle type
    #[must_use]
    pub fn with_default_vehicle_type(mut self, kind: impl Into<VehicleKind>) -> Self {
        self.default_vehicle_type = kind.into();
        self
    }
}

/// Notification fanout settings.
#[derive(Clone, Debug, Default)]
pub struct FanoutConfig {
    /// Operations mailbox for admin alerts
    pub admin_email: Option<String>,
    /// Operations phone for admin SMS alerts
    pub admin_phone: Option<String>,
}

impl FanoutConfig {
    /// Sets the admin email
    #[must_use]
    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self
    }

    /// Sets the admin phone
    #[must_use]
    pub fn with_admin_phone(mut self, phone: impl Into<String>) -> Self {
        self.admin_phone = Some(phone.into());
        self
    }
}
