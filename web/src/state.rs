//! Application state shared by every handler.

use std::sync::Arc;
use transfer_core::environment::{
    AssignmentStore, BookingStore, CheckoutGateway, Clock, FleetStore, Notifier, PricingStore,
};
use transfer_core::zone::ZoneResolver;
use transfer_runtime::{
    BookingService, DispatchConfig, DispatchEngine, EngineDispatchScheduler, FanoutConfig,
    FareService, NotificationFanout, PaymentConfig, PaymentEventProcessor, WebhookVerifier,
};

/// Services behind the HTTP surface.
///
/// Cloning is cheap; every service holds its collaborators behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Fare quoting
    pub fares: FareService,
    /// Booking creation and lookup
    pub bookings: BookingService,
    /// Payment event application
    pub payments: PaymentEventProcessor,
    /// Webhook signature check; `None` rejects every delivery
    pub verifier: Option<WebhookVerifier>,
    /// Dispatch and trip progression
    pub dispatch: Arc<DispatchEngine>,
    /// Time source for signature windows
    pub clock: Arc<dyn Clock>,
}

/// Collaborators the services are built from.
pub struct Collaborators {
    /// Zone resolution for fare quotes
    pub zones: Arc<dyn ZoneResolver>,
    /// Notification delivery
    pub notifier: Arc<dyn Notifier>,
    /// Hosted checkout
    pub checkout: Arc<dyn CheckoutGateway>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires every service over one store implementing all store traits.
    #[must_use]
    pub fn new<S>(
        store: Arc<S>,
        collaborators: Collaborators,
        payment: PaymentConfig,
        dispatch: DispatchConfig,
        fanout: FanoutConfig,
    ) -> Self
    where
        S: BookingStore + FleetStore + AssignmentStore + PricingStore + 'static,
    {
        let Collaborators {
            zones,
            notifier,
            checkout,
            clock,
        } = collaborators;

        let fanout = NotificationFanout::new(notifier, fanout);
        let fares = FareService::new(store.clone(), zones, clock.clone());
        let engine = Arc::new(DispatchEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            fanout.clone(),
            clock.clone(),
            dispatch,
        ));
        let verifier = payment
            .webhook_secret
            .as_ref()
            .map(|secret| WebhookVerifier::new(secret, payment.signature_tolerance));
        let bookings = BookingService::new(
            store.clone(),
            fares.clone(),
            checkout,
            clock.clone(),
            payment.clone(),
        );
        let payments = PaymentEventProcessor::new(
            store,
            fanout,
            Arc::new(EngineDispatchScheduler::new(engine.clone())),
            clock.clone(),
            payment,
        );

        Self {
            fares,
            bookings,
            payments,
            verifier,
            dispatch: engine,
            clock,
        }
    }
}
