//! Fire-and-forget notification delivery.
//!
//! [`NotificationFanout::notify`] hands the request to a spawned task and
//! returns at once. Delivery is attempted on every hinted channel; failures
//! are logged per channel and never reach the caller.

use crate::config::FanoutConfig;
use crate::metrics::NotificationMetrics;
use async_trait::async_trait;
use std::sync::Arc;
use transfer_core::environment::Notifier;
use transfer_core::error::NotifyError;
use transfer_core::notification::{Channel, DeliveryReport, NotificationRequest, RecipientKind};

/// Spawns notification deliveries on the tokio runtime.
#[derive(Clone)]
pub struct NotificationFanout {
    notifier: Arc<dyn Notifier>,
    config: FanoutConfig,
}

impl NotificationFanout {
    /// Creates a fanout over `notifier`
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, config: FanoutConfig) -> Self {
        Self { notifier, config }
    }

    /// Sends `request` in the background.
    pub fn notify(&self, request: NotificationRequest) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                booking_id = %request.booking_id,
                notification_type = %request.notification_type,
                "No async runtime available, notification dropped"
            );
            return;
        };
        let fanout = self.clone();
        handle.spawn(async move {
            fanout.deliver(request).await;
        });
    }

    /// Delivers `request` on every hinted channel and reports the results.
    pub async fn deliver(&self, mut request: NotificationRequest) -> DeliveryReport {
        if request.recipient_kind == RecipientKind::Admin {
            request.recipient.email.clone_from(&self.config.admin_email);
            request.recipient.phone.clone_from(&self.config.admin_phone);
        }

        let mut report = DeliveryReport::default();
        if request.channels.is_empty() {
            tracing::warn!(
                booking_id = %request.booking_id,
                notification_type = %request.notification_type,
                error = %NotifyError::NoChannel,
                "Notification not sent"
            );
            return report;
        }

        for channel in request.channels.clone() {
            match self.deliver_on(&request, channel).await {
                Ok(()) => {
                    NotificationMetrics::record(request.notification_type.as_str(), "delivered");
                    report.delivered.push(channel);
                }
                Err(e) => {
                    NotificationMetrics::record(request.notification_type.as_str(), "failed");
                    tracing::warn!(
                        booking_id = %request.booking_id,
                        notification_type = %request.notification_type,
                        recipient = %request.recipient_kind,
                        channel = %channel,
                        error = %e,
                        "Notification delivery failed"
                    );
                    report.failed.push((channel, e.to_string()));
                }
            }
        }

        if report.is_partial() {
            tracing::info!(
                booking_id = %request.booking_id,
                notification_type = %request.notification_type,
                delivered = ?report.delivered,
                "Notification partially delivered"
            );
        }
        report
    }

    async fn deliver_on(
        &self,
        request: &NotificationRequest,
        channel: Channel,
    ) -> Result<(), NotifyError> {
        if request.recipient.address(channel).is_none() {
            return Err(NotifyError::Undeliverable(format!(
                "no {channel} address for {}",
                request.recipient_kind
            )));
        }
        self.notifier.deliver(request, channel).await
    }
}

/// Notifier that only logs the request. Used when no provider is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn deliver(&self, request: &NotificationRequest, channel: Channel) -> Result<(), NotifyError> {
        tracing::info!(
            booking_id = %request.booking_id,
            notification_type = %request.notification_type,
            recipient = %request.recipient_kind,
            channel = %channel,
            address = request.recipient.address(channel).unwrap_or_default(),
            payload = %request.payload,
            "Notification"
        );
        Ok(())
    }
}
