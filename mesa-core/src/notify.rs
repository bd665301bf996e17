use async_trait::async_trait;
use mesa_shared::ReservationConfirmedEvent;

use crate::company::Company;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
    #[error("Notification endpoint answered {status}")]
    Rejected { status: u16 },
}

/// Best-effort confirmation channel. Callers log and discard failures.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn reservation_confirmed(
        &self,
        company: &Company,
        event: &ReservationConfirmedEvent,
    ) -> Result<(), NotifyError>;
}

/// Sink that drops every notification.
pub struct NoopNotificationSink;

#[async_trait]
impl NotificationSink for NoopNotificationSink {
    async fn reservation_confirmed(
        &self,
        company: &Company,
        _event: &ReservationConfirmedEvent,
    ) -> Result<(), NotifyError> {
        tracing::debug!(company_id = company.id, "Notifications disabled, skipping confirmation");
        Ok(())
    }
}

/// Strip whitespace and prefix `default_country_code` when no international prefix is present.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> String {
    let phone: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if phone.starts_with('+') {
        phone
    } else {
        format!("{}{}", default_country_code, phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("600 111 222", "+34"), "+34600111222");
        assert_eq!(normalize_phone("+44 20 7946 0000", "+34"), "+442079460000");
        assert_eq!(normalize_phone("\t600111222\n", "+34"), "+34600111222");
    }
}
