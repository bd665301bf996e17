use std::time::Duration;

use async_trait::async_trait;
use mesa_core::notify::{normalize_phone, NotificationSink, NotifyError};
use mesa_core::Company;
use mesa_shared::{Masked, ReservationConfirmedEvent};
use tracing::{debug, info};

/// Posts reservation confirmations to the tenant's WhatsApp automation webhook.
pub struct WhatsAppWebhookNotifier {
    http: reqwest::Client,
    default_country_code: String,
    test_suffix: bool,
}

impl WhatsAppWebhookNotifier {
    pub fn new(
        timeout: Duration,
        default_country_code: impl Into<String>,
        test_suffix: bool,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            default_country_code: default_country_code.into(),
            test_suffix,
        })
    }

    fn target_url(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        if self.test_suffix {
            format!("{}-test", base)
        } else {
            base.to_string()
        }
    }
}

#[async_trait]
impl NotificationSink for WhatsAppWebhookNotifier {
    async fn reservation_confirmed(
        &self,
        company: &Company,
        event: &ReservationConfirmedEvent,
    ) -> Result<(), NotifyError> {
        let Some(base) = company.whatsapp_webhook_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            debug!(company_id = company.id, "No WhatsApp webhook configured, skipping confirmation");
            return Ok(());
        };

        let url = self.target_url(base);
        let payload = ReservationConfirmedEvent {
            phone_number: normalize_phone(&event.phone_number, &self.default_country_code),
            ..event.clone()
        };

        info!(
            company_id = company.id,
            company_name = %company.name,
            url = %url,
            phone = ?Masked(&payload.phone_number),
            date = %payload.date,
            capacity = payload.capacity,
            "Sending reservation confirmation to webhook"
        );

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected { status: status.as_u16() });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use mesa_core::OdooCredentials;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn company(webhook: Option<String>) -> Company {
        Company {
            id: 9,
            name: "El Puerto".to_string(),
            slug: None,
            api_token: None,
            odoo: OdooCredentials {
                host: String::new(),
                database: String::new(),
                username: String::new(),
                password: Masked(String::new()),
            },
            timezone: "Atlantic/Canary".to_string(),
            whatsapp_webhook_url: webhook,
            assigned_phone_number: None,
            appointment_status: "request".to_string(),
        }
    }

    fn event() -> ReservationConfirmedEvent {
        ReservationConfirmedEvent {
            full_name: "Luis Díaz".to_string(),
            phone_number: "600 111 222".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            time: NaiveTime::from_hms_opt(21, 15, 0).unwrap(),
            capacity: 2,
        }
    }

    fn notifier(test_suffix: bool) -> WhatsAppWebhookNotifier {
        WhatsAppWebhookNotifier::new(Duration::from_secs(5), "+34", test_suffix).unwrap()
    }

    #[tokio::test]
    async fn test_posts_normalized_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/webhook/reservas"))
            .and(body_json(json!({
                "full_name": "Luis Díaz",
                "phone_number": "+34600111222",
                "date": "2026-02-14",
                "time": "21:15",
                "capacity": 2
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let company = company(Some(format!("{}/webhook/reservas/", server.uri())));

        notifier(false).reservation_confirmed(&company, &event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_test_suffix_is_appended() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/webhook/reservas-test"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let company = company(Some(format!("{}/webhook/reservas", server.uri())));

        notifier(true).reservation_confirmed(&company, &event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let company = company(Some(server.uri()));
        let result = notifier(false).reservation_confirmed(&company, &event()).await;

        assert!(matches!(result, Err(NotifyError::Rejected { status: 500 })));
    }

    #[tokio::test]
    async fn test_missing_webhook_is_skipped() {
        let result = notifier(false).reservation_confirmed(&company(None), &event()).await;

        assert!(result.is_ok());
    }
}
