//! Odoo back office over JSON-RPC (`POST {host}/jsonrpc`).
//!
//! Tables come from `appointment.resource`, occupancy from
//! `appointment.booking.line`, and a reservation is written as one
//! `calendar.event` plus one booking line per table. Odoo stores datetimes as
//! naive UTC strings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use mesa_catalog::{OccupancyInterval, Resource, ResourceRef};
use mesa_core::backoffice::{
    Backoffice, BackofficeConnector, BackofficeError, BookingLineId, BookingLineSink, EventId,
    EventSink, NewBookingLine, NewEvent, OccupancyProvider, OccupancyQuery, ResourceDirectory,
};
use mesa_core::{Company, OdooCredentials};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const ODOO_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

const RESOURCE_MODEL: &str = "appointment.resource";
const BOOKING_LINE_MODEL: &str = "appointment.booking.line";
const EVENT_MODEL: &str = "calendar.event";

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: Option<String>,
}

/// One authenticated session against a tenant's Odoo database.
pub struct OdooClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: OdooCredentials,
    uid: OnceCell<i64>,
    request_id: AtomicU64,
}

impl OdooClient {
    pub fn new(http: reqwest::Client, credentials: OdooCredentials) -> Self {
        let endpoint = format!("{}/jsonrpc", credentials.host.trim_end_matches('/'));
        Self {
            http,
            endpoint,
            credentials,
            uid: OnceCell::new(),
            request_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, service: &str, method: &str, args: Value) -> Result<Value, BackofficeError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": { "service": service, "method": method, "args": args },
            "id": id,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| BackofficeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackofficeError::Transport(format!(
                "{} answered HTTP {}",
                self.endpoint,
                status.as_u16()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| BackofficeError::InvalidResponse(e.to_string()))?;

        if let Some(error) = body.error {
            let message = error
                .data
                .and_then(|d| d.message)
                .unwrap_or(error.message);
            return Err(BackofficeError::Rpc { code: error.code, message });
        }

        body.result
            .ok_or_else(|| BackofficeError::InvalidResponse("response carries no result".to_string()))
    }

    /// User id for this session; logs in on first use.
    async fn uid(&self) -> Result<i64, BackofficeError> {
        self.uid
            .get_or_try_init(|| async {
                let result = self
                    .call(
                        "common",
                        "login",
                        json!([
                            self.credentials.database,
                            self.credentials.username,
                            self.credentials.password.expose(),
                        ]),
                    )
                    .await?;

                debug!(database = %self.credentials.database, "Odoo login");

                result.as_i64().ok_or_else(|| {
                    BackofficeError::Authentication(format!(
                        "{}@{}",
                        self.credentials.username, self.credentials.database
                    ))
                })
            })
            .await
            .copied()
    }

    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, BackofficeError> {
        let uid = self.uid().await?;
        self.call(
            "object",
            "execute_kw",
            json!([
                self.credentials.database,
                uid,
                self.credentials.password.expose(),
                model,
                method,
                args,
                kwargs,
            ]),
        )
        .await
    }

    async fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
    ) -> Result<Vec<Value>, BackofficeError> {
        let result = self
            .execute_kw(model, "search_read", json!([domain]), json!({ "fields": fields }))
            .await?;

        match result {
            Value::Array(rows) => Ok(rows),
            other => Err(BackofficeError::InvalidResponse(format!(
                "{} search_read returned {}",
                model, other
            ))),
        }
    }

    async fn create(&self, model: &str, values: Value) -> Result<i64, BackofficeError> {
        let result = self.execute_kw(model, "create", json!([values]), json!({})).await?;
        result
            .as_i64()
            .ok_or_else(|| BackofficeError::InvalidResponse(format!("{} create returned {}", model, result)))
    }
}

/// Id of a many2one value (`[id, "display name"]`); `None` for `false`.
fn many2one_id(value: &Value) -> Option<i64> {
    value.as_array().and_then(|pair| pair.first()).and_then(Value::as_i64)
}

fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    NaiveDateTime::parse_from_str(raw, ODOO_DATETIME)
        .ok()
        .map(|naive| naive.and_utc())
}

fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format(ODOO_DATETIME).to_string()
}

fn parse_resource(row: &Value) -> Option<Resource> {
    let id = row.get("id").and_then(Value::as_i64)?;
    let capacity = row
        .get("capacity")
        .and_then(Value::as_i64)
        .map(|c| u32::try_from(c.max(0)).unwrap_or(u32::MAX))
        .unwrap_or(0);
    let active = row.get("active").and_then(Value::as_bool).unwrap_or(true);
    // Booking lines point at the appointment.resource id; a table without a
    // linked resource record cannot be tracked for occupancy.
    let external_ref = row.get("resource_id").and_then(many2one_id).map(|_| id);

    Some(Resource::new(id, external_ref, capacity, active))
}

fn parse_occupancy(row: &Value) -> Option<OccupancyInterval<DateTime<Utc>>> {
    let resource = row.get("appointment_resource_id").and_then(many2one_id)?;
    let start = row.get("event_start").and_then(parse_datetime)?;
    let end = row.get("event_stop").and_then(parse_datetime)?;

    Some(OccupancyInterval::new(ResourceRef(resource), start, end))
}

#[async_trait]
impl ResourceDirectory for OdooClient {
    async fn list_resources(&self) -> Result<Vec<Resource>, BackofficeError> {
        let rows = self
            .search_read(RESOURCE_MODEL, json!([]), &["id", "resource_id", "capacity", "active"])
            .await?;

        let total = rows.len();
        let resources: Vec<Resource> = rows.iter().filter_map(parse_resource).collect();
        if resources.len() != total {
            warn!(skipped = total - resources.len(), "Skipped appointment.resource rows without id");
        }

        Ok(resources)
    }
}

#[async_trait]
impl OccupancyProvider for OdooClient {
    async fn list_occupancy(
        &self,
        query: OccupancyQuery,
    ) -> Result<Vec<OccupancyInterval<DateTime<Utc>>>, BackofficeError> {
        let domain = json!([
            ["active", "=", true],
            ["event_stop", ">", format_datetime(&query.stop_after)],
            ["event_stop", "<=", format_datetime(&query.stop_until)],
        ]);

        let rows = self
            .search_read(
                BOOKING_LINE_MODEL,
                domain,
                &["appointment_resource_id", "event_start", "event_stop"],
            )
            .await?;

        Ok(rows.iter().filter_map(parse_occupancy).collect())
    }
}

#[async_trait]
impl EventSink for OdooClient {
    async fn create_event(&self, event: &NewEvent) -> Result<EventId, BackofficeError> {
        let id = self
            .create(
                EVENT_MODEL,
                json!({
                    "name": event.title,
                    "start": format_datetime(&event.start),
                    "stop": format_datetime(&event.stop),
                    "appointment_type_id": event.appointment_type_id,
                    "appointment_status": event.appointment_status,
                    "notes": event.notes,
                }),
            )
            .await?;
        Ok(EventId(id))
    }
}

#[async_trait]
impl BookingLineSink for OdooClient {
    async fn create_booking_line(
        &self,
        line: &NewBookingLine,
    ) -> Result<BookingLineId, BackofficeError> {
        let id = self
            .create(
                BOOKING_LINE_MODEL,
                json!({
                    "appointment_resource_id": line.resource_id.0,
                    "appointment_type_id": line.appointment_type_id,
                    "capacity_reserved": line.reserved_capacity,
                    "calendar_event_id": line.event_id.0,
                }),
            )
            .await?;
        Ok(BookingLineId(id))
    }
}

/// Opens an [`OdooClient`] per request, sharing one HTTP connection pool.
pub struct OdooConnector {
    http: reqwest::Client,
}

impl OdooConnector {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl BackofficeConnector for OdooConnector {
    fn connect(&self, company: &Company) -> Result<Arc<dyn Backoffice>, BackofficeError> {
        if company.odoo.host.trim().is_empty() {
            return Err(BackofficeError::Transport(format!(
                "company {} has no Odoo host configured",
                company.id
            )));
        }
        let client: Arc<dyn Backoffice> =
            Arc::new(OdooClient::new(self.http.clone(), company.odoo.clone()));
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mesa_catalog::ResourceId;
    use mesa_shared::Masked;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OdooClient {
        OdooClient::new(
            reqwest::Client::new(),
            OdooCredentials {
                host: format!("{}/", server.uri()),
                database: "tasca".to_string(),
                username: "bot@tasca.es".to_string(),
                password: Masked("s3cret".to_string()),
            },
        )
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    async fn mount_login(server: &MockServer, uid: Value) {
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_string_contains("\"login\""))
            .respond_with(rpc_result(uid))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_resources_parses_rows_and_logs_in_once() {
        let server = MockServer::start().await;
        mount_login(&server, json!(7)).await;

        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_string_contains("\"appointment.resource\""))
            .respond_with(rpc_result(json!([
                { "id": 1, "resource_id": [41, "Mesa 1"], "capacity": 4, "active": true },
                { "id": 2, "resource_id": false, "capacity": 2, "active": true },
                { "id": 3, "resource_id": [43, "Terraza"], "capacity": 6, "active": false },
                { "resource_id": [44, "Sin id"], "capacity": 2 },
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let odoo = client(&server);
        let first = odoo.list_resources().await.unwrap();
        let second = odoo.list_resources().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], Resource::new(1, Some(1), 4, true));
        assert_eq!(first[1].external_ref, None);
        assert!(!first[2].active);
    }

    #[tokio::test]
    async fn test_list_occupancy_formats_domain_and_skips_incomplete_rows() {
        let server = MockServer::start().await;
        mount_login(&server, json!(7)).await;

        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_string_contains("\"appointment.booking.line\""))
            .and(body_string_contains("2026-01-15 20:00:00"))
            .and(body_string_contains("2026-01-16 03:00:00"))
            .respond_with(rpc_result(json!([
                {
                    "appointment_resource_id": [1, "Mesa 1"],
                    "event_start": "2026-01-15 19:30:00",
                    "event_stop": "2026-01-15 21:00:00"
                },
                {
                    "appointment_resource_id": false,
                    "event_start": "2026-01-15 19:30:00",
                    "event_stop": "2026-01-15 21:00:00"
                },
                {
                    "appointment_resource_id": [2, "Mesa 2"],
                    "event_start": false,
                    "event_stop": "2026-01-15 22:00:00"
                },
            ])))
            .mount(&server)
            .await;

        let query = OccupancyQuery {
            stop_after: Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap(),
            stop_until: Utc.with_ymd_and_hms(2026, 1, 16, 3, 0, 0).unwrap(),
        };
        let occupancy = client(&server).list_occupancy(query).await.unwrap();

        assert_eq!(occupancy.len(), 1);
        assert_eq!(occupancy[0].resource_ref, ResourceRef(1));
        assert_eq!(occupancy[0].start, Utc.with_ymd_and_hms(2026, 1, 15, 19, 30, 0).unwrap());
        assert_eq!(occupancy[0].end, Utc.with_ymd_and_hms(2026, 1, 15, 21, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_create_event_and_booking_line() {
        let server = MockServer::start().await;
        mount_login(&server, json!(7)).await;

        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_string_contains("\"calendar.event\""))
            .and(body_string_contains("\"start\":\"2026-01-15 20:00:00\""))
            .and(body_string_contains("\"appointment_status\":\"request\""))
            .respond_with(rpc_result(json!(321)))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_string_contains("\"capacity_reserved\":3"))
            .and(body_string_contains("\"calendar_event_id\":321"))
            .respond_with(rpc_result(json!(654)))
            .mount(&server)
            .await;

        let odoo = client(&server);
        let event_id = odoo
            .create_event(&NewEvent {
                title: "Reserva Ana".to_string(),
                start: Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap(),
                stop: Utc.with_ymd_and_hms(2026, 1, 15, 21, 30, 0).unwrap(),
                appointment_type_id: 1,
                appointment_status: "request".to_string(),
                notes: "Teléfono 600111222".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(event_id, EventId(321));

        let booking_id = odoo
            .create_booking_line(&NewBookingLine {
                resource_id: ResourceId(4),
                appointment_type_id: 2,
                reserved_capacity: 3,
                event_id,
            })
            .await
            .unwrap();
        assert_eq!(booking_id, BookingLineId(654));
    }

    #[tokio::test]
    async fn test_rejected_login_is_authentication_error() {
        let server = MockServer::start().await;
        mount_login(&server, json!(false)).await;

        let result = client(&server).list_resources().await;

        assert!(matches!(result, Err(BackofficeError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_rpc_error_carries_server_message() {
        let server = MockServer::start().await;
        mount_login(&server, json!(7)).await;

        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_string_contains("\"calendar.event\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "error": {
                    "code": 200,
                    "message": "Odoo Server Error",
                    "data": { "message": "Missing required field: stop" }
                }
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .create_event(&NewEvent {
                title: "Reserva Ana".to_string(),
                start: Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap(),
                stop: Utc.with_ymd_and_hms(2026, 1, 15, 21, 30, 0).unwrap(),
                appointment_type_id: 1,
                appointment_status: "request".to_string(),
                notes: String::new(),
            })
            .await;

        match result {
            Err(BackofficeError::Rpc { code, message }) => {
                assert_eq!(code, 200);
                assert_eq!(message, "Missing required field: stop");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_failure_is_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let result = client(&server).list_resources().await;

        assert!(matches!(result, Err(BackofficeError::Transport(_))));
    }
}
