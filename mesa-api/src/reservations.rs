use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use mesa_core::clock::TimeReference;
use mesa_core::Company;
use mesa_reservation::{AvailabilityRequest, ReservationRequest, ReservedTable};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::middleware::{circuit_breaker_middleware, company_api_key_middleware};
use crate::state::AppState;
use crate::validation::FieldErrors;

const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CurrentTimeResponse {
    pub referencia_tiempo: String,
    pub referencia_tiempo_dia: String,
    pub referencia_tiempo_hora: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HumanDateParams {
    pub dia: Option<String>,
    pub referencia_tiempo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AvailabilityParams {
    pub date: Option<String>,
    pub time: Option<String>,
    pub capacity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationParams {
    pub date: Option<String>,
    pub time: Option<String>,
    pub capacity: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

/// One reserved table as reported to the caller. Times are tenant-local.
#[derive(Debug, Serialize)]
pub struct ReservationLine {
    pub table_id: i64,
    pub table_capacity: u32,
    pub reserved_capacity: u32,
    pub start: String,
    pub stop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i64>,
}

impl From<&ReservedTable> for ReservationLine {
    fn from(table: &ReservedTable) -> Self {
        Self {
            table_id: table.table_id.0,
            table_capacity: table.table_capacity,
            reserved_capacity: table.reserved_capacity,
            start: table.start.format(LINE_TIME_FORMAT).to_string(),
            stop: table.stop.format(LINE_TIME_FORMAT).to_string(),
            booking_id: table.booking_id.map(|id| id.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub event_id: i64,
    pub reservations: Vec<ReservationLine>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    // Routes that reach an upstream service sit behind a per-company breaker.
    let upstream = Router::new()
        .route("/api/reservaciones/{company}/fecha-lenguaje-humano", get(human_date))
        .route("/api/reservaciones/{company}/verificar-disponibilidad", get(check_availability))
        .route("/api/reservaciones/{company}/crear-reserva", get(create_reservation))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), circuit_breaker_middleware));

    Router::new()
        .route("/api/reservaciones/{company}/fecha-actual", get(current_time))
        .merge(upstream)
        .route_layer(axum::middleware::from_fn_with_state(state, company_api_key_middleware))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/reservaciones/{company}/fecha-actual
pub async fn current_time(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
) -> Json<CurrentTimeResponse> {
    info!(company_id = company.id, company_name = %company.name, "currentTime called");

    let now = state.clock.now_in(company.tz(state.default_timezone));
    let reference = TimeReference::from_local(&now);

    Json(CurrentTimeResponse {
        referencia_tiempo: reference.iso,
        referencia_tiempo_dia: reference.day,
        referencia_tiempo_hora: reference.hour,
    })
}

/// GET /api/reservaciones/{company}/fecha-lenguaje-humano
pub async fn human_date(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Query(params): Query<HumanDateParams>,
) -> Result<Response, AppError> {
    let tz = company.tz(state.default_timezone);

    // 1. Validate
    let mut errors = FieldErrors::default();
    let expression = errors.required("dia", params.dia.as_deref()).map(str::to_string);
    let reference = errors.instant("referencia_tiempo", params.referencia_tiempo.as_deref(), tz);
    let Some(expression) = expression.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };

    info!(
        company_id = company.id,
        company_name = %company.name,
        dia = %expression,
        referencia_tiempo = ?params.referencia_tiempo,
        "humanDate called"
    );

    // 2. Resolve against the tenant's "now"
    let reference = reference.unwrap_or_else(|| state.clock.now_in(tz));
    let resolution = state
        .human_dates
        .resolve(&expression, reference)
        .await
        .map_err(AppError::DateOracle)?;

    Ok(match resolution {
        Some(resolution) => Json(json!({
            "valido": resolution.valid,
            "fecha": resolution.date.format("%Y-%m-%d").to_string(),
        }))
        .into_response(),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "valido": false, "fecha": null })),
        )
            .into_response(),
    })
}

/// GET /api/reservaciones/{company}/verificar-disponibilidad
pub async fn check_availability(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let tz = company.tz(state.default_timezone);
    let today = state.clock.now_in(tz).date_naive();

    // 1. Validate
    let mut errors = FieldErrors::default();
    let date = errors.date_from("date", params.date.as_deref(), today);
    let time = errors.time("time", params.time.as_deref());
    let party_size = errors.party_size("capacity", params.capacity.as_deref());

    let request = match (date, time, party_size) {
        (Some(date), Some(time), Some(party_size)) if errors.is_empty() => {
            AvailabilityRequest { date, time, party_size }
        }
        _ => return Err(AppError::Validation(errors)),
    };

    info!(
        company_id = company.id,
        company_name = %company.name,
        date = %request.date,
        time = %request.time.format("%H:%M"),
        capacity = request.party_size,
        "checkAvailability called"
    );

    // 2. Ask the back office
    let backoffice = state
        .backoffice
        .connect(&company)
        .map_err(|e| AppError::Reservation(mesa_reservation::ReservationError::Backoffice(e)))?;

    let report = state
        .availability
        .check(backoffice.as_ref(), tz, &request)
        .await
        .map_err(AppError::Reservation)?;

    Ok(Json(AvailabilityResponse { available: report.available }))
}

/// GET /api/reservaciones/{company}/crear-reserva
pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(company): Extension<Company>,
    Query(params): Query<ReservationParams>,
) -> Result<Json<ReservationResponse>, AppError> {
    let tz = company.tz(state.default_timezone);
    let today = state.clock.now_in(tz).date_naive();

    // 1. Validate
    let mut errors = FieldErrors::default();
    let date = errors.date_from("date", params.date.as_deref(), today);
    let time = errors.time("time", params.time.as_deref());
    let party_size = errors.party_size("capacity", params.capacity.as_deref());
    let full_name = errors.text("full_name", params.full_name.as_deref(), 255);
    let phone_number = errors.text("phone_number", params.phone_number.as_deref(), 50);

    let request = match (date, time, party_size, full_name, phone_number) {
        (Some(date), Some(time), Some(party_size), Some(full_name), Some(phone_number))
            if errors.is_empty() =>
        {
            ReservationRequest { date, time, party_size, full_name, phone_number }
        }
        _ => return Err(AppError::Validation(errors)),
    };

    info!(
        company_id = company.id,
        company_name = %company.name,
        date = %request.date,
        time = %request.time.format("%H:%M"),
        capacity = request.party_size,
        full_name = %request.full_name,
        "createReservation called"
    );

    // 2. Allocate and commit
    let backoffice = state
        .backoffice
        .connect(&company)
        .map_err(|e| AppError::Reservation(mesa_reservation::ReservationError::Backoffice(e)))?;

    let receipt = state
        .reservations
        .create(&company, backoffice.as_ref(), tz, &request)
        .await
        .map_err(AppError::Reservation)?;

    Ok(Json(ReservationResponse {
        status: "ok",
        message: "Reserva creada correctamente",
        event_id: receipt.event_id.0,
        reservations: receipt.tables.iter().map(ReservationLine::from).collect(),
    }))
}
