use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mesa_core::dates::OracleError;
use mesa_core::CoreError;
use mesa_reservation::ReservationError;
use serde_json::json;

use crate::reservations::ReservationLine;
use crate::validation::FieldErrors;

pub const NO_TABLES_MESSAGE: &str = "No hay mesas disponibles para la capacidad solicitada";
pub const INVARIANT_MESSAGE: &str = "No se pudo asignar la capacidad completa";

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    Validation(FieldErrors),
    Reservation(ReservationError),
    DateOracle(OracleError),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        AppError::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "message": "Unauthorized" })),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "message": errors.summary(), "errors": errors }),
            ),
            AppError::Reservation(err) => return reservation_response(err),
            AppError::DateOracle(err) => {
                tracing::error!("Date oracle failed: {}", err);
                (StatusCode::BAD_GATEWAY, json!({ "message": err.to_string() }))
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "Internal Server Error" }))
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "Internal Server Error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

fn reservation_response(err: ReservationError) -> Response {
    let (status, body) = match err {
        ReservationError::Schedule(CoreError::ValidationError(msg)) => {
            return AppError::validation("time", msg).into_response();
        }
        ReservationError::Schedule(other) => {
            return AppError::InternalServerError(other.to_string()).into_response();
        }
        ReservationError::Backoffice(source) => {
            tracing::error!("Back office read failed: {}", source);
            (StatusCode::BAD_GATEWAY, json!({ "message": source.to_string() }))
        }
        ReservationError::NoAvailableTables { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "status": "no_available_tables",
                "message": NO_TABLES_MESSAGE,
                "reservations": [],
            }),
        ),
        ReservationError::AllocationInvariant(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "status": "allocation_invariant_violated",
                "message": INVARIANT_MESSAGE,
            }),
        ),
        ReservationError::EventCreation { source } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "status": "error_creating_event",
                "message": source.to_string(),
            }),
        ),
        ReservationError::BookingLines { event_id, tables, source } => {
            let reservations: Vec<ReservationLine> = tables.iter().map(ReservationLine::from).collect();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "status": "error_creating_booking",
                    "message": source.to_string(),
                    "event_id": event_id,
                    "reservations": reservations,
                }),
            )
        }
    };

    (status, Json(body)).into_response()
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
