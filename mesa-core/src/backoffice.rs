//! Contracts the reservation flow needs from the tenant's system of record.
//!
//! The system of record owns reservation storage and must reject conflicting
//! writes itself: nothing here locks tables between reading occupancy and
//! committing booking lines.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mesa_catalog::{OccupancyInterval, Resource, ResourceId};
use serde::{Deserialize, Serialize};

use crate::company::Company;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingLineId(pub i64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackofficeError {
    #[error("Back office unreachable: {0}")]
    Transport(String),
    #[error("Back office authentication failed for {0}")]
    Authentication(String),
    #[error("Back office rejected call ({code}): {message}")]
    Rpc { code: i64, message: String },
    #[error("Unexpected back office response: {0}")]
    InvalidResponse(String),
}

/// Occupancy over-fetch bounds: records whose stop lies in `(stop_after, stop_until]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyQuery {
    pub stop_after: DateTime<Utc>,
    pub stop_until: DateTime<Utc>,
}

/// Calendar event that anchors a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub appointment_type_id: i64,
    pub appointment_status: String,
    pub notes: String,
}

/// Seats taken from one table for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBookingLine {
    pub resource_id: ResourceId,
    pub appointment_type_id: i64,
    pub reserved_capacity: u32,
    pub event_id: EventId,
}

#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Full table catalog, unfiltered.
    async fn list_resources(&self) -> Result<Vec<Resource>, BackofficeError>;
}

#[async_trait]
pub trait OccupancyProvider: Send + Sync {
    /// Occupancy records that might overlap the query; callers re-check overlap.
    async fn list_occupancy(
        &self,
        query: OccupancyQuery,
    ) -> Result<Vec<OccupancyInterval<DateTime<Utc>>>, BackofficeError>;
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn create_event(&self, event: &NewEvent) -> Result<EventId, BackofficeError>;
}

#[async_trait]
pub trait BookingLineSink: Send + Sync {
    async fn create_booking_line(
        &self,
        line: &NewBookingLine,
    ) -> Result<BookingLineId, BackofficeError>;
}

/// Everything a tenant's back office provides.
pub trait Backoffice: ResourceDirectory + OccupancyProvider + EventSink + BookingLineSink {}

impl<T> Backoffice for T where T: ResourceDirectory + OccupancyProvider + EventSink + BookingLineSink {}

/// Opens a back-office session for a tenant.
pub trait BackofficeConnector: Send + Sync {
    fn connect(&self, company: &Company) -> Result<Arc<dyn Backoffice>, BackofficeError>;
}
