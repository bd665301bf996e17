//! In-memory back office for tests and local demos.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mesa_catalog::{OccupancyInterval, Resource};
use mesa_core::backoffice::{
    Backoffice, BackofficeConnector, BackofficeError, BookingLineId, BookingLineSink, EventId,
    EventSink, NewBookingLine, NewEvent, OccupancyProvider, OccupancyQuery, ResourceDirectory,
};
use mesa_core::Company;
use tokio::sync::Mutex;

#[derive(Default)]
struct Ledger {
    events: Vec<NewEvent>,
    lines: Vec<NewBookingLine>,
    occupancy_queries: Vec<OccupancyQuery>,
}

/// Back office holding its catalog and occupancy in memory and recording every write.
#[derive(Default)]
pub struct InMemoryBackoffice {
    resources: Vec<Resource>,
    occupancy: Vec<OccupancyInterval<DateTime<Utc>>>,
    fail_reads: bool,
    fail_events: bool,
    fail_lines_after: Option<usize>,
    ledger: Mutex<Ledger>,
}

impl InMemoryBackoffice {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            ..Default::default()
        }
    }

    pub fn with_occupancy(mut self, occupancy: Vec<OccupancyInterval<DateTime<Utc>>>) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_events(mut self) -> Self {
        self.fail_events = true;
        self
    }

    /// Accept `committed` booking lines, then reject the rest.
    pub fn failing_lines_after(mut self, committed: usize) -> Self {
        self.fail_lines_after = Some(committed);
        self
    }

    pub async fn events(&self) -> Vec<NewEvent> {
        self.ledger.lock().await.events.clone()
    }

    pub async fn booking_lines(&self) -> Vec<NewBookingLine> {
        self.ledger.lock().await.lines.clone()
    }

    pub async fn occupancy_queries(&self) -> Vec<OccupancyQuery> {
        self.ledger.lock().await.occupancy_queries.clone()
    }

    fn unavailable() -> BackofficeError {
        BackofficeError::Transport("in-memory back office offline".to_string())
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryBackoffice {
    async fn list_resources(&self) -> Result<Vec<Resource>, BackofficeError> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        Ok(self.resources.clone())
    }
}

#[async_trait]
impl OccupancyProvider for InMemoryBackoffice {
    async fn list_occupancy(
        &self,
        query: OccupancyQuery,
    ) -> Result<Vec<OccupancyInterval<DateTime<Utc>>>, BackofficeError> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        self.ledger.lock().await.occupancy_queries.push(query);

        Ok(self
            .occupancy
            .iter()
            .filter(|o| o.end > query.stop_after && o.end <= query.stop_until)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventSink for InMemoryBackoffice {
    async fn create_event(&self, event: &NewEvent) -> Result<EventId, BackofficeError> {
        if self.fail_events {
            return Err(BackofficeError::Rpc {
                code: 200,
                message: "calendar.event create rejected".to_string(),
            });
        }
        let mut ledger = self.ledger.lock().await;
        ledger.events.push(event.clone());
        Ok(EventId(1000 + ledger.events.len() as i64))
    }
}

#[async_trait]
impl BookingLineSink for InMemoryBackoffice {
    async fn create_booking_line(
        &self,
        line: &NewBookingLine,
    ) -> Result<BookingLineId, BackofficeError> {
        let mut ledger = self.ledger.lock().await;
        if let Some(limit) = self.fail_lines_after {
            if ledger.lines.len() >= limit {
                return Err(BackofficeError::Rpc {
                    code: 200,
                    message: "appointment.booking.line create rejected".to_string(),
                });
            }
        }
        ledger.lines.push(line.clone());
        Ok(BookingLineId(5000 + ledger.lines.len() as i64))
    }
}

/// Hands every tenant the same in-memory back office.
pub struct InMemoryConnector {
    backoffice: Arc<InMemoryBackoffice>,
}

impl InMemoryConnector {
    pub fn new(backoffice: Arc<InMemoryBackoffice>) -> Self {
        Self { backoffice }
    }
}

impl BackofficeConnector for InMemoryConnector {
    fn connect(&self, _company: &Company) -> Result<Arc<dyn Backoffice>, BackofficeError> {
        let backoffice: Arc<dyn Backoffice> = self.backoffice.clone();
        Ok(backoffice)
    }
}
