use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use mesa_catalog::{AllocationLine, ResourceId, SelectionStrategy};
use mesa_core::backoffice::{BookingLineId, EventId};

/// Capacity question for one date and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: u32,
}

/// Validated reservation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: u32,
    pub full_name: String,
    pub phone_number: String,
}

/// A table held by a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedTable {
    pub table_id: ResourceId,
    pub table_capacity: u32,
    pub reserved_capacity: u32,
    pub start: DateTime<Tz>,
    pub stop: DateTime<Tz>,
    pub booking_id: Option<BookingLineId>,
}

impl ReservedTable {
    pub fn from_line(line: &AllocationLine, start: DateTime<Tz>, stop: DateTime<Tz>) -> Self {
        Self {
            table_id: line.resource_id,
            table_capacity: line.resource_capacity,
            reserved_capacity: line.reserved_capacity,
            start,
            stop,
            booking_id: None,
        }
    }
}

/// Result of a committed reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationReceipt {
    pub event_id: EventId,
    pub strategy: SelectionStrategy,
    pub tables: Vec<ReservedTable>,
}
