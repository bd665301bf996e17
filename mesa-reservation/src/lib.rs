pub mod models;
pub mod availability;
pub mod orchestrator;
pub mod human_date;
pub mod memory;

pub use models::{AvailabilityRequest, ReservationReceipt, ReservationRequest, ReservedTable};
pub use availability::AvailabilityService;
pub use orchestrator::{EventSettings, ReservationOrchestrator};
pub use human_date::HumanDateService;

use mesa_catalog::ResourceId;
use mesa_core::backoffice::{BackofficeError, EventId};
use mesa_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error(transparent)]
    Schedule(#[from] CoreError),

    #[error("Back office read failed: {0}")]
    Backoffice(#[source] BackofficeError),

    #[error("No tables available for {requested} guests")]
    NoAvailableTables {
        requested: u32,
        attempted: Vec<ResourceId>,
    },

    /// Allocation math broke. Never a business outcome.
    #[error("Allocation invariant violated: {0}")]
    AllocationInvariant(String),

    #[error("Event creation failed: {source}")]
    EventCreation {
        #[source]
        source: BackofficeError,
    },

    /// The event exists and `tables` lists every line, with booking ids for the committed ones.
    #[error("Booking line creation failed for event {event_id}: {source}")]
    BookingLines {
        event_id: EventId,
        tables: Vec<ReservedTable>,
        #[source]
        source: BackofficeError,
    },
}
