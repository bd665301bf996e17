pub mod events;

pub use events::ReservationConfirmedEvent;
