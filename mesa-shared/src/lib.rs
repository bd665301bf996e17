pub mod models;
pub mod pii;

pub use pii::Masked;
pub use models::ReservationConfirmedEvent;
