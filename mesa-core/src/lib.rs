pub mod company;
pub mod repository;
pub mod backoffice;
pub mod notify;
pub mod dates;
pub mod clock;
pub mod policy;

pub use company::{Company, CompanyKey, OdooCredentials};
pub use clock::{Clock, FixedClock, SystemClock};
pub use policy::{DurationPolicy, ReservationPolicy};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
