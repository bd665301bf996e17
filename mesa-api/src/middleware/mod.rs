pub mod auth;
pub mod resiliency;

pub use auth::{company_api_key_middleware, API_KEY_HEADER};
pub use resiliency::{circuit_breaker_middleware, CircuitBreakers};
