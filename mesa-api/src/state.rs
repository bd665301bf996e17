use std::sync::Arc;

use chrono_tz::Tz;
use mesa_core::backoffice::BackofficeConnector;
use mesa_core::repository::CompanyRepository;
use mesa_core::Clock;
use mesa_reservation::{AvailabilityService, HumanDateService, ReservationOrchestrator};
use mesa_store::app_config::RateLimitConfig;
use mesa_store::RedisClient;

use crate::middleware::resiliency::CircuitBreakers;

#[derive(Clone)]
pub struct AppState {
    pub companies: Arc<dyn CompanyRepository>,
    pub backoffice: Arc<dyn BackofficeConnector>,
    pub availability: Arc<AvailabilityService>,
    pub reservations: Arc<ReservationOrchestrator>,
    pub human_dates: Arc<HumanDateService>,
    pub clock: Arc<dyn Clock>,
    /// Used when a company's stored timezone is not a valid IANA name.
    pub default_timezone: Tz,
    /// Rate limiting is disabled when absent.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub resiliency: Arc<CircuitBreakers>,
}
