use chrono_tz::Tz;
use mesa_catalog::{check_availability, AvailabilityReport};
use mesa_core::backoffice::Backoffice;
use mesa_core::ReservationPolicy;
use tracing::info;

use crate::models::AvailabilityRequest;
use crate::ReservationError;

/// Read-only capacity check against a tenant's back office.
pub struct AvailabilityService {
    policy: ReservationPolicy,
}

impl AvailabilityService {
    pub fn new(policy: ReservationPolicy) -> Self {
        Self { policy }
    }

    pub async fn check(
        &self,
        backoffice: &dyn Backoffice,
        tz: Tz,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityReport, ReservationError> {
        // 1. Resolve the requested window in the tenant's zone
        let start = ReservationPolicy::local_start(request.date, request.time, tz)?;
        let window = self.policy.availability_window(&start);
        let query = self.policy.occupancy_query(&start, &window)?;

        // 2. Catalog and occupancy snapshot
        let (tables, occupancy) = tokio::try_join!(
            backoffice.list_resources(),
            backoffice.list_occupancy(query),
        )
        .map_err(ReservationError::Backoffice)?;

        // 3. Sum free seats
        let report = check_availability(&tables, &occupancy, &window, request.party_size);

        info!(
            party_size = request.party_size,
            free_capacity = report.free_capacity,
            free_tables = report.free_resources.len(),
            available = report.available,
            "Availability computed"
        );

        Ok(report)
    }
}
