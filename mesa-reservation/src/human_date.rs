use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use mesa_core::dates::{DateOracle, HumanDateResolution, OracleError};
use tracing::{debug, info};

/// Resolves free-text dates against the tenant's local "now".
pub struct HumanDateService {
    oracle: Arc<dyn DateOracle>,
}

impl HumanDateService {
    pub fn new(oracle: Arc<dyn DateOracle>) -> Self {
        Self { oracle }
    }

    /// `Ok(None)` when the oracle could not pin the expression to a date.
    pub async fn resolve(
        &self,
        expression: &str,
        reference: DateTime<Tz>,
    ) -> Result<Option<HumanDateResolution>, OracleError> {
        debug!(expression, reference = %reference, "Resolving human date");

        let resolved = self.oracle.resolve(expression, reference.fixed_offset()).await?;

        let Some(date) = resolved else {
            info!(expression, "Date expression not understood");
            return Ok(None);
        };

        Ok(Some(HumanDateResolution::new(date, reference.date_naive())))
    }
}
