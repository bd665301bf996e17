use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Date oracle request failed: {0}")]
    RequestFailed(String),
    #[error("Date oracle authentication failed")]
    AuthFailed,
    #[error("Date oracle rate limited")]
    RateLimited,
    #[error("Date oracle returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Resolves free-text date expressions ("el viernes que viene") to a calendar date.
#[async_trait]
pub trait DateOracle: Send + Sync {
    /// `Ok(None)` when the expression could not be pinned to a date.
    async fn resolve(
        &self,
        expression: &str,
        reference: DateTime<FixedOffset>,
    ) -> Result<Option<NaiveDate>, OracleError>;
}

/// Resolved date plus whether it is still bookable relative to the reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HumanDateResolution {
    pub date: NaiveDate,
    pub valid: bool,
}

impl HumanDateResolution {
    pub fn new(date: NaiveDate, today: NaiveDate) -> Self {
        Self { date, valid: date >= today }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_is_today_or_later() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        assert!(HumanDateResolution::new(today, today).valid);
        assert!(HumanDateResolution::new(today.succ_opt().unwrap(), today).valid);
        assert!(!HumanDateResolution::new(today.pred_opt().unwrap(), today).valid);
    }
}
