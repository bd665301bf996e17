use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Source of "now". Injected so date validation and the current-time endpoint are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_in(&self, tz: Tz) -> DateTime<Tz> {
        tz.from_utc_datetime(&self.now().naive_utc())
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Current moment as reported to the conversational front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeReference {
    /// ISO-8601 instant with the tenant's offset.
    pub iso: String,
    /// `YYYY-MM-DD`
    pub day: String,
    /// `HH:MM`
    pub hour: String,
}

impl TimeReference {
    pub fn from_local(now: &DateTime<Tz>) -> Self {
        Self {
            iso: now.to_rfc3339_opts(SecondsFormat::Secs, false),
            day: now.format("%Y-%m-%d").to_string(),
            hour: now.format("%H:%M").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_reference_in_tenant_zone() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 7, 14, 23, 30, 5).unwrap());
        let now = clock.now_in(chrono_tz::Europe::Madrid);
        let reference = TimeReference::from_local(&now);

        assert_eq!(reference.iso, "2026-07-15T01:30:05+02:00");
        assert_eq!(reference.day, "2026-07-15");
        assert_eq!(reference.hour, "01:30");
    }

    #[test]
    fn test_time_reference_utc_offset_format() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 10, 9, 5, 0).unwrap());
        let reference = TimeReference::from_local(&clock.now_in(Tz::UTC));

        assert_eq!(reference.iso, "2026-01-10T09:05:00+00:00");
    }
}
