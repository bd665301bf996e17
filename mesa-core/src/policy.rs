use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use mesa_catalog::Window;
use serde::Deserialize;

use crate::backoffice::OccupancyQuery;
use crate::{CoreError, CoreResult};

/// How long a new reservation holds its tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationPolicy {
    Fixed {
        minutes: u32,
    },
    /// Larger parties stay longer: `min(base + per_guest * party, max)`.
    PartySize {
        base_minutes: u32,
        minutes_per_guest: u32,
        max_minutes: u32,
    },
}

impl Default for DurationPolicy {
    fn default() -> Self {
        DurationPolicy::Fixed { minutes: 90 }
    }
}

impl DurationPolicy {
    pub fn duration_for(&self, party_size: u32) -> Duration {
        let minutes = match self {
            DurationPolicy::Fixed { minutes } => u64::from(*minutes),
            DurationPolicy::PartySize {
                base_minutes,
                minutes_per_guest,
                max_minutes,
            } => {
                let scaled = u64::from(*base_minutes)
                    + u64::from(*minutes_per_guest) * u64::from(party_size);
                scaled.min(u64::from(*max_minutes))
            }
        };
        Duration::minutes(minutes as i64)
    }
}

/// Scheduling rules shared by the availability check and reservation creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReservationPolicy {
    #[serde(default = "default_availability_window")]
    pub availability_window_minutes: u32,
    #[serde(default = "default_cutoff_hour")]
    pub search_cutoff_hour: u32,
    #[serde(default)]
    pub reservation_duration: DurationPolicy,
    #[serde(default = "default_true")]
    pub allocate_free_tables_only: bool,
}

fn default_availability_window() -> u32 { 120 }
fn default_cutoff_hour() -> u32 { 3 }
fn default_true() -> bool { true }

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            availability_window_minutes: default_availability_window(),
            search_cutoff_hour: default_cutoff_hour(),
            reservation_duration: DurationPolicy::default(),
            allocate_free_tables_only: true,
        }
    }
}

impl ReservationPolicy {
    /// Wall-clock `date time` in the tenant zone. Ambiguous times resolve to the earlier instant.
    pub fn local_start(date: NaiveDate, time: NaiveTime, tz: Tz) -> CoreResult<DateTime<Tz>> {
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .ok_or_else(|| {
                CoreError::ValidationError(format!(
                    "{} {} does not exist in timezone {}",
                    date,
                    time.format("%H:%M"),
                    tz
                ))
            })
    }

    /// Window checked for availability.
    pub fn availability_window(&self, start: &DateTime<Tz>) -> Window<DateTime<Utc>> {
        let start = start.with_timezone(&Utc);
        Window::new(
            start,
            start + Duration::minutes(i64::from(self.availability_window_minutes)),
        )
    }

    /// Window a new reservation will hold.
    pub fn reservation_window(&self, start: &DateTime<Tz>, party_size: u32) -> Window<DateTime<Utc>> {
        let start = start.with_timezone(&Utc);
        Window::new(start, start + self.reservation_duration.duration_for(party_size))
    }

    /// Bounds for fetching occupancy around `window`: stops after its start and
    /// no later than the day after `start` at the cutoff hour (local).
    pub fn occupancy_query(
        &self,
        start: &DateTime<Tz>,
        window: &Window<DateTime<Utc>>,
    ) -> CoreResult<OccupancyQuery> {
        let tz = start.timezone();
        let next_day = start
            .date_naive()
            .succ_opt()
            .ok_or_else(|| CoreError::ValidationError("date out of range".to_string()))?;
        let cutoff = NaiveTime::from_hms_opt(self.search_cutoff_hour, 0, 0).ok_or_else(|| {
            CoreError::InternalError(format!("invalid cutoff hour {}", self.search_cutoff_hour))
        })?;
        let naive_limit = next_day.and_time(cutoff);

        // A cutoff inside a DST gap has no local instant; read it as UTC instead.
        let limit = tz
            .from_local_datetime(&naive_limit)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive_limit));

        Ok(OccupancyQuery {
            stop_after: window.start,
            stop_until: limit.max(window.end),
        })
    }
}
