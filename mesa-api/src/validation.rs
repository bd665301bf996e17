//! Query-string validation with per-field error lists, answered as 422.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Top-level summary: the first message plus a count of the rest.
    pub fn summary(&self) -> String {
        let total: usize = self.0.values().map(Vec::len).sum();
        let first = self
            .0
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "The given data was invalid.".to_string());

        match total {
            0 | 1 => first,
            2 => format!("{} (and 1 more error)", first),
            n => format!("{} (and {} more errors)", first, n - 1),
        }
    }

    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.add(field, format!("The {} field is required.", field));
                None
            }
        }
    }

    /// `YYYY-MM-DD`, not before `today`.
    pub fn date_from(&mut self, field: &str, value: Option<&str>, today: NaiveDate) -> Option<NaiveDate> {
        let raw = self.required(field, value)?;
        let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
            self.add(field, format!("The {} field must be a valid date.", field));
            return None;
        };
        if date < today {
            self.add(field, format!("The {} field must be a date after or equal to today.", field));
            return None;
        }
        Some(date)
    }

    /// `HH:MM`
    pub fn time(&mut self, field: &str, value: Option<&str>) -> Option<NaiveTime> {
        let raw = self.required(field, value)?;
        match NaiveTime::parse_from_str(raw, "%H:%M") {
            Ok(time) => Some(time),
            Err(_) => {
                self.add(field, format!("The {} field must match the format H:i.", field));
                None
            }
        }
    }

    /// Integer, at least 1.
    pub fn party_size(&mut self, field: &str, value: Option<&str>) -> Option<u32> {
        let raw = self.required(field, value)?;
        let Ok(n) = raw.parse::<i64>() else {
            self.add(field, format!("The {} field must be an integer.", field));
            return None;
        };
        if n < 1 {
            self.add(field, format!("The {} field must be at least 1.", field));
            return None;
        }
        match u32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                self.add(field, format!("The {} field must not be greater than {}.", field, u32::MAX));
                None
            }
        }
    }

    /// Required string of at most `max` characters.
    pub fn text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let raw = self.required(field, value)?;
        if raw.chars().count() > max {
            self.add(field, format!("The {} field must not be greater than {} characters.", field, max));
            return None;
        }
        Some(raw.to_string())
    }

    /// Optional instant: RFC 3339, or a bare local datetime read in `tz`.
    pub fn instant(&mut self, field: &str, value: Option<&str>, tz: Tz) -> Option<DateTime<Tz>> {
        let raw = value.map(str::trim).filter(|v| !v.is_empty())?;

        if let Ok(instant) = DateTime::<FixedOffset>::parse_from_rfc3339(raw) {
            return Some(instant.with_timezone(&tz));
        }

        let local = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .and_then(|naive| tz.from_local_datetime(&naive).earliest());

        if local.is_none() {
            self.add(field, format!("The {} field must be a valid date.", field));
        }
        local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Atlantic::Canary;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_missing_fields_are_required() {
        let mut errors = FieldErrors::default();

        assert!(errors.date_from("date", None, today()).is_none());
        assert!(errors.time("time", Some("  ")).is_none());

        assert_eq!(errors.get("date").unwrap(), ["The date field is required."]);
        assert_eq!(errors.get("time").unwrap(), ["The time field is required."]);
        assert_eq!(errors.summary(), "The date field is required. (and 1 more error)");
    }

    #[test]
    fn test_date_rules() {
        let mut errors = FieldErrors::default();

        assert_eq!(errors.date_from("date", Some("2026-10-18"), today()), Some(today()));
        assert!(errors.is_empty());
        assert!(errors.date_from("date", Some("2026-10-17"), today()).is_none());
        assert!(errors.date_from("date", Some("18/10/2026"), today()).is_none());
        assert_eq!(errors.get("date").unwrap().len(), 2);
    }

    #[test]
    fn test_time_format() {
        let mut errors = FieldErrors::default();

        assert_eq!(errors.time("time", Some("20:30")), NaiveTime::from_hms_opt(20, 30, 0));
        assert!(errors.time("time", Some("20:30:00")).is_none());
        assert!(errors.time("time", Some("8pm")).is_none());
    }

    #[test]
    fn test_party_size_rules() {
        let mut errors = FieldErrors::default();

        assert_eq!(errors.party_size("capacity", Some("4")), Some(4));
        assert!(errors.party_size("capacity", Some("0")).is_none());
        assert!(errors.party_size("capacity", Some("-3")).is_none());
        assert!(errors.party_size("capacity", Some("cuatro")).is_none());
        assert!(errors.party_size("capacity", Some("2.5")).is_none());
        assert_eq!(errors.get("capacity").unwrap().len(), 4);
    }

    #[test]
    fn test_text_length_counts_characters() {
        let mut errors = FieldErrors::default();

        assert_eq!(errors.text("full_name", Some("Íñigo"), 5), Some("Íñigo".to_string()));
        assert!(errors.text("full_name", Some("Íñigos"), 5).is_none());
    }

    #[test]
    fn test_instant_parsing() {
        let mut errors = FieldErrors::default();

        let rfc = errors.instant("referencia_tiempo", Some("2026-10-18T12:00:00Z"), Canary).unwrap();
        // Canary is UTC+1 in October (WEST).
        assert_eq!(rfc.hour(), 13);

        let bare = errors.instant("referencia_tiempo", Some("2026-10-18T12:00:00"), Canary).unwrap();
        assert_eq!(bare.hour(), 12);

        assert!(errors.instant("referencia_tiempo", None, Canary).is_none());
        assert!(errors.is_empty());

        assert!(errors.instant("referencia_tiempo", Some("ayer"), Canary).is_none());
        assert!(!errors.is_empty());
    }
}
