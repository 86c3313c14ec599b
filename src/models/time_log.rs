use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted under `timeLogs`: `YYYY-MM-DD` -> hostname -> seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeLogs(pub BTreeMap<String, BTreeMap<String, f64>>);

pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl TimeLogs {
    /// Add `secs` to the (day, hostname) total. Negative or non-finite
    /// amounts are ignored so totals never decrease.
    pub fn add(&mut self, day: NaiveDate, hostname: &str, secs: f64) {
        if !secs.is_finite() || secs <= 0.0 {
            return;
        }
        let total = self
            .0
            .entry(day_key(day))
            .or_default()
            .entry(hostname.to_string())
            .or_insert(0.0);
        *total += secs;
    }

    pub fn seconds(&self, day: NaiveDate, hostname: &str) -> f64 {
        self.0
            .get(&day_key(day))
            .and_then(|sites| sites.get(hostname))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn day(&self, day: NaiveDate) -> BTreeMap<String, f64> {
        self.0.get(&day_key(day)).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_add_accumulates_per_day_and_host() {
        let mut logs = TimeLogs::default();
        logs.add(date(2024, 3, 1), "example.com", 5.0);
        logs.add(date(2024, 3, 1), "example.com", 2.5);
        logs.add(date(2024, 3, 2), "example.com", 1.0);

        assert!((logs.seconds(date(2024, 3, 1), "example.com") - 7.5).abs() < f64::EPSILON);
        assert!((logs.seconds(date(2024, 3, 2), "example.com") - 1.0).abs() < f64::EPSILON);
        assert_eq!(logs.0.len(), 2);
    }

    #[test]
    fn test_add_ignores_negative_and_nan() {
        let mut logs = TimeLogs::default();
        logs.add(date(2024, 3, 1), "example.com", -3.0);
        logs.add(date(2024, 3, 1), "example.com", f64::NAN);
        assert!(logs.0.is_empty());
    }

    #[test]
    fn test_serializes_with_day_keys() {
        let mut logs = TimeLogs::default();
        logs.add(date(2024, 12, 31), "a.com", 4.0);
        let json = serde_json::to_value(&logs).unwrap();
        assert_eq!(json, serde_json::json!({ "2024-12-31": { "a.com": 4.0 } }));
    }
}
