use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Deadline reminder stages, in the order they are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderThreshold {
    Day,
    HalfDay,
    Hour,
}

impl ReminderThreshold {
    pub const ALL: [Self; 3] = [Self::Day, Self::HalfDay, Self::Hour];

    pub fn hours(self) -> i64 {
        match self {
            Self::Day => 24,
            Self::HalfDay => 12,
            Self::Hour => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "24 hours left!",
            Self::HalfDay => "12 hours left!",
            Self::Hour => "1 hour left!",
        }
    }
}

/// Which reminders have already been sent for a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderFlags {
    #[serde(rename = "24h", default)]
    pub day: bool,
    #[serde(rename = "12h", default)]
    pub half_day: bool,
    #[serde(rename = "1h", default)]
    pub hour: bool,
}

impl ReminderFlags {
    pub fn is_set(&self, threshold: ReminderThreshold) -> bool {
        match threshold {
            ReminderThreshold::Day => self.day,
            ReminderThreshold::HalfDay => self.half_day,
            ReminderThreshold::Hour => self.hour,
        }
    }

    pub fn set(&mut self, threshold: ReminderThreshold) {
        match threshold {
            ReminderThreshold::Day => self.day = true,
            ReminderThreshold::HalfDay => self.half_day = true,
            ReminderThreshold::Hour => self.hour = true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notified: ReminderFlags,
    /// Fields written by the UI that the core does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Goal {
    pub fn new(text: &str, deadline: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            deadline: deadline.map(str::to_string),
            completed: false,
            notified: ReminderFlags::default(),
            extra: Map::new(),
        }
    }

    /// The deadline as a local instant, if present and parseable.
    pub fn deadline_at(&self) -> Option<DateTime<Local>> {
        self.deadline.as_deref().and_then(parse_deadline)
    }
}

/// Parse RFC 3339 timestamps and HTML `datetime-local` values
/// (`YYYY-MM-DDTHH:MM[:SS]`, read as local time).
pub fn parse_deadline(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Local));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// Persisted under `goals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Goals(pub Vec<Goal>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_json_layout() {
        let goal = Goal::new("Ship it", Some("2024-05-01T12:00:00Z"));
        let json = serde_json::to_value(&goal).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "text": "Ship it",
                "deadline": "2024-05-01T12:00:00Z",
                "completed": false,
                "notified": { "24h": false, "12h": false, "1h": false }
            })
        );
    }

    #[test]
    fn test_missing_notified_defaults_to_unset() {
        let goal: Goal = serde_json::from_str(r#"{"text":"Read","deadline":"2024-05-01T12:00"}"#).unwrap();
        assert_eq!(goal.notified, ReminderFlags::default());
        assert!(!goal.completed);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let goal: Goal = serde_json::from_str(r#"{"text":"Read","id":7,"completed":true}"#).unwrap();
        let json = serde_json::to_value(&goal).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["completed"], true);
    }

    #[test]
    fn test_parse_deadline_formats() {
        let utc = parse_deadline("2024-05-01T12:00:00Z").unwrap();
        assert_eq!(utc.timestamp(), 1_714_564_800);

        let local = parse_deadline("2024-05-01T12:00").unwrap();
        assert_eq!(local.naive_local().to_string(), "2024-05-01 12:00:00");

        assert!(parse_deadline("2024-05-01T12:00:30").is_some());
        assert!(parse_deadline("tomorrow").is_none());
        assert!(parse_deadline("").is_none());
    }

    #[test]
    fn test_reminder_flags_set_independently() {
        let mut flags = ReminderFlags::default();
        flags.set(ReminderThreshold::HalfDay);
        assert!(!flags.is_set(ReminderThreshold::Day));
        assert!(flags.is_set(ReminderThreshold::HalfDay));
        assert!(!flags.is_set(ReminderThreshold::Hour));
    }
}
