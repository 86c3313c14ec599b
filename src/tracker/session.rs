use crate::platform::TabId;
use chrono::{DateTime, Local, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Time measured but not yet committed to `timeLogs`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTime {
    pub day: NaiveDate,
    pub hostname: String,
    pub secs: f64,
}

/// Result of one accounting step.
#[derive(Debug, Clone, PartialEq)]
pub struct Accrual {
    pub hostname: String,
    pub elapsed_secs: f64,
    pub session_secs: f64,
}

/// Which tab and site is in the foreground, since when, and how long each
/// site has been foregrounded during the current session.
#[derive(Debug)]
pub struct SessionState {
    tab_id: Option<TabId>,
    hostname: Option<String>,
    started_at: DateTime<Local>,
    day: NaiveDate,
    session_secs: HashMap<String, f64>,
    alerted: HashSet<String>,
    pending: BTreeMap<(NaiveDate, String), f64>,
}

fn secs_between(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    // A clock that went backwards yields zero, never negative time
    (end - start).to_std().map_or(0.0, |d| d.as_secs_f64())
}

impl SessionState {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            tab_id: None,
            hostname: None,
            started_at: now,
            day: now.date_naive(),
            session_secs: HashMap::new(),
            alerted: HashSet::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.tab_id
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    fn restart(&mut self, hostname: Option<String>, now: DateTime<Local>) {
        self.hostname = hostname;
        self.started_at = now;
        self.day = now.date_naive();
        self.session_secs.clear();
        self.alerted.clear();
    }

    /// A tab came to the foreground. Starts a new session; the hostname is
    /// filled in by [`SessionState::resolve`] once the tab URL is known.
    pub fn activate(&mut self, tab_id: TabId, now: DateTime<Local>) {
        self.tab_id = Some(tab_id);
        self.restart(None, now);
    }

    /// Attach the resolved hostname to the activation of `tab_id`. Ignored
    /// (returns false) if another tab was activated in the meantime.
    pub fn resolve(&mut self, tab_id: TabId, hostname: Option<String>) -> bool {
        if self.tab_id != Some(tab_id) {
            return false;
        }
        self.hostname = hostname;
        true
    }

    /// The active tab navigated to `hostname`. A different site starts a
    /// new session; the same site carries on.
    pub fn retarget(&mut self, tab_id: TabId, hostname: Option<String>, now: DateTime<Local>) -> bool {
        if self.tab_id != Some(tab_id) || self.hostname == hostname {
            return false;
        }
        self.restart(hostname, now);
        true
    }

    pub fn clear(&mut self, tab_id: TabId, now: DateTime<Local>) -> bool {
        if self.tab_id != Some(tab_id) {
            return false;
        }
        self.tab_id = None;
        self.restart(None, now);
        true
    }

    /// Attribute the time since the last step to the active hostname.
    ///
    /// Returns `None` when nothing is attributed: no active hostname, or
    /// the calendar day changed since the last step (time across the day
    /// boundary is dropped and the baseline restarts at `now`).
    pub fn accrue(&mut self, now: DateTime<Local>) -> Option<Accrual> {
        let hostname = self.hostname.clone()?;

        let today = now.date_naive();
        if today != self.day {
            self.day = today;
            self.started_at = now;
            return None;
        }

        let elapsed_secs = secs_between(self.started_at, now);
        self.started_at = now;

        *self.pending.entry((today, hostname.clone())).or_insert(0.0) += elapsed_secs;
        let session_secs = self.session_secs.entry(hostname.clone()).or_insert(0.0);
        *session_secs += elapsed_secs;

        Some(Accrual {
            hostname,
            elapsed_secs,
            session_secs: *session_secs,
        })
    }

    pub fn pending(&self) -> Vec<PendingTime> {
        self.pending
            .iter()
            .filter(|(_, secs)| **secs > 0.0)
            .map(|((day, hostname), secs)| PendingTime {
                day: *day,
                hostname: hostname.clone(),
                secs: *secs,
            })
            .collect()
    }

    /// Drop pending time that has been written.
    pub fn commit(&mut self, written: &[PendingTime]) {
        for entry in written {
            let key = (entry.day, entry.hostname.clone());
            if let Some(secs) = self.pending.get_mut(&key) {
                *secs -= entry.secs;
                if *secs <= f64::EPSILON {
                    self.pending.remove(&key);
                }
            }
        }
    }

    pub fn session_secs(&self, hostname: &str) -> f64 {
        self.session_secs.get(hostname).copied().unwrap_or(0.0)
    }

    /// Claim the one usage alert allowed per site per session. Returns true
    /// the first time `hostname` has reached `threshold_secs`.
    pub fn claim_alert(&mut self, hostname: &str, threshold_secs: f64) -> bool {
        if self.session_secs(hostname) < threshold_secs || self.alerted.contains(hostname) {
            return false;
        }
        self.alerted.insert(hostname.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, h, m, s).unwrap()
    }

    fn active_on(host: &str, now: DateTime<Local>) -> SessionState {
        let mut state = SessionState::new(now);
        state.activate(1, now);
        assert!(state.resolve(1, Some(host.to_string())));
        state
    }

    #[test]
    fn test_no_hostname_means_no_accrual() {
        let mut state = SessionState::new(at(9, 0, 0));
        state.activate(1, at(9, 0, 0));
        assert!(state.accrue(at(9, 0, 5)).is_none());
        assert!(state.pending().is_empty());
    }

    #[test]
    fn test_ticks_sum_to_elapsed_time() {
        let start = at(9, 0, 0);
        let mut state = active_on("example.com", start);

        let mut total = 0.0;
        for i in 1..=120 {
            let accrual = state.accrue(start + Duration::seconds(5 * i)).unwrap();
            total += accrual.elapsed_secs;
        }

        assert!((total - 600.0).abs() < 1e-9);
        assert!((state.session_secs("example.com") - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_day_rollover_drops_boundary_time() {
        let before = Local.with_ymd_and_hms(2024, 6, 15, 23, 59, 50).unwrap();
        let mut state = active_on("example.com", before);

        state.accrue(before + Duration::seconds(5)).unwrap();
        // Crosses midnight: nothing attributed
        assert!(state.accrue(before + Duration::seconds(15)).is_none());
        let after = state.accrue(before + Duration::seconds(20)).unwrap();
        assert!((after.elapsed_secs - 5.0).abs() < 1e-9);

        let pending = state.pending();
        assert_eq!(pending.len(), 2);
        for entry in &pending {
            assert!((entry.secs - 5.0).abs() < 1e-9);
        }
        assert_ne!(pending[0].day, pending[1].day);
    }

    #[test]
    fn test_clock_going_backwards_adds_nothing() {
        let mut state = active_on("example.com", at(9, 0, 10));
        let accrual = state.accrue(at(9, 0, 0)).unwrap();
        assert!(accrual.elapsed_secs.abs() < f64::EPSILON);
    }

    #[test]
    fn test_stale_resolution_is_ignored() {
        let mut state = SessionState::new(at(9, 0, 0));
        state.activate(1, at(9, 0, 0));
        state.activate(2, at(9, 0, 1));

        assert!(!state.resolve(1, Some("old.com".into())));
        assert!(state.resolve(2, Some("new.com".into())));
        assert_eq!(state.hostname(), Some("new.com"));
    }

    #[test]
    fn test_activation_resets_session() {
        let mut state = active_on("example.com", at(9, 0, 0));
        state.accrue(at(10, 0, 0)).unwrap();
        assert!(state.claim_alert("example.com", 3600.0));

        state.activate(2, at(10, 0, 0));
        state.resolve(2, Some("example.com".into()));
        assert!(state.session_secs("example.com").abs() < f64::EPSILON);

        state.accrue(at(11, 0, 0)).unwrap();
        assert!(state.claim_alert("example.com", 3600.0));
    }

    #[test]
    fn test_claim_alert_only_once() {
        let mut state = active_on("example.com", at(9, 0, 0));
        state.accrue(at(9, 30, 0)).unwrap();
        assert!(!state.claim_alert("example.com", 3600.0));

        state.accrue(at(10, 0, 0)).unwrap();
        assert!(state.claim_alert("example.com", 3600.0));

        state.accrue(at(11, 0, 0)).unwrap();
        assert!(!state.claim_alert("example.com", 3600.0));
    }

    #[test]
    fn test_retarget_same_site_keeps_session() {
        let mut state = active_on("example.com", at(9, 0, 0));
        state.accrue(at(9, 10, 0)).unwrap();

        assert!(!state.retarget(1, Some("example.com".into()), at(9, 10, 0)));
        assert!((state.session_secs("example.com") - 600.0).abs() < 1e-9);

        assert!(state.retarget(1, Some("other.com".into()), at(9, 10, 0)));
        assert_eq!(state.hostname(), Some("other.com"));
        assert!(state.session_secs("example.com").abs() < f64::EPSILON);
    }

    #[test]
    fn test_retarget_other_tab_is_ignored() {
        let mut state = active_on("example.com", at(9, 0, 0));
        assert!(!state.retarget(7, Some("other.com".into()), at(9, 0, 1)));
        assert_eq!(state.hostname(), Some("example.com"));
    }

    #[test]
    fn test_clear_stops_accounting() {
        let mut state = active_on("example.com", at(9, 0, 0));
        assert!(state.clear(1, at(9, 0, 5)));
        assert_eq!(state.active_tab(), None);
        assert!(state.accrue(at(9, 0, 10)).is_none());
    }

    #[test]
    fn test_commit_removes_written_time_only() {
        let mut state = active_on("example.com", at(9, 0, 0));
        state.accrue(at(9, 0, 5)).unwrap();
        let written = state.pending();

        // More time measured while the write was in flight
        state.accrue(at(9, 0, 10)).unwrap();
        state.commit(&written);

        let left = state.pending();
        assert_eq!(left.len(), 1);
        assert!((left[0].secs - 5.0).abs() < 1e-9);
    }
}
