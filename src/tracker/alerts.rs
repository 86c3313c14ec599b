use super::session::SessionState;
use crate::models::SiteCategory;
use crate::platform::Notification;

/// Fires one notification per session once an unproductive site has held
/// the foreground for `threshold_secs`.
#[derive(Debug, Clone, Copy)]
pub struct UsageAlertEngine {
    threshold_secs: f64,
}

impl UsageAlertEngine {
    pub fn new(threshold_secs: f64) -> Self {
        Self { threshold_secs }
    }

    pub fn evaluate(
        &self,
        session: &mut SessionState,
        hostname: &str,
        category: SiteCategory,
    ) -> Option<Notification> {
        match category {
            SiteCategory::Unproductive => {}
            SiteCategory::Productive | SiteCategory::Unclassified => return None,
        }
        if !session.claim_alert(hostname, self.threshold_secs) {
            return None;
        }
        Some(usage_notification(hostname, session.session_secs(hostname)))
    }
}

fn usage_notification(hostname: &str, secs: f64) -> Notification {
    let minutes = (secs / 60.0).floor();
    Notification::new(
        "Time check",
        format!("You have spent {minutes:.0} minutes on {hostname}. Time to get back on track?"),
    )
}
