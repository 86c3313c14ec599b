//! Browser capabilities backed by the native messaging channel: tab URLs
//! are learned from forwarded events, rule updates and notifications are
//! sent back as messages for the extension to apply.

use super::messages::OutgoingMessage;
use crate::error::{AppError, AppResult};
use crate::platform::{BlockRule, Notification, Notifier, RuleHost, TabHost, TabId};
use async_trait::async_trait;
use log::warn;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("{context} mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Queue of messages waiting to be written to stdout.
#[derive(Clone)]
pub struct Outbox(mpsc::UnboundedSender<OutgoingMessage>);

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn send(&self, message: OutgoingMessage) -> AppResult<()> {
        self.0
            .send(message)
            .map_err(|_| AppError::Host("native messaging channel closed".into()))
    }
}

/// Last known URL of every tab the extension has told us about.
#[derive(Default)]
pub struct TabRegistry {
    urls: Mutex<HashMap<TabId, String>>,
}

impl TabRegistry {
    pub fn set_url(&self, tab_id: TabId, url: &str) {
        safe_lock(&self.urls, "TabRegistry").insert(tab_id, url.to_string());
    }

    pub fn remove(&self, tab_id: TabId) {
        safe_lock(&self.urls, "TabRegistry").remove(&tab_id);
    }
}

#[async_trait]
impl TabHost for TabRegistry {
    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        safe_lock(&self.urls, "TabRegistry").get(&tab_id).cloned()
    }
}

/// Tracks the rule ids the extension has installed and sends it the
/// replacement set on every update.
pub struct NativeRuleHost {
    outbox: Outbox,
    installed: Mutex<Vec<u32>>,
}

impl NativeRuleHost {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            outbox,
            installed: Mutex::new(Vec::new()),
        }
    }

    /// The extension reported the ids it currently has installed.
    pub fn set_installed(&self, rule_ids: Vec<u32>) {
        *safe_lock(&self.installed, "NativeRuleHost") = rule_ids;
    }
}

#[async_trait]
impl RuleHost for NativeRuleHost {
    async fn installed_rule_ids(&self) -> AppResult<Vec<u32>> {
        Ok(safe_lock(&self.installed, "NativeRuleHost").clone())
    }

    async fn update_dynamic_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> AppResult<()> {
        let added: Vec<u32> = add_rules.iter().map(|r| r.id).collect();
        self.outbox.send(OutgoingMessage::UpdateDynamicRules {
            remove_rule_ids: remove_rule_ids.clone(),
            add_rules,
        })?;

        let mut installed = safe_lock(&self.installed, "NativeRuleHost");
        installed.retain(|id| !remove_rule_ids.contains(id));
        installed.extend(added);
        Ok(())
    }
}

pub struct NativeNotifier {
    outbox: Outbox,
}

impl NativeNotifier {
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl Notifier for NativeNotifier {
    async fn notify(&self, notification: Notification) -> AppResult<()> {
        self.outbox.send(notification.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::RuleSynchronizer;
    use crate::models::BlockedSites;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tab_registry_tracks_urls() {
        let tabs = TabRegistry::default();
        tabs.set_url(1, "https://a.com/");
        assert_eq!(tabs.tab_url(1).await.as_deref(), Some("https://a.com/"));

        tabs.remove(1);
        assert_eq!(tabs.tab_url(1).await, None);
    }

    #[tokio::test]
    async fn test_rule_updates_replace_reported_ids() {
        let (outbox, mut rx) = Outbox::channel();
        let host = Arc::new(NativeRuleHost::new(outbox));
        host.set_installed(vec![1, 2]);

        let sync = RuleSynchronizer::new(Arc::clone(&host) as Arc<dyn RuleHost>, "/blocked.html");
        let blocked: BlockedSites = ["a.com".to_string()].into_iter().collect();
        sync.sync(&blocked).await.unwrap();

        let Some(OutgoingMessage::UpdateDynamicRules { remove_rule_ids, add_rules }) = rx.recv().await else {
            panic!("expected a rule update");
        };
        assert_eq!(remove_rule_ids, vec![1, 2]);
        assert_eq!(add_rules.len(), 1);
        assert_eq!(add_rules[0].id, 3);
        assert_eq!(host.installed_rule_ids().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_notifier_fails_once_channel_closes() {
        let (outbox, rx) = Outbox::channel();
        let notifier = NativeNotifier::new(outbox);

        drop(rx);
        let result = notifier.notify(Notification::new("t", "m")).await;
        assert!(matches!(result, Err(AppError::Host(_))));
    }
}
