//! Shared test utilities for Sitewarden.
//!
//! This module provides a temporary store and in-memory stand-ins for the
//! browser capabilities.

#![cfg(test)]

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::platform::{BlockRule, Notification, Notifier, RuleHost, TabHost, TabId};
use crate::store::Store;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

/// Create a temporary store with migrations applied.
///
/// Returns a tuple of (Store, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_store() -> (Store, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    crate::db::migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (Store::new(db), dir)
}

#[derive(Default)]
pub struct FakeTabs {
    urls: Mutex<HashMap<TabId, String>>,
}

impl FakeTabs {
    pub fn with_tab(self, tab_id: TabId, url: &str) -> Self {
        self.set(tab_id, url);
        self
    }

    pub fn set(&self, tab_id: TabId, url: &str) {
        self.urls.lock().unwrap().insert(tab_id, url.to_string());
    }
}

#[async_trait]
impl TabHost for FakeTabs {
    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.urls.lock().unwrap().get(&tab_id).cloned()
    }
}

/// Keeps installed rules keyed by id and rejects duplicate ids the way the
/// browser does.
#[derive(Default)]
pub struct FakeRuleHost {
    installed: Mutex<BTreeMap<u32, BlockRule>>,
    fail_updates: AtomicUsize,
    pub updates: AtomicUsize,
}

impl FakeRuleHost {
    pub fn rules(&self) -> Vec<BlockRule> {
        self.installed.lock().unwrap().values().cloned().collect()
    }

    /// Make the next `n` updates fail.
    pub fn fail_next(&self, n: usize) {
        self.fail_updates.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl RuleHost for FakeRuleHost {
    async fn installed_rule_ids(&self) -> AppResult<Vec<u32>> {
        Ok(self.installed.lock().unwrap().keys().copied().collect())
    }

    async fn update_dynamic_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> AppResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) > 0 {
            self.fail_updates.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::Host("rule update rejected".into()));
        }
        let mut installed = self.installed.lock().unwrap();
        for id in remove_rule_ids {
            installed.remove(&id);
        }
        for rule in &add_rules {
            if installed.contains_key(&rule.id) {
                return Err(AppError::Host(format!("duplicate rule id {}", rule.id)));
            }
        }
        for rule in add_rules {
            installed.insert(rule.id, rule);
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> AppResult<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}
