use super::rules::{allocate_rule_ids, build_rules};
use crate::error::AppResult;
use crate::models::BlockedSites;
use crate::platform::RuleHost;
use crate::store::{StorageKey, Store};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Replaces the installed dynamic rules with one rule per blocked site.
pub struct RuleSynchronizer {
    rules: Arc<dyn RuleHost>,
    blocked_page: String,
    // Serializes syncs: each one reads the installed ids before replacing them
    in_flight: Mutex<()>,
}

impl RuleSynchronizer {
    pub fn new(rules: Arc<dyn RuleHost>, blocked_page: &str) -> Self {
        Self {
            rules,
            blocked_page: blocked_page.to_string(),
            in_flight: Mutex::new(()),
        }
    }

    /// Remove every installed rule and install fresh ones for `blocked`,
    /// in a single update. Returns the number of rules installed.
    pub async fn sync(&self, blocked: &BlockedSites) -> AppResult<usize> {
        let _guard = self.in_flight.lock().await;

        let existing = self.rules.installed_rule_ids().await?;
        let ids = allocate_rule_ids(&existing, blocked.len());
        let rules = build_rules(blocked, &ids, &self.blocked_page);
        let installed = rules.len();

        self.rules.update_dynamic_rules(existing, rules).await?;
        info!("Updated blocking rules: {installed} site(s) blocked");
        Ok(installed)
    }
}

/// Keeps the browser's rules in step with the `blockedSites` list.
pub struct BlockingService {
    store: Store,
    synchronizer: RuleSynchronizer,
    requested: Notify,
}

impl BlockingService {
    pub fn new(store: Store, rules: Arc<dyn RuleHost>, blocked_page: &str) -> Self {
        Self {
            store,
            synchronizer: RuleSynchronizer::new(rules, blocked_page),
            requested: Notify::new(),
        }
    }

    /// Sync immediately from the stored list.
    pub async fn sync_now(&self) -> AppResult<usize> {
        let blocked: BlockedSites = self.store.read().await?;
        self.synchronizer.sync(&blocked).await
    }

    /// Ask the background task to sync. Requests made while a sync is
    /// pending are coalesced.
    pub fn request_sync(&self) {
        self.requested.notify_one();
    }

    async fn sync_logged(&self) {
        // Left as is on failure; the next trigger retries
        if let Err(e) = self.sync_now().await {
            error!("Failed to update blocking rules: {e}");
        }
    }

    /// Sync once at startup, then whenever `blockedSites` changes or a sync
    /// is requested, until `cancel` fires.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut changes = service.store.subscribe();
        tokio::spawn(async move {
            service.sync_logged().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = service.requested.notified() => service.sync_logged().await,
                    change = changes.recv() => match change {
                        Ok(StorageKey::BlockedSites) => service.sync_logged().await,
                        Ok(StorageKey::SiteCategories | StorageKey::TimeLogs | StorageKey::Goals) => {}
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Missed {missed} storage change(s), resyncing blocking rules");
                            service.sync_logged().await;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Blocking rule sync stopped");
        })
    }
}
