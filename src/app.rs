use crate::blocking::{BlockList, BlockListEntry, BlockingService};
use crate::categorizer::Categorizer;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::goals::GoalService;
use crate::models::{BlockedSites, Goals, SiteCategories, SiteCategory, TimeLogs};
use crate::native_host::{ControlMessage, HostEvent};
use crate::platform::{Notifier, RuleHost, TabHost};
use crate::store::{StorageKey, Store};
use crate::tracker::TrackerService;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything the UI needs to render, returned by `getState`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateSnapshot {
    site_categories: SiteCategories,
    time_logs: TimeLogs,
    blocked_sites: BlockedSites,
    goals: Goals,
    block_list: Vec<BlockListEntry>,
    active_hostname: Option<String>,
}

/// The tracking, blocking and reminder services over one store.
pub struct Sitewarden {
    store: Store,
    categorizer: Categorizer,
    block_list: BlockList,
    tracker: Arc<TrackerService>,
    blocking: Arc<BlockingService>,
    goals: Arc<GoalService>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Sitewarden {
    pub fn new(
        store: Store,
        tabs: Arc<dyn TabHost>,
        rules: Arc<dyn RuleHost>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        let categorizer = Categorizer::new(store.clone());
        let tracker = TrackerService::new(
            store.clone(),
            categorizer.clone(),
            tabs,
            Arc::clone(&notifier),
            config.tracker(),
        );
        Self {
            categorizer,
            block_list: BlockList::new(store.clone()),
            tracker: Arc::new(tracker),
            blocking: Arc::new(BlockingService::new(store.clone(), rules, &config.blocked_page)),
            goals: Arc::new(GoalService::new(store.clone(), notifier, config.goal_check_interval)),
            store,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn tracker(&self) -> &TrackerService {
        &self.tracker
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Sitewarden: task list mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Spawn the tick loops and the rule-sync listener. The listener syncs
    /// once right away.
    pub fn start(&self) {
        let handles = [
            self.tracker.start(self.cancel.child_token()),
            self.goals.start(self.cancel.child_token()),
            self.blocking.start(self.cancel.child_token()),
        ];
        self.lock_tasks().extend(handles);
        info!("Sitewarden started");
    }

    /// Stop every background task and wait for it to finish. The tracker
    /// flushes pending time on its way out.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = self.lock_tasks().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Background task failed: {e}");
            }
        }
        info!("Sitewarden stopped");
    }

    pub async fn handle_event(&self, event: &HostEvent) {
        match event {
            HostEvent::TabActivated { tab_id, .. } => self.tracker.on_tab_activated(*tab_id).await,
            HostEvent::TabUpdated { tab_id, url } => self.tracker.on_tab_updated(*tab_id, url).await,
            HostEvent::TabRemoved { tab_id } => self.tracker.on_tab_removed(*tab_id),
            HostEvent::NavigationCompleted { frame_id, url } => {
                self.tracker.on_navigation_completed(*frame_id, url).await;
            }
            HostEvent::StorageChanged { keys } => {
                if keys.iter().any(|k| StorageKey::from_str(k) == Some(StorageKey::BlockedSites)) {
                    self.blocking.request_sync();
                }
            }
            HostEvent::RulesInstalled { .. } => self.blocking.request_sync(),
        }
    }

    /// Run a UI request. The returned value, if any, is sent back as the
    /// response's `data`.
    pub async fn handle_control(&self, message: ControlMessage) -> AppResult<Option<Value>> {
        match message {
            ControlMessage::UpdateBlockedSites | ControlMessage::UpdateBlockingRules => {
                let installed = self.blocking.sync_now().await?;
                Ok(Some(json!({ "rules": installed })))
            }
            ControlMessage::SetCategory { hostname, category } => {
                let category = SiteCategory::from_str(&category).ok_or_else(|| AppError::InvalidInput {
                    field: "category",
                    reason: format!("unknown category '{category}'"),
                })?;
                self.categorizer.set_category(&hostname, category).await?;
                Ok(None)
            }
            ControlMessage::AddSite { url } => {
                let hostname = self.categorizer.add_site(&url).await?;
                Ok(Some(json!({ "hostname": hostname })))
            }
            ControlMessage::BlockSite { hostname } => {
                self.block_list.block_site(&hostname).await?;
                Ok(None)
            }
            ControlMessage::UnblockSite { hostname } => {
                self.block_list.unblock_site(&hostname).await?;
                Ok(None)
            }
            ControlMessage::ToggleBlock { hostname } => {
                let blocked = self.block_list.toggle_block(&hostname).await?;
                Ok(Some(json!({ "blocked": blocked })))
            }
            ControlMessage::UnblockFromPage { site } => {
                let url = self.block_list.unblock_from_blocked_page(&site).await?;
                Ok(Some(json!({ "url": url })))
            }
            ControlMessage::AddGoal { text, deadline } => {
                let goal = self.goals.add_goal(&text, deadline.as_deref()).await?;
                Ok(Some(serde_json::to_value(goal)?))
            }
            ControlMessage::CompleteGoal { index } => {
                self.goals.complete_goal(index).await?;
                Ok(None)
            }
            ControlMessage::GetState => Ok(Some(serde_json::to_value(self.snapshot().await?)?)),
        }
    }

    async fn snapshot(&self) -> AppResult<StateSnapshot> {
        Ok(StateSnapshot {
            site_categories: self.store.read().await?,
            time_logs: self.store.read().await?,
            blocked_sites: self.store.read().await?,
            goals: self.goals.goals().await?,
            block_list: self.block_list.entries().await?,
            active_hostname: self.tracker.active_hostname(),
        })
    }
}
