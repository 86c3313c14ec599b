pub mod alerts;
pub mod session;

use crate::categorizer::Categorizer;
use crate::constants::{DEFAULT_TICK_SECS, DEFAULT_USAGE_ALERT_SECS};
use crate::hostname::resolve_hostname;
use crate::models::TimeLogs;
use crate::platform::{Notifier, TabHost, TabId};
use crate::store::Store;
use alerts::UsageAlertEngine;
use chrono::{DateTime, Local};
use log::{debug, error, warn};
use session::{Accrual, SessionState};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub tick_interval: Duration,
    pub usage_alert_secs: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            usage_alert_secs: DEFAULT_USAGE_ALERT_SECS,
        }
    }
}

/// Follows the foreground tab and attributes its time to `timeLogs`.
pub struct TrackerService {
    config: TrackerConfig,
    session: Mutex<SessionState>,
    store: Store,
    categorizer: Categorizer,
    tabs: Arc<dyn TabHost>,
    notifier: Arc<dyn Notifier>,
    alerts: UsageAlertEngine,
}

impl TrackerService {
    pub fn new(
        store: Store,
        categorizer: Categorizer,
        tabs: Arc<dyn TabHost>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            config,
            session: Mutex::new(SessionState::new(Local::now())),
            store,
            categorizer,
            tabs,
            notifier,
            alerts: UsageAlertEngine::new(config.usage_alert_secs),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, SessionState> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("TrackerService: session mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn active_hostname(&self) -> Option<String> {
        self.lock_session().hostname().map(str::to_string)
    }

    pub async fn on_tab_activated(&self, tab_id: TabId) {
        self.on_tab_activated_at(tab_id, Local::now()).await;
    }

    pub async fn on_tab_activated_at(&self, tab_id: TabId, now: DateTime<Local>) {
        self.lock_session().activate(tab_id, now);

        let hostname = self
            .tabs
            .tab_url(tab_id)
            .await
            .as_deref()
            .and_then(resolve_hostname);

        if !self.lock_session().resolve(tab_id, hostname) {
            debug!("Tab {tab_id} lost focus before its URL resolved");
        }
    }

    pub async fn on_tab_updated(&self, tab_id: TabId, url: &str) {
        self.on_tab_updated_at(tab_id, url, Local::now()).await;
    }

    pub async fn on_tab_updated_at(&self, tab_id: TabId, url: &str, now: DateTime<Local>) {
        let hostname = match self.categorizer.observe_url(url).await {
            Ok(hostname) => hostname,
            Err(e) => {
                error!("Failed to record site for tab {tab_id}: {e}");
                resolve_hostname(url)
            }
        };
        self.lock_session().retarget(tab_id, hostname, now);
    }

    pub async fn on_navigation_completed(&self, frame_id: i64, url: &str) {
        // Subframes are not site visits
        if frame_id != 0 {
            return;
        }
        if let Err(e) = self.categorizer.observe_url(url).await {
            error!("Failed to record navigation to {url}: {e}");
        }
    }

    pub fn on_tab_removed(&self, tab_id: TabId) {
        self.lock_session().clear(tab_id, Local::now());
    }

    pub async fn tick(&self) {
        self.tick_at(Local::now()).await;
    }

    /// One accounting step: attribute elapsed time, persist everything
    /// still pending, then check the usage alert.
    pub async fn tick_at(&self, now: DateTime<Local>) -> Option<Accrual> {
        let (accrual, pending) = {
            let mut session = self.lock_session();
            let accrual = session.accrue(now);
            (accrual, session.pending())
        };

        if !pending.is_empty() {
            let batch = pending.clone();
            let written = self
                .store
                .update::<TimeLogs, _, _>(move |logs| {
                    for entry in &batch {
                        logs.add(entry.day, &entry.hostname, entry.secs);
                    }
                    Ok(())
                })
                .await;
            match written {
                Ok(()) => self.lock_session().commit(&pending),
                Err(e) => warn!("Time log write failed, keeping {} entries for the next tick: {e}", pending.len()),
            }
        }

        let accrual = accrual?;
        self.check_usage(&accrual.hostname).await;
        Some(accrual)
    }

    async fn check_usage(&self, hostname: &str) {
        let category = match self.categorizer.category_of(hostname).await {
            Ok(category) => category,
            Err(e) => {
                error!("Failed to read category of {hostname}: {e}");
                return;
            }
        };

        let alert = {
            let mut session = self.lock_session();
            self.alerts.evaluate(&mut session, hostname, category)
        };

        if let Some(notification) = alert {
            if let Err(e) = self.notifier.notify(notification).await {
                warn!("Failed to show usage alert for {hostname}: {e}");
            }
        }
    }

    /// Tick every `tick_interval` until `cancel` fires, then flush once more.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tracker.config.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => tracker.tick().await,
                }
            }
            tracker.tick().await;
            debug!("Tracker stopped");
        })
    }
}
