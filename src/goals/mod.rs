use crate::error::{AppError, AppResult};
use crate::models::{Goal, Goals, ReminderThreshold};
use crate::platform::{Notification, Notifier};
use crate::store::Store;
use crate::validation::{validate_deadline, validate_goal_text};
use chrono::{DateTime, Local, TimeDelta};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Reminders due for `goal` at `now`, in the order they should be sent.
pub fn due_reminders(goal: &Goal, now: DateTime<Local>) -> Vec<ReminderThreshold> {
    if goal.completed {
        return Vec::new();
    }
    let Some(deadline) = goal.deadline_at() else {
        return Vec::new();
    };
    let left = deadline - now;
    ReminderThreshold::ALL
        .into_iter()
        .filter(|t| left <= TimeDelta::hours(t.hours()) && !goal.notified.is_set(*t))
        .collect()
}

fn reminder_notification(text: &str, threshold: ReminderThreshold) -> Notification {
    Notification::new("Goal reminder", format!("\"{text}\": {}", threshold.label()))
}

pub struct GoalService {
    store: Store,
    notifier: Arc<dyn Notifier>,
    check_interval: Duration,
}

impl GoalService {
    pub fn new(store: Store, notifier: Arc<dyn Notifier>, check_interval: Duration) -> Self {
        Self {
            store,
            notifier,
            check_interval,
        }
    }

    pub async fn goals(&self) -> AppResult<Goals> {
        self.store.read().await
    }

    pub async fn add_goal(&self, text: &str, deadline: Option<&str>) -> AppResult<Goal> {
        let goal = Goal::new(validate_goal_text(text)?, validate_deadline(deadline)?);
        let added = goal.clone();
        self.store
            .update::<Goals, _, _>(move |goals| {
                goals.0.push(goal);
                Ok(())
            })
            .await?;
        info!("Added goal \"{}\"", added.text);
        Ok(added)
    }

    pub async fn complete_goal(&self, index: usize) -> AppResult<()> {
        self.store
            .update::<Goals, _, _>(move |goals| {
                let goal = goals.0.get_mut(index).ok_or(AppError::NotFound { entity: "Goal" })?;
                goal.completed = true;
                Ok(())
            })
            .await
    }

    pub async fn check_deadlines(&self) -> AppResult<usize> {
        self.check_deadlines_at(Local::now()).await
    }

    /// Mark every due reminder as sent in one transaction, then send them.
    /// Returns the number of notifications fired.
    pub async fn check_deadlines_at(&self, now: DateTime<Local>) -> AppResult<usize> {
        let due = self
            .store
            .update::<Goals, _, _>(move |goals| {
                let mut due = Vec::new();
                for goal in &mut goals.0 {
                    for threshold in due_reminders(goal, now) {
                        goal.notified.set(threshold);
                        due.push(reminder_notification(&goal.text, threshold));
                    }
                }
                Ok(due)
            })
            .await?;

        let fired = due.len();
        for notification in due {
            if let Err(e) = self.notifier.notify(notification).await {
                warn!("Failed to send goal reminder: {e}");
            }
        }
        if fired > 0 {
            debug!("Sent {fired} goal reminder(s)");
        }
        Ok(fired)
    }

    async fn check_logged(&self) {
        // Flags stay unset on failure; the next check retries
        if let Err(e) = self.check_deadlines().await {
            warn!("Goal deadline check failed: {e}");
        }
    }

    /// Check deadlines on an interval until `cancel` fires.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => service.check_logged().await,
                }
            }
            debug!("Goal reminder loop stopped");
        })
    }
}
