use crate::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type TabId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { title: title.into(), message: message.into() }
    }
}

/// A declarativeNetRequest dynamic rule, serialized the way the browser expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    Redirect { redirect: Redirect },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub extension_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub request_domains: Vec<String>,
    pub resource_types: Vec<String>,
}

/// Tab lookup offered by the browser.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Current URL of `tab_id`, or `None` if the tab is gone or has no URL.
    async fn tab_url(&self, tab_id: TabId) -> Option<String>;
}

/// Dynamic request rules installed in the browser's network layer.
#[async_trait]
pub trait RuleHost: Send + Sync {
    async fn installed_rule_ids(&self) -> AppResult<Vec<u32>>;
    async fn update_dynamic_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> AppResult<()>;
}

/// User-visible notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> AppResult<()>;
}
