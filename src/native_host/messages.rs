use crate::platform::{BlockRule, Notification, TabId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Anything the extension can send: a forwarded browser event or a
/// request from one of its pages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    Event(HostEvent),
    Control(ControlMessage),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    TabActivated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    TabUpdated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        url: String,
    },
    TabRemoved {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    NavigationCompleted {
        #[serde(rename = "frameId")]
        frame_id: i64,
        url: String,
    },
    StorageChanged { keys: Vec<String> },
    RulesInstalled {
        #[serde(rename = "ruleIds")]
        rule_ids: Vec<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    UpdateBlockedSites,
    UpdateBlockingRules,
    SetCategory { hostname: String, category: String },
    AddSite { url: String },
    BlockSite { hostname: String },
    UnblockSite { hostname: String },
    ToggleBlock { hostname: String },
    UnblockFromPage { site: String },
    AddGoal {
        text: String,
        #[serde(default)]
        deadline: Option<String>,
    },
    CompleteGoal { index: usize },
    GetState,
}

impl ControlMessage {
    pub fn action(&self) -> &'static str {
        match self {
            Self::UpdateBlockedSites => "updateBlockedSites",
            Self::UpdateBlockingRules => "updateBlockingRules",
            Self::SetCategory { .. } => "setCategory",
            Self::AddSite { .. } => "addSite",
            Self::BlockSite { .. } => "blockSite",
            Self::UnblockSite { .. } => "unblockSite",
            Self::ToggleBlock { .. } => "toggleBlock",
            Self::UnblockFromPage { .. } => "unblockFromPage",
            Self::AddGoal { .. } => "addGoal",
            Self::CompleteGoal { .. } => "completeGoal",
            Self::GetState => "getState",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    UpdateDynamicRules {
        #[serde(rename = "removeRuleIds")]
        remove_rule_ids: Vec<u32>,
        #[serde(rename = "addRules")]
        add_rules: Vec<BlockRule>,
    },
    Notify { title: String, message: String },
    Response {
        action: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl From<Notification> for OutgoingMessage {
    fn from(n: Notification) -> Self {
        Self::Notify {
            title: n.title,
            message: n.message,
        }
    }
}
