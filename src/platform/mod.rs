pub mod types;

pub use types::{
    BlockRule, Notification, Notifier, Redirect, RuleAction, RuleCondition, RuleHost, TabHost, TabId,
};
