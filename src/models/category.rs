use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Productivity label for a hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteCategory {
    #[default]
    Unclassified,
    Productive,
    Unproductive,
}

impl SiteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Productive => "productive",
            Self::Unproductive => "unproductive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unclassified" => Some(Self::Unclassified),
            "productive" => Some(Self::Productive),
            "unproductive" => Some(Self::Unproductive),
            _ => None,
        }
    }
}

/// Persisted under `siteCategories`: hostname -> category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteCategories(pub BTreeMap<String, SiteCategory>);

impl SiteCategories {
    pub fn get(&self, hostname: &str) -> Option<SiteCategory> {
        self.0.get(hostname).copied()
    }

    /// Seed `hostname` as unclassified. Returns true if it was absent.
    pub fn ensure(&mut self, hostname: &str) -> bool {
        if self.0.contains_key(hostname) {
            return false;
        }
        self.0.insert(hostname.to_string(), SiteCategory::Unclassified);
        true
    }

    pub fn set(&mut self, hostname: &str, category: SiteCategory) {
        self.0.insert(hostname.to_string(), category);
    }

    pub fn with_category(&self, category: SiteCategory) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |(_, c)| **c == category)
            .map(|(host, _)| host.as_str())
    }
}
