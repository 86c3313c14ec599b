use serde::{Deserialize, Deserializer, Serialize};

/// Persisted under `blockedSites`: ordered hostnames, no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BlockedSites(Vec<String>);

// Older data may hold duplicates; drop them on load, keeping first position.
impl<'de> Deserialize<'de> for BlockedSites {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let sites = Vec::<String>::deserialize(deserializer)?;
        Ok(sites.into_iter().collect())
    }
}

impl FromIterator<String> for BlockedSites {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut blocked = Self::default();
        for site in iter {
            blocked.insert(&site);
        }
        blocked
    }
}

impl BlockedSites {
    pub fn contains(&self, hostname: &str) -> bool {
        self.0.iter().any(|s| s == hostname)
    }

    /// Append `hostname`. Returns false if it was already present.
    pub fn insert(&mut self, hostname: &str) -> bool {
        if self.contains(hostname) {
            return false;
        }
        self.0.push(hostname.to_string());
        true
    }

    /// Returns false if `hostname` was not present.
    pub fn remove(&mut self, hostname: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s != hostname);
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_uniqueness() {
        let mut blocked = BlockedSites::default();
        assert!(blocked.insert("b.com"));
        assert!(blocked.insert("a.com"));
        assert!(!blocked.insert("b.com"));

        assert_eq!(blocked.iter().collect::<Vec<_>>(), vec!["b.com", "a.com"]);
    }

    #[test]
    fn test_remove() {
        let mut blocked: BlockedSites = ["a.com", "b.com"].into_iter().map(String::from).collect();
        assert!(blocked.remove("a.com"));
        assert!(!blocked.remove("a.com"));
        assert_eq!(blocked.iter().collect::<Vec<_>>(), vec!["b.com"]);
    }

    #[test]
    fn test_deserialize_drops_duplicates() {
        let blocked: BlockedSites = serde_json::from_str(r#"["a.com","b.com","a.com"]"#).unwrap();
        assert_eq!(blocked.len(), 2);
        assert_eq!(serde_json::to_string(&blocked).unwrap(), r#"["a.com","b.com"]"#);
    }
}
