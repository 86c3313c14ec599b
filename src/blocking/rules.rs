use crate::constants::BLOCK_RULE_PRIORITY;
use crate::models::BlockedSites;
use crate::platform::{BlockRule, Redirect, RuleAction, RuleCondition};
use std::collections::BTreeSet;
use url::form_urlencoded;

/// Path of the blocked page for `hostname`, e.g. `/blocked.html?site=example.com`.
pub fn blocked_page_path(blocked_page: &str, hostname: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("site", hostname)
        .finish();
    format!("{blocked_page}?{query}")
}

/// The `count` smallest positive ids not currently in use.
pub fn allocate_rule_ids(in_use: &[u32], count: usize) -> Vec<u32> {
    let taken: BTreeSet<u32> = in_use.iter().copied().collect();
    (1..=u32::MAX)
        .filter(|id| !taken.contains(id))
        .take(count)
        .collect()
}

/// One redirect rule per blocked hostname, top-level navigations only.
pub fn build_rules(blocked: &BlockedSites, ids: &[u32], blocked_page: &str) -> Vec<BlockRule> {
    blocked
        .iter()
        .zip(ids)
        .map(|(hostname, id)| BlockRule {
            id: *id,
            priority: BLOCK_RULE_PRIORITY,
            action: RuleAction::Redirect {
                redirect: Redirect {
                    extension_path: blocked_page_path(blocked_page, hostname),
                },
            },
            condition: RuleCondition {
                request_domains: vec![hostname.to_string()],
                resource_types: vec!["main_frame".to_string()],
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_page_path_encodes_hostname() {
        assert_eq!(blocked_page_path("/blocked.html", "example.com"), "/blocked.html?site=example.com");
        assert_eq!(blocked_page_path("/blocked.html", "[::1]"), "/blocked.html?site=%5B%3A%3A1%5D");
    }

    #[test]
    fn test_allocate_skips_ids_in_use() {
        assert_eq!(allocate_rule_ids(&[], 3), vec![1, 2, 3]);
        assert_eq!(allocate_rule_ids(&[1, 3], 3), vec![2, 4, 5]);
        assert!(allocate_rule_ids(&[1, 2], 0).is_empty());
    }

    #[test]
    fn test_build_rules_one_per_site() {
        let blocked: BlockedSites = ["a.com", "b.com"].into_iter().map(String::from).collect();
        let rules = build_rules(&blocked, &[7, 8], "/blocked.html");

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, 7);
        assert_eq!(rules[0].condition.request_domains, vec!["a.com".to_string()]);
        assert_eq!(rules[0].condition.resource_types, vec!["main_frame".to_string()]);
        assert_eq!(
            rules[1].action,
            RuleAction::Redirect {
                redirect: Redirect { extension_path: "/blocked.html?site=b.com".into() }
            }
        );
    }
}
