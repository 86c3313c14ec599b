mod list;
mod rules;
mod sync;

pub use list::{BlockList, BlockListEntry};
pub use rules::{allocate_rule_ids, blocked_page_path, build_rules};
pub use sync::{BlockingService, RuleSynchronizer};
