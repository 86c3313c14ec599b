pub mod blocked_sites;
pub mod category;
pub mod goal;
pub mod time_log;

pub use blocked_sites::BlockedSites;
pub use category::{SiteCategories, SiteCategory};
pub use goal::{Goal, Goals, ReminderFlags, ReminderThreshold};
pub use time_log::TimeLogs;
