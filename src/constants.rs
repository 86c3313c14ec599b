// src/constants.rs

/// Seconds between time accounting ticks
pub const DEFAULT_TICK_SECS: u64 = 5;

/// Seconds between goal deadline scans (5 minutes)
pub const DEFAULT_GOAL_CHECK_SECS: u64 = 5 * 60;

/// Continuous unproductive time before a usage alert fires (1 hour)
pub const DEFAULT_USAGE_ALERT_SECS: f64 = 60.0 * 60.0;

/// Extension page that blocked navigations are redirected to
pub const DEFAULT_BLOCKED_PAGE: &str = "/blocked.html";

/// Priority given to every dynamic blocking rule
pub const BLOCK_RULE_PRIORITY: u32 = 1;

/// Maximum goal text length
pub const MAX_GOAL_TEXT_LEN: usize = 500;

/// Maximum hostname length (RFC 1035)
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Chrome limits native messaging to 1MB (1024 * 1024 bytes)
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Capacity of the storage change broadcast channel
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;
