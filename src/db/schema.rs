pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// Keys of the persisted document with the JSON they start out as.
pub const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    ("siteCategories", "{}"),
    ("timeLogs", "{}"),
    ("blockedSites", "[]"),
    ("goals", "[]"),
];
