//! Storage names and schema definitions for the todopad data root.
//!
//! Everything lives in one SQLite database holding a single key-value table,
//! the same shape as browser local storage: one JSON document per user key.

pub const STORE_DB_NAME: &str = "todopad.db";
pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const STORE_DB_SCHEMA_USER_STORE: &str = "
    CREATE TABLE IF NOT EXISTS user_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";
