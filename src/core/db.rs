use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use crate::core::store::{KeyValueStore, UserRecord};
use crate::core::time;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_KEY_PREFIX: &str = "TodoApp";

pub fn db_connect(db_path: &str) -> Result<Connection, error::TodopadError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::TodopadError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::TodopadError::RusqliteError)?;
    Ok(conn)
}

pub fn store_db_path(root: &Path) -> PathBuf {
    root.join(schemas::STORE_DB_NAME)
}

pub fn initialize_store_db(root: &Path) -> Result<(), error::TodopadError> {
    fs::create_dir_all(root).map_err(error::TodopadError::IoError)?;
    let broker = DbBroker::new(root);
    broker.read_conn(&store_db_path(root), |conn| {
        conn.execute(schemas::STORE_DB_SCHEMA_USER_STORE, [])?;
        Ok(())
    })
}

/// SQLite-backed `KeyValueStore`. Keys are stored as `<prefix>.<key>`.
pub struct SqliteStore {
    root: PathBuf,
    prefix: String,
    broker: DbBroker,
}

impl SqliteStore {
    /// Opens (creating if needed) the store under `root`.
    pub fn open(root: &Path, prefix: &str) -> Result<Self, error::TodopadError> {
        initialize_store_db(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            prefix: prefix.to_string(),
            broker: DbBroker::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn broker(&self) -> &DbBroker {
        &self.broker
    }

    pub fn derive_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    /// Every key held by this prefix, with the prefix stripped.
    pub fn keys(&self) -> Result<Vec<String>, error::TodopadError> {
        let lead = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}.", self.prefix)
        };
        self.broker.read_conn(&store_db_path(&self.root), |conn| {
            let mut stmt = conn.prepare("SELECT key FROM user_store ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for key in rows {
                if let Some(rest) = key?.strip_prefix(&lead) {
                    out.push(rest.to_string());
                }
            }
            Ok(out)
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<UserRecord>, error::TodopadError> {
        let full_key = self.derive_key(key);
        let raw = self.broker.read_conn(&store_db_path(&self.root), |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM user_store WHERE key = ?1",
                    params![full_key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &UserRecord, op: &str) -> Result<(), error::TodopadError> {
        let full_key = self.derive_key(key);
        let json = serde_json::to_string(value)?;
        self.broker.with_conn(&store_db_path(&self.root), key, op, |conn| {
            conn.execute(
                "INSERT INTO user_store(key, value, updated_at) VALUES(?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![full_key, json, time::now_epoch_z()],
            )?;
            Ok(())
        })
    }
}
