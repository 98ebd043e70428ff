use crate::core::db;
use crate::core::error;
use crate::core::schemas;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The DB Broker is the single path to the store database.
/// Connections are serialized in-process and every audited call leaves one
/// line in `broker.events.jsonl`.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join(schemas::AUDIT_LOG_NAME),
        }
    }

    /// Execute a closure with a serialized connection and record the outcome.
    pub fn with_conn<F, R>(&self, db_path: &Path, actor: &str, op_name: &str, f: F) -> Result<R, error::TodopadError>
    where
        F: FnOnce(&Connection) -> Result<R, error::TodopadError>,
    {
        let result = self.read_conn(db_path, f);

        let db_id = db_path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(actor, op_name, &db_id, status)?;

        result
    }

    /// Same serialization as `with_conn`, without an audit entry.
    pub fn read_conn<F, R>(&self, db_path: &Path, f: F) -> Result<R, error::TodopadError>
    where
        F: FnOnce(&Connection) -> Result<R, error::TodopadError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        let _lock = DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let conn = db::db_connect(&db_path.to_string_lossy())?;
        f(&conn)
    }

    fn log_event(&self, actor: &str, op: &str, db_id: &str, status: &str) -> Result<(), error::TodopadError> {
        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::TodopadError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(error::TodopadError::IoError)?;
        Ok(())
    }

    /// All recorded events, oldest first. A missing log reads as empty.
    pub fn read_events(&self) -> Result<Vec<BrokerEvent>, error::TodopadError> {
        if !self.audit_log_path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.audit_log_path)?;
        let mut events = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }
}
