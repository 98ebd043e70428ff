//! Persistence adapter for per-user todo records.
//!
//! A `KeyValueStore` is the only thing the todo service knows about storage:
//! a synchronous `get`/`set` pair keyed by username. Writes always replace the
//! whole record.

use crate::core::error;
use crate::core::todo::Todo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The value persisted under each user key.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UserRecord {
    pub todos: Vec<Todo>,
}

impl UserRecord {
    pub fn from_todos(todos: &[Todo]) -> Self {
        Self {
            todos: todos.to_vec(),
        }
    }
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<UserRecord>, error::TodopadError>;

    /// `op` names the operation that caused the write, for auditing backends.
    fn set(&mut self, key: &str, value: &UserRecord, op: &str) -> Result<(), error::TodopadError>;
}

/// In-process store. Nothing survives the value being dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, UserRecord>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<UserRecord>, error::TodopadError> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &UserRecord, _op: &str) -> Result<(), error::TodopadError> {
        self.records.insert(key.to_string(), value.clone());
        self.writes += 1;
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<UserRecord>, error::TodopadError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &UserRecord, op: &str) -> Result<(), error::TodopadError> {
        (**self).set(key, value, op)
    }
}
