//! The todo record and its construction/update payloads.
//!
//! A `Todo` is built from a `TodoParams` bag where every field is optional and
//! missing values fall back to defaults. Updates go through `TodoPatch`, whose
//! fields are applied only when present.

use crate::core::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WELCOME_NAME: &str = "Welcome";
pub const WELCOME_DESCRIPTION: &str = "This is a description";

/// One task. Field names are the persisted JSON keys.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Todo {
    /// Never validated; a todo built without a name keeps `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub done: bool,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub date_completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub is_editable: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub date_archived: Option<DateTime<Utc>>,
}

/// Construction parameters. Anything left `None` takes its default.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TodoParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub done: Option<bool>,
    pub date_added: Option<DateTime<Utc>>,
    pub date_completed: Option<DateTime<Utc>>,
    pub is_selected: Option<bool>,
    pub is_editable: Option<bool>,
    pub is_archived: Option<bool>,
    pub date_archived: Option<DateTime<Utc>>,
}

impl TodoParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<&Todo> for TodoParams {
    fn from(todo: &Todo) -> Self {
        Self {
            name: todo.name.clone(),
            description: todo.description.clone(),
            done: Some(todo.done),
            date_added: Some(todo.date_added),
            date_completed: todo.date_completed,
            is_selected: Some(todo.is_selected),
            is_editable: Some(todo.is_editable),
            is_archived: Some(todo.is_archived),
            date_archived: todo.date_archived,
        }
    }
}

/// Partial update. `Some` marks a field as present in the payload.
///
/// Nullable fields are doubly optional so that `Some(None)` clears the value
/// while `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub done: Option<bool>,
    pub date_added: Option<DateTime<Utc>>,
    pub date_completed: Option<Option<DateTime<Utc>>>,
    pub is_selected: Option<bool>,
    pub is_editable: Option<bool>,
    pub is_archived: Option<bool>,
    pub date_archived: Option<Option<DateTime<Utc>>>,
}

impl Todo {
    pub fn new(params: TodoParams) -> Self {
        Self {
            name: params.name,
            // Empty descriptions collapse to absent.
            description: params.description.filter(|d| !d.is_empty()),
            done: params.done.unwrap_or(false),
            date_added: params.date_added.unwrap_or_else(time::now),
            date_completed: params.date_completed,
            is_selected: params.is_selected.unwrap_or(false),
            is_editable: params.is_editable.unwrap_or(false),
            is_archived: params.is_archived.unwrap_or(false),
            date_archived: params.date_archived,
        }
    }

    pub fn welcome() -> Self {
        Self::new(TodoParams::named(WELCOME_NAME).with_description(WELCOME_DESCRIPTION))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Applies a patch in place.
    ///
    /// `is_editable` always changes: absent in the patch means `false`.
    /// `date_archived` follows the presence of `is_archived`, not its own.
    pub fn apply(&mut self, patch: TodoPatch) {
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(done) = patch.done {
            self.done = done;
        }
        if let Some(date_added) = patch.date_added {
            self.date_added = date_added;
        }
        if let Some(date_completed) = patch.date_completed {
            self.date_completed = date_completed;
        }
        if let Some(is_selected) = patch.is_selected {
            self.is_selected = is_selected;
        }
        self.is_editable = patch.is_editable.unwrap_or(false);
        if let Some(is_archived) = patch.is_archived {
            self.is_archived = is_archived;
            self.date_archived = patch.date_archived.flatten();
        }
    }
}
