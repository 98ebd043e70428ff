//! Viewing options for the todo list.

use crate::core::todo::Todo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ViewFilter {
    #[default]
    All,
    Active,
    Archive,
}

/// Declaration order. The first entry is the default view of a new session.
pub const VIEWING_OPTIONS: &[ViewFilter] = &[ViewFilter::All, ViewFilter::Active, ViewFilter::Archive];

impl ViewFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewFilter::All => "All",
            ViewFilter::Active => "Active",
            ViewFilter::Archive => "Archive",
        }
    }

    /// Lenient parse: anything unrecognized selects `Active`.
    pub fn parse_or_active(s: &str) -> Self {
        s.parse().unwrap_or(ViewFilter::Active)
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            ViewFilter::All => true,
            ViewFilter::Active => !todo.is_archived,
            ViewFilter::Archive => todo.is_archived,
        }
    }
}

impl fmt::Display for ViewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(ViewFilter::All),
            "Active" => Ok(ViewFilter::Active),
            "Archive" => Ok(ViewFilter::Archive),
            other => Err(format!("unknown view filter '{}'", other)),
        }
    }
}
