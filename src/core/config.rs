//! Data root and user settings.
//!
//! Settings come from `<root>/config.toml`; a missing file means defaults.

use crate::core::db::DEFAULT_KEY_PREFIX;
use crate::core::error::TodopadError;
use crate::core::schemas;
use crate::core::view::ViewFilter;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ROOT_ENV: &str = "TODOPAD_ROOT";
pub const USER_ENV: &str = "TODOPAD_USER";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TodopadConfig {
    pub key_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
    pub default_view: ViewFilter,
}

impl Default for TodopadConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_user: None,
            default_view: ViewFilter::default(),
        }
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(schemas::CONFIG_FILE_NAME)
}

pub fn load_config(root: &Path) -> Result<TodopadConfig, TodopadError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(TodopadConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(TodopadError::IoError)?;
    toml::from_str(&content).map_err(|e| TodopadError::ConfigError(format!("{}: {}", path.display(), e)))
}

/// `--root`, then `$TODOPAD_ROOT`, then `$HOME/.todopad`.
pub fn resolve_root(flag: Option<PathBuf>) -> Result<PathBuf, TodopadError> {
    if let Some(root) = flag {
        return Ok(root);
    }
    if let Ok(root) = env::var(ROOT_ENV) {
        if !root.trim().is_empty() {
            return Ok(PathBuf::from(root));
        }
    }
    let home = env::var("HOME").map_err(|_| {
        TodopadError::ConfigError(format!("cannot locate data root: set --root or {}", ROOT_ENV))
    })?;
    Ok(PathBuf::from(home).join(".todopad"))
}

/// `--user`, then `$TODOPAD_USER`, then `default_user` from config.
pub fn resolve_user(flag: Option<String>, config: &TodopadConfig) -> Result<String, TodopadError> {
    let candidate = flag
        .or_else(|| env::var(USER_ENV).ok())
        .or_else(|| config.default_user.clone())
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    candidate.ok_or_else(|| {
        TodopadError::ValidationError(format!("no username given: pass --user or set {}", USER_ENV))
    })
}
