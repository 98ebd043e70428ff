//! CLI struct definitions for the todopad command-line interface.
//!
//! All clap-derived top-level types live here. Todo commands are flattened in
//! from `plugins::todo`.

use crate::plugins::todo::{OutputFormat, TodoCommand};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "todopad",
    version = env!("CARGO_PKG_VERSION"),
    about = "Todopad keeps a local, per-user todo list in SQLite."
)]
pub(crate) struct Cli {
    /// Data root (defaults to $TODOPAD_ROOT, then ~/.todopad).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    /// Username owning the list (defaults to $TODOPAD_USER, then config).
    #[clap(long, global = true)]
    pub user: Option<String>,
    /// Output format for this command.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the data root and a default config file.
    Init,
    /// List usernames that have a stored list.
    Users,
    /// Show the storage audit log.
    Audit {
        /// Only events for this user.
        #[clap(long)]
        actor: Option<String>,
    },
    /// Read commands from stdin, one per line, in a single session.
    Shell,
    /// Print the command schema as JSON.
    Schema,
    #[clap(flatten)]
    Todo(TodoCommand),
}
