//! Todopad: a local-first, single-user todo list.
//!
//! Each user owns one ordered list of todos, newest first. Every change is
//! written back as a whole `{ "todos": [...] }` record under the username,
//! the same shape a browser keeps in local storage.
//!
//! # Architecture
//!
//! - [`core::todo`]: the `Todo` record, its default-filling constructor and
//!   the partial-update payload.
//! - [`core::view`]: the `All` / `Active` / `Archive` view filters.
//! - [`core::store`]: the `KeyValueStore` adapter and an in-memory store.
//! - [`core::db`]: the SQLite store; writes go through the audit broker
//!   (`broker.events.jsonl`).
//! - [`plugins::todo`]: `TodoService` (list operations), `Session` (one
//!   logged-in user) and the command surface.
//!
//! # Examples
//!
//! ```bash
//! todopad --user alice login
//! todopad --user alice add "Buy milk" --description "2 liters"
//! todopad --user alice done 1
//! todopad --user alice list --view Active
//! todopad --user alice clear-completed
//! ```

pub mod core;
mod cli;
pub mod plugins;

use crate::cli::{Cli, Command};
use crate::core::config::{self, TodopadConfig};
use crate::core::db::{self, SqliteStore};
use crate::core::{broker::DbBroker, error, schemas, time};
use crate::plugins::todo::{self, OutputFormat, Session, TodoService};

use clap::Parser;
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

fn init_root(root: &Path, format: OutputFormat) -> Result<(), error::TodopadError> {
    db::initialize_store_db(root)?;
    let config_path = config::config_path(root);
    let created = !config_path.exists();
    if created {
        let body = toml::to_string(&TodopadConfig::default())
            .map_err(|e| error::TodopadError::ConfigError(e.to_string()))?;
        fs::write(&config_path, body)?;
    }
    let out = time::command_envelope(
        "init",
        "ok",
        serde_json::json!({
            "root": root.to_string_lossy(),
            "config_created": created,
        }),
    );
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&out)?),
        OutputFormat::Text => {
            println!("{} Todopad data root ready at {}", "✓".bright_green(), root.display());
            if !created {
                println!("  Kept existing {}", schemas::CONFIG_FILE_NAME);
            }
        }
    }
    Ok(())
}

fn open_session(
    root: &Path,
    user_flag: Option<String>,
    config: &TodopadConfig,
) -> Result<Session<SqliteStore>, error::TodopadError> {
    let username = config::resolve_user(user_flag, config)?;
    let store = SqliteStore::open(root, &config.key_prefix)?;
    let mut session = Session::login_or_register(TodoService::new(store), &username)?;
    session.show_type_selected(config.default_view);
    Ok(session)
}

pub fn run() -> Result<(), error::TodopadError> {
    let cli = Cli::parse();

    if let Command::Schema = cli.command {
        println!("{}", serde_json::to_string_pretty(&todo::schema())?);
        return Ok(());
    }

    let root = config::resolve_root(cli.root)?;
    let config = config::load_config(&root)?;

    match cli.command {
        Command::Schema => Ok(()),
        Command::Init => init_root(&root, cli.format),
        Command::Users => {
            let store = SqliteStore::open(&root, &config.key_prefix)?;
            let users = store.keys()?;
            match cli.format {
                OutputFormat::Json => {
                    let out = time::command_envelope("users", "ok", serde_json::json!({ "users": users }));
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                OutputFormat::Text if users.is_empty() => println!("No users yet."),
                OutputFormat::Text => {
                    for user in users {
                        println!("{}", user);
                    }
                }
            }
            Ok(())
        }
        Command::Audit { actor } => {
            let events = DbBroker::new(&root).read_events()?;
            let events: Vec<_> = events
                .into_iter()
                .filter(|ev| actor.as_deref().is_none_or(|a| ev.actor == a))
                .collect();
            match cli.format {
                OutputFormat::Json => {
                    let out = time::command_envelope("audit", "ok", serde_json::json!({ "events": events }));
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                OutputFormat::Text => {
                    for ev in events {
                        println!("{} {} {} {} [{}]", ev.ts, ev.event_id, ev.actor, ev.op, ev.status);
                    }
                }
            }
            Ok(())
        }
        Command::Shell => {
            let mut session = open_session(&root, cli.user, &config)?;
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut out = stdout.lock();
            todo::run_shell(&mut session, stdin.lock(), &mut out, cli.format)?;
            out.flush()?;
            Ok(())
        }
        Command::Todo(command) => {
            let mut session = open_session(&root, cli.user, &config)?;
            let envelope = todo::run_todo_command(&mut session, &command)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            todo::render(&mut out, cli.format, &envelope)?;
            Ok(())
        }
    }
}
