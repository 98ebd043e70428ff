use crate::core::error;
use crate::core::output;
use crate::core::store::{KeyValueStore, UserRecord};
use crate::core::time;
use crate::core::todo::{Todo, TodoParams, TodoPatch};
use crate::core::view::{VIEWING_OPTIONS, ViewFilter};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value as JsonValue;
use std::io::{BufRead, Write};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Todo operations. Positions are 1-based, counted in the full list.
#[derive(Subcommand, Debug, Clone)]
pub enum TodoCommand {
    /// Load the user's list, creating it with a welcome task on first use.
    Login,
    /// Add a new task at the top of the list.
    Add {
        /// Task name (positional argument)
        #[clap(value_name = "NAME")]
        name: String,
        #[clap(long, default_value = "")]
        description: String,
    },
    /// List tasks through a view filter.
    List {
        /// All, Active or Archive. Defaults to the session's current view.
        #[clap(long)]
        view: Option<String>,
    },
    /// Show one task.
    Show {
        #[clap(value_name = "N")]
        position: usize,
    },
    /// List the available view filters.
    Views,
    /// Change the session's current view filter.
    View {
        #[clap(value_name = "FILTER")]
        filter: String,
    },
    /// Select a task (deselects every other task).
    Select {
        #[clap(value_name = "N")]
        position: usize,
    },
    /// Edit a task's name or description and close the edit.
    Edit {
        #[clap(value_name = "N")]
        position: usize,
        #[clap(long)]
        name: Option<String>,
        #[clap(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[clap(long)]
        clear_description: bool,
    },
    /// Mark a task done.
    Done {
        #[clap(value_name = "N")]
        position: usize,
    },
    /// Mark a task not done. The completion date is kept.
    Undone {
        #[clap(value_name = "N")]
        position: usize,
    },
    /// Archive a task (hidden from the Active view).
    Archive {
        #[clap(value_name = "N")]
        position: usize,
    },
    /// Return an archived task to the Active view.
    Unarchive {
        #[clap(value_name = "N")]
        position: usize,
    },
    /// Delete a task.
    Remove {
        #[clap(value_name = "N")]
        position: usize,
    },
    /// Delete every done task.
    ClearCompleted,
}

/// Wraps a `KeyValueStore` with the todo list operations.
///
/// The service never owns a list: callers pass theirs in, and every mutating
/// operation writes the whole list back under the username.
pub struct TodoService<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> TodoService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn persist(&mut self, username: &str, todos: &[Todo], op: &str) -> Result<(), error::TodopadError> {
        self.store.set(username, &UserRecord::from_todos(todos), op)
    }

    /// Returns the stored list, or seeds and stores a one-item welcome list.
    pub fn load_todos(&mut self, username: &str) -> Result<Vec<Todo>, error::TodopadError> {
        if let Some(record) = self.store.get(username)? {
            return Ok(record.todos);
        }
        let todos = vec![Todo::welcome()];
        self.persist(username, &todos, "todo.seed")?;
        Ok(todos)
    }

    pub fn add_todo(
        &mut self,
        username: &str,
        todos: &mut Vec<Todo>,
        params: TodoParams,
    ) -> Result<(), error::TodopadError> {
        todos.insert(0, Todo::new(params));
        self.persist(username, todos, "todo.add")
    }

    pub fn remove_todo(
        &mut self,
        username: &str,
        todos: &mut Vec<Todo>,
        index: usize,
    ) -> Result<Todo, error::TodopadError> {
        check_index(todos, index)?;
        let removed = todos.remove(index);
        self.persist(username, todos, "todo.remove")?;
        Ok(removed)
    }

    /// Returns the list without done tasks; the caller replaces its own list.
    pub fn clear_completed_todos(
        &mut self,
        username: &str,
        todos: &[Todo],
    ) -> Result<Vec<Todo>, error::TodopadError> {
        let remaining: Vec<Todo> = todos.iter().filter(|t| !t.done).cloned().collect();
        self.persist(username, &remaining, "todo.clear_completed")?;
        Ok(remaining)
    }

    pub fn update_todo(
        &mut self,
        username: &str,
        todos: &mut [Todo],
        index: usize,
        patch: TodoPatch,
    ) -> Result<(), error::TodopadError> {
        self.update_as(username, todos, index, patch, "todo.update")
    }

    fn update_as(
        &mut self,
        username: &str,
        todos: &mut [Todo],
        index: usize,
        patch: TodoPatch,
        op: &str,
    ) -> Result<(), error::TodopadError> {
        check_index(todos, index)?;
        todos[index].apply(patch);
        self.persist(username, todos, op)
    }

    /// Marking undone leaves `date_completed` as it was.
    pub fn todo_done_status_change(
        &mut self,
        username: &str,
        todos: &mut [Todo],
        index: usize,
        done: bool,
    ) -> Result<(), error::TodopadError> {
        let patch = TodoPatch {
            done: Some(done),
            date_completed: done.then(|| Some(time::now())),
            ..TodoPatch::default()
        };
        self.update_as(username, todos, index, patch, "todo.done_status")
    }

    pub fn archive_todo(
        &mut self,
        username: &str,
        todos: &mut [Todo],
        index: usize,
    ) -> Result<(), error::TodopadError> {
        let patch = TodoPatch {
            is_archived: Some(true),
            date_archived: Some(Some(time::now())),
            ..TodoPatch::default()
        };
        self.update_as(username, todos, index, patch, "todo.archive")
    }
}

fn check_index(todos: &[Todo], index: usize) -> Result<(), error::TodopadError> {
    if index < todos.len() {
        Ok(())
    } else {
        Err(error::TodopadError::NotFound(format!(
            "no todo at position {} (list has {})",
            index + 1,
            todos.len()
        )))
    }
}

pub fn get_viewing_options() -> &'static [ViewFilter] {
    VIEWING_OPTIONS
}

/// Single selection: re-selecting the selected todo changes nothing.
/// Not persisted.
pub fn select_todo(todos: &mut [Todo], index: usize) -> Result<(), error::TodopadError> {
    check_index(todos, index)?;
    if todos[index].is_selected {
        return Ok(());
    }
    for (i, todo) in todos.iter_mut().enumerate() {
        if i != index {
            todo.is_selected = false;
            todo.is_editable = false;
        }
    }
    todos[index].is_selected = true;
    Ok(())
}

/// Flags the original editable and hands back a detached copy for a form.
pub fn edit_todo(todo: &mut Todo) -> Todo {
    todo.is_editable = true;
    Todo::new(TodoParams::from(&*todo))
}

pub fn filter_todos(todos: &[Todo], filter: ViewFilter) -> Vec<&Todo> {
    todos.iter().filter(|t| filter.matches(t)).collect()
}

/// Like `filter_todos`, keeping each todo's index in the full list.
pub fn filter_positions(todos: &[Todo], filter: ViewFilter) -> Vec<(usize, &Todo)> {
    todos
        .iter()
        .enumerate()
        .filter(|(_, t)| filter.matches(t))
        .collect()
}

/// The state of one logged-in user: the owned list, the current view
/// filter, and the copy being edited, if any.
pub struct Session<S: KeyValueStore> {
    service: TodoService<S>,
    username: String,
    todos: Vec<Todo>,
    view_filter: ViewFilter,
    todo_edit: Option<Todo>,
}

impl<S: KeyValueStore> Session<S> {
    pub fn login_or_register(mut service: TodoService<S>, username: &str) -> Result<Self, error::TodopadError> {
        let todos = service.load_todos(username)?;
        Ok(Self {
            service,
            username: username.to_string(),
            todos,
            view_filter: get_viewing_options()[0],
            todo_edit: None,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn view_filter(&self) -> ViewFilter {
        self.view_filter
    }

    pub fn todo_edit(&self) -> Option<&Todo> {
        self.todo_edit.as_ref()
    }

    pub fn service(&self) -> &TodoService<S> {
        &self.service
    }

    pub fn into_service(self) -> TodoService<S> {
        self.service
    }

    pub fn add(&mut self, params: TodoParams) -> Result<(), error::TodopadError> {
        self.service.add_todo(&self.username, &mut self.todos, params)
    }

    pub fn remove(&mut self, index: usize) -> Result<Todo, error::TodopadError> {
        self.service.remove_todo(&self.username, &mut self.todos, index)
    }

    pub fn clear_completed(&mut self) -> Result<(), error::TodopadError> {
        self.todos = self.service.clear_completed_todos(&self.username, &self.todos)?;
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> Result<(), error::TodopadError> {
        select_todo(&mut self.todos, index)
    }

    /// Selects the todo, opens it for editing and keeps the draft copy.
    pub fn edit(&mut self, index: usize) -> Result<&Todo, error::TodopadError> {
        select_todo(&mut self.todos, index)?;
        let draft: &Todo = self.todo_edit.insert(edit_todo(&mut self.todos[index]));
        Ok(draft)
    }

    pub fn update(&mut self, index: usize, patch: TodoPatch) -> Result<(), error::TodopadError> {
        self.service.update_todo(&self.username, &mut self.todos, index, patch)
    }

    /// Applies the edited fields and closes the edit.
    pub fn commit_edit(&mut self, index: usize, mut patch: TodoPatch) -> Result<(), error::TodopadError> {
        patch.is_editable = None;
        self.update(index, patch)?;
        self.todo_edit = None;
        Ok(())
    }

    pub fn set_done(&mut self, index: usize, done: bool) -> Result<(), error::TodopadError> {
        self.service
            .todo_done_status_change(&self.username, &mut self.todos, index, done)
    }

    pub fn archive(&mut self, index: usize) -> Result<(), error::TodopadError> {
        self.service.archive_todo(&self.username, &mut self.todos, index)
    }

    pub fn show_type_selected(&mut self, filter: ViewFilter) {
        self.view_filter = filter;
    }

    pub fn visible_todos(&self) -> Vec<(usize, &Todo)> {
        filter_positions(&self.todos, self.view_filter)
    }
}

fn position_to_index(position: usize) -> Result<usize, error::TodopadError> {
    position
        .checked_sub(1)
        .ok_or_else(|| error::TodopadError::NotFound("positions start at 1".to_string()))
}

fn items_json(items: &[(usize, &Todo)]) -> Result<JsonValue, error::TodopadError> {
    let mut out = Vec::with_capacity(items.len());
    for (index, todo) in items {
        let mut value = serde_json::to_value(todo)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("position".to_string(), serde_json::json!(index + 1));
        }
        out.push(value);
    }
    Ok(JsonValue::Array(out))
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "todo",
        "version": "0.1.0",
        "description": "Manage a user's todo list",
        "commands": [
            { "name": "login", "parameters": [] },
            { "name": "add", "parameters": ["name", "description"] },
            { "name": "list", "parameters": ["view"] },
            { "name": "show", "parameters": ["position"] },
            { "name": "views", "parameters": [] },
            { "name": "view", "parameters": ["filter"] },
            { "name": "select", "parameters": ["position"] },
            { "name": "edit", "parameters": ["position", "name", "description", "clear_description"] },
            { "name": "done", "parameters": ["position"] },
            { "name": "undone", "parameters": ["position"] },
            { "name": "archive", "parameters": ["position"] },
            { "name": "unarchive", "parameters": ["position"] },
            { "name": "remove", "parameters": ["position"] },
            { "name": "clear-completed", "parameters": [] }
        ],
        "storage": ["todopad.db", "broker.events.jsonl"]
    })
}

/// Runs one command against the session and returns its result envelope.
pub fn run_todo_command<S: KeyValueStore>(
    session: &mut Session<S>,
    command: &TodoCommand,
) -> Result<JsonValue, error::TodopadError> {
    let user = session.username().to_string();
    let out = match command {
        TodoCommand::Login => time::command_envelope(
            "todo.login",
            "ok",
            serde_json::json!({ "user": user, "count": session.todos().len() }),
        ),
        TodoCommand::Add { name, description } => {
            session.add(TodoParams::named(name.clone()).with_description(description.clone()))?;
            time::command_envelope(
                "todo.add",
                "ok",
                serde_json::json!({ "user": user, "position": 1, "item": session.todos()[0] }),
            )
        }
        TodoCommand::List { view } => {
            let filter = match view {
                Some(v) => ViewFilter::parse_or_active(v),
                None => session.view_filter(),
            };
            let items = filter_positions(session.todos(), filter);
            time::command_envelope(
                "todo.list",
                "ok",
                serde_json::json!({
                    "user": user,
                    "view": filter,
                    "total": session.todos().len(),
                    "items": items_json(&items)?,
                }),
            )
        }
        TodoCommand::Show { position } => {
            let index = position_to_index(*position)?;
            check_index(session.todos(), index)?;
            let items = [(index, &session.todos()[index])];
            time::command_envelope(
                "todo.show",
                "ok",
                serde_json::json!({ "user": user, "items": items_json(&items)? }),
            )
        }
        TodoCommand::Views => time::command_envelope(
            "todo.views",
            "ok",
            serde_json::json!({ "views": get_viewing_options(), "current": session.view_filter() }),
        ),
        TodoCommand::View { filter } => {
            session.show_type_selected(ViewFilter::parse_or_active(filter));
            time::command_envelope(
                "todo.view",
                "ok",
                serde_json::json!({ "current": session.view_filter() }),
            )
        }
        TodoCommand::Select { position } => {
            let index = position_to_index(*position)?;
            session.select(index)?;
            time::command_envelope(
                "todo.select",
                "ok",
                serde_json::json!({ "user": user, "position": position }),
            )
        }
        TodoCommand::Edit {
            position,
            name,
            description,
            clear_description,
        } => {
            let index = position_to_index(*position)?;
            session.edit(index)?;
            let patch = TodoPatch {
                name: name.clone(),
                description: if *clear_description {
                    Some(None)
                } else {
                    description.clone().map(Some)
                },
                ..TodoPatch::default()
            };
            session.commit_edit(index, patch)?;
            time::command_envelope(
                "todo.edit",
                "ok",
                serde_json::json!({ "user": user, "position": position, "item": session.todos()[index] }),
            )
        }
        TodoCommand::Done { position } | TodoCommand::Undone { position } => {
            let done = matches!(command, TodoCommand::Done { .. });
            let index = position_to_index(*position)?;
            session.set_done(index, done)?;
            time::command_envelope(
                if done { "todo.done" } else { "todo.undone" },
                "ok",
                serde_json::json!({ "user": user, "position": position, "item": session.todos()[index] }),
            )
        }
        TodoCommand::Archive { position } => {
            let index = position_to_index(*position)?;
            session.archive(index)?;
            time::command_envelope(
                "todo.archive",
                "ok",
                serde_json::json!({ "user": user, "position": position, "item": session.todos()[index] }),
            )
        }
        TodoCommand::Unarchive { position } => {
            let index = position_to_index(*position)?;
            session.update(
                index,
                TodoPatch {
                    is_archived: Some(false),
                    ..TodoPatch::default()
                },
            )?;
            time::command_envelope(
                "todo.unarchive",
                "ok",
                serde_json::json!({ "user": user, "position": position, "item": session.todos()[index] }),
            )
        }
        TodoCommand::Remove { position } => {
            let index = position_to_index(*position)?;
            let removed = session.remove(index)?;
            time::command_envelope(
                "todo.remove",
                "ok",
                serde_json::json!({ "user": user, "item": removed }),
            )
        }
        TodoCommand::ClearCompleted => {
            let before = session.todos().len();
            session.clear_completed()?;
            time::command_envelope(
                "todo.clear_completed",
                "ok",
                serde_json::json!({ "user": user, "removed": before - session.todos().len() }),
            )
        }
    };
    Ok(out)
}

/// Writes a command envelope in the requested format.
pub fn render<W: Write>(out: &mut W, format: OutputFormat, envelope: &JsonValue) -> Result<(), error::TodopadError> {
    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string_pretty(envelope)?)?;
        return Ok(());
    }

    let cmd = envelope.get("cmd").and_then(|x| x.as_str()).unwrap_or("");
    match cmd {
        "todo.list" | "todo.show" => {
            let items: Vec<(usize, Todo)> = envelope
                .get("items")
                .and_then(|x| x.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| {
                            let position = v.get("position").and_then(|p| p.as_u64())? as usize;
                            let todo = serde_json::from_value::<Todo>(v.clone()).ok()?;
                            Some((position, todo))
                        })
                        .collect()
                })
                .unwrap_or_default();
            if let Some(view) = envelope.get("view").and_then(|x| x.as_str()) {
                let total = envelope.get("total").and_then(|x| x.as_u64()).unwrap_or(0);
                writeln!(out, "{} ({} of {})", view.bold(), items.len(), total)?;
            }
            if items.is_empty() {
                writeln!(out, "No tasks found.")?;
            }
            for (position, todo) in &items {
                writeln!(out, "{}", output::todo_line(*position, todo))?;
            }
        }
        "todo.views" => {
            let current = envelope.get("current").and_then(|x| x.as_str()).unwrap_or("");
            if let Some(views) = envelope.get("views").and_then(|x| x.as_array()) {
                for v in views.iter().filter_map(|v| v.as_str()) {
                    let marker = if v == current { "*" } else { " " };
                    writeln!(out, "{} {}", marker, v)?;
                }
            }
        }
        "todo.login" => {
            let user = envelope.get("user").and_then(|x| x.as_str()).unwrap_or("?");
            let count = envelope.get("count").and_then(|x| x.as_u64()).unwrap_or(0);
            writeln!(out, "{} Logged in as {} ({} tasks)", "✓".bright_green(), user, count)?;
        }
        "todo.remove" | "todo.add" | "todo.edit" | "todo.done" | "todo.undone" | "todo.archive"
        | "todo.unarchive" => {
            let name = envelope
                .get("item")
                .and_then(|x| x.get("name"))
                .and_then(|x| x.as_str())
                .unwrap_or("");
            let verb = cmd.trim_start_matches("todo.");
            writeln!(out, "{} {}: {}", "✓".bright_green(), verb, output::compact_line(name, 60))?;
        }
        "todo.clear_completed" => {
            let removed = envelope.get("removed").and_then(|x| x.as_u64()).unwrap_or(0);
            writeln!(out, "{} Cleared {} completed tasks", "✓".bright_green(), removed)?;
        }
        _ => {
            // Remaining commands print the minimal envelope.
            writeln!(out, "{}", serde_json::to_string(envelope)?)?;
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[clap(name = "todopad", no_binary_name = true)]
struct ShellLine {
    #[clap(subcommand)]
    command: TodoCommand,
}

/// Splits a shell line into words. Single or double quotes group words.
pub fn split_words(line: &str) -> Result<Vec<String>, error::TodopadError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(error::TodopadError::ValidationError("unterminated quote".to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Interactive loop: one command per line until `quit`, `exit` or EOF.
/// A failing command is reported and the loop continues.
pub fn run_shell<S, R, W>(
    session: &mut Session<S>,
    input: R,
    out: &mut W,
    format: OutputFormat,
) -> Result<(), error::TodopadError>
where
    S: KeyValueStore,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line?;
        let words = match split_words(&line) {
            Ok(words) => words,
            Err(e) => {
                writeln!(out, "Error: {}", e)?;
                continue;
            }
        };
        match words.first().map(String::as_str) {
            None => continue,
            Some("quit") | Some("exit") => break,
            Some(_) => {}
        }
        let parsed = match ShellLine::try_parse_from(words.iter().map(String::as_str)) {
            Ok(parsed) => parsed,
            Err(e) => {
                writeln!(out, "{}", e.to_string().trim_end())?;
                continue;
            }
        };
        match run_todo_command(session, &parsed.command) {
            Ok(envelope) => render(out, format, &envelope)?,
            Err(e) => writeln!(out, "Error: {}", e)?,
        }
    }
    Ok(())
}
