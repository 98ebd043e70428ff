//! Compact output rendering helpers for CLI surfaces.

use crate::core::todo::Todo;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// One listing row: `  3. [x] Name - description (archived)`.
/// `position` is 1-based.
pub fn todo_line(position: usize, todo: &Todo) -> String {
    let mut line = format!(
        "{}{:>3}. [{}] {}",
        if todo.is_selected { ">" } else { " " },
        position,
        if todo.done { "x" } else { " " },
        compact_line(todo.display_name(), 60)
    );
    if let Some(desc) = &todo.description {
        line.push_str(" - ");
        line.push_str(&compact_line(desc, 60));
    }
    if todo.is_archived {
        line.push_str(" (archived)");
    }
    if todo.is_editable {
        line.push_str(" (editing)");
    }
    line
}
