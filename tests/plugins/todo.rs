use todopad::core::db::SqliteStore;
use todopad::core::error::TodopadError;
use todopad::core::store::{KeyValueStore, MemoryStore};
use todopad::core::time;
use todopad::core::todo::{Todo, TodoParams, TodoPatch};
use todopad::core::view::ViewFilter;
use todopad::plugins::todo::{
    OutputFormat, Session, TodoService, filter_todos, get_viewing_options, run_shell, select_todo,
};
use std::io::Cursor;
use tempfile::tempdir;

fn names(todos: &[Todo]) -> Vec<&str> {
    todos.iter().map(|t| t.display_name()).collect()
}

#[test]
fn test_first_login_seeds_welcome() {
    let mut service = TodoService::new(MemoryStore::new());
    let todos = service.load_todos("alice").unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].name.as_deref(), Some("Welcome"));
    assert_eq!(todos[0].description.as_deref(), Some("This is a description"));
    assert_eq!(service.store().writes(), 1);

    // Second load reads back without writing.
    let again = service.load_todos("alice").unwrap();
    assert_eq!(again, todos);
    assert_eq!(service.store().writes(), 1);
}

#[test]
fn test_todo_lifecycle() {
    let mut service = TodoService::new(MemoryStore::new());
    let user = "alice";

    // 1. Load
    let mut todos = service.load_todos(user).unwrap();

    // 2. Add goes first
    service
        .add_todo(user, &mut todos, TodoParams::named("Buy milk"))
        .unwrap();
    assert_eq!(names(&todos), vec!["Buy milk", "Welcome"]);

    // 3. Mark done
    let before = time::now();
    service.todo_done_status_change(user, &mut todos, 0, true).unwrap();
    assert!(todos[0].done);
    assert!(todos[0].date_completed.unwrap() >= before);

    // 4. Clear completed
    let todos = service.clear_completed_todos(user, &todos).unwrap();
    assert_eq!(names(&todos), vec!["Welcome"]);
    let stored = service.store().get(user).unwrap().unwrap();
    assert_eq!(names(&stored.todos), vec!["Welcome"]);
}

#[test]
fn test_every_mutation_persists_whole_list() {
    let mut service = TodoService::new(MemoryStore::new());
    let user = "bob";
    let mut todos = service.load_todos(user).unwrap();

    service.add_todo(user, &mut todos, TodoParams::named("a")).unwrap();
    service.add_todo(user, &mut todos, TodoParams::named("b")).unwrap();
    service.archive_todo(user, &mut todos, 1).unwrap();
    service
        .update_todo(
            user,
            &mut todos,
            0,
            TodoPatch {
                name: Some("b2".into()),
                ..TodoPatch::default()
            },
        )
        .unwrap();
    let removed = service.remove_todo(user, &mut todos, 2).unwrap();
    assert_eq!(removed.display_name(), "Welcome");

    // seed + 2 adds + archive + update + remove
    assert_eq!(service.store().writes(), 6);
    assert_eq!(service.store().get(user).unwrap().unwrap().todos, todos);
    assert_eq!(names(&todos), vec!["b2", "a"]);
}

#[test]
fn test_remove_out_of_range_is_not_found() {
    let mut service = TodoService::new(MemoryStore::new());
    let mut todos = service.load_todos("alice").unwrap();
    let writes = service.store().writes();

    let err = service.remove_todo("alice", &mut todos, 5).unwrap_err();
    assert!(matches!(err, TodopadError::NotFound(_)));
    assert_eq!(todos.len(), 1);
    assert_eq!(service.store().writes(), writes);

    let err = service
        .update_todo("alice", &mut todos, 1, TodoPatch::default())
        .unwrap_err();
    assert!(matches!(err, TodopadError::NotFound(_)));
}

#[test]
fn test_undone_keeps_completion_date() {
    let mut service = TodoService::new(MemoryStore::new());
    let mut todos = service.load_todos("alice").unwrap();
    service.todo_done_status_change("alice", &mut todos, 0, true).unwrap();
    let completed = todos[0].date_completed;
    assert!(completed.is_some());

    service.todo_done_status_change("alice", &mut todos, 0, false).unwrap();
    assert!(!todos[0].done);
    assert_eq!(todos[0].date_completed, completed);
}

#[test]
fn test_empty_update_only_resets_editable() {
    let mut service = TodoService::new(MemoryStore::new());
    let mut todos = service.load_todos("alice").unwrap();
    select_todo(&mut todos, 0).unwrap();
    todos[0].is_editable = true;
    let before = todos[0].clone();

    service
        .update_todo("alice", &mut todos, 0, TodoPatch::default())
        .unwrap();
    assert!(!todos[0].is_editable);
    assert_eq!(todos[0].name, before.name);
    assert_eq!(todos[0].description, before.description);
    assert_eq!(todos[0].date_added, before.date_added);
    assert!(todos[0].is_selected);
}

#[test]
fn test_archive_moves_between_views() {
    let mut service = TodoService::new(MemoryStore::new());
    let mut todos = service.load_todos("alice").unwrap();
    service.add_todo("alice", &mut todos, TodoParams::named("Old")).unwrap();
    service.archive_todo("alice", &mut todos, 0).unwrap();
    assert!(todos[0].date_archived.is_some());

    let active = filter_todos(&todos, ViewFilter::Active);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].display_name(), "Welcome");

    let archived = filter_todos(&todos, ViewFilter::Archive);
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].display_name(), "Old");

    assert_eq!(filter_todos(&todos, ViewFilter::All).len(), todos.len());
    assert_eq!(
        filter_todos(&todos, ViewFilter::parse_or_active("Bogus")).len(),
        active.len()
    );
}

#[test]
fn test_viewing_options_order() {
    assert_eq!(
        get_viewing_options(),
        &[ViewFilter::All, ViewFilter::Active, ViewFilter::Archive]
    );
}

#[test]
fn test_session_edit_flow() {
    let mut store = MemoryStore::new();
    {
        let mut session = Session::login_or_register(TodoService::new(&mut store), "alice").unwrap();
        assert_eq!(session.view_filter(), ViewFilter::All);
        session.add(TodoParams::named("Draft me")).unwrap();

        let draft = session.edit(0).unwrap().clone();
        assert!(draft.is_editable && draft.is_selected);
        assert!(session.todos()[0].is_editable);
        assert!(session.todo_edit().is_some());

        session
            .commit_edit(
                0,
                TodoPatch {
                    name: Some("Edited".into()),
                    is_editable: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap();
        assert!(session.todo_edit().is_none());
        assert!(!session.todos()[0].is_editable);
        assert!(session.todos()[0].is_selected);

        // Selecting another todo clears the previous selection.
        session.select(1).unwrap();
        assert!(!session.todos()[0].is_selected);
        assert!(session.todos()[1].is_selected);
    }
    let stored = store.get("alice").unwrap().unwrap();
    assert_eq!(names(&stored.todos), vec!["Edited", "Welcome"]);
    // Selection alone is not persisted.
    assert!(stored.todos[0].is_selected);
    assert!(!stored.todos[1].is_selected);
}

#[test]
fn test_session_visible_todos_keep_positions() {
    let mut session =
        Session::login_or_register(TodoService::new(MemoryStore::new()), "alice").unwrap();
    session.add(TodoParams::named("a")).unwrap();
    session.add(TodoParams::named("b")).unwrap();
    session.archive(1).unwrap();

    session.show_type_selected(ViewFilter::Active);
    let visible: Vec<usize> = session.visible_todos().iter().map(|(i, _)| *i).collect();
    assert_eq!(visible, vec![0, 2]);

    session.show_type_selected(ViewFilter::Archive);
    let visible: Vec<usize> = session.visible_todos().iter().map(|(i, _)| *i).collect();
    assert_eq!(visible, vec![1]);
}

#[test]
fn test_sqlite_backed_session_survives_reopen() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();

    {
        let store = SqliteStore::open(&root, "TodoApp").unwrap();
        let mut session = Session::login_or_register(TodoService::new(store), "alice").unwrap();
        session.add(TodoParams::named("Persist me")).unwrap();
        session.set_done(0, true).unwrap();
    }

    let store = SqliteStore::open(&root, "TodoApp").unwrap();
    let session = Session::login_or_register(TodoService::new(store), "alice").unwrap();
    assert_eq!(names(session.todos()), vec!["Persist me", "Welcome"]);
    assert!(session.todos()[0].done);
    assert!(session.todos()[0].date_completed.is_some());
}

#[test]
fn test_shell_keeps_one_session() {
    let mut session =
        Session::login_or_register(TodoService::new(MemoryStore::new()), "alice").unwrap();
    let script = "add \"Buy milk\" --description 'two liters'\n\
                  done 1\n\
                  remove 9\n\
                  archive 2\n\
                  view Archive\n\
                  bogus\n\
                  exit\n\
                  add ignored\n";
    let mut out = Vec::new();
    run_shell(&mut session, Cursor::new(script), &mut out, OutputFormat::Json).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("\"cmd\": \"todo.add\""));
    assert!(text.contains("Error: Not found"));
    assert!(text.contains("\"current\": \"Archive\""));

    assert_eq!(names(session.todos()), vec!["Buy milk", "Welcome"]);
    assert!(session.todos()[0].done);
    assert_eq!(session.todos()[0].description.as_deref(), Some("two liters"));
    assert!(session.todos()[1].is_archived);
    assert_eq!(session.view_filter(), ViewFilter::Archive);
}
