//! Aggregate Backlog Counter
//!
//! Counts incomplete task and todo records across the task system's
//! per-session directory, the global todo directory, and two legacy
//! project-scoped todo files. Unreadable or malformed files contribute zero;
//! the aggregate never fails.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Reserved lock filename inside a session task directory; never counted.
pub const TASK_LOCK_FILE: &str = "lock.json";

const MAX_SESSION_ID_LEN: usize = 128;

const TASK_TERMINAL_STATUSES: &[&str] = &["completed", "deleted"];
const TODO_TERMINAL_STATUSES: &[&str] = &["completed", "cancelled"];

/// Incomplete counts per record system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacklogCount {
    pub tasks: usize,
    pub todos: usize,
}

impl BacklogCount {
    pub fn total(&self) -> usize {
        self.tasks + self.todos
    }

    /// Item-type label for outbound messages. The task-system label takes
    /// precedence over the todo label when both contribute.
    pub fn label(&self) -> &'static str {
        if self.tasks > 0 {
            "task"
        } else {
            "todo"
        }
    }
}

/// Strict session-identifier grammar: starts alphanumeric, continues with
/// alphanumeric, hyphen, or underscore, bounded length. Everything else
/// fails closed so an attacker-influenced identifier can never traverse
/// outside the tasks directory.
pub fn session_id_is_safe(id: &str) -> bool {
    if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
        return false;
    }
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Compute `(tasks, todos)` for a session and project directory.
pub fn count_backlog(home: &Path, project: &Path, session_id: Option<&str>) -> BacklogCount {
    BacklogCount {
        tasks: count_tasks(home, session_id),
        todos: count_todos(home, project),
    }
}

/// Count `{pending, in_progress}` task records under
/// `<home>/.claude/tasks/<session-id>/*.json`, excluding the lock file.
/// An absent or invalid session id forces the count to zero.
fn count_tasks(home: &Path, session_id: Option<&str>) -> usize {
    let Some(id) = session_id else {
        return 0;
    };
    if !session_id_is_safe(id) {
        tracing::debug!("rejecting unsafe session id for task counting");
        return 0;
    }

    let dir = home.join(".claude").join("tasks").join(id);
    json_files(&dir)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| name != TASK_LOCK_FILE)
                .unwrap_or(false)
        })
        .filter(|path| task_file_is_open(path))
        .count()
}

fn task_file_is_open(path: &Path) -> bool {
    let Some(value) = read_json(path) else {
        return false;
    };
    match value.get("status").and_then(Value::as_str) {
        Some(status) => !TASK_TERMINAL_STATUSES.contains(&status),
        // A record without a status is not terminal, so it still counts.
        None => value.is_object(),
    }
}

/// Count incomplete todo records in the global todo directory plus the two
/// legacy project files.
fn count_todos(home: &Path, project: &Path) -> usize {
    let mut count = 0;
    for path in json_files(&home.join(".claude").join("todos")) {
        count += count_todo_file(&path);
    }
    for path in [
        project.join(".omc").join("todos.json"),
        project.join(".claude").join("todos.json"),
    ] {
        count += count_todo_file(&path);
    }
    count
}

/// A todo file holds either a bare array of records or a wrapper object with
/// a `todos` array.
fn count_todo_file(path: &Path) -> usize {
    let Some(value) = read_json(path) else {
        return 0;
    };
    let records = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("todos").and_then(Value::as_array) {
            Some(items) => items.as_slice(),
            None => return 0,
        },
        _ => return 0,
    };
    records
        .iter()
        .filter(|record| record.is_object())
        .filter(|record| {
            match record.get("status").and_then(Value::as_str) {
                Some(status) => !TODO_TERMINAL_STATUSES.contains(&status),
                None => true,
            }
        })
        .count()
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

fn read_json(path: &Path) -> Option<Value> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("skipping malformed record file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_session_id_grammar() {
        assert!(session_id_is_safe("abc-123_X"));
        assert!(session_id_is_safe("0session"));
        assert!(!session_id_is_safe(""));
        assert!(!session_id_is_safe("-leading-dash"));
        assert!(!session_id_is_safe("../escape"));
        assert!(!session_id_is_safe("has space"));
        assert!(!session_id_is_safe(&"x".repeat(129)));
    }

    #[test]
    fn test_counts_open_tasks_excluding_lock_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".claude/tasks/sess-1");
        write(&dir.join("a.json"), r#"{"id":"a","status":"pending"}"#);
        write(&dir.join("b.json"), r#"{"id":"b","status":"in_progress"}"#);
        write(&dir.join("c.json"), r#"{"id":"c","status":"completed"}"#);
        write(&dir.join("d.json"), r#"{"id":"d","status":"deleted"}"#);
        write(&dir.join("lock.json"), r#"{"status":"pending"}"#);

        let count = count_backlog(tmp.path(), tmp.path(), Some("sess-1"));
        assert_eq!(count.tasks, 2);
    }

    #[test]
    fn test_invalid_session_id_fails_closed() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".claude/tasks/../tasks/evil");
        write(&dir.join("a.json"), r#"{"status":"pending"}"#);
        let count = count_backlog(tmp.path(), tmp.path(), Some("../tasks/evil"));
        assert_eq!(count.tasks, 0);
        let count = count_backlog(tmp.path(), tmp.path(), None);
        assert_eq!(count.tasks, 0);
    }

    #[test]
    fn test_counts_bare_array_and_wrapper_todo_files() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let project = tmp.path().join("project");
        write(
            &home.join(".claude/todos/one.json"),
            r#"[{"id":"1","status":"pending"},{"id":"2","status":"completed"}]"#,
        );
        write(
            &project.join(".omc/todos.json"),
            r#"{"todos":[{"id":"3","status":"in_progress"},{"id":"4","status":"cancelled"}]}"#,
        );
        write(
            &project.join(".claude/todos.json"),
            r#"[{"id":"5","status":"pending"}]"#,
        );

        let count = count_backlog(&home, &project, None);
        assert_eq!(count.todos, 3);
    }

    #[test]
    fn test_record_without_status_counts_as_incomplete() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp.path().join(".claude/todos/x.json"),
            r#"[{"id":"1"}]"#,
        );
        let count = count_backlog(tmp.path(), &tmp.path().join("p"), None);
        assert_eq!(count.todos, 1);
    }

    #[test]
    fn test_corrupt_files_contribute_zero() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path();
        write(&home.join(".claude/todos/bad.json"), "{not json");
        write(&home.join(".claude/todos/scalar.json"), r#""just a string""#);
        write(
            &home.join(".claude/todos/good.json"),
            r#"[{"status":"pending"}]"#,
        );
        let count = count_backlog(home, &home.join("p"), None);
        assert_eq!(count.todos, 1);
    }

    #[test]
    fn test_label_precedence_task_over_todo() {
        assert_eq!(BacklogCount { tasks: 1, todos: 5 }.label(), "task");
        assert_eq!(BacklogCount { tasks: 0, todos: 2 }.label(), "todo");
    }

    #[test]
    fn test_total_is_sum() {
        let count = BacklogCount { tasks: 2, todos: 3 };
        assert_eq!(count.total(), 5);
    }
}
