use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::Task;
use crate::utils::now_local_timestamp;

pub const DEFAULT_TASK_MINUTES: i64 = 30;
/// Longest task or logged session, one day
pub const MAX_TASK_MINUTES: i64 = 24 * 60;

/// Accepts 1 to `MAX_TASK_MINUTES` minutes
pub fn validate_minutes(minutes: i64) -> Result<i64, TaskError> {
    if minutes <= 0 || minutes > MAX_TASK_MINUTES {
        return Err(TaskError::InvalidDuration);
    }
    Ok(minutes)
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task description cannot be empty")]
    EmptyDescription,
    #[error("Duration must be between 1 and 1440 minutes")]
    InvalidDuration,
    #[error("Task {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

pub fn add_task(db: &Database, username: &str, description: &str, duration: Option<i64>) -> Result<Task, TaskError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(TaskError::EmptyDescription);
    }
    let duration = validate_minutes(duration.unwrap_or(DEFAULT_TASK_MINUTES))?;

    let mut task = Task::new(username.to_string(), description.to_string(), duration);
    task.id = Some(db.insert_task(&task)?);
    tracing::debug!(username = %username, id = ?task.id, "task added");
    Ok(task)
}

/// Set the completion flag, stamping or clearing `completed_at`
pub fn set_completed(db: &Database, username: &str, id: i64, completed: bool) -> Result<Task, TaskError> {
    let stamp = completed.then(now_local_timestamp);
    if !db.set_task_completed(id, username, completed, stamp.as_deref())? {
        return Err(TaskError::NotFound(id));
    }
    db.get_task(id, username)?.ok_or(TaskError::NotFound(id))
}

pub fn toggle_task(db: &Database, username: &str, id: i64) -> Result<Task, TaskError> {
    let task = db.get_task(id, username)?.ok_or(TaskError::NotFound(id))?;
    set_completed(db, username, id, !task.completed)
}

pub fn delete_task(db: &Database, username: &str, id: i64) -> Result<(), TaskError> {
    if !db.delete_task(id, username)? {
        return Err(TaskError::NotFound(id));
    }
    Ok(())
}

/// Planned, done and outstanding minutes across a task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeOverview {
    pub total: i64,
    pub completed: i64,
    pub remaining: i64,
}

impl TimeOverview {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total: i64 = tasks.iter().map(|t| t.duration).sum();
        let completed: i64 = tasks.iter().filter(|t| t.completed).map(|t| t.duration).sum();
        Self {
            total,
            completed,
            remaining: total - completed,
        }
    }

    /// Completed share in [0, 1], for gauges
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("   ", Some(10))]
    #[case("Write", Some(0))]
    #[case("Write", Some(-5))]
    #[case("Write", Some(MAX_TASK_MINUTES + 1))]
    #[case("Huge", Some(i64::MAX / 2))]
    fn invalid_tasks_are_rejected(#[case] description: &str, #[case] duration: Option<i64>) {
        let db = Database::open_in_memory().unwrap();
        assert!(add_task(&db, "ana", description, duration).is_err());
        assert!(db.get_tasks_for_user("ana").unwrap().is_empty());
    }

    #[rstest]
    #[case(1, true)]
    #[case(MAX_TASK_MINUTES, true)]
    #[case(0, false)]
    #[case(MAX_TASK_MINUTES + 1, false)]
    #[case(i64::MAX, false)]
    fn logged_minutes_are_bounded(#[case] minutes: i64, #[case] accepted: bool) {
        assert_eq!(validate_minutes(minutes).is_ok(), accepted);
    }

    #[test]
    fn a_full_day_is_the_longest_task() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(add_task(&db, "ana", "Marathon", Some(MAX_TASK_MINUTES)).unwrap().duration, 1440);
    }

    #[test]
    fn duration_defaults_to_thirty_minutes() {
        let db = Database::open_in_memory().unwrap();
        let task = add_task(&db, "ana", "  Read paper ", None).unwrap();
        assert_eq!(task.description, "Read paper");
        assert_eq!(task.duration, 30);
    }

    #[test]
    fn toggling_stamps_and_clears_completion() {
        let db = Database::open_in_memory().unwrap();
        let id = add_task(&db, "ana", "Write", Some(45)).unwrap().id.unwrap();

        let done = toggle_task(&db, "ana", id).unwrap();
        assert!(done.completed);
        // Stamped in local time so it lands on today's local date
        let stamp = done.completed_at.clone().unwrap();
        assert!(stamp.starts_with(&crate::utils::get_current_date_string()));

        let undone = toggle_task(&db, "ana", id).unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.completed_at, None);
    }

    #[test]
    fn other_users_tasks_are_out_of_reach() {
        let db = Database::open_in_memory().unwrap();
        let id = add_task(&db, "ana", "Write", Some(45)).unwrap().id.unwrap();

        assert!(matches!(toggle_task(&db, "bob", id), Err(TaskError::NotFound(_))));
        assert!(matches!(delete_task(&db, "bob", id), Err(TaskError::NotFound(_))));
        delete_task(&db, "ana", id).unwrap();
    }

    #[test]
    fn overview_sums_durations() {
        let mut a = Task::new("ana".into(), "a".into(), 60);
        a.completed = true;
        let b = Task::new("ana".into(), "b".into(), 30);

        let overview = TimeOverview::from_tasks(&[a, b]);
        assert_eq!(overview, TimeOverview { total: 90, completed: 60, remaining: 30 });
        assert!((overview.ratio() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(TimeOverview::default().ratio(), 0.0);
    }
}
