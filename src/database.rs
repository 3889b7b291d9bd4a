use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{
    CommunityPost, DailyHabit, DailyProductivity, DiaryEntry, PasswordReset, PomodoroSession,
    Scores, Task, User, UserPreferences, now_timestamp,
};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Unique constraint failed: {column}")]
    UniqueViolation { column: String },
}

impl DatabaseError {
    /// Split SQLite's "UNIQUE constraint failed: table.column" out of the generic error
    fn from_write(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, Some(ref msg)) = err {
            if code.code == rusqlite::ErrorCode::ConstraintViolation {
                if let Some(column) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    return DatabaseError::UniqueViolation { column: column.to_string() };
                }
            }
        }
        DatabaseError::SqliteError(err)
    }
}

pub struct Database {
    conn: Connection,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        TEXT NOT NULL UNIQUE,
        email           TEXT NOT NULL UNIQUE,
        password_hash   TEXT NOT NULL,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        TEXT NOT NULL,
        description     TEXT NOT NULL,
        duration        INTEGER NOT NULL,
        completed       INTEGER NOT NULL DEFAULT 0,
        due_date        TEXT NOT NULL,
        created_at      TEXT NOT NULL,
        completed_at    TEXT
    );

    CREATE TABLE IF NOT EXISTS diary_entries (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        TEXT NOT NULL,
        date            TEXT NOT NULL,
        day_number      INTEGER NOT NULL,
        younger_self    TEXT NOT NULL DEFAULT '',
        lesson          TEXT NOT NULL DEFAULT '',
        task_completion INTEGER NOT NULL,
        focus_level     INTEGER NOT NULL,
        time_management INTEGER NOT NULL,
        energy_level    INTEGER NOT NULL,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL,
        UNIQUE (username, date)
    );

    CREATE TABLE IF NOT EXISTS daily_habits (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        diary_entry_id  INTEGER NOT NULL REFERENCES diary_entries(id) ON DELETE CASCADE,
        habit_name      TEXT NOT NULL,
        completed       INTEGER NOT NULL DEFAULT 0,
        UNIQUE (diary_entry_id, habit_name)
    );

    CREATE TABLE IF NOT EXISTS pomodoro_sessions (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        username         TEXT NOT NULL,
        task_description TEXT,
        duration         INTEGER NOT NULL,
        completed_at     TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS user_preferences (
        username        TEXT NOT NULL,
        date            TEXT NOT NULL,
        wake_time       TEXT NOT NULL,
        sleep_time      TEXT NOT NULL,
        PRIMARY KEY (username, date)
    );

    CREATE TABLE IF NOT EXISTS daily_productivity (
        username        TEXT NOT NULL,
        date            TEXT NOT NULL,
        productivity    REAL NOT NULL,
        worked_minutes  INTEGER NOT NULL,
        available_hours REAL NOT NULL,
        updated_at      TEXT NOT NULL,
        PRIMARY KEY (username, date)
    );

    CREATE TABLE IF NOT EXISTS logins (
        username        TEXT NOT NULL,
        login_date      TEXT NOT NULL,
        PRIMARY KEY (username, login_date)
    );

    CREATE TABLE IF NOT EXISTS community_posts (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        TEXT NOT NULL,
        content         TEXT NOT NULL,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS password_resets (
        token_hash      TEXT PRIMARY KEY,
        username        TEXT NOT NULL,
        expires_at      TEXT NOT NULL,
        used            INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_username ON tasks(username);
    CREATE INDEX IF NOT EXISTS idx_sessions_username_completed ON pomodoro_sessions(username, completed_at);
    CREATE INDEX IF NOT EXISTS idx_sessions_completed ON pomodoro_sessions(completed_at);
    CREATE INDEX IF NOT EXISTS idx_posts_created ON community_posts(created_at);
";

const TASK_COLUMNS: &str =
    "id, username, description, duration, completed, due_date, created_at, completed_at";
const DIARY_COLUMNS: &str = "id, username, date, day_number, younger_self, lesson, \
    task_completion, focus_level, time_management, energy_level, created_at, updated_at";

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        tracing::debug!(path = %db_path.display(), "database opened");

        Ok(db)
    }

    /// Private in-memory database, used by tests and throwaway runs
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database { conn: Connection::open_in_memory()? };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ---- users ----

    fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
        Ok(User {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// Insert a user; a duplicate username or email comes back as `UniqueViolation`
    pub fn insert_user(&self, user: &User) -> Result<i64, DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO users (username, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user.username, user.email, user.password_hash, user.created_at],
            )
            .map_err(DatabaseError::from_write)?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, username, email, password_hash, created_at
                 FROM users WHERE username = ?1",
                rusqlite::params![username],
                Self::row_to_user,
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn get_user_by_username_and_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, username, email, password_hash, created_at
                 FROM users WHERE username = ?1 AND email = ?2",
                rusqlite::params![username, email],
                Self::row_to_user,
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn get_username_by_email(&self, email: &str) -> Result<Option<String>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT username FROM users WHERE email = ?1",
                rusqlite::params![email],
                |row| row.get(0),
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE username = ?2",
            rusqlite::params![password_hash, username],
        )?;
        Ok(changed > 0)
    }

    pub fn count_users(&self) -> Result<i64, DatabaseError> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    pub fn get_all_usernames(&self) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT username FROM users ORDER BY username ASC")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    // ---- tasks ----

    fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
        Ok(Task {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            description: row.get(2)?,
            duration: row.get(3)?,
            completed: row.get::<_, i64>(4)? != 0,
            due_date: row.get(5)?,
            created_at: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }

    /// Insert a task into the database and return its ID
    pub fn insert_task(&self, task: &Task) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO tasks (username, description, duration, completed, due_date, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                task.username,
                task.description,
                task.duration,
                if task.completed { 1 } else { 0 },
                task.due_date,
                task.created_at,
                task.completed_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// A user's tasks, newest first
    pub fn get_tasks_for_user(&self, username: &str) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE username = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let tasks = stmt
            .query_map(rusqlite::params![username], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn get_task(&self, id: i64, username: &str) -> Result<Option<Task>, DatabaseError> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND username = ?2"),
                rusqlite::params![id, username],
                Self::row_to_task,
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    /// Flip the completed flag; returns false when no task of this user matched
    pub fn set_task_completed(
        &self,
        id: i64,
        username: &str,
        completed: bool,
        completed_at: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = ?1, completed_at = ?2 WHERE id = ?3 AND username = ?4",
            rusqlite::params![if completed { 1 } else { 0 }, completed_at, id, username],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_task(&self, id: i64, username: &str) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND username = ?2",
            rusqlite::params![id, username],
        )?;
        Ok(changed > 0)
    }

    /// Sum of durations of tasks completed on the given local date
    pub fn completed_task_minutes_on(&self, username: &str, date: &str) -> Result<i64, DatabaseError> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(duration), 0) FROM tasks
             WHERE username = ?1 AND completed = 1 AND substr(completed_at, 1, 10) = ?2",
            rusqlite::params![username, date],
            |row| row.get(0),
        )?)
    }

    /// Completed task counts per user, optionally restricted to completions on or after `since`
    pub fn completed_task_counts(&self, since: Option<&str>) -> Result<HashMap<String, i64>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT username, COUNT(*) FROM tasks
             WHERE completed = 1 AND (?1 IS NULL OR substr(completed_at, 1, 10) >= ?1)
             GROUP BY username",
        )?;
        let counts = stmt
            .query_map(rusqlite::params![since], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }

    // ---- diary ----

    fn row_to_diary_entry(row: &rusqlite::Row) -> Result<DiaryEntry, rusqlite::Error> {
        Ok(DiaryEntry {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            date: row.get(2)?,
            day_number: row.get(3)?,
            younger_self: row.get(4)?,
            lesson: row.get(5)?,
            scores: Scores {
                task_completion: row.get(6)?,
                focus_level: row.get(7)?,
                time_management: row.get(8)?,
                energy_level: row.get(9)?,
            },
            habits: Vec::new(),
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn get_habits_for_entry(&self, entry_id: i64) -> Result<Vec<DailyHabit>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, diary_entry_id, habit_name, completed FROM daily_habits
             WHERE diary_entry_id = ?1 ORDER BY id ASC",
        )?;
        let habits = stmt
            .query_map(rusqlite::params![entry_id], |row| {
                Ok(DailyHabit {
                    id: Some(row.get(0)?),
                    diary_entry_id: Some(row.get(1)?),
                    habit_name: row.get(2)?,
                    completed: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    /// A user's diary entries with their habits, newest date first
    pub fn get_diary_entries(&self, username: &str) -> Result<Vec<DiaryEntry>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary_entries WHERE username = ?1 ORDER BY date DESC"
        ))?;
        let mut entries = stmt
            .query_map(rusqlite::params![username], Self::row_to_diary_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        for entry in &mut entries {
            if let Some(id) = entry.id {
                entry.habits = self.get_habits_for_entry(id)?;
            }
        }
        Ok(entries)
    }

    pub fn get_diary_entry(&self, username: &str, date: &str) -> Result<Option<DiaryEntry>, DatabaseError> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {DIARY_COLUMNS} FROM diary_entries WHERE username = ?1 AND date = ?2"),
                rusqlite::params![username, date],
                Self::row_to_diary_entry,
            )
            .optional()?;
        match entry {
            Some(mut entry) => {
                if let Some(id) = entry.id {
                    entry.habits = self.get_habits_for_entry(id)?;
                }
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Insert or update the entry for (username, date) together with its habit rows.
    /// Returns the entry id and whether a new row was created.
    /// An existing row keeps its day number and creation time.
    pub fn upsert_diary_entry(&self, entry: &DiaryEntry) -> Result<(i64, bool), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        let existed: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM diary_entries WHERE username = ?1 AND date = ?2)",
            rusqlite::params![entry.username, entry.date],
            |row| row.get(0),
        )?;

        let entry_id: i64 = tx.query_row(
            "INSERT INTO diary_entries (username, date, day_number, younger_self, lesson,
                 task_completion, focus_level, time_management, energy_level, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (username, date) DO UPDATE SET
                 younger_self = excluded.younger_self,
                 lesson = excluded.lesson,
                 task_completion = excluded.task_completion,
                 focus_level = excluded.focus_level,
                 time_management = excluded.time_management,
                 energy_level = excluded.energy_level,
                 updated_at = excluded.updated_at
             RETURNING id",
            rusqlite::params![
                entry.username,
                entry.date,
                entry.day_number,
                entry.younger_self,
                entry.lesson,
                entry.scores.task_completion,
                entry.scores.focus_level,
                entry.scores.time_management,
                entry.scores.energy_level,
                entry.created_at,
                entry.updated_at
            ],
            |row| row.get(0),
        )?;

        tx.execute(
            "DELETE FROM daily_habits WHERE diary_entry_id = ?1",
            rusqlite::params![entry_id],
        )?;
        for habit in &entry.habits {
            tx.execute(
                "INSERT INTO daily_habits (diary_entry_id, habit_name, completed) VALUES (?1, ?2, ?3)
                 ON CONFLICT (diary_entry_id, habit_name) DO UPDATE SET completed = excluded.completed",
                rusqlite::params![entry_id, habit.habit_name, if habit.completed { 1 } else { 0 }],
            )?;
        }

        tx.commit()?;
        Ok((entry_id, !existed))
    }

    pub fn count_diary_entries(&self, username: &str) -> Result<i64, DatabaseError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM diary_entries WHERE username = ?1",
            rusqlite::params![username],
            |row| row.get(0),
        )?)
    }

    // ---- pomodoro sessions ----

    fn row_to_session(row: &rusqlite::Row) -> Result<PomodoroSession, rusqlite::Error> {
        Ok(PomodoroSession {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            task_description: row.get(2)?,
            duration: row.get(3)?,
            completed_at: row.get(4)?,
        })
    }

    pub fn insert_pomodoro_session(&self, session: &PomodoroSession) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO pomodoro_sessions (username, task_description, duration, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                session.username,
                session.task_description,
                session.duration,
                session.completed_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Sessions completed on or after the start of `since` (YYYY-MM-DD), oldest first
    pub fn get_sessions_since(&self, username: &str, since: &str) -> Result<Vec<PomodoroSession>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, task_description, duration, completed_at
             FROM pomodoro_sessions WHERE username = ?1 AND completed_at >= ?2
             ORDER BY completed_at ASC",
        )?;
        let sessions = stmt
            .query_map(rusqlite::params![username, since], Self::row_to_session)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Total focus seconds per user, optionally from `since` onwards
    pub fn focus_seconds_by_user(&self, since: Option<&str>) -> Result<HashMap<String, i64>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT username, COALESCE(SUM(duration), 0) FROM pomodoro_sessions
             WHERE (?1 IS NULL OR completed_at >= ?1)
             GROUP BY username",
        )?;
        let totals = stmt
            .query_map(rusqlite::params![since], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(totals)
    }

    // ---- preferences ----

    pub fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO user_preferences (username, date, wake_time, sleep_time)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (username, date) DO UPDATE SET
                 wake_time = excluded.wake_time,
                 sleep_time = excluded.sleep_time",
            rusqlite::params![prefs.username, prefs.date, prefs.wake_time, prefs.sleep_time],
        )?;
        Ok(())
    }

    /// The row for `date`, or else the most recent row before it
    pub fn get_preferences_on_or_before(
        &self,
        username: &str,
        date: &str,
    ) -> Result<Option<UserPreferences>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT username, date, wake_time, sleep_time FROM user_preferences
                 WHERE username = ?1 AND date <= ?2 ORDER BY date DESC LIMIT 1",
                rusqlite::params![username, date],
                |row| {
                    Ok(UserPreferences {
                        username: row.get(0)?,
                        date: row.get(1)?,
                        wake_time: row.get(2)?,
                        sleep_time: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    // ---- daily productivity ----

    pub fn upsert_daily_productivity(&self, row: &DailyProductivity) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO daily_productivity (username, date, productivity, worked_minutes, available_hours, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (username, date) DO UPDATE SET
                 productivity = excluded.productivity,
                 worked_minutes = excluded.worked_minutes,
                 available_hours = excluded.available_hours,
                 updated_at = excluded.updated_at",
            rusqlite::params![
                row.username,
                row.date,
                row.productivity,
                row.worked_minutes,
                row.available_hours,
                row.updated_at
            ],
        )?;
        Ok(())
    }

    /// Snapshot rows from `since` (inclusive), oldest first
    pub fn get_productivity_since(&self, username: &str, since: &str) -> Result<Vec<DailyProductivity>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT username, date, productivity, worked_minutes, available_hours, updated_at
             FROM daily_productivity WHERE username = ?1 AND date >= ?2 ORDER BY date ASC",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![username, since], |row| {
                Ok(DailyProductivity {
                    username: row.get(0)?,
                    date: row.get(1)?,
                    productivity: row.get(2)?,
                    worked_minutes: row.get(3)?,
                    available_hours: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---- logins ----

    /// Record a login day; repeated logins on the same day are a no-op
    pub fn record_login(&self, username: &str, login_date: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO logins (username, login_date) VALUES (?1, ?2)
             ON CONFLICT (username, login_date) DO NOTHING",
            rusqlite::params![username, login_date],
        )?;
        Ok(())
    }

    /// Login days, newest first
    pub fn get_login_dates(&self, username: &str) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT login_date FROM logins WHERE username = ?1 ORDER BY login_date DESC",
        )?;
        let dates = stmt
            .query_map(rusqlite::params![username], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(dates)
    }

    // ---- community ----

    pub fn insert_post(&self, post: &CommunityPost) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO community_posts (username, content, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![post.username, post.content, post.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_recent_posts(&self, limit: usize) -> Result<Vec<CommunityPost>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, content, created_at FROM community_posts
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let posts = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(CommunityPost {
                    id: Some(row.get(0)?),
                    username: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Delete a post if it belongs to `username`
    pub fn delete_post(&self, id: i64, username: &str) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "DELETE FROM community_posts WHERE id = ?1 AND username = ?2",
            rusqlite::params![id, username],
        )?;
        Ok(changed > 0)
    }

    // ---- password resets ----

    pub fn insert_password_reset(&self, reset: &PasswordReset) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO password_resets (token_hash, username, expires_at, used) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                reset.token_hash,
                reset.username,
                reset.expires_at,
                if reset.used { 1 } else { 0 }
            ],
        )?;
        Ok(())
    }

    pub fn get_password_reset(&self, token_hash: &str) -> Result<Option<PasswordReset>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT token_hash, username, expires_at, used FROM password_resets WHERE token_hash = ?1",
                rusqlite::params![token_hash],
                |row| {
                    Ok(PasswordReset {
                        token_hash: row.get(0)?,
                        username: row.get(1)?,
                        expires_at: row.get(2)?,
                        used: row.get::<_, i64>(3)? != 0,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    /// Mark the token used and store the new hash in one transaction.
    /// Returns false if the token was already consumed.
    pub fn complete_password_reset(
        &self,
        token_hash: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let claimed = tx.execute(
            "UPDATE password_resets SET used = 1 WHERE token_hash = ?1 AND used = 0",
            rusqlite::params![token_hash],
        )?;
        if claimed == 0 {
            return Ok(false);
        }
        tx.execute(
            "UPDATE users SET password_hash = ?1 WHERE username = ?2",
            rusqlite::params![password_hash, username],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Drop reset tokens that expired before `now`
    pub fn purge_expired_resets(&self, now: &str) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute(
            "DELETE FROM password_resets WHERE expires_at < ?1",
            rusqlite::params![now],
        )?)
    }
}

/// Build a fresh diary row for `username` on `date`
pub fn new_diary_entry(username: &str, date: &str, day_number: i64) -> DiaryEntry {
    let now = now_timestamp();
    DiaryEntry {
        id: None,
        username: username.to_string(),
        date: date.to_string(),
        day_number,
        younger_self: String::new(),
        lesson: String::new(),
        scores: Scores::default(),
        habits: crate::models::default_habits(),
        created_at: now.clone(),
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn duplicate_username_is_a_unique_violation() {
        let db = db();
        db.insert_user(&User::new("ana".into(), "ana@example.com".into(), "h".into())).unwrap();

        let err = db
            .insert_user(&User::new("ana".into(), "other@example.com".into(), "h".into()))
            .unwrap_err();

        match err {
            DatabaseError::UniqueViolation { column } => assert_eq!(column, "users.username"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn tasks_are_scoped_to_their_owner() {
        let db = db();
        let id = db.insert_task(&Task::new("ana".into(), "Write report".into(), 30)).unwrap();

        assert!(db.get_task(id, "ben").unwrap().is_none());
        assert!(!db.delete_task(id, "ben").unwrap());
        assert!(!db.set_task_completed(id, "ben", true, Some("2024-05-01 10:00:00")).unwrap());
        assert!(db.delete_task(id, "ana").unwrap());
    }

    #[test]
    fn completed_minutes_only_count_the_given_day() {
        let db = db();
        let a = db.insert_task(&Task::new("ana".into(), "A".into(), 30)).unwrap();
        let b = db.insert_task(&Task::new("ana".into(), "B".into(), 45)).unwrap();
        let c = db.insert_task(&Task::new("ana".into(), "C".into(), 60)).unwrap();
        db.insert_task(&Task::new("ana".into(), "D".into(), 90)).unwrap();

        db.set_task_completed(a, "ana", true, Some("2024-05-01 09:00:00")).unwrap();
        db.set_task_completed(b, "ana", true, Some("2024-05-01 17:30:00")).unwrap();
        db.set_task_completed(c, "ana", true, Some("2024-05-02 08:00:00")).unwrap();

        assert_eq!(db.completed_task_minutes_on("ana", "2024-05-01").unwrap(), 75);
        assert_eq!(db.completed_task_minutes_on("ana", "2024-04-30").unwrap(), 0);
    }

    #[test]
    fn diary_upsert_keeps_one_row_per_day() {
        let db = db();
        let mut entry = new_diary_entry("ana", "2024-05-01", 1);

        let (first_id, created) = db.upsert_diary_entry(&entry).unwrap();
        assert!(created);

        entry.lesson = "Ship small".into();
        entry.day_number = 99;
        entry.habits[0].completed = true;
        let (second_id, created) = db.upsert_diary_entry(&entry).unwrap();
        assert!(!created);
        assert_eq!(first_id, second_id);
        assert_eq!(db.count_diary_entries("ana").unwrap(), 1);

        let stored = db.get_diary_entry("ana", "2024-05-01").unwrap().unwrap();
        assert_eq!(stored.lesson, "Ship small");
        assert_eq!(stored.day_number, 1);
        assert_eq!(stored.habits.len(), 4);
        assert!(stored.habits[0].completed);
    }

    #[test]
    fn preferences_fall_back_to_the_latest_earlier_day() {
        let db = db();
        db.upsert_preferences(&UserPreferences {
            username: "ana".into(),
            date: "2024-05-01".into(),
            wake_time: "07:00".into(),
            sleep_time: "23:30".into(),
        })
        .unwrap();

        let prefs = db.get_preferences_on_or_before("ana", "2024-05-10").unwrap().unwrap();
        assert_eq!(prefs.wake_time, "07:00");
        assert!(db.get_preferences_on_or_before("ana", "2024-04-30").unwrap().is_none());
    }

    #[test]
    fn repeated_logins_on_one_day_are_recorded_once() {
        let db = db();
        db.record_login("ana", "2024-05-01").unwrap();
        db.record_login("ana", "2024-05-01").unwrap();
        db.record_login("ana", "2024-05-02").unwrap();

        assert_eq!(db.get_login_dates("ana").unwrap(), vec!["2024-05-02", "2024-05-01"]);
    }

    #[test]
    fn reset_token_can_only_be_consumed_once() {
        let db = db();
        db.insert_user(&User::new("ana".into(), "ana@example.com".into(), "old".into())).unwrap();
        db.insert_password_reset(&PasswordReset {
            token_hash: "abc".into(),
            username: "ana".into(),
            expires_at: "2999-01-01 00:00:00".into(),
            used: false,
        })
        .unwrap();

        assert!(db.complete_password_reset("abc", "ana", "new").unwrap());
        assert!(!db.complete_password_reset("abc", "ana", "newer").unwrap());
        assert_eq!(db.get_user_by_username("ana").unwrap().unwrap().password_hash, "new");
    }
}
