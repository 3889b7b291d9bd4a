//! Daily diary entries: reflections, self-assessed scores and habit check-offs.

use thiserror::Error;

use crate::database::{Database, DatabaseError, new_diary_entry};
use crate::models::{DailyHabit, DiaryEntry, Scores, default_habits, now_timestamp};

#[derive(Debug, Error)]
pub enum DiaryError {
    #[error("{label} must be between {min} and {max}")]
    ScoreOutOfRange {
        label: &'static str,
        min: i64,
        max: i64,
    },
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Editable content of one day's entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryDraft {
    pub younger_self: String,
    pub lesson: String,
    pub scores: Scores,
    pub habits: Vec<DailyHabit>,
}

impl Default for DiaryDraft {
    fn default() -> Self {
        Self {
            younger_self: String::new(),
            lesson: String::new(),
            scores: Scores::default(),
            habits: default_habits(),
        }
    }
}

impl DiaryDraft {
    /// Pre-fill from the entry for `date` if there is one, defaults otherwise
    pub fn for_date(entries: &[DiaryEntry], date: &str) -> Self {
        match entries.iter().find(|e| e.date == date) {
            Some(entry) => Self {
                younger_self: entry.younger_self.clone(),
                lesson: entry.lesson.clone(),
                scores: entry.scores,
                habits: if entry.habits.is_empty() {
                    default_habits()
                } else {
                    entry.habits.clone()
                },
            },
            None => Self::default(),
        }
    }

    pub fn toggle_habit(&mut self, index: usize) {
        if let Some(habit) = self.habits.get_mut(index) {
            habit.completed = !habit.completed;
        }
    }

    /// Mark exactly the named habits as done; unknown names are added
    pub fn set_completed_habits(&mut self, names: &[String]) {
        for habit in &mut self.habits {
            habit.completed = names.iter().any(|n| n.eq_ignore_ascii_case(&habit.habit_name));
        }
        for name in names {
            if !self.habits.iter().any(|h| h.habit_name.eq_ignore_ascii_case(name)) {
                let mut habit = DailyHabit::new(name);
                habit.completed = true;
                self.habits.push(habit);
            }
        }
    }

    pub fn validate(&self) -> Result<(), DiaryError> {
        match self.scores.first_out_of_range() {
            Some(label) => Err(DiaryError::ScoreOutOfRange {
                label,
                min: Scores::MIN,
                max: Scores::MAX,
            }),
            None => Ok(()),
        }
    }
}

pub fn fetch_entries(db: &Database, username: &str) -> Result<Vec<DiaryEntry>, DiaryError> {
    Ok(db.get_diary_entries(username)?)
}

/// Create or update the (username, date) entry. A new entry is numbered
/// one past the user's current entry count; an existing one keeps its number.
pub fn save_entry(db: &Database, username: &str, date: &str, draft: &DiaryDraft) -> Result<SaveOutcome, DiaryError> {
    draft.validate()?;
    crate::utils::parse_date(date).map_err(|_| DiaryError::InvalidDate(date.to_string()))?;

    let day_number = match db.get_diary_entry(username, date)? {
        Some(existing) => existing.day_number,
        None => db.count_diary_entries(username)? + 1,
    };

    let mut entry = new_diary_entry(username, date, day_number);
    entry.younger_self = draft.younger_self.trim().to_string();
    entry.lesson = draft.lesson.trim().to_string();
    entry.scores = draft.scores;
    entry.habits = draft.habits.clone();
    entry.updated_at = now_timestamp();

    let (_, created) = db.upsert_diary_entry(&entry)?;
    let outcome = if created { SaveOutcome::Created } else { SaveOutcome::Updated };
    tracing::info!(username = %username, date = %date, outcome = ?outcome, "diary entry saved");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_date_updates_new_date_creates() {
        let db = Database::open_in_memory().unwrap();
        let mut draft = DiaryDraft::default();
        draft.lesson = "Start early".into();

        assert_eq!(save_entry(&db, "ana", "2024-05-01", &draft).unwrap(), SaveOutcome::Created);
        draft.lesson = "Start earlier".into();
        draft.toggle_habit(0);
        assert_eq!(save_entry(&db, "ana", "2024-05-01", &draft).unwrap(), SaveOutcome::Updated);

        let entries = fetch_entries(&db, "ana").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lesson, "Start earlier");
        assert_eq!(entries[0].day_number, 1);
        assert!(entries[0].habits[0].completed);
        assert_eq!(entries[0].habits.len(), 4);

        assert_eq!(save_entry(&db, "ana", "2024-05-02", &draft).unwrap(), SaveOutcome::Created);
        let entries = fetch_entries(&db, "ana").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, "2024-05-02");
        assert_eq!(entries[0].day_number, 2);
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let mut draft = DiaryDraft::default();
        draft.scores.energy_level = 11;

        let err = save_entry(&db, "ana", "2024-05-01", &draft).unwrap_err();
        assert_eq!(err.to_string(), "Energy level must be between 0 and 10");
        assert_eq!(db.count_diary_entries("ana").unwrap(), 0);
    }

    #[test]
    fn draft_prefills_from_existing_entry() {
        let db = Database::open_in_memory().unwrap();
        let mut draft = DiaryDraft::default();
        draft.younger_self = "Be patient".into();
        draft.scores.focus_level = 9;
        save_entry(&db, "ana", "2024-05-01", &draft).unwrap();

        let entries = fetch_entries(&db, "ana").unwrap();
        let loaded = DiaryDraft::for_date(&entries, "2024-05-01");
        assert_eq!(loaded.younger_self, "Be patient");
        assert_eq!(loaded.scores.focus_level, 9);

        assert_eq!(DiaryDraft::for_date(&entries, "2024-05-02"), DiaryDraft::default());
    }

    #[test]
    fn named_habits_are_marked_and_extras_added() {
        let mut draft = DiaryDraft::default();
        draft.set_completed_habits(&["exercise".to_string(), "Reading".to_string()]);

        assert!(draft.habits[0].completed);
        assert!(!draft.habits[1].completed);
        assert_eq!(draft.habits.last().unwrap().habit_name, "Reading");
        assert!(draft.habits.last().unwrap().completed);
    }
}
