use serde::{Deserialize, Serialize};

/// Timestamp format shared by every `*_at` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: None,
            username,
            email,
            password_hash,
            created_at: now_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>,
    pub username: String,
    pub description: String,
    pub duration: i64,                // minutes
    pub completed: bool,
    pub due_date: String,             // YYYY-MM-DD
    pub created_at: String,
    pub completed_at: Option<String>, // local time, bucketed by local date; created_at is UTC
}

impl Task {
    pub fn new(username: String, description: String, duration: i64) -> Self {
        Self {
            id: None,
            username,
            description,
            duration,
            completed: false,
            due_date: crate::utils::get_current_date_string(),
            created_at: now_timestamp(),
            completed_at: None,
        }
    }
}

/// Self-assessed scores attached to a diary entry, each on a 0..=10 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub task_completion: i64,
    pub focus_level: i64,
    pub time_management: i64,
    pub energy_level: i64,
}

impl Default for Scores {
    fn default() -> Self {
        Self {
            task_completion: 6,
            focus_level: 6,
            time_management: 8,
            energy_level: 7,
        }
    }
}

impl Scores {
    pub const MIN: i64 = 0;
    pub const MAX: i64 = 10;
    pub const LABELS: [&'static str; 4] = [
        "Task completion",
        "Focus level",
        "Time management",
        "Energy level",
    ];

    pub fn get(&self, index: usize) -> i64 {
        match index {
            0 => self.task_completion,
            1 => self.focus_level,
            2 => self.time_management,
            _ => self.energy_level,
        }
    }

    pub fn set(&mut self, index: usize, value: i64) {
        let value = value.clamp(Self::MIN, Self::MAX);
        match index {
            0 => self.task_completion = value,
            1 => self.focus_level = value,
            2 => self.time_management = value,
            _ => self.energy_level = value,
        }
    }

    /// Returns the label of the first out-of-range score, if any
    pub fn first_out_of_range(&self) -> Option<&'static str> {
        (0..Self::LABELS.len())
            .find(|&i| !(Self::MIN..=Self::MAX).contains(&self.get(i)))
            .map(|i| Self::LABELS[i])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHabit {
    pub id: Option<i64>,
    pub diary_entry_id: Option<i64>,
    pub habit_name: String,
    pub completed: bool,
}

impl DailyHabit {
    pub fn new(habit_name: &str) -> Self {
        Self {
            id: None,
            diary_entry_id: None,
            habit_name: habit_name.to_string(),
            completed: false,
        }
    }
}

pub const DEFAULT_HABITS: [&str; 4] = ["Exercise", "Meditation", "No Social Media", "8h work"];

pub fn default_habits() -> Vec<DailyHabit> {
    DEFAULT_HABITS.iter().map(|name| DailyHabit::new(name)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Option<i64>,
    pub username: String,
    pub date: String, // YYYY-MM-DD
    pub day_number: i64,
    pub younger_self: String,
    pub lesson: String,
    pub scores: Scores,
    pub habits: Vec<DailyHabit>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroSession {
    pub id: Option<i64>,
    pub username: String,
    pub task_description: Option<String>,
    pub duration: i64,        // seconds
    pub completed_at: String, // local time, bucketed by local date
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub username: String,
    pub date: String,
    pub wake_time: String,  // HH:MM
    pub sleep_time: String, // HH:MM
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyProductivity {
    pub username: String,
    pub date: String,
    pub productivity: f64, // percent, 0..=100
    pub worked_minutes: i64,
    pub available_hours: f64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: Option<i64>,
    pub username: String,
    pub content: String,
    pub created_at: String,
}

impl CommunityPost {
    pub fn new(username: String, content: String) -> Self {
        Self {
            id: None,
            username,
            content,
            created_at: now_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    pub token_hash: String,
    pub username: String,
    pub expires_at: String,
    pub used: bool,
}
