pub mod auth;
pub mod cli;
pub mod community;
pub mod config;
pub mod database;
pub mod diary;
pub mod leaderboard;
pub mod mail;
pub mod models;
pub mod pomodoro;
pub mod productivity;
pub mod session;
pub mod stats;
pub mod tasks;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use models::{DiaryEntry, PomodoroSession, Task, User};
pub use session::Session;
pub use utils::Profile;
