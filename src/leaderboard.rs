use chrono::{Duration, NaiveDate};

use crate::database::{Database, DatabaseError};
use crate::stats::login_streak;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardPeriod {
    Weekly,
    Monthly,
    AllTime,
}

impl LeaderboardPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            LeaderboardPeriod::Weekly => "This week",
            LeaderboardPeriod::Monthly => "This month",
            LeaderboardPeriod::AllTime => "All time",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            LeaderboardPeriod::Weekly => LeaderboardPeriod::Monthly,
            LeaderboardPeriod::Monthly => LeaderboardPeriod::AllTime,
            LeaderboardPeriod::AllTime => LeaderboardPeriod::Weekly,
        }
    }

    /// First date inside the period, counting `today` as its last day
    pub fn since(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            LeaderboardPeriod::Weekly => Some(today - Duration::days(6)),
            LeaderboardPeriod::Monthly => Some(today - Duration::days(29)),
            LeaderboardPeriod::AllTime => None,
        }
    }
}

impl std::str::FromStr for LeaderboardPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" => Ok(LeaderboardPeriod::Weekly),
            "monthly" | "month" => Ok(LeaderboardPeriod::Monthly),
            "all" | "all-time" | "alltime" => Ok(LeaderboardPeriod::AllTime),
            other => Err(format!("Unknown period '{}' (expected weekly, monthly or all)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub username: String,
    pub focus_minutes: f64,
    pub login_streak: u32,
    pub tasks_completed: i64,
}

/// Rank every registered user: focus minutes desc, then login streak desc, then username
pub fn ranking(db: &Database, period: LeaderboardPeriod, today: NaiveDate) -> Result<Vec<LeaderboardRow>, DatabaseError> {
    let since = period.since(today).map(|d| d.format("%Y-%m-%d").to_string());
    let focus = db.focus_seconds_by_user(since.as_deref())?;
    let tasks = db.completed_task_counts(since.as_deref())?;

    let mut rows = Vec::new();
    for username in db.get_all_usernames()? {
        let streak = login_streak(&db.get_login_dates(&username)?, today);
        rows.push(LeaderboardRow {
            rank: 0,
            focus_minutes: focus.get(&username).copied().unwrap_or(0) as f64 / 60.0,
            login_streak: streak,
            tasks_completed: tasks.get(&username).copied().unwrap_or(0),
            username,
        });
    }

    rows.sort_by(|a, b| {
        b.focus_minutes
            .total_cmp(&a.focus_minutes)
            .then_with(|| b.login_streak.cmp(&a.login_streak))
            .then_with(|| a.username.cmp(&b.username))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PomodoroSession, User};

    fn add_user(db: &Database, name: &str) {
        db.insert_user(&User::new(name.into(), format!("{name}@example.com"), "h".into())).unwrap();
    }

    fn add_session(db: &Database, name: &str, secs: i64, at: &str) {
        db.insert_pomodoro_session(&PomodoroSession {
            id: None,
            username: name.into(),
            task_description: None,
            duration: secs,
            completed_at: at.into(),
        })
        .unwrap();
    }

    #[test]
    fn ranks_by_focus_then_streak_then_name() {
        let db = Database::open_in_memory().unwrap();
        for name in ["cleo", "bob", "ana", "dan"] {
            add_user(&db, name);
        }
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

        add_session(&db, "cleo", 3000, "2024-05-09 10:00:00");
        add_session(&db, "bob", 1500, "2024-05-10 10:00:00");
        add_session(&db, "ana", 1500, "2024-05-10 11:00:00");
        add_session(&db, "dan", 1500, "2024-05-10 12:00:00");
        db.record_login("dan", "2024-05-10").unwrap();
        db.record_login("dan", "2024-05-09").unwrap();
        db.record_login("bob", "2024-05-10").unwrap();
        // outside the weekly window
        add_session(&db, "ana", 9000, "2024-04-01 10:00:00");

        let weekly = ranking(&db, LeaderboardPeriod::Weekly, today).unwrap();
        let order: Vec<&str> = weekly.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(order, ["cleo", "dan", "bob", "ana"]);
        assert_eq!(weekly[0].rank, 1);
        assert_eq!(weekly[0].focus_minutes, 50.0);
        assert_eq!(weekly[1].login_streak, 2);

        let all = ranking(&db, LeaderboardPeriod::AllTime, today).unwrap();
        assert_eq!(all[0].username, "ana");
        assert_eq!(all[0].focus_minutes, 175.0);
    }

    #[test]
    fn period_parses_from_cli_words() {
        assert_eq!("weekly".parse::<LeaderboardPeriod>().unwrap(), LeaderboardPeriod::Weekly);
        assert_eq!("ALL".parse::<LeaderboardPeriod>().unwrap(), LeaderboardPeriod::AllTime);
        assert!("yearly".parse::<LeaderboardPeriod>().is_err());
    }
}
