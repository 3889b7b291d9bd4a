//! Daily productivity: completed task time measured against the waking day.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::config::ScheduleSettings;
use crate::database::{Database, DatabaseError};
use crate::models::{DailyProductivity, UserPreferences, now_timestamp};
use crate::utils::parse_clock_time;

#[derive(Debug, Error)]
pub enum ProductivityError {
    #[error("Wake and sleep times are equal, no hours are available")]
    NoAvailableHours,
    #[error("Invalid clock time: {0}")]
    InvalidTime(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// Hours between waking and going to sleep.
/// A sleep time earlier on the clock than the wake time is taken to be on the next day.
pub fn available_hours(wake: NaiveTime, sleep: NaiveTime) -> f64 {
    let mut seconds = (sleep - wake).num_seconds();
    if seconds < 0 {
        seconds += 24 * 60 * 60;
    }
    seconds as f64 / 3600.0
}

/// Completed minutes as a share of the available hours, clamped to [0, 100]
pub fn productivity_percentage(
    completed_minutes: i64,
    wake: NaiveTime,
    sleep: NaiveTime,
) -> Result<f64, ProductivityError> {
    let available = available_hours(wake, sleep);
    if available <= 0.0 {
        return Err(ProductivityError::NoAvailableHours);
    }
    let worked = completed_minutes as f64 / 60.0;
    Ok((worked / available * 100.0).clamp(0.0, 100.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub wake_time: NaiveTime,
    pub sleep_time: NaiveTime,
    pub worked_minutes: i64,
    pub available_hours: f64,
    pub productivity: f64,
}

/// Preferences in effect on `date`: that day's row, the latest earlier row, or the configured defaults
pub fn effective_preferences(
    db: &Database,
    username: &str,
    date: NaiveDate,
    schedule: &ScheduleSettings,
) -> Result<UserPreferences, ProductivityError> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let prefs = db
        .get_preferences_on_or_before(username, &date_str)?
        .unwrap_or_else(|| UserPreferences {
            username: username.to_string(),
            date: date_str.clone(),
            wake_time: schedule.default_wake_time.clone(),
            sleep_time: schedule.default_sleep_time.clone(),
        });
    Ok(prefs)
}

fn clock(value: &str) -> Result<NaiveTime, ProductivityError> {
    parse_clock_time(value).map_err(|_| ProductivityError::InvalidTime(value.to_string()))
}

/// Compute the snapshot for one user and day without writing anything
pub fn compute_for_day(
    db: &Database,
    username: &str,
    date: NaiveDate,
    schedule: &ScheduleSettings,
) -> Result<DailySnapshot, ProductivityError> {
    let prefs = effective_preferences(db, username, date, schedule)?;
    let wake_time = clock(&prefs.wake_time)?;
    let sleep_time = clock(&prefs.sleep_time)?;
    let worked_minutes =
        db.completed_task_minutes_on(username, &date.format("%Y-%m-%d").to_string())?;
    let productivity = productivity_percentage(worked_minutes, wake_time, sleep_time)?;

    Ok(DailySnapshot {
        date,
        wake_time,
        sleep_time,
        worked_minutes,
        available_hours: available_hours(wake_time, sleep_time),
        productivity,
    })
}

/// Compute and upsert the (username, date) productivity row
pub fn record_snapshot(
    db: &Database,
    username: &str,
    date: NaiveDate,
    schedule: &ScheduleSettings,
) -> Result<DailySnapshot, ProductivityError> {
    let snapshot = compute_for_day(db, username, date, schedule)?;
    db.upsert_daily_productivity(&DailyProductivity {
        username: username.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        productivity: snapshot.productivity,
        worked_minutes: snapshot.worked_minutes,
        available_hours: snapshot.available_hours,
        updated_at: now_timestamp(),
    })?;
    tracing::info!(
        username = %username,
        date = %date,
        productivity = snapshot.productivity,
        "daily productivity recorded"
    );
    Ok(snapshot)
}

/// Fires at most once per calendar day, on the first poll at or after the cutoff.
///
/// This is an in-memory guard, not a scheduler: a restarted process fires again
/// for the same day, which is harmless because the write is an upsert.
#[derive(Debug, Clone)]
pub struct SnapshotGuard {
    cutoff: NaiveTime,
    last_fired: Option<NaiveDate>,
}

impl SnapshotGuard {
    pub fn new(cutoff: NaiveTime) -> Self {
        Self { cutoff, last_fired: None }
    }

    pub fn from_schedule(schedule: &ScheduleSettings) -> Result<Self, ProductivityError> {
        Ok(Self::new(clock(&schedule.snapshot_cutoff)?))
    }

    /// Returns the day to snapshot if the guard fires at `now`
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<NaiveDate> {
        let today = now.date();
        if now.time() < self.cutoff || self.last_fired == Some(today) {
            return None;
        }
        self.last_fired = Some(today);
        Some(today)
    }

    pub fn last_fired(&self) -> Option<NaiveDate> {
        self.last_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use rstest::rstest;

    fn t(s: &str) -> NaiveTime {
        parse_clock_time(s).unwrap()
    }

    #[rstest]
    #[case("06:30", "23:00", 16.5)]
    #[case("22:00", "06:00", 8.0)]
    #[case("08:00", "08:30", 0.5)]
    #[case("23:30", "00:15", 0.75)]
    fn sleep_before_wake_rolls_to_next_day(#[case] wake: &str, #[case] sleep: &str, #[case] hours: f64) {
        assert!((available_hours(t(wake), t(sleep)) - hours).abs() < 1e-9);
    }

    #[test]
    fn equal_times_have_no_available_hours() {
        assert_eq!(available_hours(t("07:00"), t("07:00")), 0.0);
        assert!(matches!(
            productivity_percentage(120, t("07:00"), t("07:00")),
            Err(ProductivityError::NoAvailableHours)
        ));
    }

    #[rstest]
    #[case(0, 0.0)]
    #[case(495, 50.0)]
    #[case(990, 100.0)]
    #[case(5000, 100.0)]
    fn percentage_is_clamped(#[case] minutes: i64, #[case] expected: f64) {
        // 06:30 to 23:00 is 16.5 hours = 990 minutes
        let pct = productivity_percentage(minutes, t("06:30"), t("23:00")).unwrap();
        assert!((pct - expected).abs() < 1e-9, "{pct} != {expected}");
        assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn guard_fires_once_per_day_after_cutoff() {
        let mut guard = SnapshotGuard::new(t("23:55"));
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        assert_eq!(guard.poll(day.and_time(t("23:54"))), None);
        assert_eq!(guard.last_fired(), None);
        assert_eq!(guard.poll(day.and_time(t("23:55"))), Some(day));
        assert_eq!(guard.last_fired(), Some(day));
        assert_eq!(guard.poll(day.and_time(t("23:59"))), None);

        let next = day.succ_opt().unwrap();
        assert_eq!(guard.poll(next.and_time(t("12:00"))), None);
        assert_eq!(guard.poll(next.and_time(t("23:56"))), Some(next));
    }

    #[test]
    fn record_snapshot_upserts_by_date() {
        let db = Database::open_in_memory().unwrap();
        let schedule = ScheduleSettings::default();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let id = db.insert_task(&Task::new("ana".into(), "Deep work".into(), 99)).unwrap();
        db.set_task_completed(id, "ana", true, Some("2024-05-01 11:00:00")).unwrap();

        let first = record_snapshot(&db, "ana", day, &schedule).unwrap();
        assert!((first.productivity - 10.0).abs() < 1e-9);

        let id = db.insert_task(&Task::new("ana".into(), "More".into(), 99)).unwrap();
        db.set_task_completed(id, "ana", true, Some("2024-05-01 15:00:00")).unwrap();
        record_snapshot(&db, "ana", day, &schedule).unwrap();

        let rows = db.get_productivity_since("ana", "2024-05-01").unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].productivity - 20.0).abs() < 1e-9);
        assert_eq!(rows[0].worked_minutes, 198);
    }

    #[test]
    fn stored_preferences_override_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_preferences(&UserPreferences {
            username: "ana".into(),
            date: "2024-04-28".into(),
            wake_time: "22:00".into(),
            sleep_time: "06:00".into(),
        })
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let snapshot = compute_for_day(&db, "ana", day, &ScheduleSettings::default()).unwrap();
        assert_eq!(snapshot.available_hours, 8.0);
        assert_eq!(snapshot.productivity, 0.0);
    }
}
