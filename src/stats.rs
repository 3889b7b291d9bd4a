//! Aggregations behind the statistics views. Everything here is pure over rows
//! already fetched from the database.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::models::{DailyProductivity, PomodoroSession};
use crate::utils::{parse_date, timestamp_date};

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Weekly,
    Monthly,
}

impl Period {
    pub fn days(&self) -> i64 {
        match self {
            Period::Weekly => 7,
            Period::Monthly => 30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Period::Weekly => Period::Monthly,
            Period::Monthly => Period::Weekly,
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            other => Err(format!("Unknown period '{}' (expected weekly or monthly)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub label: &'static str,
    pub date: NaiveDate,
    pub minutes: f64,
}

/// Focus minutes per day for the Sunday-started week beginning at `week_start`
pub fn weekly_overview(sessions: &[PomodoroSession], week_start: NaiveDate) -> Vec<DayBucket> {
    let mut buckets: Vec<DayBucket> = WEEKDAY_LABELS
        .iter()
        .enumerate()
        .map(|(i, &label)| DayBucket {
            label,
            date: week_start + Duration::days(i as i64),
            minutes: 0.0,
        })
        .collect();

    for session in sessions {
        let Some(date) = timestamp_date(&session.completed_at) else {
            continue;
        };
        let offset = (date - week_start).num_days();
        if (0..7).contains(&offset) {
            buckets[offset as usize].minutes += session.duration as f64 / 60.0;
        }
    }
    buckets
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekTotals {
    pub total: f64,
    pub daily_average: f64,
}

impl WeekTotals {
    pub fn from_buckets(buckets: &[DayBucket]) -> Self {
        let total: f64 = buckets.iter().map(|b| b.minutes).sum();
        Self {
            total,
            daily_average: total / 7.0,
        }
    }
}

/// Category of a session: first word of its task, or "Other"
pub fn session_category(session: &PomodoroSession) -> String {
    session
        .task_description
        .as_deref()
        .and_then(|d| d.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or_else(|| "Other".to_string())
}

/// Focus minutes per category, largest first
pub fn focus_distribution(sessions: &[PomodoroSession]) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for session in sessions {
        *totals.entry(session_category(session)).or_default() += session.duration as f64 / 60.0;
    }
    let mut distribution: Vec<(String, f64)> = totals.into_iter().collect();
    distribution.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    distribution
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductivityPoint {
    pub date: NaiveDate,
    pub productivity: f64,
}

/// One point per day ending at `today`; days without a row read as 0
pub fn productivity_overview(rows: &[DailyProductivity], period: Period, today: NaiveDate) -> Vec<ProductivityPoint> {
    let by_date: BTreeMap<NaiveDate, f64> = rows
        .iter()
        .filter_map(|r| parse_date(&r.date).ok().map(|d| (d, r.productivity)))
        .collect();

    (0..period.days())
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            ProductivityPoint {
                date,
                productivity: by_date.get(&date).copied().unwrap_or(0.0),
            }
        })
        .collect()
}

/// Worked hours per weekday from stored daily productivity rows
pub fn weekly_work_hours(rows: &[DailyProductivity], week_start: NaiveDate) -> Vec<(&'static str, f64)> {
    let mut hours = [0.0f64; 7];
    for row in rows {
        let Ok(date) = parse_date(&row.date) else {
            continue;
        };
        let offset = (date - week_start).num_days();
        if (0..7).contains(&offset) {
            hours[offset as usize] = row.worked_minutes as f64 / 60.0;
        }
    }
    WEEKDAY_LABELS.iter().copied().zip(hours).collect()
}

/// Sessions finished on `date`
pub fn sessions_on<'a>(sessions: &'a [PomodoroSession], date: NaiveDate) -> Vec<&'a PomodoroSession> {
    sessions
        .iter()
        .filter(|s| timestamp_date(&s.completed_at) == Some(date))
        .collect()
}

/// Consecutive login days ending today, or ending yesterday when today has no login yet
pub fn login_streak(dates: &[String], today: NaiveDate) -> u32 {
    let days: std::collections::BTreeSet<NaiveDate> = dates.iter().filter_map(|d| parse_date(d).ok()).collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn session(task: Option<&str>, secs: i64, at: &str) -> PomodoroSession {
        PomodoroSession {
            id: None,
            username: "ana".into(),
            task_description: task.map(str::to_string),
            duration: secs,
            completed_at: at.into(),
        }
    }

    #[test]
    fn sessions_land_in_their_weekday() {
        // 2024-04-28 is a Sunday
        let sessions = vec![
            session(Some("Write"), 1500, "2024-04-28 09:00:00"),
            session(None, 600, "2024-04-28 10:00:00"),
            session(None, 3000, "2024-05-04 22:00:00"),
            session(None, 9999, "2024-05-05 08:00:00"),
        ];
        let week = weekly_overview(&sessions, d("2024-04-28"));

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].label, "Sun");
        assert_eq!(week[0].minutes, 35.0);
        assert_eq!(week[6].minutes, 50.0);
        assert_eq!(week[1..6].iter().map(|b| b.minutes).sum::<f64>(), 0.0);

        let totals = WeekTotals::from_buckets(&week);
        assert_eq!(totals.total, 85.0);
        assert!((totals.daily_average - 85.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn categories_use_first_word() {
        let sessions = vec![
            session(Some("Study rust traits"), 1200, "2024-04-28 09:00:00"),
            session(Some("Study maths"), 1200, "2024-04-28 09:00:00"),
            session(Some("  "), 600, "2024-04-28 09:00:00"),
            session(None, 600, "2024-04-28 09:00:00"),
        ];
        assert_eq!(
            focus_distribution(&sessions),
            vec![("Study".to_string(), 40.0), ("Other".to_string(), 20.0)]
        );
    }

    #[rstest]
    #[case(Period::Weekly, 7)]
    #[case(Period::Monthly, 30)]
    fn missing_days_are_zero(#[case] period: Period, #[case] len: usize) {
        let rows = vec![DailyProductivity {
            username: "ana".into(),
            date: "2024-05-01".into(),
            productivity: 42.0,
            worked_minutes: 60,
            available_hours: 16.5,
            updated_at: String::new(),
        }];
        let points = productivity_overview(&rows, period, d("2024-05-03"));

        assert_eq!(points.len(), len);
        assert_eq!(points.last().unwrap().date, d("2024-05-03"));
        assert_eq!(points[len - 3].productivity, 42.0);
        assert_eq!(points.iter().filter(|p| p.productivity == 0.0).count(), len - 1);

        let hours = weekly_work_hours(&rows, d("2024-04-28"));
        assert_eq!(hours[3], ("Wed", 1.0));
    }

    #[rstest]
    #[case(&["2024-05-03", "2024-05-02", "2024-05-01"], 3)]
    #[case(&["2024-05-02", "2024-05-01"], 2)]
    #[case(&["2024-05-03", "2024-05-01"], 1)]
    #[case(&["2024-04-30"], 0)]
    #[case(&[], 0)]
    fn streak_counts_back_from_today(#[case] dates: &[&str], #[case] expected: u32) {
        let dates: Vec<String> = dates.iter().map(|s| s.to_string()).collect();
        assert_eq!(login_streak(&dates, d("2024-05-03")), expected);
    }
}
