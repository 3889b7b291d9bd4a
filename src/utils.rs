use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "habitup-dev",
            Profile::Prod => "habitup",
        }
    }
}

/// Get the configuration directory path for HabitUp
/// If profile is Dev, uses "habitup-dev" instead of "habitup"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "habitup", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path (database, session, log file)
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "habitup", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Parse a wall-clock time (HH:MM)
pub fn parse_clock_time(time_str: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(time_str.trim(), "%H:%M")
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Get the current local date as an ISO 8601 string (YYYY-MM-DD)
pub fn get_current_date_string() -> String {
    today().format("%Y-%m-%d").to_string()
}

/// Local wall-clock timestamp, used for rows that are bucketed by day
pub fn now_local_timestamp() -> String {
    chrono::Local::now()
        .format(crate::models::TIMESTAMP_FORMAT)
        .to_string()
}

/// Date part of a `YYYY-MM-DD HH:MM:SS` timestamp
pub fn timestamp_date(timestamp: &str) -> Option<NaiveDate> {
    timestamp.get(..10).and_then(|d| parse_date(d).ok())
}

/// Sunday on or before `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Task durations: "45m", "2h", "1h 30m"
pub fn format_duration(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining > 0 {
        format!("{}h {}m", hours, remaining)
    } else {
        format!("{}h", hours)
    }
}

/// Chart totals: fractional minutes rendered as "1h 5m" or "45m"
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.round() as i64;
    let (hours, mins) = (total / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

/// Countdown display, MM:SS
pub fn format_timer(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Parsed key binding information
#[derive(Debug, Clone)]
pub struct ParsedKeyBinding {
    pub key_code: crossterm::event::KeyCode,
    pub requires_ctrl: bool,
}

/// Check if a key event has the primary modifier (Ctrl on Windows/Linux, Option/Alt on macOS)
pub fn has_primary_modifier(modifiers: crossterm::event::KeyModifiers) -> bool {
    #[cfg(target_os = "macos")]
    {
        modifiers.contains(crossterm::event::KeyModifiers::CONTROL)
            || modifiers.contains(crossterm::event::KeyModifiers::ALT)
    }

    #[cfg(not(target_os = "macos"))]
    {
        modifiers.contains(crossterm::event::KeyModifiers::CONTROL)
    }
}

/// Format a key binding string for display, showing the platform-appropriate modifier
pub fn format_key_binding_for_display(key_binding: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        key_binding.replace("Ctrl+", "Opt+")
    }

    #[cfg(not(target_os = "macos"))]
    {
        key_binding.to_string()
    }
}

/// Parse a key binding string from config into a ParsedKeyBinding
/// Supports single keys ("q", "n"), special keys ("Enter", "Left") and "Ctrl+" combos
pub fn parse_key_binding(key_str: &str) -> Result<ParsedKeyBinding, String> {
    let key_str = key_str.trim();

    if let Some(key_part) = key_str.strip_prefix("Ctrl+") {
        return Ok(ParsedKeyBinding {
            key_code: parse_key_code(key_part)?,
            requires_ctrl: true,
        });
    }

    Ok(ParsedKeyBinding {
        key_code: parse_key_code(key_str)?,
        requires_ctrl: false,
    })
}

fn parse_key_code(key_str: &str) -> Result<crossterm::event::KeyCode, String> {
    use crossterm::event::KeyCode;

    match key_str {
        "Enter" => Ok(KeyCode::Enter),
        "Esc" | "Escape" => Ok(KeyCode::Esc),
        "Backspace" => Ok(KeyCode::Backspace),
        "Tab" => Ok(KeyCode::Tab),
        "Space" | " " => Ok(KeyCode::Char(' ')),
        "Left" => Ok(KeyCode::Left),
        "Right" => Ok(KeyCode::Right),
        "Up" => Ok(KeyCode::Up),
        "Down" => Ok(KeyCode::Down),
        "Delete" => Ok(KeyCode::Delete),
        _ => {
            if let Some(n) = key_str.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Ok(KeyCode::F(n));
                }
            }
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(KeyCode::Char(c)),
                _ => Err(format!("Unknown key binding: {}", key_str)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0m")]
    #[case(45, "45m")]
    #[case(60, "1h")]
    #[case(90, "1h 30m")]
    #[case(125, "2h 5m")]
    fn formats_task_durations(#[case] minutes: i64, #[case] expected: &str) {
        assert_eq!(format_duration(minutes), expected);
    }

    #[rstest]
    #[case(0.0, "0m")]
    #[case(44.6, "45m")]
    #[case(65.0, "1h 5m")]
    #[case(150.0, "2h 30m")]
    #[case(59.6, "1h 0m")]
    #[case(119.7, "2h 0m")]
    fn formats_chart_minutes(#[case] minutes: f64, #[case] expected: &str) {
        assert_eq!(format_minutes(minutes), expected);
    }

    #[test]
    fn timer_pads_minutes_and_seconds() {
        assert_eq!(format_timer(25 * 60), "25:00");
        assert_eq!(format_timer(61), "01:01");
        assert_eq!(format_timer(0), "00:00");
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2024-05-15 is a Wednesday
        let wednesday = parse_date("2024-05-15").unwrap();
        assert_eq!(week_start(wednesday), parse_date("2024-05-12").unwrap());
        let sunday = parse_date("2024-05-12").unwrap();
        assert_eq!(week_start(sunday), sunday);
    }

    #[test]
    fn timestamp_date_takes_the_day_prefix() {
        assert_eq!(
            timestamp_date("2024-05-15 23:59:10"),
            Some(parse_date("2024-05-15").unwrap())
        );
        assert_eq!(timestamp_date("garbage"), None);
    }

    #[test]
    fn parses_clock_times() {
        assert_eq!(
            parse_clock_time("06:30").unwrap(),
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
        assert!(parse_clock_time("6h30").is_err());
    }

    #[test]
    fn parses_key_bindings() {
        let binding = parse_key_binding("Ctrl+s").unwrap();
        assert!(binding.requires_ctrl);
        assert_eq!(binding.key_code, KeyCode::Char('s'));

        assert_eq!(parse_key_binding("F1").unwrap().key_code, KeyCode::F(1));
        assert_eq!(parse_key_binding("Space").unwrap().key_code, KeyCode::Char(' '));
        assert!(parse_key_binding("Hyper").is_err());
    }
}
