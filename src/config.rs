use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default)]
    pub pomodoro: PomodoroSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_tab_left")]
    pub tab_left: String,
    #[serde(default = "default_tab_right")]
    pub tab_right: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_toggle")]
    pub toggle: String,
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_reset")]
    pub reset: String,
    #[serde(default = "default_save")]
    pub save: String,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_help")]
    pub help: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroSettings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u64,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u64,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u64,
    /// A long break replaces every Nth short break
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default = "default_true")]
    pub bell_on_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_wake_time")]
    pub default_wake_time: String,
    #[serde(default = "default_sleep_time")]
    pub default_sleep_time: String,
    /// Wall-clock time after which the daily productivity snapshot is recorded
    #[serde(default = "default_snapshot_cutoff")]
    pub snapshot_cutoff: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default = "default_mail_api_url")]
    pub api_url: String,
    #[serde(default = "default_mail_sender")]
    pub sender: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_mail_api_key_env")]
    pub api_key_env: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut themes = HashMap::new();

        // Example custom theme for users to copy from
        themes.insert("ocean".to_string(), Theme {
            fg: "cyan".to_string(),
            bg: "black".to_string(),
            highlight_bg: "blue".to_string(),
            accent: "lightcyan".to_string(),
            tab_bg: "darkgray".to_string(),
        });

        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes,
            pomodoro: PomodoroSettings::default(),
            schedule: ScheduleSettings::default(),
            mail: MailSettings::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            tab_left: default_tab_left(),
            tab_right: default_tab_right(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            new: default_new(),
            edit: default_edit(),
            delete: default_delete(),
            toggle: default_toggle(),
            start: default_start(),
            reset: default_reset(),
            save: default_save(),
            period: default_period(),
            help: default_help(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            accent: default_accent(),
            tab_bg: default_tab_bg(),
        }
    }
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            long_break_interval: default_long_break_interval(),
            bell_on_complete: true,
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            default_wake_time: default_wake_time(),
            default_sleep_time: default_sleep_time(),
            snapshot_cutoff: default_snapshot_cutoff(),
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            api_url: default_mail_api_url(),
            sender: default_mail_sender(),
            api_key_env: default_mail_api_key_env(),
        }
    }
}

impl Theme {
    /// Get preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();

        themes.insert("default".to_string(), Theme::default());

        themes.insert("light".to_string(), Theme {
            fg: "black".to_string(),
            bg: "white".to_string(),
            highlight_bg: "blue".to_string(),
            accent: "magenta".to_string(),
            tab_bg: "gray".to_string(),
        });

        themes.insert("forest".to_string(), Theme {
            fg: "green".to_string(),
            bg: "black".to_string(),
            highlight_bg: "yellow".to_string(),
            accent: "lightgreen".to_string(),
            tab_bg: "darkgray".to_string(),
        });

        themes.insert("monochrome".to_string(), Theme {
            fg: "white".to_string(),
            bg: "black".to_string(),
            highlight_bg: "white".to_string(),
            accent: "gray".to_string(),
            tab_bg: "darkgray".to_string(),
        });

        themes
    }
}

// Default value functions
fn default_database_path() -> String {
    // Fallback only; the profile-specific path is set at load time
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("habitup.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/habitup/habitup.db".to_string()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_tab_left() -> String {
    "Left".to_string()
}

fn default_tab_right() -> String {
    "Right".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_toggle() -> String {
    "Space".to_string()
}

fn default_start() -> String {
    "s".to_string()
}

fn default_reset() -> String {
    "r".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_period() -> String {
    "p".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_accent() -> String {
    "magenta".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_work_minutes() -> u64 {
    25
}

fn default_short_break_minutes() -> u64 {
    5
}

fn default_long_break_minutes() -> u64 {
    15
}

fn default_long_break_interval() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_wake_time() -> String {
    "06:30".to_string()
}

fn default_sleep_time() -> String {
    "23:00".to_string()
}

fn default_snapshot_cutoff() -> String {
    "23:55".to_string()
}

fn default_mail_api_url() -> String {
    "https://api.sendgrid.com/v3/mail/send".to_string()
}

fn default_mail_sender() -> String {
    "no-reply@habitup.local".to_string()
}

fn default_mail_api_key_env() -> String {
    "SENDGRID_API_KEY".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid time '{value}' for {field}, expected HH:MM")]
    InvalidTime { field: &'static str, value: String },
    #[error("Invalid length {value} for {field}, expected 1 to {MAX_PHASE_MINUTES} minutes")]
    InvalidPhaseLength { field: &'static str, value: u64 },
}

/// Upper bound for any pomodoro phase, one day
pub const MAX_PHASE_MINUTES: u64 = 24 * 60;

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and database paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        let mut config = Self::load_from_path(&config_path)?;

        // Keep the database inside the profile's data dir even if the file was edited by hand
        config.database_path = Self::default_database_path_for_profile(profile);
        Ok(config)
    }

    /// Load from an explicit path, writing defaults there when the file is missing
    pub fn load_from_path(config_path: &Path) -> Result<Self, ConfigError> {
        let config = if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            toml::from_str::<Config>(&contents)?
        } else {
            let mut config = Config::default();
            if let Err(e) = config.save_to_path(config_path) {
                tracing::error!(path = %config_path.display(), error = %e, "failed to save default config");
                return Err(e);
            }
            config
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("habitup.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/habitup-dev/habitup.db".to_string(),
                utils::Profile::Prod => "~/.local/share/habitup/habitup.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Check clock times and pomodoro lengths up front so the rest of the app can rely on them
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lengths = [
            ("pomodoro.work_minutes", self.pomodoro.work_minutes),
            ("pomodoro.short_break_minutes", self.pomodoro.short_break_minutes),
            ("pomodoro.long_break_minutes", self.pomodoro.long_break_minutes),
        ];
        for (field, value) in lengths {
            if value == 0 || value > MAX_PHASE_MINUTES {
                return Err(ConfigError::InvalidPhaseLength { field, value });
            }
        }

        let fields = [
            ("schedule.default_wake_time", &self.schedule.default_wake_time),
            ("schedule.default_sleep_time", &self.schedule.default_sleep_time),
            ("schedule.snapshot_cutoff", &self.schedule.snapshot_cutoff),
        ];
        for (field, value) in fields {
            if utils::parse_clock_time(value).is_err() {
                return Err(ConfigError::InvalidTime { field, value: value.clone() });
            }
        }
        Ok(())
    }

    /// Get the currently active theme, falling back to presets and then the default
    pub fn get_active_theme(&self) -> Theme {
        self.themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from_path(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.pomodoro.work_minutes, 25);
        assert_eq!(config.schedule.default_wake_time, "06:30");
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pomodoro]\nwork_minutes = 50\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.pomodoro.work_minutes, 50);
        assert_eq!(config.pomodoro.short_break_minutes, 5);
        assert_eq!(config.key_bindings.quit, "q");
        assert_eq!(config.mail.api_key_env, "SENDGRID_API_KEY");
    }

    #[test]
    fn rejects_malformed_clock_times() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[schedule]\nsnapshot_cutoff = \"late\"\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTime { field: "schedule.snapshot_cutoff", .. }));
    }

    #[test]
    fn rejects_zero_work_minutes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pomodoro]\nwork_minutes = 0\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPhaseLength { field: "pomodoro.work_minutes", value: 0 }
        ));
    }

    #[test]
    fn rejects_phase_lengths_over_a_day() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pomodoro]\nlong_break_minutes = 4611686018427387903\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPhaseLength { field: "pomodoro.long_break_minutes", .. }
        ));
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        let config = Config {
            current_theme: "does-not-exist".to_string(),
            ..Config::default()
        };
        assert_eq!(config.get_active_theme().fg, "white");

        let config = Config {
            current_theme: "light".to_string(),
            ..Config::default()
        };
        assert_eq!(config.get_active_theme().bg, "white");
    }
}
