use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::now_timestamp;
use crate::utils;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not determine data directory")]
    DataDirError,
    #[error("Failed to read session file: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to parse session file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write session file: {0}")]
    WriteError(String),
    #[error("Not logged in. Run `habitup login <username>` first.")]
    NotLoggedIn,
}

/// The user the CLI and dashboard act on behalf of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub logged_in_at: String,
}

impl Session {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            logged_in_at: now_timestamp(),
        }
    }

    pub fn get_session_path(profile: utils::Profile) -> Result<PathBuf, SessionError> {
        utils::get_data_dir(profile)
            .map(|dir| dir.join("session.toml"))
            .ok_or(SessionError::DataDirError)
    }

    pub fn load_with_profile(profile: utils::Profile) -> Result<Option<Self>, SessionError> {
        Self::load_from_path(&Self::get_session_path(profile)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Option<Self>, SessionError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(SessionError::ReadError)?;
        Ok(Some(toml::from_str(&contents)?))
    }

    /// Like `load_with_profile`, but absence is an error
    pub fn require(profile: utils::Profile) -> Result<Self, SessionError> {
        Self::load_with_profile(profile)?.ok_or(SessionError::NotLoggedIn)
    }

    pub fn save_with_profile(&self, profile: utils::Profile) -> Result<(), SessionError> {
        self.save_to_path(&Self::get_session_path(profile)?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionError::WriteError(e.to_string()))?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| SessionError::WriteError(e.to_string()))?;
        fs::write(path, contents).map_err(|e| SessionError::WriteError(e.to_string()))
    }

    pub fn clear_with_profile(profile: utils::Profile) -> Result<bool, SessionError> {
        Self::clear_at_path(&Self::get_session_path(profile)?)
    }

    /// Returns whether a session file was removed
    pub fn clear_at_path(path: &Path) -> Result<bool, SessionError> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path).map_err(|e| SessionError::WriteError(e.to_string()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_load_clear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.toml");

        assert_eq!(Session::load_from_path(&path).unwrap(), None);

        let session = Session::new("ana");
        session.save_to_path(&path).unwrap();
        assert_eq!(Session::load_from_path(&path).unwrap(), Some(session));

        assert!(Session::clear_at_path(&path).unwrap());
        assert!(!Session::clear_at_path(&path).unwrap());
        assert_eq!(Session::load_from_path(&path).unwrap(), None);
    }

    #[test]
    fn garbage_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(&path, "username = ").unwrap();
        assert!(matches!(Session::load_from_path(&path), Err(SessionError::ParseError(_))));
    }
}
