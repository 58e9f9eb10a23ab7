//! Runtime settings for the digest pipeline.
//!
//! Configuration comes from environment variables with CLI overrides
//! applied by the binary. Nothing is persisted.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default reporting window in hours.
pub const DEFAULT_HOURS: u32 = 24;

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// IMAP server hostname.
    pub host: String,
    /// Mailbox login user.
    pub user: String,
    /// Mailbox login password.
    pub password: String,
    /// The single monitored sender address.
    pub sender: String,
    /// Reporting window in hours.
    pub hours: u32,
    /// Directory for the history log and saved attachments.
    pub data_dir: PathBuf,
}

impl Settings {
    /// Loads settings from `MAILDIGEST_*` environment variables.
    ///
    /// `MAILDIGEST_HOST`, `MAILDIGEST_USER`, `MAILDIGEST_PASS` and
    /// `MAILDIGEST_SENDER` are required; `MAILDIGEST_HOURS` and
    /// `MAILDIGEST_DATA_DIR` are optional.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        let hours = env::var("MAILDIGEST_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_HOURS);

        let data_dir = env::var("MAILDIGEST_DATA_DIR").map_or_else(
            |_| default_data_dir(),
            PathBuf::from,
        );

        Ok(Self {
            host: require("MAILDIGEST_HOST")?,
            user: require("MAILDIGEST_USER")?,
            password: require("MAILDIGEST_PASS")?,
            sender: require("MAILDIGEST_SENDER")?,
            hours,
            data_dir,
        })
    }

    /// Path of the JSON history log.
    #[must_use]
    pub fn history_file(&self) -> PathBuf {
        self.data_dir.join("email_history.json")
    }

    /// Directory where attachments are persisted.
    #[must_use]
    pub fn attachments_dir(&self) -> PathBuf {
        self.data_dir.join("attachments")
    }
}

fn require(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("maildigest")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_data_dir() {
        let settings = Settings {
            host: "imap.example.com".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
            sender: "advisor@example.com".to_string(),
            hours: 24,
            data_dir: PathBuf::from("/tmp/digest"),
        };
        assert_eq!(
            settings.history_file(),
            PathBuf::from("/tmp/digest/email_history.json")
        );
        assert_eq!(
            settings.attachments_dir(),
            PathBuf::from("/tmp/digest/attachments")
        );
    }
}
