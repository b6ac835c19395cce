// Book Tracker - Reading Progress Tracker
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Runtime configuration
//!
//! Settings come from built-in defaults, then the environment, then explicit
//! overrides (CLI flags).
//!
//! # Environment
//! - `DB_PATH`: SQLite database file (default: platform data directory)
//! - `QUERY_TIMEOUT_SECS`: per-operation deadline in whole seconds (default: 10)

use crate::error::{Result, TrackerError};
use crate::storage::Database;
use std::path::PathBuf;
use std::time::Duration;

pub const DB_PATH_VAR: &str = "DB_PATH";
pub const QUERY_TIMEOUT_VAR: &str = "QUERY_TIMEOUT_SECS";

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Book Tracker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Deadline applied to each store operation
    pub query_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: Database::get_default_path(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DB_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path.trim());
        }

        if let Some(raw) = lookup(QUERY_TIMEOUT_VAR) {
            config.query_timeout = parse_timeout(&raw)?;
        }

        Ok(config)
    }

    /// Override the database path
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Override the query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        TrackerError::ConfigurationError(format!(
            "{} must be a whole number of seconds, got '{}'",
            QUERY_TIMEOUT_VAR, raw
        ))
    })?;

    if secs == 0 {
        return Err(TrackerError::ConfigurationError(format!(
            "{} must be greater than zero",
            QUERY_TIMEOUT_VAR
        )));
    }

    Ok(Duration::from_secs(secs))
}
