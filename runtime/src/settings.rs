//! Controller settings loaded from the environment.
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `FETCH_UNKNOWN_STATUS` | `fail`, `ignore` | `fail` |
//! | `FETCH_STALE_RESPONSES` | `drop-stale`, `last-settled-wins` | `drop-stale` |
//! | `FETCH_NOTICE_DURATION` | `short`, `long` | `long` |
//! | `FETCH_BROADCAST_CAPACITY` | positive integer | `16` |

use crate::StoreConfig;
use composable_fetch_core::{FetchConfig, NoticeDuration, StaleResponsePolicy, UnknownStatusPolicy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors from loading settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// A variable is set to a value that cannot be parsed
    #[error("Invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// Parse failure
        reason: String,
    },
}

/// Process-wide defaults for controller policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Handling of statuses outside the classification table
    pub unknown_status: UnknownStatusPolicy,
    /// Reconciliation of overlapping requests
    pub stale_responses: StaleResponsePolicy,
    /// How long error notices stay visible
    pub notice_duration: NoticeDuration,
    /// Capacity of each controller's action broadcast channel
    pub broadcast_capacity: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            unknown_status: UnknownStatusPolicy::default(),
            stale_responses: StaleResponsePolicy::default(),
            notice_duration: NoticeDuration::default(),
            broadcast_capacity: 16,
        }
    }
}

impl ControllerSettings {
    /// Load settings from environment variables
    ///
    /// Missing variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] if a variable is set but invalid.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup
    ///
    /// ```
    /// use composable_fetch_runtime::ControllerSettings;
    /// use composable_fetch_core::UnknownStatusPolicy;
    ///
    /// let settings = ControllerSettings::from_lookup(|key| {
    ///     (key == "FETCH_UNKNOWN_STATUS").then(|| "ignore".to_string())
    /// })
    /// .unwrap();
    /// assert_eq!(settings.unknown_status, UnknownStatusPolicy::Ignore);
    /// assert_eq!(settings.broadcast_capacity, 16);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] if a value is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settings = Self {
            unknown_status: parse(&lookup, "FETCH_UNKNOWN_STATUS", defaults.unknown_status)?,
            stale_responses: parse(&lookup, "FETCH_STALE_RESPONSES", defaults.stale_responses)?,
            notice_duration: parse(&lookup, "FETCH_NOTICE_DURATION", defaults.notice_duration)?,
            broadcast_capacity: parse_capacity(&lookup, defaults.broadcast_capacity)?,
        };

        tracing::debug!(?settings, "Loaded controller settings");
        Ok(settings)
    }

    /// Apply these settings to a controller configuration
    ///
    /// Overrides the configuration's policy fields.
    #[must_use]
    pub fn configure<T>(&self, config: FetchConfig<T>) -> FetchConfig<T> {
        config
            .unknown_status(self.unknown_status)
            .stale_responses(self.stale_responses)
            .notice_duration(self.notice_duration)
    }

    /// Store configuration derived from these settings
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_broadcast_capacity(self.broadcast_capacity)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, SettingsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr<Err = String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|reason| SettingsError::InvalidValue {
            key,
            value,
            reason,
        }),
    }
}

fn parse_capacity<F>(lookup: &F, default: usize) -> Result<usize, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    const KEY: &str = "FETCH_BROADCAST_CAPACITY";

    let Some(value) = lookup(KEY) else {
        return Ok(default);
    };

    match value.trim().parse::<usize>() {
        Ok(0) => Err(SettingsError::InvalidValue {
            key: KEY,
            value,
            reason: "capacity must be greater than zero".to_string(),
        }),
        Ok(capacity) => Ok(capacity),
        Err(error) => Err(SettingsError::InvalidValue {
            key: KEY,
            value,
            reason: error.to_string(),
        }),
    }
}
