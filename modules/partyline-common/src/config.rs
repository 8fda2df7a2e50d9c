use std::env;

use tracing::info;

use crate::error::PartylineError;
use crate::limits::ACTIVITY_WINDOW_DAYS;

/// Minimum gap between aggregate rebuilds unless overridden.
pub const DEFAULT_AGGREGATE_COOLDOWN_SECS: i64 = 300;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Seconds that must pass between two aggregate rebuilds.
    pub aggregate_cooldown_secs: i64,
    /// Trailing window, in days, for top-contributor scoring.
    pub activity_window_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregate_cooldown_secs: DEFAULT_AGGREGATE_COOLDOWN_SECS,
            activity_window_days: ACTIVITY_WINDOW_DAYS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, PartylineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but with an injectable lookup, so tests never touch
    /// process-global state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PartylineError> {
        let defaults = Self::default();
        Ok(Self {
            aggregate_cooldown_secs: parse_non_negative(
                &lookup,
                "AGGREGATE_COOLDOWN_SECS",
                defaults.aggregate_cooldown_secs,
            )?,
            activity_window_days: parse_non_negative(
                &lookup,
                "ACTIVITY_WINDOW_DAYS",
                defaults.activity_window_days,
            )?,
        })
    }

    pub fn log(&self) {
        info!(
            aggregate_cooldown_secs = self.aggregate_cooldown_secs,
            activity_window_days = self.activity_window_days,
            "Config loaded"
        );
    }
}

fn parse_non_negative(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
) -> Result<i64, PartylineError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= 0 => Ok(v),
        _ => Err(PartylineError::Config(format!(
            "{key} must be a non-negative integer, got {raw:?}"
        ))),
    }
}
