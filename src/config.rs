//! Designer configuration parsed from environment variables.
//!
//! Every knob has a compiled-in default; absent or unparsable values fall
//! back to it rather than failing start-up.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::consts::{DEFAULT_DRAG_THROTTLE, DEFAULT_HISTORY_LIMIT};

/// Environment variable overriding [`DesignerConfig::history_limit`].
pub const ENV_HISTORY_LIMIT: &str = "DESIGNER_HISTORY_LIMIT";

/// Environment variable overriding [`DesignerConfig::drag_throttle`], in milliseconds.
pub const ENV_DRAG_THROTTLE_MS: &str = "DESIGNER_DRAG_THROTTLE_MS";

/// Tunables for one designer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignerConfig {
    /// Maximum number of undoable commands kept in history. Never zero.
    pub history_limit: usize,
    /// Minimum interval between two processed pointer-move updates.
    pub drag_throttle: Duration,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self { history_limit: DEFAULT_HISTORY_LIMIT, drag_throttle: DEFAULT_DRAG_THROTTLE }
    }
}

impl DesignerConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `DESIGNER_HISTORY_LIMIT`: default 50, zero is treated as 1
    /// - `DESIGNER_DRAG_THROTTLE_MS`: default 50
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Used by `from_env` and tests.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let history_limit = parse_or(lookup(ENV_HISTORY_LIMIT).as_deref(), DEFAULT_HISTORY_LIMIT);
        #[allow(clippy::cast_possible_truncation)]
        let default_ms = DEFAULT_DRAG_THROTTLE.as_millis() as u64;
        let throttle_ms = parse_or(lookup(ENV_DRAG_THROTTLE_MS).as_deref(), default_ms);

        Self { history_limit: history_limit.max(1), drag_throttle: Duration::from_millis(throttle_ms) }
    }

    /// Override the history limit. Zero is clamped to 1.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Override the drag throttle interval.
    #[must_use]
    pub fn with_drag_throttle(mut self, interval: Duration) -> Self {
        self.drag_throttle = interval;
        self
    }
}

fn parse_or<T>(raw: Option<&str>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}
