//! Configuration for the raikiri-player service
//!
//! Settings come from (highest priority first): command-line arguments,
//! environment variables, `player.toml`, compiled defaults. The TOML layer is
//! loaded here; CLI/env overrides are applied by `main` through
//! [`raikiri_common::config::resolve_value`].

use crate::error::{Error, Result};
use raikiri_common::LibraryMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name under the platform config dir
pub const CONFIG_FILE_NAME: &str = "player.toml";

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5750";

const MAX_SEEK_EPSILON_SECS: f64 = 1.0;
const MAX_DRIFT_INTERVAL_SECS: f64 = 86_400.0;
const MAX_DRIFT_NUDGE_SECS: f64 = 1.0;
/// Browsers clamp `playbackRate`; keep well inside that
const MAX_DRIFT_RATE_FACTOR: f64 = 4.0;

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Base URL of the media server
    pub server_url: String,

    /// Control API listen address
    pub bind_addr: String,

    /// Library the player browses and streams from
    pub library_mode: LibraryMode,

    /// How long an image stays on screen before auto-advance
    pub dwell_ms: u64,

    /// Re-arm the full dwell on resume instead of the remaining time
    pub resume_full_dwell: bool,

    /// Margin kept before the end when seeking relatively
    pub seek_epsilon_secs: f64,

    /// Broadcast capacity of the event bus
    pub event_capacity: usize,

    /// Publish now-playing state to the OS (needs the `media-controls` feature)
    pub media_controls: bool,

    pub drift: DriftConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            library_mode: LibraryMode::Files,
            dwell_ms: 5000,
            resume_full_dwell: false,
            seek_epsilon_secs: 0.01,
            event_capacity: 1000,
            media_controls: true,
            drift: DriftConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Load from an explicit file, the platform config location, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config: PlayerConfig =
            raikiri_common::config::load_or_default(explicit, CONFIG_FILE_NAME)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::Config("server_url must not be empty".to_string()));
        }
        if self.dwell_ms == 0 {
            return Err(Error::Config("dwell_ms must be positive".to_string()));
        }
        if !(0.0..=MAX_SEEK_EPSILON_SECS).contains(&self.seek_epsilon_secs) {
            return Err(Error::Config(format!(
                "seek_epsilon_secs must be between 0 and {}",
                MAX_SEEK_EPSILON_SECS
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".to_string()));
        }
        self.drift.validate()
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

/// What a drift tick does to a playing video element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStrategy {
    /// Seek forward by a tiny amount, forcing the element to resync
    #[default]
    SeekNudge,
    /// Briefly raise the playback rate, then revert
    RateBump,
    /// Never touch the element
    Disabled,
}

/// Drift correction settings (`[drift]` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub strategy: DriftStrategy,
    pub interval_secs: f64,
    pub nudge_secs: f64,
    pub rate_factor: f64,
    pub rate_bump_ms: u64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            strategy: DriftStrategy::SeekNudge,
            interval_secs: 120.0,
            nudge_secs: 0.001,
            rate_factor: 1.02,
            rate_bump_ms: 500,
        }
    }
}

impl DriftConfig {
    /// Every duration must be positive, finite and bounded; the timers are
    /// built from these values inside the controller task.
    pub fn validate(&self) -> Result<()> {
        if !in_range(self.interval_secs, MAX_DRIFT_INTERVAL_SECS) {
            return Err(Error::Config(format!(
                "drift.interval_secs must be positive and at most {}",
                MAX_DRIFT_INTERVAL_SECS
            )));
        }
        match self.strategy {
            DriftStrategy::SeekNudge if !in_range(self.nudge_secs, MAX_DRIFT_NUDGE_SECS) => {
                Err(Error::Config(format!(
                    "drift.nudge_secs must be positive and at most {}",
                    MAX_DRIFT_NUDGE_SECS
                )))
            }
            DriftStrategy::RateBump
                if !in_range(self.rate_factor, MAX_DRIFT_RATE_FACTOR) || self.rate_bump_ms == 0 =>
            {
                Err(Error::Config(format!(
                    "drift.rate_factor must be in (0, {}] and drift.rate_bump_ms positive",
                    MAX_DRIFT_RATE_FACTOR
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    pub fn rate_bump(&self) -> Duration {
        Duration::from_millis(self.rate_bump_ms)
    }
}

/// Finite, above zero, at most `max` (NaN fails every comparison)
fn in_range(value: f64, max: f64) -> bool {
    value > 0.0 && value <= max
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dwell(), Duration::from_secs(5));
        assert_eq!(config.drift.interval(), Duration::from_secs(120));
        assert_eq!(config.drift.strategy, DriftStrategy::SeekNudge);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server_url = \"http://nas.local:8080\"\nlibrary_mode = \"music\"\n\n[drift]\nstrategy = \"rate_bump\""
        )
        .unwrap();

        let config = PlayerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server_url, "http://nas.local:8080");
        assert_eq!(config.library_mode, LibraryMode::Music);
        assert_eq!(config.drift.strategy, DriftStrategy::RateBump);
        assert_eq!(config.drift.rate_bump_ms, 500);
        assert_eq!(config.dwell_ms, 5000);
    }

    #[test]
    fn test_rejects_non_positive_intervals() {
        let mut config = PlayerConfig::default();
        config.drift.interval_secs = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = PlayerConfig::default();
        config.dwell_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_disabled_strategy_ignores_nudge() {
        let mut config = PlayerConfig::default();
        config.drift.strategy = DriftStrategy::Disabled;
        config.drift.nudge_secs = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unbounded_drift_values() {
        for interval in [f64::INFINITY, f64::NAN, 1e12] {
            let mut config = PlayerConfig::default();
            config.drift.interval_secs = interval;
            assert!(matches!(config.validate(), Err(Error::Config(_))), "{}", interval);
        }

        let mut config = PlayerConfig::default();
        config.drift.nudge_secs = f64::INFINITY;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = PlayerConfig::default();
        config.drift.strategy = DriftStrategy::RateBump;
        config.drift.rate_factor = f64::INFINITY;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = PlayerConfig::default();
        config.seek_epsilon_secs = f64::INFINITY;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_infinite_interval_in_toml_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[drift]\ninterval_secs = inf").unwrap();

        assert!(matches!(
            PlayerConfig::load(Some(file.path())),
            Err(Error::Config(_))
        ));
    }
}
