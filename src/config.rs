//! Engine configuration.
//!
//! Defaults match the demo booking flow. Overrides come from a
//! JSON file or from `SLOTGUARD_*` environment variables (best-effort:
//! unparsable or non-positive values are ignored).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SlotguardError;

/// Verification gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Maximum challenges per phone before `RateLimited`
    pub max_sends: u32,

    /// Cooldown returned with each challenge
    pub cooldown_secs: u64,

    /// Send-count reset window. `None` keeps counts for the process lifetime.
    pub send_window_secs: Option<u64>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_sends: 5,
            cooldown_secs: 30,
            send_window_secs: None,
        }
    }
}

impl GateConfig {
    #[must_use]
    pub fn cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cooldown_secs)
    }

    #[must_use]
    pub fn send_window(&self) -> Option<chrono::Duration> {
        self.send_window_secs.map(secs_to_duration)
    }
}

/// Hold manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    pub ttl_secs: u64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self { ttl_secs: 5 * 60 }
    }
}

impl HoldConfig {
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        secs_to_duration(self.ttl_secs)
    }
}

/// Booking ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum alternatives returned with a conflict
    pub max_alternatives: usize,

    /// Days after the requested date scanned for alternatives
    pub lookahead_days: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_alternatives: 3,
            lookahead_days: 6,
        }
    }
}

/// Day-state aggregation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Days with at most this many bookable slots report `FewLeft`
    pub few_left_threshold: usize,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            few_left_threshold: 2,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gate: GateConfig,
    pub holds: HoldConfig,
    pub ledger: LedgerConfig,
    pub availability: AvailabilityConfig,
}

impl EngineConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - SLOTGUARD_MAX_SENDS
    /// - SLOTGUARD_COOLDOWN_SECS
    /// - SLOTGUARD_SEND_WINDOW_SECS
    /// - SLOTGUARD_HOLD_TTL_SECS
    /// - SLOTGUARD_MAX_ALTERNATIVES
    /// - SLOTGUARD_LOOKAHEAD_DAYS
    /// - SLOTGUARD_FEW_LEFT_THRESHOLD
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let mut cfg = Self::default();

        if let Some(x) = env_positive::<u32>("SLOTGUARD_MAX_SENDS") {
            cfg.gate.max_sends = x;
        }
        if let Some(x) = env_positive::<u64>("SLOTGUARD_COOLDOWN_SECS") {
            cfg.gate.cooldown_secs = x;
        }
        if let Some(x) = env_positive::<u64>("SLOTGUARD_SEND_WINDOW_SECS") {
            cfg.gate.send_window_secs = Some(x);
        }
        if let Some(x) = env_positive::<u64>("SLOTGUARD_HOLD_TTL_SECS") {
            cfg.holds.ttl_secs = x;
        }
        if let Some(x) = env_positive::<usize>("SLOTGUARD_MAX_ALTERNATIVES") {
            cfg.ledger.max_alternatives = x;
        }
        if let Some(x) = env_positive::<u32>("SLOTGUARD_LOOKAHEAD_DAYS") {
            cfg.ledger.lookahead_days = x;
        }
        if let Some(x) = env_positive::<usize>("SLOTGUARD_FEW_LEFT_THRESHOLD") {
            cfg.availability.few_left_threshold = x;
        }

        cfg
    }

    /// Load a JSON config file. Missing sections take their defaults.
    ///
    /// # Errors
    /// Returns `SlotguardError::Config` if the file cannot be read or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SlotguardError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SlotguardError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| SlotguardError::Config(format!("{}: {e}", path.display())))
    }
}

/// Longest representable window; larger settings are clamped.
const MAX_WINDOW_SECS: i64 = 366 * 24 * 60 * 60;

fn secs_to_duration(secs: u64) -> chrono::Duration {
    let secs = i64::try_from(secs).unwrap_or(MAX_WINDOW_SECS).min(MAX_WINDOW_SECS);
    chrono::Duration::seconds(secs)
}

fn env_positive<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|x| *x > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.gate.max_sends, 5);
        assert_eq!(cfg.gate.cooldown(), std::time::Duration::from_secs(30));
        assert!(cfg.gate.send_window().is_none());
        assert_eq!(cfg.holds.ttl(), chrono::Duration::minutes(5));
        assert_eq!(cfg.ledger.max_alternatives, 3);
        assert_eq!(cfg.ledger.lookahead_days, 6);
        assert_eq!(cfg.availability.few_left_threshold, 2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("Should create temp file");
        write!(file, r#"{{"gate": {{"max_sends": 3}}, "holds": {{"ttl_secs": 60}}}}"#)
            .expect("Should write");

        let cfg = EngineConfig::from_json_file(file.path()).expect("Should load");
        assert_eq!(cfg.gate.max_sends, 3);
        assert_eq!(cfg.gate.cooldown_secs, 30);
        assert_eq!(cfg.holds.ttl_secs, 60);
        assert_eq!(cfg.ledger, LedgerConfig::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().expect("Should create temp file");
        write!(file, "not json").expect("Should write");

        let err = EngineConfig::from_json_file(file.path()).expect_err("Should fail");
        assert!(matches!(err, SlotguardError::Config(_)));
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("SLOTGUARD_LOOKAHEAD_DAYS", "9");
        std::env::set_var("SLOTGUARD_FEW_LEFT_THRESHOLD", "-1");
        let cfg = EngineConfig::from_env_or_default();
        std::env::remove_var("SLOTGUARD_LOOKAHEAD_DAYS");
        std::env::remove_var("SLOTGUARD_FEW_LEFT_THRESHOLD");

        assert_eq!(cfg.ledger.lookahead_days, 9);
        assert_eq!(cfg.availability.few_left_threshold, 2);
    }
}
