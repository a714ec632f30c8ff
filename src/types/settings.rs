//! Game settings: immutable per session
//!
//! A change of settings always builds a fresh session; nothing here is
//! mutated while a session runs.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    DEFAULT_DAMAGE_PER_MS, DEFAULT_DEBOUNCE_SECS, DEFAULT_GRACE_DELAY_SECS,
    DEFAULT_HIT_DAMAGE, DEFAULT_MAX_HP, DEFAULT_SELF_HIT_DAMAGE,
};

/// Errors from parsing, validating, or loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{field}: '{value}' is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("{field}: value must be finite")]
    NonFinite { field: &'static str },
    #[error("{field}: {value} must not be negative")]
    Negative { field: &'static str, value: f64 },
    #[error("max_hp: {0} must be greater than zero")]
    NonPositiveMaxHp(f64),
    #[error("settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot of the six numeric settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// One-time damage to the opponent on a confirmed hit
    pub hit_damage: f64,
    /// One-time damage to yourself on a confirmed self-hit
    pub self_hit_damage: f64,
    /// Continuous damage rate (HP per millisecond)
    pub damage_per_ms: f64,
    /// Starting and maximum HP
    pub max_hp: f64,
    /// Debounce window (seconds)
    pub debounce_secs: f64,
    /// Hold time before continuous damage starts (seconds)
    pub grace_delay_secs: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hit_damage: DEFAULT_HIT_DAMAGE,
            self_hit_damage: DEFAULT_SELF_HIT_DAMAGE,
            damage_per_ms: DEFAULT_DAMAGE_PER_MS,
            max_hp: DEFAULT_MAX_HP,
            debounce_secs: DEFAULT_DEBOUNCE_SECS,
            grace_delay_secs: DEFAULT_GRACE_DELAY_SECS,
        }
    }
}

impl Settings {
    /// Check every field; the first violation wins
    pub fn validate(&self) -> Result<(), SettingsError> {
        let fields = [
            ("hit_damage", self.hit_damage),
            ("self_hit_damage", self.self_hit_damage),
            ("damage_per_ms", self.damage_per_ms),
            ("max_hp", self.max_hp),
            ("debounce_secs", self.debounce_secs),
            ("grace_delay_secs", self.grace_delay_secs),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(SettingsError::NonFinite { field });
            }
            if value < 0.0 {
                return Err(SettingsError::Negative { field, value });
            }
        }
        if self.max_hp <= 0.0 {
            return Err(SettingsError::NonPositiveMaxHp(self.max_hp));
        }
        Ok(())
    }

    /// Builder-style validation
    pub fn validated(self) -> Result<Self, SettingsError> {
        self.validate()?;
        Ok(self)
    }

    pub fn debounce_window(&self) -> Duration {
        secs_to_duration(self.debounce_secs)
    }

    pub fn grace_delay(&self) -> Duration {
        secs_to_duration(self.grace_delay_secs)
    }

    /// Load and validate settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validated()
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Form view of these settings
    pub fn to_input(&self) -> SettingsInput {
        SettingsInput {
            hit_damage: self.hit_damage.to_string(),
            self_hit_damage: self.self_hit_damage.to_string(),
            damage_per_ms: self.damage_per_ms.to_string(),
            max_hp: self.max_hp.to_string(),
            debounce_secs: self.debounce_secs.to_string(),
            grace_delay_secs: self.grace_delay_secs.to_string(),
        }
    }
}

/// Flat text record as submitted by a settings form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsInput {
    pub hit_damage: String,
    pub self_hit_damage: String,
    pub damage_per_ms: String,
    pub max_hp: String,
    pub debounce_secs: String,
    pub grace_delay_secs: String,
}

impl SettingsInput {
    /// Parse every field and validate the result
    pub fn parse(&self) -> Result<Settings, SettingsError> {
        Settings {
            hit_damage: parse_field("hit_damage", &self.hit_damage)?,
            self_hit_damage: parse_field("self_hit_damage", &self.self_hit_damage)?,
            damage_per_ms: parse_field("damage_per_ms", &self.damage_per_ms)?,
            max_hp: parse_field("max_hp", &self.max_hp)?,
            debounce_secs: parse_field("debounce_secs", &self.debounce_secs)?,
            grace_delay_secs: parse_field("grace_delay_secs", &self.grace_delay_secs)?,
        }
        .validated()
    }
}

/// Nearest whole nanosecond, so 0.03 s is exactly 30 ms
fn secs_to_duration(secs: f64) -> Duration {
    Duration::from_nanos((secs.max(0.0) * 1e9).round() as u64)
}

fn parse_field(field: &'static str, raw: &str) -> Result<f64, SettingsError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| SettingsError::NotANumber {
            field,
            value: raw.to_string(),
        })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_input_round_trips_defaults() {
        let settings = Settings::default();
        let parsed = settings.to_input().parse().unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_non_numeric_rejected_with_field_name() {
        let mut input = Settings::default().to_input();
        input.damage_per_ms = "fast".to_string();
        let err = input.parse().unwrap_err();
        assert!(matches!(err, SettingsError::NotANumber { field: "damage_per_ms", .. }));
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let mut input = Settings::default().to_input();
        input.max_hp = "  100 ".to_string();
        assert_eq!(input.parse().unwrap().max_hp, 100.0);
    }

    #[test]
    fn test_negative_damage_rejected() {
        let settings = Settings { hit_damage: -1.0, ..Settings::default() };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Negative { field: "hit_damage", .. })
        ));
    }

    #[test]
    fn test_zero_max_hp_rejected() {
        let settings = Settings { max_hp: 0.0, ..Settings::default() };
        assert!(matches!(settings.validate(), Err(SettingsError::NonPositiveMaxHp(_))));
    }

    #[test]
    fn test_nan_rejected() {
        let mut input = Settings::default().to_input();
        input.grace_delay_secs = "NaN".to_string();
        assert!(matches!(input.parse(), Err(SettingsError::NonFinite { .. })));
    }

    #[test]
    fn test_file_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings { max_hp: 120.0, damage_per_ms: 0.05, ..Settings::default() };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"max_hp": 0.0}"#).unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::NonPositiveMaxHp(_))));
        assert!(matches!(
            Settings::load(dir.path().join("missing.json")),
            Err(SettingsError::Io(_))
        ));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_missing_json_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"max_hp": 100.0}"#).unwrap();
        assert_eq!(settings.max_hp, 100.0);
        assert_eq!(settings.hit_damage, DEFAULT_HIT_DAMAGE);
    }

    #[test]
    fn test_durations() {
        let settings = Settings::default();
        assert_eq!(settings.debounce_window(), Duration::from_millis(300));
        assert_eq!(settings.grace_delay(), Duration::from_millis(30));
    }
}
