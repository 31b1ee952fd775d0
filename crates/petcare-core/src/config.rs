//! Clinic configuration (TOML).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClinicConfig {
    /// SQLite database file. In-memory when unset.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub booking: BookingSettings,

    #[serde(default)]
    pub pagination: PaginationSettings,

    #[serde(default)]
    pub search: SearchSettings,
}

impl ClinicConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.booking.slot_minutes == 0 {
            return Err(ConfigError::Validation(
                "booking.slot_minutes must be greater than zero".into(),
            ));
        }
        if !(MIN_DEBOUNCE_MS..=MAX_DEBOUNCE_MS).contains(&self.search.debounce_ms) {
            return Err(ConfigError::Validation(format!(
                "search.debounce_ms must be within {}..={}, got {}",
                MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS, self.search.debounce_ms
            )));
        }
        if self.pagination.default_page_size == 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            return Err(ConfigError::Validation(format!(
                "pagination.default_page_size must be within 1..={}",
                self.pagination.max_page_size
            )));
        }
        Ok(())
    }
}

/// Booking rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingSettings {
    /// Length of one appointment slot; a doctor can hold one active booking per slot.
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,

    /// Reject bookings whose requested time is already in the past.
    #[serde(default)]
    pub reject_past_bookings: bool,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            slot_minutes: default_slot_minutes(),
            reject_past_bookings: false,
        }
    }
}

fn default_slot_minutes() -> u32 {
    30
}

/// List paging limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginationSettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

pub const MIN_DEBOUNCE_MS: u64 = 300;
pub const MAX_DEBOUNCE_MS: u64 = 500;

/// Search-as-you-type behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    400
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ClinicConfig::from_toml("").unwrap();
        assert_eq!(config, ClinicConfig::default());
        assert_eq!(config.booking.slot_minutes, 30);
        assert!(!config.booking.reject_past_bookings);
        assert_eq!(config.search.debounce(), Duration::from_millis(400));
    }

    #[test]
    fn test_partial_sections() {
        let config = ClinicConfig::from_toml(
            r#"
            database_path = "/var/lib/petcare/clinic.db"

            [booking]
            reject_past_bookings = true

            [pagination]
            max_page_size = 50
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/petcare/clinic.db"))
        );
        assert!(config.booking.reject_past_bookings);
        assert_eq!(config.booking.slot_minutes, 30);
        assert_eq!(config.pagination.max_page_size, 50);
        assert_eq!(config.pagination.default_page_size, 10);
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let err = ClinicConfig::from_toml("[search]\ndebounce_ms = 50\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = ClinicConfig::from_toml("[booking]\nslot_minutes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err =
            ClinicConfig::from_toml("[pagination]\ndefault_page_size = 20\nmax_page_size = 10\n")
                .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let mut config = ClinicConfig::default();
        config.booking.slot_minutes = 45;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.toml");
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(ClinicConfig::from_file(&path).unwrap(), config);
    }
}
