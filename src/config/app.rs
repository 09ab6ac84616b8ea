//! Main application configuration
//!
//! This module defines the primary configuration structures for the rating
//! engine, including file and environment variable loading and validation.

use crate::config::rating::RatingConfig;
use crate::error::RatingError;
use crate::types::MatchClassification;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub engine: EngineSettings,
    pub rating: RatingConfig,
    pub storage: StorageSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Name used in logs and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Rating engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// K factor applied to every match
    pub k_factor: f64,
    /// Optional K factor for domestic league matches
    pub domestic_k_factor: Option<f64>,
    /// Optional K factor for international matches
    pub international_k_factor: Option<f64>,
    /// Snapshots per atomic commit
    pub batch_size: usize,
    /// Total attempts per batch commit (2 = one retry)
    pub max_commit_attempts: u32,
    /// Delay between commit attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Days re-processed before the gap date on resume
    pub resume_overlap_days: i64,
}

/// File locations used by the batch job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Match log CSV
    pub matches_path: PathBuf,
    /// Snapshot table (JSON)
    pub snapshots_path: PathBuf,
    /// Team tables TOML; built-in tables when absent
    pub tables_path: Option<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "cricket-ratings".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            domestic_k_factor: None,
            international_k_factor: None,
            batch_size: 1000,
            max_commit_attempts: 2,
            retry_delay_ms: 250,
            resume_overlap_days: 1,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            matches_path: PathBuf::from("data/matches.csv"),
            snapshots_path: PathBuf::from("data/snapshots.json"),
            tables_path: None,
        }
    }
}

impl EngineSettings {
    /// K factor for a given classification, falling back to the shared value
    pub fn k_factor_for(&self, classification: MatchClassification) -> f64 {
        let specific = match classification {
            MatchClassification::Domestic => self.domestic_k_factor,
            MatchClassification::International => self.international_k_factor,
        };
        specific.unwrap_or(self.k_factor)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        // Engine settings
        if let Ok(k) = env::var("K_FACTOR") {
            config.engine.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid K_FACTOR value: {}", k))?;
        }
        if let Ok(k) = env::var("DOMESTIC_K_FACTOR") {
            config.engine.domestic_k_factor = Some(
                k.parse()
                    .map_err(|_| anyhow!("Invalid DOMESTIC_K_FACTOR value: {}", k))?,
            );
        }
        if let Ok(k) = env::var("INTERNATIONAL_K_FACTOR") {
            config.engine.international_k_factor = Some(
                k.parse()
                    .map_err(|_| anyhow!("Invalid INTERNATIONAL_K_FACTOR value: {}", k))?,
            );
        }
        if let Ok(size) = env::var("BATCH_SIZE") {
            config.engine.batch_size = size
                .parse()
                .map_err(|_| anyhow!("Invalid BATCH_SIZE value: {}", size))?;
        }
        if let Ok(attempts) = env::var("MAX_COMMIT_ATTEMPTS") {
            config.engine.max_commit_attempts = attempts
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_COMMIT_ATTEMPTS value: {}", attempts))?;
        }
        if let Ok(delay) = env::var("RETRY_DELAY_MS") {
            config.engine.retry_delay_ms = delay
                .parse()
                .map_err(|_| anyhow!("Invalid RETRY_DELAY_MS value: {}", delay))?;
        }
        if let Ok(days) = env::var("RESUME_OVERLAP_DAYS") {
            config.engine.resume_overlap_days = days
                .parse()
                .map_err(|_| anyhow!("Invalid RESUME_OVERLAP_DAYS value: {}", days))?;
        }

        // Storage settings
        if let Ok(path) = env::var("MATCHES_PATH") {
            config.storage.matches_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("SNAPSHOTS_PATH") {
            config.storage.snapshots_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("TEAM_TABLES_PATH") {
            config.storage.tables_path = Some(PathBuf::from(path));
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get commit retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.engine.retry_delay_ms)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => {
            return Err(RatingError::configuration(format!(
                "Invalid log level: {}",
                config.service.log_level
            ))
            .into())
        }
    }

    // Validate K factors
    let k_factors = [
        Some(config.engine.k_factor),
        config.engine.domestic_k_factor,
        config.engine.international_k_factor,
    ];
    for k in k_factors.into_iter().flatten() {
        if !k.is_finite() || k <= 0.0 {
            return Err(RatingError::configuration(format!(
                "K factor must be a positive number, got {}",
                k
            ))
            .into());
        }
    }

    // Validate batching
    if config.engine.batch_size == 0 {
        return Err(RatingError::configuration("Batch size must be greater than 0").into());
    }
    if config.engine.max_commit_attempts == 0 {
        return Err(
            RatingError::configuration("Max commit attempts must be greater than 0").into(),
        );
    }
    if config.engine.resume_overlap_days < 0 {
        return Err(
            RatingError::configuration("Resume overlap days cannot be negative").into(),
        );
    }

    // Validate storage
    if config.storage.snapshots_path.as_os_str().is_empty() {
        return Err(RatingError::configuration("Snapshots path cannot be empty").into());
    }

    config.rating.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.engine.k_factor, 32.0);
        assert_eq!(config.engine.batch_size, 1000);
        assert_eq!(config.engine.max_commit_attempts, 2);
    }

    #[test]
    fn test_k_factor_overrides() {
        let mut settings = EngineSettings::default();
        assert_eq!(settings.k_factor_for(MatchClassification::Domestic), 32.0);

        settings.international_k_factor = Some(40.0);
        assert_eq!(
            settings.k_factor_for(MatchClassification::International),
            40.0
        );
        assert_eq!(settings.k_factor_for(MatchClassification::Domestic), 32.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.engine.batch_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.engine.k_factor = -1.0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.engine.resume_overlap_days = -2;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::Configuration { .. })
        ));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [engine]
            k_factor = 20.0
            batch_size = 50

            [rating]
            base_rating = 1100
            "#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.engine.k_factor, 20.0);
        assert_eq!(config.engine.batch_size, 50);
        assert_eq!(config.engine.max_commit_attempts, 2);
        assert_eq!(config.rating.base_rating, 1100);
        assert_eq!(config.rating.league_rating, 1500);
        assert_eq!(config.service.log_level, "info");
    }
}
