//! Configuration file support.
//!
//! Allows loading engine configurations from TOML files for reproducible
//! runs. String fields are parsed into their enums on conversion, so an
//! unknown weighting scheme or training method fails immediately instead of
//! being silently defaulted.

use crate::error::{EngineError, Result};
use crate::leverage::LeverageConfig;
use crate::solver::WeightingScheme;
use crate::walkforward::{TrackConfig, TrainingMethod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete engine configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineFileConfig {
    /// Portfolio weighting settings.
    #[serde(default)]
    pub portfolio: PortfolioSettings,
    /// Volatility-targeting settings.
    #[serde(default)]
    pub leverage: LeverageSettings,
}

/// Portfolio weighting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSettings {
    /// Rebalance every N index positions.
    #[serde(default = "default_rebal_freq")]
    pub rebal_freq: usize,
    /// Weighting scheme name.
    #[serde(default = "default_scheme")]
    pub weighting_scheme: String,
    /// Training window mode.
    #[serde(default = "default_training")]
    pub training_method: String,
}

fn default_rebal_freq() -> usize { 21 }
fn default_scheme() -> String { "equal".to_string() }
fn default_training() -> String { "expanding".to_string() }

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            rebal_freq: default_rebal_freq(),
            weighting_scheme: default_scheme(),
            training_method: default_training(),
        }
    }
}

/// Volatility-targeting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageSettings {
    /// Whether the leverage overlay is applied at all.
    #[serde(default)]
    pub enabled: bool,
    /// Target annualized volatility.
    #[serde(default = "default_target_vol")]
    pub target_vol: f64,
}

fn default_target_vol() -> f64 { 0.20 }

impl Default for LeverageSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            target_vol: default_target_vol(),
        }
    }
}

impl EngineFileConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.as_ref().display(), "loaded engine configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EngineError::ConfigError(format!("cannot serialize config: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build the validated track configuration.
    pub fn track_config(&self) -> Result<TrackConfig> {
        let config = TrackConfig {
            rebal_freq: self.portfolio.rebal_freq,
            scheme: self.portfolio.weighting_scheme.parse::<WeightingScheme>()?,
            training: self.portfolio.training_method.parse::<TrainingMethod>()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build the validated leverage configuration, if enabled.
    pub fn leverage_config(&self) -> Result<Option<LeverageConfig>> {
        if !self.leverage.enabled {
            return Ok(None);
        }
        let config = LeverageConfig {
            rebal_freq: self.portfolio.rebal_freq,
            training: self.portfolio.training_method.parse::<TrainingMethod>()?,
            target_vol: self.leverage.target_vol,
        };
        config.validate()?;
        Ok(Some(config))
    }

    /// An example configuration file.
    pub fn example() -> &'static str {
        r#"# Engine configuration

[portfolio]
rebal_freq = 21
weighting_scheme = "risk_parity"
training_method = "expanding"

[leverage]
enabled = true
target_vol = 0.20
"#
    }
}
