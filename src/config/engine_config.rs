//! Engine Configuration - regression, forecast and uptime settings as TOML
//!
//! Each struct implements `Default` with the values in `defaults.rs`, so an
//! absent or empty config file yields the reference engine behavior.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::types::Cadence;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "DCA_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "dca_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the decline engine.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$DCA_CONFIG` env var
/// 2. `./dca_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Series normalization
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Curve fitting
    #[serde(default)]
    pub fitter: FitterConfig,

    /// Forecast generation
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Monthly uptime (K) factors
    #[serde(default)]
    pub uptime: UptimeConfig,

    /// Parallel execution
    #[serde(default)]
    pub engine: RuntimeConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DCA_CONFIG` environment variable
    /// 2. `./dca_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from DCA_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from DCA_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "DCA_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./dca_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./dca_config.toml, using defaults");
                }
            }
        }

        info!("No dca_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Engine config saved");
        Ok(())
    }

    /// Validate all settings for internal consistency.
    ///
    /// Rules:
    /// - Iteration caps, point caps and sample minimums must be > 0
    /// - Tolerances and margins must be finite and non-negative
    /// - Uptime factors must lie in (0, 1]
    /// - An economic limit, when set, must be finite and > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (mut errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        let f = &self.fitter;
        if f.harmonic_min_samples < defaults::MIN_FIT_SAMPLES {
            errors.push(format!(
                "fitter.harmonic_min_samples ({}) must be >= {}",
                f.harmonic_min_samples,
                defaults::MIN_FIT_SAMPLES
            ));
        }
        if f.hyperbolic_min_samples < 3 {
            errors.push(format!(
                "fitter.hyperbolic_min_samples ({}) must be >= 3 (three free parameters)",
                f.hyperbolic_min_samples
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Normalizer
// ============================================================================

/// How samples sharing a date are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the well so the upstream data issue surfaces
    #[default]
    Reject,
    /// Keep the sample supplied last
    KeepLast,
    /// Add the rates together
    Sum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

// ============================================================================
// Curve Fitter
// ============================================================================

/// What to do with decline parameters that violate the Arps invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPolicy {
    #[default]
    Reject,
    /// Force into range and record a diagnostic per adjustment
    Clamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitterConfig {
    /// Levenberg–Marquardt iteration cap per candidate form.
    /// A candidate that reaches it is discarded as non-converged.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Relative cost reduction below which a fit counts as converged.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Handling of out-of-range seed parameters.
    #[serde(default)]
    pub parameter_policy: ParameterPolicy,

    /// Relative score improvement required to prefer a more complex form.
    #[serde(default = "default_parsimony_margin")]
    pub parsimony_margin: f64,

    /// Samples needed before the harmonic form is tried.
    #[serde(default = "default_harmonic_min_samples")]
    pub harmonic_min_samples: usize,

    /// Samples needed before the hyperbolic form is tried.
    #[serde(default = "default_hyperbolic_min_samples")]
    pub hyperbolic_min_samples: usize,
}

fn default_max_iterations() -> usize { defaults::MAX_FIT_ITERATIONS }
fn default_tolerance() -> f64 { defaults::FIT_TOLERANCE }
fn default_parsimony_margin() -> f64 { defaults::PARSIMONY_MARGIN }
fn default_harmonic_min_samples() -> usize { defaults::HARMONIC_MIN_SAMPLES }
fn default_hyperbolic_min_samples() -> usize { defaults::HYPERBOLIC_MIN_SAMPLES }

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            parameter_policy: ParameterPolicy::default(),
            parsimony_margin: default_parsimony_margin(),
            harmonic_min_samples: default_harmonic_min_samples(),
            hyperbolic_min_samples: default_hyperbolic_min_samples(),
        }
    }
}

// ============================================================================
// Forecaster
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Point spacing when the horizon does not name one.
    #[serde(default = "default_cadence")]
    pub cadence: Cadence,

    /// Hard cap on points per forecast.
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Economic limit applied when the horizon does not carry one.
    #[serde(default)]
    pub economic_limit: Option<f64>,
}

fn default_cadence() -> Cadence { Cadence::Monthly }
fn default_max_points() -> usize { defaults::MAX_FORECAST_POINTS }

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            max_points: default_max_points(),
            economic_limit: None,
        }
    }
}

// ============================================================================
// Uptime (K-month) factors
// ============================================================================

/// Fraction of each calendar month a well is expected to be on production.
///
/// Period volumes are scaled by the factor of the month they were produced in;
/// rates and cumulative volumes are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeConfig {
    /// January first
    #[serde(default = "default_uptime_factors")]
    pub factors: [f64; 12],
}

fn default_uptime_factors() -> [f64; 12] {
    [defaults::DEFAULT_UPTIME_FACTOR; 12]
}

impl Default for UptimeConfig {
    fn default() -> Self {
        Self {
            factors: default_uptime_factors(),
        }
    }
}

impl UptimeConfig {
    /// Factor for a calendar month (1 = January). Out-of-range months get 1.0.
    pub fn factor(&self, month: u32) -> f64 {
        month
            .checked_sub(1)
            .and_then(|i| self.factors.get(i as usize))
            .copied()
            .unwrap_or(defaults::DEFAULT_UPTIME_FACTOR)
    }
}

// ============================================================================
// Runtime
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Worker threads for multi-well runs; 0 uses the rayon global pool.
    #[serde(default)]
    pub worker_threads: usize,
}
