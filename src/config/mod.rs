//! Engine Configuration Module
//!
//! Provides engine tuning loaded from TOML files: duplicate handling,
//! regression limits, forecast cadence and the monthly uptime table.
//!
//! ## Loading Order
//!
//! 1. `DCA_CONFIG` environment variable (path to TOML file)
//! 2. `dca_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Either pass an `EngineConfig` to `DeclineEngine::new`, or call
//! `config::init()` once at startup and build engines from the global:
//!
//! ```ignore
//! config::init(EngineConfig::load());
//! let engine = DeclineEngine::from_global();
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global engine configuration, if `init()` has been called.
pub fn get() -> Option<&'static EngineConfig> {
    ENGINE_CONFIG.get()
}
