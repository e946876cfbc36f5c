//! DCA Engine: Decline Curve Analysis and Production Forecasting
//!
//! Fits Arps decline models to per-well production history, segmented at
//! intervention events, and projects rates forward to an end date or an
//! economic limit. Field-level forecasts sum the per-well projections on a
//! common calendar.
//!
//! ## Architecture
//!
//! - **Config**: TOML-backed `EngineConfig` (duplicate policy, regression
//!   limits, forecast cadence, monthly uptime factors)
//! - **Types**: samples, markers, segments, forecasts, diagnostics, errors
//! - **Decline**: normalizer, segmenter, curve fitter, forecaster, aggregator
//! - **Engine**: `DeclineEngine`, the per-well and per-field entry points
//!
//! ## Example
//!
//! ```no_run
//! use dca_engine::{DeclineEngine, ForecastHorizon, RawSample, WellInput};
//! use chrono::NaiveDate;
//!
//! let date = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
//! let well = WellInput::new(
//!     "W1",
//!     vec![
//!         RawSample::new("W1", date(1), 1000.0),
//!         RawSample::new("W1", date(2), 900.0),
//!         RawSample::new("W1", date(3), 810.0),
//!     ],
//! );
//! let forecast = DeclineEngine::default()
//!     .fit_and_forecast(&well, &ForecastHorizon::until(date(12)))
//!     .unwrap();
//! println!("{} points", forecast.points.len());
//! ```

pub mod config;
pub mod types;
pub mod decline;
pub mod engine;

// Re-export configuration
pub use config::{ConfigError, DuplicatePolicy, EngineConfig, ParameterPolicy};

// Re-export commonly used types
pub use types::{
    AggregatePoint, AggregateSeries, ArpsParams, Cadence, DeclineFit, DeclineModel, Diagnostic,
    DiagnosticKind, Diagnostics, EngineError, FieldForecast, FitQuality, FitSource,
    ForecastHorizon, ForecastPoint, InterventionMarker, NormalizedSeries, RawSample, Sample,
    Segment, Severity, WaterCutPoint, WellFailure, WellForecast, WellInput,
};

// Re-export pipeline stages
pub use decline::{
    aggregate, merge_water_cut, water_cut_percent, Aggregator, CurveFitter, ForecastIter,
    Forecaster, Segmenter, SeriesNormalizer,
};

// Re-export the engine
pub use engine::DeclineEngine;
