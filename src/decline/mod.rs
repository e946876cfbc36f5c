//! Decline Curve Analysis Pipeline
//!
//! Turns raw production history into fitted Arps decline segments and
//! forward rate forecasts, per well and per field.
//!
//! ## Pipeline (per well)
//! 1. `normalizer`: validate, order and de-duplicate samples
//! 2. `segmenter`: split the history at intervention dates
//! 3. `fitter`: regress (or seed) an Arps model per segment
//! 4. `forecaster`: project the last segment to the horizon
//!
//! Wells are independent; `aggregator` is the only step that sees more than
//! one of them.
//!
//! ## Architecture
//! - `arps`: closed-form rate, cumulative and time-to-rate
//! - `calendar`: elapsed months, cadence steps and calendar slots
//! - `least_squares`: bounded Levenberg–Marquardt solver
//! - `normalizer`: `SeriesNormalizer`
//! - `segmenter`: `Segmenter`
//! - `fitter`: `CurveFitter` with parsimony-based model selection
//! - `forecaster`: `Forecaster` and the restartable `ForecastIter`
//! - `aggregator`: calendar-aligned field sums with partial failure
//! - `water_cut`: water cut from paired oil and liquid rates

pub mod arps;
pub mod calendar;
pub mod least_squares;
pub mod normalizer;
pub mod segmenter;
pub mod fitter;
pub mod forecaster;
pub mod aggregator;
pub mod water_cut;

// Re-export public types
pub use normalizer::SeriesNormalizer;
pub use segmenter::Segmenter;
pub use fitter::CurveFitter;
pub use forecaster::{ForecastIter, Forecaster};
pub use aggregator::{aggregate, Aggregator};
pub use water_cut::{merge_water_cut, water_cut_percent};
