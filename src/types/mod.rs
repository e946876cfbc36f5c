//! Shared value types for the decline engine
//!
//! The pipeline passes plain data between stages:
//! - Input: RawSample, InterventionMarker, WellInput
//! - Normalizer: NormalizedSeries of Sample
//! - Segmenter / Curve Fitter: Segment with DeclineFit (ArpsParams + FitQuality)
//! - Forecaster: ForecastPoint, WellForecast
//! - Aggregator: AggregateSeries, FieldForecast
//!
//! Every stage reports through `Diagnostics` and fails with `EngineError`.

mod arps;
mod diagnostics;
mod error;
mod forecast;
mod sample;
mod segment;

pub use arps::*;
pub use diagnostics::*;
pub use error::*;
pub use forecast::*;
pub use sample::*;
pub use segment::*;
