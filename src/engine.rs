//! Decline Engine
//!
//! Entry points for single-well and field runs. A well is processed by one
//! pure pipeline (normalize, segment, fit, forecast); a field runs those
//! pipelines on a rayon pool and aggregates the collected outcomes.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{self, EngineConfig};
use crate::decline::{arps, Aggregator, CurveFitter, Forecaster, Segmenter, SeriesNormalizer};
use crate::types::{
    DiagnosticKind, Diagnostics, EngineError, FieldForecast, ForecastHorizon, WellForecast,
    WellInput,
};

/// Fits and forecasts wells with one configuration.
#[derive(Debug, Clone, Default)]
pub struct DeclineEngine {
    config: EngineConfig,
}

impl DeclineEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Engine built from `config::init()`'s configuration, or defaults when
    /// none was installed.
    pub fn from_global() -> Self {
        Self::new(config::get().cloned().unwrap_or_default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full pipeline for one well.
    ///
    /// Historical segments that cannot be fitted are reported as diagnostics;
    /// only the last segment, which drives the forecast, has to fit.
    ///
    /// # Errors
    /// Any `EngineError` from normalization, the last segment's fit, or the
    /// horizon. The error names the well.
    pub fn fit_and_forecast(
        &self,
        well: &WellInput,
        horizon: &ForecastHorizon,
    ) -> Result<WellForecast, EngineError> {
        let well_id = well.well_id.as_str();
        let mut diagnostics = Diagnostics::new();

        let series = SeriesNormalizer::new(self.config.normalizer.duplicate_policy).normalize(
            well_id,
            &well.samples,
            &mut diagnostics,
        )?;

        let mut segments = Segmenter::segment(&series, &well.markers, &mut diagnostics);
        let Some((forecast_segment, history)) = segments.split_last_mut() else {
            return Err(EngineError::InsufficientData {
                well_id: well_id.to_string(),
                segment: None,
                available: 0,
                required: crate::config::defaults::MIN_FIT_SAMPLES,
            });
        };

        let fitter = CurveFitter::new(&self.config.fitter);
        for segment in history.iter_mut() {
            if let Err(e) = fitter.fit_segment(segment, &mut diagnostics) {
                diagnostics.record(
                    well_id,
                    Some(segment.index),
                    DiagnosticKind::SegmentUnfitted,
                    e.to_string(),
                );
            }
        }
        fitter.fit_segment(forecast_segment, &mut diagnostics)?;

        let forecaster = Forecaster::new(&self.config.forecast, &self.config.uptime);
        let points = forecaster.forecast(forecast_segment, horizon, &mut diagnostics)?;

        let eur = match (forecaster.effective_limit(horizon), forecast_segment.fit.as_ref()) {
            (Some(limit), Some(fit)) => arps::volume_to_limit(&fit.params, fit.origin, limit)
                .map(|remaining| series.volume_before(fit.origin) + remaining),
            _ => None,
        };
        let total_period_volume = points.iter().map(|p| p.period_volume).sum();

        info!(
            well = %well_id,
            segments = segments.len(),
            model = ?segments.last().and_then(|s| s.model()),
            points = points.len(),
            eur = ?eur,
            diagnostics = diagnostics.len(),
            "Well forecast complete"
        );

        Ok(WellForecast {
            well_id: well_id.to_string(),
            cadence: forecaster.effective_cadence(horizon),
            segments,
            points,
            diagnostics,
            eur,
            total_period_volume,
        })
    }

    /// Forecast every well in parallel and aggregate the results.
    ///
    /// Per-well outcomes keep the input order. A failing well never aborts
    /// the run; it is listed in the aggregate's `failed_wells`.
    pub fn forecast_field(
        &self,
        group_key: &str,
        wells: &[WellInput],
        horizon: &ForecastHorizon,
    ) -> FieldForecast {
        let run = || -> Vec<Result<WellForecast, EngineError>> {
            wells
                .par_iter()
                .map(|well| self.fit_and_forecast(well, horizon))
                .collect()
        };

        let threads = self.config.engine.worker_threads;
        let outcomes = if threads > 0 {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    warn!(threads, error = %e, "Failed to build worker pool, using global pool");
                    run()
                }
            }
        } else {
            run()
        };

        let aggregate = Aggregator::aggregate(group_key, &outcomes);

        info!(
            group = %group_key,
            wells = wells.len(),
            succeeded = aggregate.contributing_wells.len(),
            failed = aggregate.failed_wells.len(),
            "Field forecast complete"
        );

        FieldForecast {
            group_key: group_key.to_string(),
            wells: outcomes,
            aggregate,
        }
    }
}
