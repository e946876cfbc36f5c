//! Rate Forecaster
//!
//! Projects a fitted segment forward from its last observation. Points are
//! produced lazily by `ForecastIter`, which only stores the step counter:
//! the k-th point is computed directly from the anchor date and k, so
//! cloning an iterator restarts (or forks) the forecast at no cost.
//!
//! The forecast ends at the first point past the horizon's end date or
//! below its economic limit, and never exceeds `max_points` points.
//!
//! A point's period volume is what the well produces between the previous
//! point and its own date. Each calendar month inside that span is scaled
//! by its own uptime factor.

use chrono::{Datelike, NaiveDate};

use super::arps;
use super::calendar::{elapsed_months, next_slot, slot, step};
use crate::config::{ForecastConfig, UptimeConfig};
use crate::types::{
    ArpsParams, Cadence, DiagnosticKind, Diagnostics, EngineError, ForecastHorizon, ForecastPoint,
    Segment,
};

/// Builds forecast iterators from fitted segments.
pub struct Forecaster {
    config: ForecastConfig,
    uptime: UptimeConfig,
}

impl Forecaster {
    pub fn new(config: &ForecastConfig, uptime: &UptimeConfig) -> Self {
        Self {
            config: config.clone(),
            uptime: uptime.clone(),
        }
    }

    /// Economic limit in force for `horizon`: its own, else the configured one.
    pub fn effective_limit(&self, horizon: &ForecastHorizon) -> Option<f64> {
        horizon.economic_limit.or(self.config.economic_limit)
    }

    /// Cadence in force for `horizon`.
    pub fn effective_cadence(&self, horizon: &ForecastHorizon) -> Cadence {
        horizon.cadence.unwrap_or(self.config.cadence)
    }

    /// Start a forecast for `segment`.
    ///
    /// # Errors
    /// - `InvalidHorizon` when neither an end date nor an economic limit is
    ///   in force, or the limit is not a finite positive rate
    /// - `UnfittableSegment` when the segment carries no fit
    pub fn iter(
        &self,
        segment: &Segment,
        horizon: &ForecastHorizon,
    ) -> Result<ForecastIter, EngineError> {
        let economic_limit = self.effective_limit(horizon);
        if horizon.end_date.is_none() && economic_limit.is_none() {
            return Err(EngineError::InvalidHorizon {
                well_id: segment.well_id.clone(),
                reason: "neither an end date nor an economic limit was given".to_string(),
            });
        }
        if let Some(limit) = economic_limit {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(EngineError::InvalidHorizon {
                    well_id: segment.well_id.clone(),
                    reason: format!("economic limit {limit} must be a finite rate > 0"),
                });
            }
        }

        let Some(fit) = segment.fit.as_ref() else {
            return Err(EngineError::UnfittableSegment {
                well_id: segment.well_id.clone(),
                segment: segment.index,
                reason: "segment has no decline fit to forecast from".to_string(),
            });
        };

        Ok(ForecastIter {
            well_id: segment.well_id.clone(),
            params: fit.params,
            origin: fit.origin,
            anchor: segment.last_observed(),
            cadence: self.effective_cadence(horizon),
            end_date: horizon.end_date,
            economic_limit,
            max_points: self.config.max_points,
            uptime: self.uptime.clone(),
            next_k: 1,
        })
    }

    /// Collect the whole forecast, recording a diagnostic when the point cap
    /// cut it short.
    pub fn forecast(
        &self,
        segment: &Segment,
        horizon: &ForecastHorizon,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<ForecastPoint>, EngineError> {
        let iter = self.iter(segment, horizon)?;
        if iter.is_capped() {
            diagnostics.record(
                &segment.well_id,
                Some(segment.index),
                DiagnosticKind::ForecastCapped,
                format!(
                    "forecast truncated at {} {} points before reaching its horizon",
                    iter.max_points, iter.cadence
                ),
            );
        }
        Ok(iter.collect())
    }
}

/// Lazy, finite forecast over one segment.
#[derive(Debug, Clone)]
pub struct ForecastIter {
    well_id: String,
    params: ArpsParams,
    origin: NaiveDate,
    anchor: NaiveDate,
    cadence: Cadence,
    end_date: Option<NaiveDate>,
    economic_limit: Option<f64>,
    max_points: usize,
    uptime: UptimeConfig,
    next_k: usize,
}

impl ForecastIter {
    /// The k-th point (k >= 1) if it is within the horizon, regardless of
    /// the point cap.
    pub fn point_at(&self, k: usize) -> Option<ForecastPoint> {
        if k == 0 {
            return None;
        }
        let date = step(self.cadence, self.anchor, k)?;
        if self.end_date.is_some_and(|end| date > end) {
            return None;
        }

        let t = elapsed_months(self.origin, date);
        let rate = arps::rate(&self.params, t);
        if self.economic_limit.is_some_and(|limit| rate < limit) {
            return None;
        }

        let previous = step(self.cadence, self.anchor, k - 1)?;

        Some(ForecastPoint {
            well_id: self.well_id.clone(),
            date,
            elapsed_months: t,
            rate,
            cumulative_volume: arps::cumulative_volume(&self.params, self.origin, t),
            period_volume: self.period_volume(previous, date),
        })
    }

    /// Uptime-scaled volume produced from `from` to `to`, split at calendar
    /// month starts.
    fn period_volume(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        let mut volume = 0.0;
        let mut lo = from;
        while lo < to {
            let hi = next_slot(Cadence::Monthly, slot(Cadence::Monthly, lo))
                .map_or(to, |next| next.min(to));
            let produced = arps::volume_between(
                &self.params,
                self.origin,
                elapsed_months(self.origin, lo),
                elapsed_months(self.origin, hi),
            );
            volume += produced * self.uptime.factor(lo.month());
            lo = hi;
        }
        volume
    }

    /// True when the horizon extends beyond the point cap.
    pub fn is_capped(&self) -> bool {
        self.point_at(self.max_points + 1).is_some()
    }
}

impl Iterator for ForecastIter {
    type Item = ForecastPoint;

    fn next(&mut self) -> Option<ForecastPoint> {
        if self.next_k > self.max_points {
            return None;
        }
        match self.point_at(self.next_k) {
            Some(point) => {
                self.next_k += 1;
                Some(point)
            }
            None => {
                // Rates never rise and dates never go back: nothing follows
                self.next_k = self.max_points + 1;
                None
            }
        }
    }
}
