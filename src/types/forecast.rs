//! Forecast, aggregate and water-cut outputs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Diagnostics, EngineError, Segment};

/// Spacing of forecast points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    Monthly,
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// Where a forecast stops: an end date, an economic rate limit, or both
/// (whichever is reached first).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastHorizon {
    /// Last date that may be emitted (inclusive)
    pub end_date: Option<NaiveDate>,
    /// Minimum rate worth forecasting; points below it are not emitted
    pub economic_limit: Option<f64>,
    /// Point spacing; the configured default when `None`
    pub cadence: Option<Cadence>,
}

impl ForecastHorizon {
    pub fn until(end_date: NaiveDate) -> Self {
        Self {
            end_date: Some(end_date),
            ..Self::default()
        }
    }

    pub fn to_economic_limit(limit: f64) -> Self {
        Self {
            economic_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_economic_limit(mut self, limit: f64) -> Self {
        self.economic_limit = Some(limit);
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }
}

/// One projected rate. Always recomputed from a fitted segment, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub well_id: String,
    pub date: NaiveDate,
    /// Months since the segment's origin
    pub elapsed_months: f64,
    /// Rate (per day)
    pub rate: f64,
    /// Volume produced since the segment's origin (rate × days)
    pub cumulative_volume: f64,
    /// Volume since the previous point, each calendar month scaled by its
    /// uptime factor
    pub period_volume: f64,
}

/// Result of `fit_and_forecast` for one well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellForecast {
    pub well_id: String,
    pub cadence: Cadence,
    pub segments: Vec<Segment>,
    pub points: Vec<ForecastPoint>,
    pub diagnostics: Diagnostics,
    /// Estimated ultimate recovery: observed volume before the forecast
    /// segment's origin plus the segment's volume down to the economic
    /// limit. `None` without a limit.
    pub eur: Option<f64>,
    /// Sum of period volumes over the forecast
    pub total_period_volume: f64,
}

impl WellForecast {
    /// The open segment the forecast was projected from.
    pub fn forecast_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn rate_on(&self, date: NaiveDate) -> Option<f64> {
        self.points.iter().find(|p| p.date == date).map(|p| p.rate)
    }
}

/// A well that dropped out of an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellFailure {
    pub well_id: String,
    pub error: EngineError,
}

/// One calendar slot of an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub date: NaiveDate,
    pub rate: f64,
    pub period_volume: f64,
    /// Wells with a forecast point in this slot
    pub active_wells: usize,
}

/// Field/platform-level forecast on a unified calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSeries {
    pub group_key: String,
    pub cadence: Cadence,
    pub points: Vec<AggregatePoint>,
    /// Wells summed into `points`, sorted
    pub contributing_wells: Vec<String>,
    /// Wells excluded with the reason, sorted by well id
    pub failed_wells: Vec<WellFailure>,
}

impl AggregateSeries {
    pub fn rate_on(&self, date: NaiveDate) -> Option<f64> {
        self.points.iter().find(|p| p.date == date).map(|p| p.rate)
    }

    pub fn total_period_volume(&self) -> f64 {
        self.points.iter().map(|p| p.period_volume).sum()
    }

    pub fn failed_well_ids(&self) -> Vec<&str> {
        self.failed_wells.iter().map(|f| f.well_id.as_str()).collect()
    }
}

/// Per-well outcomes of a field run plus their aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldForecast {
    pub group_key: String,
    pub wells: Vec<Result<WellForecast, EngineError>>,
    pub aggregate: AggregateSeries,
}

impl FieldForecast {
    pub fn succeeded(&self) -> impl Iterator<Item = &WellForecast> {
        self.wells.iter().filter_map(|w| w.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EngineError> {
        self.wells.iter().filter_map(|w| w.as_ref().err())
    }
}

/// Oil and liquid rates of one well on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterCutPoint {
    pub date: NaiveDate,
    pub oil_rate: f64,
    pub liquid_rate: f64,
    /// Percent, 0-100
    pub water_cut: f64,
}
