//! Production samples, intervention markers and per-well inputs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ArpsParams;

/// A production observation as handed over by the persistence layer.
///
/// The date is optional because upstream records can be incomplete; the
/// normalizer rejects any sample without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub well_id: String,
    pub date: Option<NaiveDate>,
    /// Production rate (per day)
    pub rate: f64,
}

impl RawSample {
    pub fn new(well_id: impl Into<String>, date: NaiveDate, rate: f64) -> Self {
        Self {
            well_id: well_id.into(),
            date: Some(date),
            rate,
        }
    }

    pub fn undated(well_id: impl Into<String>, rate: f64) -> Self {
        Self {
            well_id: well_id.into(),
            date: None,
            rate,
        }
    }
}

/// A validated production observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub well_id: String,
    pub date: NaiveDate,
    pub rate: f64,
}

/// Normalizer output: one well's samples with strictly increasing dates
/// and non-negative rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub well_id: String,
    pub samples: Vec<Sample>,
}

impl NormalizedSeries {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.samples.first().map(|s| s.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.samples.last().map(|s| s.date)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Observed volume before `until`, each rate held until the next
    /// sample (or `until`), in rate × days.
    pub fn volume_before(&self, until: NaiveDate) -> f64 {
        let next_dates = self
            .samples
            .iter()
            .skip(1)
            .map(|s| s.date)
            .chain(std::iter::once(until));
        self.samples
            .iter()
            .zip(next_dates)
            .take_while(|(s, _)| s.date < until)
            .map(|(s, next)| s.rate * (next.min(until) - s.date).num_days() as f64)
            .sum()
    }
}

/// An intervention event used as a segmentation cut point.
///
/// `kind` is an opaque tag (hydraulic fracturing, sidetrack, ...). The engine
/// carries it onto the segment it opens but never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionMarker {
    pub well_id: String,
    pub date: NaiveDate,
    pub kind: String,
    /// Manually entered decline parameters for the segment this marker opens
    #[serde(default)]
    pub seed: Option<ArpsParams>,
}

impl InterventionMarker {
    pub fn new(well_id: impl Into<String>, date: NaiveDate, kind: impl Into<String>) -> Self {
        Self {
            well_id: well_id.into(),
            date,
            kind: kind.into(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: ArpsParams) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Everything the engine needs to fit and forecast one well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellInput {
    pub well_id: String,
    pub samples: Vec<RawSample>,
    #[serde(default)]
    pub markers: Vec<InterventionMarker>,
}

impl WellInput {
    pub fn new(well_id: impl Into<String>, samples: Vec<RawSample>) -> Self {
        Self {
            well_id: well_id.into(),
            samples,
            markers: Vec::new(),
        }
    }

    pub fn with_markers(mut self, markers: Vec<InterventionMarker>) -> Self {
        self.markers = markers;
        self
    }
}
