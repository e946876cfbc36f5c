//! Decline segments and fit results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ArpsParams, DeclineModel, Sample};

/// Where a segment's parameters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitSource {
    /// Estimated by nonlinear regression on the segment's samples
    Regression,
    /// Supplied with the intervention record and validated only
    Seed,
}

/// Goodness-of-fit for a regressed segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Sum of squared relative residuals, Σ((q̂ - q) / q)²
    pub score: f64,
    /// Root mean squared residual in rate units
    pub rmse: f64,
    /// Coefficient of determination on rates
    pub r_squared: f64,
    /// Optimizer iterations spent on the selected form
    pub iterations: usize,
    /// Samples that took part in the regression
    pub sample_count: usize,
}

/// A decline model attached to a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineFit {
    pub model: DeclineModel,
    pub params: ArpsParams,
    /// Date at which elapsed time is zero (`qi` is the rate here)
    pub origin: NaiveDate,
    /// None for seeded parameters
    pub quality: Option<FitQuality>,
    pub source: FitSource,
}

/// A window of one well's history over which a single decline model applies.
///
/// Segments of a well are ordered and contiguous: each `end_date` equals the
/// next segment's `start_date`, and the last segment is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub well_id: String,
    /// Position within the well's segment list
    pub index: usize,
    pub start_date: NaiveDate,
    /// Exclusive end; `None` for the open forecast tail
    pub end_date: Option<NaiveDate>,
    pub samples: Vec<Sample>,
    /// Tag of the intervention that opened this segment
    pub trigger: Option<String>,
    /// Seed parameters carried by that intervention
    pub seed: Option<ArpsParams>,
    pub fit: Option<DeclineFit>,
}

impl Segment {
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date < end)
    }

    /// Date of the last observation, or the segment start when it holds none.
    pub fn last_observed(&self) -> NaiveDate {
        self.samples.last().map_or(self.start_date, |s| s.date)
    }

    pub fn model(&self) -> Option<DeclineModel> {
        self.fit.as_ref().map(|f| f.model)
    }

    pub fn params(&self) -> Option<ArpsParams> {
        self.fit.as_ref().map(|f| f.params)
    }
}
