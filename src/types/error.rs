//! Engine error taxonomy.
//!
//! Every variant names the well (and segment where one applies) so a
//! multi-well run can report exactly which inputs failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Cadence;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineError {
    /// Malformed or negative input data; the well is not processed further
    #[error("Invalid sample for well {well_id}: {reason}")]
    InvalidSample { well_id: String, reason: String },

    /// Too few usable samples to regress and no seed parameters available
    #[error("Insufficient data for well {well_id} segment {segment:?}: need {required} samples, have {available}")]
    InsufficientData {
        well_id: String,
        segment: Option<usize>,
        available: usize,
        required: usize,
    },

    /// No candidate form satisfied the invariants or converged
    #[error("Unfittable segment {segment} of well {well_id}: {reason}")]
    UnfittableSegment {
        well_id: String,
        segment: usize,
        reason: String,
    },

    /// Forecast calendar cannot be aligned with the aggregate's calendar
    #[error("Calendar mismatch for well {well_id}: expected {expected} cadence, {reason}")]
    CalendarMismatch {
        well_id: String,
        expected: Cadence,
        reason: String,
    },

    /// Seed parameters violate the Arps invariants
    #[error("Invalid decline parameters for well {well_id} segment {segment}: {reason}")]
    InvalidParameters {
        well_id: String,
        segment: usize,
        reason: String,
    },

    /// Forecast horizon has no stopping condition or a malformed limit
    #[error("Invalid forecast horizon for well {well_id}: {reason}")]
    InvalidHorizon { well_id: String, reason: String },
}

impl EngineError {
    pub fn well_id(&self) -> &str {
        match self {
            Self::InvalidSample { well_id, .. }
            | Self::InsufficientData { well_id, .. }
            | Self::UnfittableSegment { well_id, .. }
            | Self::CalendarMismatch { well_id, .. }
            | Self::InvalidParameters { well_id, .. }
            | Self::InvalidHorizon { well_id, .. } => well_id,
        }
    }

    pub fn segment(&self) -> Option<usize> {
        match self {
            Self::InsufficientData { segment, .. } => *segment,
            Self::UnfittableSegment { segment, .. } | Self::InvalidParameters { segment, .. } => {
                Some(*segment)
            }
            _ => None,
        }
    }
}
