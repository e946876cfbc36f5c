//! Diagnostics returned alongside engine results.
//!
//! Nothing the engine ignores, merges, clamps or truncates goes unreported:
//! each such decision becomes one `Diagnostic` and one log line.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Several samples shared a date and were merged per policy
    DuplicateResolved,
    /// Intervention date outside the observed production window
    MarkerOutOfRange,
    /// Intervention recorded against a different well
    MarkerForeignWell,
    /// Several interventions on one date merged into one boundary
    MarkerCollapsed,
    /// Zero-rate samples left out of the regression
    ZeroRateExcluded,
    /// A candidate decline form was discarded during fitting
    CandidateRejected,
    /// Seed parameters were forced into range
    ParameterClamped,
    /// A historical segment could not be fitted
    SegmentUnfitted,
    /// Forecast stopped at the point cap before reaching its horizon
    ForecastCapped,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            Self::MarkerCollapsed | Self::ZeroRateExcluded | Self::CandidateRejected => {
                Severity::Info
            }
            _ => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub well_id: String,
    pub segment: Option<usize>,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
}

/// Ordered collection of diagnostics for one computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it at a level matching its severity.
    pub fn record(
        &mut self,
        well_id: &str,
        segment: Option<usize>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let severity = kind.severity();
        match severity {
            Severity::Warning => warn!(well = %well_id, segment = ?segment, kind = ?kind, "{}", message),
            Severity::Info => debug!(well = %well_id, segment = ?segment, kind = ?kind, "{}", message),
        }
        self.entries.push(Diagnostic {
            well_id: well_id.to_string(),
            segment,
            kind,
            severity,
            message,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}
