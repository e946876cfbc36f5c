//! Production Series Normalizer
//!
//! Turns an unordered bag of raw samples for one well into a strictly
//! date-increasing series with non-negative rates. Any malformed sample
//! rejects the whole well; nothing is partially processed.
//!
//! Zero-rate runs at either end are kept: a shut-in month is an observation.

use crate::config::DuplicatePolicy;
use crate::types::{
    DiagnosticKind, Diagnostics, EngineError, NormalizedSeries, RawSample, Sample,
};

/// Production series validator and de-duplicator
pub struct SeriesNormalizer {
    policy: DuplicatePolicy,
}

impl SeriesNormalizer {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    /// Validate, order and de-duplicate `raw` for `well_id`.
    ///
    /// # Errors
    /// `InvalidSample` for a sample with a missing date, a negative or
    /// non-finite rate, a foreign well id, or a duplicate date under the
    /// `reject` policy.
    pub fn normalize(
        &self,
        well_id: &str,
        raw: &[RawSample],
        diagnostics: &mut Diagnostics,
    ) -> Result<NormalizedSeries, EngineError> {
        let mut dated = Vec::with_capacity(raw.len());

        for (position, sample) in raw.iter().enumerate() {
            if sample.well_id != well_id {
                return Err(Self::invalid(
                    well_id,
                    format!(
                        "sample #{position} belongs to well {} (expected {well_id})",
                        sample.well_id
                    ),
                ));
            }
            let Some(date) = sample.date else {
                return Err(Self::invalid(well_id, format!("sample #{position} has no date")));
            };
            if !sample.rate.is_finite() || sample.rate < 0.0 {
                return Err(Self::invalid(
                    well_id,
                    format!("sample #{position} on {date} has invalid rate {}", sample.rate),
                ));
            }
            dated.push((date, sample.rate));
        }

        // Stable sort keeps input order among equal dates for keep-last
        dated.sort_by_key(|&(date, _)| date);

        let mut samples: Vec<Sample> = Vec::with_capacity(dated.len());
        let mut i = 0;
        while i < dated.len() {
            let date = dated[i].0;
            let run_end = dated[i..]
                .iter()
                .position(|&(d, _)| d != date)
                .map_or(dated.len(), |offset| i + offset);
            let run = &dated[i..run_end];

            let rate = if run.len() == 1 {
                run[0].1
            } else {
                self.resolve_duplicates(well_id, date, run, diagnostics)?
            };

            samples.push(Sample {
                well_id: well_id.to_string(),
                date,
                rate,
            });
            i = run_end;
        }

        Ok(NormalizedSeries {
            well_id: well_id.to_string(),
            samples,
        })
    }

    fn resolve_duplicates(
        &self,
        well_id: &str,
        date: chrono::NaiveDate,
        run: &[(chrono::NaiveDate, f64)],
        diagnostics: &mut Diagnostics,
    ) -> Result<f64, EngineError> {
        let rates: Vec<f64> = run.iter().map(|&(_, r)| r).collect();
        let resolved = match self.policy {
            DuplicatePolicy::Reject => {
                return Err(Self::invalid(
                    well_id,
                    format!("{} samples share date {date}: {rates:?}", run.len()),
                ));
            }
            DuplicatePolicy::KeepLast => rates[rates.len() - 1],
            DuplicatePolicy::Sum => rates.iter().sum(),
        };

        diagnostics.record(
            well_id,
            None,
            DiagnosticKind::DuplicateResolved,
            format!(
                "{} samples on {date} resolved by {:?} policy: {rates:?} -> {resolved}",
                run.len(),
                self.policy
            ),
        );
        Ok(resolved)
    }

    fn invalid(well_id: &str, reason: String) -> EngineError {
        EngineError::InvalidSample {
            well_id: well_id.to_string(),
            reason,
        }
    }
}
