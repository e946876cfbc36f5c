//! Arps Curve Fitter
//!
//! Estimates (qi, b, Di) for one segment. Each eligible form is regressed
//! with bounded Levenberg–Marquardt on relative residuals (q̂ - q) / q, so
//! late low-rate months weigh as much as early high-rate ones.
//!
//! ## Parameterization
//! - `qi` and `Di` are optimized as logarithms, which keeps them positive
//!   without explicit constraints
//! - `ln Di` is boxed to [MIN_DECLINE_RATE, MAX_DECLINE_RATE]
//! - hyperbolic `b` is boxed to [HYPERBOLIC_B_MIN, HYPERBOLIC_B_MAX]
//!
//! A candidate that ends pinned at one of those bounds is rejected: a
//! pinned `Di` means the data does not decline, a pinned `b` means one of
//! the two-parameter forms describes it.
//!
//! ## Selection
//! Candidates are ranked simplest first (exponential, harmonic, hyperbolic).
//! The lowest score wins. A later candidate replaces the current best only
//! when its score is strictly lower, by more than the parsimony margin when
//! one is configured, so ties go to the simpler form.

use statrs::statistics::Statistics;
use tracing::debug;

use super::arps;
use super::calendar::elapsed_months;
use super::least_squares::{levenberg_marquardt, LeastSquaresProblem, SolverSettings};
use crate::config::defaults::{
    CLAMP_FLOOR, HYPERBOLIC_B_MAX, HYPERBOLIC_B_MIN, HYPERBOLIC_B_STARTS, MAX_DECLINE_RATE,
    MIN_DECLINE_RATE, MIN_FIT_SAMPLES,
};
use crate::config::{FitterConfig, ParameterPolicy};
use crate::types::{
    ArpsParams, DeclineFit, DeclineModel, DiagnosticKind, Diagnostics, EngineError, FitQuality,
    FitSource, Sample, Segment,
};

/// Decline used to seed a regression when the log-linear estimate is not
/// a decline at all.
const FALLBACK_SEED_DECLINE: f64 = 1e-2;

/// Relative distance from a bound that still counts as pinned.
const BOUND_EPSILON: f64 = 1e-6;

/// Absolute slack in the parsimony comparison so exact fits tie.
const SCORE_EPSILON: f64 = 1e-12;

/// Whether a more complex candidate's `score` beats the simpler `best`.
fn improves_on(score: f64, best: f64, margin: f64) -> bool {
    score < best * (1.0 - margin) - SCORE_EPSILON
}

// ============================================================================
// Residual model
// ============================================================================

/// Relative-residual Arps regression over (t, q) pairs.
struct ArpsProblem<'a> {
    model: DeclineModel,
    t: &'a [f64],
    q: &'a [f64],
}

impl ArpsProblem<'_> {
    fn params_from(&self, x: &[f64]) -> ArpsParams {
        let qi = x[0].exp();
        let di = x[1].exp();
        match self.model {
            DeclineModel::Exponential => ArpsParams::exponential(qi, di),
            DeclineModel::Harmonic => ArpsParams::harmonic(qi, di),
            DeclineModel::Hyperbolic => ArpsParams::new(qi, x[2], di),
        }
    }
}

impl LeastSquaresProblem for ArpsProblem<'_> {
    fn parameter_count(&self) -> usize {
        self.model.free_parameters()
    }

    fn observation_count(&self) -> usize {
        self.t.len()
    }

    fn evaluate(&self, x: &[f64], residuals: &mut [f64], jacobian: &mut [f64]) {
        let p = self.parameter_count();
        let params = self.params_from(x);
        let di = params.di;

        for (i, (&t, &q)) in self.t.iter().zip(self.q).enumerate() {
            let fitted = arps::rate(&params, t);
            residuals[i] = (fitted - q) / q;

            let row = &mut jacobian[i * p..(i + 1) * p];
            // d q̂ / d ln qi
            row[0] = fitted / q;
            // d q̂ / d ln Di = D · d q̂ / dD
            row[1] = match self.model {
                DeclineModel::Exponential => -fitted * di * t,
                DeclineModel::Harmonic => -fitted * di * t / (1.0 + di * t),
                DeclineModel::Hyperbolic => -fitted * di * t / (1.0 + params.b * di * t),
            } / q;
            if self.model == DeclineModel::Hyperbolic {
                let b = params.b;
                let bdt = b * di * t;
                row[2] = fitted * (bdt.ln_1p() / (b * b) - di * t / (b * (1.0 + bdt))) / q;
            }
        }
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        let mut bounds = vec![
            (f64::NEG_INFINITY, f64::INFINITY),
            (MIN_DECLINE_RATE.ln(), MAX_DECLINE_RATE.ln()),
        ];
        if self.model == DeclineModel::Hyperbolic {
            bounds.push((HYPERBOLIC_B_MIN, HYPERBOLIC_B_MAX));
        }
        bounds
    }
}

// ============================================================================
// Closed-form seeds
// ============================================================================

/// Ordinary least squares `y = intercept + slope·x`.
fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let x_mean = x.iter().mean();
    let y_mean = y.iter().mean();
    let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    if sxx <= 0.0 || !sxx.is_finite() {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - x_mean) * (b - y_mean)).sum();
    let slope = sxy / sxx;
    Some((y_mean - slope * x_mean, slope))
}

/// (qi, Di) from a straight line through ln q.
fn exponential_seed(t: &[f64], q: &[f64]) -> (f64, f64) {
    let ln_q: Vec<f64> = q.iter().map(|v| v.ln()).collect();
    match linear_fit(t, &ln_q) {
        Some((intercept, slope)) if slope < 0.0 => (intercept.exp(), -slope),
        Some((intercept, _)) => (intercept.exp(), FALLBACK_SEED_DECLINE),
        None => (q[0], FALLBACK_SEED_DECLINE),
    }
}

/// (qi, Di) from a straight line through 1/q, exact for harmonic data.
fn harmonic_seed(t: &[f64], q: &[f64]) -> Option<(f64, f64)> {
    let inv_q: Vec<f64> = q.iter().map(|v| 1.0 / v).collect();
    let (intercept, slope) = linear_fit(t, &inv_q)?;
    (intercept > 0.0 && slope > 0.0).then(|| (1.0 / intercept, slope / intercept))
}

// ============================================================================
// Fitter
// ============================================================================

/// A converged, in-bounds candidate.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    params: ArpsParams,
    score: f64,
    iterations: usize,
}

/// Segment fitter. Holds only configuration; safe to share across threads.
pub struct CurveFitter {
    config: FitterConfig,
}

impl CurveFitter {
    pub fn new(config: &FitterConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Attach a decline fit to `segment`, from its seed when it carries one,
    /// otherwise by regression on its samples.
    pub fn fit_segment(
        &self,
        segment: &mut Segment,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        let fit = match segment.seed {
            Some(seed) => self.seeded_fit(segment, seed, diagnostics)?,
            None => self.fit_samples(&segment.well_id, segment.index, &segment.samples, diagnostics)?,
        };
        segment.fit = Some(fit);
        Ok(())
    }

    fn seeded_fit(
        &self,
        segment: &Segment,
        seed: ArpsParams,
        diagnostics: &mut Diagnostics,
    ) -> Result<DeclineFit, EngineError> {
        let params = match (seed.is_valid(), self.config.parameter_policy) {
            (true, _) => seed,
            (false, ParameterPolicy::Reject) => {
                return Err(EngineError::InvalidParameters {
                    well_id: segment.well_id.clone(),
                    segment: segment.index,
                    reason: seed.violations().join("; "),
                });
            }
            (false, ParameterPolicy::Clamp) => {
                let (clamped, notes) = seed.clamped(CLAMP_FLOOR);
                for note in notes {
                    diagnostics.record(
                        &segment.well_id,
                        Some(segment.index),
                        DiagnosticKind::ParameterClamped,
                        note,
                    );
                }
                let remaining = clamped.violations();
                if !remaining.is_empty() {
                    return Err(EngineError::InvalidParameters {
                        well_id: segment.well_id.clone(),
                        segment: segment.index,
                        reason: remaining.join("; "),
                    });
                }
                clamped
            }
        };

        Ok(DeclineFit {
            model: params.model(),
            params,
            origin: segment.start_date,
            quality: None,
            source: FitSource::Seed,
        })
    }

    /// Regress the Arps family on `samples` and select one form.
    ///
    /// Zero-rate samples are left out (relative residuals are undefined
    /// there); time zero is the first positive sample.
    pub fn fit_samples(
        &self,
        well_id: &str,
        segment: usize,
        samples: &[Sample],
        diagnostics: &mut Diagnostics,
    ) -> Result<DeclineFit, EngineError> {
        let usable: Vec<&Sample> = samples.iter().filter(|s| s.rate > 0.0).collect();
        let zeros = samples.len() - usable.len();
        if zeros > 0 {
            diagnostics.record(
                well_id,
                Some(segment),
                DiagnosticKind::ZeroRateExcluded,
                format!("{zeros} zero-rate sample(s) excluded from regression"),
            );
        }

        let Some(first) = usable.first() else {
            return Err(self.insufficient(well_id, segment, 0));
        };
        if usable.len() < MIN_FIT_SAMPLES {
            return Err(self.insufficient(well_id, segment, usable.len()));
        }

        let origin = first.date;
        let t: Vec<f64> = usable.iter().map(|s| elapsed_months(origin, s.date)).collect();
        let q: Vec<f64> = usable.iter().map(|s| s.rate).collect();

        let mut eligible = vec![DeclineModel::Exponential];
        if usable.len() >= self.config.harmonic_min_samples {
            eligible.push(DeclineModel::Harmonic);
        }
        if usable.len() >= self.config.hyperbolic_min_samples {
            eligible.push(DeclineModel::Hyperbolic);
        }

        let mut best: Option<(DeclineModel, Candidate)> = None;
        let mut rejections = Vec::new();

        for model in eligible {
            match self.fit_candidate(model, &t, &q) {
                Ok(candidate) => {
                    debug!(
                        well = %well_id,
                        segment,
                        model = %model,
                        score = candidate.score,
                        iterations = candidate.iterations,
                        qi = candidate.params.qi,
                        b = candidate.params.b,
                        di = candidate.params.di,
                        "Candidate fitted"
                    );
                    let replaces = best.map_or(true, |(_, current)| {
                        improves_on(candidate.score, current.score, self.config.parsimony_margin)
                    });
                    if replaces {
                        best = Some((model, candidate));
                    }
                }
                Err(reason) => {
                    diagnostics.record(
                        well_id,
                        Some(segment),
                        DiagnosticKind::CandidateRejected,
                        format!("{model} candidate rejected: {reason}"),
                    );
                    rejections.push(format!("{model}: {reason}"));
                }
            }
        }

        let Some((model, chosen)) = best else {
            return Err(EngineError::UnfittableSegment {
                well_id: well_id.to_string(),
                segment,
                reason: rejections.join("; "),
            });
        };

        Ok(DeclineFit {
            model,
            params: chosen.params,
            origin,
            quality: Some(quality(&chosen, &t, &q)),
            source: FitSource::Regression,
        })
    }

    fn fit_candidate(&self, model: DeclineModel, t: &[f64], q: &[f64]) -> Result<Candidate, String> {
        let problem = ArpsProblem { model, t, q };
        let settings = SolverSettings {
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
        };

        let (exp_qi, exp_di) = exponential_seed(t, q);
        let starts: Vec<Vec<f64>> = match model {
            DeclineModel::Exponential => vec![vec![exp_qi.ln(), exp_di.ln()]],
            DeclineModel::Harmonic => {
                let (qi, di) = harmonic_seed(t, q).unwrap_or((exp_qi, exp_di));
                vec![vec![qi.ln(), di.ln()]]
            }
            DeclineModel::Hyperbolic => HYPERBOLIC_B_STARTS
                .iter()
                .map(|&b| vec![exp_qi.ln(), exp_di.ln(), b])
                .collect(),
        };

        let mut best: Option<(Vec<f64>, f64, usize)> = None;
        let mut last_failure = String::from("no starting point");
        for start in starts {
            let outcome = levenberg_marquardt(&problem, &start, settings);
            if !outcome.cost.is_finite() {
                last_failure = "residuals are not finite".to_string();
                continue;
            }
            if !outcome.converged {
                last_failure = format!("did not converge within {} iterations", outcome.iterations);
                continue;
            }
            if best.as_ref().map_or(true, |(_, cost, _)| outcome.cost < *cost) {
                best = Some((outcome.params, outcome.cost, outcome.iterations));
            }
        }

        let (x, cost, iterations) = best.ok_or(last_failure)?;
        let params = problem.params_from(&x);

        if let Some(pinned) = pinned_bound(model, &x) {
            return Err(pinned);
        }
        let violations = params.violations();
        if !violations.is_empty() {
            return Err(violations.join("; "));
        }

        Ok(Candidate {
            params,
            score: cost,
            iterations,
        })
    }

    fn insufficient(&self, well_id: &str, segment: usize, available: usize) -> EngineError {
        EngineError::InsufficientData {
            well_id: well_id.to_string(),
            segment: Some(segment),
            available,
            required: MIN_FIT_SAMPLES,
        }
    }
}

/// Describe the bound a solution is stuck on, if any.
fn pinned_bound(model: DeclineModel, x: &[f64]) -> Option<String> {
    let ln_di = x[1];
    if ln_di <= MIN_DECLINE_RATE.ln() + BOUND_EPSILON {
        return Some(format!("decline pinned at lower bound {MIN_DECLINE_RATE}"));
    }
    if ln_di >= MAX_DECLINE_RATE.ln() - BOUND_EPSILON {
        return Some(format!("decline pinned at upper bound {MAX_DECLINE_RATE}"));
    }
    if model == DeclineModel::Hyperbolic {
        let b = x[2];
        if b <= HYPERBOLIC_B_MIN + BOUND_EPSILON || b >= HYPERBOLIC_B_MAX - BOUND_EPSILON {
            return Some(format!("b pinned at {b}"));
        }
    }
    None
}

fn quality(candidate: &Candidate, t: &[f64], q: &[f64]) -> FitQuality {
    let n = q.len() as f64;
    let q_mean = q.iter().mean();
    let ss_res: f64 = t
        .iter()
        .zip(q)
        .map(|(&ti, &qi)| (arps::rate(&candidate.params, ti) - qi).powi(2))
        .sum();
    let ss_tot: f64 = q.iter().map(|v| (v - q_mean).powi(2)).sum();

    FitQuality {
        score: candidate.score,
        rmse: (ss_res / n).sqrt(),
        r_squared: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 },
        iterations: candidate.iterations,
        sample_count: q.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Months, NaiveDate};

    fn month(k: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .checked_add_months(Months::new(k))
            .unwrap()
    }

    fn series(rates: &[f64]) -> Vec<Sample> {
        rates
            .iter()
            .enumerate()
            .map(|(k, &rate)| Sample {
                well_id: "W1".to_string(),
                date: month(k as u32),
                rate,
            })
            .collect()
    }

    fn synthetic(p: ArpsParams, months: usize) -> Vec<Sample> {
        let rates: Vec<f64> = (0..months).map(|k| arps::rate(&p, k as f64)).collect();
        series(&rates)
    }

    fn fitter() -> CurveFitter {
        CurveFitter::new(&FitterConfig::default())
    }

    fn segment(samples: Vec<Sample>, seed: Option<ArpsParams>) -> Segment {
        Segment {
            well_id: "W1".to_string(),
            index: 0,
            start_date: month(0),
            end_date: None,
            samples,
            trigger: None,
            seed,
            fit: None,
        }
    }

    #[test]
    fn test_w1_is_exponential() {
        let mut diags = Diagnostics::new();
        let fit = fitter()
            .fit_samples("W1", 0, &series(&[1000.0, 900.0, 810.0]), &mut diags)
            .expect("W1 fits");

        assert_eq!(fit.model, DeclineModel::Exponential);
        assert_eq!(fit.params.b, 0.0);
        assert!((fit.params.di - 0.105_360_5).abs() < 1e-6, "di = {}", fit.params.di);
        assert!((fit.params.qi - 1000.0).abs() < 1e-6, "qi = {}", fit.params.qi);
        assert_eq!(fit.origin, month(0));
        assert_eq!(fit.source, FitSource::Regression);
    }

    #[test]
    fn test_two_samples_fit_exponential_only() {
        let fit = fitter()
            .fit_samples("W1", 0, &series(&[500.0, 450.0]), &mut Diagnostics::new())
            .expect("two samples fit");
        assert_eq!(fit.model, DeclineModel::Exponential);
        assert!((arps::rate(&fit.params, 1.0) - 450.0).abs() < 1e-6);
    }

    #[test]
    fn test_one_sample_is_insufficient() {
        let err = fitter()
            .fit_samples("W1", 2, &series(&[500.0]), &mut Diagnostics::new())
            .unwrap_err();
        assert_eq!(err.segment(), Some(2));
        assert_eq!(
            err,
            EngineError::InsufficientData {
                well_id: "W1".to_string(),
                segment: Some(2),
                available: 1,
                required: 2,
            }
        );
    }

    #[test]
    fn test_hyperbolic_recovered() {
        let truth = ArpsParams::new(1200.0, 0.6, 0.15);
        let fit = fitter()
            .fit_samples("W1", 0, &synthetic(truth, 24), &mut Diagnostics::new())
            .expect("hyperbolic fits");

        assert_eq!(fit.model, DeclineModel::Hyperbolic);
        assert!((fit.params.b - 0.6).abs() < 1e-4, "b = {}", fit.params.b);
        assert!((fit.params.di - 0.15).abs() < 1e-4, "di = {}", fit.params.di);
        assert!((fit.params.qi - 1200.0).abs() / 1200.0 < 1e-4);
        let quality = fit.quality.expect("regressed fit has quality");
        assert!(quality.r_squared > 0.999_999);
        assert_eq!(quality.sample_count, 24);
    }

    #[test]
    fn test_harmonic_recovered() {
        let truth = ArpsParams::harmonic(800.0, 0.2);
        let mut diags = Diagnostics::new();
        let fit = fitter()
            .fit_samples("W1", 0, &synthetic(truth, 18), &mut diags)
            .expect("harmonic fits");

        assert_eq!(fit.model, DeclineModel::Harmonic);
        assert!((fit.params.di - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_exponential_preferred_on_tie() {
        // An exact exponential fit cannot be beaten
        let truth = ArpsParams::exponential(600.0, 0.05);
        let mut diags = Diagnostics::new();
        let fit = fitter()
            .fit_samples("W1", 0, &synthetic(truth, 12), &mut diags)
            .expect("exponential fits");
        assert_eq!(fit.model, DeclineModel::Exponential);
    }

    #[test]
    fn test_best_score_wins_by_default() {
        let margin = FitterConfig::default().parsimony_margin;
        // Half a percent better is still better
        assert!(improves_on(0.995e-3, 1e-3, margin));
        assert!(!improves_on(1e-3, 1e-3, margin));
        // Exact fits tie in favour of the simpler form
        assert!(!improves_on(1e-20, 1e-25, margin));
        assert!(!improves_on(0.995e-3, 1e-3, 0.01));
    }

    #[test]
    fn test_increasing_rates_are_unfittable() {
        let mut diags = Diagnostics::new();
        let err = fitter()
            .fit_samples("W1", 0, &series(&[100.0, 120.0, 140.0, 160.0, 180.0]), &mut diags)
            .unwrap_err();

        assert!(matches!(err, EngineError::UnfittableSegment { segment: 0, .. }));
        assert_eq!(diags.count(DiagnosticKind::CandidateRejected), 3);
    }

    #[test]
    fn test_zero_rates_excluded_and_reported() {
        let mut diags = Diagnostics::new();
        let fit = fitter()
            .fit_samples("W1", 0, &series(&[0.0, 1000.0, 900.0, 0.0, 729.0]), &mut diags)
            .expect("positive samples fit");

        assert_eq!(diags.count(DiagnosticKind::ZeroRateExcluded), 1);
        // Time zero moves to the first positive sample
        assert_eq!(fit.origin, month(1));
        assert!((fit.params.qi - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_zero_segment_is_insufficient() {
        let result = fitter().fit_samples("W1", 0, &series(&[0.0, 0.0, 0.0]), &mut Diagnostics::new());
        assert!(matches!(result, Err(EngineError::InsufficientData { available: 0, .. })));
    }

    #[test]
    fn test_seed_used_without_regression() {
        let seed = ArpsParams::new(700.0, 0.4, 0.08);
        let mut seg = segment(Vec::new(), Some(seed));
        fitter().fit_segment(&mut seg, &mut Diagnostics::new()).expect("valid seed");

        let fit = seg.fit.expect("fit attached");
        assert_eq!(fit.params, seed);
        assert_eq!(fit.source, FitSource::Seed);
        assert!(fit.quality.is_none());
    }

    #[test]
    fn test_invalid_seed_rejected_by_default() {
        let mut seg = segment(Vec::new(), Some(ArpsParams::new(700.0, 1.4, 0.08)));
        let err = fitter().fit_segment(&mut seg, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameters { segment: 0, .. }));
        assert!(seg.fit.is_none());
    }

    #[test]
    fn test_invalid_seed_clamped_when_configured() {
        let config = FitterConfig {
            parameter_policy: ParameterPolicy::Clamp,
            ..FitterConfig::default()
        };
        let mut seg = segment(Vec::new(), Some(ArpsParams::new(700.0, 1.4, 0.08)));
        let mut diags = Diagnostics::new();
        CurveFitter::new(&config)
            .fit_segment(&mut seg, &mut diags)
            .expect("clamped seed");

        assert_eq!(seg.model(), Some(DeclineModel::Harmonic));
        assert_eq!(diags.count(DiagnosticKind::ParameterClamped), 1);
    }

    #[test]
    fn test_harmonic_seed_exact_on_harmonic_data() {
        let t = [0.0, 1.0, 2.0, 3.0];
        let q: Vec<f64> = t.iter().map(|&x| 500.0 / (1.0 + 0.25 * x)).collect();
        let (qi, di) = harmonic_seed(&t, &q).expect("declining data");
        assert!((qi - 500.0).abs() < 1e-9);
        assert!((di - 0.25).abs() < 1e-12);
    }
}
