//! Arps decline parameters and model family.

use serde::{Deserialize, Serialize};

/// The three forms of the Arps decline family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineModel {
    /// b = 0
    Exponential,
    /// 0 < b < 1
    Hyperbolic,
    /// b = 1
    Harmonic,
}

impl DeclineModel {
    /// Number of parameters estimated by regression for this form.
    pub fn free_parameters(self) -> usize {
        match self {
            Self::Exponential | Self::Harmonic => 2,
            Self::Hyperbolic => 3,
        }
    }
}

impl std::fmt::Display for DeclineModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exponential => write!(f, "exponential"),
            Self::Hyperbolic => write!(f, "hyperbolic"),
            Self::Harmonic => write!(f, "harmonic"),
        }
    }
}

/// Arps decline parameters.
///
/// Time is measured in months from the segment's first sample, so `di` is a
/// nominal decline per month and `qi` is the rate at that first sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArpsParams {
    /// Initial rate (per day)
    pub qi: f64,
    /// Decline exponent
    pub b: f64,
    /// Initial nominal decline rate (1/month)
    pub di: f64,
}

impl ArpsParams {
    pub fn new(qi: f64, b: f64, di: f64) -> Self {
        Self { qi, b, di }
    }

    pub fn exponential(qi: f64, di: f64) -> Self {
        Self { qi, b: 0.0, di }
    }

    pub fn harmonic(qi: f64, di: f64) -> Self {
        Self { qi, b: 1.0, di }
    }

    /// The form implied by `b`. Only meaningful for params that satisfy
    /// the invariants.
    pub fn model(&self) -> DeclineModel {
        if self.b == 0.0 {
            DeclineModel::Exponential
        } else if self.b == 1.0 {
            DeclineModel::Harmonic
        } else {
            DeclineModel::Hyperbolic
        }
    }

    /// List every invariant this parameter set violates.
    ///
    /// Invariants: all finite, `qi > 0`, `di > 0`, `0 <= b <= 1`.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.qi.is_finite() || self.qi <= 0.0 {
            errors.push(format!("qi must be a finite value > 0 (got {})", self.qi));
        }
        if !self.di.is_finite() || self.di <= 0.0 {
            errors.push(format!("di must be a finite value > 0 (got {})", self.di));
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            errors.push(format!("b must be within [0, 1] (got {})", self.b));
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }

    /// Force the parameters into range, returning one note per adjusted field.
    ///
    /// Non-finite values cannot be clamped meaningfully and are returned
    /// untouched, so the result must still be checked with `violations()`.
    pub fn clamped(&self, floor: f64) -> (Self, Vec<String>) {
        let mut out = *self;
        let mut notes = Vec::new();

        if self.qi.is_finite() && self.qi <= 0.0 {
            out.qi = floor;
            notes.push(format!("qi clamped from {} to {}", self.qi, floor));
        }
        if self.di.is_finite() && self.di <= 0.0 {
            out.di = floor;
            notes.push(format!("di clamped from {} to {}", self.di, floor));
        }
        if self.b.is_finite() && !(0.0..=1.0).contains(&self.b) {
            out.b = self.b.clamp(0.0, 1.0);
            notes.push(format!("b clamped from {} to {}", self.b, out.b));
        }

        (out, notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_exponent() {
        assert_eq!(ArpsParams::new(100.0, 0.0, 0.1).model(), DeclineModel::Exponential);
        assert_eq!(ArpsParams::new(100.0, 1.0, 0.1).model(), DeclineModel::Harmonic);
        assert_eq!(ArpsParams::new(100.0, 0.4, 0.1).model(), DeclineModel::Hyperbolic);
    }

    #[test]
    fn test_valid_params_have_no_violations() {
        assert!(ArpsParams::new(500.0, 0.5, 0.05).is_valid());
        assert!(ArpsParams::exponential(1.0, 1e-6).is_valid());
    }

    #[test]
    fn test_each_invariant_reported() {
        let bad = ArpsParams::new(-1.0, 1.5, 0.0);
        let v = bad.violations();
        assert_eq!(v.len(), 3);
        assert!(v[0].contains("qi"));
        assert!(v[1].contains("di"));
        assert!(v[2].contains('b'));
    }

    #[test]
    fn test_nan_is_a_violation() {
        assert!(!ArpsParams::new(f64::NAN, 0.5, 0.1).is_valid());
        assert!(!ArpsParams::new(100.0, f64::INFINITY, 0.1).is_valid());
    }

    #[test]
    fn test_clamp_records_each_adjustment() {
        let (p, notes) = ArpsParams::new(100.0, 1.3, -0.2).clamped(1e-6);
        assert!(p.is_valid());
        assert_eq!(p.b, 1.0);
        assert_eq!(p.di, 1e-6);
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn test_clamp_leaves_nan_for_rejection() {
        let (p, notes) = ArpsParams::new(f64::NAN, 0.5, 0.1).clamped(1e-6);
        assert!(notes.is_empty());
        assert!(!p.is_valid());
    }
}
