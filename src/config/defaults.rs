//! Engine-wide default constants.
//!
//! Centralises the numeric constants the pipeline relies on. Values that an
//! operator may reasonably tune live in `EngineConfig` instead; these are the
//! fallbacks it is built from.

// ============================================================================
// Calendar
// ============================================================================

/// Average days per month (365.25 / 12). Fallback month length where the
/// calendar cannot be walked.
pub const DAYS_PER_MONTH: f64 = 30.4375;

/// Months after a segment origin for which volumes use real month lengths
/// (1000 years). Beyond it the mean month length is used.
pub const CALENDAR_WALK_MONTHS: f64 = 12_000.0;

// ============================================================================
// Curve Fitter
// ============================================================================

/// Default cap on Levenberg–Marquardt iterations per candidate form.
pub const MAX_FIT_ITERATIONS: usize = 200;

/// Default relative cost-reduction tolerance for convergence.
pub const FIT_TOLERANCE: f64 = 1e-10;

/// Default relative score improvement a more complex form needs over a
/// simpler one before it is selected. Zero picks the best score, with exact
/// ties going to the simpler form.
pub const PARSIMONY_MARGIN: f64 = 0.0;

/// Minimum samples before the harmonic form is considered.
pub const HARMONIC_MIN_SAMPLES: usize = 3;

/// Minimum samples before the hyperbolic form is considered.
pub const HYPERBOLIC_MIN_SAMPLES: usize = 4;

/// Minimum samples for any regression (exponential form).
pub const MIN_FIT_SAMPLES: usize = 2;

/// Lower bound for a fitted nominal decline (1/month). A fit pinned here
/// means the data does not decline.
pub const MIN_DECLINE_RATE: f64 = 1e-6;

/// Upper bound for a fitted nominal decline (1/month).
pub const MAX_DECLINE_RATE: f64 = 1e3;

/// Box for the hyperbolic exponent. Fits pinned at either edge belong to
/// the exponential or harmonic candidates.
pub const HYPERBOLIC_B_MIN: f64 = 1e-3;
pub const HYPERBOLIC_B_MAX: f64 = 1.0 - 1e-3;

/// Starting exponents for the hyperbolic multi-start.
pub const HYPERBOLIC_B_STARTS: [f64; 3] = [0.25, 0.5, 0.75];

/// Replacement value for non-positive `qi`/`di` under the clamp policy.
pub const CLAMP_FLOOR: f64 = 1e-6;

// ============================================================================
// Forecaster
// ============================================================================

/// Default cap on points per forecast (100 years of monthly points).
pub const MAX_FORECAST_POINTS: usize = 1_200;

/// Neutral uptime factor for every calendar month.
pub const DEFAULT_UPTIME_FACTOR: f64 = 1.0;
