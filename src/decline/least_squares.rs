//! Bounded Levenberg–Marquardt nonlinear least squares
//!
//! Minimizes Σ rᵢ(θ)² for small parameter vectors (2-3 entries). Each
//! iteration solves the damped normal equations
//!
//! (JᵀJ + λ·diag(JᵀJ))·δ = -Jᵀr
//!
//! with Gaussian elimination and projects the step onto the parameter box.
//! The iteration count is capped; reaching the cap is reported as
//! non-convergence rather than looping further.

/// A residual model to be minimized.
pub trait LeastSquaresProblem {
    fn parameter_count(&self) -> usize;

    fn observation_count(&self) -> usize;

    /// Fill `residuals` (len n) and the row-major Jacobian `jacobian`
    /// (len n × p) at `params`.
    fn evaluate(&self, params: &[f64], residuals: &mut [f64], jacobian: &mut [f64]);

    /// Inclusive (lower, upper) bound per parameter.
    fn bounds(&self) -> Vec<(f64, f64)> {
        vec![(f64::NEG_INFINITY, f64::INFINITY); self.parameter_count()]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Relative cost reduction that counts as converged
    pub tolerance: f64,
}

#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub params: Vec<f64>,
    /// Σ r² at `params`
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e12;
const MIN_DAMPING: f64 = 1e-12;
const GRADIENT_TOLERANCE: f64 = 1e-14;
const STEP_TOLERANCE: f64 = 1e-12;
/// Cost at which the model reproduces the data to rounding
const EXACT_FIT_COST: f64 = 1e-26;

fn project(params: &mut [f64], bounds: &[(f64, f64)]) {
    for (x, &(lo, hi)) in params.iter_mut().zip(bounds) {
        *x = x.clamp(lo, hi);
    }
}

fn sum_squares(values: &[f64]) -> f64 {
    values.iter().map(|r| r * r).sum()
}

/// Solve `a·x = b` for a small dense system (row-major `a`, size m×m).
fn solve_linear(mut a: Vec<f64>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let m = b.len();
    for col in 0..m {
        let pivot = (col..m).max_by(|&i, &j| {
            a[i * m + col]
                .abs()
                .partial_cmp(&a[j * m + col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot * m + col].abs() < 1e-300 || !a[pivot * m + col].is_finite() {
            return None;
        }
        if pivot != col {
            for k in 0..m {
                a.swap(col * m + k, pivot * m + k);
            }
            b.swap(col, pivot);
        }
        for row in (col + 1)..m {
            let factor = a[row * m + col] / a[col * m + col];
            for k in col..m {
                a[row * m + k] -= factor * a[col * m + k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; m];
    for row in (0..m).rev() {
        let tail: f64 = ((row + 1)..m).map(|k| a[row * m + k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row * m + row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Run bounded Levenberg–Marquardt from `initial`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    initial: &[f64],
    settings: SolverSettings,
) -> SolverOutcome {
    let p = problem.parameter_count();
    let n = problem.observation_count();
    let bounds = problem.bounds();

    let mut x = initial.to_vec();
    project(&mut x, &bounds);

    let mut r = vec![0.0; n];
    let mut j = vec![0.0; n * p];
    problem.evaluate(&x, &mut r, &mut j);
    let mut cost = sum_squares(&r);

    if !cost.is_finite() {
        return SolverOutcome { params: x, cost, iterations: 0, converged: false };
    }

    let mut lambda = INITIAL_DAMPING;
    let mut trial_r = vec![0.0; n];
    let mut trial_j = vec![0.0; n * p];

    for iteration in 1..=settings.max_iterations {
        if cost <= EXACT_FIT_COST {
            return SolverOutcome { params: x, cost, iterations: iteration - 1, converged: true };
        }

        // Normal equations: A = JᵀJ, g = Jᵀr
        let mut a = vec![0.0; p * p];
        let mut g = vec![0.0; p];
        for i in 0..n {
            let row = &j[i * p..(i + 1) * p];
            for c in 0..p {
                g[c] += row[c] * r[i];
                for k in 0..p {
                    a[c * p + k] += row[c] * row[k];
                }
            }
        }

        if g.iter().all(|v| v.abs() < GRADIENT_TOLERANCE) {
            return SolverOutcome { params: x, cost, iterations: iteration - 1, converged: true };
        }

        // Damped step search
        let mut accepted = None;
        while lambda <= MAX_DAMPING {
            let mut damped = a.clone();
            for c in 0..p {
                damped[c * p + c] += lambda * a[c * p + c].max(1e-12);
            }
            let rhs: Vec<f64> = g.iter().map(|v| -v).collect();

            if let Some(delta) = solve_linear(damped, rhs) {
                let mut candidate: Vec<f64> = x.iter().zip(&delta).map(|(xi, di)| xi + di).collect();
                project(&mut candidate, &bounds);
                problem.evaluate(&candidate, &mut trial_r, &mut trial_j);
                let trial_cost = sum_squares(&trial_r);
                if trial_cost.is_finite() && trial_cost < cost {
                    accepted = Some((candidate, trial_cost));
                    lambda = (lambda / 10.0).max(MIN_DAMPING);
                    break;
                }
            }
            lambda *= 10.0;
        }

        // No descent direction left: we are at a (possibly bounded) minimum
        let Some((candidate, trial_cost)) = accepted else {
            return SolverOutcome { params: x, cost, iterations: iteration, converged: true };
        };

        let step: f64 = candidate
            .iter()
            .zip(&x)
            .map(|(new, old)| (new - old).abs() / (1.0 + old.abs()))
            .fold(0.0, f64::max);
        let reduction = (cost - trial_cost) / cost;

        x = candidate;
        cost = trial_cost;
        std::mem::swap(&mut r, &mut trial_r);
        std::mem::swap(&mut j, &mut trial_j);

        if reduction < settings.tolerance || step < STEP_TOLERANCE {
            return SolverOutcome { params: x, cost, iterations: iteration, converged: true };
        }
    }

    SolverOutcome {
        params: x,
        cost,
        iterations: settings.max_iterations,
        converged: false,
    }
}
