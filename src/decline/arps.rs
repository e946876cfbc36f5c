//! Arps decline equations
//!
//! Closed-form rate, cumulative and time-to-rate for the three Arps forms.
//! Time `t` is in months since the segment origin; rates are per day.
//!
//! - Exponential (b = 0): q = qi·e^(-Di·t),  Np = qi/Di·(1 - e^(-Di·t))
//! - Hyperbolic (0<b<1): q = qi/(1 + b·Di·t)^(1/b),
//!   Np = qi/((1-b)·Di)·(1 - (1 + b·Di·t)^((b-1)/b))
//! - Harmonic (b = 1): q = qi/(1 + Di·t),  Np = qi/Di·ln(1 + Di·t)
//!
//! The harmonic cumulative has its own logarithmic form; the general
//! hyperbolic expression divides by (1 - b) and is undefined there.
//!
//! `cumulative` is in rate × months. Volumes convert it month by month with
//! the real length of each month counted from the segment origin, so
//! dV = q · days_in_month · dt.

use chrono::NaiveDate;

use super::calendar::month_length;
use crate::config::defaults::{CALENDAR_WALK_MONTHS, DAYS_PER_MONTH};
use crate::types::{ArpsParams, DeclineModel};

/// Rate at `t` months.
pub fn rate(p: &ArpsParams, t: f64) -> f64 {
    match p.model() {
        DeclineModel::Exponential => p.qi * (-p.di * t).exp(),
        DeclineModel::Harmonic => p.qi / (1.0 + p.di * t),
        DeclineModel::Hyperbolic => p.qi * (-(p.b * p.di * t).ln_1p() / p.b).exp(),
    }
}

/// Area under the rate curve from 0 to `t`, in rate × months.
pub fn cumulative(p: &ArpsParams, t: f64) -> f64 {
    match p.model() {
        DeclineModel::Exponential => p.qi / p.di * -(-p.di * t).exp_m1(),
        DeclineModel::Harmonic => p.qi / p.di * (p.di * t).ln_1p(),
        DeclineModel::Hyperbolic => {
            let exponent = (p.b - 1.0) / p.b * (p.b * p.di * t).ln_1p();
            p.qi / ((1.0 - p.b) * p.di) * -exponent.exp_m1()
        }
    }
}

/// Produced volume from the origin to `t` months, in rate × days.
pub fn cumulative_volume(p: &ArpsParams, origin: NaiveDate, t: f64) -> f64 {
    volume_between(p, origin, 0.0, t)
}

/// Produced volume between `t0` and `t1` months after `origin`, in
/// rate × days. Empty or reversed intervals produce nothing.
///
/// Months past `CALENDAR_WALK_MONTHS` use the mean month length.
pub fn volume_between(p: &ArpsParams, origin: NaiveDate, t0: f64, t1: f64) -> f64 {
    let mut volume = 0.0;
    let mut lo = t0;
    while lo < t1 {
        let m = lo.floor();
        if m >= CALENDAR_WALK_MONTHS {
            volume += (cumulative(p, t1) - cumulative(p, lo)) * DAYS_PER_MONTH;
            break;
        }
        let hi = (m + 1.0).min(t1);
        let days = if m < 0.0 {
            DAYS_PER_MONTH
        } else {
            month_length(origin, m as u32).unwrap_or(DAYS_PER_MONTH)
        };
        volume += (cumulative(p, hi) - cumulative(p, lo)) * days;
        lo = hi;
    }
    volume
}

/// Months until the rate falls to `limit`.
///
/// Zero when the initial rate is already at or below the limit; `None` for
/// a non-positive limit, which a declining curve never reaches.
pub fn time_to_rate(p: &ArpsParams, limit: f64) -> Option<f64> {
    if !limit.is_finite() || limit <= 0.0 {
        return None;
    }
    if limit >= p.qi {
        return Some(0.0);
    }
    let ratio = p.qi / limit;
    let t = match p.model() {
        DeclineModel::Exponential => ratio.ln() / p.di,
        DeclineModel::Harmonic => (ratio - 1.0) / p.di,
        DeclineModel::Hyperbolic => (ratio.powf(p.b) - 1.0) / (p.b * p.di),
    };
    Some(t)
}

/// Volume from the origin until the rate falls to `limit`.
pub fn volume_to_limit(p: &ArpsParams, origin: NaiveDate, limit: f64) -> Option<f64> {
    time_to_rate(p, limit).map(|t| cumulative_volume(p, origin, t))
}

/// Instantaneous nominal decline at `t`, D(t) = Di / (1 + b·Di·t).
pub fn decline_at(p: &ArpsParams, t: f64) -> f64 {
    p.di / (1.0 + p.b * p.di * t)
}
