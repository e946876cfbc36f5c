//! Calendar arithmetic for decline time and forecast cadences.
//!
//! Elapsed time is measured in calendar months: whole months between the
//! two dates plus the fraction of the following month. Monthly samples on
//! the same day of month are therefore exactly 1.0 apart regardless of
//! month length.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::types::Cadence;

/// Add `months` calendar months, clamping the day to the month's end.
fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Elapsed calendar months from `from` to `to`. Negative when `to < from`.
pub fn elapsed_months(from: NaiveDate, to: NaiveDate) -> f64 {
    if to < from {
        return -elapsed_months(to, from);
    }

    let mut whole = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let mut anchor = month_anchor(from, whole);
    while whole > 0 && anchor.map_or(true, |a| a > to) {
        whole -= 1;
        anchor = month_anchor(from, whole);
    }

    let (Some(anchor), Some(next)) = (anchor, month_anchor(from, whole + 1)) else {
        // Only reachable at the very end of chrono's date range
        return (to - from).num_days() as f64 / crate::config::defaults::DAYS_PER_MONTH;
    };

    let span = (next - anchor).num_days() as f64;
    let rest = (to - anchor).num_days() as f64;
    whole as f64 + rest / span
}

fn month_anchor(from: NaiveDate, whole: i32) -> Option<NaiveDate> {
    u32::try_from(whole).ok().and_then(|m| add_months(from, m))
}

/// Length in days of the `m`-th month after `origin`: the span between its
/// m-th and (m+1)-th monthly anniversaries, the unit `elapsed_months`
/// counts in.
pub fn month_length(origin: NaiveDate, m: u32) -> Option<f64> {
    let start = add_months(origin, m)?;
    let end = add_months(origin, m.checked_add(1)?)?;
    Some((end - start).num_days() as f64)
}

/// The `k`-th date after `anchor` at the given cadence (`k = 0` is the anchor).
///
/// Each step is computed from the anchor, never from the previous step, so
/// month-end anchors do not drift.
pub fn step(cadence: Cadence, anchor: NaiveDate, k: usize) -> Option<NaiveDate> {
    match cadence {
        Cadence::Daily => anchor.checked_add_days(Days::new(k as u64)),
        Cadence::Monthly => u32::try_from(k).ok().and_then(|m| add_months(anchor, m)),
    }
}

/// Calendar slot a date belongs to: the date itself for daily cadence, the
/// first of its month for monthly cadence.
pub fn slot(cadence: Cadence, date: NaiveDate) -> NaiveDate {
    match cadence {
        Cadence::Daily => date,
        Cadence::Monthly => date.with_day(1).unwrap_or(date),
    }
}

/// The slot following `slot` at the given cadence.
pub fn next_slot(cadence: Cadence, slot: NaiveDate) -> Option<NaiveDate> {
    step(cadence, slot, 1)
}
