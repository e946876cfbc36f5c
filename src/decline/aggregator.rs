//! Field Aggregation
//!
//! Sums per-well forecasts onto one calendar. Monthly points are keyed by
//! the first day of their month, daily points by their date, so wells whose
//! last observations fall on different days of the month still line up.
//!
//! The calendar is monthly as soon as one well forecasts monthly. Daily
//! forecasts are resampled onto it: each month takes the mean of the well's
//! daily rates in it and the sum of their period volumes.
//!
//! Aggregation is never all-or-nothing: a well that cannot be aligned is
//! excluded with a `CalendarMismatch` and reported next to the wells that
//! failed upstream.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{info, warn};

use super::calendar::{next_slot, slot};
use crate::types::{
    AggregatePoint, AggregateSeries, Cadence, EngineError, WellFailure, WellForecast,
};

#[derive(Debug, Default, Clone, Copy)]
struct SlotTotals {
    rate: f64,
    period_volume: f64,
    active_wells: usize,
}

/// Calendar-aligned summation of well forecasts
pub struct Aggregator;

impl Aggregator {
    /// Aggregate `outcomes` under `group_key`.
    ///
    /// The result is independent of input order: wells are summed in well id
    /// order and every list in the output is sorted by well id.
    pub fn aggregate(
        group_key: &str,
        outcomes: &[Result<WellForecast, EngineError>],
    ) -> AggregateSeries {
        let mut failed: Vec<WellFailure> = Vec::new();
        let mut wells: Vec<&WellForecast> = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(forecast) => wells.push(forecast),
                Err(error) => failed.push(WellFailure {
                    well_id: error.well_id().to_string(),
                    error: error.clone(),
                }),
            }
        }
        wells.sort_by(|a, b| a.well_id.cmp(&b.well_id));

        let cadence = Self::unified_cadence(&wells);
        let mut totals: BTreeMap<NaiveDate, SlotTotals> = BTreeMap::new();
        let mut contributing: Vec<String> = Vec::with_capacity(wells.len());

        for well in wells {
            let slots = match Self::resample(well, cadence) {
                Ok(slots) => slots,
                Err(error) => {
                    warn!(group = %group_key, well = %well.well_id, error = %error, "Well excluded from aggregate");
                    failed.push(WellFailure {
                        well_id: well.well_id.clone(),
                        error,
                    });
                    continue;
                }
            };
            for (date, well_slot) in slots {
                let entry = totals.entry(date).or_default();
                entry.rate += well_slot.rate;
                entry.period_volume += well_slot.period_volume;
                entry.active_wells += well_slot.active_wells;
            }
            contributing.push(well.well_id.clone());
        }

        failed.sort_by(|a, b| a.well_id.cmp(&b.well_id));
        let points = Self::fill_calendar(cadence, &totals);

        info!(
            group = %group_key,
            cadence = %cadence,
            wells = contributing.len(),
            failed = failed.len(),
            slots = points.len(),
            "Aggregate built"
        );

        AggregateSeries {
            group_key: group_key.to_string(),
            cadence,
            points,
            contributing_wells: contributing,
            failed_wells: failed,
        }
    }

    /// Daily only when every well is daily; monthly otherwise or when empty.
    fn unified_cadence(wells: &[&WellForecast]) -> Cadence {
        if !wells.is_empty() && wells.iter().all(|w| w.cadence == Cadence::Daily) {
            Cadence::Daily
        } else {
            Cadence::Monthly
        }
    }

    /// One well's forecast on the `cadence` calendar, one entry per slot.
    ///
    /// # Errors
    /// `CalendarMismatch` when two points share a slot of the well's own
    /// cadence, or when a monthly forecast would have to be split into days.
    fn resample(
        well: &WellForecast,
        cadence: Cadence,
    ) -> Result<BTreeMap<NaiveDate, SlotTotals>, EngineError> {
        let mismatch = |reason: String| EngineError::CalendarMismatch {
            well_id: well.well_id.clone(),
            expected: cadence,
            reason,
        };
        if well.cadence == Cadence::Monthly && cadence == Cadence::Daily {
            return Err(mismatch("a monthly forecast cannot be split into days".to_string()));
        }

        let mut own_slots = BTreeSet::new();
        // (rate sum, period volume, point count) per target slot
        let mut buckets: BTreeMap<NaiveDate, (f64, f64, usize)> = BTreeMap::new();
        for point in &well.points {
            let own = slot(well.cadence, point.date);
            if !own_slots.insert(own) {
                return Err(mismatch(format!(
                    "two {} forecast points fall in calendar slot {own}",
                    well.cadence
                )));
            }
            let bucket = buckets.entry(slot(cadence, point.date)).or_default();
            bucket.0 += point.rate;
            bucket.1 += point.period_volume;
            bucket.2 += 1;
        }

        // Rates are per day, so a month of daily points reports their mean
        Ok(buckets
            .into_iter()
            .map(|(date, (rate_sum, period_volume, count))| {
                let totals = SlotTotals {
                    rate: rate_sum / count as f64,
                    period_volume,
                    active_wells: 1,
                };
                (date, totals)
            })
            .collect())
    }

    /// Every slot from the first to the last, zero where no well reports.
    fn fill_calendar(cadence: Cadence, totals: &BTreeMap<NaiveDate, SlotTotals>) -> Vec<AggregatePoint> {
        let (Some(&first), Some(&last)) = (totals.keys().next(), totals.keys().next_back()) else {
            return Vec::new();
        };

        let mut points = Vec::with_capacity(totals.len());
        let mut current = Some(first);
        while let Some(date) = current.filter(|d| *d <= last) {
            let t = totals.get(&date).copied().unwrap_or_default();
            points.push(AggregatePoint {
                date,
                rate: t.rate,
                period_volume: t.period_volume,
                active_wells: t.active_wells,
            });
            current = next_slot(cadence, date);
        }
        points
    }
}

/// Aggregate per-well outcomes under `group_key`.
pub fn aggregate(
    group_key: &str,
    outcomes: &[Result<WellForecast, EngineError>],
) -> AggregateSeries {
    Aggregator::aggregate(group_key, outcomes)
}
