//! Water cut from paired oil and liquid rates.

use std::collections::BTreeMap;

use crate::types::{ForecastPoint, WaterCutPoint};

/// Water cut in percent: (liquid - oil) / liquid × 100, clamped to [0, 100].
///
/// Zero when there is no liquid production.
pub fn water_cut_percent(oil_rate: f64, liquid_rate: f64) -> f64 {
    if liquid_rate.is_nan() || liquid_rate <= 0.0 {
        return 0.0;
    }
    let cut = (liquid_rate - oil_rate) / liquid_rate * 100.0;
    if cut.is_nan() {
        return 0.0;
    }
    cut.clamp(0.0, 100.0)
}

/// Pair an oil and a liquid forecast of one well by date.
///
/// Dates present in only one of the two are skipped. Output is date-ordered.
pub fn merge_water_cut(oil: &[ForecastPoint], liquid: &[ForecastPoint]) -> Vec<WaterCutPoint> {
    let liquid_by_date: BTreeMap<_, f64> = liquid.iter().map(|p| (p.date, p.rate)).collect();

    let mut merged: Vec<WaterCutPoint> = oil
        .iter()
        .filter_map(|p| {
            liquid_by_date.get(&p.date).map(|&liquid_rate| WaterCutPoint {
                date: p.date,
                oil_rate: p.rate,
                liquid_rate,
                water_cut: water_cut_percent(p.rate, liquid_rate),
            })
        })
        .collect();
    merged.sort_by_key(|p| p.date);
    merged
}
