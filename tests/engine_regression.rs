//! Engine Regression Tests
//!
//! End-to-end behavior of the decline engine through its public API:
//! reference decline cases, fitting boundaries, forecast properties,
//! segmentation and field aggregation.

use chrono::{Months, NaiveDate};

use dca_engine::config::{DuplicatePolicy, EngineConfig};
use dca_engine::decline::arps;
use dca_engine::{
    merge_water_cut, ArpsParams, Cadence, DeclineEngine, DeclineModel, DiagnosticKind,
    Diagnostics, EngineError, ForecastHorizon, InterventionMarker, RawSample, Segmenter,
    SeriesNormalizer, WellInput,
};

// ============================================================================
// Helpers
// ============================================================================

fn month(k: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1)
        .unwrap()
        .checked_add_months(Months::new(k))
        .unwrap()
}

fn well(id: &str, rates: &[f64]) -> WellInput {
    WellInput::new(
        id,
        rates
            .iter()
            .enumerate()
            .map(|(k, &r)| RawSample::new(id, month(k as u32), r))
            .collect(),
    )
}

fn synthetic(id: &str, params: ArpsParams, months: u32) -> WellInput {
    let rates: Vec<f64> = (0..months).map(|k| arps::rate(&params, f64::from(k))).collect();
    well(id, &rates)
}

// ============================================================================
// Reference cases
// ============================================================================

#[test]
fn w1_fits_exponential_and_forecasts_next_three_months() {
    let out = DeclineEngine::default()
        .fit_and_forecast(&well("W1", &[1000.0, 900.0, 810.0]), &ForecastHorizon::until(month(5)))
        .expect("W1 forecasts");

    let fit = out.segments[0].fit.as_ref().expect("fitted");
    assert_eq!(fit.model, DeclineModel::Exponential);
    assert!(fit.params.b.abs() < 1e-12);
    assert!((fit.params.di - 0.105_36).abs() < 1e-4, "di = {}", fit.params.di);
    assert!((fit.params.qi - 1000.0).abs() < 1e-3, "qi = {}", fit.params.qi);

    let rates: Vec<f64> = out.points.iter().map(|p| p.rate).collect();
    let expected = [729.0, 656.1, 590.49];
    assert_eq!(rates.len(), expected.len());
    for (got, want) in rates.iter().zip(expected) {
        assert!((got - want).abs() < 1e-3, "{got} vs {want}");
    }
    let dates: Vec<_> = out.points.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![month(3), month(4), month(5)]);
}

#[test]
fn exactly_two_samples_degrade_to_exponential() {
    let out = DeclineEngine::default()
        .fit_and_forecast(&well("W2", &[800.0, 760.0]), &ForecastHorizon::until(month(3)))
        .expect("two samples forecast");

    assert_eq!(out.segments[0].model(), Some(DeclineModel::Exponential));
    assert!((out.points[0].rate - 800.0 * 0.95f64.powi(2)).abs() < 1e-6);
}

#[test]
fn single_sample_without_seed_is_insufficient() {
    let err = DeclineEngine::default()
        .fit_and_forecast(&well("W3", &[800.0]), &ForecastHorizon::until(month(3)))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientData { available: 1, required: 2, .. }
    ));
}

// ============================================================================
// Forecast properties
// ============================================================================

#[test]
fn forecast_rates_never_increase() {
    let engine = DeclineEngine::default();
    for params in [
        ArpsParams::exponential(900.0, 0.04),
        ArpsParams::new(900.0, 0.5, 0.12),
        ArpsParams::harmonic(900.0, 0.08),
    ] {
        let out = engine
            .fit_and_forecast(&synthetic("W", params, 18), &ForecastHorizon::until(month(240)))
            .expect("forecasts");
        assert!(!out.points.is_empty());
        for pair in out.points.windows(2) {
            assert!(pair[1].rate <= pair[0].rate, "{params:?}");
        }
    }
}

#[test]
fn forecast_round_trip_recovers_parameters() {
    let truth = ArpsParams::new(1500.0, 0.45, 0.1);
    let engine = DeclineEngine::default();
    let first = engine
        .fit_and_forecast(&synthetic("RT", truth, 24), &ForecastHorizon::until(month(60)))
        .expect("first pass");

    let fitted = first.segments[0].params().expect("fitted");
    assert!((fitted.b - truth.b).abs() < 1e-4);

    // Feed the forecast back in as history
    let replay = WellInput::new(
        "RT",
        first
            .points
            .iter()
            .map(|p| RawSample::new("RT", p.date, p.rate))
            .collect(),
    );
    let second = engine
        .fit_and_forecast(&replay, &ForecastHorizon::until(month(90)))
        .expect("second pass");
    let refit = second.segments[0].params().expect("refitted");

    // Same curve, re-based to the first forecast month (t = 24)
    assert_eq!(second.segments[0].model(), Some(DeclineModel::Hyperbolic));
    assert!((refit.b - truth.b).abs() < 1e-3, "b = {}", refit.b);
    assert!((refit.qi - arps::rate(&truth, 24.0)).abs() / refit.qi < 1e-4);
    assert!((refit.di - arps::decline_at(&truth, 24.0)).abs() < 1e-4);
}

#[test]
fn economic_limit_bounds_forecast_and_sets_eur() {
    let out = DeclineEngine::default()
        .fit_and_forecast(
            &synthetic("W", ArpsParams::exponential(500.0, 0.08), 12),
            &ForecastHorizon::to_economic_limit(50.0),
        )
        .expect("forecasts");

    assert!(out.points.iter().all(|p| p.rate >= 50.0));
    let last = out.points.last().expect("points");
    assert!(arps::rate(&ArpsParams::exponential(500.0, 0.08), last.elapsed_months + 1.0) < 50.0);

    let eur = out.eur.expect("eur with limit");
    assert!(eur > last.cumulative_volume);
    assert!((out.total_period_volume - out.points.iter().map(|p| p.period_volume).sum::<f64>()).abs() < 1e-9);
}

#[test]
fn horizon_without_stop_condition_is_rejected() {
    let err = DeclineEngine::default()
        .fit_and_forecast(&well("W", &[100.0, 90.0, 81.0]), &ForecastHorizon::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidHorizon { .. }));
}

// ============================================================================
// Normalization and segmentation
// ============================================================================

#[test]
fn duplicate_policy_follows_config() {
    let mut input = well("D", &[1000.0, 900.0, 810.0]);
    input.samples.push(RawSample::new("D", month(1), 0.0));

    assert!(matches!(
        DeclineEngine::default().fit_and_forecast(&input, &ForecastHorizon::until(month(4))),
        Err(EngineError::InvalidSample { .. })
    ));

    let mut config = EngineConfig::default();
    config.normalizer.duplicate_policy = DuplicatePolicy::Sum;
    let out = DeclineEngine::new(config)
        .fit_and_forecast(&input, &ForecastHorizon::until(month(4)))
        .expect("summed duplicate");
    assert_eq!(out.diagnostics.count(DiagnosticKind::DuplicateResolved), 1);
    assert!((out.points[0].rate - 729.0).abs() < 1e-3);
}

#[test]
fn segments_partition_history_for_any_marker_set() {
    let input = well("S", &(0..24).map(|k| 1000.0 - 10.0 * f64::from(k)).collect::<Vec<_>>());
    let series = SeriesNormalizer::new(DuplicatePolicy::Reject)
        .normalize("S", &input.samples, &mut Diagnostics::new())
        .expect("valid series");

    let marker_sets: Vec<Vec<u32>> = vec![
        vec![],
        vec![0],
        vec![23],
        vec![5, 5, 5],
        vec![20, 3, 11],
        vec![1, 2, 3, 4, 5, 6],
        vec![30, 12, 40],
    ];

    for set in marker_sets {
        let markers: Vec<_> = set
            .iter()
            .map(|&k| InterventionMarker::new("S", month(k), "frac"))
            .collect();
        let segments = Segmenter::segment(&series, &markers, &mut Diagnostics::new());

        let total: usize = segments.iter().map(|s| s.samples.len()).sum();
        assert_eq!(total, series.len(), "markers {set:?}");
        assert_eq!(segments[0].start_date, month(0));
        assert!(segments.last().expect("segments").is_open());
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_date, Some(pair[1].start_date), "markers {set:?}");
            assert!(pair[0].start_date < pair[1].start_date);
        }
        for seg in &segments {
            assert!(seg.samples.iter().all(|s| seg.contains(s.date)));
        }
    }
}

#[test]
fn intervention_opens_new_decline() {
    let before = ArpsParams::exponential(800.0, 0.1);
    let after = ArpsParams::new(1200.0, 0.5, 0.15);
    let mut rates: Vec<f64> = (0..12).map(|k| arps::rate(&before, f64::from(k))).collect();
    rates.extend((0..12).map(|k| arps::rate(&after, f64::from(k))));
    let input = well("F", &rates)
        .with_markers(vec![InterventionMarker::new("F", month(12), "hydraulic_fracturing")]);

    let out = DeclineEngine::default()
        .fit_and_forecast(&input, &ForecastHorizon::until(month(36)))
        .expect("forecasts");

    assert_eq!(out.segments.len(), 2);
    assert_eq!(out.segments[0].model(), Some(DeclineModel::Exponential));
    let last = out.forecast_segment().expect("segment");
    assert_eq!(last.trigger.as_deref(), Some("hydraulic_fracturing"));
    assert_eq!(last.model(), Some(DeclineModel::Hyperbolic));
    assert!((out.points[0].rate - arps::rate(&after, 12.0)).abs() / out.points[0].rate < 1e-4);
}

// ============================================================================
// Field aggregation
// ============================================================================

#[test]
fn aggregate_is_per_date_sum_and_order_independent() {
    let wells = vec![
        synthetic("A", ArpsParams::exponential(700.0, 0.05), 12),
        synthetic("B", ArpsParams::new(400.0, 0.6, 0.2), 8),
        synthetic("C", ArpsParams::harmonic(250.0, 0.1), 16),
        well("X", &[100.0, -1.0]),
    ];
    let horizon = ForecastHorizon::until(month(40));
    let engine = DeclineEngine::default();

    let forward = engine.forecast_field("field", &wells, &horizon);
    let mut reversed_wells = wells.clone();
    reversed_wells.reverse();
    let reversed = engine.forecast_field("field", &reversed_wells, &horizon);

    assert_eq!(forward.aggregate, reversed.aggregate);
    assert_eq!(forward.aggregate.contributing_wells, vec!["A", "B", "C"]);
    assert_eq!(forward.aggregate.failed_well_ids(), vec!["X"]);
    assert!(matches!(
        forward.aggregate.failed_wells[0].error,
        EngineError::InvalidSample { .. }
    ));

    for point in &forward.aggregate.points {
        let expected: f64 = forward
            .succeeded()
            .filter_map(|w| w.rate_on(point.date))
            .sum();
        assert!((point.rate - expected).abs() < 1e-9, "slot {}", point.date);
    }
    // B's history ends first, so the calendar starts at its first forecast month
    assert_eq!(forward.aggregate.points[0].date, month(8));
    assert_eq!(forward.aggregate.points[0].active_wells, 1);
}

#[test]
fn daily_well_is_resampled_into_monthly_aggregate() {
    let engine = DeclineEngine::default();
    let monthly = ForecastHorizon::until(month(30));
    let daily = monthly.with_cadence(Cadence::Daily);

    let outcomes = vec![
        engine.fit_and_forecast(&synthetic("A", ArpsParams::exponential(500.0, 0.05), 12), &monthly),
        engine.fit_and_forecast(&synthetic("B", ArpsParams::exponential(300.0, 0.05), 12), &monthly),
        engine.fit_and_forecast(&synthetic("C", ArpsParams::exponential(200.0, 0.05), 12), &daily),
    ];
    let agg = dca_engine::aggregate("platform", &outcomes);

    assert_eq!(agg.cadence, Cadence::Monthly);
    assert_eq!(agg.contributing_wells, vec!["A", "B", "C"]);
    assert!(agg.failed_wells.is_empty());

    // Resampling keeps every well's production
    let wells: Vec<_> = outcomes.iter().map(|o| o.as_ref().expect("forecast")).collect();
    let expected_volume: f64 = wells.iter().map(|w| w.total_period_volume).sum();
    assert!((agg.total_period_volume() - expected_volume).abs() / expected_volume < 1e-9);

    // A month's rate: both monthly wells plus C's mean daily rate in it
    let slot = month(20);
    let c_rates: Vec<f64> = wells[2]
        .points
        .iter()
        .filter(|p| p.date >= slot && p.date < month(21))
        .map(|p| p.rate)
        .collect();
    // September 2020
    assert_eq!(c_rates.len(), 30);
    let c_mean = c_rates.iter().sum::<f64>() / c_rates.len() as f64;
    let expected = wells[0].rate_on(slot).expect("A") + wells[1].rate_on(slot).expect("B") + c_mean;
    let point = agg.points.iter().find(|p| p.date == slot).expect("slot");
    assert!((point.rate - expected).abs() < 1e-9);
    assert_eq!(point.active_wells, 3);
}

// ============================================================================
// Water cut
// ============================================================================

#[test]
fn water_cut_from_oil_and_liquid_forecasts() {
    let engine = DeclineEngine::default();
    let horizon = ForecastHorizon::until(month(24));
    let oil = engine
        .fit_and_forecast(&synthetic("W", ArpsParams::exponential(400.0, 0.1), 12), &horizon)
        .expect("oil");
    let liquid = engine
        .fit_and_forecast(&synthetic("W", ArpsParams::exponential(800.0, 0.02), 12), &horizon)
        .expect("liquid");

    let merged = merge_water_cut(&oil.points, &liquid.points);
    assert_eq!(merged.len(), oil.points.len());
    for pair in merged.windows(2) {
        // Oil declines faster than liquid, so the cut rises
        assert!(pair[1].water_cut > pair[0].water_cut);
    }
    assert!(merged.iter().all(|p| (0.0..=100.0).contains(&p.water_cut)));
}
