//! Synthetic Field Forecast
//!
//! Generates a field of wells with Arps declines, occasional stimulation
//! jumps and lognormal measurement noise, then runs the decline engine on
//! it and prints a per-well summary or the full result as JSON.
//!
//! # Usage
//! ```bash
//! ./synthetic-field --wells 20 --months 48 --horizon-months 120 --seed 7
//! ./synthetic-field --format json --economic-limit 10 > field.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Months, NaiveDate};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, LogNormal};
use tracing::info;

use dca_engine::config::{self, EngineConfig};
use dca_engine::decline::arps;
use dca_engine::{
    ArpsParams, DeclineEngine, FieldForecast, ForecastHorizon, InterventionMarker, RawSample,
    WellInput,
};

// ============================================================================
// Field Constants
// ============================================================================

/// Initial rate range (per day)
const QI_RANGE: (f64, f64) = (300.0, 1500.0);
/// Nominal decline range (1/month)
const DI_RANGE: (f64, f64) = (0.03, 0.15);
/// Chance that a well is stimulated during its history
const INTERVENTION_PROBABILITY: f64 = 0.4;
/// Rate multiplier range right after a stimulation
const JUMP_RANGE: (f64, f64) = (1.5, 3.0);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "synthetic-field")]
#[command(about = "Synthetic multi-well decline forecast")]
#[command(version)]
struct Args {
    /// Number of wells in the field
    #[arg(short, long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=10_000))]
    wells: u32,

    /// Months of production history per well
    #[arg(short, long, default_value = "36", value_parser = clap::value_parser!(u32).range(2..=600))]
    months: u32,

    /// Months to forecast past the end of history
    #[arg(long, default_value = "60")]
    horizon_months: u32,

    /// Economic limit (per day); the forecast stops below it
    #[arg(long)]
    economic_limit: Option<f64>,

    /// Standard deviation of the lognormal noise on each sample
    #[arg(long, default_value = "0.05")]
    noise: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: summary or json
    #[arg(short, long, default_value = "summary")]
    format: String,

    /// Engine config file (defaults to $DCA_CONFIG, then ./dca_config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

// ============================================================================
// Generator
// ============================================================================

struct FieldGenerator {
    rng: StdRng,
    noise: LogNormal<f64>,
    start: NaiveDate,
    months: u32,
}

impl FieldGenerator {
    fn new(seed: Option<u64>, noise_sigma: f64, start: NaiveDate, months: u32) -> Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let noise = LogNormal::new(0.0, noise_sigma)
            .with_context(|| format!("invalid noise sigma {noise_sigma}"))?;
        Ok(Self {
            rng,
            noise,
            start,
            months,
        })
    }

    fn random_params(&mut self, qi: f64) -> ArpsParams {
        let di = self.rng.gen_range(DI_RANGE.0..DI_RANGE.1);
        let b = match self.rng.gen_range(0..4) {
            0 => 0.0,
            1 => 1.0,
            _ => self.rng.gen_range(0.2..0.9),
        };
        ArpsParams::new(qi, b, di)
    }

    fn date(&self, month: u32) -> Result<NaiveDate> {
        self.start
            .checked_add_months(Months::new(month))
            .with_context(|| format!("month {month} after {} is out of range", self.start))
    }

    fn well(&mut self, index: u32) -> Result<WellInput> {
        let well_id = format!("W-{:03}", index + 1);
        let qi = self.rng.gen_range(QI_RANGE.0..QI_RANGE.1);
        let mut params = self.random_params(qi);
        let mut origin = 0;

        let intervention = (self.months >= 12 && self.rng.gen_bool(INTERVENTION_PROBABILITY))
            .then(|| self.rng.gen_range(self.months / 3..2 * self.months / 3));

        let mut samples = Vec::with_capacity(self.months as usize);
        let mut markers = Vec::new();
        for month in 0..self.months {
            if Some(month) == intervention {
                let current = arps::rate(&params, f64::from(month - origin));
                let jump = self.rng.gen_range(JUMP_RANGE.0..JUMP_RANGE.1);
                params = self.random_params(current * jump);
                origin = month;
                markers.push(InterventionMarker::new(&well_id, self.date(month)?, "hydraulic_fracturing"));
            }
            let rate = arps::rate(&params, f64::from(month - origin)) * self.noise.sample(&mut self.rng);
            samples.push(RawSample::new(&well_id, self.date(month)?, rate));
        }

        Ok(WellInput::new(well_id, samples).with_markers(markers))
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_summary(field: &FieldForecast) {
    println!(
        "{:<8} {:>12} {:>9} {:>7} {:>8} {:>7} {:>14}",
        "well", "model", "qi", "b", "di", "points", "eur"
    );
    for outcome in &field.wells {
        match outcome {
            Ok(well) => {
                let segment = well.forecast_segment();
                let model = segment
                    .and_then(|s| s.model())
                    .map_or_else(|| "-".to_string(), |m| m.to_string());
                let params = segment.and_then(|s| s.params());
                let eur = well.eur.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"));
                match params {
                    Some(p) => println!(
                        "{:<8} {:>12} {:>9.1} {:>7.3} {:>8.4} {:>7} {:>14}",
                        well.well_id, model, p.qi, p.b, p.di, well.points.len(), eur
                    ),
                    None => println!("{:<8} {:>12}", well.well_id, model),
                }
            }
            Err(e) => println!("{:<8} FAILED: {e}", e.well_id()),
        }
    }

    let agg = &field.aggregate;
    println!();
    println!(
        "{}: {} wells aggregated, {} failed, {} {} slots, total volume {:.0}",
        agg.group_key,
        agg.contributing_wells.len(),
        agg.failed_wells.len(),
        agg.points.len(),
        agg.cadence,
        agg.total_period_volume()
    );
    if let (Some(first), Some(last)) = (agg.points.first(), agg.points.last()) {
        println!(
            "  field rate {:.1} on {} -> {:.1} on {}",
            first.rate, first.date, last.rate, last.date
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let engine_config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading engine config from {}", path.display()))?,
        None => EngineConfig::load(),
    };
    config::init(engine_config);
    let engine = DeclineEngine::from_global();

    let start = NaiveDate::from_ymd_opt(2020, 1, 1).context("invalid start date")?;
    let mut generator = FieldGenerator::new(args.seed, args.noise, start, args.months)?;
    let wells = (0..args.wells)
        .map(|i| generator.well(i))
        .collect::<Result<Vec<_>>>()?;

    let mut horizon = ForecastHorizon::until(generator.date(args.months + args.horizon_months)?);
    if let Some(limit) = args.economic_limit {
        horizon = horizon.with_economic_limit(limit);
    }

    info!(wells = wells.len(), months = args.months, "Running synthetic field forecast");
    let field = engine.forecast_field("synthetic", &wells, &horizon);

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&field).context("serializing field forecast")?;
            println!("{json}");
        }
        _ => print_summary(&field),
    }

    Ok(())
}
