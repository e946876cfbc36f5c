//! Config validation: unknown-key detection with Levenshtein suggestions
//! and numeric range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for EngineConfig.
///
/// Maintained by hand to match the struct hierarchy in engine_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [normalizer]
        "normalizer",
        "normalizer.duplicate_policy",
        // [fitter]
        "fitter",
        "fitter.max_iterations",
        "fitter.tolerance",
        "fitter.parameter_policy",
        "fitter.parsimony_margin",
        "fitter.harmonic_min_samples",
        "fitter.hyperbolic_min_samples",
        // [forecast]
        "forecast",
        "forecast.cadence",
        "forecast.max_points",
        "forecast.economic_limit",
        // [uptime]
        "uptime",
        "uptime.factors",
        // [engine]
        "engine",
        "engine.worker_threads",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the alphabetically first key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut candidates: Vec<&str> = known.iter().copied().collect();
    candidates.sort_unstable();

    let mut best: Option<(&str, usize)> = None;
    for k in candidates {
        let dist = levenshtein(unknown, k);
        if dist <= 3 && best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(&key, &known);
            warnings.push(ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate numeric ranges on a parsed EngineConfig.
///
/// Returns (errors, warnings). Errors are values the engine cannot run with;
/// warnings are legal but unusual.
pub fn validate_ranges(config: &super::EngineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let f = &config.fitter;
    if f.max_iterations == 0 {
        errors.push("fitter.max_iterations must be > 0".to_string());
    }
    if !f.tolerance.is_finite() || f.tolerance <= 0.0 {
        errors.push(format!(
            "fitter.tolerance = {} must be a finite value > 0",
            f.tolerance
        ));
    }
    if !f.parsimony_margin.is_finite() || !(0.0..1.0).contains(&f.parsimony_margin) {
        errors.push(format!(
            "fitter.parsimony_margin = {} must be within [0, 1)",
            f.parsimony_margin
        ));
    }
    if f.max_iterations > 10_000 {
        warnings.push(ValidationWarning {
            field: "fitter.max_iterations".to_string(),
            message: format!(
                "fitter.max_iterations = {} is unusually high; fits normally converge in < 100",
                f.max_iterations
            ),
            suggestion: None,
        });
    }

    let fc = &config.forecast;
    if fc.max_points == 0 {
        errors.push("forecast.max_points must be > 0".to_string());
    }
    if let Some(limit) = fc.economic_limit {
        if !limit.is_finite() || limit <= 0.0 {
            errors.push(format!(
                "forecast.economic_limit = {limit} must be a finite value > 0"
            ));
        }
    }

    for (i, k) in config.uptime.factors.iter().enumerate() {
        if !k.is_finite() || *k <= 0.0 || *k > 1.0 {
            errors.push(format!(
                "uptime.factors[{i}] = {k} must be within (0, 1]"
            ));
        } else if *k < 0.5 {
            warnings.push(ValidationWarning {
                field: format!("uptime.factors[{i}]"),
                message: format!("uptime.factors[{i}] = {k:.2} means the well is down most of the month"),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
