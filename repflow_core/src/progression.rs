//! Per-round progression resolution.
//!
//! Resolves the effective parameters of an exercise for a specific round:
//! - Explicit block-progression overrides win
//! - Progressive weights attached to the parsed exercise come next (weight only)
//! - The base parsed value is the constant fallback
//!
//! Also provides the auto-fill helpers used when building override tables
//! (ascending weights, descending reps).

use crate::config::ProgressionConfig;
use crate::types::Exercise;

/// Effective parameters of one exercise for one round
#[derive(Clone, Debug, PartialEq)]
pub struct RoundParams {
    pub reps: Option<u32>,
    pub weight: Option<String>,
    pub time: Option<String>,
    pub distance: Option<String>,
}

/// Resolve the effective parameters for a 1-based round
pub fn resolve_round(exercise: &Exercise, round: u32) -> RoundParams {
    let progression = exercise.progression.as_ref();
    let params = &exercise.parsed.params;

    let reps = progression
        .and_then(|p| p.reps_for(round))
        .or_else(|| params.reps());

    // Weight has a middle priority level: the parsed progressive list,
    // clamped to its last entry for rounds beyond it
    let weight = progression
        .and_then(|p| p.weight_for(round))
        .map(str::to_string)
        .or_else(|| {
            params.progressive_weights().and_then(|weights| {
                let index = (round.saturating_sub(1) as usize).min(weights.len().checked_sub(1)?);
                Some(weights[index].clone())
            })
        })
        .or_else(|| params.weight().map(str::to_string));

    let time = progression
        .and_then(|p| p.time_for(round))
        .map(str::to_string)
        .or_else(|| params.time().map(str::to_string));

    let distance = progression
        .and_then(|p| p.distance_for(round))
        .map(str::to_string)
        .or_else(|| params.distance().map(str::to_string));

    RoundParams {
        reps,
        weight,
        time,
        distance,
    }
}

// ============================================================================
// Auto-fill Helpers
// ============================================================================

/// Generate an ascending per-round weight sequence from a base weight string
///
/// The increment depends on the unit: pounds climb by `pound_increment`,
/// kilograms by `kilogram_increment`. The base weight's spelling (unit token,
/// attached or spaced) is preserved in every generated entry. Returns an
/// empty vector when the base weight has no parseable magnitude.
pub fn fill_weights(base_weight: &str, rounds: u32, config: &ProgressionConfig) -> Vec<String> {
    let Some((magnitude, unit, spaced)) = split_weight(base_weight) else {
        tracing::debug!("Cannot auto-fill from weight {:?}", base_weight);
        return Vec::new();
    };

    let increment = if unit.starts_with("kg") || unit.starts_with("kilogram") {
        config.kilogram_increment
    } else {
        config.pound_increment
    };

    (0..rounds)
        .map(|i| {
            let value = magnitude + increment * f64::from(i);
            if spaced {
                format!("{} {}", format_magnitude(value), unit)
            } else {
                format!("{}{}", format_magnitude(value), unit)
            }
        })
        .collect()
}

/// Generate a descending per-round rep sequence, floored at one rep
pub fn fill_reps(base_reps: u32, rounds: u32, config: &ProgressionConfig) -> Vec<u32> {
    (0..rounds)
        .map(|i| base_reps.saturating_sub(config.rep_decrement * i).max(1))
        .collect()
}

/// Split "<number> <unit>" or "<number><unit>" into magnitude, unit, and
/// whether the two were separated by whitespace
fn split_weight(weight: &str) -> Option<(f64, &str, bool)> {
    let trimmed = weight.trim();
    let split = trimmed.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    let magnitude: f64 = trimmed[..split].parse().ok()?;
    let rest = &trimmed[split..];
    let spaced = rest.starts_with(char::is_whitespace);
    Some((magnitude, rest.trim_start(), spaced))
}

// Whole numbers print without a trailing ".0"
fn format_magnitude(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
