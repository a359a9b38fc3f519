//! Core domain types for the repflow workout engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Parsed exercise parameters (tagged by exercise kind)
//! - Exercises and workout blocks
//! - Per-round progression overrides
//! - Layout ordering entries
//! - Expanded workout steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Parsed Parameter Types
// ============================================================================

/// Classification of an exercise, determined by which grammar rule matched
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Strength,
    Time,
    Cardio,
    Unknown,
}

/// Parsed parameters, tagged by exercise kind
///
/// Each variant carries only the fields its grammar can produce. The flat
/// all-optional shape survives only at the snapshot boundary.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExerciseParams {
    /// Sets/reps work, optionally loaded ("3x10", "3x10 @ 135lbs", "135 lbs")
    Strength {
        sets: Option<u32>,
        reps: Option<u32>,
        weight: Option<String>,
        /// One weight per round; takes precedence over `weight` when present
        progressive_weights: Option<Vec<String>>,
    },
    /// Duration work ("30 minutes", "1:30")
    Time { time: String },
    /// Distance work ("2 miles", "400 m")
    Cardio { distance: String },
    /// Nothing matched
    Unknown,
}

impl ExerciseParams {
    pub fn kind(&self) -> ExerciseKind {
        match self {
            ExerciseParams::Strength { .. } => ExerciseKind::Strength,
            ExerciseParams::Time { .. } => ExerciseKind::Time,
            ExerciseParams::Cardio { .. } => ExerciseKind::Cardio,
            ExerciseParams::Unknown => ExerciseKind::Unknown,
        }
    }

    pub fn sets(&self) -> Option<u32> {
        match self {
            ExerciseParams::Strength { sets, .. } => *sets,
            _ => None,
        }
    }

    pub fn reps(&self) -> Option<u32> {
        match self {
            ExerciseParams::Strength { reps, .. } => *reps,
            _ => None,
        }
    }

    pub fn weight(&self) -> Option<&str> {
        match self {
            ExerciseParams::Strength { weight, .. } => weight.as_deref(),
            _ => None,
        }
    }

    pub fn progressive_weights(&self) -> Option<&[String]> {
        match self {
            ExerciseParams::Strength {
                progressive_weights,
                ..
            } => progressive_weights.as_deref(),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<&str> {
        match self {
            ExerciseParams::Time { time } => Some(time),
            _ => None,
        }
    }

    pub fn distance(&self) -> Option<&str> {
        match self {
            ExerciseParams::Cardio { distance } => Some(distance),
            _ => None,
        }
    }
}

/// Result of parsing one free-text parameter string
///
/// The rest period is extracted independently of the main grammar, so it can
/// accompany any parameter kind (including `Unknown`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParsedExercise {
    pub params: ExerciseParams,
    pub rest_period: Option<String>,
}

impl ParsedExercise {
    /// Parameters for input that matched no grammar rule
    pub fn unknown() -> Self {
        Self {
            params: ExerciseParams::Unknown,
            rest_period: None,
        }
    }

    pub fn kind(&self) -> ExerciseKind {
        self.params.kind()
    }
}

// ============================================================================
// Progression Override Types
// ============================================================================

/// Per-round override table for an exercise inside a block
///
/// Each vector is indexed by round number minus one. `None` entries mean
/// "use the base value for that round"; the vectors may be shorter than the
/// block's round count.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BlockProgression {
    #[serde(default)]
    pub round_weights: Vec<Option<String>>,
    #[serde(default)]
    pub round_reps: Vec<Option<u32>>,
    #[serde(default)]
    pub round_times: Vec<Option<String>>,
    #[serde(default)]
    pub round_distances: Vec<Option<String>>,
}

impl BlockProgression {
    pub fn is_empty(&self) -> bool {
        self.round_weights.iter().all(Option::is_none)
            && self.round_reps.iter().all(Option::is_none)
            && self.round_times.iter().all(Option::is_none)
            && self.round_distances.iter().all(Option::is_none)
    }

    /// Explicit weight override for a 1-based round, if any
    pub fn weight_for(&self, round: u32) -> Option<&str> {
        Self::string_entry(&self.round_weights, round)
    }

    /// Explicit rep override for a 1-based round, if any
    pub fn reps_for(&self, round: u32) -> Option<u32> {
        self.round_reps
            .get(round.saturating_sub(1) as usize)
            .copied()
            .flatten()
            .filter(|r| *r > 0)
    }

    /// Explicit time override for a 1-based round, if any
    pub fn time_for(&self, round: u32) -> Option<&str> {
        Self::string_entry(&self.round_times, round)
    }

    /// Explicit distance override for a 1-based round, if any
    pub fn distance_for(&self, round: u32) -> Option<&str> {
        Self::string_entry(&self.round_distances, round)
    }

    // Empty strings count as absent entries
    fn string_entry(entries: &[Option<String>], round: u32) -> Option<&str> {
        entries
            .get(round.saturating_sub(1) as usize)?
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

// ============================================================================
// Exercise and Block Types
// ============================================================================

/// One recorded exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    /// The raw parameter text as the user typed it
    pub original_input: String,
    pub parsed: ParsedExercise,
    pub created_at: DateTime<Utc>,
    /// Position within the exercise's context (standalone pool or block).
    /// Renumbered by reorder operations; never compared across contexts.
    pub order_key: u32,
    /// Owning block, if any; `None` means standalone
    pub block_id: Option<Uuid>,
    /// Per-round overrides, meaningful only while the exercise is in a block
    pub progression: Option<BlockProgression>,
}

/// Semantic label for a block; does not change how the block expands
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Round,
    Superset,
    Circuit,
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BlockKind::Round => "round",
            BlockKind::Superset => "superset",
            BlockKind::Circuit => "circuit",
        };
        f.write_str(label)
    }
}

/// A named group of exercises executed together for a number of rounds
///
/// Membership is derived from `Exercise::block_id`; the block itself carries
/// no member list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutBlock {
    pub id: Uuid,
    pub name: String,
    pub kind: BlockKind,
    pub rounds: Option<u32>,
    /// Rest attached after each non-final exercise within a round
    pub rest_between_exercises: Option<String>,
}

impl WorkoutBlock {
    /// Round count used by expansion; absent or zero rounds count as one
    pub fn effective_rounds(&self) -> u32 {
        match self.rounds {
            Some(r) if r > 0 => r,
            _ => 1,
        }
    }
}

// ============================================================================
// Layout Order
// ============================================================================

/// One entry in the top-level presentation/execution order
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutEntry {
    Exercise { id: Uuid },
    Block { id: Uuid },
}

impl LayoutEntry {
    pub fn id(&self) -> Uuid {
        match self {
            LayoutEntry::Exercise { id } | LayoutEntry::Block { id } => *id,
        }
    }
}

// ============================================================================
// Workout Step Types
// ============================================================================

/// Block position information carried by block-derived steps
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepContext {
    pub block_name: String,
    pub block_kind: BlockKind,
    pub current_round: u32,
    pub total_rounds: u32,
    pub exercise_in_block: u32,
    pub total_exercises_in_block: u32,
}

/// One atomic executable unit produced by expansion
///
/// Steps are recomputed from the data model on every expansion; no step
/// identity persists across mutations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutStep {
    pub id: String,
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub reps: Option<u32>,
    pub weight: Option<String>,
    pub time: Option<String>,
    pub distance: Option<String>,
    /// The exercise's own rest, independent of round
    pub rest_period: Option<String>,
    /// Present only for block-derived steps
    pub context: Option<StepContext>,
    /// Inter-exercise rest; absent on the last exercise of a round
    pub rest_after: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(rounds: Option<u32>) -> WorkoutBlock {
        WorkoutBlock {
            id: Uuid::new_v4(),
            name: "Main".into(),
            kind: BlockKind::Circuit,
            rounds,
            rest_between_exercises: None,
        }
    }

    #[test]
    fn test_effective_rounds_defaults_to_one() {
        assert_eq!(block(None).effective_rounds(), 1);
        assert_eq!(block(Some(0)).effective_rounds(), 1);
        assert_eq!(block(Some(4)).effective_rounds(), 4);
    }

    #[test]
    fn test_progression_empty_strings_count_as_absent() {
        let progression = BlockProgression {
            round_weights: vec![Some("40kg".into()), Some("".into()), None],
            ..Default::default()
        };

        assert_eq!(progression.weight_for(1), Some("40kg"));
        assert_eq!(progression.weight_for(2), None);
        assert_eq!(progression.weight_for(3), None);
        assert_eq!(progression.weight_for(4), None); // Beyond table
    }

    #[test]
    fn test_progression_zero_reps_count_as_absent() {
        let progression = BlockProgression {
            round_reps: vec![Some(12), Some(0), Some(8)],
            ..Default::default()
        };

        assert_eq!(progression.reps_for(1), Some(12));
        assert_eq!(progression.reps_for(2), None);
        assert_eq!(progression.reps_for(3), Some(8));
    }

    #[test]
    fn test_progression_is_empty() {
        assert!(BlockProgression::default().is_empty());

        let progression = BlockProgression {
            round_reps: vec![None, Some(10)],
            ..Default::default()
        };
        assert!(!progression.is_empty());
    }

    #[test]
    fn test_params_accessors_by_kind() {
        let strength = ExerciseParams::Strength {
            sets: Some(3),
            reps: Some(10),
            weight: Some("135 lbs".into()),
            progressive_weights: None,
        };
        assert_eq!(strength.kind(), ExerciseKind::Strength);
        assert_eq!(strength.sets(), Some(3));
        assert_eq!(strength.weight(), Some("135 lbs"));
        assert_eq!(strength.time(), None);

        let time = ExerciseParams::Time {
            time: "30 minutes".into(),
        };
        assert_eq!(time.kind(), ExerciseKind::Time);
        assert_eq!(time.time(), Some("30 minutes"));
        assert_eq!(time.sets(), None);

        assert_eq!(ExerciseParams::Unknown.kind(), ExerciseKind::Unknown);
    }
}
