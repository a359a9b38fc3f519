//! Workout step expansion engine.
//!
//! Expands exercises, blocks, and the layout order into the flat, ordered
//! step sequence a session runner walks through. Traversal order is layout
//! entry (outer), round (middle), member position within the block (inner).
//!
//! The expansion is pure: inputs are borrowed immutably, output is built
//! fresh on every call, and dangling references are skipped rather than
//! raised.

use crate::progression::resolve_round;
use crate::types::{Exercise, LayoutEntry, StepContext, WorkoutBlock, WorkoutStep};
use uuid::Uuid;

/// Expand the full data model into an ordered list of workout steps
pub fn expand(
    exercises: &[Exercise],
    blocks: &[WorkoutBlock],
    layout: &[LayoutEntry],
) -> Vec<WorkoutStep> {
    let mut steps = Vec::new();

    for entry in layout {
        match entry {
            LayoutEntry::Exercise { id } => {
                let Some(exercise) = exercises.iter().find(|e| e.id == *id) else {
                    tracing::debug!("Skipping layout entry for unknown exercise {}", id);
                    continue;
                };
                expand_standalone(exercise, &mut steps);
            }
            LayoutEntry::Block { id } => {
                let Some(block) = blocks.iter().find(|b| b.id == *id) else {
                    tracing::debug!("Skipping layout entry for unknown block {}", id);
                    continue;
                };
                expand_block(block, exercises, &mut steps);
            }
        }
    }

    steps
}

/// Member exercises of a block, in execution order
pub fn block_members<'a>(block_id: Uuid, exercises: &'a [Exercise]) -> Vec<&'a Exercise> {
    let mut members: Vec<&Exercise> = exercises
        .iter()
        .filter(|e| e.block_id == Some(block_id))
        .collect();
    members.sort_by_key(|e| (e.order_key, e.created_at, e.id));
    members
}

/// One step per set, all carrying the base parsed fields unchanged
fn expand_standalone(exercise: &Exercise, steps: &mut Vec<WorkoutStep>) {
    let params = &exercise.parsed.params;
    let sets = params.sets().unwrap_or(1);

    for set in 1..=sets {
        steps.push(WorkoutStep {
            id: format!("{}-set-{}", exercise.id, set),
            exercise_id: exercise.id,
            exercise_name: exercise.name.clone(),
            reps: params.reps(),
            weight: params.weight().map(str::to_string),
            time: params.time().map(str::to_string),
            distance: params.distance().map(str::to_string),
            rest_period: exercise.parsed.rest_period.clone(),
            context: None,
            rest_after: None,
        });
    }
}

/// rounds x members steps, with per-round progression resolved per member
fn expand_block(block: &WorkoutBlock, exercises: &[Exercise], steps: &mut Vec<WorkoutStep>) {
    let members = block_members(block.id, exercises);
    if members.is_empty() {
        return;
    }

    let rounds = block.effective_rounds();

    for round in 1..=rounds {
        for (position, exercise) in members.iter().enumerate() {
            let resolved = resolve_round(exercise, round);

            // Inter-exercise rest only; nothing is inserted between the last
            // exercise of a round and the first of the next
            let rest_after = if position < members.len() - 1 {
                block.rest_between_exercises.clone()
            } else {
                None
            };

            steps.push(WorkoutStep {
                id: format!("{}-round-{}", exercise.id, round),
                exercise_id: exercise.id,
                exercise_name: exercise.name.clone(),
                reps: resolved.reps,
                weight: resolved.weight,
                time: resolved.time,
                distance: resolved.distance,
                rest_period: exercise.parsed.rest_period.clone(),
                context: Some(StepContext {
                    block_name: block.name.clone(),
                    block_kind: block.kind,
                    current_round: round,
                    total_rounds: rounds,
                    exercise_in_block: position as u32 + 1,
                    total_exercises_in_block: members.len() as u32,
                }),
                rest_after,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::types::{BlockKind, BlockProgression};
    use chrono::Utc;

    fn exercise(name: &str, input: &str, order_key: u32, block_id: Option<Uuid>) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            name: name.into(),
            original_input: input.into(),
            parsed: parser::parse(input),
            created_at: Utc::now(),
            order_key,
            block_id,
            progression: None,
        }
    }

    fn block(name: &str, rounds: Option<u32>, rest: Option<&str>) -> WorkoutBlock {
        WorkoutBlock {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: BlockKind::Circuit,
            rounds,
            rest_between_exercises: rest.map(str::to_string),
        }
    }

    #[test]
    fn test_standalone_emits_one_step_per_set() {
        let ex = exercise("Bench", "3x10 @ 135lbs", 0, None);
        let layout = vec![LayoutEntry::Exercise { id: ex.id }];

        let steps = expand(&[ex.clone()], &[], &layout);

        assert_eq!(steps.len(), 3);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.id, format!("{}-set-{}", ex.id, i + 1));
            assert_eq!(step.reps, Some(10));
            assert_eq!(step.weight.as_deref(), Some("135 lbs"));
            assert!(step.context.is_none());
            assert!(step.rest_after.is_none());
        }
    }

    #[test]
    fn test_standalone_without_sets_emits_single_step() {
        let ex = exercise("Run", "2 miles", 0, None);
        let layout = vec![LayoutEntry::Exercise { id: ex.id }];

        let steps = expand(&[ex.clone()], &[], &layout);

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].distance.as_deref(), Some("2 miles"));
    }

    #[test]
    fn test_block_emits_rounds_times_members() {
        let b = block("Main", Some(3), None);
        let a = exercise("Squat", "3x10", 0, Some(b.id));
        let c = exercise("Plank", "1:00", 1, Some(b.id));
        let layout = vec![LayoutEntry::Block { id: b.id }];

        let steps = expand(&[a.clone(), c.clone()], &[b], &layout);

        assert_eq!(steps.len(), 6);
        // Round-major ordering: members cycle within each round
        assert_eq!(steps[0].exercise_id, a.id);
        assert_eq!(steps[1].exercise_id, c.id);
        assert_eq!(steps[2].exercise_id, a.id);
        assert_eq!(steps[0].id, format!("{}-round-1", a.id));
        assert_eq!(steps[2].id, format!("{}-round-2", a.id));
    }

    #[test]
    fn test_block_member_order_follows_order_keys() {
        let b = block("Main", Some(1), None);
        let first = exercise("A", "3x10", 5, Some(b.id));
        let second = exercise("B", "3x10", 9, Some(b.id));
        let layout = vec![LayoutEntry::Block { id: b.id }];

        // Stored out of order; order keys decide
        let steps = expand(&[second.clone(), first.clone()], &[b], &layout);

        assert_eq!(steps[0].exercise_id, first.id);
        assert_eq!(steps[1].exercise_id, second.id);
    }

    #[test]
    fn test_rest_after_skips_last_member_of_every_round() {
        let b = block("Main", Some(2), Some("30s"));
        let a = exercise("A", "3x10", 0, Some(b.id));
        let c = exercise("B", "3x10", 1, Some(b.id));
        let layout = vec![LayoutEntry::Block { id: b.id }];

        let steps = expand(&[a, c], &[b], &layout);

        assert_eq!(steps[0].rest_after.as_deref(), Some("30s"));
        // No rest between round 1's last exercise and round 2's first
        assert_eq!(steps[1].rest_after, None);
        assert_eq!(steps[2].rest_after.as_deref(), Some("30s"));
        assert_eq!(steps[3].rest_after, None);
    }

    #[test]
    fn test_context_fields() {
        let b = block("Conditioning", Some(2), None);
        let a = exercise("Burpees", "3x10", 0, Some(b.id));
        let c = exercise("Row", "500 m", 1, Some(b.id));
        let layout = vec![LayoutEntry::Block { id: b.id }];

        let steps = expand(&[a, c], &[b], &layout);

        let context = steps[3].context.as_ref().unwrap();
        assert_eq!(context.block_name, "Conditioning");
        assert_eq!(context.block_kind, BlockKind::Circuit);
        assert_eq!(context.current_round, 2);
        assert_eq!(context.total_rounds, 2);
        assert_eq!(context.exercise_in_block, 2);
        assert_eq!(context.total_exercises_in_block, 2);
    }

    #[test]
    fn test_progression_resolved_per_round() {
        let b = block("Main", Some(3), None);
        let mut a = exercise("Squat", "3x10 @ 40/50/60kg", 0, Some(b.id));
        a.progression = Some(BlockProgression {
            round_reps: vec![Some(12), Some(10), Some(8)],
            ..Default::default()
        });
        let layout = vec![LayoutEntry::Block { id: b.id }];

        let steps = expand(&[a], &[b], &layout);

        assert_eq!(steps[0].reps, Some(12));
        assert_eq!(steps[0].weight.as_deref(), Some("40kg"));
        assert_eq!(steps[1].reps, Some(10));
        assert_eq!(steps[1].weight.as_deref(), Some("50kg"));
        assert_eq!(steps[2].reps, Some(8));
        assert_eq!(steps[2].weight.as_deref(), Some("60kg"));
    }

    #[test]
    fn test_layout_interleaving_defines_top_level_order() {
        let b = block("Main", Some(1), None);
        let member = exercise("Member", "3x10", 0, Some(b.id));
        let solo = exercise("Solo", "2x5", 0, None);
        let layout = vec![
            LayoutEntry::Exercise { id: solo.id },
            LayoutEntry::Block { id: b.id },
        ];

        let steps = expand(&[member.clone(), solo.clone()], &[b], &layout);

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].exercise_id, solo.id);
        assert_eq!(steps[1].exercise_id, solo.id);
        assert_eq!(steps[2].exercise_id, member.id);
    }

    #[test]
    fn test_dangling_references_are_skipped() {
        let ex = exercise("Kept", "2x5", 0, None);
        let layout = vec![
            LayoutEntry::Exercise { id: Uuid::new_v4() },
            LayoutEntry::Block { id: Uuid::new_v4() },
            LayoutEntry::Exercise { id: ex.id },
        ];

        let steps = expand(&[ex], &[], &layout);
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn test_empty_block_contributes_no_steps() {
        let b = block("Empty", Some(3), None);
        let layout = vec![LayoutEntry::Block { id: b.id }];

        let steps = expand(&[], &[b], &layout);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let b = block("Main", Some(2), Some("30s"));
        let a = exercise("A", "3x10 @ 40/50kg", 0, Some(b.id));
        let solo = exercise("Solo", "30 minutes", 0, None);
        let layout = vec![
            LayoutEntry::Block { id: b.id },
            LayoutEntry::Exercise { id: solo.id },
        ];
        let exercises = vec![a, solo];
        let blocks = vec![b];

        let first = expand(&exercises, &blocks, &layout);
        let second = expand(&exercises, &blocks, &layout);
        assert_eq!(first, second);
    }
}
