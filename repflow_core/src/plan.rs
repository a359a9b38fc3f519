//! The workout plan: single owner of exercises, blocks, and layout order.
//!
//! All mutation is serialized through this type in response to discrete user
//! actions. It maintains the layout invariants:
//! - Every standalone exercise appears in the layout exactly once
//! - Every block with at least one member appears exactly once
//! - A block member never appears as a standalone entry
//!
//! Ordering within a context (the standalone pool, or one block) is carried
//! by explicit integer order keys, renumbered by `reorder`.

use crate::config::ProgressionConfig;
use crate::expansion::{self, block_members};
use crate::parser;
use crate::progression::{fill_reps, fill_weights};
use crate::types::{
    BlockKind, BlockProgression, Exercise, LayoutEntry, WorkoutBlock, WorkoutStep,
};
use crate::{Error, Result};
use chrono::Utc;
use uuid::Uuid;

/// Ordering context for reorder operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderContext {
    /// The pool of exercises not belonging to any block
    Standalone,
    /// The members of one block
    Block(Uuid),
}

/// The full mutable workout state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkoutPlan {
    exercises: Vec<Exercise>,
    blocks: Vec<WorkoutBlock>,
    layout: Vec<LayoutEntry>,
}

impl WorkoutPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a plan from its collections (snapshot load path)
    pub fn from_parts(
        exercises: Vec<Exercise>,
        blocks: Vec<WorkoutBlock>,
        layout: Vec<LayoutEntry>,
    ) -> Self {
        Self {
            exercises,
            blocks,
            layout,
        }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn blocks(&self) -> &[WorkoutBlock] {
        &self.blocks
    }

    pub fn layout(&self) -> &[LayoutEntry] {
        &self.layout
    }

    pub fn exercise(&self, id: Uuid) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn block(&self, id: Uuid) -> Option<&WorkoutBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Find an exercise by case-insensitive name
    pub fn exercise_by_name(&self, name: &str) -> Option<&Exercise> {
        self.exercises
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Find a block by case-insensitive name
    pub fn block_by_name(&self, name: &str) -> Option<&WorkoutBlock> {
        self.blocks.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }

    /// Members of a block in execution order
    pub fn members_of(&self, block_id: Uuid) -> Vec<&Exercise> {
        block_members(block_id, &self.exercises)
    }

    /// Expand the current state into the ordered step sequence
    pub fn expand_steps(&self) -> Vec<WorkoutStep> {
        expansion::expand(&self.exercises, &self.blocks, &self.layout)
    }

    // ========================================================================
    // Exercise Lifecycle
    // ========================================================================

    /// Parse a parameter string and record a new standalone exercise
    pub fn add_exercise(&mut self, name: &str, input: &str) -> Uuid {
        let id = Uuid::new_v4();
        let exercise = Exercise {
            id,
            name: name.to_string(),
            original_input: input.to_string(),
            parsed: parser::parse(input),
            created_at: Utc::now(),
            order_key: self.next_order_key(OrderContext::Standalone),
            block_id: None,
            progression: None,
        };
        tracing::debug!("Added exercise {:?} ({:?})", name, exercise.parsed.kind());
        self.exercises.push(exercise);
        self.layout.push(LayoutEntry::Exercise { id });
        id
    }

    /// Rename an exercise and/or replace its parameters (reparsing the input)
    pub fn update_exercise(
        &mut self,
        id: Uuid,
        name: Option<&str>,
        input: Option<&str>,
    ) -> Result<()> {
        let exercise = self.exercise_mut(id)?;
        if let Some(name) = name {
            exercise.name = name.to_string();
        }
        if let Some(input) = input {
            exercise.original_input = input.to_string();
            exercise.parsed = parser::parse(input);
        }
        Ok(())
    }

    /// Replace an exercise's per-round override table
    pub fn set_progression(&mut self, id: Uuid, progression: Option<BlockProgression>) -> Result<()> {
        self.exercise_mut(id)?.progression = progression;
        Ok(())
    }

    /// Build an override table from the exercise's base values: ascending
    /// weights and descending reps over the owning block's rounds
    pub fn auto_fill_progression(&mut self, id: Uuid, config: &ProgressionConfig) -> Result<()> {
        let exercise = self
            .exercise(id)
            .ok_or_else(|| Error::UnknownEntity(format!("exercise {}", id)))?;
        let block_id = exercise
            .block_id
            .ok_or_else(|| Error::Other("exercise is not in a block".into()))?;
        let rounds = self
            .block(block_id)
            .map(WorkoutBlock::effective_rounds)
            .unwrap_or(1);

        let mut progression = BlockProgression::default();
        if let Some(weight) = exercise.parsed.params.weight() {
            progression.round_weights = fill_weights(weight, rounds, config)
                .into_iter()
                .map(Some)
                .collect();
        }
        if let Some(reps) = exercise.parsed.params.reps() {
            progression.round_reps = fill_reps(reps, rounds, config).into_iter().map(Some).collect();
        }

        self.exercise_mut(id)?.progression =
            (!progression.is_empty()).then_some(progression);
        Ok(())
    }

    /// Destroy an exercise, dropping its layout entry and pruning the owning
    /// block's layout entry if the block became empty
    pub fn remove_exercise(&mut self, id: Uuid) -> Result<()> {
        let position = self
            .exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::UnknownEntity(format!("exercise {}", id)))?;
        let removed = self.exercises.remove(position);

        self.layout
            .retain(|entry| !matches!(entry, LayoutEntry::Exercise { id: e } if *e == id));

        if let Some(block_id) = removed.block_id {
            self.prune_empty_block_entry(block_id);
        }
        Ok(())
    }

    // ========================================================================
    // Block Lifecycle
    // ========================================================================

    /// Create a block; it enters the layout once it gains its first member
    pub fn create_block(
        &mut self,
        name: &str,
        kind: BlockKind,
        rounds: Option<u32>,
        rest_between_exercises: Option<&str>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.blocks.push(WorkoutBlock {
            id,
            name: name.to_string(),
            kind,
            rounds,
            rest_between_exercises: rest_between_exercises.map(str::to_string),
        });
        tracing::debug!("Created {} block {:?}", kind, name);
        id
    }

    /// Edit a block's name, kind, rounds, or rest
    pub fn update_block(
        &mut self,
        id: Uuid,
        name: Option<&str>,
        kind: Option<BlockKind>,
        rounds: Option<Option<u32>>,
        rest_between_exercises: Option<Option<&str>>,
    ) -> Result<()> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::UnknownEntity(format!("block {}", id)))?;
        if let Some(name) = name {
            block.name = name.to_string();
        }
        if let Some(kind) = kind {
            block.kind = kind;
        }
        if let Some(rounds) = rounds {
            block.rounds = rounds;
        }
        if let Some(rest) = rest_between_exercises {
            block.rest_between_exercises = rest.map(str::to_string);
        }
        Ok(())
    }

    /// Destroy a block, returning every member to the standalone pool
    pub fn remove_block(&mut self, id: Uuid) -> Result<()> {
        if self.block(id).is_none() {
            return Err(Error::UnknownEntity(format!("block {}", id)));
        }

        let member_ids: Vec<Uuid> = self.members_of(id).iter().map(|e| e.id).collect();
        for member_id in member_ids {
            self.detach_internal(member_id);
        }

        self.blocks.retain(|b| b.id != id);
        self.layout
            .retain(|entry| !matches!(entry, LayoutEntry::Block { id: b } if *b == id));
        Ok(())
    }

    // ========================================================================
    // Membership and Ordering
    // ========================================================================

    /// Move an exercise into a block, at the end of the block's order
    pub fn assign_to_block(&mut self, exercise_id: Uuid, block_id: Uuid) -> Result<()> {
        if self.block(block_id).is_none() {
            return Err(Error::UnknownEntity(format!("block {}", block_id)));
        }
        let exercise = self
            .exercise(exercise_id)
            .ok_or_else(|| Error::UnknownEntity(format!("exercise {}", exercise_id)))?;
        if exercise.block_id == Some(block_id) {
            return Ok(());
        }
        let previous_block = exercise.block_id;

        let order_key = self.next_order_key(OrderContext::Block(block_id));
        let exercise = self.exercise_mut(exercise_id)?;
        exercise.block_id = Some(block_id);
        exercise.order_key = order_key;

        // The member leaves the standalone layout; the block enters it on
        // gaining its first member
        self.layout
            .retain(|entry| !matches!(entry, LayoutEntry::Exercise { id } if *id == exercise_id));
        if !self
            .layout
            .iter()
            .any(|entry| matches!(entry, LayoutEntry::Block { id } if *id == block_id))
        {
            self.layout.push(LayoutEntry::Block { id: block_id });
        }

        if let Some(previous) = previous_block {
            self.prune_empty_block_entry(previous);
        }
        Ok(())
    }

    /// Return a block member to the standalone pool, at the end
    pub fn detach_from_block(&mut self, exercise_id: Uuid) -> Result<()> {
        let exercise = self
            .exercise(exercise_id)
            .ok_or_else(|| Error::UnknownEntity(format!("exercise {}", exercise_id)))?;
        if exercise.block_id.is_none() {
            return Ok(());
        }
        self.detach_internal(exercise_id);
        Ok(())
    }

    /// Reorder the exercises of one context; `ordered_ids` must be exactly
    /// the current members of that context
    pub fn reorder(&mut self, context: OrderContext, ordered_ids: &[Uuid]) -> Result<()> {
        let current: Vec<Uuid> = self.context_members(context);
        if current.len() != ordered_ids.len()
            || !ordered_ids.iter().all(|id| current.contains(id))
        {
            return Err(Error::Other(
                "reorder list does not match the context's members".into(),
            ));
        }

        for (key, id) in ordered_ids.iter().enumerate() {
            if let Some(exercise) = self.exercises.iter_mut().find(|e| e.id == *id) {
                exercise.order_key = key as u32;
            }
        }
        Ok(())
    }

    /// Replace the top-level layout order; `entries` must be a permutation of
    /// the current layout
    pub fn reorder_layout(&mut self, entries: Vec<LayoutEntry>) -> Result<()> {
        if entries.len() != self.layout.len()
            || !entries.iter().all(|entry| self.layout.contains(entry))
        {
            return Err(Error::Other(
                "layout order does not match the current entries".into(),
            ));
        }
        self.layout = entries;
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn exercise_mut(&mut self, id: Uuid) -> Result<&mut Exercise> {
        self.exercises
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::UnknownEntity(format!("exercise {}", id)))
    }

    fn context_members(&self, context: OrderContext) -> Vec<Uuid> {
        match context {
            OrderContext::Standalone => self
                .exercises
                .iter()
                .filter(|e| e.block_id.is_none())
                .map(|e| e.id)
                .collect(),
            OrderContext::Block(block_id) => {
                self.members_of(block_id).iter().map(|e| e.id).collect()
            }
        }
    }

    fn next_order_key(&self, context: OrderContext) -> u32 {
        let members = match context {
            OrderContext::Standalone => self
                .exercises
                .iter()
                .filter(|e| e.block_id.is_none())
                .map(|e| e.order_key)
                .max(),
            OrderContext::Block(block_id) => self
                .exercises
                .iter()
                .filter(|e| e.block_id == Some(block_id))
                .map(|e| e.order_key)
                .max(),
        };
        members.map_or(0, |key| key + 1)
    }

    // Detach without the existence check; rejoins the standalone pool and
    // restores the standalone layout entry
    fn detach_internal(&mut self, exercise_id: Uuid) {
        let order_key = self.next_order_key(OrderContext::Standalone);
        let Some(exercise) = self.exercises.iter_mut().find(|e| e.id == exercise_id) else {
            return;
        };
        let previous_block = exercise.block_id.take();
        exercise.order_key = order_key;
        self.layout.push(LayoutEntry::Exercise { id: exercise_id });

        if let Some(block_id) = previous_block {
            self.prune_empty_block_entry(block_id);
        }
    }

    fn prune_empty_block_entry(&mut self, block_id: Uuid) {
        if self.members_of(block_id).is_empty() {
            self.layout
                .retain(|entry| !matches!(entry, LayoutEntry::Block { id } if *id == block_id));
        }
    }
}
