//! CSV export of an expanded step sequence.
//!
//! One row per workout step with block context flattened into plain columns,
//! suitable for printing or spreadsheet import.

use crate::types::WorkoutStep;
use crate::Result;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Flattened CSV row for one step
#[derive(Debug, Serialize)]
struct StepRow<'a> {
    step: usize,
    exercise: &'a str,
    reps: Option<u32>,
    weight: Option<&'a str>,
    time: Option<&'a str>,
    distance: Option<&'a str>,
    rest: Option<&'a str>,
    rest_after: Option<&'a str>,
    block: Option<&'a str>,
    round: Option<String>,
    position: Option<String>,
}

impl<'a> StepRow<'a> {
    fn new(index: usize, step: &'a WorkoutStep) -> Self {
        let context = step.context.as_ref();
        StepRow {
            step: index + 1,
            exercise: &step.exercise_name,
            reps: step.reps,
            weight: step.weight.as_deref(),
            time: step.time.as_deref(),
            distance: step.distance.as_deref(),
            rest: step.rest_period.as_deref(),
            rest_after: step.rest_after.as_deref(),
            block: context.map(|c| c.block_name.as_str()),
            round: context.map(|c| format!("{}/{}", c.current_round, c.total_rounds)),
            position: context.map(|c| {
                format!("{}/{}", c.exercise_in_block, c.total_exercises_in_block)
            }),
        }
    }
}

/// Write steps as CSV to any writer
pub fn write_steps_csv<W: io::Write>(steps: &[WorkoutStep], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (index, step) in steps.iter().enumerate() {
        csv_writer.serialize(StepRow::new(index, step))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render steps as a CSV string
pub fn steps_to_csv_string(steps: &[WorkoutStep]) -> Result<String> {
    let mut buffer = Vec::new();
    write_steps_csv(steps, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| crate::Error::Other(format!("invalid CSV output: {}", e)))
}

/// Write steps as a CSV file
pub fn save_steps_csv(steps: &[WorkoutStep], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_steps_csv(steps, file)?;
    tracing::info!("Exported {} steps to {:?}", steps.len(), path);
    Ok(())
}
