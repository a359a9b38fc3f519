use clap::{Parser, Subcommand};
use repflow_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "repflow")]
#[command(about = "Workout planning and guided session runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an exercise from a free-text parameter string
    Add {
        /// Exercise name
        name: String,

        /// Parameters, e.g. "3x10 @ 135lbs", "30 minutes", "3x10 @ 40/50/60kg rest 30s"
        params: String,

        /// Move the exercise into this block immediately
        #[arg(long)]
        block: Option<String>,
    },

    /// List exercises and blocks in layout order
    List,

    /// Manage workout blocks
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },

    /// Show (or export) the expanded step sequence
    Plan {
        /// Export the steps to a CSV file instead of printing
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Walk through the workout step by step
    Run {
        /// Advance through all steps without prompting (for testing)
        #[arg(long)]
        auto_advance: bool,
    },

    /// Remove an exercise
    Remove {
        /// Exercise name
        name: String,
    },

    /// Roll up session history to CSV
    Rollup {
        /// Clean up processed history logs after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum BlockCommands {
    /// Create a new block
    Create {
        /// Block name
        name: String,

        /// Block kind (round, superset, circuit)
        #[arg(long, default_value = "circuit")]
        kind: String,

        /// Number of rounds
        #[arg(long)]
        rounds: Option<u32>,

        /// Rest between exercises within a round, e.g. "30s" or "1:00"
        #[arg(long)]
        rest: Option<String>,
    },

    /// Move exercises into a block
    Assign {
        /// Block name
        block: String,

        /// Exercise names
        exercises: Vec<String>,

        /// Fill a per-round progression from each exercise's base values
        /// (ascending weights, descending reps)
        #[arg(long)]
        auto_fill: bool,
    },

    /// Remove a block, returning members to the standalone pool
    Remove {
        /// Block name
        name: String,
    },
}

fn main() -> Result<()> {
    repflow_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Add {
            name,
            params,
            block,
        } => cmd_add(&data_dir, &name, &params, block.as_deref()),
        Commands::List => cmd_list(&data_dir),
        Commands::Block { command } => cmd_block(&data_dir, command, &config),
        Commands::Plan { csv } => cmd_plan(&data_dir, csv.as_deref()),
        Commands::Run { auto_advance } => cmd_run(&data_dir, auto_advance, &config),
        Commands::Remove { name } => cmd_remove(&data_dir, &name),
        Commands::Rollup { cleanup } => cmd_rollup(&data_dir, cleanup),
    }
}

fn snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join("workout.json")
}

fn history_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("history").join("sessions.jsonl")
}

fn history_csv_path(data_dir: &Path) -> PathBuf {
    data_dir.join("history").join("sessions.csv")
}

fn cmd_add(data_dir: &Path, name: &str, params: &str, block: Option<&str>) -> Result<()> {
    let path = snapshot_path(data_dir);
    let mut plan = snapshot::load(&path)?;

    let id = plan.add_exercise(name, params);

    if let Some(block_name) = block {
        let block_id = plan
            .block_by_name(block_name)
            .map(|b| b.id)
            .ok_or_else(|| Error::UnknownEntity(format!("block {:?}", block_name)))?;
        plan.assign_to_block(id, block_id)?;
    }

    if let Some(exercise) = plan.exercise(id) {
        println!(
            "✓ Added {} - {}",
            exercise.name,
            summarize_exercise(exercise)
        );
        if exercise.parsed.kind() == ExerciseKind::Unknown {
            println!("  (parameters not recognized; stored as free text)");
        }
    }

    snapshot::save(&plan, &path)
}

fn cmd_list(data_dir: &Path) -> Result<()> {
    let plan = snapshot::load(&snapshot_path(data_dir))?;

    if plan.layout().is_empty() {
        println!("Nothing recorded yet. Try: repflow add \"Bench\" \"3x10 @ 135lbs\"");
        return Ok(());
    }

    for entry in plan.layout() {
        match entry {
            LayoutEntry::Exercise { id } => {
                if let Some(exercise) = plan.exercise(*id) {
                    println!("• {} - {}", exercise.name, summarize_exercise(exercise));
                }
            }
            LayoutEntry::Block { id } => {
                if let Some(block) = plan.block(*id) {
                    let rounds = block.effective_rounds();
                    println!("▸ {} ({}, {} rounds)", block.name, block.kind, rounds);
                    for member in plan.members_of(block.id) {
                        println!("    • {} - {}", member.name, summarize_exercise(member));
                    }
                }
            }
        }
    }

    Ok(())
}

fn cmd_block(data_dir: &Path, command: BlockCommands, config: &Config) -> Result<()> {
    let path = snapshot_path(data_dir);
    let mut plan = snapshot::load(&path)?;

    match command {
        BlockCommands::Create {
            name,
            kind,
            rounds,
            rest,
        } => {
            let kind = parse_block_kind(&kind)?;
            plan.create_block(&name, kind, rounds, rest.as_deref());
            println!("✓ Created {} block {:?}", kind, name);
        }
        BlockCommands::Assign {
            block,
            exercises,
            auto_fill,
        } => {
            let block_id = plan
                .block_by_name(&block)
                .map(|b| b.id)
                .ok_or_else(|| Error::UnknownEntity(format!("block {:?}", block)))?;

            for exercise_name in &exercises {
                let exercise_id = plan
                    .exercise_by_name(exercise_name)
                    .map(|e| e.id)
                    .ok_or_else(|| {
                        Error::UnknownEntity(format!("exercise {:?}", exercise_name))
                    })?;
                plan.assign_to_block(exercise_id, block_id)?;
                if auto_fill {
                    plan.auto_fill_progression(exercise_id, &config.progression)?;
                }
                println!("✓ Moved {} into {}", exercise_name, block);
            }
        }
        BlockCommands::Remove { name } => {
            let block_id = plan
                .block_by_name(&name)
                .map(|b| b.id)
                .ok_or_else(|| Error::UnknownEntity(format!("block {:?}", name)))?;
            plan.remove_block(block_id)?;
            println!("✓ Removed block {:?}; members returned to the pool", name);
        }
    }

    snapshot::save(&plan, &path)
}

fn cmd_plan(data_dir: &Path, csv: Option<&Path>) -> Result<()> {
    let plan = snapshot::load(&snapshot_path(data_dir))?;
    let steps = plan.expand_steps();

    if let Some(csv_path) = csv {
        export::save_steps_csv(&steps, csv_path)?;
        println!("✓ Exported {} steps to {}", steps.len(), csv_path.display());
        return Ok(());
    }

    if steps.is_empty() {
        println!("No steps to run - the plan is empty.");
        return Ok(());
    }

    println!("Workout plan ({} steps):", steps.len());
    for (index, step) in steps.iter().enumerate() {
        println!("{:>3}. {}", index + 1, format_step_line(step));
    }

    Ok(())
}

fn cmd_run(data_dir: &Path, auto_advance: bool, config: &Config) -> Result<()> {
    let plan = snapshot::load(&snapshot_path(data_dir))?;
    let steps = plan.expand_steps();

    if steps.is_empty() {
        println!("No steps to run - the plan is empty.");
        return Ok(());
    }

    let started_at = chrono::Utc::now();
    let steps_total = steps.len() as u32;
    let mut runner = SessionRunner::with_fallback(steps, config.timer.fallback_seconds);
    let mut completed = 0u32;

    loop {
        let Some(step) = runner.current().cloned() else {
            break;
        };
        display_step(&step, runner.step_index().unwrap_or(0), steps_total as usize);

        let action = if auto_advance {
            UserAction::Next
        } else {
            prompt_user_action()?
        };

        match action {
            UserAction::Next => {
                completed = completed.max(runner.step_index().unwrap_or(0) as u32 + 1);
                if !runner.next() {
                    break; // Last step finished
                }
            }
            UserAction::Back => {
                runner.prev();
            }
            UserAction::Rest => {
                let duration = step
                    .rest_period
                    .clone()
                    .or_else(|| step.rest_after.clone())
                    .unwrap_or_else(|| format!("{}s", config.timer.fallback_seconds));
                run_rest_countdown(&mut runner, &duration);
            }
            UserAction::Quit => {
                let record = SessionRecord {
                    id: uuid::Uuid::new_v4(),
                    started_at,
                    completed_at: None,
                    steps_total,
                    steps_completed: completed,
                };
                JsonlLog::new(history_log_path(data_dir)).append(&record)?;
                println!("\nSession abandoned after {} of {} steps.", completed, steps_total);
                return Ok(());
            }
        }
    }

    let record = SessionRecord {
        id: uuid::Uuid::new_v4(),
        started_at,
        completed_at: Some(chrono::Utc::now()),
        steps_total,
        steps_completed: steps_total,
    };
    JsonlLog::new(history_log_path(data_dir)).append(&record)?;

    println!("\n✓ Workout complete! {} steps logged.", steps_total);
    Ok(())
}

fn cmd_remove(data_dir: &Path, name: &str) -> Result<()> {
    let path = snapshot_path(data_dir);
    let mut plan = snapshot::load(&path)?;

    let id = plan
        .exercise_by_name(name)
        .map(|e| e.id)
        .ok_or_else(|| Error::UnknownEntity(format!("exercise {:?}", name)))?;
    plan.remove_exercise(id)?;

    println!("✓ Removed {:?}", name);
    snapshot::save(&plan, &path)
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let log_path = history_log_path(data_dir);
    let csv_path = history_csv_path(data_dir);

    if !log_path.exists() {
        println!("No history log found - nothing to roll up.");
        return Ok(());
    }

    let count = history::log_to_csv_and_archive(&log_path, &csv_path)?;

    println!("✓ Rolled up {} sessions to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        if let Some(history_dir) = log_path.parent() {
            let cleaned = history::cleanup_processed_logs(history_dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed history logs", cleaned);
            }
        }
    }

    Ok(())
}

// ============================================================================
// Display
// ============================================================================

fn parse_block_kind(kind: &str) -> Result<BlockKind> {
    match kind.to_lowercase().as_str() {
        "round" => Ok(BlockKind::Round),
        "superset" => Ok(BlockKind::Superset),
        "circuit" => Ok(BlockKind::Circuit),
        other => Err(Error::Other(format!(
            "unknown block kind {:?} (expected round, superset, or circuit)",
            other
        ))),
    }
}

/// One-line summary of an exercise's parsed parameters
fn summarize_exercise(exercise: &Exercise) -> String {
    let params = &exercise.parsed.params;
    let mut parts = Vec::new();

    if let (Some(sets), Some(reps)) = (params.sets(), params.reps()) {
        parts.push(format!("{}x{}", sets, reps));
    }
    if let Some(weights) = params.progressive_weights() {
        parts.push(format!("@ {}", weights.join(" / ")));
    } else if let Some(weight) = params.weight() {
        parts.push(format!("@ {}", weight));
    }
    if let Some(time) = params.time() {
        parts.push(time.to_string());
    }
    if let Some(distance) = params.distance() {
        parts.push(distance.to_string());
    }
    if let Some(rest) = &exercise.parsed.rest_period {
        parts.push(format!("rest {}", rest));
    }

    if parts.is_empty() {
        exercise.original_input.clone()
    } else {
        parts.join(" ")
    }
}

/// Compact single-line rendering of a step for plan listings
fn format_step_line(step: &WorkoutStep) -> String {
    let mut line = step.exercise_name.clone();

    if let Some(context) = &step.context {
        line = format!(
            "[{} {}/{}] {}",
            context.block_name, context.current_round, context.total_rounds, line
        );
    }
    if let Some(reps) = step.reps {
        line.push_str(&format!(" - {} reps", reps));
    }
    if let Some(weight) = &step.weight {
        line.push_str(&format!(" @ {}", weight));
    }
    if let Some(time) = &step.time {
        line.push_str(&format!(" - {}", time));
    }
    if let Some(distance) = &step.distance {
        line.push_str(&format!(" - {}", distance));
    }
    if let Some(rest) = &step.rest_after {
        line.push_str(&format!(" (then rest {})", rest));
    }

    line
}

fn display_step(step: &WorkoutStep, index: usize, total: usize) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  STEP {} of {}", index + 1, total);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", step.exercise_name);

    if let Some(context) = &step.context {
        println!(
            "  {} ({}) - round {}/{}, exercise {}/{}",
            context.block_name,
            context.block_kind,
            context.current_round,
            context.total_rounds,
            context.exercise_in_block,
            context.total_exercises_in_block
        );
    }

    println!();
    if let Some(reps) = step.reps {
        println!("  → {} reps", reps);
    }
    if let Some(weight) = &step.weight {
        println!("  → {}", weight);
    }
    if let Some(time) = &step.time {
        println!("  → {}", time);
    }
    if let Some(distance) = &step.distance {
        println!("  → {}", distance);
    }
    if let Some(rest) = &step.rest_period {
        println!("  → rest {} after this set", rest);
    }
    if let Some(rest) = &step.rest_after {
        println!("  → rest {} before the next exercise", rest);
    }

    println!();
}

enum UserAction {
    Next,
    Back,
    Rest,
    Quit,
}

fn prompt_user_action() -> Result<UserAction> {
    println!("─────────────────────────────────────────");
    println!("Press Enter when done");
    println!("  'b' + Enter to go back a step");
    println!("  'r' + Enter to start the rest timer");
    println!("  'q' + Enter to quit");
    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let action = match input.trim().to_lowercase().as_str() {
        "b" => UserAction::Back,
        "r" => UserAction::Rest,
        "q" => UserAction::Quit,
        _ => UserAction::Next,
    };

    Ok(action)
}

/// Drive the cooperative rest timer with one tick per second
fn run_rest_countdown(runner: &mut SessionRunner, duration: &str) {
    runner.start_rest(duration);

    while runner.rest_timer().is_running() {
        print!("\r  Resting… {:>3}s ", runner.rest_timer().remaining());
        let _ = io::stdout().flush();
        std::thread::sleep(std::time::Duration::from_secs(1));
        runner.rest_timer_mut().tick();
    }

    println!("\r  Rest complete.      ");
}
