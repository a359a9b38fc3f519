#![forbid(unsafe_code)]

//! Core domain model and business logic for the repflow workout system.
//!
//! This crate provides:
//! - Free-text exercise parameter parsing
//! - The exercise/block/layout data model and its mutation owner
//! - Per-round progression resolution
//! - Workout step expansion
//! - The guided session runner and rest timer
//! - Snapshot and session-history persistence

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod parser;
pub mod progression;
pub mod expansion;
pub mod plan;
pub mod snapshot;
pub mod runner;
pub mod history;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use parser::parse;
pub use progression::{resolve_round, RoundParams};
pub use expansion::expand;
pub use plan::{OrderContext, WorkoutPlan};
pub use runner::{RestTimer, SessionRunner, TimerState};
pub use history::{JsonlLog, SessionRecord, SessionSink};
