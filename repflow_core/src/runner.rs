//! Guided session runner.
//!
//! A cursor over the expanded step sequence plus an independent rest-timer
//! sub-state-machine. Everything here is single-threaded and cooperative:
//! the caller drives the timer with one `tick` per second; navigating
//! between steps always resets the timer.

use crate::types::WorkoutStep;

// ============================================================================
// Rest Timer
// ============================================================================

/// Rest timer states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Inactive,
    Running { remaining: u32 },
    Paused { remaining: u32 },
}

/// Countdown over a rest period, driven by cooperative one-second ticks
#[derive(Clone, Debug, Default)]
pub struct RestTimer {
    state: TimerState,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), TimerState::Running { .. })
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state(), TimerState::Inactive)
    }

    /// Seconds left; zero when inactive
    pub fn remaining(&self) -> u32 {
        match self.state() {
            TimerState::Inactive => 0,
            TimerState::Running { remaining } | TimerState::Paused { remaining } => remaining,
        }
    }

    /// Parse a duration string and start counting down
    pub fn start(&mut self, duration: &str, fallback_seconds: u32) {
        let seconds = parse_duration_seconds(duration, fallback_seconds);
        self.state = if seconds > 0 {
            TimerState::Running { remaining: seconds }
        } else {
            TimerState::Inactive
        };
        tracing::debug!("Rest timer started: {}s from {:?}", seconds, duration);
    }

    /// One cooperative one-second tick; reaching zero completes silently
    pub fn tick(&mut self) {
        if let TimerState::Running { remaining } = self.state() {
            let remaining = remaining.saturating_sub(1);
            self.state = if remaining == 0 {
                TimerState::Inactive
            } else {
                TimerState::Running { remaining }
            };
        }
    }

    pub fn pause(&mut self) {
        if let TimerState::Running { remaining } = self.state() {
            self.state = TimerState::Paused { remaining };
        }
    }

    pub fn resume(&mut self) {
        if let TimerState::Paused { remaining } = self.state() {
            self.state = TimerState::Running { remaining };
        }
    }

    /// Force the countdown to zero from any state
    pub fn skip(&mut self) {
        self.state = TimerState::Inactive;
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Inactive;
    }
}

/// Parse a rest duration into seconds
///
/// Accepts `MM:SS` or `<number><unit>` with unit in
/// s/sec/seconds/m/min/minutes (minute units multiply by 60). Anything else
/// falls back to the configured default; this is documented behavior, not an
/// error.
pub fn parse_duration_seconds(input: &str, fallback_seconds: u32) -> u32 {
    let trimmed = input.trim().to_lowercase();

    if let Some((minutes, seconds)) = trimmed.split_once(':') {
        if let (Ok(minutes), Ok(seconds)) =
            (minutes.trim().parse::<u32>(), seconds.trim().parse::<u32>())
        {
            return minutes * 60 + seconds;
        }
        return fallback_seconds;
    }

    let Some(split) = trimmed.find(|c: char| !c.is_ascii_digit() && c != '.') else {
        return fallback_seconds;
    };
    let (number, unit) = trimmed.split_at(split);
    let Ok(value) = number.parse::<f64>() else {
        return fallback_seconds;
    };

    match unit.trim() {
        "s" | "sec" | "seconds" => value as u32,
        "m" | "min" | "minutes" => (value * 60.0) as u32,
        _ => fallback_seconds,
    }
}

// ============================================================================
// Session Runner
// ============================================================================

/// Cursor over an expanded step sequence
///
/// `Idle` with no steps, otherwise active at some step index. There is no
/// explicit completed state; the cursor simply stops advancing at the last
/// step.
#[derive(Clone, Debug)]
pub struct SessionRunner {
    steps: Vec<WorkoutStep>,
    cursor: usize,
    rest_timer: RestTimer,
    fallback_seconds: u32,
}

impl SessionRunner {
    pub fn new(steps: Vec<WorkoutStep>) -> Self {
        Self::with_fallback(steps, 60)
    }

    pub fn with_fallback(steps: Vec<WorkoutStep>, fallback_seconds: u32) -> Self {
        Self {
            steps,
            cursor: 0,
            rest_timer: RestTimer::new(),
            fallback_seconds,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[WorkoutStep] {
        &self.steps
    }

    pub fn step_index(&self) -> Option<usize> {
        (!self.is_idle()).then_some(self.cursor)
    }

    pub fn current(&self) -> Option<&WorkoutStep> {
        self.steps.get(self.cursor)
    }

    pub fn is_last(&self) -> bool {
        !self.is_idle() && self.cursor == self.steps.len() - 1
    }

    /// Advance one step; no-op at the last step. Always resets the timer.
    pub fn next(&mut self) -> bool {
        self.rest_timer.reset();
        if self.is_idle() || self.is_last() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Step back; no-op at the first step. Always resets the timer.
    pub fn prev(&mut self) -> bool {
        self.rest_timer.reset();
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn rest_timer(&self) -> &RestTimer {
        &self.rest_timer
    }

    pub fn rest_timer_mut(&mut self) -> &mut RestTimer {
        &mut self.rest_timer
    }

    /// Start the rest timer from an arbitrary duration string
    pub fn start_rest(&mut self, duration: &str) {
        self.rest_timer.start(duration, self.fallback_seconds);
    }
}
