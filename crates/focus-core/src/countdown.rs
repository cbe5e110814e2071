//! Countdown state machine
//!
//! Holds the active phase, its remaining seconds and the run state. Ticks are
//! applied by the owner; this type never schedules anything itself.

use chrono::{DateTime, Local};
use focus_api::{Phase, RunState};

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing changed
    Idle,
    /// One second elapsed, time is left
    Ticked { remaining: u32 },
    /// The last second elapsed
    Finished,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    phase: Phase,
    total: u32,
    remaining: u32,
    run_state: RunState,
    started_at: Option<DateTime<Local>>,
}

impl Countdown {
    pub fn new(phase: Phase, total: u32) -> Self {
        Self {
            phase,
            total,
            remaining: total,
            run_state: RunState::Stopped,
            started_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// When time accrual for the current phase began
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// Returns whether the run state changed
    pub fn start(&mut self, now: DateTime<Local>) -> bool {
        if self.run_state == RunState::Running {
            return false;
        }
        self.run_state = RunState::Running;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        true
    }

    /// Returns whether the run state changed
    pub fn pause(&mut self) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        self.run_state = RunState::Paused;
        true
    }

    /// Stop and refill the current phase with `total` seconds
    pub fn reset(&mut self, total: u32) {
        self.run_state = RunState::Stopped;
        self.total = total;
        self.remaining = total;
        self.started_at = None;
    }

    /// Stop and switch to a new phase
    pub fn load(&mut self, phase: Phase, total: u32) {
        self.phase = phase;
        self.reset(total);
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.run_state != RunState::Running || self.remaining == 0 {
            return TickOutcome::Idle;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            TickOutcome::Finished
        } else {
            TickOutcome::Ticked {
                remaining: self.remaining,
            }
        }
    }
}
