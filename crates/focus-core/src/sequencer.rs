//! Phase sequencing

use focus_api::Phase;

/// Result of finishing a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next_phase: Phase,
    /// Cycle counter after the transition, always below the cadence
    pub next_counter: u32,
    pub work_completed: bool,
}

/// Phase that follows `current` given the completed-work counter and the
/// long-break cadence.
pub fn next(current: Phase, counter: u32, sessions_until_long_break: u32) -> Transition {
    let cadence = sessions_until_long_break.max(1);
    match current {
        Phase::Work => {
            let completed = counter % cadence + 1;
            let next_phase = if completed % cadence == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            Transition {
                next_phase,
                next_counter: completed % cadence,
                work_completed: true,
            }
        }
        Phase::ShortBreak => Transition {
            next_phase: Phase::Work,
            next_counter: counter % cadence,
            work_completed: false,
        },
        Phase::LongBreak => Transition {
            next_phase: Phase::Work,
            next_counter: 0,
            work_completed: false,
        },
    }
}
