//! Phase lengths from the loaded preset

use focus_api::{Phase, Preset};

/// Configured length of `phase` in seconds, never less than one second
pub fn duration_for(phase: Phase, preset: &Preset) -> u32 {
    let seconds = match phase {
        Phase::Work => preset.work_length,
        Phase::ShortBreak => preset.short_break_length,
        Phase::LongBreak => preset.long_break_length,
    };
    seconds.max(1)
}

/// Work sessions per long break, never less than one
pub fn long_break_cadence(preset: &Preset) -> u32 {
    preset.sessions_until_long_break.max(1)
}
