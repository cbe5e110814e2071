//! Core events emitted by the engine

use focus_api::{Phase, RunState, SessionRecord};
use focus_util::{PresetId, RecordId};

/// Events emitted by the timer engine and service
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// One second elapsed while running
    Tick { remaining_seconds: u32, phase: Phase },

    /// A phase counted down to zero. Only work phases carry a record.
    PhaseCompleted {
        phase: Phase,
        record: Option<SessionRecord>,
    },

    /// Active phase changed (completion, manual change or preset switch)
    PhaseChanged { phase: Phase, cycle_index: u32 },

    /// Handing a record to persistence failed
    RecordSaveFailed { record_id: RecordId, message: String },

    RunStateChanged { run_state: RunState },

    PresetSwitched { preset_id: PresetId },
}
