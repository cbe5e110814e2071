//! Session records for completed work phases

use chrono::{DateTime, Local};
use focus_api::{Phase, Preset, SelectedTask, SessionRecord};
use focus_util::RecordId;

use crate::duration_for;

/// Build the record for a phase that just finished, or `None` for breaks.
///
/// The duration is the configured length in whole minutes, not the measured
/// wall-clock time. Task attribution comes from the selection at completion.
pub fn build_record(
    phase: Phase,
    preset: &Preset,
    started_at: Option<DateTime<Local>>,
    ended_at: DateTime<Local>,
    cycle_index: u32,
    selection: Option<SelectedTask>,
) -> Option<SessionRecord> {
    if phase != Phase::Work {
        return None;
    }

    let configured = duration_for(phase, preset);
    let start_time = started_at
        .unwrap_or_else(|| ended_at - chrono::Duration::seconds(i64::from(configured)));
    let (task_id, skill_ids) = match selection {
        Some(task) => (Some(task.id), task.skill_ids),
        None => (None, Vec::new()),
    };

    Some(SessionRecord {
        id: RecordId::generate(&ended_at),
        phase,
        start_time,
        end_time: ended_at,
        duration_minutes: (configured + 30) / 60,
        cycle_index,
        task_id,
        skill_ids,
    })
}
