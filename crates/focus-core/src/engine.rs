//! Core timer engine

use chrono::{DateTime, Local};
use focus_api::{Phase, Preset, RunState, SelectedTask, TimerSnapshot};
use focus_util::{FocusError, Result};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::{
    build_record, duration_for, long_break_cadence, next, CoreEvent, Countdown, TickOutcome,
};

/// Read access to the task future work sessions are attributed to
pub trait TaskSelection: Send + Sync {
    fn current(&self) -> Option<SelectedTask>;
}

/// Task selection shared between the service and whoever edits it
#[derive(Debug, Clone, Default)]
pub struct SharedSelection {
    inner: Arc<RwLock<Option<SelectedTask>>>,
}

impl SharedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, task: Option<SelectedTask>) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = task;
    }

    pub fn clear(&self) {
        self.set(None);
    }
}

impl TaskSelection for SharedSelection {
    fn current(&self) -> Option<SelectedTask> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// The pomodoro timer state machine
///
/// Owns the run state and the cycle counter. The preset and task selection
/// are inputs that are only read. Every operation returns the events it
/// produced, in order.
pub struct TimerEngine {
    preset: Preset,
    countdown: Countdown,
    cycle_count: u32,
    selection: Arc<dyn TaskSelection>,
}

impl TimerEngine {
    /// Create an engine at the start of a cycle: stopped, Work, counter 0
    pub fn new(preset: Preset, selection: Arc<dyn TaskSelection>) -> Self {
        let countdown = Countdown::new(Phase::Work, duration_for(Phase::Work, &preset));

        info!(
            preset_id = %preset.id,
            work_seconds = preset.work_length,
            sessions_until_long_break = preset.sessions_until_long_break,
            "Timer engine initialized"
        );

        Self {
            preset,
            countdown,
            cycle_count: 0,
            selection,
        }
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn phase(&self) -> Phase {
        self.countdown.phase()
    }

    pub fn run_state(&self) -> RunState {
        self.countdown.run_state()
    }

    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    /// Work sessions completed since the last long break
    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn start(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        if !self.countdown.start(now) {
            return Vec::new();
        }

        info!(
            phase = ?self.phase(),
            remaining_seconds = self.remaining(),
            "Timer started"
        );
        vec![CoreEvent::RunStateChanged {
            run_state: RunState::Running,
        }]
    }

    pub fn pause(&mut self) -> Vec<CoreEvent> {
        if !self.countdown.pause() {
            return Vec::new();
        }

        info!(
            phase = ?self.phase(),
            remaining_seconds = self.remaining(),
            "Timer paused"
        );
        vec![CoreEvent::RunStateChanged {
            run_state: RunState::Paused,
        }]
    }

    /// Stop and refill the current phase. Phase and cycle counter are kept.
    pub fn reset(&mut self) -> Vec<CoreEvent> {
        let was = self.run_state();
        self.countdown
            .reset(duration_for(self.phase(), &self.preset));

        if was == RunState::Stopped {
            return Vec::new();
        }

        info!(phase = ?self.phase(), "Timer reset");
        vec![CoreEvent::RunStateChanged {
            run_state: RunState::Stopped,
        }]
    }

    /// Jump to `phase`. Only allowed while stopped.
    pub fn change_phase(&mut self, phase: Phase) -> Result<Vec<CoreEvent>> {
        self.ensure_stopped("change phase")?;

        self.countdown.load(phase, duration_for(phase, &self.preset));
        info!(phase = ?phase, cycle_count = self.cycle_count, "Phase changed");

        Ok(vec![CoreEvent::PhaseChanged {
            phase,
            cycle_index: self.cycle_count,
        }])
    }

    /// Load another preset and restart the cycle. Only allowed while stopped.
    pub fn switch_preset(&mut self, preset: Preset) -> Result<Vec<CoreEvent>> {
        self.ensure_stopped("switch preset")?;

        self.preset = preset;
        self.cycle_count = 0;
        self.countdown
            .load(Phase::Work, duration_for(Phase::Work, &self.preset));

        info!(preset_id = %self.preset.id, "Preset switched");

        Ok(vec![
            CoreEvent::PresetSwitched {
                preset_id: self.preset.id.clone(),
            },
            CoreEvent::PhaseChanged {
                phase: Phase::Work,
                cycle_index: 0,
            },
        ])
    }

    /// Put the timer back at a saved position, stopped with a full phase
    pub fn restore(&mut self, phase: Phase, cycle_count: u32) -> Result<()> {
        self.ensure_stopped("restore")?;

        self.cycle_count = cycle_count % long_break_cadence(&self.preset);
        self.countdown.load(phase, duration_for(phase, &self.preset));
        debug!(phase = ?phase, cycle_count = self.cycle_count, "Timer restored");
        Ok(())
    }

    /// Apply one elapsed second
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        match self.countdown.tick() {
            TickOutcome::Idle => Vec::new(),
            TickOutcome::Ticked { remaining } => vec![CoreEvent::Tick {
                remaining_seconds: remaining,
                phase: self.phase(),
            }],
            TickOutcome::Finished => {
                let mut events = vec![CoreEvent::Tick {
                    remaining_seconds: 0,
                    phase: self.phase(),
                }];
                events.extend(self.complete_phase(now));
                events
            }
        }
    }

    /// Runs with the accrual start still set, before anything else changes
    fn complete_phase(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let completed = self.phase();
        let transition = next(
            completed,
            self.cycle_count,
            long_break_cadence(&self.preset),
        );

        let record = if transition.work_completed {
            build_record(
                completed,
                &self.preset,
                self.countdown.started_at(),
                now,
                self.cycle_count,
                self.selection.current(),
            )
        } else {
            None
        };

        info!(
            phase = ?completed,
            next_phase = ?transition.next_phase,
            cycle_index = self.cycle_count,
            record_id = ?record.as_ref().map(|r| r.id.as_str()),
            "Phase completed"
        );

        self.cycle_count = transition.next_counter;
        self.countdown.load(
            transition.next_phase,
            duration_for(transition.next_phase, &self.preset),
        );

        let mut events = vec![
            CoreEvent::PhaseCompleted {
                phase: completed,
                record,
            },
            CoreEvent::PhaseChanged {
                phase: transition.next_phase,
                cycle_index: self.cycle_count,
            },
        ];

        let auto_start = if completed == Phase::Work {
            self.preset.auto_start_breaks
        } else {
            self.preset.auto_start_work
        };

        if auto_start {
            self.countdown.start(now);
            debug!(phase = ?transition.next_phase, "Next phase auto-started");
        } else {
            events.push(CoreEvent::RunStateChanged {
                run_state: RunState::Stopped,
            });
        }

        events
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            run_state: self.run_state(),
            phase: self.phase(),
            remaining_seconds: self.remaining(),
            phase_seconds: self.countdown.total(),
            cycle_count: self.cycle_count,
            sessions_until_long_break: long_break_cadence(&self.preset),
            preset_id: self.preset.id.clone(),
            started_at: self.countdown.started_at(),
            selected_task: self.selection.current(),
        }
    }

    fn ensure_stopped(&self, action: &'static str) -> Result<()> {
        match self.run_state() {
            RunState::Stopped => Ok(()),
            state => Err(FocusError::invalid_transition(action, state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_api::SessionRecord;
    use focus_util::{PresetId, SkillId, TaskId};

    fn engine_with(preset: Preset) -> (TimerEngine, SharedSelection) {
        let selection = SharedSelection::new();
        let engine = TimerEngine::new(preset, Arc::new(selection.clone()));
        (engine, selection)
    }

    fn tiny_preset() -> Preset {
        Preset {
            id: PresetId::new("tiny"),
            name: "Tiny".into(),
            work_length: 3,
            short_break_length: 2,
            long_break_length: 4,
            sessions_until_long_break: 2,
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }

    /// Tick until the current phase completes, returning every event
    fn run_phase(engine: &mut TimerEngine) -> Vec<CoreEvent> {
        engine.start(focus_util::now());
        let mut events = Vec::new();
        for _ in 0..engine.remaining() {
            events.extend(engine.tick(focus_util::now()));
        }
        events
    }

    fn records(events: &[CoreEvent]) -> Vec<SessionRecord> {
        events
            .iter()
            .filter_map(|e| match e {
                CoreEvent::PhaseCompleted {
                    record: Some(record),
                    ..
                } => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let (engine, _) = engine_with(Preset::classic());
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.run_state(), RunState::Stopped);
        assert_eq!(engine.remaining(), 1500);
        assert_eq!(engine.cycle_count(), 0);
    }

    #[test]
    fn test_full_work_phase_completes_once() {
        let (mut engine, _) = engine_with(Preset::classic());
        let events = run_phase(&mut engine);

        let ticks = events
            .iter()
            .filter(|e| matches!(e, CoreEvent::Tick { .. }))
            .count();
        assert_eq!(ticks, 1500);

        let completions: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, CoreEvent::PhaseCompleted { .. }))
            .collect();
        assert_eq!(completions.len(), 1);

        let recs = records(&events);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].duration_minutes, 25);
        assert_eq!(recs[0].cycle_index, 0);

        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.run_state(), RunState::Stopped);
        assert_eq!(engine.remaining(), 300);
        assert_eq!(engine.cycle_count(), 1);

        // Stopped: further ticks do nothing
        assert!(engine.tick(focus_util::now()).is_empty());
    }

    #[test]
    fn test_completion_event_order() {
        let (mut engine, _) = engine_with(tiny_preset());
        let events = run_phase(&mut engine);

        let tail: Vec<_> = events.iter().skip(3).cloned().collect();
        assert!(matches!(
            tail.as_slice(),
            [
                CoreEvent::PhaseCompleted {
                    phase: Phase::Work,
                    record: Some(_)
                },
                CoreEvent::PhaseChanged {
                    phase: Phase::ShortBreak,
                    cycle_index: 1
                },
                CoreEvent::RunStateChanged {
                    run_state: RunState::Stopped
                },
            ]
        ));
        assert!(matches!(
            events[2],
            CoreEvent::Tick {
                remaining_seconds: 0,
                phase: Phase::Work
            }
        ));
    }

    #[test]
    fn test_pause_freezes_remaining() {
        let (mut engine, _) = engine_with(Preset::classic());
        engine.start(focus_util::now());
        engine.tick(focus_util::now());
        engine.tick(focus_util::now());

        let events = engine.pause();
        assert_eq!(
            events,
            vec![CoreEvent::RunStateChanged {
                run_state: RunState::Paused
            }]
        );

        for _ in 0..60 {
            assert!(engine.tick(focus_util::now()).is_empty());
        }
        assert_eq!(engine.remaining(), 1498);
        assert!(engine.pause().is_empty());
    }

    #[test]
    fn test_reset_while_running() {
        let (mut engine, _) = engine_with(tiny_preset());
        run_phase(&mut engine); // now in ShortBreak, counter 1
        engine.start(focus_util::now());
        engine.tick(focus_util::now());

        engine.reset();
        assert_eq!(engine.run_state(), RunState::Stopped);
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.remaining(), 2);
        assert_eq!(engine.cycle_count(), 1);
        assert!(engine.snapshot().started_at.is_none());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (mut engine, _) = engine_with(Preset::classic());
        engine.start(focus_util::now());
        engine.tick(focus_util::now());

        engine.reset();
        let once = engine.snapshot();
        assert!(engine.reset().is_empty());
        assert_eq!(engine.snapshot(), once);
    }

    #[test]
    fn test_change_phase_rejected_while_running() {
        let (mut engine, _) = engine_with(Preset::classic());
        engine.start(focus_util::now());
        engine.tick(focus_util::now());
        let before = engine.snapshot();

        let err = engine.change_phase(Phase::LongBreak).unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(engine.snapshot(), before);

        engine.pause();
        assert!(engine.change_phase(Phase::LongBreak).is_err());
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.remaining(), 1499);
    }

    #[test]
    fn test_change_phase_while_stopped() {
        let (mut engine, _) = engine_with(Preset::classic());
        let events = engine.change_phase(Phase::LongBreak).unwrap();

        assert_eq!(
            events,
            vec![CoreEvent::PhaseChanged {
                phase: Phase::LongBreak,
                cycle_index: 0
            }]
        );
        assert_eq!(engine.remaining(), 900);
        assert_eq!(engine.run_state(), RunState::Stopped);
    }

    #[test]
    fn test_four_cycle_scenario() {
        let (mut engine, _) = engine_with(Preset::classic());
        let mut phases = Vec::new();
        let mut all_events = Vec::new();

        for _ in 0..8 {
            phases.push(engine.phase());
            all_events.extend(run_phase(&mut engine));
        }

        assert_eq!(
            phases,
            vec![
                Phase::Work,
                Phase::ShortBreak,
                Phase::Work,
                Phase::ShortBreak,
                Phase::Work,
                Phase::ShortBreak,
                Phase::Work,
                Phase::LongBreak,
            ]
        );

        let recs = records(&all_events);
        assert_eq!(recs.len(), 4);
        let indices: Vec<_> = recs.iter().map(|r| r.cycle_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(recs.iter().all(|r| r.phase == Phase::Work));

        // Long break done: back to the start of a cycle
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.cycle_count(), 0);
    }

    #[test]
    fn test_selection_read_at_completion() {
        let (mut engine, selection) = engine_with(Preset::classic());
        selection.set(Some(SelectedTask {
            id: TaskId::new("t-1"),
            skill_ids: vec![SkillId::new("rust")],
        }));

        engine.start(focus_util::now());
        let mut events = Vec::new();
        for second in 0..1500 {
            if second == 10 {
                selection.clear();
            }
            events.extend(engine.tick(focus_util::now()));
        }

        let recs = records(&events);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].task_id.is_none());
        assert!(recs[0].skill_ids.is_empty());
    }

    #[test]
    fn test_selection_made_mid_session_is_honored() {
        let (mut engine, selection) = engine_with(tiny_preset());
        engine.start(focus_util::now());
        engine.tick(focus_util::now());

        selection.set(Some(SelectedTask {
            id: TaskId::new("t-2"),
            skill_ids: vec![],
        }));
        engine.tick(focus_util::now());
        let events = engine.tick(focus_util::now());

        let recs = records(&events);
        assert_eq!(recs[0].task_id, Some(TaskId::new("t-2")));
    }

    #[test]
    fn test_record_uses_accrual_start() {
        let (mut engine, _) = engine_with(tiny_preset());
        let started = focus_util::now();
        engine.start(started);
        engine.tick(started);
        engine.pause();
        engine.start(started + chrono::Duration::seconds(30));
        engine.tick(started);

        let end = started + chrono::Duration::seconds(45);
        let recs = records(&engine.tick(end));
        assert_eq!(recs[0].start_time, started);
        assert_eq!(recs[0].end_time, end);
    }

    #[test]
    fn test_switch_preset_only_when_stopped() {
        let (mut engine, _) = engine_with(Preset::classic());
        engine.start(focus_util::now());

        let err = engine.switch_preset(Preset::short()).unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(engine.preset().id.as_str(), "classic");

        engine.reset();
        let events = engine.switch_preset(Preset::short()).unwrap();
        assert_eq!(
            events,
            vec![
                CoreEvent::PresetSwitched {
                    preset_id: PresetId::new("short")
                },
                CoreEvent::PhaseChanged {
                    phase: Phase::Work,
                    cycle_index: 0
                },
            ]
        );
        assert_eq!(engine.remaining(), 900);
    }

    #[test]
    fn test_switch_preset_restarts_cycle() {
        let (mut engine, _) = engine_with(tiny_preset());
        run_phase(&mut engine);
        assert_eq!(engine.cycle_count(), 1);

        engine.switch_preset(Preset::classic()).unwrap();
        assert_eq!(engine.cycle_count(), 0);
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.remaining(), 1500);
    }

    #[test]
    fn test_auto_start_breaks() {
        let mut preset = tiny_preset();
        preset.auto_start_breaks = true;
        let (mut engine, _) = engine_with(preset);

        let events = run_phase(&mut engine);
        assert!(!events.contains(&CoreEvent::RunStateChanged {
            run_state: RunState::Stopped
        }));
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.run_state(), RunState::Running);

        // auto_start_work is off: the break ends stopped
        for _ in 0..2 {
            engine.tick(focus_util::now());
        }
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.run_state(), RunState::Stopped);
    }

    #[test]
    fn test_restore_position() {
        let (mut engine, _) = engine_with(Preset::classic());
        engine.restore(Phase::ShortBreak, 6).unwrap();

        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.cycle_count(), 2);
        assert_eq!(engine.remaining(), 300);
        assert_eq!(engine.run_state(), RunState::Stopped);
    }
}
