//! Async driver for the timer engine
//!
//! Owns the one-second ticker and hands completed session records to a
//! [`RecordSink`] without blocking the countdown.

use async_trait::async_trait;
use focus_api::{Phase, Preset, RunState, SessionRecord, TimerSnapshot};
use focus_util::Result;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{CoreEvent, TimerEngine};

/// Delay between ticks. Re-armed only after the previous tick is applied.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How long shutdown waits for in-flight record writes
pub const PERSIST_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure reported by a record sink
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Where completed session records go
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn persist(&self, record: &SessionRecord) -> std::result::Result<(), SinkError>;
}

/// Shared handle to the engine plus its ticker
///
/// Cloning is cheap; all clones drive the same engine.
#[derive(Clone)]
pub struct TimerService {
    engine: Arc<Mutex<TimerEngine>>,
    sink: Arc<dyn RecordSink>,
    events: mpsc::UnboundedSender<CoreEvent>,
    ticker: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
    pending: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
}

impl TimerService {
    /// Wrap an engine. Events are delivered on the returned receiver.
    pub fn new(
        engine: TimerEngine,
        sink: Arc<dyn RecordSink>,
    ) -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            engine: Arc::new(Mutex::new(engine)),
            sink,
            events: tx,
            ticker: Arc::new(std::sync::Mutex::new(None)),
            pending: Arc::new(std::sync::Mutex::new(Vec::new())),
        };
        (service, rx)
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.engine.lock().await.snapshot()
    }

    pub async fn preset(&self) -> Preset {
        self.engine.lock().await.preset().clone()
    }

    pub async fn start(&self) {
        let events = self.engine.lock().await.start(focus_util::now());
        if !events.is_empty() {
            self.spawn_ticker();
        }
        self.dispatch(events);
    }

    pub async fn pause(&self) {
        let events = {
            let mut engine = self.engine.lock().await;
            engine.pause()
        };
        self.cancel_ticker();
        self.dispatch(events);
    }

    pub async fn reset(&self) {
        let events = {
            let mut engine = self.engine.lock().await;
            engine.reset()
        };
        self.cancel_ticker();
        self.dispatch(events);
    }

    pub async fn change_phase(&self, phase: Phase) -> Result<()> {
        let events = self.engine.lock().await.change_phase(phase)?;
        self.dispatch(events);
        Ok(())
    }

    pub async fn switch_preset(&self, preset: Preset) -> Result<()> {
        let events = self.engine.lock().await.switch_preset(preset)?;
        self.dispatch(events);
        Ok(())
    }

    pub async fn restore(&self, phase: Phase, cycle_count: u32) -> Result<()> {
        self.engine.lock().await.restore(phase, cycle_count)
    }

    /// Stop ticking and wait for record writes still in flight.
    /// The engine keeps its state.
    pub async fn shutdown(&self) {
        self.cancel_ticker();

        let pending = std::mem::take(&mut *lock_or_recover(&self.pending));
        let count = pending.len();
        let drain = async {
            for handle in pending {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Record writer task failed");
                }
            }
        };
        if tokio::time::timeout(PERSIST_DRAIN_TIMEOUT, drain).await.is_err() {
            warn!(pending = count, "Timed out waiting for session records to be saved");
        }

        debug!("Timer service shut down");
    }

    fn ticker_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        lock_or_recover(&self.ticker)
    }

    fn spawn_ticker(&self) {
        let mut slot = self.ticker_slot();
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let service = self.clone();
        *slot = Some(tokio::spawn(async move {
            service.run_ticker().await;
        }));
        debug!("Ticker spawned");
    }

    fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker_slot().take() {
            handle.abort();
            debug!("Ticker cancelled");
        }
    }

    async fn run_ticker(&self) {
        loop {
            tokio::time::sleep(TICK_INTERVAL).await;

            let (events, running) = {
                let mut engine = self.engine.lock().await;
                let events = engine.tick(focus_util::now());
                (events, engine.run_state() == RunState::Running)
            };
            self.dispatch(events);

            if !running {
                break;
            }
        }
    }

    fn dispatch(&self, events: Vec<CoreEvent>) {
        for event in events {
            if let CoreEvent::PhaseCompleted {
                record: Some(record),
                ..
            } = &event
            {
                self.persist(record.clone());
            }
            // Nobody listening is fine
            let _ = self.events.send(event);
        }
    }

    /// The timer does not wait for the write. A failure becomes an event.
    /// Handles are kept so shutdown can drain them.
    fn persist(&self, record: SessionRecord) {
        let sink = self.sink.clone();
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            match sink.persist(&record).await {
                Ok(()) => debug!(record_id = %record.id, "Session record saved"),
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "Failed to save session");
                    let _ = events.send(CoreEvent::RecordSaveFailed {
                        record_id: record.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        });

        let mut pending = lock_or_recover(&self.pending);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

fn lock_or_recover<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedSelection;
    use focus_util::PresetId;

    #[derive(Default)]
    struct MemorySink {
        records: std::sync::Mutex<Vec<SessionRecord>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl RecordSink for MemorySink {
        async fn persist(&self, record: &SessionRecord) -> std::result::Result<(), SinkError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(SinkError::new("disk full"));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn tiny_preset() -> Preset {
        Preset {
            id: PresetId::new("tiny"),
            name: "Tiny".into(),
            work_length: 5,
            short_break_length: 3,
            long_break_length: 4,
            sessions_until_long_break: 4,
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }

    fn service_with(
        preset: Preset,
        sink: Arc<MemorySink>,
    ) -> (TimerService, mpsc::UnboundedReceiver<CoreEvent>) {
        let engine = TimerEngine::new(preset, Arc::new(SharedSelection::new()));
        TimerService::new(engine, sink)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<CoreEvent>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn count_ticks(events: &[CoreEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, CoreEvent::Tick { .. }))
            .count()
    }

    /// Sleep past whole-second tick deadlines so ordering is unambiguous
    async fn advance_secs(secs: u64) {
        tokio::time::sleep(Duration::from_millis(secs * 1000 + 500)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let sink = Arc::new(MemorySink::default());
        let (service, mut rx) = service_with(Preset::classic(), sink);

        service.start().await;
        advance_secs(3).await;

        let events = drain(&mut rx);
        assert_eq!(count_ticks(&events), 3);
        assert_eq!(service.snapshot().await.remaining_seconds, 1497);
        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ghost_tick_after_pause() {
        let sink = Arc::new(MemorySink::default());
        let (service, mut rx) = service_with(Preset::classic(), sink);

        service.start().await;
        advance_secs(2).await;
        service.pause().await;
        drain(&mut rx);

        let frozen = service.snapshot().await.remaining_seconds;
        advance_secs(30).await;

        assert_eq!(count_ticks(&drain(&mut rx)), 0);
        assert_eq!(service.snapshot().await.remaining_seconds, frozen);
        assert_eq!(service.snapshot().await.run_state, RunState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ghost_tick_after_reset() {
        let sink = Arc::new(MemorySink::default());
        let (service, mut rx) = service_with(Preset::classic(), sink);

        service.start().await;
        advance_secs(5).await;
        service.reset().await;
        drain(&mut rx);
        advance_secs(10).await;

        assert!(drain(&mut rx).is_empty());
        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.remaining_seconds, 1500);
        assert_eq!(snapshot.run_state, RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_after_pause() {
        let sink = Arc::new(MemorySink::default());
        let (service, mut rx) = service_with(Preset::classic(), sink);

        service.start().await;
        advance_secs(2).await;
        service.pause().await;
        advance_secs(10).await;
        service.start().await;
        advance_secs(2).await;

        assert_eq!(count_ticks(&drain(&mut rx)), 4);
        assert_eq!(service.snapshot().await.remaining_seconds, 1496);
        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_persists_record() {
        let sink = Arc::new(MemorySink::default());
        let (service, mut rx) = service_with(tiny_preset(), sink.clone());

        service.start().await;
        advance_secs(5).await;

        let events = drain(&mut rx);
        let completions = events
            .iter()
            .filter(|e| matches!(e, CoreEvent::PhaseCompleted { .. }))
            .count();
        assert_eq!(completions, 1);

        let saved = sink.records.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].phase, Phase::Work);
        assert_eq!(saved[0].cycle_index, 0);

        // Stopped at the start of the break; the ticker has exited
        advance_secs(10).await;
        assert!(drain(&mut rx).is_empty());
        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.phase, Phase::ShortBreak);
        assert_eq!(snapshot.run_state, RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_pending_record() {
        let sink = Arc::new(MemorySink {
            delay: Some(Duration::from_secs(2)),
            ..Default::default()
        });
        let (service, _rx) = service_with(tiny_preset(), sink.clone());

        service.start().await;
        advance_secs(5).await;

        // Completed but still being written
        assert!(sink.records.lock().unwrap().is_empty());

        service.shutdown().await;
        assert_eq!(sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_does_not_block_timer() {
        let sink = Arc::new(MemorySink {
            fail: true,
            ..Default::default()
        });
        let (service, mut rx) = service_with(tiny_preset(), sink);

        service.start().await;
        advance_secs(5).await;

        let events = drain(&mut rx);
        let failures: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, CoreEvent::RecordSaveFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.phase, Phase::ShortBreak);
        assert_eq!(snapshot.cycle_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_start_keeps_ticking() {
        let mut preset = tiny_preset();
        preset.auto_start_breaks = true;
        preset.auto_start_work = true;
        let sink = Arc::new(MemorySink::default());
        let (service, mut rx) = service_with(preset, sink.clone());

        service.start().await;
        // Work (5) + ShortBreak (3) + 2 seconds of the next Work
        advance_secs(10).await;

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Work);
        assert_eq!(snapshot.run_state, RunState::Running);
        assert_eq!(snapshot.remaining_seconds, 3);
        assert_eq!(count_ticks(&drain(&mut rx)), 10);
        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_phase_rejected_while_running() {
        let sink = Arc::new(MemorySink::default());
        let (service, _rx) = service_with(Preset::classic(), sink);

        service.start().await;
        advance_secs(1).await;
        let before = service.snapshot().await;

        let err = service.change_phase(Phase::ShortBreak).await.unwrap_err();
        assert!(err.is_invalid_transition());
        assert!(service.switch_preset(Preset::short()).await.is_err());
        assert_eq!(service.snapshot().await, before);
        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_ticker() {
        let sink = Arc::new(MemorySink::default());
        let (service, mut rx) = service_with(Preset::classic(), sink);

        service.start().await;
        advance_secs(1).await;
        service.shutdown().await;
        drain(&mut rx);

        advance_secs(5).await;
        assert!(drain(&mut rx).is_empty());
    }
}
