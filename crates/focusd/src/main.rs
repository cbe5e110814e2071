//! focusd - The focusd background service
//!
//! This is the main entry point for the focusd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization and restart snapshot
//! - Timer engine and its ticker
//! - IPC server

use anyhow::{Context as _, Result};
use clap::Parser;
use focus_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response, ResponsePayload,
    RunState, User,
};
use focus_config::load_config_or_default;
use focus_core::{
    checked_range, summarize, CoreEvent, SharedSelection, StoreSink, TaskSelection, TimerEngine,
    TimerService,
};
use focus_ipc::{IpcServer, ServerMessage};
use focus_store::{
    database_path, AuditEvent, AuditEventType, SqliteStore, StateSnapshot, Store, StoreError,
};
use focus_util::{default_config_path, ClientId, FocusError, TaskId};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

/// focusd - Pomodoro timer service
#[derive(Parser, Debug)]
#[command(name = "focusd")]
#[command(about = "Pomodoro timer service with focus session history", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/focusd/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set FOCUS_SOCKET env var)
    #[arg(short, long, env = "FOCUS_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set FOCUS_DATA_DIR env var)
    #[arg(short, long, env = "FOCUS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    ctx: Context,
    timer_events: mpsc::UnboundedReceiver<CoreEvent>,
}

/// Handles shared by the event loop handlers
struct Context {
    timer: TimerService,
    selection: SharedSelection,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    user: User,
}

type CommandResult = std::result::Result<ResponsePayload, ErrorInfo>;

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let settings = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            preset_count = settings.presets.len(),
            user_id = %settings.user.id(),
            "Configuration loaded"
        );

        // Determine paths
        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| settings.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.service.data_dir.clone());

        // Initialize store
        let db_path = database_path(&data_dir, &settings.user);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }

        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted {
            user_id: settings.user.id().clone(),
        }))?;
        store.append_audit(AuditEvent::new(AuditEventType::ConfigLoaded {
            preset_count: settings.presets.len(),
        }))?;

        // Presets declared in the config file are kept in the store so that
        // clients see a single list
        for preset in settings.presets.iter().filter(|p| !p.is_reserved()) {
            store
                .save_preset(preset)
                .with_context(|| format!("Failed to store preset {}", preset.id))?;
        }

        let snapshot = store.load_snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load restart snapshot, starting fresh");
            None
        });

        let restored_preset = snapshot.as_ref().and_then(|s| {
            store.get_preset(&s.preset_id).unwrap_or_else(|e| {
                warn!(preset_id = %s.preset_id, error = %e, "Failed to load snapshot preset");
                None
            })
        });
        let preset = restored_preset.unwrap_or_else(|| settings.initial_preset());

        // Initialize timer engine
        let selection = SharedSelection::new();
        let shared: Arc<dyn TaskSelection> = Arc::new(selection.clone());
        let mut engine = TimerEngine::new(preset, shared);

        if let Some(snap) = snapshot.filter(|s| s.preset_id == engine.preset().id) {
            engine
                .restore(snap.phase, snap.cycle_count)
                .context("Failed to restore timer position")?;

            if let Some(task_id) = &snap.selected_task_id {
                match store.get_task(task_id) {
                    Ok(Some(task)) => selection.set(Some(task.selection())),
                    Ok(None) => debug!(task_id = %task_id, "Selected task no longer exists"),
                    Err(e) => warn!(task_id = %task_id, error = %e, "Failed to load selected task"),
                }
            }

            info!(
                preset_id = %snap.preset_id,
                phase = ?snap.phase,
                cycle_count = snap.cycle_count,
                "Restored timer from snapshot"
            );

            store.append_audit(AuditEvent::new(AuditEventType::SnapshotRestored {
                preset_id: snap.preset_id,
                phase: snap.phase,
            }))?;
        }

        let sink = Arc::new(StoreSink::new(store.clone()));
        let (timer, timer_events) = TimerService::new(engine, sink);

        // Initialize IPC server
        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            ctx: Context {
                timer,
                selection,
                ipc: Arc::new(ipc),
                store,
                user: settings.user,
            },
            timer_events,
        })
    }

    async fn run(self) -> Result<()> {
        let Service {
            ctx,
            mut timer_events,
        } = self;

        let mut ipc_messages = ctx
            .ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        // Spawn IPC accept task
        let ipc_accept = ctx.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Ticks, completions and state changes from the timer
                Some(event) = timer_events.recv() => {
                    ctx.handle_core_event(event).await;
                }

                // IPC messages
                Some(msg) = ipc_messages.recv() => {
                    ctx.handle_ipc_message(msg).await;
                }
            }
        }

        // Graceful shutdown
        info!("Shutting down focusd");

        ctx.timer.shutdown().await;
        ctx.save_snapshot().await;
        ctx.ipc.broadcast_event(Event::new(EventPayload::Shutdown));

        if let Err(e) = ctx
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        ctx.ipc.shutdown();

        info!("Shutdown complete");
        Ok(())
    }
}

impl Context {
    async fn handle_core_event(&self, event: CoreEvent) {
        match &event {
            CoreEvent::Tick { remaining_seconds, .. } => {
                trace!(remaining_seconds, "Tick");
            }

            CoreEvent::PhaseCompleted { phase, record } => {
                info!(
                    phase = ?phase,
                    record_id = ?record.as_ref().map(|r| r.id.as_str()),
                    minutes = ?record.as_ref().map(|r| r.duration_minutes),
                    "Phase completed"
                );
                self.audit(AuditEventType::PhaseCompleted {
                    phase: *phase,
                    record_id: record.as_ref().map(|r| r.id.clone()),
                });
            }

            CoreEvent::PhaseChanged { phase, cycle_index } => {
                debug!(phase = ?phase, cycle_index, "Phase changed");
                self.save_snapshot().await;
            }

            CoreEvent::RecordSaveFailed { record_id, message } => {
                error!(record_id = %record_id, error = %message, "Session record was not saved");
            }

            CoreEvent::RunStateChanged { run_state } => {
                debug!(run_state = %run_state, "Run state changed");
            }

            CoreEvent::PresetSwitched { preset_id } => {
                info!(preset_id = %preset_id, "Preset switched");
                self.save_snapshot().await;
            }
        }

        let follow_snapshot = matches!(event, CoreEvent::RunStateChanged { .. });
        self.ipc.broadcast_event(Event::new(event_payload(event)));

        if follow_snapshot {
            self.broadcast_state().await;
        }
    }

    async fn handle_ipc_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let subscribing = matches!(request.command, Command::SubscribeEvents);

                let response = match self.handle_command(&client_id, request.command).await {
                    Ok(payload) => Response::success(request.request_id, payload),
                    Err(err) => {
                        debug!(
                            client_id = %client_id,
                            code = ?err.code,
                            message = %err.message,
                            "Command rejected"
                        );
                        Response::error(request.request_id, err)
                    }
                };

                let _ = self.ipc.send_response(&client_id, response).await;

                // New subscribers start from a full snapshot
                if subscribing {
                    self.broadcast_state().await;
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                self.audit(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    role: format!("{:?}", info.role),
                    uid: info.uid,
                });
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                self.audit(AuditEventType::ClientDisconnected {
                    client_id: client_id.to_string(),
                });
            }
        }
    }

    async fn handle_command(&self, client_id: &ClientId, command: Command) -> CommandResult {
        if command.is_mutating() {
            let can_control = self
                .ipc
                .get_client_info(client_id)
                .await
                .is_some_and(|info| info.role.can_control());
            if !can_control {
                return Err(ErrorInfo::new(
                    ErrorCode::PermissionDenied,
                    "Only the timer owner may change it",
                ));
            }
        }

        match command {
            Command::GetState => Ok(ResponsePayload::State(self.timer.snapshot().await)),

            Command::Start => {
                self.timer.start().await;
                let state = self.timer.snapshot().await;
                self.audit(AuditEventType::TimerStarted {
                    phase: state.phase,
                    remaining_seconds: state.remaining_seconds,
                });
                Ok(ResponsePayload::State(state))
            }

            Command::Pause => {
                self.timer.pause().await;
                let state = self.timer.snapshot().await;
                if state.run_state == RunState::Paused {
                    self.audit(AuditEventType::TimerPaused {
                        phase: state.phase,
                        remaining_seconds: state.remaining_seconds,
                    });
                }
                Ok(ResponsePayload::State(state))
            }

            Command::Reset => {
                self.timer.reset().await;
                let state = self.timer.snapshot().await;
                self.audit(AuditEventType::TimerReset { phase: state.phase });
                Ok(ResponsePayload::State(state))
            }

            Command::ChangePhase { phase } => {
                self.timer.change_phase(phase).await.map_err(focus_error)?;
                self.audit(AuditEventType::PhaseChanged { phase });
                Ok(ResponsePayload::State(self.timer.snapshot().await))
            }

            Command::SwitchPreset { preset_id } => {
                let preset = self
                    .store
                    .get_preset(&preset_id)
                    .map_err(store_error)?
                    .ok_or_else(|| focus_error(FocusError::PresetNotFound(preset_id.clone())))?;

                self.timer.switch_preset(preset).await.map_err(focus_error)?;
                self.audit(AuditEventType::PresetSwitched { preset_id });
                Ok(ResponsePayload::State(self.timer.snapshot().await))
            }

            Command::SelectTask { task_id } => {
                let selected = match &task_id {
                    Some(id) => Some(
                        self.store
                            .get_task(id)
                            .map_err(store_error)?
                            .ok_or_else(|| focus_error(FocusError::TaskNotFound(id.clone())))?
                            .selection(),
                    ),
                    None => None,
                };

                info!(task_id = ?task_id.as_ref().map(|t| t.as_str()), "Task selected");
                self.selection.set(selected);
                self.audit(AuditEventType::TaskSelected { task_id });
                self.save_snapshot().await;
                self.broadcast_state().await;
                Ok(ResponsePayload::State(self.timer.snapshot().await))
            }

            Command::ListPresets => Ok(ResponsePayload::Presets(
                self.store.list_presets().map_err(store_error)?,
            )),

            Command::SavePreset { preset } => {
                if let Some(field) = preset.invalid_field() {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidRequest,
                        format!("Preset field '{}' must be positive", field),
                    ));
                }

                self.store.save_preset(&preset).map_err(store_error)?;
                info!(preset_id = %preset.id, "Preset saved");
                self.audit(AuditEventType::PresetSaved {
                    preset_id: preset.id.clone(),
                });
                Ok(ResponsePayload::PresetSaved(preset))
            }

            Command::DeletePreset { preset_id } => {
                self.store.delete_preset(&preset_id).map_err(store_error)?;
                info!(preset_id = %preset_id, "Preset deleted");
                self.audit(AuditEventType::PresetDeleted { preset_id });
                Ok(ResponsePayload::Deleted)
            }

            Command::ListTasks => Ok(ResponsePayload::Tasks(
                self.store.list_tasks().map_err(store_error)?,
            )),

            Command::CreateTask { task } => {
                let task = self.store.create_task(task).map_err(store_error)?;
                info!(task_id = %task.id, "Task created");
                Ok(ResponsePayload::Task(task))
            }

            Command::UpdateTask { task_id, update } => {
                let task = self
                    .store
                    .update_task(&task_id, update)
                    .map_err(store_error)?;

                if self.selected_task_id().as_ref() == Some(&task.id) {
                    self.selection.set(Some(task.selection()));
                }
                Ok(ResponsePayload::Task(task))
            }

            Command::DeleteTask { task_id } => {
                self.store.delete_task(&task_id).map_err(store_error)?;
                info!(task_id = %task_id, "Task deleted");

                if self.selected_task_id().as_ref() == Some(&task_id) {
                    self.selection.clear();
                    self.audit(AuditEventType::TaskSelected { task_id: None });
                    self.save_snapshot().await;
                    self.broadcast_state().await;
                }
                Ok(ResponsePayload::Deleted)
            }

            Command::ListSkills => Ok(ResponsePayload::Skills(
                self.store.list_skills().map_err(store_error)?,
            )),

            Command::CreateSkill { name, color } => {
                let skill = self
                    .store
                    .create_skill(&name, &color)
                    .map_err(store_error)?;
                Ok(ResponsePayload::Skill(skill))
            }

            Command::DeleteSkill { skill_id } => {
                self.store.delete_skill(&skill_id).map_err(store_error)?;

                // The selected task may have lost this skill
                if let Some(task_id) = self.selected_task_id() {
                    match self.store.get_task(&task_id) {
                        Ok(Some(task)) => self.selection.set(Some(task.selection())),
                        Ok(None) => self.selection.clear(),
                        Err(e) => warn!(task_id = %task_id, error = %e, "Failed to refresh selected task"),
                    }
                }
                Ok(ResponsePayload::Deleted)
            }

            Command::ListRecords { from, to } => {
                let (from, to) = checked_range(from, to).map_err(focus_error)?;
                Ok(ResponsePayload::Records(
                    self.store.list_records(from, to).map_err(store_error)?,
                ))
            }

            Command::GetStats { from, to } => {
                let (from, to) = checked_range(from, to).map_err(focus_error)?;
                let records = self.store.list_records(from, to).map_err(store_error)?;
                Ok(ResponsePayload::Stats(summarize(&records, from, to)))
            }

            Command::SubscribeEvents => {
                info!(client_id = %client_id, "Client subscribed to events");
                Ok(ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                })
            }

            Command::UnsubscribeEvents => Ok(ResponsePayload::Unsubscribed),

            Command::GetHealth => Ok(ResponsePayload::Health(HealthStatus {
                live: true,
                ready: true,
                store_ok: self.store.is_healthy(),
                user: self.user.clone(),
            })),

            Command::Ping => Ok(ResponsePayload::Pong),
        }
    }

    fn selected_task_id(&self) -> Option<TaskId> {
        self.selection.current().map(|t| t.id)
    }

    async fn broadcast_state(&self) {
        let state = self.timer.snapshot().await;
        self.ipc
            .broadcast_event(Event::new(EventPayload::StateChanged(state)));
    }

    /// Persist the position the timer comes back to after a restart
    async fn save_snapshot(&self) {
        let state = self.timer.snapshot().await;
        let snapshot = StateSnapshot {
            timestamp: focus_util::now(),
            preset_id: state.preset_id,
            phase: state.phase,
            cycle_count: state.cycle_count,
            selected_task_id: state.selected_task.map(|t| t.id),
        };

        if let Err(e) = self.store.save_snapshot(&snapshot) {
            warn!(error = %e, "Failed to save restart snapshot");
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to write audit entry");
        }
    }
}

fn event_payload(event: CoreEvent) -> EventPayload {
    match event {
        CoreEvent::Tick {
            remaining_seconds,
            phase,
        } => EventPayload::Tick {
            remaining_seconds,
            phase,
        },
        CoreEvent::PhaseCompleted { phase, record } => {
            EventPayload::PhaseCompleted { phase, record }
        }
        CoreEvent::PhaseChanged { phase, cycle_index } => {
            EventPayload::PhaseChanged { phase, cycle_index }
        }
        CoreEvent::RecordSaveFailed { record_id, message } => {
            EventPayload::RecordSaveFailed { record_id, message }
        }
        CoreEvent::RunStateChanged { run_state } => EventPayload::RunStateChanged { run_state },
        CoreEvent::PresetSwitched { preset_id } => EventPayload::PresetSwitched { preset_id },
    }
}

fn focus_error(err: FocusError) -> ErrorInfo {
    let code = match &err {
        FocusError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
        FocusError::PresetNotFound(_)
        | FocusError::TaskNotFound(_)
        | FocusError::SkillNotFound(_) => ErrorCode::NotFound,
        FocusError::ReservedPreset(_) => ErrorCode::ReservedPreset,
        FocusError::PermissionDenied(_) => ErrorCode::PermissionDenied,
        FocusError::StoreError(_) => ErrorCode::StoreError,
        FocusError::ConfigError(_) | FocusError::ValidationError(_) => ErrorCode::InvalidRequest,
        FocusError::IpcError(_) | FocusError::Internal(_) => ErrorCode::InternalError,
    };
    ErrorInfo::new(code, err.to_string())
}

fn store_error(err: StoreError) -> ErrorInfo {
    let code = match &err {
        StoreError::NotFound(_) => ErrorCode::NotFound,
        StoreError::ReservedPreset(_) => ErrorCode::ReservedPreset,
        StoreError::Duplicate(_) | StoreError::Invalid(_) => ErrorCode::InvalidRequest,
        StoreError::Database(_) | StoreError::Serialization(_) | StoreError::Io(_) => {
            ErrorCode::StoreError
        }
    };
    ErrorInfo::new(code, err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "focusd starting");

    // Create and run the service
    let service = Service::new(&args).await?;
    service.run().await
}
