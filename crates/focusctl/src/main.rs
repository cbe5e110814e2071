//! focusctl - command-line client for focusd

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use focus_api::{
    Command, EventPayload, NewTask, Phase, Preset, ResponsePayload, RunState, TaskUpdate,
    TimerSnapshot, MAX_RANGE_DAYS,
};
use focus_ipc::IpcClient;
use focus_util::{
    format_countdown, format_datetime_full, format_minutes, socket_path_without_env, PresetId,
    SkillId, TaskId,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// focusctl - control a running focusd
#[derive(Parser, Debug)]
#[command(name = "focusctl")]
#[command(about = "Control the focusd pomodoro timer", long_about = None)]
struct Args {
    /// Socket path (or set FOCUS_SOCKET env var)
    #[arg(short, long, env = "FOCUS_SOCKET", default_value_os_t = socket_path_without_env())]
    socket: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show the timer state
    Status,
    /// Start or resume the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Stop and refill the current phase
    Reset,
    /// Switch to another phase (timer must be stopped)
    Phase { phase: PhaseArg },
    /// Manage presets
    #[command(subcommand)]
    Preset(PresetCmd),
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCmd),
    /// Manage skills
    #[command(subcommand)]
    Skill(SkillCmd),
    /// List completed sessions
    Records {
        /// Number of days to include, ending today
        #[arg(long, default_value_t = 1, value_parser = days_parser())]
        days: u32,
    },
    /// Focus statistics
    Stats {
        /// Number of days to include, ending today
        #[arg(long, default_value_t = 7, value_parser = days_parser())]
        days: u32,
    },
    /// Follow the countdown live
    Watch,
}

#[derive(Subcommand, Debug)]
enum PresetCmd {
    List,
    /// Load a preset (timer must be stopped)
    Use { id: String },
    /// Create or replace a custom preset; lengths are in minutes
    Add {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 25)]
        work: u32,
        #[arg(long, default_value_t = 5)]
        short: u32,
        #[arg(long, default_value_t = 15)]
        long: u32,
        /// Work sessions per long break
        #[arg(long, default_value_t = 4)]
        cadence: u32,
        #[arg(long)]
        auto_start_breaks: bool,
        #[arg(long)]
        auto_start_work: bool,
    },
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum TaskCmd {
    List,
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Skill id, repeatable
        #[arg(long = "skill")]
        skills: Vec<String>,
    },
    /// Attribute future work sessions to a task
    Select { id: String },
    /// Clear the selected task
    Clear,
    /// Mark a task completed
    Done { id: String },
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum SkillCmd {
    List,
    Add {
        name: String,
        #[arg(long, default_value = "#808080")]
        color: String,
    },
    Remove { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PhaseArg {
    Work,
    ShortBreak,
    LongBreak,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Work => Phase::Work,
            PhaseArg::ShortBreak => Phase::ShortBreak,
            PhaseArg::LongBreak => Phase::LongBreak,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to focusd at {:?}", args.socket))?;
    debug!(socket_path = %args.socket.display(), "Connected");

    match args.command {
        Cmd::Status => print_state(&expect_state(client.call(Command::GetState).await?)?),
        Cmd::Start => print_state(&expect_state(client.call(Command::Start).await?)?),
        Cmd::Pause => print_state(&expect_state(client.call(Command::Pause).await?)?),
        Cmd::Reset => print_state(&expect_state(client.call(Command::Reset).await?)?),
        Cmd::Phase { phase } => {
            let payload = client
                .call(Command::ChangePhase {
                    phase: phase.into(),
                })
                .await?;
            print_state(&expect_state(payload)?);
        }
        Cmd::Preset(cmd) => preset(&mut client, cmd).await?,
        Cmd::Task(cmd) => task(&mut client, cmd).await?,
        Cmd::Skill(cmd) => skill(&mut client, cmd).await?,
        Cmd::Records { days } => {
            let (from, to) = last_days(days)?;
            let ResponsePayload::Records(records) =
                client.call(Command::ListRecords { from, to }).await?
            else {
                bail!("Unexpected response to ListRecords");
            };
            for record in records {
                println!(
                    "{}  {:>3} min  cycle {}  {}",
                    format_datetime_full(&record.start_time),
                    record.duration_minutes,
                    record.cycle_index + 1,
                    record.task_id.as_ref().map(|t| t.as_str()).unwrap_or("-"),
                );
            }
        }
        Cmd::Stats { days } => {
            let (from, to) = last_days(days)?;
            let ResponsePayload::Stats(stats) = client.call(Command::GetStats { from, to }).await?
            else {
                bail!("Unexpected response to GetStats");
            };

            println!("{} to {}", stats.from, stats.to);
            println!(
                "Focus: {} over {} sessions ({:.0} min/day)",
                format_minutes(stats.total_minutes),
                stats.total_sessions,
                stats.average_daily_minutes
            );
            for day in &stats.daily {
                println!("  {}  {}", day.date, format_minutes(day.minutes));
            }
            for skill in &stats.by_skill {
                println!("  skill {}  {}", skill.skill_id, format_minutes(skill.minutes));
            }
            for task in &stats.by_task {
                println!("  task {}  {}", task.task_id, format_minutes(task.minutes));
            }
        }
        Cmd::Watch => watch(client).await?,
    }

    Ok(())
}

async fn preset(client: &mut IpcClient, cmd: PresetCmd) -> Result<()> {
    match cmd {
        PresetCmd::List => {
            let ResponsePayload::Presets(presets) = client.call(Command::ListPresets).await? else {
                bail!("Unexpected response to ListPresets");
            };
            let active = expect_state(client.call(Command::GetState).await?)?.preset_id;
            for p in presets {
                let marker = if p.id == active { "*" } else { " " };
                println!(
                    "{} {:<12} {:<16} {}/{}/{} every {}",
                    marker,
                    p.id.as_str(),
                    p.name,
                    format_countdown(p.work_length),
                    format_countdown(p.short_break_length),
                    format_countdown(p.long_break_length),
                    p.sessions_until_long_break
                );
            }
        }
        PresetCmd::Use { id } => {
            let payload = client
                .call(Command::SwitchPreset {
                    preset_id: PresetId::new(id),
                })
                .await?;
            print_state(&expect_state(payload)?);
        }
        PresetCmd::Add {
            id,
            name,
            work,
            short,
            long,
            cadence,
            auto_start_breaks,
            auto_start_work,
        } => {
            let preset = Preset {
                name: name.unwrap_or_else(|| id.clone()),
                id: PresetId::new(id),
                work_length: work * 60,
                short_break_length: short * 60,
                long_break_length: long * 60,
                sessions_until_long_break: cadence,
                auto_start_breaks,
                auto_start_work,
            };
            client.call(Command::SavePreset { preset }).await?;
            println!("Preset saved");
        }
        PresetCmd::Remove { id } => {
            client
                .call(Command::DeletePreset {
                    preset_id: PresetId::new(id),
                })
                .await?;
            println!("Preset removed");
        }
    }
    Ok(())
}

async fn task(client: &mut IpcClient, cmd: TaskCmd) -> Result<()> {
    match cmd {
        TaskCmd::List => {
            let ResponsePayload::Tasks(tasks) = client.call(Command::ListTasks).await? else {
                bail!("Unexpected response to ListTasks");
            };
            for t in tasks {
                let done = if t.completed { "x" } else { " " };
                println!("[{}] {}  {}", done, t.id, t.title);
            }
        }
        TaskCmd::Add {
            title,
            description,
            skills,
        } => {
            let task = NewTask {
                title,
                description,
                skill_ids: skills.into_iter().map(SkillId::new).collect(),
            };
            let ResponsePayload::Task(task) = client.call(Command::CreateTask { task }).await?
            else {
                bail!("Unexpected response to CreateTask");
            };
            println!("{}", task.id);
        }
        TaskCmd::Select { id } => {
            let payload = client
                .call(Command::SelectTask {
                    task_id: Some(TaskId::new(id)),
                })
                .await?;
            print_state(&expect_state(payload)?);
        }
        TaskCmd::Clear => {
            client.call(Command::SelectTask { task_id: None }).await?;
            println!("Selection cleared");
        }
        TaskCmd::Done { id } => {
            let update = TaskUpdate {
                completed: Some(true),
                ..Default::default()
            };
            client
                .call(Command::UpdateTask {
                    task_id: TaskId::new(id),
                    update,
                })
                .await?;
            println!("Task completed");
        }
        TaskCmd::Remove { id } => {
            client
                .call(Command::DeleteTask {
                    task_id: TaskId::new(id),
                })
                .await?;
            println!("Task removed");
        }
    }
    Ok(())
}

async fn skill(client: &mut IpcClient, cmd: SkillCmd) -> Result<()> {
    match cmd {
        SkillCmd::List => {
            let ResponsePayload::Skills(skills) = client.call(Command::ListSkills).await? else {
                bail!("Unexpected response to ListSkills");
            };
            for s in skills {
                println!("{}  {}  {}", s.id, s.color, s.name);
            }
        }
        SkillCmd::Add { name, color } => {
            let ResponsePayload::Skill(skill) =
                client.call(Command::CreateSkill { name, color }).await?
            else {
                bail!("Unexpected response to CreateSkill");
            };
            println!("{}", skill.id);
        }
        SkillCmd::Remove { id } => {
            client
                .call(Command::DeleteSkill {
                    skill_id: SkillId::new(id),
                })
                .await?;
            println!("Skill removed");
        }
    }
    Ok(())
}

async fn watch(client: IpcClient) -> Result<()> {
    let mut events = client.subscribe().await?;

    loop {
        let event = events.next().await?;
        match event.payload {
            EventPayload::Tick {
                remaining_seconds,
                phase,
            } => println!("{}", title_line(remaining_seconds, phase)),
            EventPayload::StateChanged(state) => {
                println!("{}", title_line(state.remaining_seconds, state.phase))
            }
            EventPayload::PhaseCompleted { phase, record } => match record {
                Some(r) => println!("{} complete ({} min)", phase.label(), r.duration_minutes),
                None => println!("{} complete", phase.label()),
            },
            EventPayload::RecordSaveFailed { record_id, message } => {
                eprintln!("Session {} was not saved: {}", record_id, message)
            }
            EventPayload::Shutdown => {
                println!("focusd is shutting down");
                return Ok(());
            }
            _ => {}
        }
    }
}

fn title_line(remaining_seconds: u32, phase: Phase) -> String {
    format!("{} - {}", format_countdown(remaining_seconds), phase.label())
}

fn expect_state(payload: ResponsePayload) -> Result<TimerSnapshot> {
    match payload {
        ResponsePayload::State(state) => Ok(state),
        other => bail!("Unexpected response: {:?}", other),
    }
}

fn print_state(state: &TimerSnapshot) {
    let run = match state.run_state {
        RunState::Stopped => "stopped",
        RunState::Running => "running",
        RunState::Paused => "paused",
    };
    println!(
        "{}  ({}, preset {}, session {}/{})",
        title_line(state.remaining_seconds, state.phase),
        run,
        state.preset_id,
        state.cycle_count + 1,
        state.sessions_until_long_break
    );
    if let Some(task) = &state.selected_task {
        println!("Task: {}", task.id);
    }
}

fn days_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_RANGE_DAYS))
}

/// The `days` calendar days ending today
fn last_days(days: u32) -> Result<(NaiveDate, NaiveDate)> {
    let today = focus_util::now().date_naive();
    let span = i64::from(days.max(1)) - 1;
    let Some(from) = today.checked_sub_signed(Duration::days(span)) else {
        bail!("{} days back from {} is out of range", days, today);
    };
    Ok((from, today))
}
