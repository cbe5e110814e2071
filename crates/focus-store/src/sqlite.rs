//! SQLite-based store implementation

use chrono::{DateTime, Local, NaiveDate};
use focus_api::{NewTask, Phase, Preset, SessionRecord, Skill, Task, TaskUpdate};
use focus_util::{PresetId, RecordId, SkillId, TaskId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::{AuditEvent, StateSnapshot, Store, StoreError, StoreResult};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Completed sessions (append-only)
            CREATE TABLE IF NOT EXISTS timer_records (
                id TEXT PRIMARY KEY,
                phase TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                day TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                cycle_index INTEGER NOT NULL,
                task_id TEXT,
                skill_ids_json TEXT NOT NULL DEFAULT '[]'
            );

            -- Custom presets
            CREATE TABLE IF NOT EXISTS presets (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                work_length INTEGER NOT NULL,
                short_break_length INTEGER NOT NULL,
                long_break_length INTEGER NOT NULL,
                sessions_until_long_break INTEGER NOT NULL,
                auto_start_breaks INTEGER NOT NULL DEFAULT 0,
                auto_start_work INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS skills (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS task_skills (
                task_id TEXT NOT NULL,
                skill_id TEXT NOT NULL,
                PRIMARY KEY (task_id, skill_id)
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- State snapshot (single row)
            CREATE TABLE IF NOT EXISTS snapshot (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                snapshot_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_records_day ON timer_records(day);
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| StoreError::Serialization(format!("invalid timestamp '{}': {}", s, e)))
}

fn phase_to_str(phase: Phase) -> &'static str {
    match phase {
        Phase::Work => "work",
        Phase::ShortBreak => "short_break",
        Phase::LongBreak => "long_break",
    }
}

fn phase_from_str(s: &str) -> StoreResult<Phase> {
    match s {
        "work" => Ok(Phase::Work),
        "short_break" => Ok(Phase::ShortBreak),
        "long_break" => Ok(Phase::LongBreak),
        other => Err(StoreError::Serialization(format!("unknown phase '{}'", other))),
    }
}

fn load_task(conn: &Connection, id: &TaskId) -> StoreResult<Option<Task>> {
    let row: Option<(String, Option<String>, bool, String, String)> = conn
        .query_row(
            "SELECT title, description, completed, created_at, updated_at
             FROM tasks WHERE id = ? AND deleted = 0",
            [id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()?;

    let Some((title, description, completed, created_at, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(Task {
        id: id.clone(),
        title,
        description,
        skill_ids: task_skill_ids(conn, id)?,
        completed,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    }))
}

fn task_skill_ids(conn: &Connection, id: &TaskId) -> StoreResult<Vec<SkillId>> {
    let mut stmt = conn.prepare(
        "SELECT ts.skill_id FROM task_skills ts
         JOIN skills s ON s.id = ts.skill_id
         WHERE ts.task_id = ? AND s.deleted = 0
         ORDER BY ts.rowid",
    )?;
    let ids = stmt
        .query_map([id.as_str()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids.into_iter().map(SkillId::new).collect())
}

fn ensure_skills_exist(conn: &Connection, skill_ids: &[SkillId]) -> StoreResult<()> {
    for skill_id in skill_ids {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM skills WHERE id = ? AND deleted = 0",
                [skill_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("skill {}", skill_id)));
        }
    }
    Ok(())
}

fn replace_task_skills(conn: &Connection, id: &TaskId, skill_ids: &[SkillId]) -> StoreResult<()> {
    conn.execute("DELETE FROM task_skills WHERE task_id = ?", [id.as_str()])?;
    for skill_id in skill_ids {
        conn.execute(
            "INSERT OR IGNORE INTO task_skills (task_id, skill_id) VALUES (?, ?)",
            params![id.as_str(), skill_id.as_str()],
        )?;
    }
    Ok(())
}

impl Store for SqliteStore {
    fn append_record(&self, record: &SessionRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        let skill_ids_json = serde_json::to_string(&record.skill_ids)?;

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO timer_records
                (id, phase, start_time, end_time, day, duration_minutes, cycle_index, task_id, skill_ids_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.id.as_str(),
                phase_to_str(record.phase),
                record.start_time.to_rfc3339(),
                record.end_time.to_rfc3339(),
                record.start_time.date_naive().format(DAY_FORMAT).to_string(),
                record.duration_minutes,
                record.cycle_index,
                record.task_id.as_ref().map(|t| t.as_str().to_string()),
                skill_ids_json,
            ],
        )?;

        if inserted == 0 {
            warn!(record_id = %record.id, "Duplicate session record rejected");
            return Err(StoreError::Duplicate(format!("record {}", record.id)));
        }

        debug!(
            record_id = %record.id,
            minutes = record.duration_minutes,
            cycle_index = record.cycle_index,
            "Session record appended"
        );
        Ok(())
    }

    fn list_records(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<SessionRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, phase, start_time, end_time, duration_minutes, cycle_index, task_id, skill_ids_json
            FROM timer_records
            WHERE day >= ? AND day <= ?
            ORDER BY start_time, id
            "#,
        )?;

        #[allow(clippy::type_complexity)]
        let rows: Vec<(String, String, String, String, u32, u32, Option<String>, String)> = stmt
            .query_map(
                params![
                    from.format(DAY_FORMAT).to_string(),
                    to.format(DAY_FORMAT).to_string()
                ],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                },
            )?
            .collect::<Result<_, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, phase, start, end, minutes, cycle_index, task_id, skill_ids_json) in rows {
            records.push(SessionRecord {
                id: RecordId::new(id),
                phase: phase_from_str(&phase)?,
                start_time: parse_timestamp(&start)?,
                end_time: parse_timestamp(&end)?,
                duration_minutes: minutes,
                cycle_index,
                task_id: task_id.map(TaskId::new),
                skill_ids: serde_json::from_str(&skill_ids_json)?,
            });
        }

        Ok(records)
    }

    fn list_presets(&self) -> StoreResult<Vec<Preset>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, work_length, short_break_length, long_break_length,
                   sessions_until_long_break, auto_start_breaks, auto_start_work
            FROM presets
            WHERE deleted = 0
            ORDER BY created_at, id
            "#,
        )?;

        let stored = stmt
            .query_map([], |row| {
                Ok(Preset {
                    id: PresetId::new(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    work_length: row.get(2)?,
                    short_break_length: row.get(3)?,
                    long_break_length: row.get(4)?,
                    sessions_until_long_break: row.get(5)?,
                    auto_start_breaks: row.get(6)?,
                    auto_start_work: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut presets = Preset::builtins();
        presets.extend(stored);
        Ok(presets)
    }

    fn get_preset(&self, id: &PresetId) -> StoreResult<Option<Preset>> {
        if let Some(builtin) = Preset::builtins().into_iter().find(|p| &p.id == id) {
            return Ok(Some(builtin));
        }

        let conn = self.conn()?;
        let preset = conn
            .query_row(
                r#"
                SELECT name, work_length, short_break_length, long_break_length,
                       sessions_until_long_break, auto_start_breaks, auto_start_work
                FROM presets WHERE id = ? AND deleted = 0
                "#,
                [id.as_str()],
                |row| {
                    Ok(Preset {
                        id: id.clone(),
                        name: row.get(0)?,
                        work_length: row.get(1)?,
                        short_break_length: row.get(2)?,
                        long_break_length: row.get(3)?,
                        sessions_until_long_break: row.get(4)?,
                        auto_start_breaks: row.get(5)?,
                        auto_start_work: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(preset)
    }

    fn save_preset(&self, preset: &Preset) -> StoreResult<()> {
        if preset.is_reserved() {
            return Err(StoreError::ReservedPreset(preset.id.clone()));
        }
        if preset.id.as_str().trim().is_empty() {
            return Err(StoreError::Invalid("preset id cannot be empty".into()));
        }
        if let Some(field) = preset.invalid_field() {
            return Err(StoreError::Invalid(format!(
                "preset '{}': {} must be positive",
                preset.id, field
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO presets
                (id, name, work_length, short_break_length, long_break_length,
                 sessions_until_long_break, auto_start_breaks, auto_start_work, created_at, deleted)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                work_length = excluded.work_length,
                short_break_length = excluded.short_break_length,
                long_break_length = excluded.long_break_length,
                sessions_until_long_break = excluded.sessions_until_long_break,
                auto_start_breaks = excluded.auto_start_breaks,
                auto_start_work = excluded.auto_start_work,
                deleted = 0
            "#,
            params![
                preset.id.as_str(),
                preset.name,
                preset.work_length,
                preset.short_break_length,
                preset.long_break_length,
                preset.sessions_until_long_break,
                preset.auto_start_breaks,
                preset.auto_start_work,
                focus_util::now().to_rfc3339(),
            ],
        )?;

        debug!(preset_id = %preset.id, "Preset saved");
        Ok(())
    }

    fn delete_preset(&self, id: &PresetId) -> StoreResult<()> {
        if Preset::is_reserved_id(id) {
            return Err(StoreError::ReservedPreset(id.clone()));
        }

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE presets SET deleted = 1 WHERE id = ? AND deleted = 0",
            [id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("preset {}", id)));
        }

        debug!(preset_id = %id, "Preset deleted");
        Ok(())
    }

    fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let conn = self.conn()?;

        let ids = {
            let mut stmt =
                conn.prepare("SELECT id FROM tasks WHERE deleted = 0 ORDER BY created_at, id")?;
            stmt.query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(task) = load_task(&conn, &TaskId::new(id))? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        let conn = self.conn()?;
        load_task(&conn, id)
    }

    fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        if task.title.trim().is_empty() {
            return Err(StoreError::Invalid("task title cannot be empty".into()));
        }

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        ensure_skills_exist(&tx, &task.skill_ids)?;

        let id = TaskId::generate();
        let now = focus_util::now().to_rfc3339();
        tx.execute(
            "INSERT INTO tasks (id, title, description, completed, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?)",
            params![id.as_str(), task.title, task.description, now, now],
        )?;
        replace_task_skills(&tx, &id, &task.skill_ids)?;
        tx.commit()?;

        debug!(task_id = %id, "Task created");
        load_task(&conn, &id)?.ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
    }

    fn update_task(&self, id: &TaskId, update: TaskUpdate) -> StoreResult<Task> {
        let conn = self.conn()?;
        let Some(mut task) = load_task(&conn, id)? else {
            return Err(StoreError::NotFound(format!("task {}", id)));
        };

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(StoreError::Invalid("task title cannot be empty".into()));
            }
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(completed) = update.completed {
            task.completed = completed;
        }

        let tx = conn.unchecked_transaction()?;
        if let Some(skill_ids) = &update.skill_ids {
            ensure_skills_exist(&tx, skill_ids)?;
            replace_task_skills(&tx, id, skill_ids)?;
        }
        tx.execute(
            "UPDATE tasks SET title = ?, description = ?, completed = ?, updated_at = ? WHERE id = ?",
            params![
                task.title,
                task.description,
                task.completed,
                focus_util::now().to_rfc3339(),
                id.as_str()
            ],
        )?;
        tx.commit()?;

        debug!(task_id = %id, "Task updated");
        load_task(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
    }

    fn delete_task(&self, id: &TaskId) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tasks SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0",
            params![focus_util::now().to_rfc3339(), id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("task {}", id)));
        }

        debug!(task_id = %id, "Task deleted");
        Ok(())
    }

    fn list_skills(&self) -> StoreResult<Vec<Skill>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, color, created_at FROM skills WHERE deleted = 0 ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, color, created_at)| -> StoreResult<Skill> {
                Ok(Skill {
                    id: SkillId::new(id),
                    name,
                    color,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    fn create_skill(&self, name: &str, color: &str) -> StoreResult<Skill> {
        if name.trim().is_empty() {
            return Err(StoreError::Invalid("skill name cannot be empty".into()));
        }

        let conn = self.conn()?;
        let skill = Skill {
            id: SkillId::generate(),
            name: name.to_string(),
            color: color.to_string(),
            created_at: focus_util::now(),
        };
        conn.execute(
            "INSERT INTO skills (id, name, color, created_at) VALUES (?, ?, ?, ?)",
            params![
                skill.id.as_str(),
                skill.name,
                skill.color,
                skill.created_at.to_rfc3339()
            ],
        )?;

        debug!(skill_id = %skill.id, "Skill created");
        Ok(skill)
    }

    fn delete_skill(&self, id: &SkillId) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE skills SET deleted = 1 WHERE id = ? AND deleted = 0",
            [id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("skill {}", id)));
        }
        conn.execute("DELETE FROM task_skills WHERE skill_id = ?", [id.as_str()])?;

        debug!(skill_id = %id, "Skill deleted");
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = parse_timestamp(&timestamp_str).unwrap_or_else(|_| focus_util::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn load_snapshot(&self) -> StoreResult<Option<StateSnapshot>> {
        let conn = self.conn()?;

        let json: Option<String> = conn
            .query_row("SELECT snapshot_json FROM snapshot WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(s) => {
                let snapshot: StateSnapshot = serde_json::from_str(&s)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn save_snapshot(&self, snapshot: &StateSnapshot) -> StoreResult<()> {
        let conn = self.conn()?;
        let json = serde_json::to_string(snapshot)?;

        conn.execute(
            r#"
            INSERT INTO snapshot (id, snapshot_json)
            VALUES (1, ?)
            ON CONFLICT(id)
            DO UPDATE SET snapshot_json = excluded.snapshot_json
            "#,
            [json],
        )?;

        debug!(preset_id = %snapshot.preset_id, phase = ?snapshot.phase, "Snapshot saved");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditEventType;
    use chrono::{Duration, TimeZone};
    use focus_util::UserId;

    fn record(id: &str, start: DateTime<Local>, cycle_index: u32) -> SessionRecord {
        SessionRecord {
            id: RecordId::new(id),
            phase: Phase::Work,
            start_time: start,
            end_time: start + Duration::minutes(25),
            duration_minutes: 25,
            cycle_index,
            task_id: None,
            skill_ids: vec![],
        }
    }

    fn custom_preset(id: &str) -> Preset {
        Preset {
            id: PresetId::new(id),
            name: "Deep Work".into(),
            work_length: 3000,
            short_break_length: 600,
            long_break_length: 1800,
            sessions_until_long_break: 3,
            auto_start_breaks: true,
            auto_start_work: false,
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        let event = AuditEvent::new(AuditEventType::ServiceStarted {
            user_id: UserId::new("local"),
        });
        store.append_audit(event).unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::TimerReset {
                phase: Phase::Work,
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::TimerReset { .. }));
        assert!(matches!(
            events[1].event,
            AuditEventType::ServiceStarted { .. }
        ));
    }

    #[test]
    fn test_records_append_once() {
        let store = SqliteStore::in_memory().unwrap();
        let start = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let rec = record("r-1", start, 0);

        store.append_record(&rec).unwrap();
        assert!(matches!(
            store.append_record(&rec),
            Err(StoreError::Duplicate(_))
        ));

        let day = start.date_naive();
        let records = store.list_records(day, day).unwrap();
        assert_eq!(records, vec![rec]);
    }

    #[test]
    fn test_records_filtered_by_day() {
        let store = SqliteStore::in_memory().unwrap();
        let monday = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let tuesday = monday + Duration::days(1);
        let wednesday = monday + Duration::days(2);

        store.append_record(&record("a", monday, 0)).unwrap();
        store.append_record(&record("b", tuesday, 1)).unwrap();
        store.append_record(&record("c", wednesday, 2)).unwrap();

        let records = store
            .list_records(tuesday.date_naive(), wednesday.date_naive())
            .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_record_keeps_task_and_skills() {
        let store = SqliteStore::in_memory().unwrap();
        let start = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut rec = record("r-1", start, 2);
        rec.task_id = Some(TaskId::new("t-1"));
        rec.skill_ids = vec![SkillId::new("rust"), SkillId::new("writing")];

        store.append_record(&rec).unwrap();
        let loaded = store
            .list_records(start.date_naive(), start.date_naive())
            .unwrap();
        assert_eq!(loaded[0].task_id, rec.task_id);
        assert_eq!(loaded[0].skill_ids, rec.skill_ids);
        assert_eq!(loaded[0].cycle_index, 2);
    }

    #[test]
    fn test_presets_builtins_first() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_preset(&custom_preset("deep")).unwrap();

        let presets = store.list_presets().unwrap();
        let ids: Vec<_> = presets.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["classic", "short", "deep"]);

        let deep = store.get_preset(&PresetId::new("deep")).unwrap().unwrap();
        assert!(deep.auto_start_breaks);
        assert_eq!(deep.sessions_until_long_break, 3);
    }

    #[test]
    fn test_reserved_presets_immutable() {
        let store = SqliteStore::in_memory().unwrap();

        let mut classic = Preset::classic();
        classic.work_length = 60;
        assert!(matches!(
            store.save_preset(&classic),
            Err(StoreError::ReservedPreset(_))
        ));
        assert!(matches!(
            store.delete_preset(&PresetId::new("short")),
            Err(StoreError::ReservedPreset(_))
        ));

        let loaded = store.get_preset(&PresetId::new("classic")).unwrap().unwrap();
        assert_eq!(loaded.work_length, 1500);
    }

    #[test]
    fn test_preset_update_and_soft_delete() {
        let store = SqliteStore::in_memory().unwrap();
        let mut deep = custom_preset("deep");
        store.save_preset(&deep).unwrap();

        deep.work_length = 2400;
        store.save_preset(&deep).unwrap();
        let loaded = store.get_preset(&deep.id).unwrap().unwrap();
        assert_eq!(loaded.work_length, 2400);

        store.delete_preset(&deep.id).unwrap();
        assert!(store.get_preset(&deep.id).unwrap().is_none());
        assert_eq!(store.list_presets().unwrap().len(), 2);

        assert!(matches!(
            store.delete_preset(&deep.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_preset_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let mut broken = custom_preset("broken");
        broken.long_break_length = 0;
        assert!(matches!(
            store.save_preset(&broken),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_tasks_with_skills() {
        let store = SqliteStore::in_memory().unwrap();
        let rust = store.create_skill("Rust", "#dea584").unwrap();
        let writing = store.create_skill("Writing", "#4078c0").unwrap();

        let task = store
            .create_task(NewTask {
                title: "Write parser".into(),
                description: Some("tokenizer first".into()),
                skill_ids: vec![rust.id.clone()],
            })
            .unwrap();
        assert_eq!(task.skill_ids, vec![rust.id.clone()]);
        assert!(!task.completed);

        let updated = store
            .update_task(
                &task.id,
                TaskUpdate {
                    skill_ids: Some(vec![rust.id.clone(), writing.id.clone()]),
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Write parser");
        assert_eq!(updated.skill_ids.len(), 2);

        store.delete_skill(&writing.id).unwrap();
        let task = store.get_task(&task.id).unwrap().unwrap();
        assert_eq!(task.skill_ids, vec![rust.id]);
        assert_eq!(store.list_skills().unwrap().len(), 1);
    }

    #[test]
    fn test_task_unknown_skill_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.create_task(NewTask {
            title: "Orphan".into(),
            description: None,
            skill_ids: vec![SkillId::new("missing")],
        });
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.list_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_task_soft_delete() {
        let store = SqliteStore::in_memory().unwrap();
        let task = store
            .create_task(NewTask {
                title: "Read book".into(),
                ..Default::default()
            })
            .unwrap();

        store.delete_task(&task.id).unwrap();
        assert!(store.get_task(&task.id).unwrap().is_none());
        assert!(store.list_tasks().unwrap().is_empty());
        assert!(matches!(
            store.delete_task(&task.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_snapshot() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(store.load_snapshot().unwrap().is_none());

        let snapshot = StateSnapshot {
            timestamp: focus_util::now(),
            preset_id: PresetId::new("short"),
            phase: Phase::ShortBreak,
            cycle_count: 2,
            selected_task_id: Some(TaskId::new("t-1")),
        };
        store.save_snapshot(&snapshot).unwrap();

        let loaded = store.load_snapshot().unwrap().unwrap();
        assert_eq!(loaded.phase, Phase::ShortBreak);
        assert_eq!(loaded.cycle_count, 2);
        assert_eq!(loaded.selected_task_id, Some(TaskId::new("t-1")));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users").join("u-1.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_preset(&custom_preset("deep")).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.get_preset(&PresetId::new("deep")).unwrap().is_some());
    }
}
