//! Focus statistics over stored session records

use chrono::NaiveDate;
use focus_api::{
    DailyFocus, FocusStats, Phase, SessionRecord, SkillFocus, TaskFocus, MAX_RANGE_DAYS,
};
use focus_util::{FocusError, Result, SkillId, TaskId};
use std::collections::BTreeMap;

#[derive(Default)]
struct Tally {
    minutes: u64,
    sessions: u32,
}

impl Tally {
    fn add(&mut self, minutes: u32) {
        self.minutes += u64::from(minutes);
        self.sessions += 1;
    }
}

/// Put a requested range in order and reject spans over [`MAX_RANGE_DAYS`]
pub fn checked_range(from: NaiveDate, to: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let (from, to) = if from <= to { (from, to) } else { (to, from) };
    let days = (to - from).num_days() + 1;
    if days > i64::from(MAX_RANGE_DAYS) {
        return Err(FocusError::validation(format!(
            "date range spans {} days, at most {} allowed",
            days, MAX_RANGE_DAYS
        )));
    }
    Ok((from, to))
}

/// Summarize work records whose start day falls within `from..=to`.
///
/// Every day of the range appears in `daily`, including days with no focus.
/// Skills and tasks are ordered by minutes, most first. Callers serving
/// untrusted ranges bound them with [`checked_range`] first.
pub fn summarize(records: &[SessionRecord], from: NaiveDate, to: NaiveDate) -> FocusStats {
    let (from, to) = if from <= to { (from, to) } else { (to, from) };

    let mut daily: BTreeMap<NaiveDate, Tally> = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|day| (day, Tally::default()))
        .collect();
    let mut by_skill: BTreeMap<SkillId, Tally> = BTreeMap::new();
    let mut by_task: BTreeMap<TaskId, Tally> = BTreeMap::new();
    let mut total = Tally::default();

    for record in records.iter().filter(|r| r.phase == Phase::Work) {
        let day = record.start_time.date_naive();
        let Some(slot) = daily.get_mut(&day) else {
            continue;
        };

        slot.add(record.duration_minutes);
        total.add(record.duration_minutes);
        for skill_id in &record.skill_ids {
            by_skill
                .entry(skill_id.clone())
                .or_default()
                .add(record.duration_minutes);
        }
        if let Some(task_id) = &record.task_id {
            by_task
                .entry(task_id.clone())
                .or_default()
                .add(record.duration_minutes);
        }
    }

    let days = daily.len().max(1) as f64;

    let mut by_skill: Vec<SkillFocus> = by_skill
        .into_iter()
        .map(|(skill_id, t)| SkillFocus {
            skill_id,
            minutes: t.minutes,
            sessions: t.sessions,
        })
        .collect();
    by_skill.sort_by(|a, b| b.minutes.cmp(&a.minutes));

    let mut by_task: Vec<TaskFocus> = by_task
        .into_iter()
        .map(|(task_id, t)| TaskFocus {
            task_id,
            minutes: t.minutes,
            sessions: t.sessions,
        })
        .collect();
    by_task.sort_by(|a, b| b.minutes.cmp(&a.minutes));

    FocusStats {
        from,
        to,
        total_minutes: total.minutes,
        total_sessions: total.sessions,
        average_daily_minutes: total.minutes as f64 / days,
        daily: daily
            .into_iter()
            .map(|(date, t)| DailyFocus {
                date,
                minutes: t.minutes,
                sessions: t.sessions,
            })
            .collect(),
        by_skill,
        by_task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use focus_util::RecordId;

    fn record(id: &str, day: u32, minutes: u32, task: Option<&str>, skills: &[&str]) -> SessionRecord {
        let start = Local.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap();
        SessionRecord {
            id: RecordId::new(id),
            phase: Phase::Work,
            start_time: start,
            end_time: start + chrono::Duration::minutes(i64::from(minutes)),
            duration_minutes: minutes,
            cycle_index: 0,
            task_id: task.map(TaskId::new),
            skill_ids: skills.iter().map(|s| SkillId::new(*s)).collect(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn test_totals_and_daily_buckets() {
        let records = vec![
            record("a", 10, 25, Some("t1"), &["rust"]),
            record("b", 10, 25, Some("t1"), &["rust", "writing"]),
            record("c", 12, 50, None, &[]),
        ];

        let stats = summarize(&records, date(10), date(12));
        assert_eq!(stats.total_minutes, 100);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.daily.len(), 3);
        assert_eq!(stats.daily[0].minutes, 50);
        assert_eq!(stats.daily[1].minutes, 0);
        assert_eq!(stats.daily[2].sessions, 1);
        assert!((stats.average_daily_minutes - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_skill_and_task_breakdown() {
        let records = vec![
            record("a", 10, 25, Some("t1"), &["rust"]),
            record("b", 10, 25, Some("t2"), &["rust", "writing"]),
            record("c", 11, 15, Some("t2"), &["writing"]),
        ];

        let stats = summarize(&records, date(10), date(11));
        assert_eq!(stats.by_skill[0].skill_id, SkillId::new("rust"));
        assert_eq!(stats.by_skill[0].minutes, 50);
        assert_eq!(stats.by_skill[1].minutes, 40);

        assert_eq!(stats.by_task[0].task_id, TaskId::new("t2"));
        assert_eq!(stats.by_task[0].sessions, 2);
    }

    #[test]
    fn test_checked_range() {
        assert_eq!(checked_range(date(12), date(10)).unwrap(), (date(10), date(12)));

        let from = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let last_allowed = from + chrono::Duration::days(i64::from(MAX_RANGE_DAYS) - 1);
        assert!(checked_range(from, last_allowed).is_ok());
        assert!(checked_range(from, last_allowed + chrono::Duration::days(1)).is_err());

        let err = checked_range(NaiveDate::MIN, NaiveDate::MAX).unwrap_err();
        assert!(matches!(err, FocusError::ValidationError(_)));
    }

    #[test]
    fn test_out_of_range_and_breaks_ignored() {
        let mut brk = record("b", 10, 5, None, &[]);
        brk.phase = Phase::ShortBreak;
        let records = vec![record("a", 9, 25, None, &[]), brk];

        let stats = summarize(&records, date(10), date(10));
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.average_daily_minutes, 0.0);
    }
}
