use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::{read, write};
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{
    AttendanceEntry, AttendanceKey, AttendanceStatus, DateRange, ImportRow, Principal,
};

/// Per-employee, per-day attendance records keyed by `(employee_id, date)`.
#[derive(Default)]
pub struct AttendanceLedger {
    entries: RwLock<BTreeMap<AttendanceKey, AttendanceEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(example = 20)]
    pub total_entries: usize,
    #[schema(example = 9600)]
    pub total_work_minutes: u64,
    #[schema(value_type = Object, example = json!({ "PRESENT": 18, "LATE": 2 }))]
    pub count_by_status: BTreeMap<AttendanceStatus, usize>,
}

impl AttendanceSummary {
    fn empty() -> Self {
        Self {
            total_entries: 0,
            total_work_minutes: 0,
            count_by_status: BTreeMap::new(),
        }
    }

    fn add(&mut self, entry: &AttendanceEntry) {
        self.total_entries += 1;
        self.total_work_minutes += u64::from(entry.work_minutes);
        *self.count_by_status.entry(entry.status).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RejectedRow {
    /// 1-based position of the row in the batch
    pub line: usize,
    pub row: ImportRow,
    #[schema(value_type = Object)]
    pub reason: WorkflowError,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ImportReport {
    pub accepted: usize,
    pub entries: Vec<AttendanceEntry>,
    pub rejected: Vec<RejectedRow>,
}

/// A ledger write together with the entry it replaced, so a caller that
/// cannot store the write can take it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Applied {
    pub entry: AttendanceEntry,
    pub previous: Option<AttendanceEntry>,
}

impl AttendanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> WorkflowResult<AttendanceEntry> {
        self.apply_check_in(employee_id, date, time).map(|a| a.entry)
    }

    pub(crate) fn apply_check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> WorkflowResult<Applied> {
        let key = AttendanceKey::new(employee_id, date);
        let mut entries = write(&self.entries);
        let previous = entries.get(&key).cloned();

        let entry = match entries.get_mut(&key) {
            Some(existing) if existing.check_in.is_some() => {
                return Err(WorkflowError::duplicate(format!(
                    "employee {employee_id} already checked in on {date}"
                )));
            }
            // entry opened by an administrator; keep the status they set
            Some(existing) => {
                existing.check_in = Some(time);
                existing.clone()
            }
            None => {
                let entry = AttendanceEntry {
                    employee_id,
                    date,
                    check_in: Some(time),
                    check_out: None,
                    status: AttendanceStatus::Present,
                    work_minutes: 0,
                    status_set_by: None,
                };
                entries.insert(key, entry.clone());
                entry
            }
        };

        info!(employee_id, %date, %time, "Checked in");
        Ok(Applied { entry, previous })
    }

    pub fn check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> WorkflowResult<AttendanceEntry> {
        self.apply_check_out(employee_id, date, time).map(|a| a.entry)
    }

    pub(crate) fn apply_check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> WorkflowResult<Applied> {
        let key = AttendanceKey::new(employee_id, date);
        let mut entries = write(&self.entries);

        let Some(entry) = entries.get_mut(&key) else {
            return Err(no_active_check_in(employee_id, date));
        };
        let Some(check_in) = entry.check_in else {
            return Err(no_active_check_in(employee_id, date));
        };

        if entry.check_out.is_some() {
            return Err(WorkflowError::invalid_transition(format!(
                "employee {employee_id} already checked out on {date}"
            )));
        }
        if time < check_in {
            return Err(WorkflowError::InvalidTime {
                check_in,
                check_out: time,
            });
        }

        let previous = Some(entry.clone());
        entry.check_out = Some(time);
        entry.work_minutes = work_minutes(check_in, time);

        info!(employee_id, %date, work_minutes = entry.work_minutes, "Checked out");
        Ok(Applied {
            entry: entry.clone(),
            previous,
        })
    }

    /// Administrative override; allowed whether or not the employee checked in.
    pub fn set_status(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        actor: &Principal,
    ) -> WorkflowResult<AttendanceEntry> {
        self.apply_status(employee_id, date, status, actor)
            .map(|a| a.entry)
    }

    pub(crate) fn apply_status(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        actor: &Principal,
    ) -> WorkflowResult<Applied> {
        let key = AttendanceKey::new(employee_id, date);
        let mut entries = write(&self.entries);
        let replaced = entries.get(&key).cloned();

        let entry = entries.entry(key).or_insert_with(|| AttendanceEntry {
            employee_id,
            date,
            check_in: None,
            check_out: None,
            status,
            work_minutes: 0,
            status_set_by: None,
        });
        let previous = entry.status;
        entry.status = status;
        entry.status_set_by = Some(actor.user_id);

        info!(
            employee_id,
            %date,
            %previous,
            %status,
            user_id = actor.user_id,
            "Attendance status overridden"
        );
        Ok(Applied {
            entry: entry.clone(),
            previous: replaced,
        })
    }

    /// Imports every valid row; invalid or colliding rows are reported, never fatal.
    pub fn bulk_import<I>(&self, rows: I) -> ImportReport
    where
        I: IntoIterator<Item = ImportRow>,
    {
        let mut entries = Vec::new();
        let mut rejected = Vec::new();

        for (i, row) in rows.into_iter().enumerate() {
            let line = i + 1;
            match self.import_row(&row) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    warn!(line, employee_id = row.employee_id, date = %row.date, error = %reason, "Import row rejected");
                    rejected.push(RejectedRow { line, row, reason });
                }
            }
        }

        info!(
            accepted = entries.len(),
            rejected = rejected.len(),
            "Attendance import finished"
        );
        ImportReport {
            accepted: entries.len(),
            entries,
            rejected,
        }
    }

    /// Validates and stores a single imported row.
    pub fn import_row(&self, row: &ImportRow) -> WorkflowResult<AttendanceEntry> {
        let entry = entry_from_row(row)?;
        let key = entry.key();

        let mut entries = write(&self.entries);
        if entries.contains_key(&key) {
            return Err(WorkflowError::duplicate(format!(
                "attendance for employee {} on {} already exists",
                row.employee_id, row.date
            )));
        }
        entries.insert(key, entry.clone());

        debug!(employee_id = row.employee_id, date = %row.date, "Import row stored");
        Ok(entry)
    }

    /// Puts back the entry `applied` replaced. Does nothing, and returns
    /// false, once the entry has moved past `applied`.
    pub(crate) fn rollback(&self, applied: Applied) -> bool {
        let key = applied.entry.key();
        let mut entries = write(&self.entries);
        if entries.get(&key) != Some(&applied.entry) {
            warn!(
                employee_id = applied.entry.employee_id,
                date = %applied.entry.date,
                "Attendance changed since the write; not rolled back"
            );
            return false;
        }

        match applied.previous {
            Some(previous) => {
                entries.insert(key, previous);
            }
            None => {
                entries.remove(&key);
            }
        }
        debug!(employee_id = applied.entry.employee_id, date = %applied.entry.date, "Attendance write rolled back");
        true
    }

    pub fn get(&self, employee_id: u64, date: NaiveDate) -> WorkflowResult<AttendanceEntry> {
        read(&self.entries)
            .get(&AttendanceKey::new(employee_id, date))
            .cloned()
            .ok_or_else(|| {
                WorkflowError::not_found(format!("attendance for employee {employee_id} on {date}"))
            })
    }

    /// Date-ordered history of one employee within `range`.
    pub fn entries_for(&self, employee_id: u64, range: DateRange) -> Vec<AttendanceEntry> {
        let from = AttendanceKey::new(employee_id, range.start());
        let to = AttendanceKey::new(employee_id, range.end());
        read(&self.entries)
            .range(from..=to)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    pub fn summarize(&self, employee_id: u64, range: DateRange) -> AttendanceSummary {
        self.summarize_team(&[employee_id], range)
    }

    /// One aggregate over several employees; duplicate ids are counted once.
    pub fn summarize_team(&self, employee_ids: &[u64], range: DateRange) -> AttendanceSummary {
        let entries = read(&self.entries);
        let mut summary = AttendanceSummary::empty();

        for employee_id in employee_ids.iter().copied().collect::<BTreeSet<_>>() {
            let from = AttendanceKey::new(employee_id, range.start());
            let to = AttendanceKey::new(employee_id, range.end());
            for (_, entry) in entries.range(from..=to) {
                summary.add(entry);
            }
        }
        summary
    }

    /// Loads a persisted entry; `work_minutes` is re-derived from its times.
    pub fn restore(&self, mut entry: AttendanceEntry) -> WorkflowResult<()> {
        entry.work_minutes = match (entry.check_in, entry.check_out) {
            (Some(check_in), Some(check_out)) if check_out < check_in => {
                return Err(WorkflowError::InvalidTime {
                    check_in,
                    check_out,
                });
            }
            (Some(check_in), Some(check_out)) => work_minutes(check_in, check_out),
            (None, Some(_)) => {
                return Err(WorkflowError::invalid_transition(format!(
                    "attendance for employee {} on {} has a check-out without check-in",
                    entry.employee_id, entry.date
                )));
            }
            _ => 0,
        };

        let mut entries = write(&self.entries);
        let key = entry.key();
        if entries.contains_key(&key) {
            return Err(WorkflowError::duplicate(format!(
                "attendance for employee {} on {}",
                entry.employee_id, entry.date
            )));
        }
        entries.insert(key, entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn no_active_check_in(employee_id: u64, date: NaiveDate) -> WorkflowError {
    WorkflowError::not_found(format!(
        "no active check-in for employee {employee_id} on {date}"
    ))
}

fn entry_from_row(row: &ImportRow) -> WorkflowResult<AttendanceEntry> {
    let work = match (row.check_in, row.check_out) {
        (None, Some(_)) => {
            return Err(WorkflowError::invalid_transition(
                "check-out given without a check-in",
            ));
        }
        (Some(check_in), Some(check_out)) if check_out < check_in => {
            return Err(WorkflowError::InvalidTime {
                check_in,
                check_out,
            });
        }
        (Some(check_in), Some(check_out)) => work_minutes(check_in, check_out),
        _ => 0,
    };

    let status = row.status.unwrap_or(if row.check_in.is_some() {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Absent
    });

    Ok(AttendanceEntry {
        employee_id: row.employee_id,
        date: row.date,
        check_in: row.check_in,
        check_out: row.check_out,
        status,
        work_minutes: work,
        status_set_by: None,
    })
}

/// Whole minutes between two times of the same day, floored. `check_out >= check_in`.
fn work_minutes(check_in: NaiveTime, check_out: NaiveTime) -> u32 {
    let minutes = (check_out - check_in).num_minutes();
    u32::try_from(minutes).unwrap_or(0)
}

/// Renders minutes as `"Xh Ym"`.
pub fn format_work_minutes(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use std::sync::Arc;
    use std::thread;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn admin() -> Principal {
        Principal {
            user_id: 99,
            username: "admin".into(),
            role: Role::Admin,
            employee_id: None,
            department_id: None,
        }
    }

    fn row(employee_id: u64, d: u32, check_in: Option<NaiveTime>, check_out: Option<NaiveTime>) -> ImportRow {
        ImportRow {
            employee_id,
            date: date(d),
            check_in,
            check_out,
            status: None,
        }
    }

    #[test]
    fn check_in_then_out_derives_floored_minutes() {
        let ledger = AttendanceLedger::new();
        let entry = ledger.check_in(1, date(5), time(9, 0, 30)).unwrap();
        assert_eq!(entry.status, AttendanceStatus::Present);
        assert_eq!(entry.work_minutes, 0);

        let entry = ledger.check_out(1, date(5), time(17, 30, 0)).unwrap();
        // 8h 29m 30s
        assert_eq!(entry.work_minutes, 509);
        assert_eq!(entry.status, AttendanceStatus::Present);
    }

    #[test]
    fn zero_length_shift_is_allowed() {
        let ledger = AttendanceLedger::new();
        ledger.check_in(1, date(5), time(9, 0, 0)).unwrap();
        let entry = ledger.check_out(1, date(5), time(9, 0, 0)).unwrap();
        assert_eq!(entry.work_minutes, 0);
    }

    #[test]
    fn second_check_in_is_a_duplicate() {
        let ledger = AttendanceLedger::new();
        ledger.check_in(1, date(5), time(9, 0, 0)).unwrap();
        let err = ledger.check_in(1, date(5), time(9, 5, 0)).unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateEntry(_)));
    }

    #[test]
    fn check_out_without_check_in_is_not_found() {
        let ledger = AttendanceLedger::new();
        assert!(matches!(
            ledger.check_out(1, date(5), time(17, 0, 0)),
            Err(WorkflowError::NotFound(_))
        ));

        ledger.set_status(1, date(5), AttendanceStatus::Absent, &admin()).unwrap();
        assert!(matches!(
            ledger.check_out(1, date(5), time(17, 0, 0)),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn early_check_out_fails_and_leaves_entry_untouched() {
        let ledger = AttendanceLedger::new();
        let before = ledger.check_in(1, date(5), time(9, 0, 0)).unwrap();

        let err = ledger.check_out(1, date(5), time(8, 59, 0)).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTime { .. }));
        assert_eq!(ledger.get(1, date(5)).unwrap(), before);
    }

    #[test]
    fn second_check_out_is_an_invalid_transition() {
        let ledger = AttendanceLedger::new();
        ledger.check_in(1, date(5), time(9, 0, 0)).unwrap();
        ledger.check_out(1, date(5), time(12, 0, 0)).unwrap();
        let err = ledger.check_out(1, date(5), time(18, 0, 0)).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
        assert_eq!(ledger.get(1, date(5)).unwrap().work_minutes, 180);
    }

    #[test]
    fn concurrent_check_outs_have_a_single_winner() {
        let ledger = Arc::new(AttendanceLedger::new());
        ledger.check_in(1, date(5), time(9, 0, 0)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.check_out(1, date(5), time(17, i, 0)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn override_keeps_minutes_and_survives_later_check_in() {
        let ledger = AttendanceLedger::new();
        ledger.check_in(1, date(5), time(9, 0, 0)).unwrap();
        ledger.check_out(1, date(5), time(10, 0, 0)).unwrap();

        let entry = ledger.set_status(1, date(5), AttendanceStatus::Late, &admin()).unwrap();
        assert_eq!(entry.status, AttendanceStatus::Late);
        assert_eq!(entry.work_minutes, 60);
        assert_eq!(entry.status_set_by, Some(99));

        ledger.set_status(2, date(6), AttendanceStatus::Late, &admin()).unwrap();
        let entry = ledger.check_in(2, date(6), time(10, 15, 0)).unwrap();
        assert_eq!(entry.status, AttendanceStatus::Late);
        assert_eq!(entry.check_in, Some(time(10, 15, 0)));
    }

    #[test]
    fn bulk_import_keeps_valid_rows_and_reports_the_rest() {
        let ledger = AttendanceLedger::new();
        let rows = vec![
            row(1, 1, Some(time(9, 0, 0)), Some(time(17, 0, 0))),
            row(2, 1, Some(time(9, 0, 0)), Some(time(17, 0, 0))),
            row(3, 1, Some(time(17, 0, 0)), Some(time(9, 0, 0))),
            row(4, 1, Some(time(9, 0, 0)), None),
            row(5, 1, None, None),
        ];

        let report = ledger.bulk_import(rows.clone());
        assert_eq!(report.accepted, 4);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line, 3);
        assert_eq!(report.rejected[0].row, rows[2]);
        assert!(matches!(report.rejected[0].reason, WorkflowError::InvalidTime { .. }));

        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.get(1, date(1)).unwrap().work_minutes, 480);
        assert_eq!(ledger.get(4, date(1)).unwrap().status, AttendanceStatus::Present);
        assert_eq!(ledger.get(5, date(1)).unwrap().status, AttendanceStatus::Absent);
        assert!(ledger.get(3, date(1)).is_err());
    }

    #[test]
    fn bulk_import_rejects_collisions_and_orphan_check_outs() {
        let ledger = AttendanceLedger::new();
        ledger.check_in(1, date(1), time(9, 0, 0)).unwrap();

        let report = ledger.bulk_import(vec![
            row(1, 1, Some(time(9, 0, 0)), None),
            row(2, 1, None, Some(time(17, 0, 0))),
            row(3, 1, Some(time(9, 0, 0)), None),
            row(3, 1, Some(time(9, 30, 0)), None),
        ]);

        assert_eq!(report.accepted, 1);
        let reasons: Vec<_> = report.rejected.iter().map(|r| (r.line, &r.reason)).collect();
        assert!(matches!(reasons[0], (1, WorkflowError::DuplicateEntry(_))));
        assert!(matches!(reasons[1], (2, WorkflowError::InvalidTransition(_))));
        assert!(matches!(reasons[2], (4, WorkflowError::DuplicateEntry(_))));
    }

    #[test]
    fn summaries_aggregate_within_range() {
        let ledger = AttendanceLedger::new();
        ledger.bulk_import(vec![
            row(1, 1, Some(time(9, 0, 0)), Some(time(17, 0, 0))),
            row(1, 2, Some(time(9, 0, 0)), Some(time(13, 0, 0))),
            row(1, 10, Some(time(9, 0, 0)), Some(time(17, 0, 0))),
            row(2, 2, None, None),
        ]);
        ledger.set_status(1, date(2), AttendanceStatus::Late, &admin()).unwrap();

        let range = DateRange::new(date(1), date(5)).unwrap();
        let summary = ledger.summarize(1, range);
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.total_work_minutes, 720);
        assert_eq!(summary.count_by_status.get(&AttendanceStatus::Present), Some(&1));
        assert_eq!(summary.count_by_status.get(&AttendanceStatus::Late), Some(&1));
        assert_eq!(summary, ledger.summarize(1, range));

        let team = ledger.summarize_team(&[1, 2, 2], range);
        assert_eq!(team.total_entries, 3);
        assert_eq!(team.count_by_status.get(&AttendanceStatus::Absent), Some(&1));

        let history: Vec<_> = ledger.entries_for(1, range).into_iter().map(|e| e.date).collect();
        assert_eq!(history, vec![date(1), date(2)]);
    }

    #[test]
    fn restore_rederives_minutes_and_rejects_bad_entries() {
        let ledger = AttendanceLedger::new();
        let mut entry = AttendanceEntry {
            employee_id: 1,
            date: date(3),
            check_in: Some(time(8, 0, 0)),
            check_out: Some(time(9, 30, 0)),
            status: AttendanceStatus::Present,
            work_minutes: 7,
            status_set_by: None,
        };
        ledger.restore(entry.clone()).unwrap();
        assert_eq!(ledger.get(1, date(3)).unwrap().work_minutes, 90);
        assert!(matches!(
            ledger.restore(entry.clone()),
            Err(WorkflowError::DuplicateEntry(_))
        ));

        entry.date = date(4);
        entry.check_out = Some(time(7, 0, 0));
        assert!(matches!(ledger.restore(entry), Err(WorkflowError::InvalidTime { .. })));
    }

    #[test]
    fn rollback_restores_the_replaced_entry() {
        let ledger = AttendanceLedger::new();
        let checked_in = ledger.apply_check_in(1, date(5), time(9, 0, 0)).unwrap();
        let before = checked_in.entry.clone();

        let checked_out = ledger.apply_check_out(1, date(5), time(17, 0, 0)).unwrap();
        assert!(ledger.rollback(checked_out));
        assert_eq!(ledger.get(1, date(5)).unwrap(), before);

        let overridden = ledger
            .apply_status(1, date(5), AttendanceStatus::Late, &admin())
            .unwrap();
        assert!(ledger.rollback(overridden));
        assert_eq!(ledger.get(1, date(5)).unwrap(), before);

        assert!(ledger.rollback(checked_in));
        assert!(ledger.is_empty());
        ledger.check_in(1, date(5), time(9, 5, 0)).unwrap();
    }

    #[test]
    fn rollback_skips_an_entry_that_moved_on() {
        let ledger = AttendanceLedger::new();
        let checked_in = ledger.apply_check_in(1, date(5), time(9, 0, 0)).unwrap();
        ledger.check_out(1, date(5), time(12, 0, 0)).unwrap();

        assert!(!ledger.rollback(checked_in));
        assert_eq!(ledger.get(1, date(5)).unwrap().work_minutes, 180);
    }

    #[test]
    fn formats_minutes_as_hours_and_minutes() {
        assert_eq!(format_work_minutes(0), "0h 0m");
        assert_eq!(format_work_minutes(509), "8h 29m");
    }
}
