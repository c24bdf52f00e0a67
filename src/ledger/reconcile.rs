use hourglass_rs::SafeTimeProvider;

use crate::errors::{LedgerError, Result};
use crate::events::{AuditSink, Event, EventStore};
use crate::money::Money;
use crate::student::{FeeRecord, Student};
use crate::types::{semesters_of, FeeType};

use super::{MODE_AUTO_TRANSFER, MODE_AUTO_TRANSFER_OUT};

/// semester due assumed for a missing record when the student carries no
/// persisted annual college rate
pub const FALLBACK_SEMESTER_FEE: Money = Money::new(35000);

/// what a reconciliation run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub paid_recalculated: u32,
    pub duplicates_merged: u32,
    pub records_created: u32,
    pub transfers: u32,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.paid_recalculated > 0
            || self.duplicates_merged > 0
            || self.records_created > 0
            || self.transfers > 0
    }
}

/// repair one student's ledger; safe to re-run
///
/// recomputes `amount_paid` from transaction history, merges duplicate
/// (year, semester, type) records, redistributes college over-payments into
/// outstanding balances, then resyncs the cached counters from the
/// current-year due totals
pub fn reconcile(
    student: &mut Student,
    time: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<ReconcileReport> {
    if let Some(bad) = student.fee_records.iter().find(|r| r.amount_due.is_negative()) {
        return Err(LedgerError::InconsistentLedger {
            usn: student.usn.clone(),
            message: format!(
                "negative amount due {} in year {} semester {}",
                bad.amount_due, bad.year, bad.semester
            ),
        });
    }

    let usn = student.usn.clone();
    let mut report = ReconcileReport::default();

    // restore amount_paid from the transaction log; records that never saw a
    // transaction keep their seeded value
    for record in &mut student.fee_records {
        if record.transactions.is_empty() {
            continue;
        }
        let real_paid = record.transaction_total();
        if real_paid != record.amount_paid {
            events.emit(Event::PaidRecalculated {
                usn: usn.clone(),
                record_id: record.id,
                old_amount: record.amount_paid,
                new_amount: real_paid,
            });
            record.amount_paid = real_paid;
            record.rederive_status();
            report.paid_recalculated += 1;
        }
    }

    merge_duplicates(student, &usn, events, &mut report);
    redistribute_excess(student, &usn, time, events, &mut report);

    if report.changed() {
        for fee_type in FeeType::BILLABLE {
            let total = student.current_year_due_total(fee_type);
            if let Some(counter) = student.due_counter_mut(fee_type) {
                *counter = total;
            }
        }
    }

    Ok(report)
}

/// pass A: collapse records sharing (year, semester, type) into the one with
/// the largest due amount, earliest position winning ties
fn merge_duplicates(
    student: &mut Student,
    usn: &str,
    events: &mut EventStore,
    report: &mut ReconcileReport,
) {
    let original = std::mem::take(&mut student.fee_records);

    let mut groups: Vec<((u8, u8, FeeType), Vec<FeeRecord>)> = Vec::new();
    for record in original {
        let key = (record.year, record.semester, record.fee_type);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(record),
            None => groups.push((key, vec![record])),
        }
    }

    for ((year, semester, fee_type), mut members) in groups {
        if members.len() == 1 {
            student.fee_records.push(members.pop().expect("singleton group"));
            continue;
        }

        let primary_index = members
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.amount_due.cmp(&b.amount_due).then(ib.cmp(ia)))
            .map(|(i, _)| i)
            .expect("non-empty group");

        let mut primary = members.remove(primary_index);
        let mut absorbed = 0;
        for duplicate in members {
            primary.amount_paid += duplicate.amount_paid;
            primary.amount_due = primary.amount_due.max(duplicate.amount_due);
            primary.transactions.extend(duplicate.transactions);
            absorbed += 1;
        }
        primary.rederive_status();

        events.emit(Event::DuplicatesMerged {
            usn: usn.to_string(),
            year,
            semester,
            fee_type,
            absorbed,
        });
        report.duplicates_merged += absorbed;
        student.fee_records.push(primary);
    }
}

/// pass B: move college over-payments into unpaid (or missing) college
/// records, walking years ascending up to the student's current year
fn redistribute_excess(
    student: &mut Student,
    usn: &str,
    time: &SafeTimeProvider,
    events: &mut EventStore,
    report: &mut ReconcileReport,
) {
    let current_year = student.current_year;
    let annual = student.annual_college_fee;
    let default_due = if annual.is_positive() {
        annual.split_half().0
    } else {
        FALLBACK_SEMESTER_FEE
    };

    let mut source = 0;
    while source < student.fee_records.len() {
        let (source_year, source_sem, overpaid) = {
            let r = &student.fee_records[source];
            (
                r.year,
                r.semester,
                r.fee_type == FeeType::College && r.amount_paid > r.amount_due,
            )
        };
        if !overpaid {
            source += 1;
            continue;
        }

        for year in 1..=current_year {
            let (sem_a, sem_b) = semesters_of(year);
            for semester in [sem_a, sem_b] {
                if year == source_year && semester == source_sem {
                    continue;
                }

                let target = match student.fee_records.iter().position(|r| {
                    r.year == year && r.semester == semester && r.fee_type == FeeType::College
                }) {
                    Some(index) => index,
                    None => {
                        student.fee_records.push(FeeRecord::new(
                            year,
                            semester,
                            FeeType::College,
                            default_due,
                        ));
                        report.records_created += 1;
                        student.fee_records.len() - 1
                    }
                };

                let pending = student.fee_records[target].outstanding();
                let excess = {
                    let r = &student.fee_records[source];
                    r.amount_paid - r.amount_due
                };
                if pending.is_positive() && excess.is_positive() {
                    let transfer = pending.min(excess);
                    let now = time.now();
                    student.fee_records[target].post(
                        transfer,
                        MODE_AUTO_TRANSFER,
                        &format!("Transfer from Y{source_year}S{source_sem}"),
                        now,
                    );
                    student.fee_records[source].post(
                        -transfer,
                        MODE_AUTO_TRANSFER_OUT,
                        &format!("Transfer to Y{year}S{semester}"),
                        now,
                    );
                    events.emit(Event::ExcessTransferred {
                        usn: usn.to_string(),
                        from_semester: source_sem,
                        to_semester: semester,
                        amount: transfer,
                        timestamp: now,
                    });
                    report.transfers += 1;
                }
            }
        }

        student.fee_records[source].rederive_status();
        source += 1;
    }
}

/// outcome counters for a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: u32,
    pub repaired: u32,
    pub failed: u32,
}

/// reconcile a loaded batch; a failing student is logged and skipped, never
/// aborting the rest
pub fn reconcile_batch(
    students: &mut [Student],
    time: &SafeTimeProvider,
    sink: &dyn AuditSink,
) -> BatchReport {
    let mut report = BatchReport::default();

    for student in students.iter_mut() {
        let mut events = EventStore::new();
        match reconcile(student, time, &mut events) {
            Ok(outcome) => {
                report.processed += 1;
                if outcome.changed() {
                    report.repaired += 1;
                }
            }
            Err(error) => {
                tracing::warn!(usn = %student.usn, %error, "reconciliation skipped");
                report.failed += 1;
            }
        }
        for event in events.take_events() {
            sink.record(&event);
        }
    }

    report
}
