use std::fmt;

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::events::{AuditSink, Event, EventStore};
use crate::ledger::generation::generate_year_records;
use crate::money::Money;
use crate::student::Student;
use crate::types::{AcademicStatus, FeeType};

/// final academic year before graduation
pub const FINAL_YEAR: u8 = 4;

/// external library collaborator; only the count of non-returned loans is
/// consumed here
pub trait LibraryPort {
    fn count_outstanding_loans(&self, usn: &str) -> Result<u32>;
}

/// why a student cannot advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IneligibilityReason {
    OutstandingDues { total: Money },
    UnsettledRecords { count: u32 },
    OutstandingLibraryLoans { count: u32 },
}

impl fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IneligibilityReason::OutstandingDues { total } => {
                write!(f, "outstanding dues of {total}")
            }
            IneligibilityReason::UnsettledRecords { count } => {
                write!(f, "{count} unsettled current-year records")
            }
            IneligibilityReason::OutstandingLibraryLoans { count } => {
                write!(f, "{count} library books not returned")
            }
        }
    }
}

/// result of the eligibility predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionEligibility {
    pub eligible: bool,
    pub reasons: Vec<IneligibilityReason>,
}

/// decide whether a student may advance, from the student snapshot and the
/// externally supplied library due count only
///
/// the ledger-level check re-verifies what the cached counters claim, since
/// the counters can drift between reconciliations
pub fn evaluate_promotion(student: &Student, library_due_count: u32) -> PromotionEligibility {
    let mut reasons = Vec::new();

    let total = student.total_due();
    if !total.is_zero() {
        reasons.push(IneligibilityReason::OutstandingDues { total });
    }

    let unsettled = student
        .fee_records
        .iter()
        .filter(|r| {
            r.year == student.current_year
                && (!r.is_settled() || r.amount_paid < r.amount_due)
        })
        .count() as u32;
    if unsettled > 0 {
        reasons.push(IneligibilityReason::UnsettledRecords { count: unsettled });
    }

    if library_due_count > 0 {
        reasons.push(IneligibilityReason::OutstandingLibraryLoans {
            count: library_due_count,
        });
    }

    PromotionEligibility {
        eligible: reasons.is_empty(),
        reasons,
    }
}

/// what a promotion attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionOutcome {
    Promoted { to_year: u8 },
    Graduated,
    Skipped { reasons: Vec<IneligibilityReason> },
}

/// advance one student a single year, or graduate them out of the final year
///
/// an ineligible student is an ordinary `Skipped` outcome, not an error; on
/// promotion the next year's records are generated from the persisted annual
/// rates and each opted-in counter is reset to its full annual amount
pub fn promote(
    student: &mut Student,
    library_due_count: u32,
    time: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<PromotionOutcome> {
    let eligibility = evaluate_promotion(student, library_due_count);
    if !eligibility.eligible {
        events.emit(Event::PromotionSkipped {
            usn: student.usn.clone(),
            year: student.current_year,
            reasons: eligibility.reasons.iter().map(|r| r.to_string()).collect(),
        });
        return Ok(PromotionOutcome::Skipped {
            reasons: eligibility.reasons,
        });
    }

    let now = time.now();

    if student.current_year >= FINAL_YEAR {
        student.status = AcademicStatus::Graduated;
        events.emit(Event::StudentGraduated {
            usn: student.usn.clone(),
            timestamp: now,
        });
        return Ok(PromotionOutcome::Graduated);
    }

    let from_year = student.current_year;
    let next_year = from_year + 1;
    student.current_year = next_year;

    for fee_type in FeeType::BILLABLE {
        if !student.is_opted(fee_type) {
            continue;
        }
        let annual = student.annual_fee(fee_type);
        generate_year_records(student, next_year, fee_type, annual, events)?;
        if let Some(counter) = student.due_counter_mut(fee_type) {
            *counter = annual;
        }
    }

    events.emit(Event::StudentPromoted {
        usn: student.usn.clone(),
        from_year,
        to_year: next_year,
        timestamp: now,
    });

    Ok(PromotionOutcome::Promoted { to_year: next_year })
}

/// outcome counters for a year-wide promotion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionSummary {
    pub promoted: u32,
    pub graduated: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// best-effort batch promotion of every active student currently in a year
///
/// a library lookup failure or per-student error is logged and counted,
/// never aborting the rest of the batch
pub fn promote_year(
    students: &mut [Student],
    year: u8,
    library: &dyn LibraryPort,
    time: &SafeTimeProvider,
    sink: &dyn AuditSink,
) -> PromotionSummary {
    let mut summary = PromotionSummary::default();

    for student in students
        .iter_mut()
        .filter(|s| s.is_active() && s.current_year == year)
    {
        let library_due_count = match library.count_outstanding_loans(&student.usn) {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(usn = %student.usn, %error, "library lookup failed, student skipped");
                summary.failed += 1;
                continue;
            }
        };

        let mut events = EventStore::new();
        match promote(student, library_due_count, time, &mut events) {
            Ok(PromotionOutcome::Promoted { .. }) => summary.promoted += 1,
            Ok(PromotionOutcome::Graduated) => summary.graduated += 1,
            Ok(PromotionOutcome::Skipped { .. }) => summary.skipped += 1,
            Err(error) => {
                tracing::warn!(usn = %student.usn, %error, "promotion failed, student skipped");
                summary.failed += 1;
            }
        }
        for event in events.take_events() {
            sink.record(&event);
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::events::NullSink;
    use crate::student::FeeRecord;
    use crate::types::{EntryMode, Quota, RecordStatus};
    use hourglass_rs::TimeSource;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(chrono::Utc::now()))
    }

    struct StubLibrary {
        due: u32,
    }

    impl LibraryPort for StubLibrary {
        fn count_outstanding_loans(&self, _usn: &str) -> Result<u32> {
            Ok(self.due)
        }
    }

    struct FailingLibrary;

    impl LibraryPort for FailingLibrary {
        fn count_outstanding_loans(&self, _usn: &str) -> Result<u32> {
            Err(LedgerError::ExternalDependencyFailure {
                message: "library service unreachable".to_string(),
            })
        }
    }

    fn cleared_student(year: u8) -> Student {
        let mut s = Student::new("1AB20CS001", "CSE", year, Quota::Government, EntryMode::Regular);
        s.annual_college_fee = Money::new(44000);
        for semester in [year * 2 - 1, year * 2] {
            let mut record = FeeRecord::new(year, semester, FeeType::College, Money::new(22000));
            record.post(Money::new(22000), "CASH", "seed", chrono::Utc::now());
            s.fee_records.push(record);
        }
        s
    }

    #[test]
    fn test_eligible_when_everything_clear() {
        let s = cleared_student(2);
        let eligibility = evaluate_promotion(&s, 0);
        assert!(eligibility.eligible);
        assert!(eligibility.reasons.is_empty());
    }

    #[test]
    fn test_counter_drift_blocks_promotion() {
        let mut s = cleared_student(2);
        s.transport_fee_due = Money::new(500);

        let eligibility = evaluate_promotion(&s, 0);
        assert!(!eligibility.eligible);
        assert_eq!(
            eligibility.reasons,
            vec![IneligibilityReason::OutstandingDues {
                total: Money::new(500)
            }]
        );
    }

    #[test]
    fn test_unsettled_record_blocks_even_with_clean_counters() {
        let mut s = cleared_student(2);
        s.fee_records
            .push(FeeRecord::new(2, 4, FeeType::Hostel, Money::new(100)));

        let eligibility = evaluate_promotion(&s, 0);
        assert!(!eligibility.eligible);
        assert_eq!(
            eligibility.reasons,
            vec![IneligibilityReason::UnsettledRecords { count: 1 }]
        );
    }

    #[test]
    fn test_library_loans_block_promotion() {
        let s = cleared_student(2);
        let eligibility = evaluate_promotion(&s, 3);
        assert!(!eligibility.eligible);
        assert_eq!(
            eligibility.reasons,
            vec![IneligibilityReason::OutstandingLibraryLoans { count: 3 }]
        );
    }

    #[test]
    fn test_unpaid_ledgers_never_promote() {
        // any current-year record short of its due blocks, whatever the
        // amounts involved
        for (due, paid) in [(22000, 0), (22000, 1), (22000, 21999), (1, 0)] {
            let mut s = cleared_student(3);
            let mut record = FeeRecord::new(3, 5, FeeType::College, Money::new(due));
            if paid > 0 {
                record.post(Money::new(paid), "CASH", "part", chrono::Utc::now());
            }
            s.fee_records.push(record);

            assert!(!evaluate_promotion(&s, 0).eligible);
        }
    }

    #[test]
    fn test_prior_year_records_do_not_block() {
        let mut s = cleared_student(2);
        s.fee_records
            .push(FeeRecord::new(1, 1, FeeType::College, Money::new(9999)));

        assert!(evaluate_promotion(&s, 0).eligible);
    }

    #[test]
    fn test_override_is_not_consulted() {
        let mut s = cleared_student(2);
        s.college_fee_due = Money::new(1000);
        s.eligibility_override = Some(true);

        assert!(!evaluate_promotion(&s, 0).eligible);
    }

    #[test]
    fn test_promote_generates_next_year() {
        let mut s = cleared_student(2);
        s.transport_opted = true;
        s.annual_transport_fee = Money::new(12000);
        let time = test_time();
        let mut events = EventStore::new();

        let outcome = promote(&mut s, 0, &time, &mut events).unwrap();

        assert_eq!(outcome, PromotionOutcome::Promoted { to_year: 3 });
        assert_eq!(s.current_year, 3);
        assert_eq!(s.college_fee_due, Money::new(44000));
        assert_eq!(s.transport_fee_due, Money::new(12000));

        let sem5 = s.record_for(3, 5, FeeType::College).unwrap();
        assert_eq!(sem5.amount_due, Money::new(22000));
        assert_eq!(sem5.status, RecordStatus::Pending);
        assert!(s.record_for(3, 6, FeeType::Transport).is_some());
        // hostel was never opted, nothing generated
        assert!(s.record_for(3, 5, FeeType::Hostel).is_none());
    }

    #[test]
    fn test_final_year_graduates_without_generation() {
        let mut s = cleared_student(4);
        let time = test_time();
        let mut events = EventStore::new();

        let outcome = promote(&mut s, 0, &time, &mut events).unwrap();

        assert_eq!(outcome, PromotionOutcome::Graduated);
        assert_eq!(s.status, AcademicStatus::Graduated);
        assert_eq!(s.current_year, 4);
        assert!(s.record_for(5, 9, FeeType::College).is_none());
    }

    #[test]
    fn test_skipped_is_not_an_error() {
        let mut s = cleared_student(2);
        s.college_fee_due = Money::new(100);
        let time = test_time();
        let mut events = EventStore::new();

        let outcome = promote(&mut s, 0, &time, &mut events).unwrap();

        assert!(matches!(outcome, PromotionOutcome::Skipped { .. }));
        assert_eq!(s.current_year, 2);
    }

    #[test]
    fn test_batch_promotes_only_matching_year() {
        let time = test_time();
        let mut students = vec![cleared_student(2), cleared_student(3), {
            let mut s = cleared_student(2);
            s.college_fee_due = Money::new(5000);
            s
        }];

        let summary = promote_year(&mut students, 2, &StubLibrary { due: 0 }, &time, &NullSink);

        assert_eq!(summary.promoted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(students[0].current_year, 3);
        // year-3 student untouched by a year-2 run
        assert_eq!(students[1].current_year, 3);
        assert_eq!(students[2].current_year, 2);
    }

    #[test]
    fn test_batch_survives_library_failure() {
        let time = test_time();
        let mut students = vec![cleared_student(2), cleared_student(2)];

        let summary = promote_year(&mut students, 2, &FailingLibrary, &time, &NullSink);

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.promoted, 0);
        assert_eq!(students[0].current_year, 2);
    }

    #[test]
    fn test_graduation_batch() {
        let time = test_time();
        let mut students = vec![cleared_student(4), {
            let mut s = cleared_student(4);
            s.hostel_fee_due = Money::new(2500);
            s
        }];

        let summary = promote_year(&mut students, 4, &StubLibrary { due: 0 }, &time, &NullSink);

        assert_eq!(summary.graduated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(students[0].status, AcademicStatus::Graduated);
        assert_eq!(students[1].status, AcademicStatus::Active);
    }
}
