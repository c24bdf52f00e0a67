use hourglass_rs::SafeTimeProvider;

use crate::config::ConfigStore;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::money::Money;
use crate::student::{FeeRecord, Student};
use crate::types::{semesters_of, EntryMode, FeeType, Quota};

/// materialize (or reprice) the two semester records of a year for one
/// category
///
/// a zero annual amount means the category is inactive for that year and
/// yields no records; existing records are repriced in place, keeping
/// whatever was already paid
pub fn generate_year_records(
    student: &mut Student,
    year: u8,
    fee_type: FeeType,
    annual_amount: Money,
    events: &mut EventStore,
) -> Result<Vec<FeeRecord>> {
    if annual_amount.is_negative() {
        return Err(LedgerError::InvalidAmount {
            amount: annual_amount,
        });
    }
    if annual_amount.is_zero() {
        return Ok(Vec::new());
    }

    let (sem_a, sem_b) = semesters_of(year);
    let (due_a, due_b) = annual_amount.split_half();

    let mut generated = Vec::with_capacity(2);
    for (semester, due) in [(sem_a, due_a), (sem_b, due_b)] {
        let existing = student
            .fee_records
            .iter_mut()
            .find(|r| r.year == year && r.semester == semester && r.fee_type == fee_type);

        match existing {
            Some(record) => {
                record.reprice(due);
                generated.push(record.clone());
            }
            None => {
                let record = FeeRecord::new(year, semester, fee_type, due);
                generated.push(record.clone());
                student.fee_records.push(record);
            }
        }
    }

    events.emit(Event::RecordsGenerated {
        usn: student.usn.clone(),
        fee_type,
        year,
        semester_a_due: due_a,
        semester_b_due: due_b,
    });

    Ok(generated)
}

/// admission details for a new student
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub usn: String,
    pub department: String,
    pub current_year: u8,
    pub quota: Quota,
    pub entry: EntryMode,
    pub transport_opted: bool,
    pub hostel_opted: bool,
    /// agreed annual college fee, management quota only
    pub assigned_college_fee: Option<Money>,
    pub assigned_transport_fee: Option<Money>,
    pub assigned_hostel_fee: Option<Money>,
}

/// create a student with their first year of ledger records
///
/// the college rate comes from the assigned fee for management quota and
/// from the passed-in default for government quota; counters start at the
/// annual totals
pub fn enroll(
    request: EnrollmentRequest,
    default_government_fee: Money,
    time: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<Student> {
    let college_fee = match request.quota {
        Quota::Management => request.assigned_college_fee.unwrap_or(Money::ZERO),
        Quota::Government => default_government_fee,
    };
    let transport_fee = if request.transport_opted {
        request.assigned_transport_fee.unwrap_or(Money::ZERO)
    } else {
        Money::ZERO
    };
    let hostel_fee = if request.hostel_opted {
        request.assigned_hostel_fee.unwrap_or(Money::ZERO)
    } else {
        Money::ZERO
    };

    for amount in [college_fee, transport_fee, hostel_fee] {
        if amount.is_negative() {
            return Err(LedgerError::InvalidAmount { amount });
        }
    }

    let mut student = Student::new(
        request.usn,
        request.department,
        request.current_year,
        request.quota,
        request.entry,
    );
    student.transport_opted = request.transport_opted;
    student.hostel_opted = request.hostel_opted;

    let year = student.current_year;
    for (fee_type, annual) in [
        (FeeType::College, college_fee),
        (FeeType::Transport, transport_fee),
        (FeeType::Hostel, hostel_fee),
    ] {
        if !student.is_opted(fee_type) {
            continue;
        }
        student.set_annual_fee(fee_type, annual);
        generate_year_records(&mut student, year, fee_type, annual, events)?;
        if let Some(counter) = student.due_counter_mut(fee_type) {
            *counter = annual;
        }
    }

    events.emit(Event::StudentEnrolled {
        usn: student.usn.clone(),
        year,
        timestamp: time.now(),
    });

    Ok(student)
}

/// set the government college rate for every active government-quota student
/// of a year, then persist it as the system default
///
/// returns how many students were repriced; a configuration store failure
/// surfaces after the students were already updated
pub fn apply_government_rate(
    students: &mut [Student],
    year: u8,
    amount: Money,
    config: &mut dyn ConfigStore,
    events: &mut EventStore,
) -> Result<u32> {
    if amount.is_negative() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    let mut updated = 0;
    for student in students
        .iter_mut()
        .filter(|s| s.is_active() && s.quota == Quota::Government && s.current_year == year)
    {
        student.annual_college_fee = amount;
        student.college_fee_due = amount;
        generate_year_records(student, year, FeeType::College, amount, events)?;
        events.emit(Event::RateUpdated {
            usn: student.usn.clone(),
            fee_type: FeeType::College,
            year,
            annual_amount: amount,
        });
        updated += 1;
    }

    config
        .set_default_government_fee(amount)
        .map_err(|e| LedgerError::ExternalDependencyFailure {
            message: format!("config store rejected rate update: {e}"),
        })?;

    Ok(updated)
}

/// per-student variant of the rate update for management-quota students
pub fn assign_management_fee(
    student: &mut Student,
    year: u8,
    amount: Money,
    events: &mut EventStore,
) -> Result<()> {
    if amount.is_negative() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    student.annual_college_fee = amount;
    student.college_fee_due = amount;
    generate_year_records(student, year, FeeType::College, amount, events)?;
    events.emit(Event::RateUpdated {
        usn: student.usn.clone(),
        fee_type: FeeType::College,
        year,
        annual_amount: amount,
    });

    Ok(())
}

/// opt a student into transport/hostel/placement and raise a single
/// current-year demand for it
pub fn assign_category_fee(
    student: &mut Student,
    fee_type: FeeType,
    amount: Money,
    events: &mut EventStore,
) -> Result<()> {
    if matches!(fee_type, FeeType::College | FeeType::Other) {
        return Err(LedgerError::CategoryNotBillable { fee_type });
    }
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    student.set_opted(fee_type, true);

    let year = student.current_year;
    let (sem_a, _) = semesters_of(year);
    student
        .fee_records
        .push(FeeRecord::new(year, sem_a, fee_type, amount));

    if let Some(counter) = student.due_counter_mut(fee_type) {
        *counter += amount;
    }

    events.emit(Event::CategoryAssigned {
        usn: student.usn.clone(),
        fee_type,
        year,
        amount,
    });

    Ok(())
}

/// raise the same category demand for every active student of a year,
/// skipping students who already carry a record of the type for it
pub fn assign_bulk_category_fee(
    students: &mut [Student],
    year: u8,
    fee_type: FeeType,
    amount: Money,
    events: &mut EventStore,
) -> Result<u32> {
    if matches!(fee_type, FeeType::College | FeeType::Other) {
        return Err(LedgerError::CategoryNotBillable { fee_type });
    }
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    let mut assigned = 0;
    for student in students
        .iter_mut()
        .filter(|s| s.is_active() && s.current_year == year)
    {
        let already_billed = student
            .fee_records
            .iter()
            .any(|r| r.year == year && r.fee_type == fee_type);
        if already_billed {
            continue;
        }
        assign_category_fee(student, fee_type, amount, events)?;
        assigned += 1;
    }

    Ok(assigned)
}

/// opt a student out of a category; existing records stay as they are
pub fn disable_category(student: &mut Student, fee_type: FeeType) {
    student.set_opted(fee_type, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InMemoryConfig;
    use crate::types::RecordStatus;
    use hourglass_rs::TimeSource;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(chrono::Utc::now()))
    }

    fn government_student(year: u8) -> Student {
        Student::new("1AB22CS001", "CSE", year, Quota::Government, EntryMode::Regular)
    }

    #[test]
    fn test_generate_splits_odd_amount() {
        let mut student = government_student(2);
        let mut events = EventStore::new();

        let records =
            generate_year_records(&mut student, 2, FeeType::College, Money::new(45001), &mut events)
                .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].semester, 3);
        assert_eq!(records[0].amount_due, Money::new(22501));
        assert_eq!(records[1].semester, 4);
        assert_eq!(records[1].amount_due, Money::new(22500));
        assert_eq!(records[0].status, RecordStatus::Pending);
    }

    #[test]
    fn test_generate_zero_annual_is_inactive() {
        let mut student = government_student(1);
        let mut events = EventStore::new();

        let records =
            generate_year_records(&mut student, 1, FeeType::Transport, Money::ZERO, &mut events)
                .unwrap();

        assert!(records.is_empty());
        assert!(student.fee_records.is_empty());
    }

    #[test]
    fn test_generate_rejects_negative_annual() {
        let mut student = government_student(1);
        let mut events = EventStore::new();

        let result = generate_year_records(
            &mut student,
            1,
            FeeType::College,
            Money::new(-1),
            &mut events,
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_generate_reprices_existing_without_resetting_paid() {
        let mut student = government_student(1);
        let mut events = EventStore::new();

        generate_year_records(&mut student, 1, FeeType::College, Money::new(50000), &mut events)
            .unwrap();
        student.fee_records[0].post(Money::new(25000), "CASH", "R1", chrono::Utc::now());

        let records =
            generate_year_records(&mut student, 1, FeeType::College, Money::new(60000), &mut events)
                .unwrap();

        assert_eq!(student.fee_records.len(), 2);
        assert_eq!(records[0].amount_due, Money::new(30000));
        assert_eq!(records[0].amount_paid, Money::new(25000));
        assert_eq!(records[0].status, RecordStatus::Partial);
    }

    #[test]
    fn test_enroll_government_uses_default_rate() {
        let time = test_time();
        let mut events = EventStore::new();

        let student = enroll(
            EnrollmentRequest {
                usn: "1AB22CS007".to_string(),
                department: "ECE".to_string(),
                current_year: 1,
                quota: Quota::Government,
                entry: EntryMode::Regular,
                transport_opted: true,
                hostel_opted: false,
                assigned_college_fee: None,
                assigned_transport_fee: Some(Money::new(12000)),
                assigned_hostel_fee: None,
            },
            Money::new(70000),
            &time,
            &mut events,
        )
        .unwrap();

        assert_eq!(student.annual_college_fee, Money::new(70000));
        assert_eq!(student.college_fee_due, Money::new(70000));
        assert_eq!(student.transport_fee_due, Money::new(12000));
        assert_eq!(student.hostel_fee_due, Money::ZERO);
        // two college + two transport semester records
        assert_eq!(student.fee_records.len(), 4);
        assert_eq!(
            student.record_for(1, 1, FeeType::College).unwrap().amount_due,
            Money::new(35000)
        );
    }

    #[test]
    fn test_enroll_management_uses_assigned_rate() {
        let time = test_time();
        let mut events = EventStore::new();

        let student = enroll(
            EnrollmentRequest {
                usn: "1AB22ME019".to_string(),
                department: "MECH".to_string(),
                current_year: 1,
                quota: Quota::Management,
                entry: EntryMode::Regular,
                transport_opted: false,
                hostel_opted: false,
                assigned_college_fee: Some(Money::new(120000)),
                assigned_transport_fee: None,
                assigned_hostel_fee: None,
            },
            Money::new(70000),
            &time,
            &mut events,
        )
        .unwrap();

        assert_eq!(student.annual_college_fee, Money::new(120000));
        assert_eq!(student.fee_records.len(), 2);
    }

    #[test]
    fn test_apply_government_rate_filters_and_persists() {
        let mut events = EventStore::new();
        let mut config = InMemoryConfig::default();

        let mut students = vec![
            government_student(2),
            {
                let mut s = Student::new("1AB22CS002", "CSE", 2, Quota::Management, EntryMode::Regular);
                s.annual_college_fee = Money::new(120000);
                s
            },
            government_student(3),
        ];

        let updated = apply_government_rate(
            &mut students,
            2,
            Money::new(80000),
            &mut config,
            &mut events,
        )
        .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(students[0].annual_college_fee, Money::new(80000));
        assert_eq!(students[0].college_fee_due, Money::new(80000));
        assert_eq!(
            students[0].record_for(2, 3, FeeType::College).unwrap().amount_due,
            Money::new(40000)
        );
        // management and other-year students untouched
        assert_eq!(students[1].annual_college_fee, Money::new(120000));
        assert!(students[2].fee_records.is_empty());
        assert_eq!(config.default_government_fee().unwrap(), Money::new(80000));
    }

    #[test]
    fn test_assign_category_fee_opts_in_and_bills() {
        let mut student = government_student(2);
        let mut events = EventStore::new();

        assign_category_fee(&mut student, FeeType::Hostel, Money::new(40000), &mut events)
            .unwrap();

        assert!(student.hostel_opted);
        assert_eq!(student.hostel_fee_due, Money::new(40000));
        let record = student.record_for(2, 3, FeeType::Hostel).unwrap();
        assert_eq!(record.amount_due, Money::new(40000));
        assert_eq!(record.status, RecordStatus::Pending);
    }

    #[test]
    fn test_assign_category_rejects_college() {
        let mut student = government_student(1);
        let mut events = EventStore::new();

        let result =
            assign_category_fee(&mut student, FeeType::College, Money::new(1000), &mut events);
        assert!(matches!(result, Err(LedgerError::CategoryNotBillable { .. })));
    }

    #[test]
    fn test_bulk_assignment_skips_already_billed() {
        let mut events = EventStore::new();
        let mut students = vec![government_student(3), {
            let mut s = Student::new("1AB20CS044", "CSE", 3, Quota::Government, EntryMode::Regular);
            assign_category_fee(&mut s, FeeType::Placement, Money::new(5000), &mut events)
                .unwrap();
            s
        }];

        let assigned = assign_bulk_category_fee(
            &mut students,
            3,
            FeeType::Placement,
            Money::new(5000),
            &mut events,
        )
        .unwrap();

        assert_eq!(assigned, 1);
        assert_eq!(students[1].placement_fee_due, Money::new(5000));
    }

    #[test]
    fn test_disable_category_keeps_records() {
        let mut student = government_student(2);
        let mut events = EventStore::new();
        assign_category_fee(&mut student, FeeType::Transport, Money::new(9000), &mut events)
            .unwrap();

        disable_category(&mut student, FeeType::Transport);

        assert!(!student.transport_opted);
        assert_eq!(student.fee_records.len(), 1);
        assert_eq!(student.transport_fee_due, Money::new(9000));
    }
}
