/// quick start - enroll a student, take a payment, promote
use fee_ledger_rs::{
    apply_payment, enroll, promote, EnrollmentRequest, EntryMode, EventStore, FeeType, Money,
    Quota, RecordSelector, SafeTimeProvider, StudentView, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let mut events = EventStore::new();

    // admit a government-quota student at the current default rate
    let mut student = enroll(
        EnrollmentRequest {
            usn: "1AB25CS001".to_string(),
            department: "CSE".to_string(),
            current_year: 1,
            quota: Quota::Government,
            entry: EntryMode::Regular,
            transport_opted: false,
            hostel_opted: false,
            assigned_college_fee: None,
            assigned_transport_fee: None,
            assigned_hostel_fee: None,
        },
        Money::new(70000),
        &time,
        &mut events,
    )?;

    // pay both semesters in cash
    for reference in ["RCPT-001", "RCPT-002"] {
        apply_payment(
            &mut student,
            RecordSelector::ByType {
                fee_type: FeeType::College,
                year: Some(1),
            },
            Money::new(35000),
            "CASH",
            reference,
            &time,
            &mut events,
        )?;
    }

    // dues clear, no library books out: advances to year 2
    let outcome = promote(&mut student, 0, &time, &mut events)?;
    println!("promotion outcome: {outcome:?}");

    // print current state
    println!("{}", StudentView::from_student(&student).to_json_pretty()?);

    Ok(())
}
