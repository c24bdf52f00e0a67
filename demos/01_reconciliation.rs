/// reconciliation - repair a ledger with duplicates and an over-payment
use fee_ledger_rs::{
    reconcile, EntryMode, EventStore, FeeRecord, FeeType, Money, Quota, SafeTimeProvider,
    Student, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let mut events = EventStore::new();

    let mut student = Student::new("1AB21CS010", "CSE", 2, Quota::Government, EntryMode::Regular);
    student.annual_college_fee = Money::new(44000);

    // a duplicated semester-1 record and an over-paid semester-4 record
    student
        .fee_records
        .push(FeeRecord::new(1, 1, FeeType::College, Money::new(22000)));
    student
        .fee_records
        .push(FeeRecord::new(1, 1, FeeType::College, Money::new(22000)));
    let mut sem4 = FeeRecord::new(2, 4, FeeType::College, Money::new(22000));
    sem4.post(Money::new(60000), "Online", "bulk remittance", time.now());
    student.fee_records.push(sem4);

    let report = reconcile(&mut student, &time, &mut events)?;
    println!(
        "merged {} duplicates, created {} records, moved {} transfers",
        report.duplicates_merged, report.records_created, report.transfers
    );

    for record in &student.fee_records {
        println!(
            "Y{}S{} {:?}: due {} paid {} [{:?}]",
            record.year, record.semester, record.fee_type, record.amount_due, record.amount_paid,
            record.status
        );
    }

    Ok(())
}
