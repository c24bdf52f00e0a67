use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::types::{AcademicStatus, EntryMode, FeeType, Quota, RecordId, RecordStatus};

/// append-only payment log entry inside a fee record; negative amounts
/// record an outbound transfer to another record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub mode: String,
    pub reference: String,
}

/// one semester-scoped financial obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub id: RecordId,
    pub year: u8,
    pub semester: u8,
    pub fee_type: FeeType,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub status: RecordStatus,
    pub transactions: Vec<Transaction>,
}

impl FeeRecord {
    /// create a fresh record with nothing paid
    pub fn new(year: u8, semester: u8, fee_type: FeeType, amount_due: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            year,
            semester,
            fee_type,
            amount_due,
            amount_paid: Money::ZERO,
            status: RecordStatus::derive(amount_due, Money::ZERO),
            transactions: Vec::new(),
        }
    }

    /// the only place `amount_paid` and `status` are written: credit the
    /// record (amount may be negative for transfers out), append the
    /// transaction, re-derive status
    pub fn post(&mut self, amount: Money, mode: &str, reference: &str, date: DateTime<Utc>) {
        self.amount_paid += amount;
        self.transactions.push(Transaction {
            amount,
            date,
            mode: mode.to_string(),
            reference: reference.to_string(),
        });
        self.status = RecordStatus::derive(self.amount_due, self.amount_paid);
    }

    /// change the due amount without touching what was already paid
    pub fn reprice(&mut self, amount_due: Money) {
        self.amount_due = amount_due;
        self.status = RecordStatus::derive(self.amount_due, self.amount_paid);
    }

    /// re-derive status against the current due/paid pair
    pub fn rederive_status(&mut self) {
        self.status = RecordStatus::derive(self.amount_due, self.amount_paid);
    }

    /// unpaid remainder, negative when over-paid
    pub fn outstanding(&self) -> Money {
        self.amount_due - self.amount_paid
    }

    /// sum of the transaction log, negative entries included
    pub fn transaction_total(&self) -> Money {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    pub fn is_settled(&self) -> bool {
        self.status == RecordStatus::Paid
    }
}

/// one enrolled student with their fee ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub usn: String,
    pub department: String,
    pub current_year: u8,
    pub quota: Quota,
    pub entry: EntryMode,
    pub status: AcademicStatus,

    pub transport_opted: bool,
    pub hostel_opted: bool,
    pub placement_opted: bool,

    // persisted annual rates, used to regenerate the next year's records
    pub annual_college_fee: Money,
    pub annual_transport_fee: Money,
    pub annual_hostel_fee: Money,
    pub annual_placement_fee: Money,

    // cached per-category outstanding balances for the current year
    pub college_fee_due: Money,
    pub transport_fee_due: Money,
    pub hostel_fee_due: Money,
    pub placement_fee_due: Money,

    // balance carried from before ledger adoption, reporting only
    pub last_sem_dues: Money,

    pub fee_records: Vec<FeeRecord>,

    // consumed by external reporting, never by the promotion gate
    pub eligibility_override: Option<bool>,
}

impl Student {
    /// create a bare active student with an empty ledger
    pub fn new(
        usn: impl Into<String>,
        department: impl Into<String>,
        current_year: u8,
        quota: Quota,
        entry: EntryMode,
    ) -> Self {
        Self {
            usn: usn.into(),
            department: department.into(),
            current_year,
            quota,
            entry,
            status: AcademicStatus::Active,
            transport_opted: false,
            hostel_opted: false,
            placement_opted: false,
            annual_college_fee: Money::ZERO,
            annual_transport_fee: Money::ZERO,
            annual_hostel_fee: Money::ZERO,
            annual_placement_fee: Money::ZERO,
            college_fee_due: Money::ZERO,
            transport_fee_due: Money::ZERO,
            hostel_fee_due: Money::ZERO,
            placement_fee_due: Money::ZERO,
            last_sem_dues: Money::ZERO,
            fee_records: Vec::new(),
            eligibility_override: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AcademicStatus::Active
    }

    /// persisted annual rate for a category
    pub fn annual_fee(&self, fee_type: FeeType) -> Money {
        match fee_type {
            FeeType::College => self.annual_college_fee,
            FeeType::Transport => self.annual_transport_fee,
            FeeType::Hostel => self.annual_hostel_fee,
            FeeType::Placement => self.annual_placement_fee,
            FeeType::Other => Money::ZERO,
        }
    }

    pub fn set_annual_fee(&mut self, fee_type: FeeType, amount: Money) {
        match fee_type {
            FeeType::College => self.annual_college_fee = amount,
            FeeType::Transport => self.annual_transport_fee = amount,
            FeeType::Hostel => self.annual_hostel_fee = amount,
            FeeType::Placement => self.annual_placement_fee = amount,
            FeeType::Other => {}
        }
    }

    /// cached outstanding counter for a category
    pub fn due_counter(&self, fee_type: FeeType) -> Money {
        match fee_type {
            FeeType::College => self.college_fee_due,
            FeeType::Transport => self.transport_fee_due,
            FeeType::Hostel => self.hostel_fee_due,
            FeeType::Placement => self.placement_fee_due,
            FeeType::Other => Money::ZERO,
        }
    }

    pub fn due_counter_mut(&mut self, fee_type: FeeType) -> Option<&mut Money> {
        match fee_type {
            FeeType::College => Some(&mut self.college_fee_due),
            FeeType::Transport => Some(&mut self.transport_fee_due),
            FeeType::Hostel => Some(&mut self.hostel_fee_due),
            FeeType::Placement => Some(&mut self.placement_fee_due),
            FeeType::Other => None,
        }
    }

    /// whether the student participates in a category; college is implicit
    pub fn is_opted(&self, fee_type: FeeType) -> bool {
        match fee_type {
            FeeType::College => true,
            FeeType::Transport => self.transport_opted,
            FeeType::Hostel => self.hostel_opted,
            FeeType::Placement => self.placement_opted,
            FeeType::Other => false,
        }
    }

    pub fn set_opted(&mut self, fee_type: FeeType, opted: bool) {
        match fee_type {
            FeeType::Transport => self.transport_opted = opted,
            FeeType::Hostel => self.hostel_opted = opted,
            FeeType::Placement => self.placement_opted = opted,
            FeeType::College | FeeType::Other => {}
        }
    }

    /// aggregate of the four cached counters
    pub fn total_due(&self) -> Money {
        FeeType::BILLABLE
            .iter()
            .map(|fee_type| self.due_counter(*fee_type))
            .sum()
    }

    /// authoritative counter resync value: total due across the category's
    /// current-year records
    pub fn current_year_due_total(&self, fee_type: FeeType) -> Money {
        self.fee_records
            .iter()
            .filter(|r| r.fee_type == fee_type && r.year == self.current_year)
            .map(|r| r.amount_due)
            .sum()
    }

    pub fn record_by_id(&self, id: RecordId) -> Option<&FeeRecord> {
        self.fee_records.iter().find(|r| r.id == id)
    }

    pub fn record_for(&self, year: u8, semester: u8, fee_type: FeeType) -> Option<&FeeRecord> {
        self.fee_records
            .iter()
            .find(|r| r.year == year && r.semester == semester && r.fee_type == fee_type)
    }

    /// first record of the type still pending or partial, optionally scoped
    /// to a year
    pub fn first_open_record_mut(
        &mut self,
        fee_type: FeeType,
        year: Option<u8>,
    ) -> Option<&mut FeeRecord> {
        self.fee_records.iter_mut().find(|r| {
            r.fee_type == fee_type
                && !r.is_settled()
                && year.map_or(true, |y| r.year == y)
        })
    }
}

/// serializable fee summary for calling code
#[derive(Debug, Serialize, Deserialize)]
pub struct StudentView {
    pub usn: String,
    pub department: String,
    pub current_year: u8,
    pub status: AcademicStatus,
    pub total_due: Money,
    pub categories: Vec<CategoryView>,
    pub record_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryView {
    pub fee_type: FeeType,
    pub opted: bool,
    pub annual_fee: Money,
    pub due_counter: Money,
    pub ledger_due: Money,
    pub ledger_paid: Money,
}

impl StudentView {
    pub fn from_student(student: &Student) -> Self {
        let categories = FeeType::BILLABLE
            .iter()
            .map(|&fee_type| {
                let records = student
                    .fee_records
                    .iter()
                    .filter(|r| r.fee_type == fee_type);
                let (ledger_due, ledger_paid) = records.fold(
                    (Money::ZERO, Money::ZERO),
                    |(due, paid), r| (due + r.amount_due, paid + r.amount_paid),
                );
                CategoryView {
                    fee_type,
                    opted: student.is_opted(fee_type),
                    annual_fee: student.annual_fee(fee_type),
                    due_counter: student.due_counter(fee_type),
                    ledger_due,
                    ledger_paid,
                }
            })
            .collect();

        Self {
            usn: student.usn.clone(),
            department: student.department.clone(),
            current_year: student.current_year,
            status: student.status,
            total_due: student.total_due(),
            categories,
            record_count: student.fee_records.len(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
