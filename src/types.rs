use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// unique identifier for a ledger record
pub type RecordId = Uuid;

/// fee category of a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    College,
    Transport,
    Hostel,
    Placement,
    Other,
}

impl FeeType {
    /// the four categories that carry annual rates, opt flags and due counters
    pub const BILLABLE: [FeeType; 4] = [
        FeeType::College,
        FeeType::Transport,
        FeeType::Hostel,
        FeeType::Placement,
    ];

    /// whether this category is tracked by the student's counters
    pub fn is_billable(&self) -> bool {
        !matches!(self, FeeType::Other)
    }
}

/// enrollment quota determining where the college rate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quota {
    /// subsidised rate taken from the system-wide default
    Government,
    /// individually assigned rate
    Management,
}

/// how the student entered the programme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    Regular,
    Lateral,
}

/// academic lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcademicStatus {
    Active,
    Detained,
    Graduated,
    Dropout,
}

/// settlement status of a single ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Partial,
    Paid,
}

impl RecordStatus {
    /// derive status from the due/paid pair; total over non-negative inputs
    pub fn derive(amount_due: Money, amount_paid: Money) -> Self {
        if amount_paid >= amount_due {
            RecordStatus::Paid
        } else if amount_paid.is_positive() {
            RecordStatus::Partial
        } else {
            RecordStatus::Pending
        }
    }
}

/// semester pair covered by an academic year
pub fn semesters_of(year: u8) -> (u8, u8) {
    (year * 2 - 1, year * 2)
}
