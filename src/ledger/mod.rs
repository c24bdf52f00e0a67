pub mod generation;
pub mod payment;
pub mod reconcile;

use crate::errors::{LedgerError, Result};
use crate::student::Student;
use crate::types::{FeeType, RecordId};

pub use generation::{
    apply_government_rate, assign_bulk_category_fee, assign_category_fee,
    assign_management_fee, disable_category, enroll, generate_year_records, EnrollmentRequest,
};
pub use payment::{apply_payment, mark_due_as_paid};
pub use reconcile::{reconcile, reconcile_batch, BatchReport, ReconcileReport};

/// payment modes written by the engines themselves; caller-supplied modes
/// stay free-form
pub const MODE_AUTO_CLEAR: &str = "Auto-Clear";
pub const MODE_AUTO_TRANSFER: &str = "Auto-Transfer";
pub const MODE_AUTO_TRANSFER_OUT: &str = "Auto-Transfer-Out";

/// identifies the ledger record a payment applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSelector {
    /// explicit record identifier
    ById(RecordId),
    /// first pending/partial record of the type, optionally scoped to a year
    ByType {
        fee_type: FeeType,
        year: Option<u8>,
    },
}

/// resolve a student by enrollment code within a loaded batch
pub fn find_student_mut<'a>(students: &'a mut [Student], usn: &str) -> Result<&'a mut Student> {
    students
        .iter_mut()
        .find(|s| s.usn == usn)
        .ok_or_else(|| LedgerError::StudentNotFound {
            usn: usn.to_string(),
        })
}
