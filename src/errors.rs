use thiserror::Error;

use crate::money::Money;
use crate::types::FeeType;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("student not found: {usn}")]
    StudentNotFound {
        usn: String,
    },

    #[error("no matching fee record: {details}")]
    RecordNotFound {
        details: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("inconsistent ledger for {usn}: {message}")]
    InconsistentLedger {
        usn: String,
        message: String,
    },

    #[error("external dependency failed: {message}")]
    ExternalDependencyFailure {
        message: String,
    },

    #[error("category not billable: {fee_type:?}")]
    CategoryNotBillable {
        fee_type: FeeType,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
