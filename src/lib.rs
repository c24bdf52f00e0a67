pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod money;
pub mod promotion;
pub mod student;
pub mod types;

// re-export key types
pub use config::{ConfigStore, InMemoryConfig};
pub use errors::{LedgerError, Result};
pub use events::{AuditSink, Event, EventStore, NullSink};
pub use ledger::{
    apply_government_rate, apply_payment, assign_bulk_category_fee, assign_category_fee,
    assign_management_fee, disable_category, enroll, find_student_mut, generate_year_records,
    mark_due_as_paid, reconcile, reconcile_batch, BatchReport, EnrollmentRequest,
    ReconcileReport, RecordSelector,
};
pub use money::Money;
pub use promotion::{
    evaluate_promotion, promote, promote_year, IneligibilityReason, LibraryPort,
    PromotionEligibility, PromotionOutcome, PromotionSummary,
};
pub use student::{FeeRecord, Student, StudentView, Transaction};
pub use types::{
    AcademicStatus, EntryMode, FeeType, Quota, RecordId, RecordStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use uuid::Uuid;
