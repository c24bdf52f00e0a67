use hourglass_rs::SafeTimeProvider;

use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::money::Money;
use crate::student::{FeeRecord, Student};
use crate::types::FeeType;

use super::{RecordSelector, MODE_AUTO_CLEAR};

/// apply a payment to the record the selector resolves to
///
/// credits the record through its single mutator, then decrements the
/// category's cached counter floored at zero; any excess stays visible only
/// in the record's `amount_paid`
pub fn apply_payment(
    student: &mut Student,
    selector: RecordSelector,
    amount: Money,
    mode: &str,
    reference: &str,
    time: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<FeeRecord> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    let index = match &selector {
        RecordSelector::ById(id) => student.fee_records.iter().position(|r| r.id == *id),
        RecordSelector::ByType { fee_type, year } => student.fee_records.iter().position(|r| {
            r.fee_type == *fee_type
                && !r.is_settled()
                && year.map_or(true, |y| r.year == y)
        }),
    }
    .ok_or_else(|| LedgerError::RecordNotFound {
        details: match &selector {
            RecordSelector::ById(id) => format!("id {id}"),
            RecordSelector::ByType { fee_type, year } => match year {
                Some(y) => format!("open {fee_type:?} record in year {y}"),
                None => format!("open {fee_type:?} record"),
            },
        },
    })?;

    let now = time.now();
    let record = &mut student.fee_records[index];
    record.post(amount, mode, reference, now);

    let updated = record.clone();
    if let Some(counter) = student.due_counter_mut(updated.fee_type) {
        *counter = counter.saturating_deduct(amount);
    }

    events.emit(Event::PaymentReceived {
        usn: student.usn.clone(),
        record_id: updated.id,
        fee_type: updated.fee_type,
        year: updated.year,
        semester: updated.semester,
        amount,
        mode: mode.to_string(),
        reference: reference.to_string(),
        timestamp: now,
    });

    Ok(updated)
}

/// overwrite a category's cached counter, and when it is set to zero
/// force-close every open record of that category
///
/// closing appends an `Auto-Clear` transaction for the positive remainder;
/// a record already at or above its due amount gets no transaction, only a
/// status re-derivation, leaving any excess for reconciliation to move
pub fn mark_due_as_paid(
    student: &mut Student,
    fee_type: FeeType,
    amount: Money,
    time: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<u32> {
    if amount.is_negative() {
        return Err(LedgerError::InvalidAmount { amount });
    }
    if !fee_type.is_billable() {
        return Err(LedgerError::CategoryNotBillable { fee_type });
    }

    if let Some(counter) = student.due_counter_mut(fee_type) {
        *counter = amount;
    }

    let mut records_closed = 0;
    let now = time.now();

    if amount.is_zero() {
        for record in student
            .fee_records
            .iter_mut()
            .filter(|r| r.fee_type == fee_type && !r.is_settled())
        {
            let remainder = record.outstanding();
            if remainder.is_positive() {
                record.post(remainder, MODE_AUTO_CLEAR, "Due Marked Paid", now);
            } else {
                record.rederive_status();
            }
            records_closed += 1;
        }

        events.emit(Event::DueCleared {
            usn: student.usn.clone(),
            fee_type,
            records_closed,
            timestamp: now,
        });
    }

    Ok(records_closed)
}
