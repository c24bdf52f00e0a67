use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{FeeType, RecordId};

/// all events that can be emitted by the ledger engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // payment events
    PaymentReceived {
        usn: String,
        record_id: RecordId,
        fee_type: FeeType,
        year: u8,
        semester: u8,
        amount: Money,
        mode: String,
        reference: String,
        timestamp: DateTime<Utc>,
    },
    DueCleared {
        usn: String,
        fee_type: FeeType,
        records_closed: u32,
        timestamp: DateTime<Utc>,
    },

    // generation events
    RecordsGenerated {
        usn: String,
        fee_type: FeeType,
        year: u8,
        semester_a_due: Money,
        semester_b_due: Money,
    },
    CategoryAssigned {
        usn: String,
        fee_type: FeeType,
        year: u8,
        amount: Money,
    },
    RateUpdated {
        usn: String,
        fee_type: FeeType,
        year: u8,
        annual_amount: Money,
    },
    StudentEnrolled {
        usn: String,
        year: u8,
        timestamp: DateTime<Utc>,
    },

    // reconciliation events
    DuplicatesMerged {
        usn: String,
        year: u8,
        semester: u8,
        fee_type: FeeType,
        absorbed: u32,
    },
    PaidRecalculated {
        usn: String,
        record_id: RecordId,
        old_amount: Money,
        new_amount: Money,
    },
    ExcessTransferred {
        usn: String,
        from_semester: u8,
        to_semester: u8,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // promotion events
    StudentPromoted {
        usn: String,
        from_year: u8,
        to_year: u8,
        timestamp: DateTime<Utc>,
    },
    StudentGraduated {
        usn: String,
        timestamp: DateTime<Utc>,
    },
    PromotionSkipped {
        usn: String,
        year: u8,
        reasons: Vec<String>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// external audit sink; `record` is fire-and-forget and implementations
/// must swallow their own failures
pub trait AuditSink {
    fn record(&self, event: &Event);
}

/// sink that discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&self, _event: &Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_store_drain() {
        let mut events = EventStore::new();
        events.emit(Event::StudentGraduated {
            usn: "1AB20CS001".to_string(),
            timestamp: Utc::now(),
        });

        assert_eq!(events.events().len(), 1);
        let drained = events.take_events();
        assert_eq!(drained.len(), 1);
        assert!(events.events().is_empty());
    }
}
