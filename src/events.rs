use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AccountId, PaymentId, PaymentType, StatementId};

/// all events that can be emitted by the billing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // statement events
    StatementGenerated {
        account_id: AccountId,
        statement_id: StatementId,
        period_start: NaiveDate,
        period_end: NaiveDate,
        total_amount: Money,
        minimum_payment: Money,
        payment_due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    StatementSettled {
        statement_id: StatementId,
        timestamp: DateTime<Utc>,
    },
    StatementReopened {
        statement_id: StatementId,
        remaining_amount: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentApplied {
        payment_id: PaymentId,
        statement_id: Option<StatementId>,
        account_id: AccountId,
        amount: Money,
        payment_type: PaymentType,
        is_on_time: bool,
        timestamp: DateTime<Utc>,
    },
    PaymentReversed {
        payment_id: PaymentId,
        statement_id: Option<StatementId>,
        account_id: AccountId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    EarlyPaymentsAttached {
        statement_id: StatementId,
        payment_ids: Vec<PaymentId>,
        amount: Money,
    },
    FundsTransferred {
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    TransferReversed {
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // interest and fee events
    InterestAssessed {
        account_id: AccountId,
        overdue_statement_id: StatementId,
        amount: Money,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },
    AnnualFeeCharged {
        account_id: AccountId,
        anniversary: NaiveDate,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    AnnualFeeWaived {
        account_id: AccountId,
        anniversary: NaiveDate,
        trailing_charges: Money,
        threshold: Money,
        timestamp: DateTime<Utc>,
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

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
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
