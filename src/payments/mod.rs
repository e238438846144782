pub mod processor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::statement::Statement;
use crate::types::{AccountId, PaymentId, PaymentType, StatementId};

pub use processor::{PaymentApplication, PaymentProcessor, PaymentReversal};

// payments made through the engine move the card balance directly and are
// never posted to the transaction ledger, so they are not counted again as
// cycle credits

/// one recorded payment against a credit-card account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// None for an early payment not yet attached to a statement
    pub bill_id: Option<StatementId>,
    pub account_id: AccountId,
    pub amount: Money,
    pub payment_type: PaymentType,
    pub payment_date: DateTime<Utc>,
    /// statement total (or card debt for early payments) when paid
    pub due_amount: Money,
    pub is_on_time: bool,
    pub from_account_id: Option<AccountId>,
    pub note: Option<String>,
}

impl Payment {
    pub fn is_attached(&self) -> bool {
        self.bill_id.is_some()
    }
}

/// payment request against a statement
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub statement_id: StatementId,
    pub amount: Money,
    pub from_account_id: Option<AccountId>,
    pub note: Option<String>,
    /// accept an amount above the remaining balance as a credit
    pub allow_overpay: bool,
}

impl PaymentRequest {
    pub fn new(statement_id: StatementId, amount: Money) -> Self {
        Self {
            statement_id,
            amount,
            from_account_id: None,
            note: None,
            allow_overpay: false,
        }
    }

    /// debit the payment from a funding account
    pub fn from_account(mut self, account_id: AccountId) -> Self {
        self.from_account_id = Some(account_id);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn allow_overpay(mut self) -> Self {
        self.allow_overpay = true;
        self
    }
}

/// payment made before the statement covering its date exists
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyPaymentRequest {
    pub account_id: AccountId,
    pub amount: Money,
    pub from_account_id: Option<AccountId>,
    pub note: Option<String>,
    /// accept an amount above the card's current debt
    pub allow_overpay: bool,
}

impl EarlyPaymentRequest {
    pub fn new(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            amount,
            from_account_id: None,
            note: None,
            allow_overpay: false,
        }
    }

    pub fn from_account(mut self, account_id: AccountId) -> Self {
        self.from_account_id = Some(account_id);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn allow_overpay(mut self) -> Self {
        self.allow_overpay = true;
        self
    }
}

/// Full when the amount covers the statement total, Minimum when it equals
/// the minimum payment, Custom otherwise
pub fn classify(amount: Money, statement: &Statement) -> PaymentType {
    if amount >= statement.total_amount {
        PaymentType::Full
    } else if amount == statement.minimum_payment {
        PaymentType::Minimum
    } else {
        PaymentType::Custom
    }
}

/// on time when paid on or before the due date
pub fn is_on_time(payment_date: DateTime<Utc>, statement: &Statement) -> bool {
    payment_date.date_naive() <= statement.payment_due_date
}

pub(crate) fn new_payment_id() -> PaymentId {
    Uuid::new_v4()
}
