use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for an account
pub type AccountId = Uuid;

/// unique identifier for a statement (bill)
pub type StatementId = Uuid;

/// unique identifier for a payment record
pub type PaymentId = Uuid;

/// account kinds known to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Cash,
    Checking,
    Savings,
    CreditCard,
}

impl AccountKind {
    pub fn is_credit(&self) -> bool {
        matches!(self, AccountKind::CreditCard)
    }
}

/// payment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    /// covers the full statement total
    Full,
    /// exactly the minimum payment
    Minimum,
    /// any other amount
    Custom,
}

/// settlement state of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementStatus {
    /// generated, nothing paid yet
    Open,
    /// some payments, remaining amount above zero
    PartiallyPaid,
    /// remaining amount is zero
    Paid,
}

/// what to do when a payment exceeds the remaining amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverpaymentPolicy {
    /// reject unless the request explicitly allows it
    Reject,
    /// accept and leave a credit balance on the card
    AllowCredit,
}

/// date the annual fee anniversary is counted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnualFeeAnchor {
    /// the account's opening date
    AccountOpened,
    /// start date of the account's first statement
    FirstStatement,
}
