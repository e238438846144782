use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{AccountId, PaymentId, StatementId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    #[error("statement already generated for account {account_id} cycle {start}..{end}")]
    DuplicateCycle {
        account_id: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("account not found: {id}")]
    AccountNotFound {
        id: AccountId,
    },

    #[error("account is not a credit card: {id}")]
    NotACreditCard {
        id: AccountId,
    },

    #[error("statement not found: {id}")]
    StatementNotFound {
        id: StatementId,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: PaymentId,
    },

    #[error("invalid payment amount {amount}: {reason}")]
    InvalidAmount {
        amount: Money,
        reason: String,
    },

    #[error("statement {id} was carried into statement {newer}")]
    StatementSuperseded {
        id: StatementId,
        newer: StatementId,
    },

    #[error("funds transfer from {from} failed: {reason}")]
    TransferFailed {
        from: AccountId,
        reason: String,
    },

    #[error("statement {id} was modified concurrently")]
    ConcurrentModification {
        id: StatementId,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

impl BillingError {
    /// errors the user can act on directly; everything else surfaces as
    /// "operation failed, no changes made"
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            BillingError::DuplicateCycle { .. }
                | BillingError::InvalidAmount { .. }
                | BillingError::StatementSuperseded { .. }
        )
    }

    pub(crate) fn overflow(what: &str) -> Self {
        BillingError::CalculationError {
            message: format!("{} overflows i64 cents", what),
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
