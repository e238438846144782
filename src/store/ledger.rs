use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::AccountId;

/// kind of a ledger posting against a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryKind {
    /// purchase or cash advance, increases what is owed
    Charge,
    /// refund or return, decreases what is owed
    Credit,
    /// signed correction, positive increases what is owed
    Adjustment,
}

/// one dated transaction on an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: AccountId,
    pub kind: LedgerEntryKind,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: String,
}

impl LedgerEntry {
    pub fn new(
        account_id: AccountId,
        kind: LedgerEntryKind,
        amount: Money,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
            date,
            description: description.into(),
        }
    }

    pub fn charge(account_id: AccountId, amount: Money, date: NaiveDate, description: impl Into<String>) -> Self {
        Self::new(account_id, LedgerEntryKind::Charge, amount, date, description)
    }

    pub fn credit(account_id: AccountId, amount: Money, date: NaiveDate, description: impl Into<String>) -> Self {
        Self::new(account_id, LedgerEntryKind::Credit, amount, date, description)
    }

    pub fn adjustment(account_id: AccountId, amount: Money, date: NaiveDate, description: impl Into<String>) -> Self {
        Self::new(account_id, LedgerEntryKind::Adjustment, amount, date, description)
    }

    /// signed change to the account balance (negative = more owed)
    pub fn balance_effect(&self) -> Money {
        match self.kind {
            LedgerEntryKind::Charge | LedgerEntryKind::Adjustment => -self.amount,
            LedgerEntryKind::Credit => self.amount,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.kind {
            LedgerEntryKind::Charge | LedgerEntryKind::Credit if !self.amount.is_positive() => {
                Err(BillingError::InvalidAmount {
                    amount: self.amount,
                    reason: "charges and credits must be positive".to_string(),
                })
            }
            LedgerEntryKind::Adjustment if self.amount.is_zero() => Err(BillingError::InvalidAmount {
                amount: self.amount,
                reason: "adjustment must be non-zero".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// ledger sums for one cycle window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleTotals {
    pub charges: Money,
    pub credits: Money,
    pub adjustments: Money,
}

/// the transaction ledger the statement generator pulls from
pub trait TransactionLedger: Send + Sync {
    /// sums of entries dated inside `[start, end)`
    fn sum_transactions(&self, account_id: AccountId, start: NaiveDate, end: NaiveDate) -> Result<CycleTotals>;

    fn post(&self, entry: LedgerEntry) -> Result<()>;

    /// remove a posted entry; unknown ids are a no-op
    fn retract(&self, entry_id: Uuid) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries_for_account(&self, account_id: AccountId) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect()
    }
}

impl TransactionLedger for InMemoryLedger {
    fn sum_transactions(&self, account_id: AccountId, start: NaiveDate, end: NaiveDate) -> Result<CycleTotals> {
        let entries = self.entries.read();
        let mut totals = CycleTotals::default();

        for entry in entries
            .iter()
            .filter(|e| e.account_id == account_id && start <= e.date && e.date < end)
        {
            let bucket = match entry.kind {
                LedgerEntryKind::Charge => &mut totals.charges,
                LedgerEntryKind::Credit => &mut totals.credits,
                LedgerEntryKind::Adjustment => &mut totals.adjustments,
            };
            *bucket = bucket
                .checked_add(entry.amount)
                .ok_or_else(|| BillingError::overflow("cycle totals"))?;
        }

        Ok(totals)
    }

    fn post(&self, entry: LedgerEntry) -> Result<()> {
        entry.validate()?;
        self.entries.write().push(entry);
        Ok(())
    }

    fn retract(&self, entry_id: Uuid) -> Result<()> {
        self.entries.write().retain(|e| e.id != entry_id);
        Ok(())
    }
}
