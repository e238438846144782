//! Persistence seams for the billing engine.
//!
//! Every multi-row effect is expressed as a [`WriteBatch`] and handed to
//! [`BillingStore::commit`], which applies it all-or-nothing.

pub mod ledger;
pub mod locks;
pub mod memory;

use chrono::NaiveDate;

use crate::account::Account;
use crate::decimal::Money;
use crate::errors::Result;
use crate::payments::Payment;
use crate::statement::Statement;
use crate::types::{AccountId, PaymentId, StatementId};

pub use ledger::{CycleTotals, InMemoryLedger, LedgerEntry, LedgerEntryKind, TransactionLedger};
pub use locks::AccountLocks;
pub use memory::InMemoryStore;

/// one write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// fails with `DuplicateCycle` if the (account, start, end) key exists
    InsertStatement(Statement),
    /// fails with `ConcurrentModification` if the stored version differs
    UpdateStatement {
        statement: Statement,
        expected_version: u64,
    },
    InsertPayment(Payment),
    UpdatePayment(Payment),
    DeletePayment(PaymentId),
    ApplyBalanceDelta {
        account_id: AccountId,
        delta: Money,
    },
}

/// ordered set of writes committed atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn insert_statement(&mut self, statement: Statement) {
        self.push(WriteOp::InsertStatement(statement));
    }

    pub fn update_statement(&mut self, statement: Statement, expected_version: u64) {
        self.push(WriteOp::UpdateStatement {
            statement,
            expected_version,
        });
    }

    pub fn insert_payment(&mut self, payment: Payment) {
        self.push(WriteOp::InsertPayment(payment));
    }

    pub fn update_payment(&mut self, payment: Payment) {
        self.push(WriteOp::UpdatePayment(payment));
    }

    pub fn delete_payment(&mut self, id: PaymentId) {
        self.push(WriteOp::DeletePayment(id));
    }

    pub fn apply_balance_delta(&mut self, account_id: AccountId, delta: Money) {
        if !delta.is_zero() {
            self.push(WriteOp::ApplyBalanceDelta { account_id, delta });
        }
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// storage for accounts, statements and payments
pub trait BillingStore: Send + Sync {
    fn account(&self, id: AccountId) -> Result<Option<Account>>;

    fn statement(&self, id: StatementId) -> Result<Option<Statement>>;

    /// all statements of an account, newest cycle first
    fn statements_for_account(&self, account_id: AccountId) -> Result<Vec<Statement>>;

    fn statement_for_period(
        &self,
        account_id: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Statement>>;

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;

    /// all payments of an account, oldest first
    fn payments_for_account(&self, account_id: AccountId) -> Result<Vec<Payment>>;

    /// apply every op or none of them
    fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// latest statement closing on or before `date`
    fn prior_statement(&self, account_id: AccountId, date: NaiveDate) -> Result<Option<Statement>> {
        Ok(self
            .statements_for_account(account_id)?
            .into_iter()
            .filter(|s| s.bill_end_date <= date)
            .max_by_key(|s| s.bill_end_date))
    }

    fn payments_for_statement(&self, statement_id: StatementId) -> Result<Vec<Payment>> {
        let Some(statement) = self.statement(statement_id)? else {
            return Ok(Vec::new());
        };
        Ok(self
            .payments_for_account(statement.account_id)?
            .into_iter()
            .filter(|p| p.bill_id == Some(statement_id))
            .collect())
    }

    /// early payments dated inside `[start, end)`
    fn unattached_payments(
        &self,
        account_id: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Payment>> {
        Ok(self
            .payments_for_account(account_id)?
            .into_iter()
            .filter(|p| p.bill_id.is_none())
            .filter(|p| {
                let date = p.payment_date.date_naive();
                start <= date && date < end
            })
            .collect())
    }
}
