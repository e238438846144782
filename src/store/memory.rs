use std::collections::HashMap;

use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::account::Account;
use crate::errors::{BillingError, Result};
use crate::payments::Payment;
use crate::statement::Statement;
use crate::types::{AccountId, PaymentId, StatementId};

use super::{BillingStore, WriteBatch, WriteOp};

type CycleKey = (AccountId, NaiveDate, NaiveDate);

#[derive(Debug, Clone, Default)]
struct StoreState {
    accounts: HashMap<AccountId, Account>,
    statements: HashMap<StatementId, Statement>,
    cycles: HashMap<CycleKey, StatementId>,
    payments: HashMap<PaymentId, Payment>,
}

impl StoreState {
    fn apply(&mut self, op: WriteOp) -> Result<()> {
        match op {
            WriteOp::InsertStatement(statement) => {
                let key = (statement.account_id, statement.bill_start_date, statement.bill_end_date);
                if self.cycles.contains_key(&key) {
                    return Err(BillingError::DuplicateCycle {
                        account_id: key.0,
                        start: key.1,
                        end: key.2,
                    });
                }
                if self.statements.contains_key(&statement.id) {
                    return Err(BillingError::Storage {
                        message: format!("statement id {} already stored", statement.id),
                    });
                }
                self.cycles.insert(key, statement.id);
                self.statements.insert(statement.id, statement);
            }

            WriteOp::UpdateStatement {
                statement,
                expected_version,
            } => {
                let stored = self
                    .statements
                    .get_mut(&statement.id)
                    .ok_or(BillingError::StatementNotFound { id: statement.id })?;
                if stored.version != expected_version {
                    return Err(BillingError::ConcurrentModification { id: statement.id });
                }
                *stored = Statement {
                    version: expected_version + 1,
                    ..statement
                };
            }

            WriteOp::InsertPayment(payment) => {
                if self.payments.contains_key(&payment.id) {
                    return Err(BillingError::Storage {
                        message: format!("payment id {} already stored", payment.id),
                    });
                }
                self.payments.insert(payment.id, payment);
            }

            WriteOp::UpdatePayment(payment) => {
                let stored = self
                    .payments
                    .get_mut(&payment.id)
                    .ok_or(BillingError::PaymentNotFound { id: payment.id })?;
                *stored = payment;
            }

            WriteOp::DeletePayment(id) => {
                self.payments
                    .remove(&id)
                    .ok_or(BillingError::PaymentNotFound { id })?;
            }

            WriteOp::ApplyBalanceDelta { account_id, delta } => {
                let account = self
                    .accounts
                    .get_mut(&account_id)
                    .ok_or(BillingError::AccountNotFound { id: account_id })?;
                account.balance = account
                    .balance
                    .checked_add(delta)
                    .ok_or_else(|| BillingError::overflow("account balance"))?;
            }
        }
        Ok(())
    }
}

/// in-memory store; a commit applies the batch to a copy of the state and
/// swaps it in only when every op succeeded
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// register or replace an account
    pub fn put_account(&self, account: Account) {
        self.state.write().accounts.insert(account.id, account);
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        for account in accounts {
            store.put_account(account);
        }
        store
    }

    pub fn statement_count(&self) -> usize {
        self.state.read().statements.len()
    }

    pub fn payment_count(&self) -> usize {
        self.state.read().payments.len()
    }
}

impl BillingStore for InMemoryStore {
    fn account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.state.read().accounts.get(&id).cloned())
    }

    fn statement(&self, id: StatementId) -> Result<Option<Statement>> {
        Ok(self.state.read().statements.get(&id).cloned())
    }

    fn statements_for_account(&self, account_id: AccountId) -> Result<Vec<Statement>> {
        let mut statements: Vec<Statement> = self
            .state
            .read()
            .statements
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        statements.sort_by(|a, b| b.bill_start_date.cmp(&a.bill_start_date));
        Ok(statements)
    }

    fn statement_for_period(
        &self,
        account_id: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Statement>> {
        let state = self.state.read();
        Ok(state
            .cycles
            .get(&(account_id, start, end))
            .and_then(|id| state.statements.get(id))
            .cloned())
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.state.read().payments.get(&id).cloned())
    }

    fn payments_for_account(&self, account_id: AccountId) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .state
            .read()
            .payments
            .values()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.payment_date, p.id));
        Ok(payments)
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut state = self.state.write();
        let mut next = state.clone();
        for op in batch {
            next.apply(op)?;
        }
        *state = next;
        Ok(())
    }
}
