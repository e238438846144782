use chrono::{DateTime, Utc};

use crate::account::Account;
use crate::config::BillingConfig;
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::Event;
use crate::statement::Statement;
use crate::store::WriteBatch;
use crate::types::{AccountId, OverpaymentPolicy, PaymentType};

use super::{classify, is_on_time, new_payment_id, EarlyPaymentRequest, Payment, PaymentRequest};

/// planned effects of one payment; nothing is written until the batch commits
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentApplication {
    pub payment: Payment,
    /// updated statement and the version it was read at
    pub statement: Option<(Statement, u64)>,
    pub card_delta: Money,
    pub funding: Option<(AccountId, Money)>,
    /// the statement moved to paid with this payment
    pub settled: bool,
}

impl PaymentApplication {
    pub fn to_batch(&self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.insert_payment(self.payment.clone());
        if let Some((statement, expected_version)) = &self.statement {
            batch.update_statement(statement.clone(), *expected_version);
        }
        batch.apply_balance_delta(self.payment.account_id, self.card_delta);
        if let Some((funding_id, delta)) = self.funding {
            batch.apply_balance_delta(funding_id, delta);
        }
        batch
    }

    pub fn events(&self, timestamp: DateTime<Utc>) -> Vec<Event> {
        let payment = &self.payment;
        let mut events = vec![Event::PaymentApplied {
            payment_id: payment.id,
            statement_id: payment.bill_id,
            account_id: payment.account_id,
            amount: payment.amount,
            payment_type: payment.payment_type,
            is_on_time: payment.is_on_time,
            timestamp,
        }];

        if let Some(from_account_id) = payment.from_account_id {
            events.push(Event::FundsTransferred {
                from_account_id,
                to_account_id: payment.account_id,
                amount: payment.amount,
                timestamp,
            });
        }

        if let (true, Some((statement, _))) = (self.settled, &self.statement) {
            events.push(Event::StatementSettled {
                statement_id: statement.id,
                timestamp,
            });
        }

        events
    }
}

/// planned effects of deleting a payment, the exact inverse of its application
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReversal {
    pub payment: Payment,
    pub statement: Option<(Statement, u64)>,
    pub card_delta: Money,
    pub funding: Option<(AccountId, Money)>,
    /// the statement left the paid state
    pub reopened: bool,
}

impl PaymentReversal {
    pub fn to_batch(&self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.delete_payment(self.payment.id);
        if let Some((statement, expected_version)) = &self.statement {
            batch.update_statement(statement.clone(), *expected_version);
        }
        batch.apply_balance_delta(self.payment.account_id, self.card_delta);
        if let Some((funding_id, delta)) = self.funding {
            batch.apply_balance_delta(funding_id, delta);
        }
        batch
    }

    pub fn events(&self, timestamp: DateTime<Utc>) -> Vec<Event> {
        let payment = &self.payment;
        let mut events = vec![Event::PaymentReversed {
            payment_id: payment.id,
            statement_id: payment.bill_id,
            account_id: payment.account_id,
            amount: payment.amount,
            timestamp,
        }];

        if let Some(from_account_id) = payment.from_account_id {
            events.push(Event::TransferReversed {
                from_account_id,
                to_account_id: payment.account_id,
                amount: payment.amount,
                timestamp,
            });
        }

        if let (true, Some((statement, _))) = (self.reopened, &self.statement) {
            events.push(Event::StatementReopened {
                statement_id: statement.id,
                remaining_amount: statement.remaining_amount(),
                timestamp,
            });
        }

        events
    }
}

/// validates payments and plans their effects against a snapshot of the
/// statement and accounts
pub struct PaymentProcessor<'a> {
    config: &'a BillingConfig,
}

impl<'a> PaymentProcessor<'a> {
    pub fn new(config: &'a BillingConfig) -> Self {
        Self { config }
    }

    /// plan a payment against `statement`
    pub fn apply(
        &self,
        request: &PaymentRequest,
        statement: &Statement,
        card: &Account,
        funding: Option<&Account>,
        payment_date: DateTime<Utc>,
    ) -> Result<PaymentApplication> {
        card.card_terms()?;
        if statement.account_id != card.id {
            return Err(BillingError::StatementNotFound { id: statement.id });
        }

        let amount = request.amount;
        validate_positive(amount)?;

        let remaining = statement.remaining_amount();
        if amount > remaining && !self.overpay_allowed(request.allow_overpay) {
            return Err(BillingError::InvalidAmount {
                amount,
                reason: format!("exceeds remaining amount {}", remaining),
            });
        }

        let funding = self.plan_funding(request.from_account_id, card, funding, amount)?;

        let mut updated = statement.clone();
        updated.payments = updated
            .payments
            .checked_add(amount)
            .ok_or_else(|| BillingError::overflow("statement payments"))?;
        updated.settle();
        updated.version = statement.version + 1;

        let payment = Payment {
            id: new_payment_id(),
            bill_id: Some(statement.id),
            account_id: card.id,
            amount,
            payment_type: classify(amount, statement),
            payment_date,
            due_amount: statement.total_amount,
            is_on_time: is_on_time(payment_date, statement),
            from_account_id: request.from_account_id,
            note: request.note.clone(),
        };

        Ok(PaymentApplication {
            payment,
            settled: !statement.is_paid && updated.is_paid,
            statement: Some((updated, statement.version)),
            card_delta: amount,
            funding,
        })
    }

    /// plan a payment made before its statement exists; it is bounded by the
    /// card's current debt instead of a statement remaining amount
    pub fn apply_early(
        &self,
        request: &EarlyPaymentRequest,
        card: &Account,
        funding: Option<&Account>,
        payment_date: DateTime<Utc>,
    ) -> Result<PaymentApplication> {
        card.card_terms()?;

        let amount = request.amount;
        validate_positive(amount)?;

        let debt = card.debt();
        if amount > debt && !self.overpay_allowed(request.allow_overpay) {
            return Err(BillingError::InvalidAmount {
                amount,
                reason: format!("exceeds outstanding debt {}", debt),
            });
        }

        let funding = self.plan_funding(request.from_account_id, card, funding, amount)?;

        let payment_type = if amount >= debt {
            PaymentType::Full
        } else {
            PaymentType::Custom
        };

        let payment = Payment {
            id: new_payment_id(),
            bill_id: None,
            account_id: card.id,
            amount,
            payment_type,
            payment_date,
            due_amount: debt,
            // no due date exists yet
            is_on_time: true,
            from_account_id: request.from_account_id,
            note: request.note.clone(),
        };

        Ok(PaymentApplication {
            payment,
            statement: None,
            card_delta: amount,
            funding,
            settled: false,
        })
    }

    /// plan the reversal of a recorded payment; `statement` is the one the
    /// payment is attached to, if any
    pub fn reverse(&self, payment: &Payment, statement: Option<&Statement>) -> Result<PaymentReversal> {
        let statement = match (payment.bill_id, statement) {
            (Some(bill_id), Some(statement)) if statement.id == bill_id => Some(statement),
            (Some(bill_id), _) => return Err(BillingError::StatementNotFound { id: bill_id }),
            (None, _) => None,
        };

        let mut reopened = false;
        let planned = match statement {
            Some(statement) => {
                let payments = statement
                    .payments
                    .checked_sub(payment.amount)
                    .filter(|p| !p.is_negative())
                    .ok_or_else(|| BillingError::CalculationError {
                        message: format!(
                            "statement {} payments {} below reversed amount {}",
                            statement.id, statement.payments, payment.amount
                        ),
                    })?;

                let mut updated = statement.clone();
                updated.payments = payments;
                updated.settle();
                updated.version = statement.version + 1;
                reopened = statement.is_paid && !updated.is_paid;
                Some((updated, statement.version))
            }
            None => None,
        };

        Ok(PaymentReversal {
            payment: payment.clone(),
            statement: planned,
            card_delta: -payment.amount,
            funding: payment.from_account_id.map(|id| (id, payment.amount)),
            reopened,
        })
    }

    fn overpay_allowed(&self, requested: bool) -> bool {
        requested || self.config.overpayment == OverpaymentPolicy::AllowCredit
    }

    fn plan_funding(
        &self,
        from_account_id: Option<AccountId>,
        card: &Account,
        funding: Option<&Account>,
        amount: Money,
    ) -> Result<Option<(AccountId, Money)>> {
        let Some(from) = from_account_id else {
            return Ok(None);
        };

        if from == card.id {
            return Err(BillingError::TransferFailed {
                from,
                reason: "cannot pay a card from itself".to_string(),
            });
        }

        let account = funding
            .filter(|a| a.id == from)
            .ok_or_else(|| BillingError::TransferFailed {
                from,
                reason: "funding account not found".to_string(),
            })?;

        if !account.can_fund(amount, self.config.allow_funding_overdraft) {
            return Err(BillingError::TransferFailed {
                from,
                reason: format!("insufficient funds for {}", amount),
            });
        }

        Ok(Some((from, -amount)))
    }
}

fn validate_positive(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(BillingError::InvalidAmount {
            amount,
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}
