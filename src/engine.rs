use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::account::Account;
use crate::config::BillingConfig;
use crate::cycle::{cycle_for, due_date_for, BillingCycle};
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::{Event, EventStore};
use crate::generator::{StatementGenerator, StatementInputs};
use crate::payments::{EarlyPaymentRequest, Payment, PaymentProcessor, PaymentRequest};
use crate::statement::Statement;
use crate::stats::PaymentStats;
use crate::store::{
    AccountLocks, BillingStore, InMemoryLedger, InMemoryStore, LedgerEntry, TransactionLedger, WriteBatch,
};
use crate::types::{AccountId, PaymentId, StatementId};
use crate::views::CardSummaryView;

/// reminder that a statement is coming due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueReminder {
    pub account_id: AccountId,
    pub statement_id: StatementId,
    pub due_date: NaiveDate,
    pub days_until_due: i64,
    pub remaining_amount: Money,
    pub minimum_payment: Money,
}

/// statement and payment engine over a store and a transaction ledger
pub struct BillingEngine<S: BillingStore, L: TransactionLedger> {
    config: BillingConfig,
    store: S,
    ledger: L,
    locks: AccountLocks,
    events: Mutex<EventStore>,
}

impl BillingEngine<InMemoryStore, InMemoryLedger> {
    /// engine over fresh in-memory adapters
    pub fn in_memory(config: BillingConfig) -> Result<Self> {
        Self::new(config, InMemoryStore::new(), InMemoryLedger::new())
    }
}

impl<S: BillingStore, L: TransactionLedger> BillingEngine<S, L> {
    pub fn new(config: BillingConfig, store: S, ledger: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            ledger,
            locks: AccountLocks::new(),
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn account(&self, account_id: AccountId) -> Result<Account> {
        self.store
            .account(account_id)?
            .ok_or(BillingError::AccountNotFound { id: account_id })
    }

    fn card(&self, account_id: AccountId) -> Result<Account> {
        let account = self.account(account_id)?;
        account.card_terms()?;
        Ok(account)
    }

    /// generate the statement for the cycle containing `reference`
    pub fn generate_bill_for_account(
        &self,
        account_id: AccountId,
        reference: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<Statement> {
        let card = self.card(account_id)?;
        let cycle = cycle_for(card.card_terms()?, reference)?;
        self.generate(account_id, cycle.period_start, cycle.period_end, time_provider)
    }

    /// generate the statement for `[start, end)`; the cycle must have closed
    pub fn generate(
        &self,
        account_id: AccountId,
        start: NaiveDate,
        end: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<Statement> {
        self.locks.with_account(account_id, || {
            let card = self.card(account_id)?;
            let terms = card.card_terms()?;

            let today = time_provider.now().date_naive();
            if end > today {
                warn!(%account_id, %start, %end, %today, "cycle has not closed");
                return Err(BillingError::InvalidDate {
                    message: format!("cycle {}..{} closes after {}", start, end, today),
                });
            }

            if self.store.statement_for_period(account_id, start, end)?.is_some() {
                warn!(%account_id, %start, %end, "statement already generated for cycle");
                return Err(BillingError::DuplicateCycle {
                    account_id,
                    start,
                    end,
                });
            }

            let cycle = BillingCycle {
                period_start: start,
                period_end: end,
                due_date: due_date_for(terms, end)?,
            };

            let history = self.store.statements_for_account(account_id)?;
            let prior = self.store.prior_statement(account_id, start)?;
            let prior = prior.as_ref();
            let totals = self.ledger.sum_transactions(account_id, start, end)?;
            let early_payments = self.store.unattached_payments(account_id, start, end)?;

            let generator = StatementGenerator::new(&self.config);
            let charges = generator.assess_charges(terms, &cycle, prior, &history, totals.charges)?;
            let plan = generator.plan(
                StatementInputs {
                    account_id,
                    cycle,
                    prior,
                    totals,
                    early_payments: &early_payments,
                    charges,
                },
                time_provider.now(),
            )?;

            if let Err(e) = self.store.commit(plan.to_batch()) {
                warn!(%account_id, %start, %end, error = %e, "statement commit rejected");
                return Err(e);
            }

            let statement = plan.statement.clone();
            info!(
                %account_id,
                statement_id = %statement.id,
                %start,
                %end,
                total = %statement.total_amount,
                minimum = %statement.minimum_payment,
                due = %statement.payment_due_date,
                attached_payments = plan.attached.len(),
                "statement generated"
            );

            self.events.lock().extend(plan.events(time_provider.now()));
            Ok(statement)
        })
    }

    /// all statements of an account, newest first
    pub fn bills_by_account(&self, account_id: AccountId) -> Result<Vec<Statement>> {
        self.store.statements_for_account(account_id)
    }

    /// the most recent statement, if any
    pub fn current_bill(&self, account_id: AccountId) -> Result<Option<Statement>> {
        Ok(self.store.statements_for_account(account_id)?.into_iter().next())
    }

    pub fn statement(&self, statement_id: StatementId) -> Result<Statement> {
        self.store
            .statement(statement_id)?
            .ok_or(BillingError::StatementNotFound { id: statement_id })
    }

    /// record a payment with system time
    pub fn record_payment_now(&self, request: PaymentRequest) -> Result<Payment> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.record_payment(request, &time)
    }

    /// apply a payment to a statement; every effect commits in one batch
    pub fn record_payment(&self, request: PaymentRequest, time_provider: &SafeTimeProvider) -> Result<Payment> {
        let account_id = self.statement(request.statement_id)?.account_id;
        let lock_ids = lock_set(account_id, request.from_account_id);

        self.locks.with_accounts(&lock_ids, || {
            // re-read under the lock
            let statement = self.statement(request.statement_id)?;
            self.ensure_latest(&statement)?;
            let card = self.card(account_id)?;
            let funding = self.funding_account(request.from_account_id)?;

            let processor = PaymentProcessor::new(&self.config);
            let plan = processor
                .apply(&request, &statement, &card, funding.as_ref(), time_provider.now())
                .map_err(|e| {
                    warn!(%account_id, statement_id = %statement.id, amount = %request.amount, error = %e, "payment rejected");
                    e
                })?;

            self.commit_logged(plan.to_batch(), "payment")?;

            let payment = plan.payment.clone();
            info!(
                %account_id,
                statement_id = %statement.id,
                payment_id = %payment.id,
                amount = %payment.amount,
                payment_type = ?payment.payment_type,
                on_time = payment.is_on_time,
                paid = plan.settled,
                "payment recorded"
            );

            self.events.lock().extend(plan.events(time_provider.now()));
            Ok(payment)
        })
    }

    /// record a payment before its statement exists; it is attached when the
    /// statement covering its date is generated
    pub fn record_early_payment(
        &self,
        request: EarlyPaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<Payment> {
        let account_id = request.account_id;
        let lock_ids = lock_set(account_id, request.from_account_id);

        self.locks.with_accounts(&lock_ids, || {
            let card = self.card(account_id)?;
            let funding = self.funding_account(request.from_account_id)?;

            let processor = PaymentProcessor::new(&self.config);
            let plan = processor
                .apply_early(&request, &card, funding.as_ref(), time_provider.now())
                .map_err(|e| {
                    warn!(%account_id, amount = %request.amount, error = %e, "early payment rejected");
                    e
                })?;

            self.commit_logged(plan.to_batch(), "early payment")?;

            let payment = plan.payment.clone();
            info!(%account_id, payment_id = %payment.id, amount = %payment.amount, "early payment recorded");

            self.events.lock().extend(plan.events(time_provider.now()));
            Ok(payment)
        })
    }

    /// reverse every effect of a recorded payment
    pub fn delete_payment(&self, payment_id: PaymentId, time_provider: &SafeTimeProvider) -> Result<Payment> {
        let payment = self.payment(payment_id)?;
        let lock_ids = lock_set(payment.account_id, payment.from_account_id);

        self.locks.with_accounts(&lock_ids, || {
            // a concurrent delete may have won
            let payment = self.payment(payment_id)?;
            let statement = match payment.bill_id {
                Some(id) => Some(self.statement(id)?),
                None => None,
            };
            if let Some(statement) = &statement {
                self.ensure_latest(statement)?;
            }

            let processor = PaymentProcessor::new(&self.config);
            let plan = processor.reverse(&payment, statement.as_ref())?;

            self.commit_logged(plan.to_batch(), "payment deletion")?;

            info!(
                account_id = %payment.account_id,
                %payment_id,
                amount = %payment.amount,
                reopened = plan.reopened,
                "payment deleted"
            );

            self.events.lock().extend(plan.events(time_provider.now()));
            Ok(payment)
        })
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<Payment> {
        self.store
            .payment(payment_id)?
            .ok_or(BillingError::PaymentNotFound { id: payment_id })
    }

    /// payments of an account, newest first
    pub fn payments_by_account(&self, account_id: AccountId) -> Result<Vec<Payment>> {
        let mut payments = self.store.payments_for_account(account_id)?;
        payments.reverse();
        Ok(payments)
    }

    pub fn payments_for_statement(&self, statement_id: StatementId) -> Result<Vec<Payment>> {
        self.store.payments_for_statement(statement_id)
    }

    pub fn payment_stats(&self, account_id: AccountId) -> Result<PaymentStats> {
        let payments = self.store.payments_for_account(account_id)?;
        let statements = self.store.statements_for_account(account_id)?;
        PaymentStats::from_history(&payments, &statements)
    }

    /// whether the current bill is unpaid and due within `days`
    pub fn is_due_within(&self, account_id: AccountId, days: u32, time_provider: &SafeTimeProvider) -> Result<bool> {
        let today = time_provider.now().date_naive();
        Ok(self
            .current_bill(account_id)?
            .filter(|s| !s.is_paid)
            .map(|s| (0..=days as i64).contains(&s.cycle().days_until_due(today)))
            .unwrap_or(false))
    }

    /// reminder for the current bill when today is one of the configured
    /// days before its due date
    pub fn due_reminder(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<Option<DueReminder>> {
        let today = time_provider.now().date_naive();
        let Some(bill) = self.current_bill(account_id)? else {
            return Ok(None);
        };
        if bill.is_paid {
            return Ok(None);
        }

        let days_until_due = bill.cycle().days_until_due(today);
        let fires = self
            .config
            .reminder_days
            .iter()
            .any(|d| *d as i64 == days_until_due);
        if !fires {
            return Ok(None);
        }

        debug!(%account_id, statement_id = %bill.id, days_until_due, "due reminder");
        Ok(Some(DueReminder {
            account_id,
            statement_id: bill.id,
            due_date: bill.payment_due_date,
            days_until_due,
            remaining_amount: bill.remaining_amount(),
            minimum_payment: bill.minimum_payment,
        }))
    }

    /// unpaid statements past their due date, newest first
    pub fn overdue_statements(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<Vec<Statement>> {
        let now = time_provider.now();
        Ok(self
            .store
            .statements_for_account(account_id)?
            .into_iter()
            .filter(|s| s.is_overdue(now))
            .collect())
    }

    /// apply a signed delta to an account balance under its lock
    pub fn apply_balance_delta(&self, account_id: AccountId, delta: Money) -> Result<Account> {
        self.locks.with_account(account_id, || {
            let mut batch = WriteBatch::new();
            batch.apply_balance_delta(account_id, delta);
            if !batch.is_empty() {
                self.commit_logged(batch, "balance delta")?;
            }
            self.account(account_id)
        })
    }

    /// post a ledger entry and move the account balance by its effect
    pub fn post_transaction(&self, entry: LedgerEntry) -> Result<Account> {
        let account_id = entry.account_id;
        self.locks.with_account(account_id, || {
            entry.validate()?;
            self.account(account_id)?;

            self.ledger.post(entry.clone())?;

            let mut batch = WriteBatch::new();
            batch.apply_balance_delta(account_id, entry.balance_effect());
            if let Err(e) = self.commit_logged(batch, "transaction") {
                if let Err(undo) = self.ledger.retract(entry.id) {
                    error!(%account_id, entry_id = %entry.id, error = %undo, "ledger entry left without balance effect");
                }
                return Err(e);
            }

            debug!(%account_id, kind = ?entry.kind, amount = %entry.amount, date = %entry.date, "transaction posted");
            self.account(account_id)
        })
    }

    /// balances, current bill and payment stats for one card
    pub fn card_summary(&self, account_id: AccountId, time_provider: &SafeTimeProvider) -> Result<CardSummaryView> {
        let card = self.card(account_id)?;
        let current = self.current_bill(account_id)?;
        let stats = self.payment_stats(account_id)?;
        Ok(CardSummaryView::new(&card, current.as_ref(), stats, time_provider.now()))
    }

    /// get and clear events
    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    /// a statement whose remainder was carried into a newer one is closed
    fn ensure_latest(&self, statement: &Statement) -> Result<()> {
        let newer = self
            .store
            .statements_for_account(statement.account_id)?
            .into_iter()
            .find(|s| s.bill_end_date > statement.bill_end_date);

        match newer {
            Some(newer) => {
                warn!(
                    account_id = %statement.account_id,
                    statement_id = %statement.id,
                    newer_id = %newer.id,
                    "statement superseded"
                );
                Err(BillingError::StatementSuperseded {
                    id: statement.id,
                    newer: newer.id,
                })
            }
            None => Ok(()),
        }
    }

    fn funding_account(&self, from: Option<AccountId>) -> Result<Option<Account>> {
        match from {
            Some(id) => self.store.account(id),
            None => Ok(None),
        }
    }

    fn commit_logged(&self, batch: WriteBatch, what: &str) -> Result<()> {
        let ops = batch.len();
        self.store.commit(batch).map_err(|e| {
            warn!(ops, error = %e, "{} commit rejected", what);
            e
        })
    }
}

fn lock_set(account_id: AccountId, from: Option<AccountId>) -> Vec<AccountId> {
    let mut ids = vec![account_id];
    ids.extend(from);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{AccountKind, PaymentType, StatementStatus};
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::thread;

    /// store whose writes always fail
    struct RejectingStore(InMemoryStore);

    impl BillingStore for RejectingStore {
        fn account(&self, id: AccountId) -> Result<Option<Account>> {
            self.0.account(id)
        }

        fn statement(&self, id: StatementId) -> Result<Option<Statement>> {
            self.0.statement(id)
        }

        fn statements_for_account(&self, account_id: AccountId) -> Result<Vec<Statement>> {
            self.0.statements_for_account(account_id)
        }

        fn statement_for_period(
            &self,
            account_id: AccountId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Option<Statement>> {
            self.0.statement_for_period(account_id, start, end)
        }

        fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
            self.0.payment(id)
        }

        fn payments_for_account(&self, account_id: AccountId) -> Result<Vec<Payment>> {
            self.0.payments_for_account(account_id)
        }

        fn commit(&self, _batch: WriteBatch) -> Result<()> {
            Err(BillingError::Storage {
                message: "disk full".to_string(),
            })
        }
    }

    /// ledger that refuses every posting
    struct FailingLedger;

    impl TransactionLedger for FailingLedger {
        fn sum_transactions(&self, _: AccountId, _: NaiveDate, _: NaiveDate) -> Result<crate::store::CycleTotals> {
            Ok(Default::default())
        }

        fn post(&self, _entry: LedgerEntry) -> Result<()> {
            Err(BillingError::Storage {
                message: "ledger unavailable".to_string(),
            })
        }

        fn retract(&self, _entry_id: uuid::Uuid) -> Result<()> {
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()))
    }

    struct Fixture {
        engine: BillingEngine<InMemoryStore, InMemoryLedger>,
        card: AccountId,
        checking: AccountId,
    }

    fn fixture(config: BillingConfig) -> Fixture {
        let card = Account::builder()
            .credit_limit(Money::from_major(50_000))
            .billing_day(5)
            .grace_period_days(3)
            .daily_interest_rate(Rate::from_percent_decimal(dec!(0.05)))
            .opened_on(date(2023, 6, 1))
            .build()
            .unwrap();
        let checking = Account::funding("checking", AccountKind::Checking, Money::from_cents(20_000));

        let store = InMemoryStore::with_accounts([card.clone(), checking.clone()]);
        let engine = BillingEngine::new(config, store, InMemoryLedger::new()).unwrap();
        Fixture {
            engine,
            card: card.id,
            checking: checking.id,
        }
    }

    fn charge(f: &Fixture, cents: i64, on: NaiveDate) {
        f.engine
            .post_transaction(LedgerEntry::charge(f.card, Money::from_cents(cents), on, "purchase"))
            .unwrap();
    }

    /// one statement for 2024-02-05..2024-03-05 with 10000 of charges
    fn february_bill(f: &Fixture) -> Statement {
        charge(f, 10_000, date(2024, 2, 20));
        f.engine
            .generate_bill_for_account(f.card, date(2024, 3, 5), &clock(2024, 3, 5))
            .unwrap()
    }

    #[test]
    fn test_generated_statement_amounts() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);

        assert_eq!(bill.bill_start_date, date(2024, 2, 5));
        assert_eq!(bill.bill_end_date, date(2024, 3, 5));
        assert_eq!(bill.total_amount, Money::from_cents(10_000));
        assert_eq!(bill.minimum_payment, Money::from_cents(1_000));
        assert_eq!(bill.payment_due_date, date(2024, 3, 8));
        assert!(!bill.is_paid);

        let events = f.engine.take_events();
        assert!(events.iter().any(|e| matches!(e, Event::StatementGenerated { .. })));
    }

    #[test]
    fn test_duplicate_cycle() {
        let f = fixture(BillingConfig::standard());
        february_bill(&f);

        let again = f
            .engine
            .generate(f.card, date(2024, 2, 5), date(2024, 3, 5), &clock(2024, 3, 6));
        assert!(matches!(again, Err(BillingError::DuplicateCycle { .. })));
        assert_eq!(f.engine.bills_by_account(f.card).unwrap().len(), 1);
    }

    #[test]
    fn test_minimum_then_full_then_delete() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        let time = clock(2024, 3, 6);

        let minimum = f
            .engine
            .record_payment(PaymentRequest::new(bill.id, Money::from_cents(1_000)), &time)
            .unwrap();
        assert_eq!(minimum.payment_type, PaymentType::Minimum);
        let after_min = f.engine.statement(bill.id).unwrap();
        assert!(!after_min.is_paid);
        assert_eq!(after_min.remaining_amount(), Money::from_cents(9_000));

        f.engine.delete_payment(minimum.id, &time).unwrap();

        let full = f
            .engine
            .record_payment(PaymentRequest::new(bill.id, Money::from_cents(10_000)), &time)
            .unwrap();
        assert_eq!(full.payment_type, PaymentType::Full);
        let paid = f.engine.statement(bill.id).unwrap();
        assert!(paid.is_paid);
        assert_eq!(paid.status(), StatementStatus::Paid);
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::ZERO);

        f.engine.delete_payment(full.id, &time).unwrap();
        let reverted = f.engine.statement(bill.id).unwrap();
        assert!(!reverted.is_paid);
        assert_eq!(reverted.payments, Money::ZERO);
        assert_eq!(reverted.remaining_amount(), Money::from_cents(10_000));
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::from_cents(-10_000));

        assert!(matches!(
            f.engine.delete_payment(full.id, &time),
            Err(BillingError::PaymentNotFound { .. })
        ));

        let events = f.engine.take_events();
        assert!(events.iter().any(|e| matches!(e, Event::StatementReopened { .. })));
    }

    #[test]
    fn test_funded_payment_moves_both_balances() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        let time = clock(2024, 3, 6);

        let request = PaymentRequest::new(bill.id, Money::from_cents(4_000)).from_account(f.checking);
        let payment = f.engine.record_payment(request, &time).unwrap();

        assert_eq!(f.engine.account(f.checking).unwrap().balance, Money::from_cents(16_000));
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::from_cents(-6_000));

        f.engine.delete_payment(payment.id, &time).unwrap();
        assert_eq!(f.engine.account(f.checking).unwrap().balance, Money::from_cents(20_000));
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::from_cents(-10_000));
    }

    #[test]
    fn test_failed_transfer_leaves_no_trace() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        f.engine.apply_balance_delta(f.checking, Money::from_cents(-19_000)).unwrap();

        let request = PaymentRequest::new(bill.id, Money::from_cents(5_000)).from_account(f.checking);
        let result = f.engine.record_payment(request, &clock(2024, 3, 6));
        assert!(matches!(result, Err(BillingError::TransferFailed { .. })));

        let unchanged = f.engine.statement(bill.id).unwrap();
        assert_eq!(unchanged.payments, Money::ZERO);
        assert_eq!(unchanged.version, bill.version);
        assert!(f.engine.payments_by_account(f.card).unwrap().is_empty());
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::from_cents(-10_000));
        assert_eq!(f.engine.account(f.checking).unwrap().balance, Money::from_cents(1_000));
    }

    #[test]
    fn test_unknown_statement_and_bad_amount() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        let time = clock(2024, 3, 6);

        assert!(matches!(
            f.engine.record_payment(PaymentRequest::new(uuid::Uuid::new_v4(), Money::from_cents(100)), &time),
            Err(BillingError::StatementNotFound { .. })
        ));
        assert!(matches!(
            f.engine.record_payment(PaymentRequest::new(bill.id, Money::ZERO), &time),
            Err(BillingError::InvalidAmount { .. })
        ));
        assert!(matches!(
            f.engine.record_payment(PaymentRequest::new(bill.id, Money::from_cents(10_001)), &time),
            Err(BillingError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_late_payment_not_on_time() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        let payment = f
            .engine
            .record_payment(PaymentRequest::new(bill.id, Money::from_cents(500)), &clock(2024, 3, 9))
            .unwrap();
        assert!(!payment.is_on_time);
        assert_eq!(payment.payment_type, PaymentType::Custom);
    }

    #[test]
    fn test_zero_history_stats() {
        let f = fixture(BillingConfig::standard());
        let stats = f.engine.payment_stats(f.card).unwrap();
        assert_eq!(stats.payment_count, 0);
        assert_eq!(stats.on_time_payment_rate, 0.0);
        assert_eq!(stats.average_processing_days, 0.0);
    }

    #[test]
    fn test_stats_after_payments() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        f.engine
            .record_payment(PaymentRequest::new(bill.id, Money::from_cents(1_000)), &clock(2024, 3, 7))
            .unwrap();
        f.engine
            .record_payment(PaymentRequest::new(bill.id, Money::from_cents(9_000)), &clock(2024, 3, 10))
            .unwrap();

        let stats = f.engine.payment_stats(f.card).unwrap();
        assert_eq!(stats.payment_count, 2);
        assert_eq!(stats.on_time_count, 1);
        assert_eq!(stats.on_time_payment_rate, 50.0);
        assert_eq!(stats.total_payments, Money::from_cents(10_000));
        assert_eq!(stats.average_processing_days, 3.5);

        let newest_first = f.engine.payments_by_account(f.card).unwrap();
        assert_eq!(newest_first[0].amount, Money::from_cents(9_000));
    }

    #[test]
    fn test_interest_carried_to_next_statement() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        charge(&f, 2_000, date(2024, 3, 15));

        let next = f
            .engine
            .generate_bill_for_account(f.card, date(2024, 4, 5), &clock(2024, 4, 5))
            .unwrap();

        // 10000 unpaid, due 03-08, 28 days to 04-05 at 0.05% per day
        assert_eq!(next.previous_balance, Money::from_cents(10_000));
        assert_eq!(next.interest, Money::from_cents(140));
        assert_eq!(next.total_amount, Money::from_cents(12_140));
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::from_cents(-12_140));

        // the overdue statement itself is untouched
        assert_eq!(f.engine.statement(bill.id).unwrap(), bill);
    }

    #[test]
    fn test_annual_fee_charged_and_waived() {
        let config = BillingConfig::standard();
        let card = Account::builder()
            .credit_limit(Money::from_major(50_000))
            .billing_day(5)
            .annual_fee(Money::from_cents(5_000), Money::from_cents(50_000))
            .opened_on(date(2023, 2, 20))
            .build()
            .unwrap();
        let waived_card = Account::builder()
            .credit_limit(Money::from_major(50_000))
            .billing_day(5)
            .annual_fee(Money::from_cents(5_000), Money::from_cents(50_000))
            .opened_on(date(2023, 2, 20))
            .build()
            .unwrap();
        let store = InMemoryStore::with_accounts([card.clone(), waived_card.clone()]);
        let engine = BillingEngine::new(config, store, InMemoryLedger::new()).unwrap();

        engine
            .post_transaction(LedgerEntry::charge(card.id, Money::from_cents(10_000), date(2024, 2, 21), "small"))
            .unwrap();
        engine
            .post_transaction(LedgerEntry::charge(waived_card.id, Money::from_cents(60_000), date(2024, 2, 21), "big"))
            .unwrap();

        let time = clock(2024, 3, 5);
        let charged = engine.generate_bill_for_account(card.id, date(2024, 3, 5), &time).unwrap();
        let waived = engine.generate_bill_for_account(waived_card.id, date(2024, 3, 5), &time).unwrap();

        assert_eq!(charged.annual_fee, Money::from_cents(5_000));
        assert_eq!(charged.total_amount, Money::from_cents(15_000));
        assert_eq!(waived.annual_fee, Money::ZERO);
        assert_eq!(waived.total_amount, Money::from_cents(60_000));

        let events = engine.take_events();
        assert!(events.iter().any(|e| matches!(e, Event::AnnualFeeCharged { .. })));
        assert!(events.iter().any(|e| matches!(e, Event::AnnualFeeWaived { .. })));
    }

    #[test]
    fn test_early_payment_attached_at_generation() {
        let f = fixture(BillingConfig::standard());
        charge(&f, 10_000, date(2024, 2, 20));

        let early = f
            .engine
            .record_early_payment(
                EarlyPaymentRequest::new(f.card, Money::from_cents(3_000)).from_account(f.checking),
                &clock(2024, 2, 25),
            )
            .unwrap();
        assert!(early.bill_id.is_none());
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::from_cents(-7_000));

        let bill = f
            .engine
            .generate_bill_for_account(f.card, date(2024, 3, 5), &clock(2024, 3, 5))
            .unwrap();
        assert_eq!(bill.total_amount, Money::from_cents(10_000));
        assert_eq!(bill.payments, Money::from_cents(3_000));
        assert_eq!(bill.remaining_amount(), Money::from_cents(7_000));

        let attached = f.engine.payment(early.id).unwrap();
        assert_eq!(attached.bill_id, Some(bill.id));

        // deleting the early payment reopens the full amount
        f.engine.delete_payment(early.id, &clock(2024, 3, 6)).unwrap();
        assert_eq!(f.engine.statement(bill.id).unwrap().remaining_amount(), Money::from_cents(10_000));
        assert_eq!(f.engine.account(f.checking).unwrap().balance, Money::from_cents(20_000));
    }

    #[test]
    fn test_due_reminders_and_overdue() {
        let f = fixture(BillingConfig::standard());
        february_bill(&f);
        let time = clock(2024, 3, 4);
        let control = time.test_control().unwrap();

        // due 2024-03-08
        control.advance(Duration::days(1));
        let reminder = f.engine.due_reminder(f.card, &time).unwrap().unwrap();
        assert_eq!(reminder.days_until_due, 3);
        assert!(f.engine.is_due_within(f.card, 3, &time).unwrap());
        assert!(!f.engine.is_due_within(f.card, 2, &time).unwrap());

        control.advance(Duration::days(1));
        assert!(f.engine.due_reminder(f.card, &time).unwrap().is_none());

        control.advance(Duration::days(2));
        assert_eq!(f.engine.due_reminder(f.card, &time).unwrap().unwrap().days_until_due, 0);
        assert!(f.engine.overdue_statements(f.card, &time).unwrap().is_empty());

        control.advance(Duration::days(1));
        assert_eq!(f.engine.overdue_statements(f.card, &time).unwrap().len(), 1);
        assert!(!f.engine.is_due_within(f.card, 3, &time).unwrap());
    }

    #[test]
    fn test_not_a_credit_card() {
        let f = fixture(BillingConfig::standard());
        assert!(matches!(
            f.engine.generate_bill_for_account(f.checking, date(2024, 3, 5), &clock(2024, 3, 5)),
            Err(BillingError::NotACreditCard { .. })
        ));
        assert!(matches!(
            f.engine.generate_bill_for_account(uuid::Uuid::new_v4(), date(2024, 3, 5), &clock(2024, 3, 5)),
            Err(BillingError::AccountNotFound { .. })
        ));
    }

    #[test]
    fn test_concurrent_payments_reconcile() {
        let f = fixture(BillingConfig::standard());
        let statement_id = february_bill(&f).id;
        let engine = Arc::new(f.engine);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let time = clock(2024, 3, 6);
                    for _ in 0..10 {
                        engine
                            .record_payment(PaymentRequest::new(statement_id, Money::from_cents(100)), &time)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let statement = engine.statement(statement_id).unwrap();
        let attached: Money = engine
            .payments_for_statement(statement_id)
            .unwrap()
            .iter()
            .map(|p| p.amount)
            .sum();
        assert_eq!(statement.payments, Money::from_cents(4_000));
        assert_eq!(attached, statement.payments);
        assert_eq!(statement.version, 40);
    }

    #[test]
    fn test_carried_statement_rejects_payments_and_deletes() {
        let f = fixture(BillingConfig::standard());
        let bill = february_bill(&f);
        let minimum = f
            .engine
            .record_payment(PaymentRequest::new(bill.id, Money::from_cents(1_000)), &clock(2024, 3, 6))
            .unwrap();

        let next = f
            .engine
            .generate_bill_for_account(f.card, date(2024, 4, 5), &clock(2024, 4, 5))
            .unwrap();
        let time = clock(2024, 4, 6);

        assert!(matches!(
            f.engine.record_payment(PaymentRequest::new(bill.id, Money::from_cents(9_000)), &time),
            Err(BillingError::StatementSuperseded { newer, .. }) if newer == next.id
        ));
        assert!(matches!(
            f.engine.delete_payment(minimum.id, &time),
            Err(BillingError::StatementSuperseded { .. })
        ));

        let debt = f.engine.account(f.card).unwrap().debt();
        assert_eq!(next.remaining_amount(), debt);

        f.engine
            .record_payment(PaymentRequest::new(next.id, next.remaining_amount()), &time)
            .unwrap();
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::ZERO);
    }

    #[test]
    fn test_open_cycle_cannot_be_generated() {
        let f = fixture(BillingConfig::standard());
        charge(&f, 10_000, date(2024, 2, 20));

        assert!(matches!(
            f.engine.generate(f.card, date(2024, 2, 5), date(2024, 3, 5), &clock(2024, 3, 1)),
            Err(BillingError::InvalidDate { .. })
        ));
        assert!(matches!(
            f.engine.generate_bill_for_account(f.card, date(2024, 3, 5), &clock(2024, 3, 4)),
            Err(BillingError::InvalidDate { .. })
        ));
        assert!(f.engine.bills_by_account(f.card).unwrap().is_empty());
        assert_eq!(f.engine.account(f.card).unwrap().balance, Money::from_cents(-10_000));

        // later charges and early payments inside the window still land
        charge(&f, 5_000, date(2024, 3, 2));
        f.engine
            .record_early_payment(EarlyPaymentRequest::new(f.card, Money::from_cents(2_000)), &clock(2024, 3, 3))
            .unwrap();

        let bill = f
            .engine
            .generate_bill_for_account(f.card, date(2024, 3, 5), &clock(2024, 3, 5))
            .unwrap();
        assert_eq!(bill.new_charges, Money::from_cents(15_000));
        assert_eq!(bill.payments, Money::from_cents(2_000));
        assert_eq!(bill.remaining_amount(), f.engine.account(f.card).unwrap().debt());
    }

    #[test]
    fn test_concurrent_generation_yields_one_statement() {
        let f = fixture(BillingConfig::standard());
        charge(&f, 10_000, date(2024, 2, 20));
        let card = f.card;
        let engine = Arc::new(f.engine);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.generate_bill_for_account(card, date(2024, 3, 5), &clock(2024, 3, 5)))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(BillingError::DuplicateCycle { .. }))));
        assert_eq!(engine.bills_by_account(card).unwrap().len(), 1);
        assert_eq!(engine.account(card).unwrap().balance, Money::from_cents(-10_000));
    }

    #[test]
    fn test_failed_ledger_post_leaves_balance() {
        let card = Account::builder()
            .credit_limit(Money::from_major(50_000))
            .billing_day(5)
            .opened_on(date(2023, 6, 1))
            .build()
            .unwrap();
        let engine = BillingEngine::new(
            BillingConfig::standard(),
            InMemoryStore::with_accounts([card.clone()]),
            FailingLedger,
        )
        .unwrap();

        let result = engine.post_transaction(LedgerEntry::charge(card.id, Money::from_cents(700), date(2024, 2, 20), "x"));
        assert!(matches!(result, Err(BillingError::Storage { .. })));
        assert_eq!(engine.account(card.id).unwrap().balance, Money::ZERO);
    }

    #[test]
    fn test_failed_balance_commit_retracts_ledger_entry() {
        let card = Account::builder()
            .credit_limit(Money::from_major(50_000))
            .billing_day(5)
            .opened_on(date(2023, 6, 1))
            .build()
            .unwrap();
        let engine = BillingEngine::new(
            BillingConfig::standard(),
            RejectingStore(InMemoryStore::with_accounts([card.clone()])),
            InMemoryLedger::new(),
        )
        .unwrap();

        let result = engine.post_transaction(LedgerEntry::charge(card.id, Money::from_cents(700), date(2024, 2, 20), "x"));
        assert!(matches!(result, Err(BillingError::Storage { .. })));
        assert!(engine.ledger().entries_for_account(card.id).is_empty());
        assert_eq!(engine.account(card.id).unwrap().balance, Money::ZERO);
    }

    #[test]
    fn test_card_summary_json() {
        let f = fixture(BillingConfig::standard());
        february_bill(&f);
        let summary = f.engine.card_summary(f.card, &clock(2024, 3, 6)).unwrap();
        assert_eq!(summary.debt, Money::from_cents(10_000));
        assert!(summary.current_bill.is_some());
        assert!(summary.to_json_pretty().unwrap().contains("\"minimum_payment\": 1000"));
    }
}
