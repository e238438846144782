use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::cycle::BillingCycle;
use crate::decimal::Money;
use crate::types::{AccountId, StatementId, StatementStatus};

/// one billing cycle's bill for a credit-card account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    // identification
    pub id: StatementId,
    pub account_id: AccountId,

    // cycle window, [start, end)
    pub bill_start_date: NaiveDate,
    pub bill_end_date: NaiveDate,
    pub payment_due_date: NaiveDate,

    // amounts at close
    pub previous_balance: Money,
    pub new_charges: Money,
    /// payment-side ledger sums inside the window
    pub credits: Money,
    /// ledger corrections plus assessed interest and annual fee
    pub adjustments: Money,
    /// part of `adjustments`
    pub interest: Money,
    /// part of `adjustments`
    pub annual_fee: Money,
    pub total_amount: Money,
    pub minimum_payment: Money,

    // settlement
    /// sum of the payment records attached to this statement
    pub payments: Money,
    pub is_paid: bool,

    pub created_at: DateTime<Utc>,
    /// optimistic-lock counter, bumped on every committed update
    pub version: u64,
}

impl Statement {
    pub fn cycle(&self) -> BillingCycle {
        BillingCycle {
            period_start: self.bill_start_date,
            period_end: self.bill_end_date,
            due_date: self.payment_due_date,
        }
    }

    /// what is still owed on this statement, never negative
    pub fn remaining_amount(&self) -> Money {
        (self.total_amount - self.payments).non_negative()
    }

    /// payments beyond the total (credit balance left by an overpayment)
    pub fn overpaid_amount(&self) -> Money {
        (self.payments - self.total_amount).non_negative()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_paid && now.date_naive() > self.payment_due_date
    }

    /// days past the due date, 0 when not overdue
    pub fn days_overdue(&self, today: NaiveDate) -> u32 {
        if self.is_paid || today <= self.payment_due_date {
            return 0;
        }
        (today - self.payment_due_date).num_days() as u32
    }

    /// paid share of the total in `[0, 1]`, 0 for an empty statement
    pub fn payment_progress(&self) -> f64 {
        self.payments
            .ratio_of(self.total_amount)
            .and_then(|r| r.to_f64())
            .map(|p| p.clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    pub fn status(&self) -> StatementStatus {
        if self.remaining_amount().is_zero() {
            StatementStatus::Paid
        } else if self.payments.is_positive() {
            StatementStatus::PartiallyPaid
        } else {
            StatementStatus::Open
        }
    }

    /// re-derive the settlement flag after `payments` changed
    pub(crate) fn settle(&mut self) {
        self.is_paid = self.remaining_amount().is_zero();
    }
}
