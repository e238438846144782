//! Serializable read views over statements, payments and cards
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::decimal::{Money, Rate};
use crate::payments::Payment;
use crate::statement::Statement;
use crate::stats::PaymentStats;
use crate::types::{AccountId, PaymentId, PaymentType, StatementId, StatementStatus};

/// statement as shown to a cardholder at a point in time
#[derive(Debug, Serialize, Deserialize)]
pub struct StatementView {
    pub id: StatementId,
    pub account_id: AccountId,
    pub period: PeriodView,
    pub amounts: AmountsView,
    pub status: StatementStatus,
    pub is_paid: bool,
    pub is_overdue: bool,
    pub days_overdue: u32,
    pub payment_progress: f64,
    pub version: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodView {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub payment_due_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountsView {
    pub previous_balance: Money,
    pub new_charges: Money,
    pub credits: Money,
    pub adjustments: Money,
    pub interest: Money,
    pub annual_fee: Money,
    pub total_amount: Money,
    pub minimum_payment: Money,
    pub payments: Money,
    pub remaining_amount: Money,
}

impl StatementView {
    pub fn from_statement(statement: &Statement, now: DateTime<Utc>) -> Self {
        StatementView {
            id: statement.id,
            account_id: statement.account_id,
            period: PeriodView {
                start: statement.bill_start_date,
                end: statement.bill_end_date,
                payment_due_date: statement.payment_due_date,
            },
            amounts: AmountsView {
                previous_balance: statement.previous_balance,
                new_charges: statement.new_charges,
                credits: statement.credits,
                adjustments: statement.adjustments,
                interest: statement.interest,
                annual_fee: statement.annual_fee,
                total_amount: statement.total_amount,
                minimum_payment: statement.minimum_payment,
                payments: statement.payments,
                remaining_amount: statement.remaining_amount(),
            },
            status: statement.status(),
            is_paid: statement.is_paid,
            is_overdue: statement.is_overdue(now),
            days_overdue: statement.days_overdue(now.date_naive()),
            payment_progress: statement.payment_progress(),
            version: statement.version,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub bill_id: Option<StatementId>,
    pub amount: Money,
    pub payment_type: PaymentType,
    pub payment_date: DateTime<Utc>,
    pub due_amount: Money,
    pub is_on_time: bool,
    pub from_account_id: Option<AccountId>,
    pub note: Option<String>,
}

impl PaymentView {
    pub fn from_payment(payment: &Payment) -> Self {
        PaymentView {
            id: payment.id,
            bill_id: payment.bill_id,
            amount: payment.amount,
            payment_type: payment.payment_type,
            payment_date: payment.payment_date,
            due_amount: payment.due_amount,
            is_on_time: payment.is_on_time,
            from_account_id: payment.from_account_id,
            note: payment.note.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// card overview: balances, the current bill and payment history stats
#[derive(Debug, Serialize, Deserialize)]
pub struct CardSummaryView {
    pub account_id: AccountId,
    pub name: String,
    pub balance: Money,
    pub debt: Money,
    pub credit_limit: Money,
    pub available_credit: Money,
    pub utilization_rate: Rate,
    pub current_bill: Option<StatementView>,
    pub stats: PaymentStats,
}

impl CardSummaryView {
    pub fn new(
        account: &Account,
        current_bill: Option<&Statement>,
        stats: PaymentStats,
        now: DateTime<Utc>,
    ) -> Self {
        CardSummaryView {
            account_id: account.id,
            name: account.name.clone(),
            balance: account.balance,
            debt: account.debt(),
            credit_limit: account
                .credit_card
                .as_ref()
                .map(|terms| terms.credit_limit)
                .unwrap_or(Money::ZERO),
            available_credit: account.available_credit(),
            utilization_rate: account.utilization(),
            current_bill: current_bill.map(|s| StatementView::from_statement(s, now)),
            stats,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
