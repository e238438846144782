//! Billing-cycle date arithmetic.
//!
//! Billing days are limited to `1..=28` when an account is configured, so
//! every month has the boundary day and no month-length clamping happens
//! here. The calculator still re-checks the day and reports
//! `InvalidConfiguration` instead of producing a shifted cycle.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::account::{CreditCardTerms, MAX_CYCLE_DAY};
use crate::errors::{BillingError, Result};

/// one billing cycle, `[period_start, period_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingCycle {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
}

impl BillingCycle {
    /// whether `date` falls inside the half-open window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.period_start <= date && date < self.period_end
    }

    /// the cycle that starts where this one ends
    pub fn next(&self) -> Result<BillingCycle> {
        let grace = (self.due_date - self.period_end).num_days() as u64;
        let period_end = add_month(self.period_end)?;
        Ok(BillingCycle {
            period_start: self.period_end,
            period_end,
            due_date: add_days(period_end, grace)?,
        })
    }

    /// days from `today` to the due date; negative once overdue
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }
}

/// cycle whose end is the most recent billing day on or before `reference`
pub fn cycle_for(terms: &CreditCardTerms, reference: NaiveDate) -> Result<BillingCycle> {
    let billing_day = terms.billing_day;
    if !(1..=MAX_CYCLE_DAY).contains(&billing_day) {
        return Err(BillingError::InvalidConfiguration {
            message: format!("billing day {} outside 1..={}", billing_day, MAX_CYCLE_DAY),
        });
    }

    let anchor_month = if reference.day() >= billing_day {
        reference
    } else {
        sub_month(reference)?
    };

    let period_end = anchor_month
        .with_day(billing_day)
        .ok_or_else(|| invalid_date(format!("day {} in {}", billing_day, anchor_month)))?;
    let period_start = sub_month(period_end)?;
    let due_date = add_days(period_end, terms.grace_period_days as u64)?;

    Ok(BillingCycle {
        period_start,
        period_end,
        due_date,
    })
}

/// payment due date for a cycle ending on `period_end`
pub fn due_date_for(terms: &CreditCardTerms, period_end: NaiveDate) -> Result<NaiveDate> {
    add_days(period_end, terms.grace_period_days as u64)
}

pub(crate) fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| invalid_date(format!("{} + {} days", date, days)))
}

pub(crate) fn add_month(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(1))
        .ok_or_else(|| invalid_date(format!("{} + 1 month", date)))
}

pub(crate) fn sub_month(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_months(Months::new(1))
        .ok_or_else(|| invalid_date(format!("{} - 1 month", date)))
}

fn invalid_date(message: String) -> BillingError {
    BillingError::InvalidDate { message }
}
