use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::account::CreditCardTerms;
use crate::config::BillingConfig;
use crate::cycle::BillingCycle;
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::Event;
use crate::interest::{
    anniversary_within, trailing_year_charges, AnnualFeeEngine, CycleCharges, OverdueInterestEngine,
};
use crate::payments::Payment;
use crate::statement::Statement;
use crate::store::{CycleTotals, WriteBatch};
use crate::types::{AccountId, AnnualFeeAnchor};

/// everything a new statement is derived from
#[derive(Debug, Clone)]
pub struct StatementInputs<'a> {
    pub account_id: AccountId,
    pub cycle: BillingCycle,
    /// most recent statement closing on or before the cycle start
    pub prior: Option<&'a Statement>,
    pub totals: CycleTotals,
    /// unattached payments dated inside the cycle
    pub early_payments: &'a [Payment],
    pub charges: CycleCharges,
}

/// a statement ready to insert, with the writes that go with it
#[derive(Debug, Clone, PartialEq)]
pub struct StatementPlan {
    pub statement: Statement,
    /// early payments re-pointed at the new statement
    pub attached: Vec<Payment>,
    pub charges: CycleCharges,
}

impl StatementPlan {
    pub fn to_batch(&self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.insert_statement(self.statement.clone());
        for payment in &self.attached {
            batch.update_payment(payment.clone());
        }
        batch.apply_balance_delta(self.statement.account_id, -self.charges.total());
        batch
    }

    pub fn events(&self, timestamp: DateTime<Utc>) -> Vec<Event> {
        let s = &self.statement;
        let mut events = vec![Event::StatementGenerated {
            account_id: s.account_id,
            statement_id: s.id,
            period_start: s.bill_start_date,
            period_end: s.bill_end_date,
            total_amount: s.total_amount,
            minimum_payment: s.minimum_payment,
            payment_due_date: s.payment_due_date,
            timestamp,
        }];

        if let Some(interest) = &self.charges.interest {
            events.push(Event::InterestAssessed {
                account_id: s.account_id,
                overdue_statement_id: interest.statement_id,
                amount: interest.interest_amount,
                days_overdue: interest.days_overdue,
                timestamp,
            });
        }

        if let Some(fee) = &self.charges.annual_fee {
            events.push(if fee.waived {
                Event::AnnualFeeWaived {
                    account_id: s.account_id,
                    anniversary: fee.anniversary,
                    trailing_charges: fee.trailing_charges,
                    threshold: fee.threshold,
                    timestamp,
                }
            } else {
                Event::AnnualFeeCharged {
                    account_id: s.account_id,
                    anniversary: fee.anniversary,
                    amount: fee.fee,
                    timestamp,
                }
            });
        }

        if !self.attached.is_empty() {
            events.push(Event::EarlyPaymentsAttached {
                statement_id: s.id,
                payment_ids: self.attached.iter().map(|p| p.id).collect(),
                amount: s.payments,
            });
        }

        events
    }
}

/// builds statements at cycle close
pub struct StatementGenerator<'a> {
    config: &'a BillingConfig,
}

impl<'a> StatementGenerator<'a> {
    pub fn new(config: &'a BillingConfig) -> Self {
        Self { config }
    }

    /// `round_half_up(total * rate)`, raised to the floor, never above the total
    pub fn minimum_payment(&self, total: Money) -> Result<Money> {
        if !total.is_positive() {
            return Ok(Money::ZERO);
        }

        let rule = &self.config.minimum_payment;
        let share = total
            .apply(rule.rate)
            .ok_or_else(|| BillingError::overflow("minimum payment"))?;

        Ok(share.max(rule.floor).min(total))
    }

    /// overdue interest on the prior statement and any annual fee due in
    /// this cycle
    pub fn assess_charges(
        &self,
        terms: &CreditCardTerms,
        cycle: &BillingCycle,
        prior: Option<&Statement>,
        history: &[Statement],
        new_charges: Money,
    ) -> Result<CycleCharges> {
        let interest = match prior {
            Some(prior) => OverdueInterestEngine::new(terms.daily_interest_rate).assess(prior, cycle.period_end)?,
            None => None,
        };

        let anchor = match self.config.annual_fee_anchor {
            AnnualFeeAnchor::AccountOpened => Some(terms.opened_on),
            AnnualFeeAnchor::FirstStatement => history.iter().map(|s| s.bill_start_date).min(),
        };

        let annual_fee = anchor.and_then(|anchor| {
            let fees = AnnualFeeEngine::new(terms);
            let anniversary = anniversary_within(anchor, cycle.period_start, cycle.period_end)?;
            let trailing = trailing_year_charges(history, anniversary, new_charges);
            fees.assess(anchor, cycle.period_start, cycle.period_end, trailing)
        });

        Ok(CycleCharges { interest, annual_fee })
    }

    /// derive the statement for `inputs.cycle`
    pub fn plan(&self, inputs: StatementInputs<'_>, created_at: DateTime<Utc>) -> Result<StatementPlan> {
        let StatementInputs {
            account_id,
            cycle,
            prior,
            totals,
            early_payments,
            charges,
        } = inputs;

        validate_window(cycle.period_start, cycle.period_end)?;

        let previous_balance = prior.map(|p| p.remaining_amount()).unwrap_or(Money::ZERO);
        let interest = charges.interest_amount();
        let annual_fee = charges.fee_amount();

        let adjustments = totals
            .adjustments
            .checked_add(interest)
            .and_then(|a| a.checked_add(annual_fee))
            .ok_or_else(|| BillingError::overflow("statement adjustments"))?;

        let gross = previous_balance
            .checked_add(totals.charges)
            .and_then(|t| t.checked_sub(totals.credits))
            .and_then(|t| t.checked_add(adjustments))
            .ok_or_else(|| BillingError::overflow("statement total"))?;
        let total_amount = gross.non_negative();
        let minimum_payment = self.minimum_payment(total_amount)?;

        let id = Uuid::new_v4();
        let attached: Vec<Payment> = early_payments
            .iter()
            .filter(|p| p.bill_id.is_none() && cycle.contains(p.payment_date.date_naive()))
            .map(|p| Payment {
                bill_id: Some(id),
                due_amount: total_amount,
                ..p.clone()
            })
            .collect();
        let payments = attached
            .iter()
            .try_fold(Money::ZERO, |acc, p| acc.checked_add(p.amount))
            .ok_or_else(|| BillingError::overflow("early payments"))?;

        if self.config.diagnostics.log_calculations {
            debug!(
                %account_id,
                period_start = %cycle.period_start,
                period_end = %cycle.period_end,
                %previous_balance,
                charges = %totals.charges,
                credits = %totals.credits,
                %adjustments,
                %interest,
                %annual_fee,
                %total_amount,
                %minimum_payment,
                early_payments = %payments,
                "statement calculation"
            );
        }

        let mut statement = Statement {
            id,
            account_id,
            bill_start_date: cycle.period_start,
            bill_end_date: cycle.period_end,
            payment_due_date: cycle.due_date,
            previous_balance,
            new_charges: totals.charges,
            credits: totals.credits,
            adjustments,
            interest,
            annual_fee,
            total_amount,
            minimum_payment,
            payments,
            is_paid: false,
            created_at,
            version: 0,
        };
        statement.settle();

        Ok(StatementPlan {
            statement,
            attached,
            charges,
        })
    }
}

fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start >= end {
        return Err(BillingError::InvalidDate {
            message: format!("empty billing window {}..{}", start, end),
        });
    }
    Ok(())
}
