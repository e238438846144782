use chrono::NaiveDate;

use crate::decimal::{Money, Rate};
use crate::errors::{BillingError, Result};
use crate::statement::Statement;
use crate::types::StatementId;

/// interest owed on a statement left unpaid past its due date
#[derive(Debug, Clone, PartialEq)]
pub struct InterestAssessment {
    pub statement_id: StatementId,
    pub interest_amount: Money,
    pub overdue_base: Money,
    pub days_overdue: u32,
    pub daily_rate: Rate,
}

/// engine for overdue interest; the result lands on the next statement and
/// never modifies the overdue one
pub struct OverdueInterestEngine {
    pub daily_rate: Rate,
}

impl OverdueInterestEngine {
    pub fn new(daily_rate: Rate) -> Self {
        Self { daily_rate }
    }

    /// interest on `statement` counted up to `as_of`; None when nothing accrues
    pub fn assess(&self, statement: &Statement, as_of: NaiveDate) -> Result<Option<InterestAssessment>> {
        let days_overdue = statement.days_overdue(as_of);
        let overdue_base = statement.remaining_amount();
        if days_overdue == 0 || overdue_base.is_zero() {
            return Ok(None);
        }

        let interest_amount = overdue_base
            .apply_daily_rate(self.daily_rate, days_overdue)
            .ok_or_else(|| BillingError::overflow("overdue interest"))?;

        Ok(Some(InterestAssessment {
            statement_id: statement.id,
            interest_amount,
            overdue_base,
            days_overdue,
            daily_rate: self.daily_rate,
        }))
    }
}
