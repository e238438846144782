use chrono::{Datelike, Months, NaiveDate};

use crate::account::CreditCardTerms;
use crate::decimal::Money;
use crate::statement::Statement;

/// outcome of the annual fee check for one anniversary
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualFeeAssessment {
    pub anniversary: NaiveDate,
    pub fee: Money,
    pub trailing_charges: Money,
    pub threshold: Money,
    pub waived: bool,
}

impl AnnualFeeAssessment {
    /// amount put on the statement
    pub fn charged(&self) -> Money {
        if self.waived {
            Money::ZERO
        } else {
            self.fee
        }
    }
}

/// engine for the once-per-account-year fee
pub struct AnnualFeeEngine<'a> {
    terms: &'a CreditCardTerms,
}

impl<'a> AnnualFeeEngine<'a> {
    pub fn new(terms: &'a CreditCardTerms) -> Self {
        Self { terms }
    }

    /// fee decision for the cycle `[start, end)`, None when no anniversary
    /// falls inside it or the card has no fee
    pub fn assess(
        &self,
        anchor: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
        trailing_charges: Money,
    ) -> Option<AnnualFeeAssessment> {
        if self.terms.annual_fee.is_zero() {
            return None;
        }

        let anniversary = anniversary_within(anchor, start, end)?;
        let threshold = self.terms.annual_fee_waiver_threshold;

        Some(AnnualFeeAssessment {
            anniversary,
            fee: self.terms.annual_fee,
            trailing_charges,
            threshold,
            waived: trailing_charges >= threshold,
        })
    }
}

/// first `anchor + n years` (n >= 1) inside `[start, end)`
pub fn anniversary_within(anchor: NaiveDate, start: NaiveDate, end: NaiveDate) -> Option<NaiveDate> {
    let first_year = (start.year() - anchor.year()).max(1);
    let last_year = end.year() - anchor.year();

    (first_year..=last_year)
        .filter_map(|n| anchor.checked_add_months(Months::new(12 * n as u32)))
        .find(|date| start <= *date && *date < end)
}

/// new charges over the year ending at `anniversary`: earlier statements that
/// closed after `anniversary - 1 year`, plus the charges of the current cycle
pub fn trailing_year_charges(
    history: &[Statement],
    anniversary: NaiveDate,
    current_cycle_charges: Money,
) -> Money {
    let window_start = anniversary
        .checked_sub_months(Months::new(12))
        .unwrap_or(NaiveDate::MIN);

    history
        .iter()
        .filter(|s| s.bill_end_date > window_start && s.bill_end_date <= anniversary)
        .map(|s| s.new_charges)
        .sum::<Money>()
        + current_cycle_charges
}
