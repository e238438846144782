pub mod accrual;
pub mod annual_fee;

pub use accrual::{InterestAssessment, OverdueInterestEngine};
pub use annual_fee::{anniversary_within, trailing_year_charges, AnnualFeeAssessment, AnnualFeeEngine};

use crate::decimal::Money;

/// interest and fee charges carried onto a newly generated statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleCharges {
    pub interest: Option<InterestAssessment>,
    pub annual_fee: Option<AnnualFeeAssessment>,
}

impl CycleCharges {
    pub fn interest_amount(&self) -> Money {
        self.interest
            .as_ref()
            .map(|i| i.interest_amount)
            .unwrap_or(Money::ZERO)
    }

    /// fee actually charged, zero when waived or not due
    pub fn fee_amount(&self) -> Money {
        self.annual_fee
            .as_ref()
            .map(|f| f.charged())
            .unwrap_or(Money::ZERO)
    }

    pub fn total(&self) -> Money {
        self.interest_amount() + self.fee_amount()
    }
}
