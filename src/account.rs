use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{BillingError, Result};
use crate::types::{AccountId, AccountKind};

/// highest billing or payment-due day; keeps every cycle boundary a real date
pub const MAX_CYCLE_DAY: u32 = 28;

/// default grace period between statement close and payment due date
pub const DEFAULT_GRACE_PERIOD_DAYS: u32 = 3;

/// ledger account as seen by the billing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub kind: AccountKind,
    /// negative means money owed
    pub balance: Money,
    pub credit_card: Option<CreditCardTerms>,
}

/// credit-card facet of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardTerms {
    pub credit_limit: Money,
    pub cash_advance_limit: Money,
    pub billing_day: u32,
    pub payment_due_day: u32,
    pub grace_period_days: u32,
    /// e.g. 0.05% per day
    pub daily_interest_rate: Rate,
    pub annual_fee: Money,
    pub annual_fee_waiver_threshold: Money,
    pub opened_on: NaiveDate,
}

impl CreditCardTerms {
    pub fn validate(&self) -> Result<()> {
        for (name, day) in [("billing day", self.billing_day), ("payment due day", self.payment_due_day)] {
            if !(1..=MAX_CYCLE_DAY).contains(&day) {
                return Err(BillingError::InvalidConfiguration {
                    message: format!("{} {} outside 1..={}", name, day, MAX_CYCLE_DAY),
                });
            }
        }

        let amounts = [
            ("credit limit", self.credit_limit),
            ("cash advance limit", self.cash_advance_limit),
            ("annual fee", self.annual_fee),
            ("annual fee waiver threshold", self.annual_fee_waiver_threshold),
        ];
        for (name, amount) in amounts {
            if amount.is_negative() {
                return Err(BillingError::InvalidConfiguration {
                    message: format!("{} {} is negative", name, amount),
                });
            }
        }

        if self.daily_interest_rate.is_negative() {
            return Err(BillingError::InvalidInterestRate {
                rate: self.daily_interest_rate,
            });
        }

        Ok(())
    }
}

impl Account {
    /// plain funding account (cash, checking, savings)
    pub fn funding(name: impl Into<String>, kind: AccountKind, balance: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            balance,
            credit_card: None,
        }
    }

    /// credit-card terms or `NotACreditCard`
    pub fn card_terms(&self) -> Result<&CreditCardTerms> {
        self.credit_card
            .as_ref()
            .ok_or(BillingError::NotACreditCard { id: self.id })
    }

    /// amount currently owed, zero when the balance is in credit
    pub fn debt(&self) -> Money {
        (-self.balance).non_negative()
    }

    /// unused credit line
    pub fn available_credit(&self) -> Money {
        match &self.credit_card {
            Some(terms) => (terms.credit_limit - self.debt()).non_negative(),
            None => Money::ZERO,
        }
    }

    /// debt as a share of the credit limit
    pub fn utilization(&self) -> Rate {
        match &self.credit_card {
            Some(terms) => self
                .debt()
                .ratio_of(terms.credit_limit)
                .map(Rate::from_decimal)
                .unwrap_or(Rate::ZERO),
            None => Rate::ZERO,
        }
    }

    /// whether `amount` can be debited from this account as a funding source
    pub fn can_fund(&self, amount: Money, allow_overdraft: bool) -> bool {
        if self.kind.is_credit() {
            self.available_credit() >= amount
        } else {
            allow_overdraft || self.balance >= amount
        }
    }

    pub fn builder() -> CreditCardAccountBuilder {
        CreditCardAccountBuilder::new()
    }
}

/// builder for credit-card accounts
pub struct CreditCardAccountBuilder {
    id: Option<AccountId>,
    name: Option<String>,
    balance: Money,
    credit_limit: Option<Money>,
    cash_advance_limit: Option<Money>,
    billing_day: Option<u32>,
    payment_due_day: Option<u32>,
    grace_period_days: u32,
    daily_interest_rate: Rate,
    annual_fee: Money,
    annual_fee_waiver_threshold: Money,
    opened_on: Option<NaiveDate>,
}

impl CreditCardAccountBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            balance: Money::ZERO,
            credit_limit: None,
            cash_advance_limit: None,
            billing_day: None,
            payment_due_day: None,
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            daily_interest_rate: Rate::from_percent_decimal(Decimal::new(5, 2)),
            annual_fee: Money::ZERO,
            annual_fee_waiver_threshold: Money::ZERO,
            opened_on: None,
        }
    }

    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn balance(mut self, balance: Money) -> Self {
        self.balance = balance;
        self
    }

    pub fn credit_limit(mut self, limit: Money) -> Self {
        self.credit_limit = Some(limit);
        self
    }

    pub fn cash_advance_limit(mut self, limit: Money) -> Self {
        self.cash_advance_limit = Some(limit);
        self
    }

    pub fn billing_day(mut self, day: u32) -> Self {
        self.billing_day = Some(day);
        self
    }

    pub fn payment_due_day(mut self, day: u32) -> Self {
        self.payment_due_day = Some(day);
        self
    }

    pub fn grace_period_days(mut self, days: u32) -> Self {
        self.grace_period_days = days;
        self
    }

    pub fn daily_interest_rate(mut self, rate: Rate) -> Self {
        self.daily_interest_rate = rate;
        self
    }

    pub fn annual_fee(mut self, fee: Money, waiver_threshold: Money) -> Self {
        self.annual_fee = fee;
        self.annual_fee_waiver_threshold = waiver_threshold;
        self
    }

    pub fn opened_on(mut self, date: NaiveDate) -> Self {
        self.opened_on = Some(date);
        self
    }

    pub fn build(self) -> Result<Account> {
        let credit_limit = self.credit_limit.ok_or(BillingError::InvalidConfiguration {
            message: "Credit limit required".to_string(),
        })?;

        let billing_day = self.billing_day.ok_or(BillingError::InvalidConfiguration {
            message: "Billing day required".to_string(),
        })?;

        let opened_on = self.opened_on.ok_or(BillingError::InvalidConfiguration {
            message: "Opening date required".to_string(),
        })?;

        let terms = CreditCardTerms {
            credit_limit,
            // cash advances default to a third of the line
            cash_advance_limit: self
                .cash_advance_limit
                .unwrap_or(Money::from_cents(credit_limit.cents() / 3)),
            billing_day,
            payment_due_day: self.payment_due_day.unwrap_or(billing_day),
            grace_period_days: self.grace_period_days,
            daily_interest_rate: self.daily_interest_rate,
            annual_fee: self.annual_fee,
            annual_fee_waiver_threshold: self.annual_fee_waiver_threshold,
            opened_on,
        };
        terms.validate()?;

        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let name = self.name.unwrap_or_else(|| {
            format!("CARD-{}", id.to_string()[..8].to_uppercase())
        });

        Ok(Account {
            id,
            name,
            kind: AccountKind::CreditCard,
            balance: self.balance,
            credit_card: Some(terms),
        })
    }
}

impl Default for CreditCardAccountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opened() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let card = Account::builder()
            .credit_limit(Money::from_major(10_000))
            .billing_day(5)
            .opened_on(opened())
            .build()
            .unwrap();

        let terms = card.card_terms().unwrap();
        assert_eq!(terms.grace_period_days, 3);
        assert_eq!(terms.payment_due_day, 5);
        assert_eq!(terms.daily_interest_rate, Rate::from_decimal(dec!(0.0005)));
        assert_eq!(card.kind, AccountKind::CreditCard);
        assert!(card.name.starts_with("CARD-"));
    }

    #[test]
    fn test_billing_day_bounds() {
        for day in [0, 29, 31] {
            let result = Account::builder()
                .credit_limit(Money::from_major(1_000))
                .billing_day(day)
                .opened_on(opened())
                .build();
            assert!(matches!(result, Err(BillingError::InvalidConfiguration { .. })), "day {}", day);
        }

        let result = Account::builder()
            .credit_limit(Money::from_major(1_000))
            .billing_day(28)
            .payment_due_day(30)
            .opened_on(opened())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_fields() {
        assert!(Account::builder().billing_day(5).opened_on(opened()).build().is_err());
        assert!(Account::builder().credit_limit(Money::from_major(1)).opened_on(opened()).build().is_err());
        assert!(Account::builder().credit_limit(Money::from_major(1)).billing_day(5).build().is_err());
    }

    #[test]
    fn test_debt_and_available_credit() {
        let card = Account::builder()
            .credit_limit(Money::from_major(1_000))
            .billing_day(5)
            .balance(Money::from_major(-250))
            .opened_on(opened())
            .build()
            .unwrap();

        assert_eq!(card.debt(), Money::from_major(250));
        assert_eq!(card.available_credit(), Money::from_major(750));
        assert_eq!(card.utilization(), Rate::from_percentage(25));

        let mut in_credit = card.clone();
        in_credit.balance = Money::from_major(40);
        assert_eq!(in_credit.debt(), Money::ZERO);
        assert_eq!(in_credit.available_credit(), Money::from_major(1_000));
    }

    #[test]
    fn test_can_fund() {
        let checking = Account::funding("checking", AccountKind::Checking, Money::from_major(100));
        assert!(checking.can_fund(Money::from_major(100), false));
        assert!(!checking.can_fund(Money::from_major(101), false));
        assert!(checking.can_fund(Money::from_major(101), true));
        assert!(checking.card_terms().is_err());
    }
}
