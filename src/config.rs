use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{BillingError, Result};
use crate::types::{AnnualFeeAnchor, OverpaymentPolicy};

/// engine configuration, passed explicitly to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub minimum_payment: MinimumPaymentConfig,
    pub overpayment: OverpaymentPolicy,
    pub annual_fee_anchor: AnnualFeeAnchor,
    /// allow a funding account without credit to go negative
    pub allow_funding_overdraft: bool,
    /// days before the due date on which a reminder fires
    pub reminder_days: Vec<u32>,
    pub diagnostics: DiagnosticsConfig,
}

/// minimum payment rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumPaymentConfig {
    /// share of the statement total
    pub rate: Rate,
    /// lower bound, itself capped at the statement total
    pub floor: Money,
}

/// diagnostic switches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// emit debug-level breakdowns of statement and interest calculations
    pub log_calculations: bool,
}

impl BillingConfig {
    /// 10% minimum with a 1.00 floor, overpayments rejected, fee anniversary
    /// counted from the account opening date
    pub fn standard() -> Self {
        Self {
            minimum_payment: MinimumPaymentConfig {
                rate: Rate::from_percentage(10),
                floor: Money::from_cents(100),
            },
            overpayment: OverpaymentPolicy::Reject,
            annual_fee_anchor: AnnualFeeAnchor::AccountOpened,
            allow_funding_overdraft: false,
            reminder_days: vec![3, 1, 0],
            diagnostics: DiagnosticsConfig::default(),
        }
    }

    /// overpayments become credit balances and funding accounts may overdraw
    pub fn lenient() -> Self {
        Self {
            overpayment: OverpaymentPolicy::AllowCredit,
            allow_funding_overdraft: true,
            ..Self::standard()
        }
    }

    /// load from json
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BillingConfig = serde_json::from_str(json).map_err(|e| {
            BillingError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.minimum_payment.rate;
        if rate.is_negative() || rate > Rate::ONE {
            return Err(BillingError::InvalidConfiguration {
                message: format!("minimum payment rate {} outside 0%..=100%", rate),
            });
        }

        if self.minimum_payment.floor.is_negative() {
            return Err(BillingError::InvalidConfiguration {
                message: format!("minimum payment floor {} is negative", self.minimum_payment.floor),
            });
        }

        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_defaults() {
        let config = BillingConfig::standard();
        assert_eq!(config.minimum_payment.rate, Rate::from_percentage(10));
        assert_eq!(config.minimum_payment.floor, Money::from_cents(100));
        assert_eq!(config.overpayment, OverpaymentPolicy::Reject);
        assert_eq!(config.reminder_days, vec![3, 1, 0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lenient_overrides() {
        let config = BillingConfig::lenient();
        assert_eq!(config.overpayment, OverpaymentPolicy::AllowCredit);
        assert!(config.allow_funding_overdraft);
        assert_eq!(config.minimum_payment, BillingConfig::standard().minimum_payment);
    }

    #[test]
    fn test_rejects_bad_rate() {
        let mut config = BillingConfig::standard();
        config.minimum_payment.rate = Rate::from_decimal(dec!(1.5));
        assert!(config.validate().is_err());

        config.minimum_payment.rate = Rate::from_decimal(dec!(-0.1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_and_validation() {
        let json = serde_json::to_string(&BillingConfig::lenient()).unwrap();
        let loaded = BillingConfig::from_json(&json).unwrap();
        assert_eq!(loaded, BillingConfig::lenient());

        let mut bad = BillingConfig::standard();
        bad.minimum_payment.floor = Money::from_cents(-1);
        let json = serde_json::to_string(&bad).unwrap();
        assert!(matches!(
            BillingConfig::from_json(&json),
            Err(BillingError::InvalidConfiguration { .. })
        ));

        assert!(BillingConfig::from_json("{not json").is_err());
    }
}
