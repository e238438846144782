use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::payments::Payment;
use crate::statement::Statement;
use crate::types::PaymentType;

/// payment history statistics for one account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentStats {
    /// percentage in `0..=100`
    pub on_time_payment_rate: f32,
    pub payment_count: u32,
    pub on_time_count: u32,
    pub total_payments: Money,
    pub average_payment: Money,
    pub full_payment_count: u32,
    pub minimum_payment_count: u32,
    pub custom_payment_count: u32,
    /// mean days from statement close to payment, attached payments only
    pub average_processing_days: f32,
}

impl PaymentStats {
    /// fold a payment history; `statements` resolves each payment's close date
    pub fn from_history(payments: &[Payment], statements: &[Statement]) -> Result<Self> {
        if payments.is_empty() {
            return Ok(Self::default());
        }

        let closes: HashMap<_, _> = statements.iter().map(|s| (s.id, s.bill_end_date)).collect();
        let mut stats = Self::default();
        let mut processing_days: i64 = 0;
        let mut processed: u32 = 0;

        for payment in payments {
            stats.payment_count += 1;
            stats.total_payments = stats
                .total_payments
                .checked_add(payment.amount)
                .ok_or_else(|| BillingError::overflow("payment total"))?;
            if payment.is_on_time {
                stats.on_time_count += 1;
            }
            match payment.payment_type {
                PaymentType::Full => stats.full_payment_count += 1,
                PaymentType::Minimum => stats.minimum_payment_count += 1,
                PaymentType::Custom => stats.custom_payment_count += 1,
            }

            if let Some(close) = payment.bill_id.and_then(|id| closes.get(&id)) {
                // early payments count as processed on the close date
                processing_days += (payment.payment_date.date_naive() - *close).num_days().max(0);
                processed += 1;
            }
        }

        let count = stats.payment_count as f32;
        stats.on_time_payment_rate = stats.on_time_count as f32 / count * 100.0;
        stats.average_payment = Money::from_cents(
            (stats.total_payments.cents() as f64 / stats.payment_count as f64).round() as i64,
        );
        if processed > 0 {
            stats.average_processing_days = processing_days as f32 / processed as f32;
        }

        Ok(stats)
    }

    pub fn late_count(&self) -> u32 {
        self.payment_count - self.on_time_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::fixtures::statement;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn payment(s: &Statement, cents: i64, day: u32, on_time: bool, payment_type: PaymentType) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            bill_id: Some(s.id),
            account_id: s.account_id,
            amount: Money::from_cents(cents),
            payment_type,
            payment_date: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            due_amount: s.total_amount,
            is_on_time: on_time,
            from_account_id: None,
            note: None,
        }
    }

    #[test]
    fn test_empty_history() {
        let stats = PaymentStats::from_history(&[], &[]).unwrap();
        assert_eq!(stats.payment_count, 0);
        assert_eq!(stats.on_time_payment_rate, 0.0);
        assert_eq!(stats.total_payments, Money::ZERO);
        assert_eq!(stats.average_payment, Money::ZERO);
        assert_eq!(stats.average_processing_days, 0.0);
    }

    #[test]
    fn test_counts_and_rates() {
        // statement closes 2024-03-05, due 2024-03-08
        let s = statement(10_000, 1_000);
        let payments = [
            payment(&s, 1_000, 6, true, PaymentType::Minimum),
            payment(&s, 2_500, 8, true, PaymentType::Custom),
            payment(&s, 6_500, 15, false, PaymentType::Custom),
        ];

        let stats = PaymentStats::from_history(&payments, &[s]).unwrap();
        assert_eq!(stats.payment_count, 3);
        assert_eq!(stats.on_time_count, 2);
        assert_eq!(stats.late_count(), 1);
        assert!((stats.on_time_payment_rate - 66.666_664).abs() < 0.001);
        assert_eq!(stats.total_payments, Money::from_cents(10_000));
        assert_eq!(stats.average_payment, Money::from_cents(3_333));
        assert_eq!(stats.minimum_payment_count, 1);
        assert_eq!(stats.custom_payment_count, 2);
        assert_eq!(stats.full_payment_count, 0);
        // (1 + 3 + 10) / 3
        assert!((stats.average_processing_days - 14.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_unresolved_statements_skip_processing_days() {
        let s = statement(10_000, 1_000);
        let payments = [payment(&s, 10_000, 10, false, PaymentType::Full)];

        let stats = PaymentStats::from_history(&payments, &[]).unwrap();
        assert_eq!(stats.full_payment_count, 1);
        assert_eq!(stats.on_time_payment_rate, 0.0);
        assert_eq!(stats.average_processing_days, 0.0);
    }

    #[test]
    fn test_payment_total_overflow() {
        let s = statement(10_000, 1_000);
        let payments = [
            payment(&s, i64::MAX, 6, true, PaymentType::Custom),
            payment(&s, 1, 7, true, PaymentType::Custom),
        ];

        assert!(matches!(
            PaymentStats::from_history(&payments, &[s]),
            Err(BillingError::CalculationError { .. })
        ));
    }
}
