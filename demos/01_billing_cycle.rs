/// billing cycle - three months of statements with overdue interest carried forward
use card_billing_rs::{
    Account, BillingConfig, BillingEngine, LedgerEntry, Money, PaymentRequest, Rate, SafeTimeProvider,
    TimeSource,
};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== billing cycle example ===\n");

    let mut config = BillingConfig::standard();
    config.diagnostics.log_calculations = true;
    let engine = BillingEngine::in_memory(config)?;

    let card = Account::builder()
        .credit_limit(Money::from_major(20_000))
        .billing_day(15)
        .grace_period_days(10)
        .daily_interest_rate(Rate::from_percent_decimal(dec!(0.05)))
        .opened_on(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        .build()?;
    let card_id = card.id;
    engine.store().put_account(card);

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();

    for (month, charges) in [(1u32, 45_000i64), (2, 12_500), (3, 8_000)] {
        let day = NaiveDate::from_ymd_opt(2024, month, 20).unwrap();
        engine.post_transaction(LedgerEntry::charge(card_id, Money::from_cents(charges), day, "purchases"))?;

        // close the cycle on the next billing day
        let close = NaiveDate::from_ymd_opt(2024, month + 1, 15).unwrap();
        controller.advance(close.signed_duration_since(time.now().date_naive()));
        let bill = engine.generate_bill_for_account(card_id, time.now().date_naive(), &time)?;

        println!(
            "{} .. {}: previous {} charges {} interest {} total {} minimum {} due {}",
            bill.bill_start_date,
            bill.bill_end_date,
            bill.previous_balance,
            bill.new_charges,
            bill.interest,
            bill.total_amount,
            bill.minimum_payment,
            bill.payment_due_date,
        );

        // pay the minimum only in the first month, skip the second
        if month == 1 {
            engine.record_payment(PaymentRequest::new(bill.id, bill.minimum_payment), &time)?;
        }
    }

    let overdue = engine.overdue_statements(card_id, &time)?;
    println!("\noverdue statements: {}", overdue.len());
    println!("card balance: {}", engine.account(card_id)?.balance);

    Ok(())
}
