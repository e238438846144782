/// json views - card summary and reminders for a cardholder screen
use card_billing_rs::{
    Account, BillingConfig, BillingEngine, LedgerEntry, Money, PaymentRequest, PaymentView, SafeTimeProvider,
    TimeSource,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = BillingConfig::from_json(&serde_json::to_string(&BillingConfig::lenient())?)?;
    let engine = BillingEngine::in_memory(config)?;

    let card = Account::builder()
        .name("travel card")
        .credit_limit(Money::from_major(8_000))
        .billing_day(1)
        .grace_period_days(20)
        .annual_fee(Money::from_major(95), Money::from_major(5_000))
        .opened_on(NaiveDate::from_ymd_opt(2023, 5, 10).unwrap())
        .build()?;
    let card_id = card.id;
    engine.store().put_account(card);

    engine.post_transaction(LedgerEntry::charge(
        card_id,
        Money::from_cents(123_456),
        NaiveDate::from_ymd_opt(2024, 4, 18).unwrap(),
        "hotel",
    ))?;
    engine.post_transaction(LedgerEntry::credit(
        card_id,
        Money::from_cents(20_000),
        NaiveDate::from_ymd_opt(2024, 4, 25).unwrap(),
        "refund",
    ))?;

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();
    let bill = engine.generate_bill_for_account(card_id, time.now().date_naive(), &time)?;

    let payment = engine.record_payment(PaymentRequest::new(bill.id, bill.minimum_payment), &time)?;
    println!("{}", PaymentView::from_payment(&payment).to_json_pretty()?);

    // three days before the due date
    controller.advance(Duration::days(17));
    match engine.due_reminder(card_id, &time)? {
        Some(reminder) => println!("reminder: {}", serde_json::to_string(&reminder)?),
        None => println!("no reminder today"),
    }

    println!("{}", engine.card_summary(card_id, &time)?.to_json_pretty()?);

    Ok(())
}
