/// quick start - one card, one statement, one payment
use card_billing_rs::{
    Account, BillingConfig, BillingEngine, LedgerEntry, Money, PaymentRequest, SafeTimeProvider, StatementView,
    TimeSource,
};
use chrono::{NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = BillingEngine::in_memory(BillingConfig::standard())?;

    // card billed on the 5th, due 3 days later
    let card = Account::builder()
        .name("everyday card")
        .credit_limit(Money::from_major(5_000))
        .billing_day(5)
        .opened_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .build()?;
    let card_id = card.id;
    engine.store().put_account(card);

    engine.post_transaction(LedgerEntry::charge(
        card_id,
        Money::from_cents(10_000),
        NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
        "groceries",
    ))?;

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()));
    let bill = engine.generate_bill_for_account(card_id, time.now().date_naive(), &time)?;
    println!("statement total {} minimum {} due {}", bill.total_amount, bill.minimum_payment, bill.payment_due_date);

    let payment = engine.record_payment(PaymentRequest::new(bill.id, bill.minimum_payment), &time)?;
    println!("paid {} ({:?})", payment.amount, payment.payment_type);

    let bill = engine.statement(bill.id)?;
    println!("{}", StatementView::from_statement(&bill, time.now()).to_json_pretty()?);

    Ok(())
}
