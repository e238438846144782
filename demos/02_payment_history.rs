/// payment history - funded, early and deleted payments with statistics
use card_billing_rs::{
    Account, AccountKind, BillingConfig, BillingEngine, EarlyPaymentRequest, LedgerEntry, Money,
    PaymentRequest, SafeTimeProvider, TimeSource,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = BillingEngine::in_memory(BillingConfig::standard())?;

    let card = Account::builder()
        .credit_limit(Money::from_major(10_000))
        .billing_day(5)
        .opened_on(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap())
        .build()?;
    let checking = Account::funding("checking", AccountKind::Checking, Money::from_major(1_000));
    let (card_id, checking_id) = (card.id, checking.id);
    engine.store().put_account(card);
    engine.store().put_account(checking);

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();

    engine.post_transaction(LedgerEntry::charge(
        card_id,
        Money::from_major(300),
        NaiveDate::from_ymd_opt(2024, 2, 8).unwrap(),
        "flight",
    ))?;

    // paid before the statement exists
    engine.record_early_payment(
        EarlyPaymentRequest::new(card_id, Money::from_major(50))
            .from_account(checking_id)
            .note("early"),
        &time,
    )?;

    controller.advance(Duration::days(24));
    let bill = engine.generate_bill_for_account(card_id, time.now().date_naive(), &time)?;
    println!("total {} already paid {} remaining {}", bill.total_amount, bill.payments, bill.remaining_amount());

    controller.advance(Duration::days(1));
    let custom = engine.record_payment(
        PaymentRequest::new(bill.id, Money::from_major(75)).from_account(checking_id),
        &time,
    )?;

    // oops, wrong amount
    engine.delete_payment(custom.id, &time)?;
    engine.record_payment(
        PaymentRequest::new(bill.id, bill.remaining_amount()).from_account(checking_id),
        &time,
    )?;

    for payment in engine.payments_by_account(card_id)? {
        println!(
            "{} {:>8} {:?} on_time={}",
            payment.payment_date.format("%Y-%m-%d"),
            payment.amount.to_string(),
            payment.payment_type,
            payment.is_on_time
        );
    }

    let stats = engine.payment_stats(card_id)?;
    println!("\n{}", serde_json::to_string_pretty(&stats)?);
    println!("checking balance: {}", engine.account(checking_id)?.balance);

    for event in engine.take_events() {
        println!("{:?}", event);
    }

    Ok(())
}
