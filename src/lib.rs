pub mod account;
pub mod config;
pub mod cycle;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod generator;
pub mod interest;
pub mod payments;
pub mod statement;
pub mod stats;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use account::{Account, CreditCardAccountBuilder, CreditCardTerms};
pub use config::{BillingConfig, DiagnosticsConfig, MinimumPaymentConfig};
pub use cycle::{cycle_for, BillingCycle};
pub use decimal::{Money, Rate};
pub use engine::{BillingEngine, DueReminder};
pub use errors::{BillingError, Result};
pub use events::{Event, EventStore};
pub use generator::{StatementGenerator, StatementPlan};
pub use interest::{AnnualFeeAssessment, AnnualFeeEngine, InterestAssessment, OverdueInterestEngine};
pub use payments::{classify, EarlyPaymentRequest, Payment, PaymentProcessor, PaymentRequest};
pub use statement::Statement;
pub use stats::PaymentStats;
pub use store::{
    AccountLocks, BillingStore, CycleTotals, InMemoryLedger, InMemoryStore, LedgerEntry, LedgerEntryKind,
    TransactionLedger, WriteBatch, WriteOp,
};
pub use types::{
    AccountId, AccountKind, AnnualFeeAnchor, OverpaymentPolicy, PaymentId, PaymentType, StatementId,
    StatementStatus,
};
pub use views::{CardSummaryView, PaymentView, StatementView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
