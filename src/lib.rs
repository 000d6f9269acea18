pub mod api;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod context;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod installments;
pub mod ledger;
pub mod payments;
pub mod receipt;
pub mod roster;
pub mod student_fee;
pub mod summary;
pub mod types;
pub mod words;

// re-export key types
pub use api::ApiEnvelope;
pub use assignment::{ClassAssignment, FeeSelection, StudentAssignment};
pub use catalog::{FeeStructure, FeeStructureDraft, FeeStructureUpdate};
pub use config::LedgerConfig;
pub use context::LedgerContext;
pub use decimal::Money;
pub use errors::{ErrorKind, LedgerError, Result};
pub use events::{Event, EventStore};
pub use installments::{Installment, InstallmentPlanEntry};
pub use ledger::{FeeLedger, LedgerSnapshot};
pub use payments::{Payment, PaymentDetails, PaymentOutcome, PaymentRequest, PaymentTarget};
pub use receipt::{JsonReceiptRenderer, ReceiptDocument, ReceiptRenderer};
pub use roster::{NewStudent, Roster, SchoolClass, Student};
pub use student_fee::StudentFee;
pub use summary::{ClassFeeStructures, FeeLine, FeeSummary};
pub use types::{
    AcademicYear, ClassId, FeeStatus, FeeStructureId, FeeType, InstallmentId, PaymentId,
    PaymentMode, SchoolId, StudentFeeId, StudentId, UserId,
};
pub use words::{amount_in_words, format_inr};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
