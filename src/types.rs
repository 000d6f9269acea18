use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

pub type SchoolId = Uuid;
pub type UserId = Uuid;
pub type ClassId = Uuid;
pub type StudentId = Uuid;
pub type FeeStructureId = Uuid;
pub type StudentFeeId = Uuid;
pub type InstallmentId = Uuid;
pub type PaymentId = Uuid;

/// kind of fee in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeType {
    Tuition,
    Admission,
    Exam,
    Library,
    Sports,
    Transport,
    Hostel,
    Lab,
    Activity,
    LateFee,
    Other,
}

/// payment state of a ledger row or installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeStatus {
    Pending,
    Partial,
    Paid,
}

impl FeeStatus {
    /// PAID iff nothing is left, PARTIAL iff something but not everything was
    /// paid, otherwise PENDING
    pub fn derive(total: Money, paid: Money, balance: Money) -> Self {
        if balance.is_zero() {
            FeeStatus::Paid
        } else if paid.is_positive() && paid < total {
            FeeStatus::Partial
        } else {
            FeeStatus::Pending
        }
    }
}

/// how a payment was tendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Cash,
    Cheque,
    Online,
    Upi,
    Card,
    DemandDraft,
}

impl PaymentMode {
    /// electronic modes must carry a transaction id
    pub fn requires_transaction_id(&self) -> bool {
        matches!(self, PaymentMode::Online | PaymentMode::Upi | PaymentMode::Card)
    }

    /// cheques must carry cheque number and bank name
    pub fn requires_cheque_details(&self) -> bool {
        matches!(self, PaymentMode::Cheque)
    }
}

/// academic year in the school's "2025-26" form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicYear {
    start: i32,
}

impl AcademicYear {
    pub fn new(start: i32) -> Result<Self> {
        if !(1000..=9998).contains(&start) {
            return Err(LedgerError::validation(
                "academic_year",
                format!("start year {} out of range", start),
            ));
        }
        Ok(Self { start })
    }

    pub fn parse(s: &str) -> Result<Self> {
        let malformed = || {
            LedgerError::validation(
                "academic_year",
                format!("'{}' is not of the form YYYY-YY", s),
            )
        };

        let (head, tail) = s.split_once('-').ok_or_else(malformed)?;
        if head.len() != 4 || tail.len() != 2 {
            return Err(malformed());
        }
        if !head.bytes().chain(tail.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let start: i32 = head.parse().map_err(|_| malformed())?;
        let end: i32 = tail.parse().map_err(|_| malformed())?;
        if (start + 1) % 100 != end {
            return Err(LedgerError::validation(
                "academic_year",
                format!("'{}' must span consecutive years", s),
            ));
        }
        Self::new(start)
    }

    pub fn start_year(&self) -> i32 {
        self.start
    }

    pub fn end_year(&self) -> i32 {
        self.start + 1
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.start, (self.start + 1) % 100)
    }
}

impl FromStr for AcademicYear {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        AcademicYear::parse(s)
    }
}

impl TryFrom<String> for AcademicYear {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self> {
        AcademicYear::parse(&s)
    }
}

impl From<AcademicYear> for String {
    fn from(y: AcademicYear) -> Self {
        y.to_string()
    }
}
