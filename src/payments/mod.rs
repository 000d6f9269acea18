pub mod discount;
pub mod receipt_number;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::installments::Installment;
use crate::ledger::FeeLedger;
use crate::student_fee::{ensure_payable, FeeAccount, StudentFee};
use crate::types::{
    AcademicYear, FeeStatus, InstallmentId, PaymentId, PaymentMode, SchoolId, StudentFeeId,
    StudentId, UserId,
};

pub use receipt_number::{format_receipt_number, parse_receipt_number};

/// what a payment is applied against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentTarget {
    Fee(StudentFeeId),
    Installment(InstallmentId),
}

/// instrument details that travel with a payment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub transaction_id: Option<String>,
    pub cheque_number: Option<String>,
    pub bank_name: Option<String>,
    pub remarks: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PaymentDetails {
    /// blank strings dropped, and the fields the mode needs are present
    pub fn normalized(self, mode: PaymentMode) -> Result<Self> {
        let details = Self {
            transaction_id: present(self.transaction_id),
            cheque_number: present(self.cheque_number),
            bank_name: present(self.bank_name),
            remarks: present(self.remarks),
        };

        if mode.requires_transaction_id() && details.transaction_id.is_none() {
            return Err(LedgerError::validation(
                "transaction_id",
                format!("{:?} payments need a transaction id", mode),
            ));
        }
        if mode.requires_cheque_details() {
            if details.cheque_number.is_none() {
                return Err(LedgerError::validation(
                    "cheque_number",
                    "cheque payments need a cheque number",
                ));
            }
            if details.bank_name.is_none() {
                return Err(LedgerError::validation(
                    "bank_name",
                    "cheque payments need the bank name",
                ));
            }
        }
        Ok(details)
    }
}

/// payment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub target: PaymentTarget,
    pub amount: Money,
    pub mode: PaymentMode,
    /// defaults to today
    pub payment_date: Option<NaiveDate>,
    pub details: PaymentDetails,
    /// version of the student fee the caller last saw
    pub expected_version: Option<u32>,
}

impl PaymentRequest {
    pub fn new(target: PaymentTarget, amount: Money, mode: PaymentMode) -> Self {
        Self {
            target,
            amount,
            mode,
            payment_date: None,
            details: PaymentDetails::default(),
            expected_version: None,
        }
    }
}

/// one immutable entry of the payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub student_fee_id: StudentFeeId,
    pub installment_id: Option<InstallmentId>,
    pub academic_year: AcademicYear,
    pub amount_paid: Money,
    pub payment_mode: PaymentMode,
    pub payment_date: NaiveDate,
    pub transaction_id: Option<String>,
    pub cheque_number: Option<String>,
    pub bank_name: Option<String>,
    pub remarks: Option<String>,
    pub receipt_number: String,
    pub collected_by: UserId,
    pub recorded_at: DateTime<Utc>,
    /// fee-level paid amount before this payment
    pub previous_paid: Money,
    /// fee-level balance after this payment
    pub balance_after: Money,
}

/// result of a recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub receipt_number: String,
    pub payment: Payment,
    pub student_fee: StudentFee,
    pub installment: Option<Installment>,
}

/// a payment applied to a staged copy of its account
struct StagedPayment {
    account: FeeAccount,
    installment_id: Option<InstallmentId>,
    previous_paid: Money,
    old_status: FeeStatus,
    payment_date: NaiveDate,
    details: PaymentDetails,
}

impl FeeLedger {
    /// apply a payment to a fee or one of its installments and append it to
    /// the payment record under a fresh receipt number
    pub fn record_payment(
        &mut self,
        ctx: &LedgerContext,
        request: PaymentRequest,
        time: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        let recorded_at = time.now();
        let staged = self
            .stage_payment(ctx, &request, recorded_at.date_naive())
            .map_err(|e| {
                warn!(payment_target = ?request.target, amount = %request.amount, error = %e, "payment rejected");
                e
            })?;

        let StagedPayment {
            account,
            installment_id,
            previous_paid,
            old_status,
            payment_date,
            details,
        } = staged;
        let (seq, receipt_number) = self.next_receipt_number(recorded_at.date_naive());

        let fee = account.fee.clone();
        let installment = installment_id
            .and_then(|id| account.installments.iter().find(|i| i.id == id))
            .cloned();
        let payment = Payment {
            id: Uuid::new_v4(),
            school_id: fee.school_id,
            student_id: fee.student_id,
            student_fee_id: fee.id,
            installment_id,
            academic_year: fee.academic_year.clone(),
            amount_paid: request.amount,
            payment_mode: request.mode,
            payment_date,
            transaction_id: details.transaction_id,
            cheque_number: details.cheque_number,
            bank_name: details.bank_name,
            remarks: details.remarks,
            receipt_number: receipt_number.clone(),
            collected_by: ctx.user_id,
            recorded_at,
            previous_paid,
            balance_after: fee.balance_amount,
        };

        self.commit_account(account)?;
        self.receipt_seq = seq;
        self.receipts.insert(receipt_number.clone(), self.payments.len());
        self.payments.push(payment.clone());

        self.events.emit(Event::PaymentRecorded {
            payment_id: payment.id,
            student_fee_id: fee.id,
            installment_id,
            amount: payment.amount_paid,
            mode: payment.payment_mode,
            receipt_number: receipt_number.clone(),
            collected_by: ctx.user_id,
            timestamp: recorded_at,
        });
        if old_status != fee.status {
            self.events.emit(Event::StatusChanged {
                student_fee_id: fee.id,
                old_status,
                new_status: fee.status,
                timestamp: recorded_at,
            });
        }
        info!(
            receipt_number = %receipt_number,
            student_fee_id = %fee.id,
            amount = %payment.amount_paid,
            balance = %fee.balance_amount,
            status = ?fee.status,
            "payment recorded"
        );

        Ok(PaymentOutcome {
            receipt_number,
            payment,
            student_fee: fee,
            installment,
        })
    }

    fn stage_payment(
        &self,
        ctx: &LedgerContext,
        request: &PaymentRequest,
        today: NaiveDate,
    ) -> Result<StagedPayment> {
        let payment_date = request.payment_date.unwrap_or(today);
        if payment_date > today {
            return Err(LedgerError::validation(
                "payment_date",
                format!("{} is in the future", payment_date),
            ));
        }
        let details = request.details.clone().normalized(request.mode)?;

        let (fee_id, installment_id) = match request.target {
            PaymentTarget::Fee(id) => (id, None),
            PaymentTarget::Installment(id) => (self.installment(ctx, id)?.0.id, Some(id)),
        };
        let mut account = self.account(ctx, fee_id)?.clone();
        account.fee.check_version(request.expected_version)?;
        let previous_paid = account.fee.paid_amount;
        let old_status = account.fee.status;

        match installment_id {
            None => {
                if account.fee.has_installments {
                    return Err(LedgerError::conflict(format!(
                        "fee {} is paid through its installments",
                        fee_id
                    )));
                }
                account.fee.apply_payment(request.amount)?;
            }
            Some(id) => {
                // a fee-level discount can leave less owing than the schedule shows
                ensure_payable(request.amount, account.fee.balance_amount)?;
                let installment = account
                    .installments
                    .iter_mut()
                    .find(|i| i.id == id)
                    .ok_or_else(|| LedgerError::not_found("installment", id))?;
                installment.apply_payment(request.amount)?;
                account.fee.reconcile(&account.installments)?;
            }
        }
        account.fee.version += 1;

        Ok(StagedPayment {
            account,
            installment_id,
            previous_paid,
            old_status,
            payment_date,
            details,
        })
    }

    /// the payment issued under a receipt number
    pub fn payment_by_receipt(&self, ctx: &LedgerContext, receipt_number: &str) -> Result<&Payment> {
        let receipt_number = receipt_number.trim();
        parse_receipt_number(receipt_number).ok_or_else(|| {
            LedgerError::validation(
                "receipt_number",
                format!("'{}' is not a receipt number", receipt_number),
            )
        })?;
        self.receipts
            .get(receipt_number)
            .and_then(|&index| self.payments.get(index))
            .filter(|p| ctx.owns(p.school_id))
            .ok_or_else(|| LedgerError::not_found("receipt", receipt_number))
    }

    /// a student's payments for the year in recording order
    pub fn payments_for_student(
        &self,
        ctx: &LedgerContext,
        student_id: StudentId,
        academic_year: &AcademicYear,
    ) -> Vec<&Payment> {
        self.payments
            .iter()
            .filter(|p| ctx.owns(p.school_id))
            .filter(|p| p.student_id == student_id && &p.academic_year == academic_year)
            .collect()
    }
}
