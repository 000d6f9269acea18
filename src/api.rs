//! wire envelope and request bodies of the `/fee/...` endpoints
//!
//! hosts deserialize a body, hand it to the matching function here and
//! serialize the returned envelope; transport stays outside the crate

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::assignment::{ClassAssignment, FeeSelection, StudentAssignment};
use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::{ErrorKind, LedgerError, Result};
use crate::installments::{Installment, InstallmentPlanEntry};
use crate::ledger::FeeLedger;
use crate::payments::{PaymentDetails, PaymentOutcome, PaymentRequest, PaymentTarget};
use crate::roster::Student;
use crate::summary::FeeSummary;
use crate::types::{
    AcademicYear, ClassId, FeeStructureId, InstallmentId, PaymentMode, StudentFeeId, StudentId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// `{code, status, data}` on success, `{code, status, message}` on failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: u16,
    pub status: EnvelopeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            status: EnvelopeStatus::Success,
            data: Some(data),
            message: None,
            kind: None,
            field: None,
        }
    }

    pub fn failure(error: &LedgerError) -> Self {
        let field = match error {
            LedgerError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        Self {
            code: error.kind().status_code(),
            status: EnvelopeStatus::Error,
            data: None,
            message: Some(error.to_string()),
            kind: Some(error.kind()),
            field,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }

    /// back to a typed result, for hosts consuming an envelope
    pub fn into_result(self) -> Result<T> {
        match (self.status, self.data) {
            (EnvelopeStatus::Success, Some(data)) => Ok(data),
            (EnvelopeStatus::Success, None) => Err(LedgerError::dependency(
                "success envelope without data",
            )),
            (EnvelopeStatus::Error, _) => {
                let message = self.message.unwrap_or_else(|| format!("request failed with {}", self.code));
                Err(match self.kind.unwrap_or_else(|| kind_for_code(self.code)) {
                    ErrorKind::Validation => {
                        LedgerError::validation(self.field.unwrap_or_else(|| "request".to_string()), message)
                    }
                    ErrorKind::NotFound => LedgerError::not_found("resource", message),
                    ErrorKind::Conflict => LedgerError::conflict(message),
                    ErrorKind::Dependency => LedgerError::dependency(message),
                })
            }
        }
    }
}

impl<T> From<Result<T>> for ApiEnvelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => ApiEnvelope::success(data),
            Err(error) => ApiEnvelope::failure(&error),
        }
    }
}

fn kind_for_code(code: u16) -> ErrorKind {
    match code {
        400 | 422 => ErrorKind::Validation,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Conflict,
        _ => ErrorKind::Dependency,
    }
}

/// read a request body, reporting malformed json as a validation failure
pub fn parse_body<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| LedgerError::validation("body", e.to_string()))
}

/// amounts arrive either as json numbers or as decimal strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireAmount {
    Text(String),
    Number(serde_json::Number),
}

impl WireAmount {
    pub fn to_money(&self, field: &str) -> Result<Money> {
        let text = match self {
            WireAmount::Text(s) => s.clone(),
            WireAmount::Number(n) => n.to_string(),
        };
        Money::from_str_exact(&text).map_err(|e| match e {
            LedgerError::Validation { message, .. } => LedgerError::validation(field, message),
            other => other,
        })
    }
}

impl From<Money> for WireAmount {
    fn from(amount: Money) -> Self {
        WireAmount::Text(amount.to_string())
    }
}

fn parse_year(value: &str) -> Result<AcademicYear> {
    AcademicYear::parse(value.trim())
}

/// `YYYY-MM-DD`; blank means not given
fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| LedgerError::validation(field, format!("'{}' is not a YYYY-MM-DD date", v))),
    }
}

/// POST /fee/assign/student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStudentBody {
    pub student_id: StudentId,
    pub academic_year: String,
    /// optional items picked in addition to the mandatory ones
    #[serde(default)]
    pub fee_structure_ids: Vec<FeeStructureId>,
}

impl AssignStudentBody {
    pub fn into_parts(self) -> Result<(StudentId, AcademicYear, FeeSelection)> {
        let selection = if self.fee_structure_ids.is_empty() {
            FeeSelection::MandatoryOnly
        } else {
            FeeSelection::WithOptional(self.fee_structure_ids)
        };
        Ok((self.student_id, parse_year(&self.academic_year)?, selection))
    }
}

/// POST /fee/assign/class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignClassBody {
    pub class_id: ClassId,
    pub academic_year: String,
}

/// POST /fee/installments/auto-generate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoGenerateBody {
    pub student_fee_id: StudentFeeId,
    pub num_installments: u32,
    #[serde(default)]
    pub expected_version: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntryBody {
    pub installment_name: String,
    pub amount: WireAmount,
    pub due_date: String,
}

/// POST /fee/installments/create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualPlanBody {
    pub student_fee_id: StudentFeeId,
    pub installment_plan: Vec<PlanEntryBody>,
    #[serde(default)]
    pub expected_version: Option<u32>,
}

impl ManualPlanBody {
    pub fn entries(&self) -> Result<Vec<InstallmentPlanEntry>> {
        self.installment_plan
            .iter()
            .map(|e| -> Result<InstallmentPlanEntry> {
                Ok(InstallmentPlanEntry {
                    installment_name: e.installment_name.clone(),
                    amount: e.amount.to_money("amount")?,
                    due_date: parse_date("due_date", Some(&e.due_date))?
                        .ok_or_else(|| LedgerError::validation("due_date", "due date is required"))?,
                })
            })
            .collect()
    }
}

/// payment fields shared by both payment endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBody {
    pub amount_paid: WireAmount,
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub cheque_number: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u32>,
}

impl PaymentBody {
    pub fn into_request(self, target: PaymentTarget) -> Result<PaymentRequest> {
        Ok(PaymentRequest {
            target,
            amount: self.amount_paid.to_money("amount_paid")?,
            mode: self.payment_mode,
            payment_date: parse_date("payment_date", self.payment_date.as_deref())?,
            details: PaymentDetails {
                transaction_id: self.transaction_id,
                cheque_number: self.cheque_number,
                bank_name: self.bank_name,
                remarks: self.remarks,
            },
            expected_version: self.expected_version,
        })
    }
}

/// POST /fee/payment/record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPaymentBody {
    pub student_fee_id: StudentFeeId,
    #[serde(flatten)]
    pub payment: PaymentBody,
}

/// POST /fee/installments/payment/{installment_id}
pub type InstallmentPaymentBody = PaymentBody;

pub fn assign_student(
    ledger: &mut FeeLedger,
    ctx: &LedgerContext,
    body: AssignStudentBody,
    time: &SafeTimeProvider,
) -> ApiEnvelope<StudentAssignment> {
    body.into_parts()
        .and_then(|(student, year, selection)| ledger.assign_to_student(ctx, student, &year, selection, time))
        .into()
}

pub fn assign_class(
    ledger: &mut FeeLedger,
    ctx: &LedgerContext,
    body: AssignClassBody,
    time: &SafeTimeProvider,
) -> ApiEnvelope<ClassAssignment> {
    parse_year(&body.academic_year)
        .and_then(|year| ledger.assign_to_class(ctx, body.class_id, &year, time))
        .into()
}

pub fn auto_generate_installments(
    ledger: &mut FeeLedger,
    ctx: &LedgerContext,
    body: AutoGenerateBody,
    time: &SafeTimeProvider,
) -> ApiEnvelope<Vec<Installment>> {
    ledger
        .auto_generate_installments(ctx, body.student_fee_id, body.num_installments, body.expected_version, time)
        .into()
}

pub fn create_installments(
    ledger: &mut FeeLedger,
    ctx: &LedgerContext,
    body: ManualPlanBody,
    time: &SafeTimeProvider,
) -> ApiEnvelope<Vec<Installment>> {
    body.entries()
        .and_then(|plan| ledger.create_installment_plan(ctx, body.student_fee_id, plan, body.expected_version, time))
        .into()
}

pub fn record_payment(
    ledger: &mut FeeLedger,
    ctx: &LedgerContext,
    body: RecordPaymentBody,
    time: &SafeTimeProvider,
) -> ApiEnvelope<PaymentOutcome> {
    body.payment
        .into_request(PaymentTarget::Fee(body.student_fee_id))
        .and_then(|request| ledger.record_payment(ctx, request, time))
        .into()
}

pub fn pay_installment(
    ledger: &mut FeeLedger,
    ctx: &LedgerContext,
    installment_id: InstallmentId,
    body: InstallmentPaymentBody,
    time: &SafeTimeProvider,
) -> ApiEnvelope<PaymentOutcome> {
    body.into_request(PaymentTarget::Installment(installment_id))
        .and_then(|request| ledger.record_payment(ctx, request, time))
        .into()
}

/// GET /fee/search-student?q=
pub fn search_students(ledger: &FeeLedger, ctx: &LedgerContext, query: &str) -> ApiEnvelope<Vec<Student>> {
    ledger
        .roster()
        .search_students(ctx, query)
        .map(|found| found.into_iter().cloned().collect())
        .into()
}

/// DELETE /fee/structure/delete-class/{class_id}/{academic_year}
pub fn delete_class_structures(
    ledger: &mut FeeLedger,
    ctx: &LedgerContext,
    class_id: ClassId,
    academic_year: &str,
    time: &SafeTimeProvider,
) -> ApiEnvelope<Vec<FeeStructureId>> {
    parse_year(academic_year)
        .and_then(|year| ledger.delete_class_fee_structures(ctx, class_id, &year, time))
        .into()
}

/// GET /fee/summary/{student_id}?academic_year=
pub fn fee_summary(
    ledger: &FeeLedger,
    ctx: &LedgerContext,
    student_id: StudentId,
    academic_year: &str,
) -> ApiEnvelope<FeeSummary> {
    parse_year(academic_year)
        .and_then(|year| ledger.summarize(ctx, student_id, &year))
        .into()
}
