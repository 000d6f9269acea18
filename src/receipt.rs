//! receipt regeneration and rendering

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::installments::Installment;
use crate::ledger::FeeLedger;
use crate::summary::FeeSummary;
use crate::types::{AcademicYear, FeeType, InstallmentId, PaymentMode, UserId};
use crate::words::{amount_in_words, format_currency};

/// everything a document renderer needs to print one receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDocument {
    pub receipt_number: String,
    pub payment_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub academic_year: AcademicYear,
    pub student: StudentView,
    pub fee: FeeView,
    pub payment: PaymentView,
    pub installment_info: Option<InstallmentView>,
    /// the student's whole year at regeneration time
    pub fee_summary: FeeSummary,
    /// schedule of the paid fee, empty when it has none
    pub installments: Vec<Installment>,
    pub amount_in_words: String,
    pub formatted: FormattedAmounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentView {
    pub name: String,
    pub roll_no: Option<String>,
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub father_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeView {
    pub fee_name: String,
    pub fee_type: FeeType,
    pub total_amount: Money,
}

/// figures as they stood when the payment was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentView {
    pub amount_paid: Money,
    pub previous_paid: Money,
    pub balance_after: Money,
    pub payment_mode: PaymentMode,
    pub transaction_id: Option<String>,
    pub cheque_number: Option<String>,
    pub bank_name: Option<String>,
    pub remarks: Option<String>,
    pub collected_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentView {
    pub installment_id: InstallmentId,
    pub installment_number: u32,
    pub installment_name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedAmounts {
    pub total_amount: String,
    pub amount_paid: String,
    pub previous_paid: String,
    pub balance_after: String,
}

impl ReceiptDocument {
    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// turns a receipt document into printable bytes
pub trait ReceiptRenderer {
    fn content_type(&self) -> &'static str;

    fn render(&self, document: &ReceiptDocument) -> Result<Vec<u8>>;
}

/// renders the document as json, for hosts that lay receipts out themselves
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReceiptRenderer {
    pub pretty: bool,
}

impl ReceiptRenderer for JsonReceiptRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, document: &ReceiptDocument) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        Ok(bytes)
    }
}

impl FeeLedger {
    /// rebuild the receipt for an earlier payment from the ledger
    pub fn regenerate_receipt(&self, ctx: &LedgerContext, receipt_number: &str) -> Result<ReceiptDocument> {
        let payment = self.payment_by_receipt(ctx, receipt_number)?;
        let account = self.account(ctx, payment.student_fee_id)?;
        let student = self.roster.student(ctx, payment.student_id)?;
        let class_name = student
            .profile
            .as_ref()
            .and_then(|p| self.roster.class(ctx, p.class_id).ok())
            .map(|c| c.name.clone());

        let installment_info = match payment.installment_id {
            Some(id) => {
                let inst = account
                    .installments
                    .iter()
                    .find(|i| i.id == id)
                    .ok_or_else(|| LedgerError::not_found("installment", id))?;
                Some(InstallmentView {
                    installment_id: inst.id,
                    installment_number: inst.installment_number,
                    installment_name: inst.installment_name.clone(),
                    amount: inst.amount,
                })
            }
            None => None,
        };

        let symbol = &self.config.receipt.currency_symbol;
        let fee = &account.fee;
        let document = ReceiptDocument {
            receipt_number: payment.receipt_number.clone(),
            payment_date: payment.payment_date,
            recorded_at: payment.recorded_at,
            academic_year: payment.academic_year.clone(),
            student: StudentView {
                name: student.name.clone(),
                roll_no: student.roll_no.clone(),
                class_name,
                section: student.profile.as_ref().and_then(|p| p.section.clone()),
                father_name: student.father_name.clone(),
                phone: student.phone.clone(),
            },
            fee: FeeView {
                fee_name: fee.fee_name.clone(),
                fee_type: fee.fee_type,
                total_amount: fee.total_amount,
            },
            payment: PaymentView {
                amount_paid: payment.amount_paid,
                previous_paid: payment.previous_paid,
                balance_after: payment.balance_after,
                payment_mode: payment.payment_mode,
                transaction_id: payment.transaction_id.clone(),
                cheque_number: payment.cheque_number.clone(),
                bank_name: payment.bank_name.clone(),
                remarks: payment.remarks.clone(),
                collected_by: payment.collected_by,
            },
            installment_info,
            fee_summary: self.summarize(ctx, payment.student_id, &payment.academic_year)?,
            installments: account.installments.clone(),
            amount_in_words: amount_in_words(payment.amount_paid),
            formatted: FormattedAmounts {
                total_amount: format_currency(fee.total_amount, symbol),
                amount_paid: format_currency(payment.amount_paid, symbol),
                previous_paid: format_currency(payment.previous_paid, symbol),
                balance_after: format_currency(payment.balance_after, symbol),
            },
        };

        info!(receipt_number = %document.receipt_number, "receipt regenerated");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::FeeSelection;
    use crate::ledger::test_support::Fixture;
    use crate::payments::{PaymentDetails, PaymentRequest, PaymentTarget};
    use crate::roster::NewStudent;

    fn paid_installment() -> (Fixture, String) {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 10");
        fx.structure(class, "Tuition Fee", FeeType::Tuition, 9_000, true);
        let ctx = fx.ctx;
        let student = fx
            .ledger
            .roster_mut()
            .enroll_student(
                &ctx,
                NewStudent {
                    name: "Asha Verma".into(),
                    roll_no: Some("17".into()),
                    father_name: Some("Rakesh Verma".into()),
                    class_id: Some(class),
                    section: Some("A".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .id;
        let fee_id = fx
            .ledger
            .assign_to_student(&fx.ctx, student, &fx.year, FeeSelection::MandatoryOnly, &fx.time)
            .unwrap()
            .student_fee_ids[0];
        let plan = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 3, None, &fx.time)
            .unwrap();

        let request = PaymentRequest {
            details: PaymentDetails {
                transaction_id: Some("UPI-4471".into()),
                remarks: Some("first term".into()),
                ..Default::default()
            },
            ..PaymentRequest::new(PaymentTarget::Installment(plan[0].id), Money::from_major(3_000), PaymentMode::Upi)
        };
        let receipt = fx.ledger.record_payment(&fx.ctx, request, &fx.time).unwrap().receipt_number;
        (fx, receipt)
    }

    #[test]
    fn test_regenerated_receipt_is_complete() {
        let (fx, receipt) = paid_installment();
        let doc = fx.ledger.regenerate_receipt(&fx.ctx, &receipt).unwrap();

        assert_eq!(doc.receipt_number, receipt);
        assert_eq!(doc.student.name, "Asha Verma");
        assert_eq!(doc.student.class_name.as_deref(), Some("Grade 10"));
        assert_eq!(doc.student.section.as_deref(), Some("A"));
        assert_eq!(doc.fee.total_amount, Money::from_major(9_000));
        assert_eq!(doc.payment.amount_paid, Money::from_major(3_000));
        assert_eq!(doc.payment.previous_paid, Money::ZERO);
        assert_eq!(doc.payment.balance_after, Money::from_major(6_000));
        assert_eq!(doc.payment.transaction_id.as_deref(), Some("UPI-4471"));
        assert_eq!(doc.installment_info.as_ref().map(|i| i.installment_number), Some(1));
        assert_eq!(doc.installments.len(), 3);
        assert_eq!(doc.fee_summary.total_paid, Money::from_major(3_000));
        assert_eq!(doc.amount_in_words, "Three Thousand Rupees Only");
        assert_eq!(doc.formatted.balance_after, "₹6,000.00");
    }

    #[test]
    fn test_figures_frozen_at_payment_time() {
        let (mut fx, receipt) = paid_installment();
        let second = fx.ledger.installments_for(&fx.ctx, fx.ledger.payment_by_receipt(&fx.ctx, &receipt).unwrap().student_fee_id).unwrap()[1].id;
        fx.ledger
            .record_payment(
                &fx.ctx,
                PaymentRequest::new(PaymentTarget::Installment(second), Money::from_major(3_000), PaymentMode::Cash),
                &fx.time,
            )
            .unwrap();

        let doc = fx.ledger.regenerate_receipt(&fx.ctx, &receipt).unwrap();
        assert_eq!(doc.payment.balance_after, Money::from_major(6_000));
        assert_eq!(doc.fee_summary.balance, Money::from_major(3_000));
    }

    #[test]
    fn test_json_renderer() {
        let (fx, receipt) = paid_installment();
        let doc = fx.ledger.regenerate_receipt(&fx.ctx, &receipt).unwrap();

        let renderer = JsonReceiptRenderer::default();
        assert_eq!(renderer.content_type(), "application/json");
        let bytes = renderer.render(&doc).unwrap();
        let back: ReceiptDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, doc);

        let pretty = doc.to_json_pretty().unwrap();
        assert!(pretty.contains("\"payment_mode\": \"UPI\""));
    }

    #[test]
    fn test_unknown_receipt() {
        let (fx, _) = paid_installment();
        assert!(matches!(
            fx.ledger.regenerate_receipt(&fx.ctx, "RCPT-20250401-000099"),
            Err(LedgerError::NotFound { .. })
        ));
    }
}
