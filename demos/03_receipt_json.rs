/// receipt json - regenerate a receipt and round-trip the ledger through json
use chrono::{TimeZone, Utc};
use fee_ledger_rs::{
    amount_in_words, format_inr, AcademicYear, FeeLedger, FeeSelection, FeeStructureDraft,
    FeeType, JsonReceiptRenderer, LedgerConfig, LedgerContext, Money, NewStudent, PaymentDetails,
    PaymentMode, PaymentRequest, PaymentTarget, ReceiptRenderer, SafeTimeProvider, TimeSource,
    Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 7, 15, 10, 30, 0).unwrap()
    ));
    let ctx = LedgerContext::new(Uuid::new_v4(), Uuid::new_v4());
    let year = AcademicYear::parse("2025-26")?;
    let config = LedgerConfig::from_json(r#"{ "receipt": { "prefix": "SVS" } }"#)?;
    let mut ledger = FeeLedger::new(config)?;

    let class = ledger.roster_mut().add_class(&ctx, "Grade 10")?;
    let student = ledger.roster_mut().enroll_student(
        &ctx,
        NewStudent {
            name: "Asha Verma".into(),
            roll_no: Some("17".into()),
            father_name: Some("Rakesh Verma".into()),
            phone: Some("98xxxxxx10".into()),
            class_id: Some(class.id),
            section: Some("A".into()),
            ..Default::default()
        },
    )?;
    ledger.create_fee_structure(
        &ctx,
        FeeStructureDraft {
            class_id: class.id,
            academic_year: year.clone(),
            fee_name: "Annual Fee".into(),
            fee_type: FeeType::Tuition,
            amount: Money::from_str_exact("2469.00")?,
            is_mandatory: true,
            description: None,
        },
        &time,
    )?;
    let fee_id = ledger
        .assign_to_student(&ctx, student.id, &year, FeeSelection::MandatoryOnly, &time)?
        .student_fee_ids[0];

    let outcome = ledger.record_payment(
        &ctx,
        PaymentRequest {
            details: PaymentDetails {
                cheque_number: Some("004512".into()),
                bank_name: Some("State Bank".into()),
                ..Default::default()
            },
            ..PaymentRequest::new(PaymentTarget::Fee(fee_id), Money::from_str_exact("1234.50")?, PaymentMode::Cheque)
        },
        &time,
    )?;
    println!("{} -> {}", format_inr(outcome.payment.amount_paid), amount_in_words(outcome.payment.amount_paid));

    // persist and restore, then rebuild the receipt from the restored ledger
    let json = ledger.to_json()?;
    let restored = FeeLedger::from_json(&json)?;
    let document = restored.regenerate_receipt(&ctx, &outcome.receipt_number)?;

    let renderer = JsonReceiptRenderer { pretty: true };
    let bytes = renderer.render(&document)?;
    println!("{} ({} bytes)", renderer.content_type(), bytes.len());
    println!("{}", String::from_utf8(bytes)?);

    Ok(())
}
