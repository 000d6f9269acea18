/// quick start - assign a fee, pay it, print the summary
use fee_ledger_rs::{
    AcademicYear, FeeLedger, FeeSelection, FeeStructureDraft, FeeType, LedgerConfig,
    LedgerContext, Money, NewStudent, PaymentMode, PaymentRequest, PaymentTarget,
    SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let time = SafeTimeProvider::new(TimeSource::System);
    let ctx = LedgerContext::new(Uuid::new_v4(), Uuid::new_v4());
    let year = AcademicYear::parse("2025-26")?;
    let mut ledger = FeeLedger::new(LedgerConfig::default())?;

    let class = ledger.roster_mut().add_class(&ctx, "Grade 3")?;
    let student = ledger.roster_mut().enroll_student(
        &ctx,
        NewStudent {
            name: "Asha Verma".into(),
            class_id: Some(class.id),
            ..Default::default()
        },
    )?;

    ledger.create_fee_structure(
        &ctx,
        FeeStructureDraft {
            class_id: class.id,
            academic_year: year.clone(),
            fee_name: "Tuition Fee".into(),
            fee_type: FeeType::Tuition,
            amount: Money::from_major(9_000),
            is_mandatory: true,
            description: None,
        },
        &time,
    )?;

    let assigned = ledger.assign_to_student(&ctx, student.id, &year, FeeSelection::MandatoryOnly, &time)?;
    let fee_id = assigned.student_fee_ids[0];

    let outcome = ledger.record_payment(
        &ctx,
        PaymentRequest::new(PaymentTarget::Fee(fee_id), Money::from_major(9_000), PaymentMode::Cash),
        &time,
    )?;
    println!("receipt: {}", outcome.receipt_number);

    let summary = ledger.summarize(&ctx, student.id, &year)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
