/// installments - equal split, a manual plan, and paying one installment
use chrono::{NaiveDate, TimeZone, Utc};
use fee_ledger_rs::{
    AcademicYear, FeeLedger, FeeSelection, FeeStructureDraft, FeeType, InstallmentPlanEntry,
    LedgerConfig, LedgerContext, Money, NewStudent, PaymentMode, PaymentRequest, PaymentTarget,
    SafeTimeProvider, TimeSource, Uuid,
};

fn tuition(class_id: Uuid, year: &AcademicYear, name: &str, amount: i64) -> FeeStructureDraft {
    FeeStructureDraft {
        class_id,
        academic_year: year.clone(),
        fee_name: name.into(),
        fee_type: FeeType::Tuition,
        amount: Money::from_major(amount),
        is_mandatory: true,
        description: None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== installments example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()
    ));
    let ctx = LedgerContext::new(Uuid::new_v4(), Uuid::new_v4());
    let year = AcademicYear::parse("2025-26")?;
    let mut ledger = FeeLedger::new(LedgerConfig::default())?;

    let class = ledger.roster_mut().add_class(&ctx, "Grade 8")?;
    let student = ledger.roster_mut().enroll_student(
        &ctx,
        NewStudent {
            name: "Ravi Kumar".into(),
            class_id: Some(class.id),
            ..Default::default()
        },
    )?;
    ledger.create_fee_structure(&ctx, tuition(class.id, &year, "Tuition Fee", 10_000), &time)?;
    ledger.create_fee_structure(&ctx, tuition(class.id, &year, "Hostel Fee", 24_000), &time)?;

    let assigned = ledger.assign_to_student(&ctx, student.id, &year, FeeSelection::MandatoryOnly, &time)?;
    let (mut hostel, mut tuition_fee) = (None, None);
    for id in assigned.student_fee_ids {
        match ledger.student_fee(&ctx, id)?.fee_name.as_str() {
            "Hostel Fee" => hostel = Some(id),
            _ => tuition_fee = Some(id),
        }
    }
    let (hostel, tuition_fee) = match (hostel, tuition_fee) {
        (Some(h), Some(t)) => (h, t),
        _ => return Err("both fees should have been assigned".into()),
    };

    // equal split: the last installment absorbs the remainder
    let plan = ledger.auto_generate_installments(&ctx, tuition_fee, 3, None, &time)?;
    for inst in &plan {
        println!("{:<14} {:>9}  due {}", inst.installment_name, inst.amount, inst.due_date);
    }

    // manual plan for the hostel fee
    let terms = [("Term 1", 12_000, (2025, 6, 1)), ("Term 2", 12_000, (2025, 11, 1))];
    let entries = terms
        .iter()
        .map(|(name, amount, (y, m, d))| {
            NaiveDate::from_ymd_opt(*y, *m, *d)
                .map(|due_date| InstallmentPlanEntry {
                    installment_name: name.to_string(),
                    amount: Money::from_major(*amount),
                    due_date,
                })
                .ok_or("invalid due date")
        })
        .collect::<Result<Vec<_>, _>>()?;
    ledger.create_installment_plan(&ctx, hostel, entries, None, &time)?;

    let outcome = ledger.record_payment(
        &ctx,
        PaymentRequest::new(PaymentTarget::Installment(plan[0].id), plan[0].amount, PaymentMode::Cash),
        &time,
    )?;
    println!(
        "\npaid {} -> fee balance {} ({:?})",
        outcome.payment.amount_paid, outcome.student_fee.balance_amount, outcome.student_fee.status
    );

    // a re-plan is refused once an installment carries money
    if let Err(e) = ledger.auto_generate_installments(&ctx, tuition_fee, 4, None, &time) {
        println!("re-plan refused: {}", e);
    }

    Ok(())
}
