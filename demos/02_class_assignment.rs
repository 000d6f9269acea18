/// class assignment - bulk assignment with per-student failures, twice
use chrono::{TimeZone, Utc};
use fee_ledger_rs::{
    AcademicYear, FeeLedger, FeeStructureDraft, FeeType, LedgerConfig, LedgerContext, Money,
    NewStudent, SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()
    ));
    let ctx = LedgerContext::new(Uuid::new_v4(), Uuid::new_v4());
    let year = AcademicYear::parse("2025-26")?;
    let mut ledger = FeeLedger::new(LedgerConfig::default())?;

    let class = ledger.roster_mut().add_class(&ctx, "Grade 6")?;
    for (name, fee_type, amount, mandatory) in [
        ("Tuition Fee", FeeType::Tuition, 12_000, true),
        ("Exam Fee", FeeType::Exam, 1_500, true),
        ("Bus Fee", FeeType::Transport, 6_000, false),
    ] {
        ledger.create_fee_structure(
            &ctx,
            FeeStructureDraft {
                class_id: class.id,
                academic_year: year.clone(),
                fee_name: name.into(),
                fee_type,
                amount: Money::from_major(amount),
                is_mandatory: mandatory,
                description: None,
            },
            &time,
        )?;
    }

    for (roll, name, profile_pending) in [("01", "Asha", false), ("02", "Kabir", false), ("03", "Meera", true)] {
        ledger.roster_mut().enroll_student(
            &ctx,
            NewStudent {
                name: name.into(),
                roll_no: Some(roll.into()),
                class_id: Some(class.id),
                profile_pending,
                ..Default::default()
            },
        )?;
    }

    let first = ledger.assign_to_class(&ctx, class.id, &year, &time)?;
    println!("first run:  {}", serde_json::to_string(&first)?);

    let second = ledger.assign_to_class(&ctx, class.id, &year, &time)?;
    println!("second run: {}", serde_json::to_string(&second)?);

    for group in ledger.summarize_catalog(&ctx, &year) {
        println!(
            "{}: mandatory {} optional {} total {}",
            group.class_name, group.mandatory_total, group.optional_total, group.total_amount
        );
    }

    Ok(())
}
