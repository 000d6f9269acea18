//! Property-based tests for installment splitting and reconciliation.
//!
//! - equal split reproduces the fee total exactly
//! - the remainder only ever lands on the last installment
//! - total = paid + balance + discount survives any payment sequence

use chrono::NaiveDate;
use proptest::prelude::*;
use uuid::Uuid;

use super::{equal_split, Installment};
use crate::config::InstallmentConfig;
use crate::decimal::Money;
use crate::student_fee::StudentFee;
use crate::types::{AcademicYear, FeeStatus, FeeType};

/// 0.01 to 10,00,00,000.00
fn fee_total() -> impl Strategy<Value = Money> {
    (1i64..10_000_000_000i64).prop_map(Money::from_minor)
}

fn installment_count() -> impl Strategy<Value = u32> {
    2u32..=12
}

fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
}

fn ledger_row(total: Money) -> StudentFee {
    StudentFee {
        id: Uuid::new_v4(),
        school_id: Uuid::new_v4(),
        student_id: Uuid::new_v4(),
        fee_structure_id: Uuid::new_v4(),
        academic_year: AcademicYear::parse("2025-26").unwrap(),
        fee_name: "Tuition Fee".to_string(),
        fee_type: FeeType::Tuition,
        total_amount: total,
        paid_amount: Money::ZERO,
        balance_amount: total,
        discount_amount: Money::ZERO,
        status: FeeStatus::Pending,
        has_installments: true,
        assigned_on: anchor(),
        version: 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_split_sums_to_total(total in fee_total(), n in installment_count()) {
        prop_assume!(total >= Money::from_minor(i64::from(n)));
        let plan = equal_split(total, n, anchor(), &InstallmentConfig::default()).unwrap();

        prop_assert_eq!(plan.len(), n as usize);
        let sum: Money = plan.iter().map(|e| e.amount).sum();
        prop_assert_eq!(sum, total);
    }

    #[test]
    fn prop_remainder_only_on_last(total in fee_total(), n in installment_count()) {
        prop_assume!(total >= Money::from_minor(i64::from(n)));
        let plan = equal_split(total, n, anchor(), &InstallmentConfig::default()).unwrap();

        let first = plan[0].amount;
        prop_assert!(first.is_positive());
        for entry in &plan[..plan.len() - 1] {
            prop_assert_eq!(entry.amount, first);
        }
        let last = plan[plan.len() - 1].amount;
        prop_assert!(last >= first);
        // the remainder is less than one paisa per installment
        prop_assert!(last - first < Money::from_minor(i64::from(n)));
    }

    #[test]
    fn prop_due_dates_strictly_increase(n in installment_count()) {
        let plan = equal_split(Money::from_major(12_000), n, anchor(), &InstallmentConfig::default()).unwrap();
        prop_assert!(plan.windows(2).all(|w| w[0].due_date < w[1].due_date));
        prop_assert!(plan[0].due_date > anchor());
    }

    #[test]
    fn prop_installment_payments_keep_row_balanced(
        total in (200i64..5_000_000i64).prop_map(Money::from_minor),
        n in installment_count(),
        discount_paise in 0i64..100,
        payments in prop::collection::vec((0usize..12, 1i64..1_000_000), 0..20),
    ) {
        let mut fee = ledger_row(total);
        let discount = Money::from_minor(discount_paise).min(total);
        if discount.is_positive() {
            fee.apply_discount(discount).unwrap();
        }

        let plan = equal_split(total, n, anchor(), &InstallmentConfig::default()).unwrap();
        let mut installments: Vec<Installment> = plan
            .into_iter()
            .zip(1..)
            .map(|(entry, number)| Installment::new(fee.id, number, entry))
            .collect();

        for (index, paise) in payments {
            let index = index % installments.len();
            let amount = Money::from_minor(paise)
                .min(installments[index].balance_amount)
                .min(fee.balance_amount);
            if !amount.is_positive() {
                continue;
            }
            installments[index].apply_payment(amount).unwrap();
            fee.reconcile(&installments).unwrap();

            prop_assert!(fee.is_balanced());
            prop_assert!(installments.iter().all(|i| i.is_balanced()));
            prop_assert_eq!(fee.total_amount, fee.paid_amount + fee.balance_amount + fee.discount_amount);
        }
    }
}
