use chrono::{Months, NaiveDate};

use crate::config::InstallmentConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

use super::InstallmentPlanEntry;

/// equal split of `total` into `count` monthly installments
///
/// shares are truncated to whole paise and the last installment takes the
/// remainder, so the amounts always sum to `total` and the last one is never
/// the smallest. the first due date falls `first_due_offset_months` after
/// `anchor`, then one month apart (clamped to month end, 31 Jan -> 28 Feb).
pub fn equal_split(
    total: Money,
    count: u32,
    anchor: NaiveDate,
    config: &InstallmentConfig,
) -> Result<Vec<InstallmentPlanEntry>> {
    if count < config.min_count || count > config.max_count {
        return Err(LedgerError::validation(
            "num_installments",
            format!(
                "must be between {} and {}, got {}",
                config.min_count, config.max_count, count
            ),
        ));
    }
    if total < Money::from_minor(i64::from(count)) {
        return Err(LedgerError::validation(
            "num_installments",
            format!("{} cannot be split into {} installments of at least 0.01", total, count),
        ));
    }

    total
        .split_even(count)
        .into_iter()
        .enumerate()
        .map(|(i, amount)| -> Result<InstallmentPlanEntry> {
            let months = u32::try_from(i)
                .ok()
                .and_then(|i| config.first_due_offset_months.checked_add(i));
            Ok(InstallmentPlanEntry {
                installment_name: format!("{} {}", config.name_prefix, i + 1),
                amount,
                due_date: months_after(anchor, months)?,
            })
        })
        .collect()
}

/// three terms due 3, 6 and 9 months after `anchor`, the starting point a
/// clerk edits into a manual plan; the last term takes the remainder
pub fn term_plan(total: Money, anchor: NaiveDate) -> Result<Vec<InstallmentPlanEntry>> {
    if total < Money::from_minor(3) {
        return Err(LedgerError::validation(
            "amount",
            format!("{} cannot be split into 3 terms of at least 0.01", total),
        ));
    }
    total
        .split_even(3)
        .into_iter()
        .zip(1u32..)
        .map(|(amount, term)| -> Result<InstallmentPlanEntry> {
            Ok(InstallmentPlanEntry {
                installment_name: format!("Term {}", term),
                amount,
                due_date: months_after(anchor, Some(term * 3))?,
            })
        })
        .collect()
}

fn months_after(anchor: NaiveDate, months: Option<u32>) -> Result<NaiveDate> {
    months
        .and_then(|m| anchor.checked_add_months(Months::new(m)))
        .ok_or_else(|| {
            LedgerError::validation(
                "due_date",
                format!("{} plus {:?} months is out of range", anchor, months),
            )
        })
}

/// check a hand-written plan against the fee total
///
/// returns the plan with any gap inside the tolerance folded into the last
/// entry, so the stored schedule sums to the total exactly
pub fn validate_plan(
    total: Money,
    mut plan: Vec<InstallmentPlanEntry>,
    config: &InstallmentConfig,
) -> Result<Vec<InstallmentPlanEntry>> {
    if plan.is_empty() {
        return Err(LedgerError::validation(
            "installment_plan",
            "plan needs at least one installment",
        ));
    }
    if plan.len() > config.max_count as usize {
        return Err(LedgerError::validation(
            "installment_plan",
            format!("at most {} installments, got {}", config.max_count, plan.len()),
        ));
    }

    for (i, entry) in plan.iter_mut().enumerate() {
        let trimmed = entry.installment_name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation(
                "installment_name",
                format!("installment {} has no name", i + 1),
            ));
        }
        entry.installment_name = trimmed.to_string();
        if !entry.amount.is_positive() {
            return Err(LedgerError::validation(
                "amount",
                format!("installment {} must be greater than zero", i + 1),
            ));
        }
    }

    if let Some(pair) = plan.windows(2).find(|w| w[1].due_date < w[0].due_date) {
        return Err(LedgerError::validation(
            "due_date",
            format!(
                "'{}' is due {} before '{}' on {}",
                pair[1].installment_name, pair[1].due_date, pair[0].installment_name, pair[0].due_date
            ),
        ));
    }

    let sum: Money = plan.iter().map(|e| e.amount).sum();
    let gap = total - sum;
    if gap.abs() > config.plan_tolerance {
        return Err(LedgerError::validation(
            "installment_plan",
            format!("installments sum to {} but the fee total is {}", sum, total),
        ));
    }
    if !gap.is_zero() {
        if let Some(last) = plan.last_mut() {
            let adjusted = last.amount + gap;
            if !adjusted.is_positive() {
                return Err(LedgerError::validation(
                    "amount",
                    "last installment would drop to zero after rounding",
                ));
            }
            last.amount = adjusted;
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(name: &str, amount: &str, due: NaiveDate) -> InstallmentPlanEntry {
        InstallmentPlanEntry {
            installment_name: name.to_string(),
            amount: Money::from_str_exact(amount).unwrap(),
            due_date: due,
        }
    }

    fn amounts(plan: &[InstallmentPlanEntry]) -> Vec<String> {
        plan.iter().map(|e| e.amount.to_string()).collect()
    }

    #[test]
    fn test_huge_offset_is_an_error_not_an_overflow() {
        let config = InstallmentConfig {
            first_due_offset_months: u32::MAX,
            ..InstallmentConfig::default()
        };
        let err = equal_split(Money::from_major(900), 3, date(2025, 4, 1), &config).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "due_date"));
    }

    #[test]
    fn test_term_plan_preset() {
        let plan = term_plan(Money::from_major(10_000), date(2025, 4, 1)).unwrap();
        let names: Vec<_> = plan.iter().map(|e| e.installment_name.as_str()).collect();
        assert_eq!(names, vec!["Term 1", "Term 2", "Term 3"]);
        assert_eq!(amounts(&plan), vec!["3333.33", "3333.33", "3333.34"]);
        assert_eq!(
            plan.iter().map(|e| e.due_date).collect::<Vec<_>>(),
            vec![date(2025, 7, 1), date(2025, 10, 1), date(2026, 1, 1)]
        );

        // feeds straight into the manual plan check
        let checked = validate_plan(Money::from_major(10_000), plan, &InstallmentConfig::default()).unwrap();
        assert_eq!(checked.len(), 3);

        assert!(term_plan(Money::from_minor(2), date(2025, 4, 1)).is_err());
    }

    #[test]
    fn test_even_split_of_9000() {
        let config = InstallmentConfig::default();
        let plan = equal_split(Money::from_major(9_000), 3, date(2025, 4, 1), &config).unwrap();
        assert_eq!(amounts(&plan), vec!["3000.00", "3000.00", "3000.00"]);
        assert_eq!(plan[0].installment_name, "Installment 1");
        assert_eq!(plan[0].due_date, date(2025, 5, 1));
        assert_eq!(plan[2].due_date, date(2025, 7, 1));
    }

    #[test]
    fn test_remainder_lands_on_last() {
        let config = InstallmentConfig::default();
        let plan = equal_split(Money::from_major(10_000), 3, date(2025, 4, 1), &config).unwrap();
        assert_eq!(amounts(&plan), vec!["3333.33", "3333.33", "3333.34"]);
    }

    #[test]
    fn test_month_end_anchor_clamps() {
        let config = InstallmentConfig::default();
        let plan = equal_split(Money::from_major(400), 4, date(2025, 12, 31), &config).unwrap();
        let dues: Vec<_> = plan.iter().map(|e| e.due_date).collect();
        assert_eq!(
            dues,
            vec![date(2026, 1, 31), date(2026, 2, 28), date(2026, 3, 31), date(2026, 4, 30)]
        );
    }

    #[test]
    fn test_count_bounds() {
        let config = InstallmentConfig::default();
        let anchor = date(2025, 4, 1);
        assert!(equal_split(Money::from_major(100), 1, anchor, &config).is_err());
        assert!(equal_split(Money::from_major(100), 13, anchor, &config).is_err());
        assert!(equal_split(Money::from_major(100), 12, anchor, &config).is_ok());
        // three paise cannot feed four installments
        assert!(equal_split(Money::from_minor(3), 4, anchor, &config).is_err());
    }

    #[test]
    fn test_manual_plan_within_tolerance_is_squared_up() {
        let config = InstallmentConfig::default();
        let plan = vec![
            entry("Term 1", "3333.33", date(2025, 5, 1)),
            entry("Term 2", "3333.33", date(2025, 8, 1)),
            entry("Term 3", "3333.33", date(2025, 11, 1)),
        ];
        let plan = validate_plan(Money::from_major(10_000), plan, &config).unwrap();
        assert_eq!(amounts(&plan), vec!["3333.33", "3333.33", "3333.34"]);
    }

    #[test]
    fn test_manual_plan_rejections() {
        let config = InstallmentConfig::default();
        let total = Money::from_major(1_000);

        let short = vec![
            entry("A", "400.00", date(2025, 5, 1)),
            entry("B", "599.98", date(2025, 6, 1)),
        ];
        assert!(matches!(
            validate_plan(total, short, &config),
            Err(LedgerError::Validation { ref field, .. }) if field == "installment_plan"
        ));

        let unordered = vec![
            entry("A", "500.00", date(2025, 6, 1)),
            entry("B", "500.00", date(2025, 5, 1)),
        ];
        assert!(matches!(
            validate_plan(total, unordered, &config),
            Err(LedgerError::Validation { ref field, .. }) if field == "due_date"
        ));

        let unnamed = vec![entry("  ", "1000.00", date(2025, 5, 1))];
        assert!(validate_plan(total, unnamed, &config).is_err());

        let zero = vec![
            entry("A", "1000.00", date(2025, 5, 1)),
            entry("B", "0.00", date(2025, 6, 1)),
        ];
        assert!(validate_plan(total, zero, &config).is_err());

        assert!(validate_plan(total, Vec::new(), &config).is_err());
    }

    #[test]
    fn test_single_entry_manual_plan_allowed() {
        let config = InstallmentConfig::default();
        let plan = vec![entry("Full", "1000.00", date(2025, 5, 1))];
        assert!(validate_plan(Money::from_major(1_000), plan, &config).is_ok());
    }
}
