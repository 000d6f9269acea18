pub mod split;

#[cfg(test)]
mod split_props;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::ledger::FeeLedger;
use crate::student_fee::{ensure_payable, FeeAccount, StudentFee};
use crate::types::{FeeStatus, InstallmentId, StudentFeeId};

pub use split::{equal_split, term_plan, validate_plan};

/// a dated sub-portion of a student fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub student_fee_id: StudentFeeId,
    pub installment_number: u32,
    pub installment_name: String,
    pub amount: Money,
    pub paid_amount: Money,
    pub balance_amount: Money,
    pub due_date: NaiveDate,
    pub status: FeeStatus,
}

impl Installment {
    pub fn new(student_fee_id: StudentFeeId, installment_number: u32, entry: InstallmentPlanEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_fee_id,
            installment_number,
            installment_name: entry.installment_name,
            amount: entry.amount,
            paid_amount: Money::ZERO,
            balance_amount: entry.amount,
            due_date: entry.due_date,
            status: FeeStatus::Pending,
        }
    }

    /// amount = paid + balance, neither negative
    pub fn is_balanced(&self) -> bool {
        self.amount == self.paid_amount + self.balance_amount
            && !self.paid_amount.is_negative()
            && !self.balance_amount.is_negative()
    }

    pub fn apply_payment(&mut self, amount: Money) -> Result<()> {
        ensure_payable(amount, self.balance_amount)?;
        self.paid_amount += amount;
        self.balance_amount -= amount;
        self.status = FeeStatus::derive(self.amount, self.paid_amount, self.balance_amount);
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.balance_amount.is_positive() && self.due_date < today
    }
}

/// one line of a plan, before it becomes an installment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentPlanEntry {
    pub installment_name: String,
    pub amount: Money,
    pub due_date: NaiveDate,
}

impl FeeLedger {
    /// split the fee into `count` equal monthly installments, anchored on the
    /// date the fee was assigned
    pub fn auto_generate_installments(
        &mut self,
        ctx: &LedgerContext,
        student_fee_id: StudentFeeId,
        count: u32,
        expected_version: Option<u32>,
        time: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        let account = self.plannable(ctx, student_fee_id, expected_version)?;
        let plan = equal_split(
            account.fee.total_amount,
            count,
            account.fee.assigned_on,
            &self.config.installments,
        )?;
        debug!(
            student_fee_id = %student_fee_id,
            amounts = ?plan.iter().map(|e| e.amount.to_string()).collect::<Vec<_>>(),
            "equal split computed"
        );
        self.install_plan(ctx, account, plan, time)
    }

    /// install a hand-written schedule; nothing is stored unless every entry
    /// is valid and the amounts add up to the fee total
    pub fn create_installment_plan(
        &mut self,
        ctx: &LedgerContext,
        student_fee_id: StudentFeeId,
        plan: Vec<InstallmentPlanEntry>,
        expected_version: Option<u32>,
        time: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        let account = self.plannable(ctx, student_fee_id, expected_version)?;
        let plan = validate_plan(account.fee.total_amount, plan, &self.config.installments)
            .map_err(|e| {
                warn!(student_fee_id = %student_fee_id, error = %e, "installment plan rejected");
                e
            })?;
        self.install_plan(ctx, account, plan, time)
    }

    /// installments of a fee ordered by number
    pub fn installments_for(
        &self,
        ctx: &LedgerContext,
        student_fee_id: StudentFeeId,
    ) -> Result<&[Installment]> {
        Ok(&self.account(ctx, student_fee_id)?.installments)
    }

    /// an installment together with the fee that owns it
    pub fn installment(
        &self,
        ctx: &LedgerContext,
        id: InstallmentId,
    ) -> Result<(&StudentFee, &Installment)> {
        let not_found = || LedgerError::not_found("installment", id);
        let owner = self.installment_owner.get(&id).ok_or_else(not_found)?;
        let account = self.account(ctx, *owner).map_err(|_| not_found())?;
        let installment = account
            .installments
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(not_found)?;
        Ok((&account.fee, installment))
    }

    /// staged copy of an account that may receive a new schedule
    fn plannable(
        &self,
        ctx: &LedgerContext,
        student_fee_id: StudentFeeId,
        expected_version: Option<u32>,
    ) -> Result<FeeAccount> {
        let account = self.account(ctx, student_fee_id)?;
        account.fee.check_version(expected_version)?;

        if account.installments.iter().any(|i| i.paid_amount.is_positive()) {
            return Err(LedgerError::conflict(format!(
                "installments of fee {} already carry payments",
                student_fee_id
            )));
        }
        if account.fee.paid_amount.is_positive() {
            return Err(LedgerError::conflict(format!(
                "fee {} already has a direct payment of {}",
                student_fee_id, account.fee.paid_amount
            )));
        }
        Ok(account.clone())
    }

    fn install_plan(
        &mut self,
        ctx: &LedgerContext,
        mut account: FeeAccount,
        plan: Vec<InstallmentPlanEntry>,
        time: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        let fee_id = account.fee.id;
        let replaced = account.installments.len() as u32;

        account.installments = plan
            .into_iter()
            .zip(1..)
            .map(|(entry, number)| Installment::new(fee_id, number, entry))
            .collect();
        account.fee.has_installments = true;
        account.fee.reconcile(&account.installments)?;
        account.fee.version += 1;

        let installments = account.installments.clone();
        let (first, last) = match (installments.first(), installments.last()) {
            (Some(first), Some(last)) => (first.due_date, last.due_date),
            _ => return Err(LedgerError::validation("installment_plan", "plan is empty")),
        };

        self.commit_account(account)?;

        self.events.emit(Event::InstallmentsPlanned {
            student_fee_id: fee_id,
            count: installments.len() as u32,
            first_due_date: first,
            last_due_date: last,
            replaced,
            planned_by: ctx.user_id,
            timestamp: time.now(),
        });
        info!(
            student_fee_id = %fee_id,
            count = installments.len(),
            replaced,
            "installments planned"
        );
        Ok(installments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::FeeSelection;
    use crate::ledger::test_support::Fixture;
    use crate::payments::{PaymentRequest, PaymentTarget};
    use crate::types::{FeeType, PaymentMode};

    fn assigned_fee(fx: &mut Fixture, amount: i64) -> StudentFeeId {
        let class = fx.class("Grade 8");
        fx.structure(class, "Tuition Fee", FeeType::Tuition, amount, true);
        let student = fx.student("Asha", Some(class));
        fx.ledger
            .assign_to_student(&fx.ctx, student, &fx.year, FeeSelection::MandatoryOnly, &fx.time)
            .unwrap()
            .student_fee_ids[0]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_auto_generate_marks_fee_and_numbers_installments() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 10_000);

        let plan = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 3, None, &fx.time)
            .unwrap();
        let amounts: Vec<_> = plan.iter().map(|i| i.amount.to_string()).collect();
        assert_eq!(amounts, vec!["3333.33", "3333.33", "3333.34"]);
        assert_eq!(plan.iter().map(|i| i.installment_number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(plan.iter().all(|i| i.status == FeeStatus::Pending && i.balance_amount == i.amount));

        let fee = fx.ledger.student_fee(&fx.ctx, fee_id).unwrap();
        assert!(fee.has_installments);
        assert_eq!(fee.version, 1);
        assert_eq!(fx.ledger.installments_for(&fx.ctx, fee_id).unwrap().len(), 3);
    }

    #[test]
    fn test_out_of_range_count_rejected() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        for n in [0, 1, 13] {
            let err = fx
                .ledger
                .auto_generate_installments(&fx.ctx, fee_id, n, None, &fx.time)
                .unwrap_err();
            assert!(matches!(err, LedgerError::Validation { .. }));
        }
        assert!(!fx.ledger.student_fee(&fx.ctx, fee_id).unwrap().has_installments);
    }

    #[test]
    fn test_manual_plan_mismatch_creates_nothing() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        let before = fx.ledger.events.len();

        let plan = vec![
            InstallmentPlanEntry {
                installment_name: "Term 1".into(),
                amount: Money::from_major(4_000),
                due_date: date(2025, 6, 1),
            },
            InstallmentPlanEntry {
                installment_name: "Term 2".into(),
                amount: Money::from_major(4_000),
                due_date: date(2025, 10, 1),
            },
        ];
        let err = fx
            .ledger
            .create_installment_plan(&fx.ctx, fee_id, plan, None, &fx.time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert!(fx.ledger.installments_for(&fx.ctx, fee_id).unwrap().is_empty());
        assert_eq!(fx.ledger.events.len(), before);
    }

    #[test]
    fn test_manual_plan_installed() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        let plan = vec![
            InstallmentPlanEntry {
                installment_name: "Term 1".into(),
                amount: Money::from_major(5_000),
                due_date: date(2025, 6, 1),
            },
            InstallmentPlanEntry {
                installment_name: "Term 2".into(),
                amount: Money::from_major(4_000),
                due_date: date(2025, 10, 1),
            },
        ];
        let created = fx
            .ledger
            .create_installment_plan(&fx.ctx, fee_id, plan, Some(0), &fx.time)
            .unwrap();
        assert_eq!(created[1].installment_name, "Term 2");
        assert_eq!(created[1].due_date, date(2025, 10, 1));
    }

    #[test]
    fn test_replan_before_payment_replaces_schedule() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        let first = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 3, None, &fx.time)
            .unwrap();
        fx.ledger
            .auto_generate_installments(&fx.ctx, fee_id, 4, None, &fx.time)
            .unwrap();

        let current = fx.ledger.installments_for(&fx.ctx, fee_id).unwrap();
        assert_eq!(current.len(), 4);
        assert!(fx.ledger.installment(&fx.ctx, first[0].id).is_err());
        assert!(fx.ledger.installment(&fx.ctx, current[0].id).is_ok());
    }

    #[test]
    fn test_replan_after_payment_conflicts() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        let plan = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 3, None, &fx.time)
            .unwrap();
        fx.ledger
            .record_payment(
                &fx.ctx,
                PaymentRequest::new(PaymentTarget::Installment(plan[0].id), Money::from_major(500), PaymentMode::Cash),
                &fx.time,
            )
            .unwrap();

        let err = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 2, None, &fx.time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
        assert_eq!(fx.ledger.installments_for(&fx.ctx, fee_id).unwrap().len(), 3);
    }

    #[test]
    fn test_plan_after_direct_payment_conflicts() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        fx.ledger
            .record_payment(
                &fx.ctx,
                PaymentRequest::new(PaymentTarget::Fee(fee_id), Money::from_major(1_000), PaymentMode::Cash),
                &fx.time,
            )
            .unwrap();
        let err = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 3, None, &fx.time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn test_stale_version_conflicts() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        fx.ledger
            .auto_generate_installments(&fx.ctx, fee_id, 3, Some(0), &fx.time)
            .unwrap();
        let err = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 2, Some(0), &fx.time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn test_discounted_fee_keeps_full_schedule() {
        let mut fx = Fixture::new();
        let fee_id = assigned_fee(&mut fx, 9_000);
        fx.ledger
            .apply_discount(&fx.ctx, fee_id, Money::from_major(900), "sibling", None, &fx.time)
            .unwrap();
        let plan = fx
            .ledger
            .auto_generate_installments(&fx.ctx, fee_id, 3, None, &fx.time)
            .unwrap();
        assert_eq!(plan.iter().map(|i| i.amount).sum::<Money>(), Money::from_major(9_000));

        let fee = fx.ledger.student_fee(&fx.ctx, fee_id).unwrap();
        assert_eq!(fee.balance_amount, Money::from_major(8_100));
        assert!(fee.is_balanced());
    }

    #[test]
    fn test_overdue_flag() {
        let inst = Installment::new(
            Uuid::new_v4(),
            1,
            InstallmentPlanEntry {
                installment_name: "Installment 1".into(),
                amount: Money::from_major(100),
                due_date: date(2025, 5, 1),
            },
        );
        assert!(!inst.is_overdue(date(2025, 5, 1)));
        assert!(inst.is_overdue(date(2025, 5, 2)));
    }
}
