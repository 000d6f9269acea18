use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::FeeStructure;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::installments::Installment;
use crate::types::{
    AcademicYear, FeeStatus, FeeStructureId, FeeType, SchoolId, StudentFeeId, StudentId,
};

/// a fee assigned to one student (the ledger row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentFee {
    pub id: StudentFeeId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub fee_structure_id: FeeStructureId,
    pub academic_year: AcademicYear,

    // copied from the catalog at assignment time
    pub fee_name: String,
    pub fee_type: FeeType,

    pub total_amount: Money,
    pub paid_amount: Money,
    pub balance_amount: Money,
    pub discount_amount: Money,
    pub status: FeeStatus,
    pub has_installments: bool,

    pub assigned_on: NaiveDate,
    /// bumped by every mutation, for optimistic concurrency checks
    pub version: u32,
}

impl StudentFee {
    /// instantiate a catalog item for a student
    pub fn assign(structure: &FeeStructure, student_id: StudentId, assigned_on: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            school_id: structure.school_id,
            student_id,
            fee_structure_id: structure.id,
            academic_year: structure.academic_year.clone(),
            fee_name: structure.fee_name.clone(),
            fee_type: structure.fee_type,
            total_amount: structure.amount,
            paid_amount: Money::ZERO,
            balance_amount: structure.amount,
            discount_amount: Money::ZERO,
            status: FeeStatus::Pending,
            has_installments: false,
            assigned_on,
            version: 0,
        }
    }

    /// total = paid + balance + discount, with no negative component
    pub fn is_balanced(&self) -> bool {
        self.total_amount == self.paid_amount + self.balance_amount + self.discount_amount
            && !self.balance_amount.is_negative()
            && !self.paid_amount.is_negative()
            && !self.discount_amount.is_negative()
    }

    /// re-derive status, returning the transition if it changed
    pub fn refresh_status(&mut self) -> Option<(FeeStatus, FeeStatus)> {
        let old = self.status;
        self.status = FeeStatus::derive(self.total_amount, self.paid_amount, self.balance_amount);
        (old != self.status).then_some((old, self.status))
    }

    pub fn check_version(&self, expected: Option<u32>) -> Result<()> {
        match expected {
            Some(v) if v != self.version => Err(LedgerError::conflict(format!(
                "student fee {} is at version {}, request expected {}",
                self.id, self.version, v
            ))),
            _ => Ok(()),
        }
    }

    /// apply a direct payment against the row
    pub fn apply_payment(&mut self, amount: Money) -> Result<()> {
        ensure_payable(amount, self.balance_amount)?;
        self.paid_amount += amount;
        self.balance_amount -= amount;
        self.refresh_status();
        Ok(())
    }

    /// apply a fee-level discount
    pub fn apply_discount(&mut self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::validation("amount", "discount must be greater than zero"));
        }
        if amount > self.balance_amount {
            return Err(LedgerError::validation(
                "amount",
                format!("discount {} exceeds balance {}", amount, self.balance_amount),
            ));
        }
        self.discount_amount += amount;
        self.balance_amount -= amount;
        self.refresh_status();
        Ok(())
    }

    /// recompute paid and balance as the sum over installments
    pub fn reconcile(&mut self, installments: &[Installment]) -> Result<()> {
        let paid: Money = installments.iter().map(|i| i.paid_amount).sum();
        let balance = self.total_amount - paid - self.discount_amount;
        if balance.is_negative() {
            return Err(LedgerError::validation(
                "amount_paid",
                format!(
                    "installment payments {} exceed what is owed on fee {}",
                    paid, self.id
                ),
            ));
        }
        self.paid_amount = paid;
        self.balance_amount = balance;
        self.refresh_status();
        Ok(())
    }
}

/// a ledger row together with the installments it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAccount {
    pub fee: StudentFee,
    pub installments: Vec<Installment>,
}

impl FeeAccount {
    pub fn new(fee: StudentFee) -> Self {
        Self {
            fee,
            installments: Vec::new(),
        }
    }

    pub fn installment_total(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    /// every invariant of the row and its installments
    pub fn check_invariants(&self, tolerance: Money) -> Result<()> {
        if !self.fee.is_balanced() {
            return Err(LedgerError::dependency(format!(
                "fee {} out of balance: total {} paid {} balance {} discount {}",
                self.fee.id,
                self.fee.total_amount,
                self.fee.paid_amount,
                self.fee.balance_amount,
                self.fee.discount_amount
            )));
        }
        if self.fee.has_installments != !self.installments.is_empty() {
            return Err(LedgerError::dependency(format!(
                "fee {} installment flag disagrees with its schedule",
                self.fee.id
            )));
        }
        if self.fee.has_installments {
            let gap = (self.installment_total() - self.fee.total_amount).abs();
            if gap > tolerance {
                return Err(LedgerError::dependency(format!(
                    "fee {} installments sum to {} against total {}",
                    self.fee.id,
                    self.installment_total(),
                    self.fee.total_amount
                )));
            }
            if let Some(bad) = self.installments.iter().find(|i| !i.is_balanced()) {
                return Err(LedgerError::dependency(format!(
                    "installment {} out of balance",
                    bad.id
                )));
            }
        }
        Ok(())
    }
}

/// 0 < amount <= balance
pub(crate) fn ensure_payable(amount: Money, balance: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::validation(
            "amount_paid",
            "payment must be greater than zero",
        ));
    }
    if amount > balance {
        return Err(LedgerError::validation(
            "amount_paid",
            format!("payment {} exceeds balance {}", amount, balance),
        ));
    }
    Ok(())
}
