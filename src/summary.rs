use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::FeeStructure;
use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::Result;
use crate::ledger::FeeLedger;
use crate::types::{
    AcademicYear, ClassId, FeeStatus, FeeStructureId, FeeType, StudentFeeId, StudentId,
};

/// one ledger row as shown in a fee summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLine {
    pub student_fee_id: StudentFeeId,
    pub fee_structure_id: FeeStructureId,
    pub fee_name: String,
    pub fee_type: FeeType,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub balance_amount: Money,
    pub discount_amount: Money,
    pub status: FeeStatus,
    pub has_installments: bool,
    pub installment_count: u32,
}

/// a student's fees for one academic year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSummary {
    pub student_id: StudentId,
    pub academic_year: AcademicYear,
    pub fees: Vec<FeeLine>,
    pub total_amount: Money,
    pub total_paid: Money,
    pub balance: Money,
    pub total_discount: Money,
    pub total_late_fee: Money,
}

/// catalog rows of one class, the structure-list view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassFeeStructures {
    pub class_id: ClassId,
    pub class_name: String,
    pub academic_year: AcademicYear,
    pub items: Vec<FeeStructure>,
    /// totals count active items only
    pub total_amount: Money,
    pub mandatory_total: Money,
    pub optional_total: Money,
}

impl ClassFeeStructures {
    fn new(class_id: ClassId, class_name: String, academic_year: AcademicYear, items: Vec<FeeStructure>) -> Self {
        let active = || items.iter().filter(|s| s.is_active);
        let mandatory_total: Money = active().filter(|s| s.is_mandatory).map(|s| s.amount).sum();
        let optional_total: Money = active().filter(|s| !s.is_mandatory).map(|s| s.amount).sum();
        Self {
            class_id,
            class_name,
            academic_year,
            total_amount: mandatory_total + optional_total,
            mandatory_total,
            optional_total,
            items,
        }
    }
}

impl FeeLedger {
    /// recomputed from the ledger rows on every call; a student with no fees
    /// gets zeroed totals
    pub fn summarize(
        &self,
        ctx: &LedgerContext,
        student_id: StudentId,
        academic_year: &AcademicYear,
    ) -> Result<FeeSummary> {
        self.roster.student(ctx, student_id)?;

        let fees: Vec<FeeLine> = self
            .student_fees(ctx, student_id, academic_year)
            .into_iter()
            .map(|fee| FeeLine {
                student_fee_id: fee.id,
                fee_structure_id: fee.fee_structure_id,
                fee_name: fee.fee_name.clone(),
                fee_type: fee.fee_type,
                total_amount: fee.total_amount,
                paid_amount: fee.paid_amount,
                balance_amount: fee.balance_amount,
                discount_amount: fee.discount_amount,
                status: fee.status,
                has_installments: fee.has_installments,
                installment_count: self
                    .accounts
                    .get(&fee.id)
                    .map_or(0, |a| a.installments.len() as u32),
            })
            .collect();

        Ok(FeeSummary {
            student_id,
            academic_year: academic_year.clone(),
            total_amount: fees.iter().map(|f| f.total_amount).sum(),
            total_paid: fees.iter().map(|f| f.paid_amount).sum(),
            balance: fees.iter().map(|f| f.balance_amount).sum(),
            total_discount: fees.iter().map(|f| f.discount_amount).sum(),
            total_late_fee: fees
                .iter()
                .filter(|f| f.fee_type == FeeType::LateFee)
                .map(|f| f.total_amount)
                .sum(),
            fees,
        })
    }

    pub fn summarize_class(
        &self,
        ctx: &LedgerContext,
        class_id: ClassId,
        academic_year: &AcademicYear,
    ) -> Result<ClassFeeStructures> {
        let class = self.roster.class(ctx, class_id)?;
        let items = self
            .list_fee_structures(ctx, academic_year, Some(class_id))
            .into_iter()
            .cloned()
            .collect();
        Ok(ClassFeeStructures::new(class_id, class.name.clone(), academic_year.clone(), items))
    }

    /// every class with catalog rows in the year, ordered by class name
    pub fn summarize_catalog(
        &self,
        ctx: &LedgerContext,
        academic_year: &AcademicYear,
    ) -> Vec<ClassFeeStructures> {
        let mut by_class: BTreeMap<ClassId, Vec<FeeStructure>> = BTreeMap::new();
        for structure in self.list_fee_structures(ctx, academic_year, None) {
            by_class.entry(structure.class_id).or_default().push(structure.clone());
        }

        let mut groups: Vec<ClassFeeStructures> = by_class
            .into_iter()
            .map(|(class_id, items)| {
                let class_name = self
                    .roster
                    .class(ctx, class_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                ClassFeeStructures::new(class_id, class_name, academic_year.clone(), items)
            })
            .collect();
        groups.sort_by(|a, b| a.class_name.cmp(&b.class_name).then_with(|| a.class_id.cmp(&b.class_id)));
        groups
    }
}
