use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::LedgerContext;
use crate::errors::{ErrorKind, LedgerError, Result};
use crate::events::Event;
use crate::ledger::FeeLedger;
use crate::student_fee::{FeeAccount, StudentFee};
use crate::types::{AcademicYear, ClassId, FeeStructureId, StudentFeeId, StudentId};

/// which catalog items an individual assignment picks up
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "mode", content = "fee_structure_ids")]
pub enum FeeSelection {
    /// every active mandatory item of the student's class
    #[default]
    MandatoryOnly,
    /// mandatory items plus the listed optional ones
    WithOptional(Vec<FeeStructureId>),
}

impl FeeSelection {
    fn includes(&self, id: FeeStructureId, is_mandatory: bool) -> bool {
        is_mandatory
            || match self {
                FeeSelection::MandatoryOnly => false,
                FeeSelection::WithOptional(ids) => ids.contains(&id),
            }
    }
}

/// outcome of assigning fees to one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAssignment {
    pub student_id: StudentId,
    pub assigned_count: u32,
    pub skipped_count: u32,
    pub student_fee_ids: Vec<StudentFeeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAssignmentFailure {
    pub student_id: StudentId,
    pub kind: ErrorKind,
    pub message: String,
}

/// outcome of a bulk class assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAssignment {
    pub class_id: ClassId,
    pub total_students: u32,
    pub assigned: u32,
    pub skipped: u32,
    pub failures: Vec<StudentAssignmentFailure>,
}

impl FeeLedger {
    /// create a ledger row for every selected active item of the student's
    /// class and year that the student does not already carry
    pub fn assign_to_student(
        &mut self,
        ctx: &LedgerContext,
        student_id: StudentId,
        academic_year: &AcademicYear,
        selection: FeeSelection,
        time: &SafeTimeProvider,
    ) -> Result<StudentAssignment> {
        let student = self.roster.student(ctx, student_id)?;
        if !student.is_active {
            return Err(LedgerError::validation(
                "student_id",
                format!("student {} is not active", student_id),
            ));
        }
        let class_id = student.class_id()?;

        let mut candidates: Vec<_> = self
            .list_fee_structures(ctx, academic_year, Some(class_id))
            .into_iter()
            .filter(|s| s.is_active)
            .collect();
        candidates.sort_by(|a, b| a.fee_name.cmp(&b.fee_name).then_with(|| a.id.cmp(&b.id)));

        if let FeeSelection::WithOptional(ids) = &selection {
            if let Some(stray) = ids.iter().find(|id| !candidates.iter().any(|s| s.id == **id)) {
                return Err(LedgerError::validation(
                    "fee_structure_ids",
                    format!(
                        "{} is not an active fee of this student's class in {}",
                        stray, academic_year
                    ),
                ));
            }
        }

        let assigned_on = time.now().date_naive();
        let mut rows = Vec::new();
        let mut skipped_count = 0;
        for structure in candidates {
            if !selection.includes(structure.id, structure.is_mandatory) {
                continue;
            }
            if self.has_assignment(student_id, structure.id) {
                skipped_count += 1;
                continue;
            }
            rows.push(StudentFee::assign(structure, student_id, assigned_on));
        }

        let timestamp = time.now();
        let mut student_fee_ids = Vec::with_capacity(rows.len());
        for fee in rows {
            let event = Event::FeeAssigned {
                student_fee_id: fee.id,
                student_id,
                fee_structure_id: fee.fee_structure_id,
                academic_year: fee.academic_year.clone(),
                total_amount: fee.total_amount,
                assigned_by: ctx.user_id,
                timestamp,
            };
            student_fee_ids.push(fee.id);
            self.commit_account(FeeAccount::new(fee))?;
            self.events.emit(event);
        }

        info!(
            student_id = %student_id,
            academic_year = %academic_year,
            assigned = student_fee_ids.len(),
            skipped = skipped_count,
            "fees assigned to student"
        );

        Ok(StudentAssignment {
            student_id,
            assigned_count: student_fee_ids.len() as u32,
            skipped_count,
            student_fee_ids,
        })
    }

    /// mandatory fees for every student of the class; one student's failure
    /// is recorded and the batch carries on
    pub fn assign_to_class(
        &mut self,
        ctx: &LedgerContext,
        class_id: ClassId,
        academic_year: &AcademicYear,
        time: &SafeTimeProvider,
    ) -> Result<ClassAssignment> {
        let students: Vec<StudentId> = self
            .roster
            .students_in_class(ctx, class_id)?
            .iter()
            .map(|s| s.id)
            .collect();

        let mut result = ClassAssignment {
            class_id,
            total_students: students.len() as u32,
            assigned: 0,
            skipped: 0,
            failures: Vec::new(),
        };

        for student_id in students {
            match self.assign_to_student(
                ctx,
                student_id,
                academic_year,
                FeeSelection::MandatoryOnly,
                time,
            ) {
                Ok(done) => {
                    result.assigned += done.assigned_count;
                    result.skipped += done.skipped_count;
                }
                Err(error) => {
                    warn!(student_id = %student_id, %error, "skipping student in class assignment");
                    result.failures.push(StudentAssignmentFailure {
                        student_id,
                        kind: error.kind(),
                        message: error.to_string(),
                    });
                }
            }
        }

        info!(
            class_id = %class_id,
            academic_year = %academic_year,
            students = result.total_students,
            assigned = result.assigned,
            skipped = result.skipped,
            failed = result.failures.len(),
            "class assignment finished"
        );
        Ok(result)
    }

    /// every ledger row of a student for a year, oldest first
    pub fn student_fees(
        &self,
        ctx: &LedgerContext,
        student_id: StudentId,
        academic_year: &AcademicYear,
    ) -> Vec<&StudentFee> {
        let mut fees: Vec<&StudentFee> = self
            .accounts
            .values()
            .map(|a| &a.fee)
            .filter(|f| ctx.owns(f.school_id))
            .filter(|f| f.student_id == student_id && &f.academic_year == academic_year)
            .collect();
        fees.sort_by(|a, b| {
            a.assigned_on
                .cmp(&b.assigned_on)
                .then_with(|| a.fee_name.cmp(&b.fee_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        fees
    }

    fn has_assignment(&self, student_id: StudentId, fee_structure_id: FeeStructureId) -> bool {
        self.accounts
            .values()
            .any(|a| a.fee.student_id == student_id && a.fee.fee_structure_id == fee_structure_id)
    }
}
