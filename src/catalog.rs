use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::ledger::FeeLedger;
use crate::types::{AcademicYear, ClassId, FeeStructureId, FeeType, SchoolId, UserId};

/// catalog definition of a fee for a class and academic year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub id: FeeStructureId,
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub academic_year: AcademicYear,
    pub fee_name: String,
    pub fee_type: FeeType,
    pub amount: Money,
    pub is_mandatory: bool,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// input for a new catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStructureDraft {
    pub class_id: ClassId,
    pub academic_year: AcademicYear,
    pub fee_name: String,
    pub fee_type: FeeType,
    pub amount: Money,
    #[serde(default = "default_mandatory")]
    pub is_mandatory: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_mandatory() -> bool {
    true
}

/// partial update of a catalog item; `None` keeps the current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeStructureUpdate {
    pub fee_name: Option<String>,
    pub fee_type: Option<FeeType>,
    pub amount: Option<Money>,
    pub is_mandatory: Option<bool>,
    pub description: Option<String>,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("fee_name", "fee name is required"));
    }
    Ok(name.to_string())
}

fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::validation(
            "amount",
            format!("fee amount must be greater than zero, got {}", amount),
        ));
    }
    Ok(())
}

impl FeeLedger {
    pub fn create_fee_structure(
        &mut self,
        ctx: &LedgerContext,
        draft: FeeStructureDraft,
        time: &SafeTimeProvider,
    ) -> Result<FeeStructure> {
        self.roster.class(ctx, draft.class_id)?;
        let fee_name = validate_name(&draft.fee_name)?;
        validate_amount(draft.amount)?;
        self.ensure_unique_name(ctx, draft.class_id, &draft.academic_year, &fee_name, None)?;

        let structure = FeeStructure {
            id: Uuid::new_v4(),
            school_id: ctx.school_id,
            class_id: draft.class_id,
            academic_year: draft.academic_year,
            fee_name,
            fee_type: draft.fee_type,
            amount: draft.amount,
            is_mandatory: draft.is_mandatory,
            description: draft.description.filter(|d| !d.trim().is_empty()),
            is_active: true,
            created_by: ctx.user_id,
            created_at: time.now(),
        };

        self.events.emit(Event::FeeStructureCreated {
            school_id: structure.school_id,
            fee_structure_id: structure.id,
            class_id: structure.class_id,
            academic_year: structure.academic_year.clone(),
            amount: structure.amount,
            created_by: ctx.user_id,
            timestamp: structure.created_at,
        });
        info!(
            fee_structure_id = %structure.id,
            class_id = %structure.class_id,
            academic_year = %structure.academic_year,
            amount = %structure.amount,
            "fee structure created"
        );

        self.catalog.insert(structure.id, structure.clone());
        Ok(structure)
    }

    /// student fees already assigned keep the amount they were assigned with
    pub fn update_fee_structure(
        &mut self,
        ctx: &LedgerContext,
        id: FeeStructureId,
        update: FeeStructureUpdate,
        time: &SafeTimeProvider,
    ) -> Result<FeeStructure> {
        let current = self.fee_structure(ctx, id)?.clone();
        let mut next = current.clone();

        if let Some(name) = update.fee_name {
            next.fee_name = validate_name(&name)?;
        }
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
            next.amount = amount;
        }
        if let Some(fee_type) = update.fee_type {
            next.fee_type = fee_type;
        }
        if let Some(mandatory) = update.is_mandatory {
            next.is_mandatory = mandatory;
        }
        if let Some(description) = update.description {
            next.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if next.fee_name != current.fee_name {
            self.ensure_unique_name(ctx, next.class_id, &next.academic_year, &next.fee_name, Some(id))?;
        }

        self.events.emit(Event::FeeStructureUpdated {
            fee_structure_id: id,
            old_amount: current.amount,
            new_amount: next.amount,
            updated_by: ctx.user_id,
            timestamp: time.now(),
        });
        info!(fee_structure_id = %id, amount = %next.amount, "fee structure updated");

        self.catalog.insert(id, next.clone());
        Ok(next)
    }

    /// withdraw an item from future assignment
    pub fn deactivate_fee_structure(
        &mut self,
        ctx: &LedgerContext,
        id: FeeStructureId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        self.fee_structure(ctx, id)?;
        if let Some(structure) = self.catalog.get_mut(&id) {
            if structure.is_active {
                structure.is_active = false;
                self.events.emit(Event::FeeStructureDeactivated {
                    fee_structure_id: id,
                    updated_by: ctx.user_id,
                    timestamp: time.now(),
                });
                info!(fee_structure_id = %id, "fee structure deactivated");
            }
        }
        Ok(())
    }

    /// fails while any student fee references the item
    pub fn delete_fee_structure(
        &mut self,
        ctx: &LedgerContext,
        id: FeeStructureId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        self.fee_structure(ctx, id)?;

        let references = self
            .accounts
            .values()
            .filter(|a| a.fee.fee_structure_id == id)
            .count();
        if references > 0 {
            warn!(fee_structure_id = %id, references, "refusing to delete assigned fee structure");
            return Err(LedgerError::conflict(format!(
                "fee structure {} is assigned to {} student fee(s)",
                id, references
            )));
        }

        self.catalog.remove(&id);
        self.events.emit(Event::FeeStructureDeleted {
            fee_structure_id: id,
            deleted_by: ctx.user_id,
            timestamp: time.now(),
        });
        info!(fee_structure_id = %id, "fee structure deleted");
        Ok(())
    }

    /// remove a class's whole catalog for the year; refused, with nothing
    /// removed, while any of its items is assigned
    pub fn delete_class_fee_structures(
        &mut self,
        ctx: &LedgerContext,
        class_id: ClassId,
        academic_year: &AcademicYear,
        time: &SafeTimeProvider,
    ) -> Result<Vec<FeeStructureId>> {
        self.roster.class(ctx, class_id)?;
        let ids: Vec<FeeStructureId> = self
            .list_fee_structures(ctx, academic_year, Some(class_id))
            .iter()
            .map(|s| s.id)
            .collect();

        let references = self
            .accounts
            .values()
            .filter(|a| ids.contains(&a.fee.fee_structure_id))
            .count();
        if references > 0 {
            warn!(
                class_id = %class_id,
                academic_year = %academic_year,
                references,
                "refusing to delete assigned class fee structures"
            );
            return Err(LedgerError::conflict(format!(
                "fee structures of class {} for {} are assigned to {} student fee(s)",
                class_id, academic_year, references
            )));
        }

        let now = time.now();
        for id in &ids {
            self.catalog.remove(id);
            self.events.emit(Event::FeeStructureDeleted {
                fee_structure_id: *id,
                deleted_by: ctx.user_id,
                timestamp: now,
            });
        }
        info!(
            class_id = %class_id,
            academic_year = %academic_year,
            deleted = ids.len(),
            "class fee structures deleted"
        );
        Ok(ids)
    }

    pub fn fee_structure(&self, ctx: &LedgerContext, id: FeeStructureId) -> Result<&FeeStructure> {
        self.catalog
            .get(&id)
            .filter(|s| ctx.owns(s.school_id))
            .ok_or_else(|| LedgerError::not_found("fee structure", id))
    }

    /// catalog rows of a year, optionally for one class, ordered by class
    /// then fee name
    pub fn list_fee_structures(
        &self,
        ctx: &LedgerContext,
        academic_year: &AcademicYear,
        class_id: Option<ClassId>,
    ) -> Vec<&FeeStructure> {
        let mut rows: Vec<&FeeStructure> = self
            .catalog
            .values()
            .filter(|s| ctx.owns(s.school_id) && &s.academic_year == academic_year)
            .filter(|s| class_id.map_or(true, |c| s.class_id == c))
            .collect();
        rows.sort_by(|a, b| {
            a.class_id
                .cmp(&b.class_id)
                .then_with(|| a.fee_name.cmp(&b.fee_name))
        });
        rows
    }

    fn ensure_unique_name(
        &self,
        ctx: &LedgerContext,
        class_id: ClassId,
        academic_year: &AcademicYear,
        fee_name: &str,
        except: Option<FeeStructureId>,
    ) -> Result<()> {
        let clash = self.catalog.values().any(|s| {
            ctx.owns(s.school_id)
                && s.is_active
                && s.class_id == class_id
                && &s.academic_year == academic_year
                && Some(s.id) != except
                && s.fee_name.eq_ignore_ascii_case(fee_name)
        });
        if clash {
            return Err(LedgerError::conflict(format!(
                "'{}' already exists for this class in {}",
                fee_name, academic_year
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::FeeSelection;
    use crate::ledger::test_support::Fixture;

    #[test]
    fn test_create_and_list() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");
        fx.structure(class, "Tuition Fee", FeeType::Tuition, 9_000, true);
        fx.structure(class, "Bus Fee", FeeType::Transport, 4_000, false);

        let rows = fx.ledger.list_fee_structures(&fx.ctx, &fx.year, Some(class));
        let names: Vec<_> = rows.iter().map(|s| s.fee_name.as_str()).collect();
        assert_eq!(names, vec!["Bus Fee", "Tuition Fee"]);
        assert!(rows.iter().all(|s| s.is_active));
    }

    #[test]
    fn test_invalid_drafts_rejected() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");

        let mut draft = fx.draft(class, "Exam Fee", FeeType::Exam, 500, true);
        draft.amount = Money::ZERO;
        let err = fx.ledger.create_fee_structure(&fx.ctx, draft, &fx.time).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "amount"));

        let draft = fx.draft(class, "   ", FeeType::Exam, 500, true);
        assert!(fx.ledger.create_fee_structure(&fx.ctx, draft, &fx.time).is_err());

        let draft = fx.draft(Uuid::new_v4(), "Exam Fee", FeeType::Exam, 500, true);
        let err = fx.ledger.create_fee_structure(&fx.ctx, draft, &fx.time).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "class", .. }));

        assert!(fx.ledger.events.is_empty());
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");
        fx.structure(class, "Lab Fee", FeeType::Lab, 800, true);
        let draft = fx.draft(class, "lab fee", FeeType::Lab, 900, true);
        let err = fx.ledger.create_fee_structure(&fx.ctx, draft, &fx.time).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn test_update_does_not_touch_assigned_rows() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");
        let tuition = fx.structure(class, "Tuition Fee", FeeType::Tuition, 9_000, true);
        let student = fx.student("Asha", Some(class));
        fx.ledger
            .assign_to_student(&fx.ctx, student, &fx.year, FeeSelection::MandatoryOnly, &fx.time)
            .unwrap();

        let updated = fx
            .ledger
            .update_fee_structure(
                &fx.ctx,
                tuition,
                FeeStructureUpdate {
                    amount: Some(Money::from_major(9_500)),
                    ..Default::default()
                },
                &fx.time,
            )
            .unwrap();
        assert_eq!(updated.amount, Money::from_major(9_500));

        let summary = fx.ledger.summarize(&fx.ctx, student, &fx.year).unwrap();
        assert_eq!(summary.total_amount, Money::from_major(9_000));
    }

    #[test]
    fn test_delete_blocked_once_assigned() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");
        let tuition = fx.structure(class, "Tuition Fee", FeeType::Tuition, 9_000, true);
        let spare = fx.structure(class, "Spare Fee", FeeType::Other, 100, false);
        let student = fx.student("Asha", Some(class));
        fx.ledger
            .assign_to_student(&fx.ctx, student, &fx.year, FeeSelection::MandatoryOnly, &fx.time)
            .unwrap();

        let err = fx.ledger.delete_fee_structure(&fx.ctx, tuition, &fx.time).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
        assert!(fx.ledger.fee_structure(&fx.ctx, tuition).is_ok());

        fx.ledger.delete_fee_structure(&fx.ctx, spare, &fx.time).unwrap();
        assert!(fx.ledger.fee_structure(&fx.ctx, spare).is_err());
    }

    #[test]
    fn test_class_delete_is_all_or_nothing() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");
        fx.structure(class, "Tuition Fee", FeeType::Tuition, 9_000, true);
        let optional = fx.structure(class, "Bus Fee", FeeType::Transport, 3_000, false);
        let student = fx.student("Asha", Some(class));
        fx.ledger
            .assign_to_student(&fx.ctx, student, &fx.year, FeeSelection::MandatoryOnly, &fx.time)
            .unwrap();
        let events_before = fx.ledger.events.len();

        let err = fx
            .ledger
            .delete_class_fee_structures(&fx.ctx, class, &fx.year, &fx.time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
        assert_eq!(fx.ledger.list_fee_structures(&fx.ctx, &fx.year, Some(class)).len(), 2);
        assert!(fx.ledger.fee_structure(&fx.ctx, optional).is_ok());
        assert_eq!(fx.ledger.events.len(), events_before);
    }

    #[test]
    fn test_class_delete_removes_every_item_of_the_year() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");
        let other = fx.class("Grade 4");
        fx.structure(class, "Tuition Fee", FeeType::Tuition, 9_000, true);
        fx.structure(class, "Bus Fee", FeeType::Transport, 3_000, false);
        let kept = fx.structure(other, "Tuition Fee", FeeType::Tuition, 9_500, true);
        fx.ledger.events.take_events();

        let deleted = fx
            .ledger
            .delete_class_fee_structures(&fx.ctx, class, &fx.year, &fx.time)
            .unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(fx.ledger.list_fee_structures(&fx.ctx, &fx.year, Some(class)).is_empty());
        assert!(fx.ledger.fee_structure(&fx.ctx, kept).is_ok());

        let events = fx.ledger.events.take_events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, Event::FeeStructureDeleted { .. })));

        assert!(matches!(
            fx.ledger.delete_class_fee_structures(&fx.ctx, Uuid::new_v4(), &fx.year, &fx.time),
            Err(LedgerError::NotFound { entity: "class", .. })
        ));
    }

    #[test]
    fn test_other_school_cannot_see_structure() {
        let mut fx = Fixture::new();
        let class = fx.class("Grade 3");
        let tuition = fx.structure(class, "Tuition Fee", FeeType::Tuition, 9_000, true);
        let stranger = LedgerContext::new(Uuid::new_v4(), fx.ctx.user_id);
        assert!(matches!(
            fx.ledger.fee_structure(&stranger, tuition),
            Err(LedgerError::NotFound { .. })
        ));
        assert!(fx.ledger.list_fee_structures(&stranger, &fx.year, None).is_empty());
    }
}
