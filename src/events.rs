use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    AcademicYear, ClassId, FeeStatus, FeeStructureId, InstallmentId, PaymentId, PaymentMode,
    SchoolId, StudentFeeId, StudentId, UserId,
};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // catalog events
    FeeStructureCreated {
        school_id: SchoolId,
        fee_structure_id: FeeStructureId,
        class_id: ClassId,
        academic_year: AcademicYear,
        amount: Money,
        created_by: UserId,
        timestamp: DateTime<Utc>,
    },
    FeeStructureUpdated {
        fee_structure_id: FeeStructureId,
        old_amount: Money,
        new_amount: Money,
        updated_by: UserId,
        timestamp: DateTime<Utc>,
    },
    FeeStructureDeactivated {
        fee_structure_id: FeeStructureId,
        updated_by: UserId,
        timestamp: DateTime<Utc>,
    },
    FeeStructureDeleted {
        fee_structure_id: FeeStructureId,
        deleted_by: UserId,
        timestamp: DateTime<Utc>,
    },

    // ledger row events
    FeeAssigned {
        student_fee_id: StudentFeeId,
        student_id: StudentId,
        fee_structure_id: FeeStructureId,
        academic_year: AcademicYear,
        total_amount: Money,
        assigned_by: UserId,
        timestamp: DateTime<Utc>,
    },
    InstallmentsPlanned {
        student_fee_id: StudentFeeId,
        count: u32,
        first_due_date: NaiveDate,
        last_due_date: NaiveDate,
        replaced: u32,
        planned_by: UserId,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        payment_id: PaymentId,
        student_fee_id: StudentFeeId,
        installment_id: Option<InstallmentId>,
        amount: Money,
        mode: PaymentMode,
        receipt_number: String,
        collected_by: UserId,
        timestamp: DateTime<Utc>,
    },
    DiscountApplied {
        student_fee_id: StudentFeeId,
        amount: Money,
        reason: String,
        applied_by: UserId,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        student_fee_id: StudentFeeId,
        old_status: FeeStatus,
        new_status: FeeStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
