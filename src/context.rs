use serde::{Deserialize, Serialize};

use crate::types::{SchoolId, UserId};

/// acting school and user for one ledger operation, supplied by the host's
/// session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerContext {
    pub school_id: SchoolId,
    pub user_id: UserId,
}

impl LedgerContext {
    pub fn new(school_id: SchoolId, user_id: UserId) -> Self {
        Self { school_id, user_id }
    }

    /// does a record created under `school_id` belong to this context
    pub fn owns(&self, school_id: SchoolId) -> bool {
        self.school_id == school_id
    }
}
