use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::context::LedgerContext;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::ledger::FeeLedger;
use crate::student_fee::StudentFee;
use crate::types::StudentFeeId;

impl FeeLedger {
    /// waive part of a fee's balance; installments keep their amounts and the
    /// fee balance caps what they can still collect
    pub fn apply_discount(
        &mut self,
        ctx: &LedgerContext,
        student_fee_id: StudentFeeId,
        amount: Money,
        reason: &str,
        expected_version: Option<u32>,
        time: &SafeTimeProvider,
    ) -> Result<StudentFee> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::validation("reason", "a discount needs a reason"));
        }

        let mut account = self.account(ctx, student_fee_id)?.clone();
        account.fee.check_version(expected_version)?;
        let old_status = account.fee.status;
        account.fee.apply_discount(amount).map_err(|e| {
            warn!(student_fee_id = %student_fee_id, amount = %amount, error = %e, "discount rejected");
            e
        })?;
        account.fee.version += 1;

        let fee = account.fee.clone();
        self.commit_account(account)?;

        let now = time.now();
        self.events.emit(Event::DiscountApplied {
            student_fee_id,
            amount,
            reason: reason.to_string(),
            applied_by: ctx.user_id,
            timestamp: now,
        });
        if old_status != fee.status {
            self.events.emit(Event::StatusChanged {
                student_fee_id,
                old_status,
                new_status: fee.status,
                timestamp: now,
            });
        }
        info!(
            student_fee_id = %student_fee_id,
            amount = %amount,
            balance = %fee.balance_amount,
            "discount applied"
        );
        Ok(fee)
    }
}
