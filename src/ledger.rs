use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::catalog::FeeStructure;
use crate::config::LedgerConfig;
use crate::context::LedgerContext;
use crate::errors::{LedgerError, Result};
use crate::events::EventStore;
use crate::payments::Payment;
use crate::roster::Roster;
use crate::student_fee::{FeeAccount, StudentFee};
use crate::types::{FeeStructureId, InstallmentId, StudentFeeId};

/// the fee ledger engine: catalog, roster, ledger rows with their
/// installments, and the append-only payment record
///
/// every mutating operation validates against a staged copy and commits only
/// when the whole change is valid, so a failed call leaves no trace
#[derive(Debug)]
pub struct FeeLedger {
    pub(crate) config: LedgerConfig,
    pub(crate) roster: Roster,
    pub(crate) catalog: HashMap<FeeStructureId, FeeStructure>,
    pub(crate) accounts: HashMap<StudentFeeId, FeeAccount>,
    pub(crate) installment_owner: HashMap<InstallmentId, StudentFeeId>,
    pub(crate) payments: Vec<Payment>,
    pub(crate) receipts: HashMap<String, usize>,
    pub(crate) receipt_seq: u64,
    pub events: EventStore,
}

impl FeeLedger {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            roster: Roster::new(),
            catalog: HashMap::new(),
            accounts: HashMap::new(),
            installment_owner: HashMap::new(),
            payments: Vec::new(),
            receipts: HashMap::new(),
            receipt_seq: 0,
            events: EventStore::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn student_fee(&self, ctx: &LedgerContext, id: StudentFeeId) -> Result<&StudentFee> {
        self.account(ctx, id).map(|a| &a.fee)
    }

    pub(crate) fn account(&self, ctx: &LedgerContext, id: StudentFeeId) -> Result<&FeeAccount> {
        self.accounts
            .get(&id)
            .filter(|a| ctx.owns(a.fee.school_id))
            .ok_or_else(|| LedgerError::not_found("student fee", id))
    }

    /// swap in a staged account after re-checking its invariants
    pub(crate) fn commit_account(&mut self, account: FeeAccount) -> Result<()> {
        account.check_invariants(self.config.installments.plan_tolerance)?;
        if let Some(previous) = self.accounts.get(&account.fee.id) {
            for inst in &previous.installments {
                self.installment_owner.remove(&inst.id);
            }
        }
        for inst in &account.installments {
            self.installment_owner.insert(inst.id, account.fee.id);
        }
        self.accounts.insert(account.fee.id, account);
        Ok(())
    }

    /// serializable image of the whole ledger
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut catalog: Vec<FeeStructure> = self.catalog.values().cloned().collect();
        catalog.sort_by_key(|s| s.created_at);
        let mut accounts: Vec<FeeAccount> = self.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            a.fee
                .assigned_on
                .cmp(&b.fee.assigned_on)
                .then_with(|| a.fee.id.cmp(&b.fee.id))
        });

        LedgerSnapshot {
            config: self.config.clone(),
            roster: self.roster.clone(),
            catalog,
            accounts,
            payments: self.payments.clone(),
            receipt_seq: self.receipt_seq,
        }
    }

    /// rebuild a ledger from a snapshot, rejecting one whose rows are out of
    /// balance or whose receipt numbers collide
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self> {
        let mut ledger = FeeLedger::new(snapshot.config)?;
        ledger.roster = snapshot.roster;
        ledger.catalog = snapshot.catalog.into_iter().map(|s| (s.id, s)).collect();

        for account in snapshot.accounts {
            ledger.commit_account(account)?;
        }
        for payment in snapshot.payments {
            if ledger.receipts.contains_key(&payment.receipt_number) {
                return Err(LedgerError::dependency(format!(
                    "duplicate receipt number {} in snapshot",
                    payment.receipt_number
                )));
            }
            ledger
                .receipts
                .insert(payment.receipt_number.clone(), ledger.payments.len());
            ledger.payments.push(payment);
        }
        ledger.receipt_seq = snapshot.receipt_seq;

        info!(
            fees = ledger.accounts.len(),
            payments = ledger.payments.len(),
            "ledger restored from snapshot"
        );
        Ok(ledger)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: LedgerSnapshot = serde_json::from_str(json)?;
        FeeLedger::restore(snapshot)
    }
}

/// everything needed to persist and rebuild a ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub config: LedgerConfig,
    pub roster: Roster,
    pub catalog: Vec<FeeStructure>,
    pub accounts: Vec<FeeAccount>,
    pub payments: Vec<Payment>,
    pub receipt_seq: u64,
}
