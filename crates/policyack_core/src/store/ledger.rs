//! Per-employee acknowledgement ledger.
//!
//! # Responsibility
//! - Record self-service acknowledgements.
//! - Invalidate acknowledgements when a policy is deleted.
//! - Replay acknowledgements from a deletion snapshot on undo.
//!
//! # Invariants
//! - Acknowledging never overwrites an existing timestamp.
//! - Cascade operations touch only the given policy id.
//! - Employees are never added or removed here.

use crate::model::employee::{Employee, EmployeeId};
use crate::model::policy::PolicyId;
use crate::store::coverage::Coverage;
use crate::store::undo::DeletionSnapshot;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ledger errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    UnknownEmployee(EmployeeId),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEmployee(id) => write!(f, "employee not found: {id}"),
        }
    }
}

impl Error for LedgerError {}

/// Result of an acknowledge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// New acknowledgement stored with this timestamp.
    Recorded(DateTime<Utc>),
    /// Already acknowledged at this timestamp; nothing changed.
    AlreadyAcknowledged(DateTime<Utc>),
}

impl AckOutcome {
    pub fn acknowledged_at(self) -> DateTime<Utc> {
        match self {
            Self::Recorded(at) | Self::AlreadyAcknowledged(at) => at,
        }
    }

    pub fn is_new(self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcknowledgementLedger {
    employees: Vec<Employee>,
}

impl AcknowledgementLedger {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|employee| employee.id == id)
    }

    /// Records that `employee_id` acknowledged `policy_id` at `now`.
    ///
    /// Callers pass the acting user's own id; no other record is touched.
    ///
    /// # Errors
    /// - `UnknownEmployee` when `employee_id` is not in the ledger.
    pub fn acknowledge(
        &mut self,
        employee_id: EmployeeId,
        policy_id: PolicyId,
        now: DateTime<Utc>,
    ) -> Result<AckOutcome, LedgerError> {
        let employee = self
            .employees
            .iter_mut()
            .find(|employee| employee.id == employee_id)
            .ok_or(LedgerError::UnknownEmployee(employee_id))?;

        if let Some(existing) = employee.acknowledged_at(policy_id) {
            debug!(
                "event=ack module=ledger status=skipped employee_id={} policy_id={} reason=already_acknowledged",
                employee_id, policy_id
            );
            return Ok(AckOutcome::AlreadyAcknowledged(existing));
        }

        employee.insert_ack(policy_id, now);
        info!(
            "event=ack module=ledger status=ok employee_id={} policy_id={}",
            employee_id, policy_id
        );
        Ok(AckOutcome::Recorded(now))
    }

    /// Removes `policy_id` from every employee. Returns how many held it.
    pub fn cascade_delete(&mut self, policy_id: PolicyId) -> usize {
        let removed = self
            .employees
            .iter_mut()
            .map(|employee| employee.remove_ack(policy_id))
            .filter(|removed| *removed)
            .count();
        info!(
            "event=ack_cascade_delete module=ledger status=ok policy_id={} removed={}",
            policy_id, removed
        );
        removed
    }

    /// Replays acknowledgements captured in `snapshot` for its policy.
    ///
    /// Employees with `had_ack` regain the acknowledgement with the captured
    /// timestamp, or `now` when none was captured. Employees missing from
    /// the ledger are skipped. Idempotent per employee. Returns how many
    /// employees hold the acknowledgement after replay.
    pub fn cascade_restore(&mut self, snapshot: &DeletionSnapshot, now: DateTime<Utc>) -> usize {
        let policy_id = snapshot.policy().id;
        let mut restored = 0;
        for entry in snapshot.entries().iter().filter(|entry| entry.had_ack) {
            let Some(employee) = self
                .employees
                .iter_mut()
                .find(|employee| employee.id == entry.employee_id)
            else {
                continue;
            };
            match entry.acknowledged_at {
                Some(at) => employee.put_ack(policy_id, at),
                None => {
                    employee.insert_ack(policy_id, now);
                }
            }
            restored += 1;
        }
        info!(
            "event=ack_cascade_restore module=ledger status=ok policy_id={} restored={}",
            policy_id, restored
        );
        restored
    }

    /// Drops acknowledgements that reference no known policy. Returns dropped count.
    pub fn prune_unknown(&mut self, known: impl Fn(PolicyId) -> bool) -> usize {
        self.employees
            .iter_mut()
            .map(|employee| employee.retain_acks(&known))
            .sum()
    }

    /// Acknowledgement coverage of `policy_id` across all employees.
    pub fn coverage(&self, policy_id: PolicyId) -> Coverage {
        Coverage::of(policy_id, &self.employees)
    }
}
