//! Single-slot deletion undo.
//!
//! # Responsibility
//! - Capture per-employee acknowledgement state before a policy deletion.
//! - Replay the most recent deletion exactly once.
//!
//! # Invariants
//! - At most one snapshot is held; a newer deletion replaces it.
//! - Snapshots are captured before the ledger cascade runs.
//! - Snapshots are never persisted.

use crate::model::employee::{Employee, EmployeeId};
use crate::model::policy::Policy;
use crate::store::ledger::AcknowledgementLedger;
use crate::store::policy_store::{PolicyStore, RestoreOutcome};
use chrono::{DateTime, Utc};
use log::info;

/// Acknowledgement state of one employee for the deleted policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub employee_id: EmployeeId,
    pub had_ack: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Immutable record of one policy deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionSnapshot {
    policy: Policy,
    entries: Vec<SnapshotEntry>,
}

impl DeletionSnapshot {
    /// Captures acknowledgement state of `policy` across `employees`.
    pub fn capture(policy: Policy, employees: &[Employee]) -> Self {
        let entries = employees
            .iter()
            .map(|employee| SnapshotEntry {
                employee_id: employee.id,
                had_ack: employee.has_acknowledged(policy.id),
                acknowledged_at: employee.acknowledged_at(policy.id),
            })
            .collect();
        Self { policy, entries }
    }

    /// Builds a snapshot from explicit entries.
    ///
    /// Entries with `had_ack` but no `acknowledged_at` are replayed at the
    /// restore instant.
    pub fn from_entries(policy: Policy, entries: Vec<SnapshotEntry>) -> Self {
        Self { policy, entries }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Number of employees that had acknowledged the deleted policy.
    pub fn acknowledged_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.had_ack).count()
    }
}

/// Undo slot state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UndoState {
    #[default]
    Empty,
    Armed(DeletionSnapshot),
}

/// Result of an undo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// Nothing was pending.
    NothingToUndo,
    /// Policy re-inserted and `acknowledgements_restored` employees replayed.
    Restored {
        policy: Policy,
        acknowledgements_restored: usize,
    },
    /// The policy id was occupied; the snapshot was discarded unchanged.
    Skipped { policy: Policy },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionUndoManager {
    state: UndoState,
}

impl DeletionUndoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UndoState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, UndoState::Armed(_))
    }

    /// Returns the pending snapshot, if any.
    pub fn pending(&self) -> Option<&DeletionSnapshot> {
        match &self.state {
            UndoState::Armed(snapshot) => Some(snapshot),
            UndoState::Empty => None,
        }
    }

    /// Arms the slot with a snapshot of `policy` across `employees`.
    ///
    /// Must run before the ledger cascade deletes the acknowledgements.
    /// Replaces any previously pending snapshot.
    pub fn record_deletion(&mut self, policy: Policy, employees: &[Employee]) {
        if let UndoState::Armed(previous) = &self.state {
            info!(
                "event=undo_superseded module=undo status=ok policy_id={}",
                previous.policy().id
            );
        }
        let snapshot = DeletionSnapshot::capture(policy, employees);
        info!(
            "event=undo_armed module=undo status=ok policy_id={} acknowledged={}",
            snapshot.policy().id,
            snapshot.acknowledged_count()
        );
        self.state = UndoState::Armed(snapshot);
    }

    /// Restores the pending deletion and empties the slot.
    ///
    /// Acknowledgements are replayed only when the policy was re-inserted.
    pub fn undo(
        &mut self,
        store: &mut PolicyStore,
        ledger: &mut AcknowledgementLedger,
        now: DateTime<Utc>,
    ) -> UndoOutcome {
        let snapshot = match std::mem::take(&mut self.state) {
            UndoState::Armed(snapshot) => snapshot,
            UndoState::Empty => return UndoOutcome::NothingToUndo,
        };

        match store.restore(snapshot.policy().clone()) {
            RestoreOutcome::Restored => {
                let acknowledgements_restored = ledger.cascade_restore(&snapshot, now);
                UndoOutcome::Restored {
                    policy: snapshot.policy,
                    acknowledgements_restored,
                }
            }
            RestoreOutcome::AlreadyPresent => UndoOutcome::Skipped {
                policy: snapshot.policy,
            },
        }
    }

    /// Discards the pending snapshot without restoring.
    pub fn clear(&mut self) {
        if let UndoState::Armed(snapshot) = std::mem::take(&mut self.state) {
            info!(
                "event=undo_cleared module=undo status=ok policy_id={}",
                snapshot.policy().id
            );
        }
    }
}
