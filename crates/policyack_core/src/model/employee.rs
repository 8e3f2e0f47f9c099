//! Employee acknowledgement record.
//!
//! # Invariants
//! - `acknowledged` and `ack_timestamps` always hold the same key set.
//! - Mutation is crate-private; callers go through the ledger.

use crate::model::policy::PolicyId;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Stable identifier of one employee.
pub type EmployeeId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    acknowledged: BTreeSet<PolicyId>,
    ack_timestamps: BTreeMap<PolicyId, DateTime<Utc>>,
}

impl Employee {
    /// Creates an employee with no acknowledgements.
    pub fn new(id: EmployeeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            acknowledged: BTreeSet::new(),
            ack_timestamps: BTreeMap::new(),
        }
    }

    /// Builds an employee from possibly inconsistent persisted parts.
    ///
    /// Acknowledged ids without a timestamp receive `backfill_at`; timestamps
    /// without a matching acknowledgement are dropped. Returns the record and
    /// the number of repaired entries.
    pub fn from_parts(
        id: EmployeeId,
        name: impl Into<String>,
        acknowledged: impl IntoIterator<Item = PolicyId>,
        mut ack_timestamps: BTreeMap<PolicyId, DateTime<Utc>>,
        backfill_at: DateTime<Utc>,
    ) -> (Self, usize) {
        let acknowledged: BTreeSet<PolicyId> = acknowledged.into_iter().collect();
        let before = ack_timestamps.len();
        ack_timestamps.retain(|policy_id, _| acknowledged.contains(policy_id));
        let mut repaired = before - ack_timestamps.len();

        for policy_id in &acknowledged {
            if !ack_timestamps.contains_key(policy_id) {
                ack_timestamps.insert(*policy_id, backfill_at);
                repaired += 1;
            }
        }

        (
            Self {
                id,
                name: name.into(),
                acknowledged,
                ack_timestamps,
            },
            repaired,
        )
    }

    pub fn has_acknowledged(&self, policy_id: PolicyId) -> bool {
        self.acknowledged.contains(&policy_id)
    }

    /// Returns when `policy_id` was acknowledged, if it was.
    pub fn acknowledged_at(&self, policy_id: PolicyId) -> Option<DateTime<Utc>> {
        self.ack_timestamps.get(&policy_id).copied()
    }

    /// Acknowledged policy ids in ascending order.
    pub fn acknowledged(&self) -> impl Iterator<Item = PolicyId> + '_ {
        self.acknowledged.iter().copied()
    }

    pub fn ack_timestamps(&self) -> &BTreeMap<PolicyId, DateTime<Utc>> {
        &self.ack_timestamps
    }

    /// Inserts an acknowledgement unless one exists. Returns whether state changed.
    pub(crate) fn insert_ack(&mut self, policy_id: PolicyId, at: DateTime<Utc>) -> bool {
        if self.acknowledged.contains(&policy_id) {
            return false;
        }
        self.acknowledged.insert(policy_id);
        self.ack_timestamps.insert(policy_id, at);
        true
    }

    /// Sets acknowledgement and timestamp, overwriting a present timestamp.
    pub(crate) fn put_ack(&mut self, policy_id: PolicyId, at: DateTime<Utc>) {
        self.acknowledged.insert(policy_id);
        self.ack_timestamps.insert(policy_id, at);
    }

    /// Removes an acknowledgement. Returns whether one was present.
    pub(crate) fn remove_ack(&mut self, policy_id: PolicyId) -> bool {
        let removed = self.acknowledged.remove(&policy_id);
        self.ack_timestamps.remove(&policy_id);
        removed
    }

    /// Drops acknowledgements whose policy id fails `keep`. Returns dropped count.
    pub(crate) fn retain_acks(&mut self, mut keep: impl FnMut(PolicyId) -> bool) -> usize {
        let before = self.acknowledged.len();
        self.acknowledged.retain(|policy_id| keep(*policy_id));
        let acknowledged = &self.acknowledged;
        self.ack_timestamps
            .retain(|policy_id, _| acknowledged.contains(policy_id));
        before - self.acknowledged.len()
    }
}
