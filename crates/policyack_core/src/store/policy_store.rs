//! Ordered policy version collection.
//!
//! # Responsibility
//! - Own the chronologically ordered list of policy versions.
//! - Allocate ids and enforce publish ordering.
//! - Re-insert deleted policies for undo.
//!
//! # Invariants
//! - Policies are sorted ascending by `version` at all times.
//! - At least one policy exists at all times.
//! - New ids are `max(existing ids) + 1`; publishing fails once that
//!   overflows `PolicyId`.
//! - Equal versions only arise through `restore`; the restored policy sorts
//!   after existing policies of the same version and becomes `latest` on a
//!   tie at the top.

use crate::model::policy::{Policy, PolicyDraft, PolicyId, PolicyValidationError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, PolicyStoreError>;

/// Errors raised by policy store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyStoreError {
    /// Publish input violates a field or ordering rule.
    Validation(PolicyValidationError),
    /// Deleting would leave the collection empty.
    LastPolicy(PolicyId),
    /// No policy with this id exists.
    NotFound(PolicyId),
    /// Initial collection is empty.
    Empty,
    /// No id above the current maximum is left to allocate.
    IdsExhausted,
}

impl Display for PolicyStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::LastPolicy(id) => {
                write!(f, "cannot delete policy {id}: at least one policy must remain")
            }
            Self::NotFound(id) => write!(f, "policy not found: {id}"),
            Self::Empty => write!(f, "policy collection must not be empty"),
            Self::IdsExhausted => write!(f, "no policy id left to allocate"),
        }
    }
}

impl Error for PolicyStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PolicyValidationError> for PolicyStoreError {
    fn from(value: PolicyValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Result of re-inserting a previously removed policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Policy was inserted at its version position.
    Restored,
    /// A policy with the same id already exists; nothing changed.
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStore {
    policies: Vec<Policy>,
}

impl PolicyStore {
    /// Builds a store from an initial collection, sorting it by version.
    ///
    /// # Errors
    /// - `Empty` when `policies` is empty.
    pub fn new(mut policies: Vec<Policy>) -> StoreResult<Self> {
        if policies.is_empty() {
            return Err(PolicyStoreError::Empty);
        }
        sort_by_version(&mut policies);
        Ok(Self { policies })
    }

    /// Policies in ascending version order.
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn get(&self, id: PolicyId) -> Option<&Policy> {
        self.policies.iter().find(|policy| policy.id == id)
    }

    pub fn contains(&self, id: PolicyId) -> bool {
        self.get(id).is_some()
    }

    /// Returns the policy with the greatest version.
    pub fn latest(&self) -> &Policy {
        // Non-empty by construction; `delete` refuses to remove the last one.
        &self.policies[self.policies.len() - 1]
    }

    /// Returns the policy immediately before `id` in version order.
    pub fn previous_of(&self, id: PolicyId) -> Option<&Policy> {
        let index = self.position(id)?;
        index.checked_sub(1).map(|prev| &self.policies[prev])
    }

    /// Id that the next `add` would allocate, or `None` when ids are exhausted.
    pub fn next_id(&self) -> Option<PolicyId> {
        self.policies
            .iter()
            .map(|policy| policy.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
    }

    /// Publishes a new policy version.
    ///
    /// # Errors
    /// - `Validation` for blank fields, unparsable dates, or a version not
    ///   strictly after the latest one. The collection is unchanged.
    /// - `IdsExhausted` when the maximum id is `PolicyId::MAX`.
    pub fn add(&mut self, draft: &PolicyDraft) -> StoreResult<&Policy> {
        let validated = draft.validate()?;
        let latest = self.latest().version;
        if validated.version <= latest {
            return Err(PolicyValidationError::VersionNotAfterLatest {
                version: validated.version,
                latest,
            }
            .into());
        }

        let id = self.next_id().ok_or_else(|| {
            warn!("event=policy_add module=store status=rejected reason=ids_exhausted");
            PolicyStoreError::IdsExhausted
        })?;
        self.policies.push(validated.into_policy(id));
        sort_by_version(&mut self.policies);
        info!(
            "event=policy_add module=store status=ok policy_id={} count={}",
            id,
            self.policies.len()
        );

        let index = self.position(id).unwrap_or(self.policies.len() - 1);
        Ok(&self.policies[index])
    }

    /// Removes a policy and returns it for snapshotting.
    ///
    /// # Errors
    /// - `NotFound` when `id` is unknown.
    /// - `LastPolicy` when it is the only remaining policy.
    pub fn delete(&mut self, id: PolicyId) -> StoreResult<Policy> {
        let index = self.position(id).ok_or(PolicyStoreError::NotFound(id))?;
        if self.policies.len() <= 1 {
            warn!(
                "event=policy_delete module=store status=rejected policy_id={} reason=last_policy",
                id
            );
            return Err(PolicyStoreError::LastPolicy(id));
        }

        let removed = self.policies.remove(index);
        info!(
            "event=policy_delete module=store status=ok policy_id={} count={}",
            id,
            self.policies.len()
        );
        Ok(removed)
    }

    /// Re-inserts a removed policy at its version position.
    ///
    /// Idempotent: when the id is already present, nothing changes.
    pub fn restore(&mut self, policy: Policy) -> RestoreOutcome {
        if self.contains(policy.id) {
            info!(
                "event=policy_restore module=store status=skipped policy_id={} reason=already_present",
                policy.id
            );
            return RestoreOutcome::AlreadyPresent;
        }

        let id = policy.id;
        let index = self
            .policies
            .partition_point(|existing| existing.version <= policy.version);
        self.policies.insert(index, policy);
        info!(
            "event=policy_restore module=store status=ok policy_id={} count={}",
            id,
            self.policies.len()
        );
        RestoreOutcome::Restored
    }

    fn position(&self, id: PolicyId) -> Option<usize> {
        self.policies.iter().position(|policy| policy.id == id)
    }
}

fn sort_by_version(policies: &mut [Policy]) {
    // Stable: equal versions keep insertion order.
    policies.sort_by_key(|policy| policy.version);
}
