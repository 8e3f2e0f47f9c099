//! Load/save of the policy and employee collections.
//!
//! # Responsibility
//! - Hydrate in-memory state from the key/value store.
//! - Fall back to seed data per collection on missing or corrupt records.
//! - Persist both collections after committed mutations.
//!
//! # Invariants
//! - `load` never fails; each collection falls back independently.
//! - `save` is a no-op until the first `load` completes.
//! - `save` failures are logged and reported, never raised.

use crate::model::employee::Employee;
use crate::model::policy::Policy;
use crate::model::seed::{seed_employees, seed_policies};
use crate::persistence::record::{
    decode_employees, decode_policies, EmployeeRecord, IncompatibleData, PolicyRecord,
};
use crate::repo::kv_repo::KeyValueStore;
use crate::store::ledger::AcknowledgementLedger;
use crate::store::policy_store::PolicyStore;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Store key for the policy collection.
pub const POLICIES_KEY: &str = "policyack.policies.v1";
/// Store key for the employee collection.
pub const EMPLOYEES_KEY: &str = "policyack.employees.v1";

/// Why a collection was replaced by seed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No record under the key.
    Missing,
    /// Store read failed.
    ReadFailed(String),
    /// Record is not valid JSON for the expected shape.
    Malformed(String),
    /// Record parsed but violates a collection invariant.
    Incompatible(String),
}

/// Where a loaded collection came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Persisted,
    Seed(FallbackReason),
}

impl LoadSource {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub policies: LoadSource,
    pub employees: LoadSource,
    /// Timestamp entries synthesized or dropped to restore the ack invariant.
    pub repaired_timestamps: usize,
    /// Acknowledgements dropped because their policy no longer exists.
    pub pruned_acknowledgements: usize,
}

/// Hydrated state returned by [`PersistenceGateway::load`].
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub policies: PolicyStore,
    pub ledger: AcknowledgementLedger,
    pub report: LoadReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// `load` has not completed yet; durable state left untouched.
    SkippedBeforeLoad,
    /// At least one record failed to write.
    Failed(String),
}

pub struct PersistenceGateway<S: KeyValueStore> {
    store: S,
    hydrated: bool,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            hydrated: false,
        }
    }

    /// Returns whether `load` has completed at least once.
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Reads both collections, falling back to seed data per collection.
    ///
    /// `loaded_at` backfills acknowledgements that carry no timestamp.
    pub fn load(&mut self, loaded_at: DateTime<Utc>) -> LoadedState {
        let (policies, policies_source) = match self
            .read_record::<Vec<PolicyRecord>>(POLICIES_KEY)
            .and_then(|records| decode_policies(records).map_err(incompatible))
            .and_then(|policies| {
                PolicyStore::new(policies).map_err(|err| FallbackReason::Incompatible(err.to_string()))
            }) {
            Ok(store) => (store, LoadSource::Persisted),
            Err(reason) => {
                log_fallback(POLICIES_KEY, &reason);
                (seed_policy_store(), LoadSource::Seed(reason))
            }
        };

        let (employees, employees_source, repaired_timestamps) = match self
            .read_record::<Vec<EmployeeRecord>>(EMPLOYEES_KEY)
            .and_then(|records| decode_employees(records, loaded_at).map_err(incompatible))
        {
            Ok((employees, repaired)) => (employees, LoadSource::Persisted, repaired),
            Err(reason) => {
                log_fallback(EMPLOYEES_KEY, &reason);
                (seed_employees(loaded_at), LoadSource::Seed(reason), 0)
            }
        };

        let mut ledger = AcknowledgementLedger::new(employees);
        let pruned_acknowledgements = ledger.prune_unknown(|policy_id| policies.contains(policy_id));

        self.hydrated = true;
        info!(
            "event=state_load module=persistence status=ok policies={} policies_persisted={} employees={} employees_persisted={} repaired={} pruned={}",
            policies.len(),
            policies_source.is_persisted(),
            ledger.employees().len(),
            employees_source.is_persisted(),
            repaired_timestamps,
            pruned_acknowledgements
        );

        LoadedState {
            policies,
            ledger,
            report: LoadReport {
                policies: policies_source,
                employees: employees_source,
                repaired_timestamps,
                pruned_acknowledgements,
            },
        }
    }

    /// Writes both collections.
    ///
    /// Skipped before the first `load`. Both writes are attempted even if the
    /// first fails.
    pub fn save(&self, policies: &[Policy], employees: &[Employee]) -> SaveOutcome {
        if !self.hydrated {
            warn!("event=state_save module=persistence status=skipped reason=not_hydrated");
            return SaveOutcome::SkippedBeforeLoad;
        }

        let policy_records: Vec<PolicyRecord> = policies.iter().map(PolicyRecord::from).collect();
        let employee_records: Vec<EmployeeRecord> =
            employees.iter().map(EmployeeRecord::from).collect();

        let failures: Vec<String> = [
            self.write_record(POLICIES_KEY, &policy_records),
            self.write_record(EMPLOYEES_KEY, &employee_records),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if failures.is_empty() {
            info!(
                "event=state_save module=persistence status=ok policies={} employees={}",
                policies.len(),
                employees.len()
            );
            SaveOutcome::Saved
        } else {
            SaveOutcome::Failed(failures.join("; "))
        }
    }

    fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<T, FallbackReason> {
        let raw = self
            .store
            .get(key)
            .map_err(|err| FallbackReason::ReadFailed(err.to_string()))?
            .ok_or(FallbackReason::Missing)?;
        serde_json::from_str(&raw).map_err(|err| FallbackReason::Malformed(err.to_string()))
    }

    fn write_record<T: Serialize>(&self, key: &str, value: &T) -> Result<(), String> {
        let encoded = serde_json::to_string(value).map_err(|err| {
            error!(
                "event=state_save module=persistence status=error key={} error_code=encode_failed error={}",
                key, err
            );
            format!("{key}: {err}")
        })?;
        self.store.set(key, &encoded).map_err(|err| {
            error!(
                "event=state_save module=persistence status=error key={} error_code=write_failed error={}",
                key, err
            );
            format!("{key}: {err}")
        })
    }
}

fn incompatible(err: IncompatibleData) -> FallbackReason {
    FallbackReason::Incompatible(err.0)
}

fn seed_policy_store() -> PolicyStore {
    PolicyStore::new(seed_policies()).expect("seed policy set is non-empty")
}

fn log_fallback(key: &str, reason: &FallbackReason) {
    match reason {
        FallbackReason::Missing => info!(
            "event=state_load module=persistence status=fallback key={} reason=missing",
            key
        ),
        FallbackReason::ReadFailed(err) => error!(
            "event=state_load module=persistence status=fallback key={} reason=read_failed error={}",
            key, err
        ),
        FallbackReason::Malformed(err) => warn!(
            "event=state_load module=persistence status=fallback key={} reason=malformed error={}",
            key, err
        ),
        FallbackReason::Incompatible(err) => warn!(
            "event=state_load module=persistence status=fallback key={} reason=incompatible error={}",
            key, err
        ),
    }
}
