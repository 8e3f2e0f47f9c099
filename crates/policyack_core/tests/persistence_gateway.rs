use chrono::{DateTime, TimeZone, Utc};
use policyack_core::db::open_db_in_memory;
use policyack_core::model::seed::{seed_employees, seed_policies};
use policyack_core::{
    FallbackReason, KeyValueStore, KvError, KvResult, LoadSource, PersistenceGateway, SaveOutcome,
    SqliteKeyValueStore, EMPLOYEES_KEY, POLICIES_KEY,
};
use std::cell::RefCell;
use std::collections::HashMap;

fn loaded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
}

/// Store that can be told to fail reads or writes.
#[derive(Default)]
struct FlakyStore {
    entries: RefCell<HashMap<String, String>>,
    fail_reads: bool,
    fail_writes_for: Option<&'static str>,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        if self.fail_reads {
            return Err(KvError::Unavailable("read refused".to_string()));
        }
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        if self.fail_writes_for == Some(key) {
            return Err(KvError::Unavailable("quota exceeded".to_string()));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[test]
fn empty_store_loads_seed_data_with_backfilled_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let mut gateway = PersistenceGateway::new(SqliteKeyValueStore::new(&conn));

    let loaded = gateway.load(loaded_at());

    assert_eq!(loaded.policies.policies(), seed_policies().as_slice());
    assert_eq!(loaded.ledger.employees(), seed_employees(loaded_at()).as_slice());
    assert_eq!(loaded.report.policies, LoadSource::Seed(FallbackReason::Missing));
    assert_eq!(loaded.report.employees, LoadSource::Seed(FallbackReason::Missing));
    assert_eq!(
        loaded.ledger.employee(2).unwrap().acknowledged_at(1),
        Some(loaded_at())
    );
}

#[test]
fn save_then_load_preserves_state() {
    let conn = open_db_in_memory().unwrap();
    let mut gateway = PersistenceGateway::new(SqliteKeyValueStore::new(&conn));
    let mut loaded = gateway.load(loaded_at());
    let acked_at = Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 15).unwrap();
    loaded.ledger.acknowledge(3, 3, acked_at).unwrap();

    let outcome = gateway.save(loaded.policies.policies(), loaded.ledger.employees());
    assert_eq!(outcome, SaveOutcome::Saved);

    let mut reopened = PersistenceGateway::new(SqliteKeyValueStore::new(&conn));
    let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let reloaded = reopened.load(later);

    assert!(reloaded.report.policies.is_persisted());
    assert!(reloaded.report.employees.is_persisted());
    assert_eq!(reloaded.policies, loaded.policies);
    assert_eq!(reloaded.ledger, loaded.ledger);
    assert_eq!(
        reloaded.ledger.employee(3).unwrap().acknowledged_at(3),
        Some(acked_at)
    );
}

#[test]
fn save_before_load_is_skipped() {
    let store = FlakyStore::default();
    let gateway = PersistenceGateway::new(&store);

    let outcome = gateway.save(&seed_policies(), &seed_employees(loaded_at()));

    assert_eq!(outcome, SaveOutcome::SkippedBeforeLoad);
    assert!(store.entries.borrow().is_empty());
}

#[test]
fn malformed_employees_do_not_block_valid_policies() {
    let store = FlakyStore::default();
    let policies_json = r#"[
        {"id": 1, "version": "2023-01-01", "title": "P1", "content": "a", "changelog": "x"},
        {"id": 2, "version": "2023-06-01", "title": "P2", "content": "b", "changelog": "y"},
        {"id": 5, "version": "2024-02-01", "title": "P5", "content": "c", "changelog": "z"},
        {"id": 4, "version": "2024-01-15", "title": "P4", "content": "d", "changelog": "w"}
    ]"#;
    store.set(POLICIES_KEY, policies_json).unwrap();
    store.set(EMPLOYEES_KEY, "{not json").unwrap();
    let mut gateway = PersistenceGateway::new(&store);

    let loaded = gateway.load(loaded_at());

    assert!(loaded.report.policies.is_persisted());
    assert!(matches!(
        loaded.report.employees,
        LoadSource::Seed(FallbackReason::Malformed(_))
    ));
    let ids: Vec<u32> = loaded.policies.policies().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 4, 5]);
    assert_eq!(loaded.ledger.employees().len(), 3);
}

#[test]
fn incompatible_policies_fall_back_while_employees_load() {
    let store = FlakyStore::default();
    store
        .set(
            POLICIES_KEY,
            r#"[{"id": 1, "version": "2023-01-01", "title": "Only", "content": "a", "changelog": ""}]"#,
        )
        .unwrap();
    store
        .set(
            EMPLOYEES_KEY,
            r#"[{"id": 7, "name": "Dana", "acknowledged": [2], "ackTimestamps": {"2": "2023-07-01T12:00:00.000Z"}}]"#,
        )
        .unwrap();
    let mut gateway = PersistenceGateway::new(&store);

    let loaded = gateway.load(loaded_at());

    assert!(matches!(
        loaded.report.policies,
        LoadSource::Seed(FallbackReason::Incompatible(_))
    ));
    assert!(loaded.report.employees.is_persisted());
    let dana = loaded.ledger.employee(7).unwrap();
    assert_eq!(
        dana.acknowledged_at(2),
        Some(Utc.with_ymd_and_hms(2023, 7, 1, 12, 0, 0).unwrap())
    );
}

#[test]
fn inconsistent_timestamps_are_repaired_on_load() {
    let store = FlakyStore::default();
    store
        .set(
            EMPLOYEES_KEY,
            r#"[
                {"id": 1, "name": "Alice", "acknowledged": [1, 3], "ackTimestamps": {"1": "2023-02-01T00:00:00Z", "2": "2023-07-01T00:00:00Z"}},
                {"id": 2, "name": "Bob", "acknowledged": [9]}
            ]"#,
        )
        .unwrap();
    let mut gateway = PersistenceGateway::new(&store);

    let loaded = gateway.load(loaded_at());

    let alice = loaded.ledger.employee(1).unwrap();
    assert_eq!(alice.acknowledged().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(alice.acknowledged_at(3), Some(loaded_at()));
    assert!(alice.acknowledged_at(2).is_none());
    assert_eq!(loaded.report.repaired_timestamps, 3);

    let bob = loaded.ledger.employee(2).unwrap();
    assert!(!bob.has_acknowledged(9));
    assert_eq!(loaded.report.pruned_acknowledgements, 1);
}

#[test]
fn read_failure_falls_back_to_seed() {
    let store = FlakyStore {
        fail_reads: true,
        ..FlakyStore::default()
    };
    let mut gateway = PersistenceGateway::new(&store);

    let loaded = gateway.load(loaded_at());

    assert!(matches!(
        loaded.report.policies,
        LoadSource::Seed(FallbackReason::ReadFailed(_))
    ));
    assert_eq!(loaded.policies.len(), 3);
    assert!(gateway.is_hydrated());
}

#[test]
fn write_failure_is_reported_not_raised() {
    let store = FlakyStore {
        fail_writes_for: Some(POLICIES_KEY),
        ..FlakyStore::default()
    };
    let mut gateway = PersistenceGateway::new(&store);
    let loaded = gateway.load(loaded_at());

    let outcome = gateway.save(loaded.policies.policies(), loaded.ledger.employees());

    assert!(matches!(outcome, SaveOutcome::Failed(ref message) if message.contains(POLICIES_KEY)));
    assert!(store.entries.borrow().contains_key(EMPLOYEES_KEY));
}
