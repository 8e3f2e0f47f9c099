use chrono::{DateTime, Duration, TimeZone, Utc};
use policyack_core::db::open_db_in_memory;
use policyack_core::{
    Clock, DashboardFilter, DeleteOutcome, DiffKind, ErrorKind, FixedClock, KeyValueStore,
    KvError, KvResult, NoticeActionKind, PolicyAckService, PolicyDraft, PolicyServiceError,
    PolicyStoreError, SaveOutcome, SqliteKeyValueStore, StatusFilter, UndoOutcome, POLICIES_KEY,
};
use rusqlite::Connection;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn v4_draft() -> PolicyDraft {
    PolicyDraft {
        title: "Expense Policy v4".to_string(),
        version: "2024-06-01".to_string(),
        content: "Allowed categories: Travel, Meals, Office Supplies, Training. Limit: $1200 per trip."
            .to_string(),
        changelog: String::new(),
        reason: Some("Higher airfare costs".to_string()),
    }
}

/// Store that starts empty and rejects every write.
struct RejectingStore;

impl KeyValueStore for RejectingStore {
    fn get(&self, _key: &str) -> KvResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> KvResult<()> {
        Err(KvError::Unavailable("disk full".to_string()))
    }
}

fn approve(_: &str) -> bool {
    true
}

fn decline(_: &str) -> bool {
    false
}

fn open<'a>(
    conn: &'a Connection,
    clock: &'a FixedClock,
) -> PolicyAckService<SqliteKeyValueStore<'a>, &'a FixedClock> {
    PolicyAckService::open(SqliteKeyValueStore::new(conn), clock)
}

#[test]
fn seed_scenario_publish_acknowledge_delete_undo() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    let published = service.publish(&v4_draft()).unwrap();
    assert_eq!(published.id, 4);
    assert_eq!(published.changelog, "Higher airfare costs");
    assert_eq!(service.history().len(), 4);
    assert_eq!(service.history().last().unwrap().id, 4);
    let coverage = service.coverage(4).unwrap();
    assert_eq!((coverage.acknowledged, coverage.total), (0, 3));

    clock.advance(Duration::minutes(5));
    let ack_at = clock.now();
    service.switch_user(1).unwrap();
    service.acknowledge(4).unwrap();
    let coverage = service.coverage(4).unwrap();
    assert_eq!((coverage.acknowledged, coverage.total), (1, 3));
    assert_eq!(
        service.employees()[0].acknowledged_at(4),
        Some(ack_at)
    );

    let bob_ack_before = service.employees()[1].acknowledged_at(2);
    assert!(bob_ack_before.is_some());

    let outcome = service.delete_policy(2, &approve).unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted { acknowledgements_removed: 1, .. }));
    assert!(!service.employees()[1].has_acknowledged(2));
    assert!(matches!(
        service.coverage(2).unwrap_err(),
        PolicyServiceError::PolicyNotFound(2)
    ));

    clock.advance(Duration::hours(1));
    let undone = service.undo();
    assert!(matches!(undone, UndoOutcome::Restored { ref policy, .. } if policy.id == 2));
    assert_eq!(service.employees()[1].acknowledged_at(2), bob_ack_before);
    let ids: Vec<u32> = service.history().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn state_survives_reopen() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    {
        let mut service = open(&conn, &clock);
        service.publish(&v4_draft()).unwrap();
        service.switch_user(3).unwrap();
        service.acknowledge(4).unwrap();
        assert_eq!(service.last_save(), Some(&SaveOutcome::Saved));
    }

    clock.advance(Duration::days(2));
    let service = open(&conn, &clock);

    assert!(service.load_report().policies.is_persisted());
    assert_eq!(service.latest().id, 4);
    assert_eq!(service.employees()[2].acknowledged_at(4), Some(start()));
    // Seed acknowledgements keep their first-load backfill.
    assert_eq!(service.employees()[0].acknowledged_at(1), Some(start()));
}

#[test]
fn publish_rejects_non_increasing_version() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    let mut draft = v4_draft();
    draft.version = "2024-01-01".to_string();
    let err = service.publish(&draft).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.history().len(), 3);
    assert!(service.last_save().is_none());
}

#[test]
fn declined_confirmation_leaves_state_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    let outcome = service.delete_policy(1, &decline).unwrap();

    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(service.history().len(), 3);
    assert!(service.employees()[0].has_acknowledged(1));
    assert!(!service.state().undo().is_armed());
}

#[test]
fn deleting_sole_policy_is_an_invariant_violation_checked_before_confirm() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);
    service.delete_policy(1, &approve).unwrap();
    service.delete_policy(2, &approve).unwrap();

    let asked = std::cell::Cell::new(false);
    let err = service
        .delete_policy(3, &|_: &str| {
            asked.set(true);
            true
        })
        .unwrap_err();

    assert_eq!(err, PolicyServiceError::LastPolicy(3));
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert!(!asked.get());
    assert_eq!(service.history().len(), 1);
}

#[test]
fn undo_notice_action_runs_once_and_expiry_keeps_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    let DeleteOutcome::Deleted {
        notice_generation, ..
    } = service.delete_policy(3, &approve).unwrap()
    else {
        panic!("delete should succeed");
    };
    let notice = service.current_notice().unwrap();
    assert_eq!(notice.generation, notice_generation);
    assert_eq!(
        notice.action.as_ref().map(|action| action.kind),
        Some(NoticeActionKind::UndoDeletion)
    );

    assert!(service.expire_notice(notice_generation));
    assert!(service.state().undo().is_armed());
    assert!(service.trigger_notice_action(notice_generation).is_none());

    let DeleteOutcome::Deleted {
        notice_generation, ..
    } = service.delete_policy(2, &approve).unwrap()
    else {
        panic!("delete should succeed");
    };
    let first = service.trigger_notice_action(notice_generation);
    assert!(matches!(first, Some(UndoOutcome::Restored { ref policy, .. }) if policy.id == 2));
    assert!(service.trigger_notice_action(notice_generation).is_none());
    assert!(service.state().policies().get(3).is_none());
}

#[test]
fn publishing_into_a_reused_id_clears_pending_undo() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    service.delete_policy(3, &approve).unwrap();
    let mut draft = v4_draft();
    draft.version = "2023-09-01".to_string();
    let published = service.publish(&draft).unwrap();

    assert_eq!(published.id, 3);
    assert!(!service.state().undo().is_armed());
    assert_eq!(service.undo(), UndoOutcome::NothingToUndo);
    assert_eq!(service.state().policies().get(3), Some(&published));
}

#[test]
fn acknowledge_is_self_service_and_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    service.switch_user(3).unwrap();
    let first = service.acknowledge(3).unwrap();
    clock.advance(Duration::days(1));
    let second = service.acknowledge(3).unwrap();

    assert!(first.is_new());
    assert!(!second.is_new());
    assert_eq!(second.acknowledged_at(), start());
    assert!(!service.employees()[0].has_acknowledged(3));
    assert!(!service.employees()[1].has_acknowledged(3));

    assert!(matches!(
        service.acknowledge(99).unwrap_err(),
        PolicyServiceError::PolicyNotFound(99)
    ));
    assert!(matches!(
        service.switch_user(42).unwrap_err(),
        PolicyServiceError::UnknownEmployee(42)
    ));
}

#[test]
fn version_view_diffs_against_previous_version() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let service = open(&conn, &clock);

    let first = service.version_view(1).unwrap();
    assert!(first.previous.is_none());
    assert!(first.diff.is_none());
    assert!(first.acknowledged_at.is_some());

    let second = service.version_view(2).unwrap();
    assert_eq!(second.previous.as_ref().map(|p| p.id), Some(1));
    let diff = second.diff.unwrap();
    assert!(diff
        .iter()
        .any(|part| part.kind == DiffKind::Added && part.text.contains("Office")));
    assert!(diff
        .iter()
        .any(|part| part.kind == DiffKind::Removed && part.text.contains("500")));
    assert!(!second.is_latest);
    assert!(service.version_view(3).unwrap().is_latest);

    let preview = service.preview_against_latest("Allowed categories: Travel.");
    assert!(preview.iter().any(|part| part.kind == DiffKind::Removed));
}

#[test]
fn dashboard_filters_and_latest_summary() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    let summary = service.latest_summary();
    assert_eq!(summary.policy.id, 3);
    assert_eq!(summary.percentage, 0);
    assert_eq!(summary.pending, 3);

    let all = service.dashboard(&DashboardFilter::default());
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].cells.len(), 3);
    assert!(all[1].cells[1].is_acknowledged());

    let pending_v2 = service.dashboard(&DashboardFilter {
        name_query: None,
        status: StatusFilter::Pending(2),
    });
    let names: Vec<&str> = pending_v2.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Charlie"]);

    let by_name = service.dashboard(&DashboardFilter {
        name_query: Some("  bO ".to_string()),
        status: StatusFilter::All,
    });
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].employee_id, 2);

    service.switch_user(2).unwrap();
    service.acknowledge(3).unwrap();
    let summary = service.latest_summary();
    assert_eq!(summary.coverage.acknowledged, 1);
    assert_eq!(summary.percentage, 33);
}

#[test]
fn publish_highlight_expires_by_generation() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);

    service.publish(&v4_draft()).unwrap();
    let generation = service.highlight_generation().unwrap();
    assert_eq!(service.highlighted_policy(), Some(4));

    let mut next = v4_draft();
    next.title = "Expense Policy v5".to_string();
    next.version = "2024-09-01".to_string();
    service.publish(&next).unwrap();

    assert!(!service.expire_highlight(generation));
    assert_eq!(service.highlighted_policy(), Some(5));
}

#[test]
fn failed_saves_keep_committed_state_in_memory() {
    let clock = FixedClock::new(start());
    let mut service = PolicyAckService::open(RejectingStore, &clock);

    service.publish(&v4_draft()).unwrap();
    assert!(matches!(service.last_save(), Some(SaveOutcome::Failed(_))));

    service.switch_user(3).unwrap();
    assert!(service.acknowledge(4).unwrap().is_new());
    let outcome = service.delete_policy(2, &approve).unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted { .. }));

    let ids: Vec<u32> = service.history().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert!(service.employees()[2].has_acknowledged(4));
    assert!(!service.employees()[1].has_acknowledged(2));
    assert!(matches!(service.last_save(), Some(SaveOutcome::Failed(_))));

    let undone = service.undo();
    assert!(matches!(undone, UndoOutcome::Restored { ref policy, .. } if policy.id == 2));
    let ids: Vec<u32> = service.history().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(service.employees()[1].acknowledged_at(2), Some(start()));
    assert!(matches!(service.last_save(), Some(SaveOutcome::Failed(_))));
}

#[test]
fn publish_after_loading_maximal_policy_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    SqliteKeyValueStore::new(&conn)
        .set(
            POLICIES_KEY,
            r#"[
                {"id":1,"version":"2023-01-01","title":"v1","content":"Limit: $500."},
                {"id":2,"version":"2023-06-01","title":"v2","content":"Limit: $700."},
                {"id":4294967295,"version":"2024-01-01","title":"v3","content":"Limit: $1000."}
            ]"#,
        )
        .unwrap();
    let clock = FixedClock::new(start());
    let mut service = open(&conn, &clock);
    assert!(service.load_report().policies.is_persisted());

    let err = service.publish(&v4_draft()).unwrap_err();

    assert_eq!(err, PolicyServiceError::Store(PolicyStoreError::IdsExhausted));
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert_eq!(service.history().len(), 3);
    assert!(service.last_save().is_none());
}
