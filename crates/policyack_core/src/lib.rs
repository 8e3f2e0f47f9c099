//! Core domain logic for policy version acknowledgement tracking.
//! This crate is the single source of truth for business invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod diff;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod repo;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use diff::{diff_words, DiffKind, DiffPart};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::employee::{Employee, EmployeeId};
pub use model::policy::{Policy, PolicyDraft, PolicyId, PolicyValidationError};
pub use persistence::gateway::{
    FallbackReason, LoadReport, LoadSource, PersistenceGateway, SaveOutcome, EMPLOYEES_KEY,
    POLICIES_KEY,
};
pub use repo::kv_repo::{KeyValueStore, KvError, KvResult, SqliteKeyValueStore};
pub use service::notice::{Notice, NoticeAction, NoticeActionKind};
pub use service::policy_service::{
    AppState, ConfirmGate, CoverageSummary, DeleteOutcome, ErrorKind, PolicyAckService,
    PolicyServiceError, PolicyVersionView,
};
pub use store::coverage::{percentage, Coverage, DashboardFilter, DashboardRow, StatusFilter};
pub use store::ledger::{AckOutcome, AcknowledgementLedger, LedgerError};
pub use store::policy_store::{PolicyStore, PolicyStoreError, RestoreOutcome};
pub use store::undo::{
    DeletionSnapshot, DeletionUndoManager, SnapshotEntry, UndoOutcome, UndoState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
