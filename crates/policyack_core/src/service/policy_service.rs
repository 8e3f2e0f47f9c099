//! Policy acknowledgement use-case service.
//!
//! # Responsibility
//! - Own the application-state aggregate (policies, ledger, undo slot,
//!   acting user) and route every user action through it.
//! - Persist after each committed mutation.
//! - Post notices for publish, acknowledge, delete and undo.
//!
//! # Invariants
//! - Destructive operations validate fully before any mutation.
//! - Delete proceeds only after the confirmation gate approves.
//! - Acknowledgements only ever touch the acting user's record.
//! - Read-side views are recomputed from current state on every call.

use crate::clock::Clock;
use crate::diff::{diff_words, DiffPart};
use crate::model::employee::{Employee, EmployeeId};
use crate::model::policy::{Policy, PolicyDraft, PolicyId, PolicyValidationError};
use crate::persistence::gateway::{LoadReport, PersistenceGateway, SaveOutcome};
use crate::repo::kv_repo::KeyValueStore;
use crate::service::notice::{Notice, NoticeActionKind, NoticeBoard};
use crate::store::coverage::{dashboard_rows, Coverage, DashboardFilter, DashboardRow};
use crate::store::ledger::{AckOutcome, AcknowledgementLedger, LedgerError};
use crate::store::policy_store::{PolicyStore, PolicyStoreError};
use crate::store::undo::{DeletionUndoManager, UndoOutcome};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const UNDO_LABEL: &str = "Undo";

/// Human confirmation gate consulted before destructive operations.
pub trait ConfirmGate {
    fn confirm(&self, message: &str) -> bool;
}

impl<F: Fn(&str) -> bool> ConfirmGate for F {
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Error taxonomy surfaced to the caller of a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvariantViolation,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyServiceError {
    /// Publish input rejected; nothing changed.
    Validation(PolicyValidationError),
    /// Deleting would remove the last policy; nothing changed.
    LastPolicy(PolicyId),
    PolicyNotFound(PolicyId),
    UnknownEmployee(EmployeeId),
    /// Store rejected the operation for another structural reason.
    Store(PolicyStoreError),
}

impl PolicyServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::LastPolicy(_) | Self::Store(_) => ErrorKind::InvariantViolation,
            Self::PolicyNotFound(_) | Self::UnknownEmployee(_) => ErrorKind::NotFound,
        }
    }
}

impl Display for PolicyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::LastPolicy(_) => write!(f, "at least one policy must remain"),
            Self::PolicyNotFound(id) => write!(f, "policy not found: {id}"),
            Self::UnknownEmployee(id) => write!(f, "employee not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PolicyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PolicyStoreError> for PolicyServiceError {
    fn from(value: PolicyStoreError) -> Self {
        match value {
            PolicyStoreError::Validation(err) => Self::Validation(err),
            PolicyStoreError::LastPolicy(id) => Self::LastPolicy(id),
            PolicyStoreError::NotFound(id) => Self::PolicyNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<LedgerError> for PolicyServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::UnknownEmployee(id) => Self::UnknownEmployee(id),
        }
    }
}

pub type ServiceResult<T> = Result<T, PolicyServiceError>;

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Confirmation declined; nothing changed.
    Cancelled,
    /// Policy removed; `notice_generation` identifies the undo notice.
    Deleted {
        policy: Policy,
        acknowledgements_removed: usize,
        notice_generation: u64,
    },
}

/// One policy version with its change preview for the acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersionView {
    pub policy: Policy,
    pub previous: Option<Policy>,
    /// Word diff against `previous`; `None` for the first version.
    pub diff: Option<Vec<DiffPart>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub is_latest: bool,
}

/// Coverage summary card for one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageSummary {
    pub policy: Policy,
    pub coverage: Coverage,
    pub percentage: u32,
    pub pending: usize,
}

/// Application-state aggregate owned by the service.
#[derive(Debug, Clone)]
pub struct AppState {
    policies: PolicyStore,
    ledger: AcknowledgementLedger,
    undo: DeletionUndoManager,
    current_user: EmployeeId,
}

impl AppState {
    pub fn policies(&self) -> &PolicyStore {
        &self.policies
    }

    pub fn ledger(&self) -> &AcknowledgementLedger {
        &self.ledger
    }

    pub fn undo(&self) -> &DeletionUndoManager {
        &self.undo
    }

    pub fn current_user(&self) -> EmployeeId {
        self.current_user
    }
}

/// Facade for every user-facing operation.
pub struct PolicyAckService<S: KeyValueStore, C: Clock> {
    state: AppState,
    gateway: PersistenceGateway<S>,
    clock: C,
    notices: NoticeBoard,
    load_report: LoadReport,
    last_save: Option<SaveOutcome>,
}

impl<S: KeyValueStore, C: Clock> PolicyAckService<S, C> {
    /// Hydrates state from `store` and selects the first employee as actor.
    pub fn open(store: S, clock: C) -> Self {
        let mut gateway = PersistenceGateway::new(store);
        let loaded = gateway.load(clock.now());
        let current_user = loaded
            .ledger
            .employees()
            .first()
            .map_or(0, |employee| employee.id);

        Self {
            state: AppState {
                policies: loaded.policies,
                ledger: loaded.ledger,
                undo: DeletionUndoManager::new(),
                current_user,
            },
            gateway,
            clock,
            notices: NoticeBoard::new(),
            load_report: loaded.report,
            last_save: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Outcome of the most recent save, if any mutation happened.
    pub fn last_save(&self) -> Option<&SaveOutcome> {
        self.last_save.as_ref()
    }

    pub fn current_user(&self) -> Option<&Employee> {
        self.state.ledger.employee(self.state.current_user)
    }

    /// Changes the acting employee.
    pub fn switch_user(&mut self, employee_id: EmployeeId) -> ServiceResult<()> {
        if self.state.ledger.employee(employee_id).is_none() {
            return Err(PolicyServiceError::UnknownEmployee(employee_id));
        }
        self.state.current_user = employee_id;
        Ok(())
    }

    /// Acknowledges `policy_id` as the acting user.
    ///
    /// Idempotent; repeated calls keep the first timestamp and do not save.
    pub fn acknowledge(&mut self, policy_id: PolicyId) -> ServiceResult<AckOutcome> {
        let title = self
            .state
            .policies
            .get(policy_id)
            .map(|policy| policy.title.clone())
            .ok_or(PolicyServiceError::PolicyNotFound(policy_id))?;

        let outcome =
            self.state
                .ledger
                .acknowledge(self.state.current_user, policy_id, self.clock.now())?;
        if outcome.is_new() {
            self.persist();
            self.notices.post(format!("Acknowledged {title}"));
        }
        Ok(outcome)
    }

    /// Publishes a new policy version.
    ///
    /// # Errors
    /// - `Validation` for blank fields, bad dates, or a non-increasing date.
    pub fn publish(&mut self, draft: &PolicyDraft) -> ServiceResult<Policy> {
        let policy = self.state.policies.add(draft)?.clone();

        // A reused id would make the pending snapshot replay onto the new policy.
        if self
            .state
            .undo
            .pending()
            .is_some_and(|snapshot| snapshot.policy().id == policy.id)
        {
            self.state.undo.clear();
        }

        self.persist();
        self.notices.highlight(policy.id);
        self.notices.post(format!("Published {}", policy.title));
        Ok(policy)
    }

    /// Deletes a policy after confirmation and arms undo.
    ///
    /// # Errors
    /// - `PolicyNotFound` for an unknown id.
    /// - `LastPolicy` when only one policy remains.
    pub fn delete_policy(
        &mut self,
        policy_id: PolicyId,
        confirm: &impl ConfirmGate,
    ) -> ServiceResult<DeleteOutcome> {
        let policy = self
            .state
            .policies
            .get(policy_id)
            .ok_or(PolicyServiceError::PolicyNotFound(policy_id))?;
        if self.state.policies.len() <= 1 {
            return Err(PolicyServiceError::LastPolicy(policy_id));
        }

        let prompt = format!("Delete {} ({})?", policy.title, policy.version_label());
        if !confirm.confirm(&prompt) {
            info!(
                "event=policy_delete module=service status=cancelled policy_id={}",
                policy_id
            );
            return Ok(DeleteOutcome::Cancelled);
        }

        let removed = self.state.policies.delete(policy_id)?;
        self.state
            .undo
            .record_deletion(removed.clone(), self.state.ledger.employees());
        let acknowledgements_removed = self.state.ledger.cascade_delete(policy_id);

        if self.notices.highlighted() == Some(policy_id) {
            self.notices.clear_highlight();
        }
        self.persist();
        let notice_generation = self.notices.post_with_action(
            format!("Deleted {}", removed.title),
            UNDO_LABEL,
            NoticeActionKind::UndoDeletion,
        );

        Ok(DeleteOutcome::Deleted {
            policy: removed,
            acknowledgements_removed,
            notice_generation,
        })
    }

    /// Restores the most recent deletion, if one is pending.
    pub fn undo(&mut self) -> UndoOutcome {
        let outcome =
            self.state
                .undo
                .undo(&mut self.state.policies, &mut self.state.ledger, self.clock.now());
        match &outcome {
            UndoOutcome::Restored { policy, .. } => {
                self.persist();
                self.notices.post(format!("Restored {}", policy.title));
            }
            UndoOutcome::Skipped { policy } => {
                warn!(
                    "event=undo module=service status=skipped policy_id={} reason=id_in_use",
                    policy.id
                );
            }
            UndoOutcome::NothingToUndo => {}
        }
        outcome
    }

    /// Discards the pending deletion snapshot.
    pub fn clear_undo(&mut self) {
        self.state.undo.clear();
    }

    /// Runs the action of the notice at `generation`, once.
    ///
    /// Returns `None` when the notice is gone, superseded or has no action.
    pub fn trigger_notice_action(&mut self, generation: u64) -> Option<UndoOutcome> {
        match self.notices.take_action(generation)? {
            NoticeActionKind::UndoDeletion => Some(self.undo()),
        }
    }

    pub fn current_notice(&self) -> Option<Notice> {
        self.notices.current()
    }

    /// Dismisses the notice at `generation`; the undo snapshot stays armed.
    pub fn expire_notice(&mut self, generation: u64) -> bool {
        self.notices.expire(generation)
    }

    pub fn highlighted_policy(&self) -> Option<PolicyId> {
        self.notices.highlighted()
    }

    pub fn highlight_generation(&self) -> Option<u64> {
        self.notices.highlight_generation()
    }

    pub fn expire_highlight(&mut self, generation: u64) -> bool {
        self.notices.expire_highlight(generation)
    }

    /// All versions in ascending version order.
    pub fn history(&self) -> &[Policy] {
        self.state.policies.policies()
    }

    pub fn latest(&self) -> &Policy {
        self.state.policies.latest()
    }

    pub fn employees(&self) -> &[Employee] {
        self.state.ledger.employees()
    }

    /// Policy detail with diff against its predecessor.
    pub fn version_view(&self, policy_id: PolicyId) -> ServiceResult<PolicyVersionView> {
        let policy = self
            .state
            .policies
            .get(policy_id)
            .ok_or(PolicyServiceError::PolicyNotFound(policy_id))?;
        let previous = self.state.policies.previous_of(policy_id);
        let acknowledged_at = self
            .current_user()
            .and_then(|employee| employee.acknowledged_at(policy_id));

        Ok(PolicyVersionView {
            policy: policy.clone(),
            previous: previous.cloned(),
            diff: previous.map(|prev| diff_words(&prev.content, &policy.content)),
            acknowledged_at,
            is_latest: self.state.policies.latest().id == policy_id,
        })
    }

    /// Live diff of draft content against the latest published version.
    pub fn preview_against_latest(&self, content: &str) -> Vec<DiffPart> {
        diff_words(&self.state.policies.latest().content, content)
    }

    /// Coverage of an existing policy.
    pub fn coverage(&self, policy_id: PolicyId) -> ServiceResult<Coverage> {
        if !self.state.policies.contains(policy_id) {
            return Err(PolicyServiceError::PolicyNotFound(policy_id));
        }
        Ok(self.state.ledger.coverage(policy_id))
    }

    /// Coverage summary for the latest policy.
    pub fn latest_summary(&self) -> CoverageSummary {
        let policy = self.state.policies.latest().clone();
        let coverage = self.state.ledger.coverage(policy.id);
        CoverageSummary {
            percentage: coverage.percentage(),
            pending: coverage.pending(),
            policy,
            coverage,
        }
    }

    /// Dashboard rows for employees matching `filter`.
    pub fn dashboard(&self, filter: &DashboardFilter) -> Vec<DashboardRow> {
        dashboard_rows(
            self.state.policies.policies(),
            self.state.ledger.employees(),
            filter,
        )
    }

    fn persist(&mut self) {
        let outcome = self
            .gateway
            .save(self.state.policies.policies(), self.state.ledger.employees());
        if let SaveOutcome::Failed(message) = &outcome {
            warn!(
                "event=state_save module=service status=error error={}",
                message
            );
        }
        self.last_save = Some(outcome);
    }
}
