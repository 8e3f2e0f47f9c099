//! Ephemeral status notices and highlights.
//!
//! # Responsibility
//! - Hold the single visible notice with an optional one-shot action.
//! - Hold the ephemeral "recently published" highlight.
//!
//! # Invariants
//! - Every post bumps the generation; expiring an older generation is a
//!   no-op, so the latest timer always wins.
//! - A notice action can be taken at most once.

use crate::model::policy::PolicyId;

/// Action kinds a notice can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeActionKind {
    UndoDeletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeAction {
    pub label: String,
    pub kind: NoticeActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub generation: u64,
    pub message: String,
    pub action: Option<NoticeAction>,
}

/// Value held by an [`Ephemeral`] slot plus the generation that set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamped<T> {
    pub generation: u64,
    pub value: T,
}

/// Single-value slot whose expiry is keyed by generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ephemeral<T> {
    generation: u64,
    current: Option<Stamped<T>>,
}

impl<T> Default for Ephemeral<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            current: None,
        }
    }
}

impl<T> Ephemeral<T> {
    /// Replaces the current value and returns its generation.
    pub fn set(&mut self, value: T) -> u64 {
        self.generation += 1;
        self.current = Some(Stamped {
            generation: self.generation,
            value,
        });
        self.generation
    }

    pub fn get(&self) -> Option<&Stamped<T>> {
        self.current.as_ref()
    }

    /// Clears the value only if `generation` is still current.
    pub fn expire(&mut self, generation: u64) -> bool {
        match &self.current {
            Some(stamped) if stamped.generation == generation => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    fn take_if(&mut self, generation: u64) -> Option<T> {
        match &self.current {
            Some(stamped) if stamped.generation == generation => {
                self.current.take().map(|stamped| stamped.value)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NoticeBody {
    message: String,
    action: Option<NoticeAction>,
}

/// Notice and highlight board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeBoard {
    notice: Ephemeral<NoticeBody>,
    highlight: Ephemeral<PolicyId>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a plain notice, superseding the current one.
    pub fn post(&mut self, message: impl Into<String>) -> u64 {
        self.notice.set(NoticeBody {
            message: message.into(),
            action: None,
        })
    }

    /// Posts a notice carrying a one-shot action.
    pub fn post_with_action(
        &mut self,
        message: impl Into<String>,
        label: impl Into<String>,
        kind: NoticeActionKind,
    ) -> u64 {
        self.notice.set(NoticeBody {
            message: message.into(),
            action: Some(NoticeAction {
                label: label.into(),
                kind,
            }),
        })
    }

    pub fn current(&self) -> Option<Notice> {
        self.notice.get().map(|stamped| Notice {
            generation: stamped.generation,
            message: stamped.value.message.clone(),
            action: stamped.value.action.clone(),
        })
    }

    /// Dismisses the notice if `generation` is still the visible one.
    pub fn expire(&mut self, generation: u64) -> bool {
        self.notice.expire(generation)
    }

    /// Consumes the notice at `generation` and returns its action kind.
    pub fn take_action(&mut self, generation: u64) -> Option<NoticeActionKind> {
        self.notice
            .take_if(generation)
            .and_then(|body| body.action.map(|action| action.kind))
    }

    pub fn highlight(&mut self, policy_id: PolicyId) -> u64 {
        self.highlight.set(policy_id)
    }

    pub fn highlighted(&self) -> Option<PolicyId> {
        self.highlight.get().map(|stamped| stamped.value)
    }

    pub fn highlight_generation(&self) -> Option<u64> {
        self.highlight.get().map(|stamped| stamped.generation)
    }

    pub fn expire_highlight(&mut self, generation: u64) -> bool {
        self.highlight.expire(generation)
    }

    pub fn clear_highlight(&mut self) {
        self.highlight.clear();
    }
}
