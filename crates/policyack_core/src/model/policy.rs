//! Policy version domain model.
//!
//! # Responsibility
//! - Define the canonical policy version record.
//! - Validate publish input before it reaches the policy store.
//!
//! # Invariants
//! - `id` is immutable once assigned.
//! - `version` is the only ordering key between policies.
//! - `title` and `content` are never blank on a stored policy.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of one policy version.
pub type PolicyId = u32;

/// Date format used for policy versions (`YYYY-MM-DD`).
pub const VERSION_DATE_FORMAT: &str = "%Y-%m-%d";

const DEFAULT_CHANGELOG: &str = "Updated policy";

/// One published expense policy version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub id: PolicyId,
    /// Effective date of this version.
    pub version: NaiveDate,
    pub title: String,
    /// Full authoritative policy text.
    pub content: String,
    pub changelog: String,
}

impl Policy {
    /// Returns the version date rendered as `YYYY-MM-DD`.
    pub fn version_label(&self) -> String {
        self.version.format(VERSION_DATE_FORMAT).to_string()
    }
}

/// Raw publish input as typed by an admin.
///
/// All fields are free text; [`PolicyDraft::validate`] turns them into a
/// [`ValidatedDraft`] or a [`PolicyValidationError`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDraft {
    pub title: String,
    /// Expected as `YYYY-MM-DD`.
    pub version: String,
    pub content: String,
    pub changelog: String,
    /// Business justification; used as changelog when changelog is blank.
    pub reason: Option<String>,
}

/// Draft fields that passed field-level validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDraft {
    pub title: String,
    pub version: NaiveDate,
    pub content: String,
    pub changelog: String,
}

impl ValidatedDraft {
    /// Materializes the draft as a policy with the allocated id.
    pub fn into_policy(self, id: PolicyId) -> Policy {
        Policy {
            id,
            version: self.version,
            title: self.title,
            content: self.content,
            changelog: self.changelog,
        }
    }
}

/// Field and ordering errors for publish input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyValidationError {
    /// A required field is blank after trim.
    MissingField(&'static str),
    /// Version text is not a `YYYY-MM-DD` calendar date.
    InvalidVersionDate(String),
    /// Version is not strictly after the latest published version.
    VersionNotAfterLatest {
        version: NaiveDate,
        latest: NaiveDate,
    },
}

impl Display for PolicyValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::InvalidVersionDate(value) => {
                write!(f, "version `{value}` is not a valid YYYY-MM-DD date")
            }
            Self::VersionNotAfterLatest { version, latest } => write!(
                f,
                "version date {version} must be greater than last published version date {latest}"
            ),
        }
    }
}

impl Error for PolicyValidationError {}

impl PolicyDraft {
    /// Validates required fields and parses the version date.
    ///
    /// Ordering against existing versions is checked by the policy store.
    ///
    /// # Errors
    /// - `MissingField` when title, version or content is blank.
    /// - `InvalidVersionDate` when version does not parse as a date.
    pub fn validate(&self) -> Result<ValidatedDraft, PolicyValidationError> {
        let title = self.title.trim();
        let version = self.version.trim();
        let content = self.content.trim();

        if title.is_empty() {
            return Err(PolicyValidationError::MissingField("title"));
        }
        if version.is_empty() {
            return Err(PolicyValidationError::MissingField("version"));
        }
        if content.is_empty() {
            return Err(PolicyValidationError::MissingField("content"));
        }

        let version = parse_version_date(version)?;

        Ok(ValidatedDraft {
            title: title.to_string(),
            version,
            content: content.to_string(),
            changelog: self.effective_changelog(),
        })
    }

    fn effective_changelog(&self) -> String {
        let changelog = self.changelog.trim();
        if !changelog.is_empty() {
            return changelog.to_string();
        }
        match self.reason.as_deref().map(str::trim) {
            Some(reason) if !reason.is_empty() => reason.to_string(),
            _ => DEFAULT_CHANGELOG.to_string(),
        }
    }
}

/// Parses a `YYYY-MM-DD` version string.
pub fn parse_version_date(value: &str) -> Result<NaiveDate, PolicyValidationError> {
    NaiveDate::parse_from_str(value.trim(), VERSION_DATE_FORMAT)
        .map_err(|_| PolicyValidationError::InvalidVersionDate(value.to_string()))
}
