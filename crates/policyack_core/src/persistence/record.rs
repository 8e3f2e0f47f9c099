//! Persisted record shapes and their conversion to domain values.
//!
//! # Invariants
//! - Policy versions are stored as `YYYY-MM-DD`.
//! - Acknowledgement instants are stored as RFC 3339 UTC strings keyed by
//!   the policy id rendered as text.
//! - Decoding a collection either yields a fully valid collection or an
//!   [`IncompatibleData`] reason; per-entry timestamp damage is repaired.

use crate::model::employee::{Employee, EmployeeId};
use crate::model::policy::{parse_version_date, Policy, PolicyId};
use crate::model::seed::seed_policy_count;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub version: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub changelog: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default)]
    pub acknowledged: Vec<PolicyId>,
    #[serde(default)]
    pub ack_timestamps: BTreeMap<String, String>,
}

/// Reason a decoded collection cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompatibleData(pub String);

impl From<&Policy> for PolicyRecord {
    fn from(policy: &Policy) -> Self {
        Self {
            id: policy.id,
            version: policy.version_label(),
            title: policy.title.clone(),
            content: policy.content.clone(),
            changelog: policy.changelog.clone(),
        }
    }
}

impl From<&Employee> for EmployeeRecord {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name.clone(),
            acknowledged: employee.acknowledged().collect(),
            ack_timestamps: employee
                .ack_timestamps()
                .iter()
                .map(|(policy_id, at)| {
                    (
                        policy_id.to_string(),
                        at.to_rfc3339_opts(SecondsFormat::Millis, true),
                    )
                })
                .collect(),
        }
    }
}

/// Converts persisted policies, rejecting the whole collection on any defect.
pub fn decode_policies(records: Vec<PolicyRecord>) -> Result<Vec<Policy>, IncompatibleData> {
    if records.len() < seed_policy_count() {
        return Err(IncompatibleData(format!(
            "expected at least {} policies, found {}",
            seed_policy_count(),
            records.len()
        )));
    }

    let mut seen = BTreeSet::new();
    let mut policies = Vec::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(IncompatibleData(format!("duplicate policy id {}", record.id)));
        }
        if record.title.trim().is_empty() || record.content.trim().is_empty() {
            return Err(IncompatibleData(format!(
                "policy {} has blank title or content",
                record.id
            )));
        }
        let version = parse_version_date(&record.version).map_err(|_| {
            IncompatibleData(format!("policy {} has an invalid version date", record.id))
        })?;
        policies.push(Policy {
            id: record.id,
            version,
            title: record.title,
            content: record.content,
            changelog: record.changelog,
        });
    }
    Ok(policies)
}

/// Converts persisted employees.
///
/// Unparsable timestamp entries are dropped and then backfilled like any
/// other missing timestamp. Returns the employees and the repaired count.
pub fn decode_employees(
    records: Vec<EmployeeRecord>,
    loaded_at: DateTime<Utc>,
) -> Result<(Vec<Employee>, usize), IncompatibleData> {
    if records.is_empty() {
        return Err(IncompatibleData("employee list is empty".to_string()));
    }

    let mut seen = BTreeSet::new();
    let mut repaired_total = 0;
    let mut employees = Vec::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(IncompatibleData(format!(
                "duplicate employee id {}",
                record.id
            )));
        }

        let raw_count = record.ack_timestamps.len();
        let timestamps: BTreeMap<PolicyId, DateTime<Utc>> = record
            .ack_timestamps
            .iter()
            .filter_map(|(key, value)| {
                let policy_id = key.trim().parse::<PolicyId>().ok()?;
                let at = DateTime::parse_from_rfc3339(value.trim()).ok()?;
                Some((policy_id, at.with_timezone(&Utc)))
            })
            .collect();
        let unparsable = raw_count - timestamps.len();

        let (employee, repaired) = Employee::from_parts(
            record.id,
            record.name,
            record.acknowledged,
            timestamps,
            loaded_at,
        );
        repaired_total += repaired + unparsable;
        employees.push(employee);
    }
    Ok((employees, repaired_total))
}
