//! Built-in seed dataset.
//!
//! Used when no usable persisted state exists. Seed acknowledgements carry
//! no history, so their timestamps are synthesized at load time.

use crate::model::employee::{Employee, EmployeeId};
use crate::model::policy::{Policy, PolicyId};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// `(id, version, title, content, changelog)`
const SEED_POLICIES: &[(PolicyId, (i32, u32, u32), &str, &str, &str)] = &[
    (
        1,
        (2023, 1, 1),
        "Expense Policy v1",
        "Allowed categories: Travel, Meals. Limit: $500 per trip.",
        "Initial version.",
    ),
    (
        2,
        (2023, 6, 1),
        "Expense Policy v2",
        "Allowed categories: Travel, Meals, Office Supplies. Limit: $700 per trip.",
        "Added Office Supplies. Increased limit to $700.",
    ),
    (
        3,
        (2024, 1, 1),
        "Expense Policy v3",
        "Allowed categories: Travel, Meals, Office Supplies, Training. Limit: $1000 per trip.",
        "Added Training. Increased limit to $1000.",
    ),
];

const SEED_EMPLOYEES: &[(EmployeeId, &str, &[PolicyId])] = &[
    (1, "Alice", &[1]),
    (2, "Bob", &[1, 2]),
    (3, "Charlie", &[]),
];

/// Number of policies in the seed set.
pub fn seed_policy_count() -> usize {
    SEED_POLICIES.len()
}

/// Returns the seed policies sorted by version.
pub fn seed_policies() -> Vec<Policy> {
    SEED_POLICIES
        .iter()
        .filter_map(|(id, (year, month, day), title, content, changelog)| {
            let version = NaiveDate::from_ymd_opt(*year, *month, *day)?;
            Some(Policy {
                id: *id,
                version,
                title: (*title).to_string(),
                content: (*content).to_string(),
                changelog: (*changelog).to_string(),
            })
        })
        .collect()
}

/// Returns the seed employees with acknowledgement timestamps set to `loaded_at`.
pub fn seed_employees(loaded_at: DateTime<Utc>) -> Vec<Employee> {
    SEED_EMPLOYEES
        .iter()
        .map(|(id, name, acknowledged)| {
            Employee::from_parts(
                *id,
                *name,
                acknowledged.iter().copied(),
                BTreeMap::new(),
                loaded_at,
            )
            .0
        })
        .collect()
}
