//! Acknowledgement coverage and dashboard projections.
//!
//! All functions here are pure reads over current state.

use crate::model::employee::{Employee, EmployeeId};
use crate::model::policy::{Policy, PolicyId};
use chrono::{DateTime, Utc};

/// Acknowledgement count of one policy against the employee set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub policy_id: PolicyId,
    pub acknowledged: usize,
    pub total: usize,
}

impl Coverage {
    pub fn of(policy_id: PolicyId, employees: &[Employee]) -> Self {
        let acknowledged = employees
            .iter()
            .filter(|employee| employee.has_acknowledged(policy_id))
            .count();
        Self {
            policy_id,
            acknowledged,
            total: employees.len(),
        }
    }

    pub fn percentage(&self) -> u32 {
        percentage(self.acknowledged, self.total)
    }

    pub fn pending(&self) -> usize {
        self.total - self.acknowledged
    }

    pub fn is_complete(&self) -> bool {
        self.acknowledged == self.total
    }
}

/// `round(ack / total * 100)` with halves rounded up; 0 when `total` is 0.
pub fn percentage(ack: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (ack as u64 * 200 + total as u64) / (2 * total as u64);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Row status filter relative to one policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Acknowledged(PolicyId),
    Pending(PolicyId),
}

/// Dashboard row filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    /// Case-insensitive substring match on employee name. Blank matches all.
    pub name_query: Option<String>,
    pub status: StatusFilter,
}

impl DashboardFilter {
    fn matches(&self, employee: &Employee) -> bool {
        let name_ok = match self.name_query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => employee
                .name
                .to_lowercase()
                .contains(&query.to_lowercase()),
            _ => true,
        };
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Acknowledged(policy_id) => employee.has_acknowledged(policy_id),
            StatusFilter::Pending(policy_id) => !employee.has_acknowledged(policy_id),
        };
        name_ok && status_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardCell {
    pub policy_id: PolicyId,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl DashboardCell {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub employee_id: EmployeeId,
    pub name: String,
    /// One cell per policy, in policy version order.
    pub cells: Vec<DashboardCell>,
}

/// Builds dashboard rows for employees matching `filter`.
pub fn dashboard_rows(
    policies: &[Policy],
    employees: &[Employee],
    filter: &DashboardFilter,
) -> Vec<DashboardRow> {
    employees
        .iter()
        .filter(|employee| filter.matches(employee))
        .map(|employee| DashboardRow {
            employee_id: employee.id,
            name: employee.name.clone(),
            cells: policies
                .iter()
                .map(|policy| DashboardCell {
                    policy_id: policy.id,
                    acknowledged_at: employee.acknowledged_at(policy.id),
                })
                .collect(),
        })
        .collect()
}
