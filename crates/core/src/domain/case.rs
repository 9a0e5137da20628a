use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::intake::Channel;
use super::taxonomy::Severity;
use super::{labeled_enum, CaseId, CategoryId, EmployeeId, IntakeRecordId, NaturalKey};
use crate::errors::DomainError;

labeled_enum! {
    pub enum CaseStatus {
        New => "NEW",
        Open => "OPEN",
        Closed => "CLOSED",
    }
}

labeled_enum! {
    pub enum Priority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Urgent => "URGENT",
    }
}

labeled_enum! {
    pub enum Complexity {
        Simple => "SIMPLE",
        Medium => "MEDIUM",
        Complex => "COMPLEX",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub reference_number: String,
    pub title: String,
    pub status: CaseStatus,
    pub priority: Priority,
    pub complexity: Complexity,
    pub severity: Severity,
    pub channel: Channel,
    pub category_id: CategoryId,
    pub primary_intake_record_id: IntakeRecordId,
    /// Primary record first, then folded records in link order.
    pub linked_intake_record_ids: Vec<IntakeRecordId>,
    pub subject_employee_id: Option<EmployeeId>,
    pub assignee_employee_id: Option<EmployeeId>,
    pub repeat_subject: bool,
    pub hotspot_manager_id: Option<EmployeeId>,
    pub flagship_key: Option<String>,
    pub summary: String,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Case {
    pub fn is_closed(&self) -> bool {
        self.status == CaseStatus::Closed
    }

    /// Checks link cardinality and `created_at <= updated_at <= reference_now`.
    pub fn check_invariants(&self, reference_now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.linked_intake_record_ids.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "case {} has no linked intake records",
                self.reference_number
            )));
        }
        if self.linked_intake_record_ids.first() != Some(&self.primary_intake_record_id) {
            return Err(DomainError::InvariantViolation(format!(
                "case {} does not list its primary intake record first",
                self.reference_number
            )));
        }
        if self.updated_at < self.created_at || self.updated_at > reference_now {
            return Err(DomainError::InvariantViolation(format!(
                "case {} timeline {} -> {} is outside bounds",
                self.reference_number, self.created_at, self.updated_at
            )));
        }
        match (self.status, self.closed_at) {
            (CaseStatus::Closed, Some(closed_at)) if closed_at == self.updated_at => Ok(()),
            (CaseStatus::Closed, _) => Err(DomainError::InvariantViolation(format!(
                "closed case {} must carry closed_at equal to updated_at",
                self.reference_number
            ))),
            (_, Some(_)) => Err(DomainError::InvariantViolation(format!(
                "case {} is not closed but has closed_at",
                self.reference_number
            ))),
            (_, None) => Ok(()),
        }
    }
}

impl NaturalKey for Case {
    fn natural_key(&self) -> String {
        self.reference_number.clone()
    }
}
