use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{labeled_enum, CaseId, EmployeeId, InvestigationId, NaturalKey};
use crate::errors::DomainError;

labeled_enum! {
    pub enum InvestigationStatus {
        New => "NEW",
        Assigned => "ASSIGNED",
        Investigating => "INVESTIGATING",
        PendingReview => "PENDING_REVIEW",
        Closed => "CLOSED",
    }
}

labeled_enum! {
    pub enum InvestigationKind {
        Primary => "PRIMARY",
        RegulatoryOverlay => "REGULATORY_OVERLAY",
    }
}

labeled_enum! {
    pub enum Outcome {
        Substantiated => "SUBSTANTIATED",
        Unsubstantiated => "UNSUBSTANTIATED",
        Inconclusive => "INCONCLUSIVE",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentEvent {
    pub from_employee_id: EmployeeId,
    pub to_employee_id: EmployeeId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investigation {
    pub id: InvestigationId,
    pub reference_number: String,
    pub case_id: CaseId,
    pub number: u32,
    pub kind: InvestigationKind,
    pub status: InvestigationStatus,
    pub outcome: Option<Outcome>,
    pub investigator_id: Option<EmployeeId>,
    pub findings: Option<String>,
    pub root_cause: Option<String>,
    pub lessons_learned: Option<String>,
    pub reassignment: Option<ReassignmentEvent>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Investigation {
    /// Outcome and closure date are present exactly when the investigation is closed, and
    /// root cause/lessons only accompany substantiated outcomes.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let closed = self.status == InvestigationStatus::Closed;
        if closed != self.outcome.is_some() || closed != self.closed_at.is_some() {
            return Err(DomainError::InvariantViolation(format!(
                "investigation {} has status {} but outcome {:?}",
                self.reference_number, self.status, self.outcome
            )));
        }
        let substantiated = self.outcome == Some(Outcome::Substantiated);
        if !substantiated && (self.root_cause.is_some() || self.lessons_learned.is_some()) {
            return Err(DomainError::InvariantViolation(format!(
                "investigation {} records a root cause without a substantiated outcome",
                self.reference_number
            )));
        }
        if let Some(closed_at) = self.closed_at {
            if closed_at < self.opened_at {
                return Err(DomainError::InvariantViolation(format!(
                    "investigation {} closes before it opens",
                    self.reference_number
                )));
            }
        }
        Ok(())
    }
}

impl NaturalKey for Investigation {
    fn natural_key(&self) -> String {
        self.reference_number.clone()
    }
}
