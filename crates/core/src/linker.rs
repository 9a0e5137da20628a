//! Intake-to-case association bookkeeping.

use std::collections::HashMap;

use crate::domain::association::{Association, AssociationRole};
use crate::domain::{CaseId, IntakeRecordId};
use crate::errors::DomainError;

#[derive(Clone, Debug)]
struct OpenCase {
    case_id: CaseId,
    case_reference: String,
}

/// Issues associations for cases as they are finalized. Each case gets exactly one primary
/// link, no intake record is linked twice, and secondary links stop at the consolidation
/// budget.
#[derive(Clone, Debug)]
pub struct ReferentialLinker {
    budget: usize,
    secondary_used: usize,
    linked: HashMap<IntakeRecordId, String>,
    current: Option<OpenCase>,
    associations: Vec<Association>,
}

impl ReferentialLinker {
    pub fn new(consolidation_budget: usize) -> Self {
        Self {
            budget: consolidation_budget,
            secondary_used: 0,
            linked: HashMap::new(),
            current: None,
            associations: Vec::new(),
        }
    }

    pub fn remaining_budget(&self) -> usize {
        self.budget - self.secondary_used
    }

    pub fn is_linked(&self, intake_record: &IntakeRecordId) -> bool {
        self.linked.contains_key(intake_record)
    }

    /// Opens a case with its primary record. Any previously open case is closed.
    pub fn link_primary(
        &mut self,
        case_id: &CaseId,
        case_reference: &str,
        intake_record: &IntakeRecordId,
    ) -> Result<(), DomainError> {
        self.claim(intake_record, case_reference)?;
        self.current =
            Some(OpenCase { case_id: case_id.clone(), case_reference: case_reference.to_string() });
        self.push(intake_record, AssociationRole::Primary);
        Ok(())
    }

    /// Folds another record into the open case as `RELATED` or `MERGED_FROM`.
    pub fn link_secondary(
        &mut self,
        intake_record: &IntakeRecordId,
        role: AssociationRole,
    ) -> Result<(), DomainError> {
        if role == AssociationRole::Primary {
            return Err(DomainError::InvariantViolation(
                "a case may have only one primary intake record".to_string(),
            ));
        }
        let case_reference = self
            .current
            .as_ref()
            .map(|open| open.case_reference.clone())
            .ok_or_else(|| {
                DomainError::InvariantViolation(
                    "secondary link requested before any primary link".to_string(),
                )
            })?;
        if self.secondary_used >= self.budget {
            return Err(DomainError::ConsolidationBudgetExhausted { budget: self.budget });
        }
        self.claim(intake_record, &case_reference)?;
        self.secondary_used += 1;
        self.push(intake_record, role);
        Ok(())
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn into_associations(self) -> Vec<Association> {
        self.associations
    }

    fn claim(
        &mut self,
        intake_record: &IntakeRecordId,
        case_reference: &str,
    ) -> Result<(), DomainError> {
        if let Some(existing) = self.linked.get(intake_record) {
            return Err(DomainError::IntakeAlreadyLinked {
                intake_record: intake_record.0.clone(),
                case_reference: existing.clone(),
            });
        }
        self.linked.insert(intake_record.clone(), case_reference.to_string());
        Ok(())
    }

    fn push(&mut self, intake_record: &IntakeRecordId, role: AssociationRole) {
        if let Some(open) = &self.current {
            self.associations.push(Association {
                intake_record_id: intake_record.clone(),
                case_id: open.case_id.clone(),
                case_reference: open.case_reference.clone(),
                role,
            });
        }
    }
}
