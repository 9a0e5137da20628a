use serde::{Deserialize, Serialize};

use super::{labeled_enum, CaseId, IntakeRecordId, NaturalKey};

labeled_enum! {
    pub enum AssociationRole {
        Primary => "PRIMARY",
        Related => "RELATED",
        MergedFrom => "MERGED_FROM",
    }
}

/// Link between an intake record and the case it was folded into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub intake_record_id: IntakeRecordId,
    pub case_id: CaseId,
    /// Case reference the link was generated for; used to re-point links at committed cases.
    pub case_reference: String,
    pub role: AssociationRole,
}

impl NaturalKey for Association {
    // An intake record belongs to at most one case.
    fn natural_key(&self) -> String {
        self.intake_record_id.0.clone()
    }
}
