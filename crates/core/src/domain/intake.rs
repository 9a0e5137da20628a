use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::taxonomy::Severity;
use super::{labeled_enum, CategoryId, IntakeRecordId, LocationId, NaturalKey};

labeled_enum! {
    pub enum Channel {
        Hotline => "HOTLINE",
        WebForm => "WEB_FORM",
        Email => "EMAIL",
        Chat => "CHAT",
        InPerson => "IN_PERSON",
        Mail => "MAIL",
    }
}

labeled_enum! {
    pub enum IntakeType {
        Allegation => "ALLEGATION",
        Concern => "CONCERN",
        PolicyQuestion => "POLICY_QUESTION",
        Complaint => "COMPLAINT",
    }
}

labeled_enum! {
    pub enum ReporterType {
        Anonymous => "ANONYMOUS",
        Confidential => "CONFIDENTIAL",
        Identified => "IDENTIFIED",
    }
}

/// Raw report as received; never mutated once committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: IntakeRecordId,
    pub reference_number: String,
    pub intake_type: IntakeType,
    pub channel: Channel,
    pub severity: Severity,
    pub reporter_type: ReporterType,
    pub reporter_name: Option<String>,
    pub category_id: CategoryId,
    pub location_id: LocationId,
    /// Shared by reports describing the same incident.
    pub incident_group: Option<String>,
    pub is_group_primary: bool,
    pub summary: String,
    pub narrative: String,
    pub created_at: DateTime<Utc>,
}

impl NaturalKey for IntakeRecord {
    fn natural_key(&self) -> String {
        self.reference_number.clone()
    }
}
