//! Entities attached after the core case graph exists. Nothing upstream reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{labeled_enum, CaseId, EmployeeId, NaturalKey};

labeled_enum! {
    pub enum CampaignKind {
        CodeOfConductAttestation => "CODE_OF_CONDUCT_ATTESTATION",
        ConflictOfInterestDisclosure => "CONFLICT_OF_INTEREST_DISCLOSURE",
        PolicyAcknowledgement => "POLICY_ACKNOWLEDGEMENT",
        TrainingCompletion => "TRAINING_COMPLETION",
    }
}

labeled_enum! {
    pub enum CampaignStatus {
        Active => "ACTIVE",
        Completed => "COMPLETED",
    }
}

labeled_enum! {
    pub enum AssignmentStatus {
        Pending => "PENDING",
        Completed => "COMPLETED",
        Overdue => "OVERDUE",
    }
}

labeled_enum! {
    pub enum WorkflowStatus {
        Active => "ACTIVE",
        Completed => "COMPLETED",
    }
}

labeled_enum! {
    pub enum NotificationKind {
        CaseAssigned => "CASE_ASSIGNED",
        CaseClosed => "CASE_CLOSED",
        InvestigationReassigned => "INVESTIGATION_REASSIGNED",
        SlaBreached => "SLA_BREACHED",
    }
}

labeled_enum! {
    pub enum ReportKind {
        Table => "TABLE",
        Trend => "TREND",
        Breakdown => "BREAKDOWN",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub code: String,
    pub name: String,
    pub kind: CampaignKind,
    pub status: CampaignStatus,
    pub owner_id: EmployeeId,
    pub launched_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

impl NaturalKey for Campaign {
    fn natural_key(&self) -> String {
        self.code.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAssignment {
    pub id: String,
    pub campaign_id: String,
    pub campaign_code: String,
    pub employee_id: EmployeeId,
    pub status: AssignmentStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NaturalKey for CampaignAssignment {
    fn natural_key(&self) -> String {
        format!("{}:{}", self.campaign_code, self.employee_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: String,
    pub reference: String,
    pub case_id: CaseId,
    pub template: String,
    pub current_step: String,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NaturalKey for WorkflowInstance {
    fn natural_key(&self) -> String {
        self.reference.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub reference: String,
    pub recipient_id: EmployeeId,
    pub case_id: Option<CaseId>,
    pub kind: NotificationKind,
    pub title: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NaturalKey for Notification {
    fn natural_key(&self) -> String {
        self.reference.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub id: String,
    pub reference: String,
    pub owner_id: EmployeeId,
    pub name: String,
    pub entity: String,
    pub filters: Value,
}

impl NaturalKey for SavedView {
    fn natural_key(&self) -> String {
        self.reference.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConversation {
    pub id: String,
    pub reference: String,
    pub case_id: CaseId,
    pub owner_id: EmployeeId,
    pub messages: Vec<AiMessage>,
    pub created_at: DateTime<Utc>,
}

impl NaturalKey for AiConversation {
    fn natural_key(&self) -> String {
        self.reference.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub code: String,
    pub name: String,
    pub kind: ReportKind,
    pub owner_id: EmployeeId,
    pub definition: Value,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl NaturalKey for Report {
    fn natural_key(&self) -> String {
        self.code.clone()
    }
}
