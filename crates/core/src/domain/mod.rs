pub mod association;
pub mod attachments;
pub mod case;
pub mod employee;
pub mod intake;
pub mod investigation;
pub mod location;
pub mod organization;
pub mod taxonomy;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a closed set of persisted labels with `as_str`/`parse` helpers.
///
/// Labels are SCREAMING_SNAKE_CASE and must match the serde representation.
macro_rules! labeled_enum {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value.trim().to_ascii_uppercase().as_str() {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

macro_rules! entity_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub String);

            impl $name {
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )+
    };
}

pub(crate) use labeled_enum;

entity_id!(
    OrganizationId,
    CategoryId,
    LocationId,
    EmployeeId,
    IntakeRecordId,
    CaseId,
    InvestigationId,
);

labeled_enum! {
    /// Every persisted entity kind, in the order batches may be flushed.
    pub enum EntityKind {
        Category => "CATEGORY",
        Location => "LOCATION",
        Employee => "EMPLOYEE",
        IntakeRecord => "INTAKE_RECORD",
        Case => "CASE",
        Association => "ASSOCIATION",
        Investigation => "INVESTIGATION",
        Campaign => "CAMPAIGN",
        CampaignAssignment => "CAMPAIGN_ASSIGNMENT",
        WorkflowInstance => "WORKFLOW_INSTANCE",
        Notification => "NOTIFICATION",
        SavedView => "SAVED_VIEW",
        AiConversation => "AI_CONVERSATION",
        Report => "REPORT",
    }
}

impl EntityKind {
    /// Kinds whose rows must be committed before rows of `self` reference them.
    pub fn upstream(&self) -> &'static [EntityKind] {
        use EntityKind::*;
        match self {
            Category | Location => &[],
            Employee => &[Location],
            IntakeRecord => &[Category, Location],
            Case => &[IntakeRecord, Category, Employee],
            Association => &[IntakeRecord, Case],
            Investigation => &[Case, Employee],
            Campaign => &[Employee],
            CampaignAssignment => &[Campaign, Employee],
            WorkflowInstance => &[Case],
            Notification => &[Case, Employee],
            SavedView | Report => &[Employee],
            AiConversation => &[Case, Employee],
        }
    }
}

/// Anything persisted under a natural uniqueness key scoped to its organization.
pub trait NaturalKey {
    fn natural_key(&self) -> String;
}

/// Derives a stable identifier from the run seed, tenant, entity kind, and natural key.
///
/// Re-running with the same inputs yields the same identifier, so the identifier and the
/// natural key agree on what counts as a duplicate.
pub fn derive_entity_id(
    master_seed: u64,
    organization: &OrganizationId,
    kind: EntityKind,
    natural_key: &str,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(organization.0.as_bytes());
    hasher.update(&[0]);
    hasher.update(kind.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(natural_key.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    Uuid::from_bytes(bytes).to_string()
}
