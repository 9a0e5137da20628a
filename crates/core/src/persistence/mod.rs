//! Storage port for generated datasets.

pub mod batch;
pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::association::Association;
use crate::domain::attachments::{
    AiConversation, Campaign, CampaignAssignment, Notification, Report, SavedView,
    WorkflowInstance,
};
use crate::domain::case::Case;
use crate::domain::employee::Employee;
use crate::domain::intake::IntakeRecord;
use crate::domain::investigation::Investigation;
use crate::domain::location::Location;
use crate::domain::organization::Organization;
use crate::domain::taxonomy::Category;
use crate::domain::{EntityKind, NaturalKey, OrganizationId};

pub use batch::{BatchWriter, KindCounts};
pub use memory::InMemoryDatasetStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("stored row could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    pub inserted: usize,
    /// Rows whose natural key was already present.
    pub skipped: usize,
}

macro_rules! record_batch {
    ($($variant:ident($row:ty) => $kind:ident),+ $(,)?) => {
        /// Homogeneous rows of one entity kind.
        #[derive(Clone, Debug, PartialEq)]
        pub enum RecordBatch {
            $($variant(Vec<$row>)),+
        }

        impl RecordBatch {
            pub fn empty(kind: EntityKind) -> Self {
                match kind {
                    $(EntityKind::$kind => Self::$variant(Vec::new())),+
                }
            }

            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Self::$variant(_) => EntityKind::$kind),+
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Self::$variant(rows) => rows.len()),+
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Appends rows of the same kind; returns `other` back when the kinds differ.
            pub fn append(&mut self, other: RecordBatch) -> Result<(), RecordBatch> {
                match (self, other) {
                    $((Self::$variant(rows), Self::$variant(more)) => {
                        rows.extend(more);
                        Ok(())
                    })+
                    (_, other) => Err(other),
                }
            }

            /// Removes and returns up to `limit` rows from the front.
            pub fn take_front(&mut self, limit: usize) -> RecordBatch {
                match self {
                    $(Self::$variant(rows) => {
                        let count = limit.min(rows.len());
                        Self::$variant(rows.drain(..count).collect())
                    })+
                }
            }

            /// Natural key and JSON document for every row, in order.
            pub fn keyed_documents(&self) -> Result<Vec<(String, Value)>, StoreError> {
                match self {
                    $(Self::$variant(rows) => rows.iter().map(keyed_document).collect()),+
                }
            }
        }

        $(
            impl From<Vec<$row>> for RecordBatch {
                fn from(rows: Vec<$row>) -> Self {
                    Self::$variant(rows)
                }
            }
        )+
    };
}

record_batch! {
    Categories(Category) => Category,
    Locations(Location) => Location,
    Employees(Employee) => Employee,
    IntakeRecords(IntakeRecord) => IntakeRecord,
    Cases(Case) => Case,
    Associations(Association) => Association,
    Investigations(Investigation) => Investigation,
    Campaigns(Campaign) => Campaign,
    CampaignAssignments(CampaignAssignment) => CampaignAssignment,
    Workflows(WorkflowInstance) => WorkflowInstance,
    Notifications(Notification) => Notification,
    SavedViews(SavedView) => SavedView,
    AiConversations(AiConversation) => AiConversation,
    Reports(Report) => Report,
}

fn keyed_document<T: NaturalKey + Serialize>(row: &T) -> Result<(String, Value), StoreError> {
    let document =
        serde_json::to_value(row).map_err(|error| StoreError::Decode(error.to_string()))?;
    Ok((row.natural_key(), document))
}

/// Persistence boundary of the pipeline. Inserts are idempotent on
/// `(organization, natural key)`; reads return committed rows in natural-key order unless
/// stated otherwise.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn find_organization(&self, slug: &str) -> Result<Option<Organization>, StoreError>;

    /// Inserts the batch in one transaction, skipping rows whose natural key exists.
    async fn insert_batch(
        &self,
        organization: &OrganizationId,
        batch: &RecordBatch,
    ) -> Result<InsertOutcome, StoreError>;

    /// Roots first, then children, each ordered by code.
    async fn load_categories(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Category>, StoreError>;

    async fn load_locations(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Location>, StoreError>;

    async fn load_employees(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Employee>, StoreError>;

    async fn load_intake_records(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<IntakeRecord>, StoreError>;

    async fn load_cases(&self, organization: &OrganizationId) -> Result<Vec<Case>, StoreError>;

    async fn load_investigations(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Investigation>, StoreError>;

    async fn count(
        &self,
        organization: &OrganizationId,
        kind: EntityKind,
    ) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::RecordBatch;
    use crate::domain::association::{Association, AssociationRole};
    use crate::domain::{CaseId, EntityKind, IntakeRecordId};

    fn association(record: &str) -> Association {
        Association {
            intake_record_id: IntakeRecordId(record.to_string()),
            case_id: CaseId("case".to_string()),
            case_reference: "CASE-000001".to_string(),
            role: AssociationRole::Primary,
        }
    }

    #[test]
    fn batches_append_and_split_by_kind() {
        let mut batch = RecordBatch::from(vec![association("a"), association("b")]);
        batch.append(RecordBatch::from(vec![association("c")])).expect("same kind appends");
        assert_eq!(batch.len(), 3);

        let front = batch.take_front(2);
        assert_eq!(front.len(), 2);
        assert_eq!(batch.len(), 1);
        assert_eq!(front.kind(), EntityKind::Association);

        let mismatch = batch.append(RecordBatch::empty(EntityKind::Case));
        assert!(mismatch.is_err());
    }

    #[test]
    fn documents_are_keyed_by_natural_key() {
        let batch = RecordBatch::from(vec![association("riu-7")]);
        let documents = batch.keyed_documents().expect("serializes");
        assert_eq!(documents[0].0, "riu-7");
        assert_eq!(documents[0].1["role"], "PRIMARY");
    }
}
