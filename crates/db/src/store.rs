use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use caseforge_core::domain::case::Case;
use caseforge_core::domain::employee::Employee;
use caseforge_core::domain::intake::IntakeRecord;
use caseforge_core::domain::investigation::Investigation;
use caseforge_core::domain::location::Location;
use caseforge_core::domain::organization::Organization;
use caseforge_core::domain::taxonomy::Category;
use caseforge_core::domain::{EntityKind, OrganizationId};
use caseforge_core::persistence::{DatasetStore, InsertOutcome, RecordBatch, StoreError};

use crate::DbPool;

/// Table layout of one entity kind: the row identifier field (if the kind has one) and the
/// document fields projected into their own columns.
struct TableSpec {
    table: &'static str,
    id_field: Option<&'static str>,
    columns: &'static [&'static str],
}

fn table_spec(kind: EntityKind) -> TableSpec {
    let (table, id_field, columns): (_, _, &'static [&'static str]) = match kind {
        EntityKind::Category => ("category", Some("id"), &["parent_id"]),
        EntityKind::Location => ("location", Some("id"), &["region"]),
        EntityKind::Employee => {
            ("employee", Some("id"), &["manager_id", "location_id", "department"])
        }
        EntityKind::IntakeRecord => {
            ("intake_record", Some("id"), &["category_id", "location_id", "created_at"])
        }
        EntityKind::Case => (
            "case_record",
            Some("id"),
            &[
                "status",
                "category_id",
                "primary_intake_record_id",
                "subject_employee_id",
                "assignee_employee_id",
                "created_at",
                "closed_at",
            ],
        ),
        EntityKind::Association => {
            ("case_association", None, &["intake_record_id", "case_id", "role"])
        }
        EntityKind::Investigation => {
            ("investigation", Some("id"), &["case_id", "status", "outcome", "investigator_id"])
        }
        EntityKind::Campaign => ("campaign", Some("id"), &["owner_id"]),
        EntityKind::CampaignAssignment => {
            ("campaign_assignment", Some("id"), &["campaign_id", "employee_id"])
        }
        EntityKind::WorkflowInstance => ("workflow_instance", Some("id"), &["case_id", "status"]),
        EntityKind::Notification => ("notification", Some("id"), &["recipient_id", "case_id"]),
        EntityKind::SavedView => ("saved_view", Some("id"), &["owner_id"]),
        EntityKind::AiConversation => ("ai_conversation", Some("id"), &["case_id", "owner_id"]),
        EntityKind::Report => ("report", Some("id"), &["owner_id"]),
    };
    TableSpec { table, id_field, columns }
}

impl TableSpec {
    fn insert_sql(&self) -> String {
        let mut names = Vec::with_capacity(self.columns.len() + 4);
        if self.id_field.is_some() {
            names.push("id");
        }
        names.extend(["organization_id", "natural_key"]);
        names.extend(self.columns.iter().copied());
        names.push("payload_json");

        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})
             ON CONFLICT(organization_id, natural_key) DO NOTHING",
            self.table,
            names.join(", "),
        )
    }
}

/// Projects a document field into a TEXT column. Ids, labels and RFC 3339 timestamps are
/// all JSON strings; absent or null fields become NULL.
fn column_text(document: &Value, field: &str) -> Option<String> {
    match document.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

pub struct SqlDatasetStore {
    pool: DbPool,
}

impl SqlDatasetStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Registers `organization` unless its slug is taken and returns the stored row.
    pub async fn register_organization(
        &self,
        organization: &Organization,
    ) -> Result<Organization, StoreError> {
        sqlx::query(
            "INSERT INTO organization (id, slug, name, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(slug) DO NOTHING",
        )
        .bind(&organization.id.0)
        .bind(&organization.slug)
        .bind(&organization.name)
        .bind(organization.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        self.find_organization(&organization.slug).await?.ok_or_else(|| {
            StoreError::Backend(format!("organization `{}` vanished", organization.slug))
        })
    }

    async fn documents<T: DeserializeOwned>(
        &self,
        organization: &OrganizationId,
        kind: EntityKind,
        order_by: &str,
    ) -> Result<Vec<T>, StoreError> {
        let spec = table_spec(kind);
        let sql = format!(
            "SELECT payload_json FROM {} WHERE organization_id = ? ORDER BY {order_by}",
            spec.table
        );
        let rows =
            sqlx::query(&sql).bind(&organization.0).fetch_all(&self.pool).await.map_err(backend)?;
        rows.iter().map(|row| decode_document(kind, row)).collect()
    }
}

fn decode_document<T: DeserializeOwned>(
    kind: EntityKind,
    row: &SqliteRow,
) -> Result<T, StoreError> {
    let payload: String = row.try_get("payload_json").map_err(backend)?;
    serde_json::from_str(&payload).map_err(|error| StoreError::Decode(format!("{kind}: {error}")))
}

fn organization_from_row(row: &SqliteRow) -> Result<Organization, StoreError> {
    let created_at: String = row.try_get("created_at").map_err(backend)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            StoreError::Decode(format!("invalid organization.created_at `{created_at}`: {error}"))
        })?;

    Ok(Organization {
        id: OrganizationId(row.try_get("id").map_err(backend)?),
        slug: row.try_get("slug").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        created_at,
    })
}

#[async_trait]
impl DatasetStore for SqlDatasetStore {
    async fn find_organization(&self, slug: &str) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query("SELECT id, slug, name, created_at FROM organization WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(organization_from_row).transpose()
    }

    async fn insert_batch(
        &self,
        organization: &OrganizationId,
        batch: &RecordBatch,
    ) -> Result<InsertOutcome, StoreError> {
        let spec = table_spec(batch.kind());
        let sql = spec.insert_sql();
        let documents = batch.keyed_documents()?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut outcome = InsertOutcome::default();
        for (natural_key, document) in &documents {
            let mut query = sqlx::query(&sql);
            if let Some(id_field) = spec.id_field {
                query = query.bind(column_text(document, id_field));
            }
            query = query.bind(&organization.0).bind(natural_key);
            for column in spec.columns {
                query = query.bind(column_text(document, column));
            }
            let result =
                query.bind(document.to_string()).execute(&mut *tx).await.map_err(backend)?;

            if result.rows_affected() == 0 {
                outcome.skipped += 1;
            } else {
                outcome.inserted += 1;
            }
        }
        tx.commit().await.map_err(backend)?;

        debug!(
            event_name = "db.batch.committed",
            organization = %organization,
            table = spec.table,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            "batch committed"
        );
        Ok(outcome)
    }

    async fn load_categories(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Category>, StoreError> {
        self.documents(
            organization,
            EntityKind::Category,
            "json_extract(payload_json, '$.level') ASC, natural_key ASC",
        )
        .await
    }

    async fn load_locations(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Location>, StoreError> {
        self.documents(organization, EntityKind::Location, "natural_key ASC").await
    }

    async fn load_employees(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Employee>, StoreError> {
        self.documents(organization, EntityKind::Employee, "natural_key ASC").await
    }

    async fn load_intake_records(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<IntakeRecord>, StoreError> {
        self.documents(organization, EntityKind::IntakeRecord, "natural_key ASC").await
    }

    async fn load_cases(&self, organization: &OrganizationId) -> Result<Vec<Case>, StoreError> {
        self.documents(organization, EntityKind::Case, "natural_key ASC").await
    }

    async fn load_investigations(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Investigation>, StoreError> {
        self.documents(organization, EntityKind::Investigation, "natural_key ASC").await
    }

    async fn count(
        &self,
        organization: &OrganizationId,
        kind: EntityKind,
    ) -> Result<usize, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE organization_id = ?",
            table_spec(kind).table
        );
        let count: i64 = sqlx::query(&sql)
            .bind(&organization.0)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?
            .try_get("count")
            .map_err(backend)?;
        usize::try_from(count)
            .map_err(|_| StoreError::Decode(format!("negative row count {count} for {kind}")))
    }
}
