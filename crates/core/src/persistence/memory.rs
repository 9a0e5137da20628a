use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{DatasetStore, InsertOutcome, RecordBatch, StoreError};
use crate::domain::case::Case;
use crate::domain::employee::Employee;
use crate::domain::intake::IntakeRecord;
use crate::domain::investigation::Investigation;
use crate::domain::location::Location;
use crate::domain::organization::Organization;
use crate::domain::taxonomy::Category;
use crate::domain::{EntityKind, OrganizationId};

type Tables = HashMap<(OrganizationId, EntityKind), BTreeMap<String, Value>>;

/// Process-local store used for dry runs and tests. Rows are kept as JSON documents keyed
/// by natural key, so reads come back in natural-key order.
#[derive(Debug, Default)]
pub struct InMemoryDatasetStore {
    organizations: RwLock<Vec<Organization>>,
    tables: RwLock<Tables>,
    failures: AtomicUsize,
}

impl InMemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(organization: Organization) -> Self {
        let store = Self::default();
        store.add_organization(organization);
        store
    }

    pub fn add_organization(&self, organization: Organization) {
        if let Ok(mut organizations) = self.organizations.write() {
            if !organizations.iter().any(|existing| existing.slug == organization.slug) {
                organizations.push(organization);
            }
        }
    }

    /// Makes the next `count` inserts fail with a backend error.
    pub fn fail_next_inserts(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }

    fn rows<T: DeserializeOwned>(
        &self,
        organization: &OrganizationId,
        kind: EntityKind,
    ) -> Result<Vec<T>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        tables
            .get(&(organization.clone(), kind))
            .map(|rows| {
                rows.values()
                    .map(|document| {
                        serde_json::from_value(document.clone())
                            .map_err(|error| StoreError::Decode(format!("{kind}: {error}")))
                    })
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl DatasetStore for InMemoryDatasetStore {
    async fn find_organization(&self, slug: &str) -> Result<Option<Organization>, StoreError> {
        let organizations = self.organizations.read().map_err(|_| poisoned())?;
        Ok(organizations.iter().find(|organization| organization.slug == slug).cloned())
    }

    async fn insert_batch(
        &self,
        organization: &OrganizationId,
        batch: &RecordBatch,
    ) -> Result<InsertOutcome, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Backend("injected insert failure".to_string()));
        }
        let documents = batch.keyed_documents()?;
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.entry((organization.clone(), batch.kind())).or_default();

        let mut outcome = InsertOutcome::default();
        for (key, document) in documents {
            if table.contains_key(&key) {
                outcome.skipped += 1;
            } else {
                table.insert(key, document);
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn load_categories(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.rows(organization, EntityKind::Category)?;
        categories.sort_by(|left, right| (left.level, &left.code).cmp(&(right.level, &right.code)));
        Ok(categories)
    }

    async fn load_locations(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Location>, StoreError> {
        self.rows(organization, EntityKind::Location)
    }

    async fn load_employees(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Employee>, StoreError> {
        self.rows(organization, EntityKind::Employee)
    }

    async fn load_intake_records(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<IntakeRecord>, StoreError> {
        self.rows(organization, EntityKind::IntakeRecord)
    }

    async fn load_cases(&self, organization: &OrganizationId) -> Result<Vec<Case>, StoreError> {
        self.rows(organization, EntityKind::Case)
    }

    async fn load_investigations(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Investigation>, StoreError> {
        self.rows(organization, EntityKind::Investigation)
    }

    async fn count(
        &self,
        organization: &OrganizationId,
        kind: EntityKind,
    ) -> Result<usize, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(&(organization.clone(), kind)).map_or(0, BTreeMap::len))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::InMemoryDatasetStore;
    use crate::domain::location::{Location, Region};
    use crate::domain::organization::Organization;
    use crate::domain::{EntityKind, LocationId, OrganizationId};
    use crate::persistence::{DatasetStore, RecordBatch, StoreError};

    fn organization(id: &str, slug: &str) -> Organization {
        Organization {
            id: OrganizationId(id.to_string()),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            created_at: Utc::now(),
        }
    }

    fn location(code: &str) -> Location {
        Location {
            id: LocationId(format!("loc-{code}")),
            code: code.to_string(),
            name: format!("{code} office"),
            city: code.to_string(),
            country: "US".to_string(),
            region: Region::NorthAmerica,
            utc_offset_minutes: -300,
        }
    }

    #[tokio::test]
    async fn rows_are_scoped_by_organization_and_sorted_by_key() {
        let store = InMemoryDatasetStore::with_organization(organization("o1", "acme"));
        store.add_organization(organization("o2", "globex"));
        let acme = OrganizationId("o1".to_string());
        let globex = OrganizationId("o2".to_string());

        let batch = RecordBatch::from(vec![location("NYC"), location("CHI")]);
        store.insert_batch(&acme, &batch).await.expect("insert");

        let loaded = store.load_locations(&acme).await.expect("load");
        let codes = loaded.iter().map(|item| item.code.as_str()).collect::<Vec<_>>();
        assert_eq!(codes, ["CHI", "NYC"]);
        assert_eq!(store.count(&globex, EntityKind::Location).await.expect("count"), 0);
        assert!(store.find_organization("globex").await.expect("lookup").is_some());
        assert!(store.find_organization("initech").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let store = InMemoryDatasetStore::new();
        let org = OrganizationId("o1".to_string());
        let batch = RecordBatch::from(vec![location("NYC")]);
        store.fail_next_inserts(1);

        let error = store.insert_batch(&org, &batch).await.expect_err("injected failure");
        assert!(matches!(error, StoreError::Backend(_)));
        let outcome = store.insert_batch(&org, &batch).await.expect("recovers");
        assert_eq!(outcome.inserted, 1);
    }
}
