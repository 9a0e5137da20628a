use chrono::{TimeZone, Utc};
use sqlx::Row;

use caseforge_core::domain::organization::Organization;
use caseforge_core::{DatasetStore, EntityKind, GenerationConfig, PhaseStatus, SeedPipeline};
use caseforge_db::{connect_with_settings, migrations, SqlDatasetStore};

fn small_config() -> GenerationConfig {
    let mut config = GenerationConfig::default();
    config.volumes.intake_records = 400;
    config.volumes.employees = 120;
    config.batch_size = 64;
    config
}

async fn seeded_store(path: &std::path::Path) -> (SqlDatasetStore, Organization) {
    let url = format!("sqlite://{}", path.display());
    let pool = connect_with_settings(&url, 2, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let store = SqlDatasetStore::new(pool);
    let created_at = Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).single().expect("timestamp");
    let organization = Organization::register("acme", "Acme Holdings", created_at).expect("slug");
    let organization = store.register_organization(&organization).await.expect("register");
    (store, organization)
}

#[tokio::test]
async fn seeds_every_table_and_reruns_without_inserting() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, organization) = seeded_store(&dir.path().join("caseforge.db")).await;

    let first = SeedPipeline::new(&store, small_config()).run("acme").await.expect("first run");
    assert!(first.phases.iter().all(|report| report.status == PhaseStatus::Completed));
    assert_eq!(first.counts(EntityKind::Case).inserted, 360);
    for kind in EntityKind::ALL {
        let stored = store.count(&organization.id, *kind).await.expect("count");
        assert_eq!(stored, first.counts(*kind).inserted, "{kind}");
        assert!(stored > 0, "{kind} should have rows");
    }

    let second = SeedPipeline::new(&store, small_config()).run("acme").await.expect("second run");
    assert_eq!(second.total_inserted(), 0);
    for kind in EntityKind::ALL {
        let stored = store.count(&organization.id, *kind).await.expect("count");
        assert_eq!(stored, first.counts(*kind).inserted, "{kind} count changed on re-run");
    }
}

#[tokio::test]
async fn committed_rows_satisfy_foreign_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("caseforge.db");
    let (store, _) = seeded_store(&path).await;
    SeedPipeline::new(&store, small_config()).run("acme").await.expect("run");

    let pool = connect_with_settings(&format!("sqlite://{}", path.display()), 1, 30)
        .await
        .expect("reconnect");
    let violations = sqlx::query("PRAGMA foreign_key_check").fetch_all(&pool).await.expect("check");
    assert!(violations.is_empty(), "{} foreign key violations", violations.len());

    let closed = sqlx::query(
        "SELECT COUNT(*) AS count FROM case_record WHERE status = 'CLOSED' AND closed_at IS NULL",
    )
    .fetch_one(&pool)
    .await
    .expect("closed cases")
    .get::<i64, _>("count");
    assert_eq!(closed, 0);
}

#[tokio::test]
async fn unknown_organization_fails_before_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, organization) = seeded_store(&dir.path().join("caseforge.db")).await;

    let error = SeedPipeline::new(&store, small_config()).run("globex").await.expect_err("no org");
    assert_eq!(error.error_class(), "missing_prerequisite");
    let categories = store.count(&organization.id, EntityKind::Category).await.expect("count");
    assert_eq!(categories, 0);
}
