use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_TABLES: &[&str] = &[
        "organization",
        "category",
        "location",
        "employee",
        "intake_record",
        "case_record",
        "case_association",
        "investigation",
        "campaign",
        "campaign_assignment",
        "workflow_instance",
        "notification",
        "saved_view",
        "ai_conversation",
        "report",
    ];

    const MANAGED_INDEXES: &[&str] = &[
        "idx_employee_manager_id",
        "idx_intake_record_category_id",
        "idx_case_record_status",
        "idx_case_record_subject_employee_id",
        "idx_case_association_case_id",
        "idx_investigation_case_id",
        "idx_notification_recipient_id",
    ];

    #[tokio::test]
    async fn migrations_create_one_table_per_entity_kind() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in MANAGED_TABLES {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("check table")
            .get::<i64, _>("count");
            assert_eq!(count, 1, "table {table} should exist");
        }
    }

    #[tokio::test]
    async fn natural_keys_are_unique_per_organization() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for (id, slug) in [("o1", "acme"), ("o2", "globex")] {
            sqlx::query("INSERT INTO organization (id, slug, name, created_at) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(slug)
                .bind(slug)
                .bind("2026-01-01T00:00:00+00:00")
                .execute(&pool)
                .await
                .expect("insert organization");
        }
        let insert = "INSERT INTO location (id, organization_id, natural_key, region, payload_json)
                      VALUES (?, ?, 'NYC', 'NORTH_AMERICA', '{}')";

        sqlx::query(insert).bind("l1").bind("o1").execute(&pool).await.expect("first");
        sqlx::query(insert).bind("l2").bind("o2").execute(&pool).await.expect("other tenant");
        let duplicate = sqlx::query(insert).bind("l3").bind("o1").execute(&pool).await;
        assert!(duplicate.is_err(), "same natural key in one organization must conflict");
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let initial_signature = managed_schema_signature(&pool).await;
        assert_eq!(initial_signature.len(), MANAGED_TABLES.len() + MANAGED_INDEXES.len());

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        assert!(
            managed_schema_signature(&pool).await.is_empty(),
            "managed schema objects should be removed after full undo",
        );

        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(managed_schema_signature(&pool).await, initial_signature);
    }

    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            let managed = MANAGED_TABLES.contains(&name.as_str())
                || MANAGED_INDEXES.contains(&name.as_str());
            managed.then(|| (row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
        })
        .collect();
        signature.sort();
        signature
    }
}
