use chrono::Utc;

use caseforge_core::config::LoadOptions;
use caseforge_core::Organization;
use caseforge_db::{connect, migrations, SqlDatasetStore};

use crate::commands::{load_config, runtime, CommandResult};

/// Registers an organization by slug. Registering an existing slug returns the stored row.
pub fn run(options: &LoadOptions, slug: &str, name: Option<&str>) -> CommandResult {
    let organization = match Organization::register(slug, name.unwrap_or(slug), Utc::now()) {
        Ok(organization) => organization,
        Err(error) => {
            return CommandResult::classified("org", "config_validation", error.to_string())
        }
    };
    let config = match load_config("org", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("org") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string()))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string()))?;
        let store = SqlDatasetStore::new(pool.clone());
        let stored = store
            .register_organization(&organization)
            .await
            .map_err(|error| ("store_read", error.to_string()));
        pool.close().await;
        stored
    });

    match result {
        Ok(stored) => {
            tracing::info!(
                event_name = "cli.org.registered",
                organization = %stored.slug,
                organization_id = %stored.id,
                "organization registered"
            );
            let message = format!("organization `{}` registered", stored.slug);
            CommandResult::success_with("org", message, stored)
        }
        Err((error_class, message)) => CommandResult::classified("org", error_class, message),
    }
}
