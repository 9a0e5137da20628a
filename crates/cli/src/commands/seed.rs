use chrono::Utc;

use caseforge_core::config::LoadOptions;
use caseforge_core::{GenerationError, InMemoryDatasetStore, Organization, RunSummary, SeedPipeline};
use caseforge_db::{connect, migrations, SqlDatasetStore};

use crate::commands::{load_config, runtime, CommandResult};

/// Runs the seed pipeline for `slug`. A dry run generates into a throwaway in-memory store
/// and never opens the database.
pub fn run(options: &LoadOptions, slug: &str, dry_run: bool) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async move {
        if dry_run {
            let organization = Organization::register(slug, slug, Utc::now())
                .map_err(|error| ("config_validation", error.to_string()))?;
            let store = InMemoryDatasetStore::with_organization(organization);
            let summary = SeedPipeline::new(&store, config.generation).run(slug).await;
            return summary.map_err(classify);
        }

        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string()))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string()))?;
        let store = SqlDatasetStore::new(pool.clone());
        let summary = SeedPipeline::new(&store, config.generation).run(slug).await;
        pool.close().await;
        summary.map_err(classify)
    });

    match result {
        Ok(summary) => CommandResult::success_with("seed", describe(&summary, dry_run), summary),
        Err((error_class, message)) => CommandResult::classified("seed", error_class, message),
    }
}

fn classify(error: GenerationError) -> (&'static str, String) {
    (error.error_class(), error.to_string())
}

fn describe(summary: &RunSummary, dry_run: bool) -> String {
    let skipped = summary.skipped_phases().map(|phase| phase.as_str()).collect::<Vec<_>>();
    let mode = if dry_run { "dry run" } else { "seed run" };
    let mut message = format!(
        "{mode} for `{}` inserted {} rows ({} cases)",
        summary.organization,
        summary.total_inserted(),
        summary.counts(caseforge_core::EntityKind::Case).inserted,
    );
    if !skipped.is_empty() {
        message.push_str(&format!("; skipped phases: {}", skipped.join(", ")));
    }
    message
}
