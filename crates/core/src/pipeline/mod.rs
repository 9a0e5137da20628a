//! Ordered seed pipeline: generate a phase, write it through the batch writer, read the
//! committed rows back and hand them to the phases that depend on them.

pub mod context;
pub mod phases;
pub mod report;

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::domain::case::Case;
use crate::domain::employee::OrgChart;
use crate::domain::investigation::Investigation;
use crate::domain::location::Location;
use crate::domain::taxonomy::Taxonomy;
use crate::domain::OrganizationId;
use crate::errors::GenerationError;
use crate::generators::{
    generate_ai_conversations, generate_campaigns, generate_cases, generate_categories,
    generate_employees, generate_intake_records, generate_investigations, generate_locations,
    generate_notifications, generate_reports, generate_saved_views, generate_workflows,
};
use crate::patterns::{PatternInjector, FLAGSHIP_CASES};
use crate::persistence::{BatchWriter, DatasetStore, RecordBatch};
use crate::sampling::PhaseRng;

pub use context::GenerationContext;
pub use phases::Phase;
pub use report::{PhaseReport, PhaseStatus, RunSummary};

/// Committed upstream rows the terminal attachers draw foreign keys from.
struct Committed {
    taxonomy: Taxonomy,
    chart: OrgChart,
    cases: Vec<Case>,
    investigations: Vec<Investigation>,
}

pub struct SeedPipeline<'a> {
    store: &'a dyn DatasetStore,
    config: GenerationConfig,
}

impl<'a> SeedPipeline<'a> {
    pub fn new(store: &'a dyn DatasetStore, config: GenerationConfig) -> Self {
        Self { store, config }
    }

    /// Runs every phase for the organization registered under `slug`. Core phase failures
    /// abort the run; terminal attacher failures are recorded and skipped.
    pub async fn run(&self, slug: &str) -> Result<RunSummary, GenerationError> {
        Phase::validate_order(Phase::ORDER)?;
        let organization = self.store.find_organization(slug).await?.ok_or_else(|| {
            GenerationError::missing(
                "organization",
                format!("organization `{slug}` is not registered"),
            )
        })?;

        let mut context = GenerationContext::new(organization, self.config.clone())?;
        let org_id = context.organization.id.clone();
        let mut writer = BatchWriter::new(self.store, org_id.clone(), context.config.batch_size);
        let mut summary = RunSummary::new(
            context.organization.slug.clone(),
            context.config.master_seed,
            context.config.current_date,
            context.config.case_target(),
        );
        info!(
            event_name = "dataset.run.started",
            organization = %context.organization.slug,
            master_seed = context.config.master_seed,
            current_date = %context.config.current_date,
            case_target = summary.case_target,
            "seed run started"
        );

        let committed = self.run_core(&mut context, &mut writer, &mut summary, &org_id).await?;

        for phase in Phase::ORDER.iter().copied().filter(Phase::is_terminal) {
            let mut rng = context.begin_phase(phase);
            let result = match attach(phase, &context, &mut rng, &committed) {
                Ok(batches) => stage_and_flush(&mut writer, batches).await,
                Err(error) => Err(error),
            };
            match result {
                Ok(()) => {
                    self.complete(&mut summary, &writer, phase);
                }
                Err(error) => {
                    let dropped =
                        phase.produces().iter().map(|kind| writer.discard(*kind)).sum::<usize>();
                    warn!(
                        event_name = "dataset.phase.skipped",
                        organization = %context.organization.slug,
                        phase = %phase,
                        error_class = error.error_class(),
                        error = %error,
                        dropped,
                        "terminal phase failed and was skipped"
                    );
                    summary.record_skipped(phase, error.to_string());
                }
            }
        }

        summary.entities = writer.counts().clone();
        summary.patterns = context.patterns.stats();
        info!(
            event_name = "dataset.run.completed",
            organization = %context.organization.slug,
            inserted = summary.total_inserted(),
            skipped_phases = summary.skipped_phases().count(),
            "seed run completed"
        );
        Ok(summary)
    }

    async fn run_core(
        &self,
        context: &mut GenerationContext,
        writer: &mut BatchWriter<'_>,
        summary: &mut RunSummary,
        org_id: &OrganizationId,
    ) -> Result<Committed, GenerationError> {
        let minimums = context.config.minimums.clone();

        context.begin_phase(Phase::Taxonomy);
        stage_and_flush(writer, vec![generate_categories(context).into()]).await?;
        let categories = self.store.load_categories(org_id).await?;
        require(Phase::Taxonomy, "categories", categories.len(), minimums.categories)?;
        let taxonomy = Taxonomy::new(categories)?;
        self.complete(summary, writer, Phase::Taxonomy);

        context.begin_phase(Phase::Locations);
        stage_and_flush(writer, vec![generate_locations(context).into()]).await?;
        let locations = self.store.load_locations(org_id).await?;
        require(Phase::Locations, "locations", locations.len(), minimums.locations)?;
        self.complete(summary, writer, Phase::Locations);

        let mut rng = context.begin_phase(Phase::Organization);
        let employees = generate_employees(context, &mut rng, &locations)?;
        stage_and_flush(writer, vec![employees.into()]).await?;
        let employees = self.store.load_employees(org_id).await?;
        require(Phase::Organization, "employees", employees.len(), minimums.employees)?;
        let chart = OrgChart::new(employees)?;
        self.complete(summary, writer, Phase::Organization);

        let mut rng = context.begin_phase(Phase::Patterns);
        context.patterns = PatternInjector::build(
            &mut rng,
            &chart,
            &taxonomy,
            &context.config.patterns,
            context.config.rates.repeat_subject,
            &context.config.reference.investigator_department,
            FLAGSHIP_CASES,
        );
        self.complete(summary, writer, Phase::Patterns);

        let cases = self
            .run_intake_and_cases(context, writer, summary, org_id, &taxonomy, &chart, &locations)
            .await?;
        require(Phase::Cases, "cases", cases.len(), minimums.cases.max(1))?;

        let mut rng = context.begin_phase(Phase::Investigations);
        let investigations =
            generate_investigations(context, &mut rng, &taxonomy, &chart, &cases)?;
        stage_and_flush(writer, vec![investigations.into()]).await?;
        let investigations = self.store.load_investigations(org_id).await?;
        self.complete(summary, writer, Phase::Investigations);

        Ok(Committed { taxonomy, chart, cases, investigations })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_intake_and_cases(
        &self,
        context: &mut GenerationContext,
        writer: &mut BatchWriter<'_>,
        summary: &mut RunSummary,
        org_id: &OrganizationId,
        taxonomy: &Taxonomy,
        chart: &OrgChart,
        locations: &[Location],
    ) -> Result<Vec<Case>, GenerationError> {
        let mut rng = context.begin_phase(Phase::IntakeRecords);
        let records = generate_intake_records(context, &mut rng, taxonomy, locations)?;
        stage_and_flush(writer, vec![records.into()]).await?;
        let intake = self.store.load_intake_records(org_id).await?;
        require(Phase::IntakeRecords, "intake records", intake.len(), 1)?;
        self.complete(summary, writer, Phase::IntakeRecords);

        let mut rng = context.begin_phase(Phase::Cases);
        let mut patterns = std::mem::take(&mut context.patterns);
        let generated =
            generate_cases(context, &mut patterns, &mut rng, taxonomy, chart, locations, &intake);
        context.patterns = patterns;
        let generated = generated?;
        info!(
            event_name = "dataset.cases.consolidated",
            organization = %context.organization.slug,
            cases = generated.cases.len(),
            folded = generated.folded,
            dropped = generated.dropped,
            "intake records consolidated into cases"
        );

        stage_and_flush(writer, vec![generated.cases.into()]).await?;
        let cases = self.store.load_cases(org_id).await?;

        // Associations point at the committed case rows, which may predate this run.
        let committed_ids = cases
            .iter()
            .map(|case| (case.reference_number.as_str(), &case.id))
            .collect::<HashMap<_, _>>();
        let mut associations = generated.associations;
        for association in &mut associations {
            let case_id = committed_ids.get(association.case_reference.as_str()).ok_or_else(|| {
                GenerationError::missing(
                    "cases",
                    format!("case {} was not committed", association.case_reference),
                )
            })?;
            association.case_id = (*case_id).clone();
        }
        stage_and_flush(writer, vec![associations.into()]).await?;
        self.complete(summary, writer, Phase::Cases);
        Ok(cases)
    }

    fn complete(&self, summary: &mut RunSummary, writer: &BatchWriter<'_>, phase: Phase) {
        let counts = writer.counts();
        for kind in phase.produces() {
            let kind_counts = counts.get(kind).copied().unwrap_or_default();
            info!(
                event_name = "dataset.phase.completed",
                phase = %phase,
                kind = %kind,
                generated = kind_counts.generated,
                inserted = kind_counts.inserted,
                skipped = kind_counts.skipped,
                "generation phase completed"
            );
        }
        summary.record_completed(phase);
    }
}

fn attach(
    phase: Phase,
    context: &GenerationContext,
    rng: &mut PhaseRng,
    committed: &Committed,
) -> Result<Vec<RecordBatch>, GenerationError> {
    let batches = match phase {
        Phase::Campaigns => {
            let (campaigns, assignments) = generate_campaigns(context, rng, &committed.chart)?;
            vec![campaigns.into(), assignments.into()]
        }
        Phase::Workflows => vec![generate_workflows(context, rng, &committed.cases).into()],
        Phase::Notifications => {
            vec![generate_notifications(context, rng, &committed.cases, &committed.investigations)
                .into()]
        }
        Phase::SavedViews => vec![generate_saved_views(context, rng, &committed.chart)?.into()],
        Phase::AiConversations => vec![generate_ai_conversations(
            context,
            rng,
            &committed.taxonomy,
            &committed.chart,
            &committed.cases,
        )?
        .into()],
        Phase::Reports => vec![generate_reports(context, rng, &committed.chart)?.into()],
        core => {
            return Err(GenerationError::Configuration(format!(
                "phase {core} is not a downstream attacher"
            )))
        }
    };
    Ok(batches)
}

async fn stage_and_flush(
    writer: &mut BatchWriter<'_>,
    batches: Vec<RecordBatch>,
) -> Result<(), GenerationError> {
    for batch in batches {
        writer.stage(batch).await?;
    }
    writer.flush().await
}

fn require(
    phase: Phase,
    what: &str,
    found: usize,
    minimum: usize,
) -> Result<(), GenerationError> {
    if found < minimum {
        return Err(GenerationError::missing(
            phase.as_str(),
            format!("{found} committed {what}, at least {minimum} required"),
        ));
    }
    Ok(())
}

/// In-memory fixtures that run the generators without a store.
#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};

    use super::{GenerationContext, Phase};
    use crate::config::GenerationConfig;
    use crate::domain::employee::OrgChart;
    use crate::domain::intake::IntakeRecord;
    use crate::domain::investigation::Investigation;
    use crate::domain::location::Location;
    use crate::domain::organization::Organization;
    use crate::domain::taxonomy::Taxonomy;
    use crate::domain::OrganizationId;
    use crate::generators::{
        generate_cases, generate_categories, generate_employees, generate_intake_records,
        generate_investigations, generate_locations, GeneratedCases,
    };
    use crate::patterns::{PatternInjector, FLAGSHIP_CASES};

    pub(crate) fn organization() -> Organization {
        Organization {
            id: OrganizationId("org-test".to_string()),
            slug: "acme".to_string(),
            name: "Acme Holdings".to_string(),
            created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    pub(crate) fn context(config: GenerationConfig) -> GenerationContext {
        GenerationContext::new(organization(), config).expect("valid test configuration")
    }

    pub(crate) struct Fixture {
        pub context: GenerationContext,
        pub taxonomy: Taxonomy,
        pub locations: Vec<Location>,
        pub chart: OrgChart,
        pub intake: Vec<IntakeRecord>,
        pub cases: Option<GeneratedCases>,
        pub investigations: Vec<Investigation>,
    }

    impl Fixture {
        pub(crate) fn through_intake(config: GenerationConfig) -> Self {
            let mut context = context(config);
            let taxonomy = Taxonomy::new(generate_categories(&context)).expect("taxonomy");
            let locations = generate_locations(&context);

            let mut rng = context.begin_phase(Phase::Organization);
            let employees =
                generate_employees(&context, &mut rng, &locations).expect("employees");
            let chart = OrgChart::new(employees).expect("org chart");

            let mut rng = context.begin_phase(Phase::Patterns);
            context.patterns = PatternInjector::build(
                &mut rng,
                &chart,
                &taxonomy,
                &context.config.patterns,
                context.config.rates.repeat_subject,
                &context.config.reference.investigator_department,
                FLAGSHIP_CASES,
            );

            let mut rng = context.begin_phase(Phase::IntakeRecords);
            let intake = generate_intake_records(&context, &mut rng, &taxonomy, &locations)
                .expect("intake records");

            Self {
                context,
                taxonomy,
                locations,
                chart,
                intake,
                cases: None,
                investigations: Vec::new(),
            }
        }

        pub(crate) fn through_cases(config: GenerationConfig) -> Self {
            let mut fixture = Self::through_intake(config);
            let mut rng = fixture.context.begin_phase(Phase::Cases);
            let mut patterns = std::mem::take(&mut fixture.context.patterns);
            let generated = generate_cases(
                &fixture.context,
                &mut patterns,
                &mut rng,
                &fixture.taxonomy,
                &fixture.chart,
                &fixture.locations,
                &fixture.intake,
            )
            .expect("cases");
            fixture.context.patterns = patterns;
            fixture.cases = Some(generated);
            fixture
        }

        pub(crate) fn through_investigations(config: GenerationConfig) -> Self {
            let mut fixture = Self::through_cases(config);
            let mut rng = fixture.context.begin_phase(Phase::Investigations);
            let cases = fixture.cases.as_ref().map(|generated| generated.cases.as_slice());
            fixture.investigations = generate_investigations(
                &fixture.context,
                &mut rng,
                &fixture.taxonomy,
                &fixture.chart,
                cases.unwrap_or_default(),
            )
            .expect("investigations");
            fixture
        }
    }
}
