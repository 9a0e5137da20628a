use chrono::{DateTime, Utc};
use tracing::info;

use super::phases::Phase;
use crate::config::{CompiledDistributions, GenerationConfig};
use crate::domain::organization::Organization;
use crate::domain::{derive_entity_id, EntityKind};
use crate::errors::GenerationError;
use crate::generators::narrative::NarrativeLibrary;
use crate::patterns::PatternInjector;
use crate::sampling::{PhaseRng, SeedContext};
use crate::temporal::TemporalEngine;

/// State shared by every phase of one run. Pools are only mutated through the injector's
/// consume operations.
#[derive(Debug)]
pub struct GenerationContext {
    pub organization: Organization,
    pub config: GenerationConfig,
    pub seeds: SeedContext,
    pub temporal: TemporalEngine,
    pub distributions: CompiledDistributions,
    pub narratives: NarrativeLibrary,
    pub patterns: PatternInjector,
}

impl GenerationContext {
    pub fn new(
        organization: Organization,
        config: GenerationConfig,
    ) -> Result<Self, GenerationError> {
        let distributions = config.distributions.compile()?;
        config.validate()?;

        Ok(Self {
            seeds: SeedContext::new(config.master_seed, &config.seed_offsets),
            temporal: TemporalEngine::new(config.current_date, &config.temporal),
            narratives: NarrativeLibrary::builtin()?,
            patterns: PatternInjector::default(),
            distributions,
            organization,
            config,
        })
    }

    /// Fresh stream for `phase`, independent of everything drawn before it.
    pub fn begin_phase(&self, phase: Phase) -> PhaseRng {
        let domain = phase.seed_domain();
        info!(
            event_name = "dataset.phase.started",
            organization = %self.organization.slug,
            phase = %phase,
            seed = self.seeds.phase_seed(domain),
            "generation phase started"
        );
        self.seeds.reseed(domain)
    }

    pub fn entity_id(&self, kind: EntityKind, natural_key: &str) -> String {
        derive_entity_id(self.seeds.master_seed(), &self.organization.id, kind, natural_key)
    }

    pub fn reference_now(&self) -> DateTime<Utc> {
        self.temporal.reference_now()
    }
}
