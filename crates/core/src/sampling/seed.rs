use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::Distribution;

/// Independent random stream owners. Each phase re-seeds from its own domain so a change in
/// one phase's draw count never shifts another phase's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedDomain {
    Taxonomy,
    Locations,
    Organization,
    Patterns,
    Intake,
    Cases,
    Investigations,
    Campaigns,
    Workflows,
    Notifications,
    SavedViews,
    AiConversations,
    Reports,
}

impl SeedDomain {
    pub const ALL: &'static [SeedDomain] = &[
        SeedDomain::Taxonomy,
        SeedDomain::Locations,
        SeedDomain::Organization,
        SeedDomain::Patterns,
        SeedDomain::Intake,
        SeedDomain::Cases,
        SeedDomain::Investigations,
        SeedDomain::Campaigns,
        SeedDomain::Workflows,
        SeedDomain::Notifications,
        SeedDomain::SavedViews,
        SeedDomain::AiConversations,
        SeedDomain::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taxonomy => "taxonomy",
            Self::Locations => "locations",
            Self::Organization => "organization",
            Self::Patterns => "patterns",
            Self::Intake => "intake",
            Self::Cases => "cases",
            Self::Investigations => "investigations",
            Self::Campaigns => "campaigns",
            Self::Workflows => "workflows",
            Self::Notifications => "notifications",
            Self::SavedViews => "saved_views",
            Self::AiConversations => "ai_conversations",
            Self::Reports => "reports",
        }
    }

    /// Offset added to the master seed when no override is configured.
    pub fn default_offset(&self) -> u64 {
        let slot = Self::ALL.iter().position(|domain| domain == self).unwrap_or_default() as u64;
        (slot + 1) * 1_000
    }
}

impl std::fmt::Display for SeedDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Master seed plus per-domain offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedContext {
    master_seed: u64,
    offsets: BTreeMap<SeedDomain, u64>,
}

impl SeedContext {
    pub fn new(master_seed: u64, overrides: &BTreeMap<SeedDomain, u64>) -> Self {
        let offsets = SeedDomain::ALL
            .iter()
            .map(|domain| {
                let offset = overrides.get(domain).copied().unwrap_or_else(|| domain.default_offset());
                (*domain, offset)
            })
            .collect();
        Self { master_seed, offsets }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn offset(&self, domain: SeedDomain) -> u64 {
        self.offsets.get(&domain).copied().unwrap_or_else(|| domain.default_offset())
    }

    pub fn phase_seed(&self, domain: SeedDomain) -> u64 {
        self.master_seed.wrapping_add(self.offset(domain))
    }

    /// Fresh stream for `domain`; identical for identical `(master_seed, offset)`.
    pub fn reseed(&self, domain: SeedDomain) -> PhaseRng {
        PhaseRng::from_seed(domain, self.phase_seed(domain))
    }
}

/// Seeded ChaCha8 stream scoped to one phase.
#[derive(Clone, Debug)]
pub struct PhaseRng {
    domain: SeedDomain,
    seed: u64,
    inner: ChaCha8Rng,
    draws: u64,
}

impl PhaseRng {
    pub fn from_seed(domain: SeedDomain, seed: u64) -> Self {
        Self { domain, seed, inner: ChaCha8Rng::seed_from_u64(seed), draws: 0 }
    }

    pub fn domain(&self) -> SeedDomain {
        self.domain
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.draws += 1;
        self.inner.gen::<f64>()
    }

    /// Bernoulli trial; always consumes one draw so record streams stay aligned.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.unit() < probability
    }

    pub fn range_inclusive(&mut self, low: i64, high: i64) -> i64 {
        self.draws += 1;
        if high <= low {
            return low;
        }
        self.inner.gen_range(low..=high)
    }

    /// Uniform index below `len`; zero for empty input.
    pub fn index(&mut self, len: usize) -> usize {
        self.draws += 1;
        if len <= 1 {
            return 0;
        }
        self.inner.gen_range(0..len)
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        let position = self.index(items.len());
        items.get(position)
    }

    pub fn sample<'a, T: Clone>(&mut self, distribution: &'a Distribution<T>) -> &'a T {
        let unit = self.unit();
        distribution.sample_at(unit)
    }

    /// Underlying generator, for crates that take `&mut impl Rng` (name fakers).
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        self.draws += 1;
        &mut self.inner
    }
}
