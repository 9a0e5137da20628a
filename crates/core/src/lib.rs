pub mod config;
pub mod domain;
pub mod errors;
pub mod generators;
pub mod linker;
pub mod patterns;
pub mod persistence;
pub mod pipeline;
pub mod sampling;
pub mod temporal;

pub use config::{AppConfig, ConfigError, ConfigOverrides, GenerationConfig, LoadOptions};
pub use domain::organization::Organization;
pub use domain::{EntityKind, OrganizationId};
pub use errors::{DomainError, GenerationError};
pub use linker::ReferentialLinker;
pub use patterns::PoolStats;
pub use persistence::{
    DatasetStore, InMemoryDatasetStore, InsertOutcome, KindCounts, RecordBatch, StoreError,
};
pub use pipeline::{GenerationContext, Phase, PhaseStatus, RunSummary, SeedPipeline};
