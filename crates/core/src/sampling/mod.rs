//! Seeded random streams and the weighted categorical sampler every generator draws through.

pub mod seed;
pub mod weighted;

pub use seed::{PhaseRng, SeedContext, SeedDomain};
pub use weighted::{Distribution, DistributionError, WeightedValue};
