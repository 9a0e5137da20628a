//! One generator per phase. Each takes the shared context, its phase stream and the
//! committed upstream records it draws foreign keys from.

pub mod cases;
pub mod downstream;
pub mod intake;
pub mod investigations;
pub mod locations;
pub mod narrative;
pub mod org;
pub mod taxonomy;

pub use cases::{generate_cases, ConsolidationPlan, GeneratedCases};
pub use downstream::{
    generate_ai_conversations, generate_campaigns, generate_notifications, generate_reports,
    generate_saved_views, generate_workflows,
};
pub use intake::generate_intake_records;
pub use investigations::generate_investigations;
pub use locations::generate_locations;
pub use narrative::NarrativeLibrary;
pub use org::generate_employees;
pub use taxonomy::generate_categories;
