use serde::Serialize;

use crate::domain::EntityKind;
use crate::errors::DomainError;
use crate::sampling::SeedDomain;

/// Generation phases in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Taxonomy,
    Locations,
    Organization,
    Patterns,
    IntakeRecords,
    Cases,
    Investigations,
    Campaigns,
    Workflows,
    Notifications,
    SavedViews,
    AiConversations,
    Reports,
}

impl Phase {
    pub const ORDER: &'static [Phase] = &[
        Phase::Taxonomy,
        Phase::Locations,
        Phase::Organization,
        Phase::Patterns,
        Phase::IntakeRecords,
        Phase::Cases,
        Phase::Investigations,
        Phase::Campaigns,
        Phase::Workflows,
        Phase::Notifications,
        Phase::SavedViews,
        Phase::AiConversations,
        Phase::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taxonomy => "taxonomy",
            Self::Locations => "locations",
            Self::Organization => "organization",
            Self::Patterns => "patterns",
            Self::IntakeRecords => "intake_records",
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

    pub fn depends_on(&self) -> &'static [Phase] {
        use Phase::*;
        match self {
            Taxonomy | Locations => &[],
            Organization => &[Locations],
            Patterns => &[Taxonomy, Organization],
            IntakeRecords => &[Taxonomy, Locations],
            Cases => &[IntakeRecords, Patterns, Organization],
            Investigations => &[Cases, Organization],
            Campaigns | SavedViews | Reports => &[Organization],
            Workflows => &[Cases],
            Notifications => &[Cases, Investigations, Organization],
            AiConversations => &[Cases, Taxonomy, Organization],
        }
    }

    /// Downstream attachers: nothing depends on them, so their failures are logged and skipped.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Campaigns
                | Self::Workflows
                | Self::Notifications
                | Self::SavedViews
                | Self::AiConversations
                | Self::Reports
        )
    }

    pub fn seed_domain(&self) -> SeedDomain {
        match self {
            Self::Taxonomy => SeedDomain::Taxonomy,
            Self::Locations => SeedDomain::Locations,
            Self::Organization => SeedDomain::Organization,
            Self::Patterns => SeedDomain::Patterns,
            Self::IntakeRecords => SeedDomain::Intake,
            Self::Cases => SeedDomain::Cases,
            Self::Investigations => SeedDomain::Investigations,
            Self::Campaigns => SeedDomain::Campaigns,
            Self::Workflows => SeedDomain::Workflows,
            Self::Notifications => SeedDomain::Notifications,
            Self::SavedViews => SeedDomain::SavedViews,
            Self::AiConversations => SeedDomain::AiConversations,
            Self::Reports => SeedDomain::Reports,
        }
    }

    /// Entity kinds written by the phase.
    pub fn produces(&self) -> &'static [EntityKind] {
        match self {
            Self::Taxonomy => &[EntityKind::Category],
            Self::Locations => &[EntityKind::Location],
            Self::Organization => &[EntityKind::Employee],
            Self::Patterns => &[],
            Self::IntakeRecords => &[EntityKind::IntakeRecord],
            Self::Cases => &[EntityKind::Case, EntityKind::Association],
            Self::Investigations => &[EntityKind::Investigation],
            Self::Campaigns => &[EntityKind::Campaign, EntityKind::CampaignAssignment],
            Self::Workflows => &[EntityKind::WorkflowInstance],
            Self::Notifications => &[EntityKind::Notification],
            Self::SavedViews => &[EntityKind::SavedView],
            Self::AiConversations => &[EntityKind::AiConversation],
            Self::Reports => &[EntityKind::Report],
        }
    }

    /// Checks that every phase runs after its dependencies and that no core phase depends on
    /// a terminal one.
    pub fn validate_order(order: &[Phase]) -> Result<(), DomainError> {
        for (position, phase) in order.iter().enumerate() {
            for dependency in phase.depends_on() {
                if !order[..position].contains(dependency) || dependency.is_terminal() {
                    return Err(DomainError::PhaseOrder {
                        phase: phase.as_str(),
                        dependency: dependency.as_str(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Phase;
    use crate::domain::EntityKind;
    use crate::errors::DomainError;

    #[test]
    fn declared_order_is_valid() {
        Phase::validate_order(Phase::ORDER).expect("declared order satisfies dependencies");
    }

    #[test]
    fn dependency_before_dependent_is_enforced() {
        let mut order = Phase::ORDER.to_vec();
        let cases = order.iter().position(|phase| *phase == Phase::Cases).expect("cases");
        let intake = order.iter().position(|phase| *phase == Phase::IntakeRecords).expect("intake");
        order.swap(cases, intake);

        let error = Phase::validate_order(&order).expect_err("cases before intake must fail");
        assert_eq!(error, DomainError::PhaseOrder { phase: "cases", dependency: "intake_records" });
    }

    #[test]
    fn terminal_phases_come_last() {
        let first_terminal =
            Phase::ORDER.iter().position(Phase::is_terminal).expect("terminal phases exist");
        assert!(Phase::ORDER[first_terminal..].iter().all(Phase::is_terminal));
    }

    #[test]
    fn produced_kinds_follow_flush_order() {
        let produced = Phase::ORDER
            .iter()
            .flat_map(|phase| phase.produces().iter().copied())
            .collect::<Vec<EntityKind>>();
        let mut sorted = produced.clone();
        sorted.sort();
        assert_eq!(produced, sorted);
        assert_eq!(produced.len(), EntityKind::ALL.len());
    }
}
