use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::phases::Phase;
use crate::domain::EntityKind;
use crate::patterns::PoolStats;
use crate::persistence::KindCounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub status: PhaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What one seed run produced, emitted by the CLI as its JSON result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub organization: String,
    pub master_seed: u64,
    pub current_date: NaiveDate,
    pub case_target: usize,
    pub phases: Vec<PhaseReport>,
    pub entities: BTreeMap<EntityKind, KindCounts>,
    pub patterns: PoolStats,
}

impl RunSummary {
    pub fn new(
        organization: impl Into<String>,
        master_seed: u64,
        current_date: NaiveDate,
        case_target: usize,
    ) -> Self {
        Self {
            organization: organization.into(),
            master_seed,
            current_date,
            case_target,
            phases: Vec::with_capacity(Phase::ORDER.len()),
            entities: BTreeMap::new(),
            patterns: PoolStats::default(),
        }
    }

    pub fn record_completed(&mut self, phase: Phase) {
        self.phases.push(PhaseReport { phase, status: PhaseStatus::Completed, error: None });
    }

    pub fn record_skipped(&mut self, phase: Phase, error: impl Into<String>) {
        self.phases.push(PhaseReport {
            phase,
            status: PhaseStatus::Skipped,
            error: Some(error.into()),
        });
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|report| report.phase == phase)
    }

    pub fn skipped_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.phases
            .iter()
            .filter(|report| report.status == PhaseStatus::Skipped)
            .map(|report| report.phase)
    }

    pub fn counts(&self, kind: EntityKind) -> KindCounts {
        self.entities.get(&kind).copied().unwrap_or_default()
    }

    pub fn total_inserted(&self) -> usize {
        self.entities.values().map(|counts| counts.inserted).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{PhaseStatus, RunSummary};
    use crate::domain::EntityKind;
    use crate::persistence::KindCounts;
    use crate::pipeline::Phase;

    #[test]
    fn serializes_phase_statuses_and_entity_counts() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 2).expect("date");
        let mut summary = RunSummary::new("acme", 7, date, 90);
        summary.record_completed(Phase::Cases);
        summary.record_skipped(Phase::Reports, "no committed employees");
        summary
            .entities
            .insert(EntityKind::Case, KindCounts { generated: 90, inserted: 90, skipped: 0 });

        assert_eq!(summary.skipped_phases().collect::<Vec<_>>(), [Phase::Reports]);
        assert_eq!(summary.phase(Phase::Cases).map(|r| r.status), Some(PhaseStatus::Completed));
        assert_eq!(summary.counts(EntityKind::Report), KindCounts::default());

        let json = serde_json::to_value(&summary).expect("serializes");
        assert_eq!(json["phases"][0], serde_json::json!({"phase": "cases", "status": "completed"}));
        assert_eq!(json["phases"][1]["error"], "no committed employees");
        assert_eq!(json["entities"]["CASE"]["inserted"], 90);
        assert_eq!(json["current_date"], "2026-02-02");
    }
}
