use chrono::{DateTime, Duration, Utc};
use tera::Context;

use super::narrative::{
    FINDINGS_INCONCLUSIVE, FINDINGS_IN_PROGRESS, FINDINGS_SUBSTANTIATED, FINDINGS_UNSUBSTANTIATED,
    LESSONS_LEARNED, ROOT_CAUSE,
};
use crate::domain::case::{Case, CaseStatus};
use crate::domain::employee::{Employee, OrgChart, OrgLevel};
use crate::domain::investigation::{
    Investigation, InvestigationKind, InvestigationStatus, Outcome, ReassignmentEvent,
};
use crate::domain::taxonomy::Taxonomy;
use crate::domain::{EmployeeId, EntityKind, InvestigationId};
use crate::errors::GenerationError;
use crate::patterns::{FlagshipInvestigation, FLAGSHIP_CASES};
use crate::pipeline::GenerationContext;
use crate::sampling::PhaseRng;

const REASSIGNMENT_REASONS: &[&str] = &[
    "Conflict of interest identified",
    "Investigator on extended leave",
    "Workload rebalancing",
    "Specialist expertise required",
];

fn findings_template(outcome: Option<Outcome>) -> &'static str {
    match outcome {
        Some(Outcome::Substantiated) => FINDINGS_SUBSTANTIATED,
        Some(Outcome::Unsubstantiated) => FINDINGS_UNSUBSTANTIATED,
        Some(Outcome::Inconclusive) => FINDINGS_INCONCLUSIVE,
        None => FINDINGS_IN_PROGRESS,
    }
}

struct Builder<'a> {
    context: &'a GenerationContext,
    investigators: Vec<&'a Employee>,
}

impl Builder<'_> {
    fn investigation(
        &self,
        case: &Case,
        number: u32,
        kind: InvestigationKind,
        status: InvestigationStatus,
        outcome: Option<Outcome>,
        investigator_id: Option<EmployeeId>,
    ) -> Investigation {
        let reference_number = format!("{}-INV-{number}", case.reference_number);
        Investigation {
            id: InvestigationId(
                self.context.entity_id(EntityKind::Investigation, &reference_number),
            ),
            reference_number,
            case_id: case.id.clone(),
            number,
            kind,
            status,
            outcome,
            investigator_id,
            findings: None,
            root_cause: None,
            lessons_learned: None,
            reassignment: None,
            opened_at: case.created_at,
            closed_at: (status == InvestigationStatus::Closed)
                .then(|| case.closed_at.unwrap_or(case.updated_at)),
        }
    }

    fn investigator(&self, rng: &mut PhaseRng, case: &Case) -> Option<EmployeeId> {
        case.assignee_employee_id
            .clone()
            .or_else(|| rng.pick(&self.investigators).map(|employee| employee.id.clone()))
    }

    fn reassign(
        &self,
        rng: &mut PhaseRng,
        investigation: &mut Investigation,
        until: DateTime<Utc>,
    ) {
        let Some(from) = investigation.investigator_id.clone() else {
            return;
        };
        let others = self
            .investigators
            .iter()
            .filter(|employee| employee.id != from)
            .collect::<Vec<_>>();
        let Some(to) = rng.pick(&others).map(|employee| employee.id.clone()) else {
            return;
        };
        let window_hours = (until - investigation.opened_at).num_hours().max(0);
        let offset = Duration::hours(rng.range_inclusive(0, window_hours));
        let occurred_at = investigation.opened_at + offset;
        let reason = rng.pick(REASSIGNMENT_REASONS).copied().unwrap_or("Workload rebalancing");

        investigation.reassignment = Some(ReassignmentEvent {
            from_employee_id: from,
            to_employee_id: to.clone(),
            reason: reason.to_string(),
            occurred_at,
        });
        investigation.investigator_id = Some(to);
    }

    fn sampled(
        &self,
        rng: &mut PhaseRng,
        case: &Case,
        number: u32,
        kind: InvestigationKind,
        template: &Context,
    ) -> Result<Investigation, GenerationError> {
        let distributions = &self.context.distributions;
        let (status, outcome) = match case.status {
            CaseStatus::New => (InvestigationStatus::New, None),
            CaseStatus::Open => (*rng.sample(&distributions.investigation_open_status), None),
            CaseStatus::Closed => {
                (InvestigationStatus::Closed, Some(*rng.sample(&distributions.outcome)))
            }
        };
        let investigator_id = self.investigator(rng, case);
        let mut investigation =
            self.investigation(case, number, kind, status, outcome, investigator_id);

        let narratives = &self.context.narratives;
        if status != InvestigationStatus::New {
            investigation.findings =
                Some(narratives.render(findings_template(outcome), rng, template)?);
        }
        if outcome == Some(Outcome::Substantiated) {
            investigation.root_cause = Some(narratives.render(ROOT_CAUSE, rng, template)?);
            investigation.lessons_learned =
                Some(narratives.render(LESSONS_LEARNED, rng, template)?);
        }
        Ok(investigation)
    }

    fn authored(
        &self,
        rng: &mut PhaseRng,
        case: &Case,
        number: u32,
        payload: &FlagshipInvestigation,
    ) -> Investigation {
        let investigator_id = self.investigator(rng, case);
        let mut investigation = self.investigation(
            case,
            number,
            payload.kind,
            payload.status,
            payload.outcome,
            investigator_id,
        );
        investigation.findings = Some(payload.findings.to_string());
        investigation.root_cause = payload.root_cause.map(str::to_string);
        investigation.lessons_learned = payload.lessons_learned.map(str::to_string);
        investigation
    }
}

/// Investigations for the committed cases: authored ones for flagships, sampled ones
/// otherwise. NEW cases are only sometimes investigated.
pub fn generate_investigations(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    taxonomy: &Taxonomy,
    chart: &OrgChart,
    cases: &[Case],
) -> Result<Vec<Investigation>, GenerationError> {
    if cases.len() < context.config.minimums.cases.max(1) {
        return Err(GenerationError::missing(
            "investigations",
            format!(
                "{} committed cases, at least {} required",
                cases.len(),
                context.config.minimums.cases.max(1)
            ),
        ));
    }

    let department = &context.config.reference.investigator_department;
    let builder = Builder {
        context,
        investigators: chart
            .in_department(department)
            .filter(|employee| employee.level != OrgLevel::Executive)
            .collect(),
    };
    let rates = &context.config.rates;
    let mut investigations = Vec::with_capacity(cases.len() + cases.len() / 8);

    for case in cases {
        if let Some(flagship) = case
            .flagship_key
            .as_deref()
            .and_then(|key| FLAGSHIP_CASES.iter().find(|flagship| flagship.key == key))
        {
            for (position, payload) in flagship.investigations.iter().enumerate() {
                let number = u32::try_from(position + 1).unwrap_or(u32::MAX);
                investigations.push(builder.authored(rng, case, number, payload));
            }
            continue;
        }

        if case.status == CaseStatus::New && !rng.chance(rates.new_case_investigation) {
            continue;
        }

        let category = taxonomy.get(&case.category_id);
        let mut template = Context::new();
        template.insert(
            "category",
            category.map_or("the reported conduct", |category| category.name.as_str()),
        );
        template.insert(
            "root_category",
            taxonomy.root_of(&case.category_id).map_or("compliance", |root| root.name.as_str()),
        );

        let mut primary = builder.sampled(rng, case, 1, InvestigationKind::Primary, &template)?;
        if rng.chance(rates.reassignment) {
            let until = primary.closed_at.unwrap_or(case.updated_at);
            builder.reassign(rng, &mut primary, until);
        }
        investigations.push(primary);

        if case.status != CaseStatus::New && rng.chance(rates.regulatory_overlay) {
            investigations.push(builder.sampled(
                rng,
                case,
                2,
                InvestigationKind::RegulatoryOverlay,
                &template,
            )?);
        }
    }

    for investigation in &investigations {
        investigation.check_invariants()?;
    }
    Ok(investigations)
}
