use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tera::Context;

use super::narrative::{CASE_SUMMARY, CASE_TITLE};
use crate::domain::association::{Association, AssociationRole};
use crate::domain::case::{Case, CaseStatus, Complexity};
use crate::domain::employee::{Employee, OrgChart, OrgLevel};
use crate::domain::intake::{IntakeRecord, IntakeType};
use crate::domain::location::Location;
use crate::domain::taxonomy::Taxonomy;
use crate::domain::{CaseId, CategoryId, EmployeeId, EntityKind, LocationId};
use crate::errors::GenerationError;
use crate::linker::ReferentialLinker;
use crate::patterns::{FlagshipCase, FlagshipSlot, PatternInjector};
use crate::pipeline::GenerationContext;
use crate::sampling::PhaseRng;

/// Secondary records a single case may absorb.
const MAX_FOLDS: usize = 2;
const UNASSIGNED_NEW_CASE_SHARE: f64 = 0.5;
const FLAGSHIP_OPENED_HOUR: u32 = 10;

#[derive(Clone, Debug, Default)]
pub struct GeneratedCases {
    pub cases: Vec<Case>,
    pub associations: Vec<Association>,
    pub folded: usize,
    pub dropped: usize,
}

/// How the surplus between intake volume and case target is spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsolidationPlan {
    pub target: usize,
    pub fold_budget: usize,
    pub drop_budget: usize,
}

impl ConsolidationPlan {
    pub fn new(intake_count: usize, case_ratio: f64, consolidation_share: f64) -> Self {
        let target = ((intake_count as f64 * case_ratio).round() as usize).clamp(1, intake_count);
        let surplus = intake_count - target;
        let fold_budget = ((surplus as f64 * consolidation_share).round() as usize).min(surplus);
        Self { target, fold_budget, drop_budget: surplus - fold_budget }
    }
}

/// `count` slots spread evenly over `target` case positions.
pub fn flagship_positions(count: usize, target: usize) -> BTreeSet<usize> {
    let count = count.min(target);
    (0..count).map(|position| ((2 * position + 1) * target) / (2 * count)).collect()
}

/// Intake positions reserved as flagship primaries. They sit at the evenly spread case
/// positions, stepping past slots pinned to an edge date. Every position is below the case
/// target, so the cursor always reaches it as a primary.
pub fn flagship_intake_positions(
    context: &GenerationContext,
    flagships: usize,
    intake_count: usize,
) -> BTreeSet<usize> {
    if intake_count == 0 {
        return BTreeSet::new();
    }
    let rates = &context.config.rates;
    let plan = ConsolidationPlan::new(intake_count, rates.case_ratio, rates.consolidation_share);
    flagship_positions(flagships, plan.target)
        .into_iter()
        .map(|position| {
            (position..plan.target)
                .find(|slot| context.temporal.boundary_date_for(*slot).is_none())
                .unwrap_or(position)
        })
        .collect()
}

/// Authored opening instant, `opened_days_ago` before the generation date.
pub fn flagship_opened_at(context: &GenerationContext, payload: &FlagshipCase) -> DateTime<Utc> {
    let opened_on = context.temporal.current_date() - Duration::days(payload.opened_days_ago);
    let opened_time = NaiveTime::from_hms_opt(FLAGSHIP_OPENED_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    context.temporal.clamp_to_now(opened_on.and_time(opened_time).and_utc())
}

/// Per-slot share of a budget: the whole part plus a Bernoulli draw on the fraction.
fn paced(rng: &mut PhaseRng, left: usize, remaining_slots: usize) -> usize {
    let pressure = left as f64 / remaining_slots.max(1) as f64;
    pressure.floor() as usize + usize::from(rng.chance(pressure.fract()))
}

struct Staff<'a> {
    investigators: Vec<&'a Employee>,
    subjects: Vec<&'a Employee>,
}

impl<'a> Staff<'a> {
    fn from_chart(chart: &'a OrgChart, investigator_department: &str) -> Self {
        let (investigators, subjects) = chart
            .all()
            .iter()
            .filter(|employee| employee.level != OrgLevel::Executive)
            .partition(|employee| employee.department == investigator_department);
        Self { investigators, subjects }
    }
}

struct Subject {
    employee_id: Option<EmployeeId>,
    repeat: bool,
    hotspot_manager_id: Option<EmployeeId>,
}

fn choose_subject(
    rng: &mut PhaseRng,
    patterns: &mut PatternInjector,
    chart: &OrgChart,
    staff: &Staff<'_>,
    hotspot_rate: f64,
    root_category: &CategoryId,
) -> Subject {
    if let Some(identity) = patterns.try_consume_repeat_subject(rng) {
        return Subject { employee_id: Some(identity), repeat: true, hotspot_manager_id: None };
    }
    if rng.chance(hotspot_rate) {
        if let Some(manager_id) = patterns.try_consume_hotspot(root_category) {
            let team = chart.direct_reports(&manager_id);
            return Subject {
                employee_id: rng.pick(&team).map(|employee| employee.id.clone()),
                repeat: false,
                hotspot_manager_id: Some(manager_id),
            };
        }
    }
    Subject {
        employee_id: rng.pick(&staff.subjects).map(|employee| employee.id.clone()),
        repeat: false,
        hotspot_manager_id: None,
    }
}

/// Walks committed intake records in reference order and opens exactly
/// [`ConsolidationPlan::target`] cases, folding or dropping the surplus.
pub fn generate_cases(
    context: &GenerationContext,
    patterns: &mut PatternInjector,
    rng: &mut PhaseRng,
    taxonomy: &Taxonomy,
    chart: &OrgChart,
    locations: &[Location],
    intake: &[IntakeRecord],
) -> Result<GeneratedCases, GenerationError> {
    if intake.is_empty() {
        return Err(GenerationError::missing("cases", "no committed intake records"));
    }
    let config = &context.config;
    let plan = ConsolidationPlan::new(
        intake.len(),
        config.rates.case_ratio,
        config.rates.consolidation_share,
    );
    let reserved = flagship_intake_positions(context, patterns.flagship_count(), intake.len());
    // Records before the next reserved position; drops and folds never pass it.
    let unreserved_run =
        |cursor: usize| reserved.range(cursor..).next().map_or(usize::MAX, |next| next - cursor);
    let staff = Staff::from_chart(chart, &config.reference.investigator_department);
    let locations = locations
        .iter()
        .map(|location| (&location.id, location))
        .collect::<HashMap<&LocationId, &Location>>();

    let mut linker = ReferentialLinker::new(plan.fold_budget);
    let mut generated = GeneratedCases::default();
    let mut drop_left = plan.drop_budget;
    let mut fold_left = plan.fold_budget;
    let mut cursor = 0usize;

    for slot in 0..plan.target {
        let remaining_slots = plan.target - slot;
        // Records that may be dropped or folded while still leaving one primary per slot.
        let spare = |cursor: usize| (intake.len() - cursor).saturating_sub(remaining_slots);

        let drops = paced(rng, drop_left, remaining_slots)
            .min(drop_left)
            .min(spare(cursor))
            .min(unreserved_run(cursor));
        cursor += drops;
        drop_left -= drops;
        generated.dropped += drops;

        let primary_position = cursor;
        let primary = &intake[cursor];
        cursor += 1;
        let reference_number = format!("CASE-{:06}", slot + 1);
        let case_id = CaseId(context.entity_id(EntityKind::Case, &reference_number));
        linker.link_primary(&case_id, &reference_number, &primary.id)?;
        let mut linked = vec![primary.id.clone()];

        while linked.len() <= MAX_FOLDS
            && fold_left > 0
            && spare(cursor - 1) > 0
            && !reserved.contains(&cursor)
        {
            let next = &intake[cursor];
            let same_incident = primary.incident_group.is_some()
                && next.incident_group == primary.incident_group
                && !next.is_group_primary;
            if !same_incident {
                break;
            }
            linker.link_secondary(&next.id, AssociationRole::Related)?;
            linked.push(next.id.clone());
            cursor += 1;
            fold_left -= 1;
        }

        let planned = paced(rng, fold_left, remaining_slots)
            .min(MAX_FOLDS + 1 - linked.len())
            .min(fold_left)
            .min(spare(cursor - 1))
            .min(unreserved_run(cursor));
        for _ in 0..planned {
            let next = &intake[cursor];
            linker.link_secondary(&next.id, AssociationRole::MergedFrom)?;
            linked.push(next.id.clone());
            cursor += 1;
            fold_left -= 1;
        }
        generated.folded += linked.len() - 1;

        let flagship = if reserved.contains(&primary_position) {
            patterns.try_consume_flagship()
        } else {
            None
        };

        let sampled_status = *rng.sample(&context.distributions.case_status);
        let sampled_priority = *rng.sample(&context.distributions.priority);
        let sampled_complexity = *rng.sample(&context.distributions.complexity);
        let (status, priority, complexity, severity, category_id) = match &flagship {
            Some(FlagshipSlot { payload, category_id, .. }) => (
                payload.status,
                payload.priority,
                payload.complexity,
                payload.severity,
                category_id.clone(),
            ),
            None => (
                sampled_status,
                sampled_priority,
                sampled_complexity,
                primary.severity,
                primary.category_id.clone(),
            ),
        };

        let category = taxonomy.get(&category_id).ok_or_else(|| {
            GenerationError::missing("cases", format!("category {category_id} is not committed"))
        })?;
        let root = taxonomy.root_of(&category.id).unwrap_or(category);

        let subject = if primary.intake_type == IntakeType::PolicyQuestion && flagship.is_none() {
            Subject { employee_id: None, repeat: false, hotspot_manager_id: None }
        } else {
            choose_subject(rng, patterns, chart, &staff, config.rates.hotspot, &root.id)
        };
        let assignee_id = if status == CaseStatus::New && rng.chance(UNASSIGNED_NEW_CASE_SHARE) {
            None
        } else {
            rng.pick(&staff.investigators).map(|employee| employee.id.clone())
        };

        let (created_at, updated_at) = match &flagship {
            Some(FlagshipSlot { payload, .. }) => {
                let created_at = flagship_opened_at(context, payload).max(primary.created_at);
                let updated_at = match payload.status {
                    CaseStatus::New => created_at,
                    _ => context
                        .temporal
                        .clamp_to_now(created_at + Duration::days(payload.duration_days)),
                };
                (created_at, updated_at)
            }
            None => timeline(context, rng, primary.created_at, status, complexity),
        };

        let (title, summary) = match &flagship {
            Some(FlagshipSlot { payload, .. }) => {
                (payload.title.to_string(), payload.summary.to_string())
            }
            None => {
                let location = locations.get(&primary.location_id);
                let mut template = Context::new();
                template.insert("category", &category.name);
                template.insert("root_category", &root.name);
                template.insert(
                    "location",
                    location.map_or("an unspecified site", |site| site.name.as_str()),
                );
                template.insert(
                    "city",
                    location.map_or("an unspecified city", |site| site.city.as_str()),
                );
                template.insert("intake_reference", &primary.reference_number);
                template.insert("priority", priority.as_str());
                template.insert("linked", &linked.len());
                (
                    context.narratives.render(CASE_TITLE, rng, &template)?,
                    context.narratives.render(CASE_SUMMARY, rng, &template)?,
                )
            }
        };

        let case = Case {
            id: case_id,
            reference_number,
            title,
            status,
            priority,
            complexity,
            severity,
            channel: primary.channel,
            category_id: category.id.clone(),
            primary_intake_record_id: primary.id.clone(),
            linked_intake_record_ids: linked,
            subject_employee_id: subject.employee_id,
            assignee_employee_id: assignee_id,
            repeat_subject: subject.repeat,
            hotspot_manager_id: subject.hotspot_manager_id,
            flagship_key: flagship.as_ref().map(|slot| slot.payload.key.to_string()),
            summary,
            due_at: created_at + Duration::days(i64::from(category.sla_days)),
            created_at,
            updated_at,
            closed_at: (status == CaseStatus::Closed).then_some(updated_at),
        };
        case.check_invariants(context.reference_now())?;
        generated.cases.push(case);
    }

    generated.dropped += intake.len() - cursor;
    generated.associations = linker.into_associations();
    Ok(generated)
}

/// Creation lags the primary report; closed cases then run for a complexity-conditioned
/// number of days and open ones show some recent activity.
fn timeline(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    reported_at: DateTime<Utc>,
    status: CaseStatus,
    complexity: Complexity,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let timing = &context.config.case_timing;
    let lag = rng.range_inclusive(timing.intake_lag_hours.min, timing.intake_lag_hours.max);
    let created_at = context.temporal.clamp_to_now(reported_at + Duration::hours(lag));

    let active_days = match status {
        CaseStatus::New => 0,
        CaseStatus::Open => {
            rng.range_inclusive(timing.open_activity_days.min, timing.open_activity_days.max)
        }
        CaseStatus::Closed => {
            let span = timing.duration_for(complexity);
            rng.range_inclusive(span.min, span.max)
        }
    };
    let updated_at = context.temporal.clamp_to_now(created_at + Duration::days(active_days));
    (created_at, updated_at)
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::{flagship_positions, ConsolidationPlan};
    use crate::config::GenerationConfig;
    use crate::domain::association::AssociationRole;
    use crate::domain::case::CaseStatus;
    use crate::pipeline::test_support::Fixture;

    fn config(records: usize) -> GenerationConfig {
        let mut config = GenerationConfig::default();
        config.volumes.intake_records = records;
        config
    }

    #[test]
    fn plan_splits_surplus_between_folds_and_drops() {
        let plan = ConsolidationPlan::new(5000, 0.9, 0.5);
        assert_eq!(plan, ConsolidationPlan { target: 4500, fold_budget: 250, drop_budget: 250 });

        let everything = ConsolidationPlan::new(3, 1.0, 0.5);
        assert_eq!(everything.target, 3);
        assert_eq!(everything.fold_budget + everything.drop_budget, 0);
    }

    #[test]
    fn flagship_positions_are_spread_and_capped() {
        let positions = flagship_positions(8, 4500).into_iter().collect::<Vec<_>>();
        assert_eq!(positions.len(), 8);
        assert_eq!(positions[0], 281);
        assert!(positions.windows(2).all(|pair| pair[1] - pair[0] >= 562));

        assert_eq!(flagship_positions(8, 3).len(), 3);
        assert!(flagship_positions(0, 100).is_empty());
    }

    #[test]
    fn opens_exactly_the_target_with_one_primary_each() {
        let fixture = Fixture::through_cases(config(1000));
        let generated = fixture.cases.as_ref().expect("cases generated");

        assert_eq!(generated.cases.len(), 900);
        assert_eq!(generated.folded + generated.dropped + generated.cases.len(), 1000);
        assert_eq!(generated.associations.len(), 900 + generated.folded);

        let primaries = generated
            .associations
            .iter()
            .filter(|association| association.role == AssociationRole::Primary)
            .count();
        assert_eq!(primaries, 900);
        let linked = generated
            .associations
            .iter()
            .map(|association| &association.intake_record_id)
            .collect::<HashSet<_>>();
        assert_eq!(linked.len(), generated.associations.len());
        assert!(generated.folded <= 50);

        let now = fixture.context.reference_now();
        for case in &generated.cases {
            case.check_invariants(now).expect("case invariants hold");
            assert!(case.linked_intake_record_ids.len() <= 3);
            assert!(case.due_at > case.created_at);
        }
    }

    #[test]
    fn flagships_are_inserted_verbatim() {
        let fixture = Fixture::through_cases(config(1000));
        let generated = fixture.cases.as_ref().expect("cases generated");
        let flagships = generated
            .cases
            .iter()
            .filter(|case| case.flagship_key.is_some())
            .collect::<Vec<_>>();

        assert_eq!(flagships.len(), crate::patterns::FLAGSHIP_CASES.len());
        let kickbacks = flagships
            .iter()
            .find(|case| case.flagship_key.as_deref() == Some("procurement-kickback-ring"))
            .expect("flagship present");
        assert_eq!(kickbacks.status, CaseStatus::Closed);
        assert_eq!(
            fixture.taxonomy.get(&kickbacks.category_id).map(|category| category.code.as_str()),
            Some("FIN-03")
        );
        assert_eq!((kickbacks.updated_at - kickbacks.created_at).num_days(), 75);
    }

    #[test]
    fn cases_open_after_and_share_the_category_of_their_primary_report() {
        let fixture = Fixture::through_cases(config(5000));
        let generated = fixture.cases.as_ref().expect("cases generated");
        let reports =
            fixture.intake.iter().map(|record| (&record.id, record)).collect::<HashMap<_, _>>();

        let mut flagships = 0;
        for case in &generated.cases {
            let primary = reports.get(&case.primary_intake_record_id).expect("primary report");
            assert!(
                case.created_at >= primary.created_at,
                "{} opened before {}",
                case.reference_number,
                primary.reference_number
            );
            assert_eq!(case.category_id, primary.category_id, "{}", case.reference_number);
            flagships += usize::from(case.flagship_key.is_some());
        }
        assert_eq!(flagships, crate::patterns::FLAGSHIP_CASES.len());
    }

    #[test]
    fn closed_durations_follow_complexity() {
        let fixture = Fixture::through_cases(config(1500));
        let generated = fixture.cases.as_ref().expect("cases generated");
        let timing = &fixture.context.config.case_timing;
        let now = fixture.context.reference_now();

        let closed = generated
            .cases
            .iter()
            .filter(|case| case.is_closed() && case.flagship_key.is_none() && case.updated_at < now);
        for case in closed {
            let span = timing.duration_for(case.complexity);
            let days = (case.updated_at - case.created_at).num_days();
            assert!(days >= span.min && days <= span.max, "{} ran {days} days", case.reference_number);
        }
    }
}
