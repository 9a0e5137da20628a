//! Attachers for entities that hang off the committed org and case graph. None of them feed
//! anything back upstream.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use tera::Context;

use super::narrative::AI_EXCHANGE;
use crate::domain::attachments::{
    AiConversation, AiMessage, AssignmentStatus, Campaign, CampaignAssignment, CampaignKind,
    CampaignStatus, Notification, NotificationKind, Report, ReportKind, SavedView,
    WorkflowInstance, WorkflowStatus,
};
use crate::domain::case::{Case, CaseStatus};
use crate::domain::employee::{Employee, OrgChart, OrgLevel};
use crate::domain::investigation::Investigation;
use crate::domain::taxonomy::{Severity, Taxonomy};
use crate::domain::{CaseId, EmployeeId, EntityKind};
use crate::errors::GenerationError;
use crate::pipeline::GenerationContext;
use crate::sampling::PhaseRng;

const CAMPAIGN_WINDOW_DAYS: i64 = 30;
const WORKFLOW_STEPS: &[&str] = &["Intake Review", "Investigation", "Findings Review", "Closure"];
const NOTIFICATION_READ_SHARE: f64 = 0.65;
const REPORT_RUN_SHARE: f64 = 0.8;

fn compliance_staff<'a>(context: &GenerationContext, chart: &'a OrgChart) -> Vec<&'a Employee> {
    let department = context.config.reference.investigator_department.as_str();
    chart
        .all()
        .iter()
        .filter(|employee| {
            employee.department == department && employee.level != OrgLevel::Executive
        })
        .collect()
}

fn pick_owner(
    rng: &mut PhaseRng,
    staff: &[&Employee],
    chart: &OrgChart,
    phase: &'static str,
) -> Result<EmployeeId, GenerationError> {
    rng.pick(staff)
        .map(|employee| employee.id.clone())
        .or_else(|| chart.root().map(|root| root.id.clone()))
        .ok_or_else(|| GenerationError::missing(phase, "no committed employees"))
}

fn at_nine(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)).and_utc()
}

pub fn generate_campaigns(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    chart: &OrgChart,
) -> Result<(Vec<Campaign>, Vec<CampaignAssignment>), GenerationError> {
    let volumes = &context.config.volumes;
    let now = context.reference_now();
    let staff = compliance_staff(context, chart);
    let population = chart
        .all()
        .iter()
        .filter(|employee| employee.level != OrgLevel::Executive)
        .collect::<Vec<_>>();

    let mut campaigns = Vec::with_capacity(volumes.campaigns);
    let mut assignments = Vec::new();
    for position in 0..volumes.campaigns {
        let code = format!("CMP-{:03}", position + 1);
        let kind = CampaignKind::ALL[position % CampaignKind::ALL.len()];
        let days_ago = rng.range_inclusive(0, context.config.temporal.history_days);
        let launched_at = at_nine(context.temporal.current_date() - Duration::days(days_ago));
        let due_at = launched_at + Duration::days(CAMPAIGN_WINDOW_DAYS);
        let status = if due_at < now { CampaignStatus::Completed } else { CampaignStatus::Active };
        let campaign = Campaign {
            id: context.entity_id(EntityKind::Campaign, &code),
            name: format!("{} {}", title_case(kind.as_str()), launched_at.format("%Y-%m")),
            owner_id: pick_owner(rng, &staff, chart, "campaigns")?,
            code,
            kind,
            status,
            launched_at,
            due_at,
        };

        let assignees = population
            .choose_multiple(rng.rng_mut(), volumes.assignments_per_campaign)
            .collect::<Vec<_>>();
        for employee in assignees {
            let completion_share = if status == CampaignStatus::Completed { 0.85 } else { 0.5 };
            let (assignment_status, completed_at) = if rng.chance(completion_share) {
                let window = (due_at.min(now) - launched_at).num_hours().max(0);
                let completed_at = launched_at + Duration::hours(rng.range_inclusive(0, window));
                (AssignmentStatus::Completed, Some(completed_at))
            } else if due_at < now {
                (AssignmentStatus::Overdue, None)
            } else {
                (AssignmentStatus::Pending, None)
            };
            let natural = format!("{}:{}", campaign.code, employee.id);
            assignments.push(CampaignAssignment {
                id: context.entity_id(EntityKind::CampaignAssignment, &natural),
                campaign_id: campaign.id.clone(),
                campaign_code: campaign.code.clone(),
                employee_id: employee.id.clone(),
                status: assignment_status,
                completed_at,
            });
        }
        campaigns.push(campaign);
    }

    Ok((campaigns, assignments))
}

fn title_case(label: &str) -> String {
    label
        .split('_')
        .map(|word| {
            let lower = word.to_lowercase();
            let mut characters = lower.chars();
            match characters.next() {
                Some(first) => first.to_uppercase().chain(characters).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn generate_workflows(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    cases: &[Case],
) -> Vec<WorkflowInstance> {
    let rate = context.config.rates.workflow;
    let mut workflows = Vec::new();
    for case in cases {
        if !rng.chance(rate) {
            continue;
        }
        let template = match case.severity {
            Severity::High | Severity::Critical => "Escalated Investigation",
            Severity::Low | Severity::Medium => "Standard Triage",
        };
        let (status, current_step, completed_at) = match case.status {
            CaseStatus::Closed => (WorkflowStatus::Completed, WORKFLOW_STEPS[3], case.closed_at),
            CaseStatus::Open => {
                let step = WORKFLOW_STEPS[1 + rng.index(2)];
                (WorkflowStatus::Active, step, None)
            }
            CaseStatus::New => (WorkflowStatus::Active, WORKFLOW_STEPS[0], None),
        };
        let reference = format!("{}-WF", case.reference_number);
        workflows.push(WorkflowInstance {
            id: context.entity_id(EntityKind::WorkflowInstance, &reference),
            reference,
            case_id: case.id.clone(),
            template: template.to_string(),
            current_step: current_step.to_string(),
            status,
            started_at: case.created_at,
            completed_at,
        });
    }
    workflows
}

pub fn generate_notifications(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    cases: &[Case],
    investigations: &[Investigation],
) -> Vec<Notification> {
    let mut reassignments: HashMap<&CaseId, Vec<&Investigation>> = HashMap::new();
    for investigation in investigations.iter().filter(|item| item.reassignment.is_some()) {
        reassignments.entry(&investigation.case_id).or_default().push(investigation);
    }

    let rate = context.config.rates.notification;
    let mut notifications = Vec::new();
    for case in cases {
        let mut pending: Vec<(EmployeeId, NotificationKind, String, DateTime<Utc>)> = Vec::new();
        if rng.chance(rate) {
            if let Some(assignee) = &case.assignee_employee_id {
                pending.push((
                    assignee.clone(),
                    NotificationKind::CaseAssigned,
                    format!("{} assigned to you", case.reference_number),
                    case.created_at,
                ));
                if case.updated_at > case.due_at {
                    pending.push((
                        assignee.clone(),
                        NotificationKind::SlaBreached,
                        format!("{} is past its due date", case.reference_number),
                        case.due_at,
                    ));
                }
                if let Some(closed_at) = case.closed_at {
                    pending.push((
                        assignee.clone(),
                        NotificationKind::CaseClosed,
                        format!("{} was closed", case.reference_number),
                        closed_at,
                    ));
                }
            }
        }
        for investigation in reassignments.get(&case.id).into_iter().flatten() {
            if let Some(event) = &investigation.reassignment {
                pending.push((
                    event.to_employee_id.clone(),
                    NotificationKind::InvestigationReassigned,
                    format!("{} reassigned to you", investigation.reference_number),
                    event.occurred_at,
                ));
            }
        }

        for (position, (recipient_id, kind, title, created_at)) in pending.into_iter().enumerate() {
            let reference = format!("{}-N{}", case.reference_number, position + 1);
            notifications.push(Notification {
                id: context.entity_id(EntityKind::Notification, &reference),
                reference,
                recipient_id,
                case_id: Some(case.id.clone()),
                kind,
                title,
                read: rng.chance(NOTIFICATION_READ_SHARE),
                created_at: context.temporal.clamp_to_now(created_at),
            });
        }
    }
    notifications
}

struct ViewPreset {
    name: &'static str,
    entity: &'static str,
    personal: bool,
    filters: fn() -> Value,
}

const VIEW_PRESETS: &[ViewPreset] = &[
    ViewPreset {
        name: "My open cases",
        entity: "case",
        personal: true,
        filters: || json!({ "status": ["NEW", "OPEN"] }),
    },
    ViewPreset {
        name: "Urgent and high priority",
        entity: "case",
        personal: false,
        filters: || json!({ "priority": ["URGENT", "HIGH"], "status": ["OPEN"] }),
    },
    ViewPreset {
        name: "Anonymous hotline reports",
        entity: "intake_record",
        personal: false,
        filters: || json!({ "channel": ["HOTLINE"], "reporter_type": ["ANONYMOUS"] }),
    },
    ViewPreset {
        name: "Pending review",
        entity: "investigation",
        personal: true,
        filters: || json!({ "status": ["PENDING_REVIEW"] }),
    },
    ViewPreset {
        name: "Substantiated this year",
        entity: "investigation",
        personal: false,
        filters: || json!({ "outcome": ["SUBSTANTIATED"], "closed_within_days": 365 }),
    },
];

pub fn generate_saved_views(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    chart: &OrgChart,
) -> Result<Vec<SavedView>, GenerationError> {
    let staff = compliance_staff(context, chart);
    let mut views = Vec::with_capacity(context.config.volumes.saved_views);
    for position in 0..context.config.volumes.saved_views {
        let preset = &VIEW_PRESETS[position % VIEW_PRESETS.len()];
        let owner_id = pick_owner(rng, &staff, chart, "saved_views")?;
        let mut filters = (preset.filters)();
        if preset.personal {
            filters["assignee_id"] = Value::String(owner_id.0.clone());
        }
        let reference = format!("VIEW-{:03}", position + 1);
        views.push(SavedView {
            id: context.entity_id(EntityKind::SavedView, &reference),
            reference,
            owner_id,
            name: preset.name.to_string(),
            entity: preset.entity.to_string(),
            filters,
        });
    }
    Ok(views)
}

pub fn generate_ai_conversations(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    taxonomy: &Taxonomy,
    chart: &OrgChart,
    cases: &[Case],
) -> Result<Vec<AiConversation>, GenerationError> {
    if cases.is_empty() {
        return Err(GenerationError::missing("ai_conversations", "no committed cases"));
    }
    let staff = compliance_staff(context, chart);
    let mut conversations = Vec::with_capacity(context.config.volumes.ai_conversations);
    for position in 0..context.config.volumes.ai_conversations {
        let Some(case) = rng.pick(cases) else {
            break;
        };
        let owner_id = match &case.assignee_employee_id {
            Some(assignee) => assignee.clone(),
            None => pick_owner(rng, &staff, chart, "ai_conversations")?,
        };
        let mut template = Context::new();
        template.insert("case_reference", &case.reference_number);
        let category = taxonomy.get(&case.category_id);
        template.insert(
            "category",
            category.map_or("Uncategorized", |category| category.name.as_str()),
        );
        template.insert("priority", case.priority.as_str());
        template.insert("status", case.status.as_str());
        let answer = context.narratives.render(AI_EXCHANGE, rng, &template)?;

        let window = (case.updated_at - case.created_at).num_hours().max(0);
        let created_at = case.created_at + Duration::hours(rng.range_inclusive(0, window));
        let reference = format!("AI-{:04}", position + 1);
        conversations.push(AiConversation {
            id: context.entity_id(EntityKind::AiConversation, &reference),
            reference,
            case_id: case.id.clone(),
            owner_id,
            messages: vec![
                AiMessage {
                    role: "user".to_string(),
                    content: format!("Summarize {} and suggest next steps.", case.reference_number),
                },
                AiMessage { role: "assistant".to_string(), content: answer },
            ],
            created_at: context.temporal.clamp_to_now(created_at),
        });
    }
    Ok(conversations)
}

const REPORT_PRESETS: &[(&str, ReportKind, &str, &str)] = &[
    ("Cases by category", ReportKind::Breakdown, "case", "category"),
    ("Monthly intake volume", ReportKind::Trend, "intake_record", "month"),
    ("Open investigations", ReportKind::Table, "investigation", "status"),
    ("Substantiation by region", ReportKind::Breakdown, "investigation", "region"),
    ("Channel mix", ReportKind::Breakdown, "intake_record", "channel"),
    ("Cases past due", ReportKind::Table, "case", "due_at"),
];

pub fn generate_reports(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    chart: &OrgChart,
) -> Result<Vec<Report>, GenerationError> {
    let staff = compliance_staff(context, chart);
    let now = context.reference_now();
    let mut reports = Vec::with_capacity(context.config.volumes.reports);
    for position in 0..context.config.volumes.reports {
        let (name, kind, entity, dimension) = REPORT_PRESETS[position % REPORT_PRESETS.len()];
        let round = position / REPORT_PRESETS.len();
        let name = if round == 0 { name.to_string() } else { format!("{name} ({})", round + 1) };
        let owner_id = pick_owner(rng, &staff, chart, "reports")?;
        let last_run_at = rng
            .chance(REPORT_RUN_SHARE)
            .then(|| now - Duration::hours(rng.range_inclusive(1, 24 * 30)));
        let code = format!("RPT-{:02}", position + 1);
        reports.push(Report {
            id: context.entity_id(EntityKind::Report, &code),
            code,
            name,
            kind,
            owner_id,
            definition: json!({ "entity": entity, "dimension": dimension, "kind": kind.as_str() }),
            last_run_at,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{
        generate_ai_conversations, generate_campaigns, generate_notifications, generate_reports,
        generate_saved_views, generate_workflows, title_case,
    };
    use crate::config::GenerationConfig;
    use crate::domain::attachments::{AssignmentStatus, NotificationKind, WorkflowStatus};
    use crate::domain::case::CaseStatus;
    use crate::pipeline::test_support::Fixture;
    use crate::pipeline::Phase;

    fn fixture() -> Fixture {
        let mut config = GenerationConfig::default();
        config.volumes.intake_records = 600;
        config.volumes.employees = 150;
        Fixture::through_investigations(config)
    }

    #[test]
    fn campaigns_assign_distinct_employees() {
        let fixture = fixture();
        let mut rng = fixture.context.begin_phase(Phase::Campaigns);
        let (campaigns, assignments) =
            generate_campaigns(&fixture.context, &mut rng, &fixture.chart).expect("campaigns");

        assert_eq!(campaigns.len(), 6);
        assert_eq!(assignments.len(), 6 * 40);
        for campaign in &campaigns {
            let members = assignments
                .iter()
                .filter(|assignment| assignment.campaign_id == campaign.id)
                .map(|assignment| &assignment.employee_id)
                .collect::<HashSet<_>>();
            assert_eq!(members.len(), 40);
        }
        for assignment in &assignments {
            assert_eq!(
                assignment.completed_at.is_some(),
                assignment.status == AssignmentStatus::Completed
            );
        }
    }

    #[test]
    fn workflows_mirror_case_status() {
        let fixture = fixture();
        let cases = &fixture.cases.as_ref().expect("cases").cases;
        let mut rng = fixture.context.begin_phase(Phase::Workflows);
        let workflows = generate_workflows(&fixture.context, &mut rng, cases);

        assert!(!workflows.is_empty() && workflows.len() < cases.len());
        for workflow in &workflows {
            let case = cases.iter().find(|case| case.id == workflow.case_id).expect("case");
            assert_eq!(
                workflow.status == WorkflowStatus::Completed,
                case.status == CaseStatus::Closed
            );
            assert_eq!(workflow.reference, format!("{}-WF", case.reference_number));
        }
    }

    #[test]
    fn notifications_target_assignees_and_reassignment_targets() {
        let fixture = fixture();
        let cases = &fixture.cases.as_ref().expect("cases").cases;
        let mut rng = fixture.context.begin_phase(Phase::Notifications);
        let notifications =
            generate_notifications(&fixture.context, &mut rng, cases, &fixture.investigations);

        let now = fixture.context.reference_now();
        let references =
            notifications.iter().map(|item| item.reference.as_str()).collect::<HashSet<_>>();
        assert_eq!(references.len(), notifications.len());
        for notification in &notifications {
            assert!(notification.created_at <= now);
            if notification.kind == NotificationKind::CaseAssigned {
                let case = cases
                    .iter()
                    .find(|case| Some(&case.id) == notification.case_id.as_ref())
                    .expect("case");
                assert_eq!(case.assignee_employee_id.as_ref(), Some(&notification.recipient_id));
            }
        }
    }

    #[test]
    fn views_conversations_and_reports_use_configured_volumes() {
        let fixture = fixture();
        let cases = &fixture.cases.as_ref().expect("cases").cases;
        let context = &fixture.context;

        let mut rng = context.begin_phase(Phase::SavedViews);
        let views = generate_saved_views(context, &mut rng, &fixture.chart).expect("views");
        assert_eq!(views.len(), 20);
        assert!(views.iter().any(|view| view.filters.get("assignee_id").is_some()));

        let mut rng = context.begin_phase(Phase::AiConversations);
        let conversations =
            generate_ai_conversations(context, &mut rng, &fixture.taxonomy, &fixture.chart, cases)
                .expect("conversations");
        assert_eq!(conversations.len(), 60);
        assert!(conversations.iter().all(|conversation| conversation.messages.len() == 2));

        let mut rng = context.begin_phase(Phase::Reports);
        let reports = generate_reports(context, &mut rng, &fixture.chart).expect("reports");
        assert_eq!(reports.len(), 10);
        assert_eq!(reports[6].name, "Cases by category (2)");
    }

    #[test]
    fn labels_become_titles() {
        assert_eq!(title_case("CODE_OF_CONDUCT_ATTESTATION"), "Code Of Conduct Attestation");
    }
}
