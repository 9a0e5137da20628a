//! Hand-authored storylines inserted verbatim into the case stream.

use crate::domain::case::{CaseStatus, Complexity, Priority};
use crate::domain::investigation::{InvestigationKind, InvestigationStatus, Outcome};
use crate::domain::taxonomy::Severity;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlagshipInvestigation {
    pub kind: InvestigationKind,
    pub status: InvestigationStatus,
    pub outcome: Option<Outcome>,
    pub findings: &'static str,
    pub root_cause: Option<&'static str>,
    pub lessons_learned: Option<&'static str>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlagshipCase {
    pub key: &'static str,
    pub title: &'static str,
    /// Child category code, e.g. `FIN-03`.
    pub category_code: &'static str,
    pub status: CaseStatus,
    pub priority: Priority,
    pub severity: Severity,
    pub complexity: Complexity,
    pub opened_days_ago: i64,
    /// Days from opening to closure for closed cases, or to the last update otherwise.
    pub duration_days: i64,
    pub summary: &'static str,
    pub investigations: &'static [FlagshipInvestigation],
}

const fn closed(
    kind: InvestigationKind,
    outcome: Outcome,
    findings: &'static str,
    root_cause: Option<&'static str>,
    lessons_learned: Option<&'static str>,
) -> FlagshipInvestigation {
    FlagshipInvestigation {
        kind,
        status: InvestigationStatus::Closed,
        outcome: Some(outcome),
        findings,
        root_cause,
        lessons_learned,
    }
}

const fn open(status: InvestigationStatus, findings: &'static str) -> FlagshipInvestigation {
    FlagshipInvestigation {
        kind: InvestigationKind::Primary,
        status,
        outcome: None,
        findings,
        root_cause: None,
        lessons_learned: None,
    }
}

pub const FLAGSHIP_CASES: &[FlagshipCase] = &[
    FlagshipCase {
        key: "procurement-kickback-ring",
        title: "Procurement kickback ring across regional facilities",
        category_code: "FIN-03",
        status: CaseStatus::Closed,
        priority: Priority::Urgent,
        severity: Severity::Critical,
        complexity: Complexity::Complex,
        opened_days_ago: 410,
        duration_days: 75,
        summary: "Three facilities routed maintenance contracts to a single vendor group that \
                  returned a share of each invoice to buyers through a consulting shell.",
        investigations: &[
            closed(
                InvestigationKind::Primary,
                Outcome::Substantiated,
                "Invoice sampling and bank records confirmed kickbacks on 42 purchase orders.",
                Some("Single-approver purchasing below the capital threshold"),
                Some("Require dual approval and vendor rotation for recurring maintenance spend"),
            ),
            closed(
                InvestigationKind::RegulatoryOverlay,
                Outcome::Substantiated,
                "Matter disclosed to the regulator; remediation plan accepted without penalty.",
                Some("Books-and-records controls did not flag split invoices"),
                Some("Add split-invoice detection to the quarterly controls test"),
            ),
        ],
    },
    FlagshipCase {
        key: "finance-director-expenses",
        title: "Regional finance director expense claims",
        category_code: "FIN-01",
        status: CaseStatus::Closed,
        priority: Priority::High,
        severity: Severity::High,
        complexity: Complexity::Medium,
        opened_days_ago: 200,
        duration_days: 18,
        summary: "Personal travel booked as client visits over eleven months, approved by a \
                  direct report.",
        investigations: &[closed(
            InvestigationKind::Primary,
            Outcome::Substantiated,
            "Travel itineraries matched no client meetings on 17 of 23 claims.",
            Some("Expense approval delegated downward in the reporting chain"),
            Some("Block approvals by subordinates of the claimant"),
        )],
    },
    FlagshipCase {
        key: "warehouse-forklift-safety",
        title: "Disabled forklift proximity alarms at distribution center",
        category_code: "SAF-01",
        status: CaseStatus::Closed,
        priority: Priority::Urgent,
        severity: Severity::Critical,
        complexity: Complexity::Simple,
        opened_days_ago: 95,
        duration_days: 4,
        summary: "Night shift reported alarms taped over to meet pick-rate targets.",
        investigations: &[closed(
            InvestigationKind::Primary,
            Outcome::Substantiated,
            "Site walk found six of nine units with disabled alarms.",
            Some("Productivity incentives outweighed safety checks on night shift"),
            Some("Tie shift incentives to safety audit results"),
        )],
    },
    FlagshipCase {
        key: "whistleblower-retaliation",
        title: "Retaliation claim after internal audit cooperation",
        category_code: "HR-03",
        status: CaseStatus::Closed,
        priority: Priority::High,
        severity: Severity::High,
        complexity: Complexity::Complex,
        opened_days_ago: 330,
        duration_days: 60,
        summary: "Analyst reported a downgraded review after cooperating with an audit.",
        investigations: &[closed(
            InvestigationKind::Primary,
            Outcome::Unsubstantiated,
            "Review calibration predated the audit and matched peer ratings.",
            None,
            None,
        )],
    },
    FlagshipCase {
        key: "customer-data-export",
        title: "Customer records exported to personal storage",
        category_code: "DAT-01",
        status: CaseStatus::Open,
        priority: Priority::Urgent,
        severity: Severity::Critical,
        complexity: Complexity::Complex,
        opened_days_ago: 40,
        duration_days: 12,
        summary: "DLP alert on a bulk export of customer contact data by a departing employee.",
        investigations: &[open(
            InvestigationStatus::Investigating,
            "Forensic image collected; export scope still being reconciled.",
        )],
    },
    FlagshipCase {
        key: "customs-official-gifts",
        title: "Gifts to customs officials by freight agent",
        category_code: "ABC-02",
        status: CaseStatus::Open,
        priority: Priority::High,
        severity: Severity::Critical,
        complexity: Complexity::Complex,
        opened_days_ago: 25,
        duration_days: 9,
        summary: "Freight forwarder invoices include recurring 'expedite' fees with no receipts.",
        investigations: &[open(
            InvestigationStatus::PendingReview,
            "Draft report with outside counsel for privilege review.",
        )],
    },
    FlagshipCase {
        key: "undisclosed-vendor-relationship",
        title: "Hiring manager related to staffing vendor owner",
        category_code: "COI-01",
        status: CaseStatus::Closed,
        priority: Priority::Medium,
        severity: Severity::Medium,
        complexity: Complexity::Medium,
        opened_days_ago: 150,
        duration_days: 14,
        summary: "Staffing vendor selected without competitive bid by a relative of its owner.",
        investigations: &[closed(
            InvestigationKind::Primary,
            Outcome::Inconclusive,
            "Relationship confirmed but selection pre-dated the manager's involvement.",
            None,
            None,
        )],
    },
    FlagshipCase {
        key: "sales-director-harassment",
        title: "Pattern of harassment complaints against sales director",
        category_code: "HR-01",
        status: CaseStatus::Closed,
        priority: Priority::Urgent,
        severity: Severity::High,
        complexity: Complexity::Complex,
        opened_days_ago: 520,
        duration_days: 45,
        summary: "Four reports over two quarters describing comments at offsite events.",
        investigations: &[closed(
            InvestigationKind::Primary,
            Outcome::Substantiated,
            "Witness interviews corroborated three of four reports.",
            Some("Offsite conduct excluded from manager training"),
            Some("Extend conduct training and chaperone policy to offsite events"),
        )],
    },
];
