use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::location::Region;
use crate::domain::taxonomy::Severity;

/// Root category plus the child names generated beneath it. Children inherit everything
/// except their name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootCategorySpec {
    pub code: String,
    pub name: String,
    pub severity: Severity,
    pub sla_days: u32,
    pub requires_investigation: bool,
    pub anonymity_rate: f64,
    pub volume_weight: f64,
    pub children: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSpec {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub region: Region,
    pub utc_offset_minutes: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub categories: Vec<RootCategorySpec>,
    pub locations: Vec<LocationSpec>,
    /// Departments headed by a vice president; the executive office sits above them.
    pub departments: Vec<String>,
    pub executive_department: String,
    /// Department whose staff are assigned cases and investigations.
    pub investigator_department: String,
}

#[allow(clippy::too_many_arguments)]
fn root(
    code: &str,
    name: &str,
    severity: Severity,
    sla_days: u32,
    requires_investigation: bool,
    anonymity_rate: f64,
    volume_weight: f64,
    children: [&str; 4],
) -> RootCategorySpec {
    RootCategorySpec {
        code: code.to_string(),
        name: name.to_string(),
        severity,
        sla_days,
        requires_investigation,
        anonymity_rate,
        volume_weight,
        children: children.iter().map(|child| child.to_string()).collect(),
    }
}

fn location(
    code: &str,
    name: &str,
    city: &str,
    country: &str,
    region: Region,
    utc_offset_minutes: i32,
) -> LocationSpec {
    LocationSpec {
        code: code.to_string(),
        name: name.to_string(),
        city: city.to_string(),
        country: country.to_string(),
        region,
        utc_offset_minutes,
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            categories: vec![
                root(
                    "FIN",
                    "Financial Integrity",
                    Severity::High,
                    45,
                    true,
                    0.45,
                    18.0,
                    [
                        "Expense Reimbursement Fraud",
                        "Accounting Irregularities",
                        "Vendor Kickbacks",
                        "Misuse of Company Assets",
                    ],
                ),
                root(
                    "HR",
                    "Workplace Conduct",
                    Severity::High,
                    30,
                    true,
                    0.35,
                    26.0,
                    ["Harassment", "Discrimination", "Retaliation", "Bullying and Intimidation"],
                ),
                root(
                    "COI",
                    "Conflicts of Interest",
                    Severity::Medium,
                    30,
                    true,
                    0.30,
                    12.0,
                    [
                        "Undisclosed Relationships",
                        "Outside Employment",
                        "Gifts and Entertainment",
                        "Related-Party Transactions",
                    ],
                ),
                root(
                    "SAF",
                    "Health and Safety",
                    Severity::Critical,
                    14,
                    true,
                    0.25,
                    12.0,
                    [
                        "Unsafe Working Conditions",
                        "Unreported Injury",
                        "Environmental Release",
                        "Substance Abuse",
                    ],
                ),
                root(
                    "DAT",
                    "Data Privacy and Security",
                    Severity::High,
                    21,
                    true,
                    0.20,
                    10.0,
                    [
                        "Data Breach",
                        "Improper Access",
                        "Records Retention",
                        "Third-Party Data Sharing",
                    ],
                ),
                root(
                    "ABC",
                    "Anti-Bribery and Corruption",
                    Severity::Critical,
                    60,
                    true,
                    0.50,
                    8.0,
                    [
                        "Facilitation Payments",
                        "Gifts to Government Officials",
                        "Third-Party Intermediaries",
                        "Sanctions and Export Controls",
                    ],
                ),
                root(
                    "POL",
                    "Policy and General Inquiry",
                    Severity::Low,
                    10,
                    false,
                    0.15,
                    14.0,
                    ["Policy Clarification", "Process Improvement", "Benefits Question", "Other"],
                ),
            ],
            locations: vec![
                location("NYC", "New York Headquarters", "New York", "US", Region::NorthAmerica, -300),
                location("CHI", "Chicago Operations", "Chicago", "US", Region::NorthAmerica, -360),
                location("LAX", "Los Angeles Office", "Los Angeles", "US", Region::NorthAmerica, -480),
                location("TOR", "Toronto Office", "Toronto", "CA", Region::NorthAmerica, -300),
                location("MEX", "Mexico City Plant", "Mexico City", "MX", Region::Latam, -360),
                location("SAO", "Sao Paulo Office", "Sao Paulo", "BR", Region::Latam, -180),
                location("LON", "London Office", "London", "GB", Region::Emea, 0),
                location("FRA", "Frankfurt Office", "Frankfurt", "DE", Region::Emea, 60),
                location("DXB", "Dubai Office", "Dubai", "AE", Region::Emea, 240),
                location("SIN", "Singapore Hub", "Singapore", "SG", Region::Apac, 480),
                location("TYO", "Tokyo Office", "Tokyo", "JP", Region::Apac, 540),
                location("SYD", "Sydney Office", "Sydney", "AU", Region::Apac, 600),
            ],
            departments: [
                "Finance",
                "Human Resources",
                "Legal & Compliance",
                "Operations",
                "Sales",
                "Engineering",
                "Information Security",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            executive_department: "Executive Office".to_string(),
            investigator_department: "Legal & Compliance".to_string(),
        }
    }
}

impl ReferenceData {
    pub fn category_count(&self) -> usize {
        self.categories.iter().map(|root| 1 + root.children.len()).sum()
    }

    /// Executive, one VP and two directors per department, and two managers per director.
    pub fn minimum_org_size(&self) -> usize {
        1 + self.departments.len() * (1 + 2 + 4)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::Validation(
                "reference.categories must define at least one root".to_string(),
            ));
        }

        let mut codes = HashSet::new();
        for root in &self.categories {
            if root.code.trim().is_empty() || !codes.insert(root.code.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "reference.categories code `{}` is empty or duplicated",
                    root.code
                )));
            }
            if root.children.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "reference.categories `{}` must define at least one child",
                    root.code
                )));
            }
            if !(0.0..=1.0).contains(&root.anonymity_rate) {
                return Err(ConfigError::Validation(format!(
                    "reference.categories `{}` anonymity_rate must be in range 0..=1",
                    root.code
                )));
            }
            if !root.volume_weight.is_finite() || root.volume_weight < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "reference.categories `{}` volume_weight must be finite and non-negative",
                    root.code
                )));
            }
            if root.sla_days == 0 {
                return Err(ConfigError::Validation(format!(
                    "reference.categories `{}` sla_days must be greater than zero",
                    root.code
                )));
            }
        }

        let mut location_codes = HashSet::new();
        for location in &self.locations {
            if !location_codes.insert(location.code.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "reference.locations code `{}` is duplicated",
                    location.code
                )));
            }
            if location.utc_offset_minutes.abs() > 14 * 60 {
                return Err(ConfigError::Validation(format!(
                    "reference.locations `{}` utc_offset_minutes is outside +/-14h",
                    location.code
                )));
            }
        }

        if !self.departments.iter().any(|department| department == &self.investigator_department) {
            return Err(ConfigError::Validation(format!(
                "reference.investigator_department `{}` is not one of reference.departments",
                self.investigator_department
            )));
        }

        Ok(())
    }
}
