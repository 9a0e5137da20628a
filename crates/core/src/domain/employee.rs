use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{labeled_enum, EmployeeId, LocationId, NaturalKey};
use crate::errors::DomainError;

labeled_enum! {
    pub enum OrgLevel {
        Executive => "EXECUTIVE",
        VicePresident => "VICE_PRESIDENT",
        Director => "DIRECTOR",
        Manager => "MANAGER",
        Contributor => "CONTRIBUTOR",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_title: String,
    pub level: OrgLevel,
    pub department: String,
    pub manager_id: Option<EmployeeId>,
    pub location_id: LocationId,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl NaturalKey for Employee {
    fn natural_key(&self) -> String {
        self.employee_number.clone()
    }
}

/// Reporting tree rooted at a single executive.
#[derive(Clone, Debug)]
pub struct OrgChart {
    employees: Vec<Employee>,
    index: HashMap<EmployeeId, usize>,
    reports: HashMap<EmployeeId, Vec<usize>>,
}

impl OrgChart {
    /// Validates that there is exactly one root and that every manager reference points at
    /// an employee earlier in the list.
    pub fn new(employees: Vec<Employee>) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(employees.len());
        let mut reports: HashMap<EmployeeId, Vec<usize>> = HashMap::new();
        let mut roots = 0usize;

        for (position, employee) in employees.iter().enumerate() {
            match &employee.manager_id {
                None => roots += 1,
                Some(manager_id) => {
                    if !index.contains_key(manager_id) {
                        return Err(DomainError::InvariantViolation(format!(
                            "employee {} references manager {} that is not defined earlier",
                            employee.employee_number, manager_id
                        )));
                    }
                    reports.entry(manager_id.clone()).or_default().push(position);
                }
            }
            index.insert(employee.id.clone(), position);
        }

        if !employees.is_empty() && roots != 1 {
            return Err(DomainError::InvariantViolation(format!(
                "org hierarchy must have exactly one root, found {roots}"
            )));
        }

        Ok(Self { employees, index, reports })
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    pub fn all(&self) -> &[Employee] {
        &self.employees
    }

    pub fn root(&self) -> Option<&Employee> {
        self.employees.iter().find(|employee| employee.manager_id.is_none())
    }

    pub fn get(&self, id: &EmployeeId) -> Option<&Employee> {
        self.index.get(id).map(|position| &self.employees[*position])
    }

    pub fn at_level(&self, level: OrgLevel) -> impl Iterator<Item = &Employee> {
        self.employees.iter().filter(move |employee| employee.level == level)
    }

    pub fn in_department<'a>(&'a self, department: &'a str) -> impl Iterator<Item = &'a Employee> {
        self.employees.iter().filter(move |employee| employee.department == department)
    }

    pub fn direct_reports(&self, manager_id: &EmployeeId) -> Vec<&Employee> {
        self.reports
            .get(manager_id)
            .map(|positions| positions.iter().map(|position| &self.employees[*position]).collect())
            .unwrap_or_default()
    }

    /// Direct-report counts derived from manager references.
    pub fn direct_report_counts(&self) -> HashMap<EmployeeId, usize> {
        self.reports.iter().map(|(manager, positions)| (manager.clone(), positions.len())).collect()
    }

    /// Everyone below the given manager, breadth first.
    pub fn subtree(&self, manager_id: &EmployeeId) -> Vec<&Employee> {
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        let mut frontier = vec![manager_id.clone()];

        while let Some(current) = frontier.pop() {
            for report in self.direct_reports(&current) {
                if seen.insert(report.id.clone()) {
                    members.push(report);
                    frontier.push(report.id.clone());
                }
            }
        }

        members
    }

    /// Length of the reporting chain from the employee up to the root.
    pub fn depth_of(&self, id: &EmployeeId) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.get(id)?;
        while let Some(manager_id) = &current.manager_id {
            current = self.get(manager_id)?;
            depth += 1;
        }
        Some(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::{Employee, EmployeeId, LocationId, OrgChart, OrgLevel};

    fn employee(id: &str, manager: Option<&str>, level: OrgLevel) -> Employee {
        Employee {
            id: EmployeeId(id.to_string()),
            employee_number: id.to_uppercase(),
            first_name: "Test".to_string(),
            last_name: id.to_string(),
            email: format!("{id}@example.com"),
            job_title: "Title".to_string(),
            level,
            department: "Finance".to_string(),
            manager_id: manager.map(|m| EmployeeId(m.to_string())),
            location_id: LocationId("loc".to_string()),
        }
    }

    #[test]
    fn derives_reports_and_subtrees() {
        let chart = OrgChart::new(vec![
            employee("ceo", None, OrgLevel::Executive),
            employee("vp", Some("ceo"), OrgLevel::VicePresident),
            employee("mgr", Some("vp"), OrgLevel::Manager),
            employee("ic1", Some("mgr"), OrgLevel::Contributor),
            employee("ic2", Some("mgr"), OrgLevel::Contributor),
        ])
        .expect("valid chart");

        let mgr = EmployeeId("mgr".to_string());
        assert_eq!(chart.direct_reports(&mgr).len(), 2);
        assert_eq!(chart.direct_report_counts().get(&mgr), Some(&2));
        assert_eq!(chart.subtree(&EmployeeId("vp".to_string())).len(), 3);
        assert_eq!(chart.depth_of(&EmployeeId("ic2".to_string())), Some(3));
        assert_eq!(chart.root().map(|root| root.id.0.as_str()), Some("ceo"));
    }

    #[test]
    fn rejects_forward_manager_reference() {
        let error = OrgChart::new(vec![
            employee("ceo", None, OrgLevel::Executive),
            employee("ic", Some("mgr"), OrgLevel::Contributor),
            employee("mgr", Some("ceo"), OrgLevel::Manager),
        ])
        .expect_err("forward reference should fail");

        assert!(error.to_string().contains("not defined earlier"));
    }

    #[test]
    fn rejects_multiple_roots() {
        let error = OrgChart::new(vec![
            employee("ceo", None, OrgLevel::Executive),
            employee("other", None, OrgLevel::Executive),
        ])
        .expect_err("two roots should fail");

        assert!(error.to_string().contains("exactly one root"));
    }
}
