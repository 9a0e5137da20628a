use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;

use crate::domain::employee::{Employee, OrgLevel};
use crate::domain::location::Location;
use crate::domain::{EmployeeId, EntityKind, LocationId};
use crate::errors::GenerationError;
use crate::pipeline::GenerationContext;
use crate::sampling::PhaseRng;

const DIRECTORS_PER_VP: usize = 2;
const BASE_MANAGERS_PER_DIRECTOR: usize = 2;
/// Spare head-count needed before a director is given a third manager.
const SPARE_PER_EXTRA_MANAGER: usize = 10;
const CONTRIBUTOR_HOME_SHARE: f64 = 0.8;
const CONTRIBUTOR_TITLES: &[&str] = &["Analyst", "Specialist", "Associate", "Senior Associate"];

struct OrgBuilder<'a> {
    context: &'a GenerationContext,
    locations: &'a [Location],
    employees: Vec<Employee>,
}

impl OrgBuilder<'_> {
    fn hire(
        &mut self,
        rng: &mut PhaseRng,
        level: OrgLevel,
        department: &str,
        job_title: String,
        manager: Option<(EmployeeId, LocationId)>,
    ) -> Result<(EmployeeId, LocationId), GenerationError> {
        let number = format!("E{:05}", self.employees.len() + 1);
        let first_name: String = FirstName().fake_with_rng(rng.rng_mut());
        let last_name: String = LastName().fake_with_rng(rng.rng_mut());

        let location_id = match (&manager, level) {
            (Some((_, home)), OrgLevel::Contributor) if rng.chance(CONTRIBUTOR_HOME_SHARE) => {
                home.clone()
            }
            _ if self.employees.is_empty() => self.first_location()?.id.clone(),
            _ => rng
                .pick(self.locations)
                .map(|location| location.id.clone())
                .ok_or_else(|| GenerationError::missing("organization", "no committed locations"))?,
        };

        let id = EmployeeId(self.context.entity_id(EntityKind::Employee, &number));
        self.employees.push(Employee {
            id: id.clone(),
            email: email_for(&first_name, &last_name, &number, &self.context.organization.slug),
            employee_number: number,
            first_name,
            last_name,
            job_title,
            level,
            department: department.to_string(),
            manager_id: manager.map(|(manager_id, _)| manager_id),
            location_id: location_id.clone(),
        });
        Ok((id, location_id))
    }

    fn first_location(&self) -> Result<&Location, GenerationError> {
        self.locations
            .first()
            .ok_or_else(|| GenerationError::missing("organization", "no committed locations"))
    }
}

fn email_for(first_name: &str, last_name: &str, number: &str, slug: &str) -> String {
    let local = format!("{first_name}.{last_name}.{number}")
        .chars()
        .filter(|character| character.is_ascii_alphanumeric() || *character == '.')
        .collect::<String>();
    format!("{local}@{slug}.example.com").to_lowercase()
}

/// Executive -> VP -> director -> manager -> contributor tree sized to the configured head
/// count. Managers always precede their reports.
pub fn generate_employees(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    locations: &[Location],
) -> Result<Vec<Employee>, GenerationError> {
    let reference = &context.config.reference;
    let budget = context.config.volumes.employees.max(reference.minimum_org_size());
    let mut builder =
        OrgBuilder { context, locations, employees: Vec::with_capacity(budget) };

    let executive = builder.hire(
        rng,
        OrgLevel::Executive,
        &reference.executive_department,
        "Chief Executive Officer".to_string(),
        None,
    )?;

    let mut directors = Vec::new();
    for department in &reference.departments {
        let vp = builder.hire(
            rng,
            OrgLevel::VicePresident,
            department,
            format!("Vice President, {department}"),
            Some(executive.clone()),
        )?;
        for _ in 0..DIRECTORS_PER_VP {
            let director = builder.hire(
                rng,
                OrgLevel::Director,
                department,
                format!("Director, {department}"),
                Some(vp.clone()),
            )?;
            directors.push((department.clone(), director));
        }
    }

    let mut spare = budget - reference.minimum_org_size();
    let mut managers = Vec::new();
    for (department, director) in &directors {
        let mut count = BASE_MANAGERS_PER_DIRECTOR;
        if spare >= SPARE_PER_EXTRA_MANAGER && rng.chance(0.5) {
            count += 1;
            spare -= 1;
        }
        for _ in 0..count {
            let manager = builder.hire(
                rng,
                OrgLevel::Manager,
                department,
                format!("{department} Manager"),
                Some(director.clone()),
            )?;
            managers.push((department.clone(), manager));
        }
    }

    if managers.is_empty() {
        return Ok(builder.employees);
    }
    let contributors = budget.saturating_sub(builder.employees.len());
    for position in 0..contributors {
        let (department, manager) = &managers[position % managers.len()];
        let title = rng.pick(CONTRIBUTOR_TITLES).copied().unwrap_or("Associate");
        builder.hire(
            rng,
            OrgLevel::Contributor,
            department,
            format!("{department} {title}"),
            Some(manager.clone()),
        )?;
    }

    Ok(builder.employees)
}
