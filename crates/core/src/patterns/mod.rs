//! Depletable pools of narrative patterns consulted by the case generator.
//!
//! Exhaustion is never an error: every `try_consume_*` returns `None` once a pool is spent and
//! the caller falls back to uniform selection.

pub mod flagship;

use serde::Serialize;

use crate::config::PatternConfig;
use crate::domain::employee::{OrgChart, OrgLevel};
use crate::domain::taxonomy::Taxonomy;
use crate::domain::{CategoryId, EmployeeId};
use crate::sampling::PhaseRng;

pub use flagship::{FlagshipCase, FlagshipInvestigation, FLAGSHIP_CASES};

#[derive(Clone, Debug, PartialEq)]
pub struct FlagshipSlot {
    pub payload: &'static FlagshipCase,
    pub category_id: CategoryId,
    pub consumed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepeatSubject {
    pub identity: EmployeeId,
    pub display_name: String,
    pub quota: u32,
    pub consumed: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HotspotManager {
    pub manager_id: EmployeeId,
    /// Root category the hotspot is known for; `None` matches any category.
    pub category_affinity: Option<CategoryId>,
    pub quota: u32,
    pub consumed: u32,
}

impl HotspotManager {
    fn accepts(&self, root_category: &CategoryId) -> bool {
        self.consumed < self.quota
            && self.category_affinity.as_ref().map_or(true, |affinity| affinity == root_category)
    }

    fn load(&self) -> f64 {
        f64::from(self.consumed) / f64::from(self.quota.max(1))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub flagships_total: usize,
    pub flagships_consumed: usize,
    pub repeat_subject_quota: u32,
    pub repeat_subject_consumed: u32,
    pub hotspot_quota: u32,
    pub hotspot_consumed: u32,
}

#[derive(Clone, Debug, Default)]
pub struct PatternInjector {
    flagships: Vec<FlagshipSlot>,
    next_flagship: usize,
    repeat_subjects: Vec<RepeatSubject>,
    hotspots: Vec<HotspotManager>,
    repeat_rate: f64,
}

impl PatternInjector {
    /// Builds the pools from the committed org chart and taxonomy. Flagships whose category
    /// code is absent from the taxonomy are left out.
    pub fn build(
        rng: &mut PhaseRng,
        chart: &OrgChart,
        taxonomy: &Taxonomy,
        config: &PatternConfig,
        repeat_rate: f64,
        investigator_department: &str,
        flagships: &'static [FlagshipCase],
    ) -> Self {
        let flagships = if config.flagships_enabled {
            flagships
                .iter()
                .filter_map(|payload| {
                    let Some(category) = taxonomy.by_code(payload.category_code) else {
                        tracing::warn!(
                            event_name = "dataset.flagship.skipped",
                            flagship = payload.key,
                            category_code = payload.category_code,
                            "flagship category missing from taxonomy"
                        );
                        return None;
                    };
                    Some(FlagshipSlot { payload, category_id: category.id.clone(), consumed: false })
                })
                .collect()
        } else {
            Vec::new()
        };

        let subject_candidates = chart
            .all()
            .iter()
            .filter(|employee| {
                matches!(employee.level, OrgLevel::Manager | OrgLevel::Contributor)
                    && employee.department != investigator_department
            })
            .collect::<Vec<_>>();
        let repeat_subjects = choose_distinct(rng, &subject_candidates, config.repeat_subjects)
            .into_iter()
            .map(|employee| RepeatSubject {
                identity: employee.id.clone(),
                display_name: employee.full_name(),
                quota: config.repeat_subject_quota,
                consumed: 0,
            })
            .collect();

        let manager_candidates = chart
            .at_level(OrgLevel::Manager)
            .filter(|manager| {
                manager.department != investigator_department
                    && !chart.direct_reports(&manager.id).is_empty()
            })
            .collect::<Vec<_>>();
        let roots = taxonomy.roots().map(|root| root.id.clone()).collect::<Vec<_>>();
        let hotspots = choose_distinct(rng, &manager_candidates, config.hotspot_managers)
            .into_iter()
            .map(|manager| {
                let category_affinity =
                    if rng.chance(0.75) { rng.pick(&roots).cloned() } else { None };
                HotspotManager {
                    manager_id: manager.id.clone(),
                    category_affinity,
                    quota: config.hotspot_quota,
                    consumed: 0,
                }
            })
            .collect();

        Self { flagships, next_flagship: 0, repeat_subjects, hotspots, repeat_rate }
    }

    pub fn flagship_count(&self) -> usize {
        self.flagships.len()
    }

    pub fn flagships(&self) -> &[FlagshipSlot] {
        &self.flagships
    }

    pub fn repeat_subjects(&self) -> &[RepeatSubject] {
        &self.repeat_subjects
    }

    pub fn hotspots(&self) -> &[HotspotManager] {
        &self.hotspots
    }

    /// Next unconsumed flagship in declaration order.
    pub fn try_consume_flagship(&mut self) -> Option<FlagshipSlot> {
        let slot = self.flagships.get_mut(self.next_flagship)?;
        slot.consumed = true;
        self.next_flagship += 1;
        Some(slot.clone())
    }

    /// With probability `repeat_rate`, hands out a non-exhausted repeat-subject identity.
    /// The chance is always drawn, even when every identity is spent.
    pub fn try_consume_repeat_subject(&mut self, rng: &mut PhaseRng) -> Option<EmployeeId> {
        if !rng.chance(self.repeat_rate) {
            return None;
        }
        let open = self
            .repeat_subjects
            .iter()
            .enumerate()
            .filter(|(_, subject)| subject.consumed < subject.quota)
            .map(|(position, _)| position)
            .collect::<Vec<_>>();
        let position = *rng.pick(&open)?;
        let subject = &mut self.repeat_subjects[position];
        subject.consumed += 1;
        Some(subject.identity.clone())
    }

    /// Least-loaded hotspot manager whose quota is open and whose affinity matches.
    pub fn try_consume_hotspot(&mut self, root_category: &CategoryId) -> Option<EmployeeId> {
        let mut best: Option<usize> = None;
        for (position, hotspot) in self.hotspots.iter().enumerate() {
            if !hotspot.accepts(root_category) {
                continue;
            }
            let better = match best {
                Some(current) => hotspot.load() < self.hotspots[current].load(),
                None => true,
            };
            if better {
                best = Some(position);
            }
        }

        let hotspot = &mut self.hotspots[best?];
        hotspot.consumed += 1;
        Some(hotspot.manager_id.clone())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            flagships_total: self.flagships.len(),
            flagships_consumed: self.flagships.iter().filter(|slot| slot.consumed).count(),
            repeat_subject_quota: self.repeat_subjects.iter().map(|subject| subject.quota).sum(),
            repeat_subject_consumed: self
                .repeat_subjects
                .iter()
                .map(|subject| subject.consumed)
                .sum(),
            hotspot_quota: self.hotspots.iter().map(|hotspot| hotspot.quota).sum(),
            hotspot_consumed: self.hotspots.iter().map(|hotspot| hotspot.consumed).sum(),
        }
    }
}

/// Partial Fisher-Yates over `candidates`, keeping at most `count` items.
fn choose_distinct<'a, T>(rng: &mut PhaseRng, candidates: &[&'a T], count: usize) -> Vec<&'a T> {
    let mut pool = candidates.to_vec();
    let take = count.min(pool.len());
    for position in 0..take {
        let swap = position + rng.index(pool.len() - position);
        pool.swap(position, swap);
    }
    pool.truncate(take);
    pool
}

#[cfg(test)]
mod tests {
    use super::{HotspotManager, PatternInjector, RepeatSubject, FLAGSHIP_CASES};
    use crate::config::PatternConfig;
    use crate::domain::employee::{Employee, OrgChart, OrgLevel};
    use crate::domain::taxonomy::{Category, Severity, Taxonomy};
    use crate::domain::{CategoryId, EmployeeId, LocationId};
    use crate::sampling::{PhaseRng, SeedDomain};

    fn employee(id: &str, manager: Option<&str>, level: OrgLevel, department: &str) -> Employee {
        Employee {
            id: EmployeeId(id.to_string()),
            employee_number: id.to_uppercase(),
            first_name: "Pat".to_string(),
            last_name: id.to_string(),
            email: format!("{id}@example.com"),
            job_title: "Title".to_string(),
            level,
            department: department.to_string(),
            manager_id: manager.map(|value| EmployeeId(value.to_string())),
            location_id: LocationId("loc".to_string()),
        }
    }

    fn chart() -> OrgChart {
        let mut employees = vec![
            employee("ceo", None, OrgLevel::Executive, "Executive Office"),
            employee("vp", Some("ceo"), OrgLevel::VicePresident, "Sales"),
            employee("dir", Some("vp"), OrgLevel::Director, "Sales"),
            employee("legal", Some("ceo"), OrgLevel::Manager, "Legal & Compliance"),
        ];
        for manager in 0..3 {
            let manager_id = format!("mgr{manager}");
            employees.push(employee(&manager_id, Some("dir"), OrgLevel::Manager, "Sales"));
            for report in 0..4 {
                let id = format!("ic{manager}{report}");
                employees.push(employee(&id, Some(&manager_id), OrgLevel::Contributor, "Sales"));
            }
        }
        OrgChart::new(employees).expect("valid chart")
    }

    fn taxonomy() -> Taxonomy {
        let category = |id: &str, parent: Option<&str>| Category {
            id: CategoryId(id.to_string()),
            code: id.to_string(),
            parent_id: parent.map(|value| CategoryId(value.to_string())),
            level: u8::from(parent.is_some()),
            path: id.to_string(),
            name: id.to_string(),
            severity_default: Severity::High,
            sla_days: 30,
            requires_investigation: true,
            anonymity_rate: 0.3,
            volume_weight: 1.0,
        };
        Taxonomy::new(vec![
            category("FIN", None),
            category("FIN-01", Some("FIN")),
            category("FIN-03", Some("FIN")),
            category("HR", None),
            category("HR-01", Some("HR")),
        ])
        .expect("valid taxonomy")
    }

    fn injector(config: &PatternConfig, repeat_rate: f64) -> PatternInjector {
        let mut rng = PhaseRng::from_seed(SeedDomain::Patterns, 4);
        PatternInjector::build(
            &mut rng,
            &chart(),
            &taxonomy(),
            config,
            repeat_rate,
            "Legal & Compliance",
            FLAGSHIP_CASES,
        )
    }

    #[test]
    fn flagships_follow_declaration_order_and_skip_unknown_categories() {
        let mut injector = injector(&PatternConfig::default(), 0.1);
        let expected = FLAGSHIP_CASES
            .iter()
            .filter(|flagship| matches!(flagship.category_code, "FIN-01" | "FIN-03" | "HR-01"))
            .map(|flagship| flagship.key)
            .collect::<Vec<_>>();

        let mut consumed = Vec::new();
        while let Some(slot) = injector.try_consume_flagship() {
            consumed.push(slot.payload.key);
        }
        assert_eq!(consumed, expected);
        assert_eq!(injector.stats().flagships_consumed, expected.len());
    }

    #[test]
    fn repeat_subjects_never_exceed_quota() {
        let config = PatternConfig { repeat_subjects: 2, repeat_subject_quota: 3, ..PatternConfig::default() };
        let mut injector = injector(&config, 1.0);
        let mut rng = PhaseRng::from_seed(SeedDomain::Cases, 8);

        let handed_out =
            (0..20).filter_map(|_| injector.try_consume_repeat_subject(&mut rng)).count();

        assert_eq!(handed_out, 6);
        assert!(injector.repeat_subjects().iter().all(|subject: &RepeatSubject| {
            subject.consumed <= subject.quota
        }));
        assert!(injector
            .repeat_subjects()
            .iter()
            .all(|subject| subject.identity.0 != "legal" && subject.identity.0 != "ceo"));
    }

    #[test]
    fn hotspots_respect_affinity_and_balance_load() {
        let config = PatternConfig { hotspot_managers: 3, hotspot_quota: 2, ..PatternConfig::default() };
        let mut injector = injector(&config, 0.0);
        let root = CategoryId("FIN".to_string());
        let eligible = injector
            .hotspots()
            .iter()
            .filter(|hotspot: &&HotspotManager| {
                hotspot.category_affinity.as_ref().map_or(true, |affinity| *affinity == root)
            })
            .count() as u32;

        let mut handed_out = 0;
        while injector.try_consume_hotspot(&root).is_some() {
            handed_out += 1;
            assert!(handed_out <= eligible * 2, "quota overrun");
        }

        assert_eq!(handed_out, eligible * 2);
        let stats = injector.stats();
        assert!(stats.hotspot_consumed <= stats.hotspot_quota);
        assert!(injector.hotspots().iter().all(|hotspot| hotspot.manager_id.0.starts_with("mgr")));
    }
}
