use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use fake::faker::name::en::Name;
use fake::Fake;
use tera::Context;

use super::cases::{flagship_intake_positions, flagship_opened_at};
use super::narrative::{CORROBORATING_NARRATIVE, INTAKE_NARRATIVE, INTAKE_SUMMARY};
use crate::domain::intake::{IntakeRecord, ReporterType};
use crate::domain::location::Location;
use crate::domain::taxonomy::{Category, Taxonomy};
use crate::domain::{CategoryId, EntityKind, IntakeRecordId};
use crate::errors::GenerationError;
use crate::patterns::FlagshipSlot;
use crate::pipeline::GenerationContext;
use crate::sampling::{Distribution, PhaseRng};

const CLUSTER_SIZE_MIN: i64 = 2;
const CLUSTER_SIZE_MAX: i64 = 4;
const CLUSTER_WINDOW_DAYS: i64 = 2;

/// Follower slots still owed to the incident cluster currently being written.
struct OpenCluster<'a> {
    group: String,
    remaining: usize,
    category: &'a Category,
    location: &'a Location,
    anchor: DateTime<Utc>,
}

pub fn generate_intake_records(
    context: &GenerationContext,
    rng: &mut PhaseRng,
    taxonomy: &Taxonomy,
    locations: &[Location],
) -> Result<Vec<IntakeRecord>, GenerationError> {
    let target = context.config.volumes.intake_records;
    let roots = Distribution::new(
        "root_category_volume",
        taxonomy.roots().map(|root| (root.id.clone(), root.volume_weight)),
    )?;
    // Mean cluster size is three, so starting clusters at a third of the rate puts roughly
    // `incident_cluster` of all records inside one.
    let cluster_start = context.config.rates.incident_cluster / 3.0;

    let window_floor = context.temporal.window_floor();
    let lag = &context.config.case_timing.intake_lag_hours;

    // Flagship cases open on the record written at their reserved position.
    let flagships = flagship_intake_positions(context, context.patterns.flagship_count(), target)
        .into_iter()
        .zip(context.patterns.flagships())
        .collect::<HashMap<usize, &FlagshipSlot>>();
    // Followers never take a slot pinned to an edge date or reserved for a flagship.
    let clusterable = |slot: usize| {
        slot < target
            && context.temporal.boundary_date_for(slot).is_none()
            && !flagships.contains_key(&slot)
    };

    let mut records = Vec::with_capacity(target);
    let mut cluster: Option<OpenCluster<'_>> = None;

    for index in 0..target {
        let reference_number = format!("RIU-{:06}", index + 1);
        let flagship = flagships.get(&index).copied();

        let follower = match cluster.as_mut() {
            Some(open) if open.remaining > 0 => {
                open.remaining -= 1;
                let shift = rng.range_inclusive(-CLUSTER_WINDOW_DAYS, CLUSTER_WINDOW_DAYS);
                let created_at = (open.anchor + Duration::days(shift)).max(window_floor);
                Some((
                    open.category,
                    open.location,
                    context.temporal.clamp_to_now(created_at),
                    Some(open.group.clone()),
                    false,
                ))
            }
            _ => None,
        };

        let row = match (follower, flagship) {
            (Some(follower), _) => follower,
            (None, Some(flagship)) => {
                cluster = None;
                let category = taxonomy.get(&flagship.category_id).ok_or_else(|| {
                    GenerationError::missing("intake_records", "flagship category vanished")
                })?;
                let location = rng.pick(locations).ok_or_else(|| {
                    GenerationError::missing("intake_records", "no committed locations")
                })?;
                let hours = rng.range_inclusive(lag.min.max(1), lag.max.max(1));
                let reported_at =
                    flagship_opened_at(context, flagship.payload) - Duration::hours(hours);
                (category, location, reported_at.max(window_floor), None, false)
            }
            (None, None) => {
                let category = pick_category(rng, taxonomy, &roots)?;
                let location = rng.pick(locations).ok_or_else(|| {
                    GenerationError::missing("intake_records", "no committed locations")
                })?;
                let date = context.temporal.historical_date_for(rng, index);
                let local_time = context.temporal.business_time(rng);
                let created_at = context.temporal.adjust_for_region(
                    date,
                    local_time,
                    location.utc_offset_minutes,
                );

                let followers = if rng.chance(cluster_start) {
                    let size = rng.range_inclusive(CLUSTER_SIZE_MIN, CLUSTER_SIZE_MAX);
                    let wanted = usize::try_from(size - 1).unwrap_or(0);
                    (index + 1..=index + wanted).take_while(|slot| clusterable(*slot)).count()
                } else {
                    0
                };
                if followers > 0 {
                    let group = format!("INC-{:06}", index + 1);
                    cluster = Some(OpenCluster {
                        group: group.clone(),
                        remaining: followers,
                        category,
                        location,
                        anchor: created_at,
                    });
                    (category, location, created_at, Some(group), true)
                } else {
                    cluster = None;
                    (category, location, created_at, None, false)
                }
            }
        };
        let (category, location, created_at, incident_group, is_group_primary) = row;

        let channel = *rng.sample(&context.distributions.channel);
        let intake_type = *rng.sample(&context.distributions.intake_type);
        let sampled_severity = if rng.chance(context.config.rates.severity_from_category) {
            category.severity_default
        } else {
            *rng.sample(&context.distributions.severity)
        };
        let severity = flagship.map_or(sampled_severity, |slot| slot.payload.severity);
        let reporter_type = if rng.chance(category.anonymity_rate) {
            ReporterType::Anonymous
        } else {
            *rng.sample(&context.distributions.anonymity)
        };
        let reporter_name = match reporter_type {
            ReporterType::Anonymous => None,
            _ => Some(Name().fake_with_rng::<String, _>(rng.rng_mut())),
        };

        let root = taxonomy.root_of(&category.id).unwrap_or(category);
        let mut template = Context::new();
        template.insert("category", &category.name);
        template.insert("root_category", &root.name);
        template.insert("location", &location.name);
        template.insert("city", &location.city);
        template.insert("channel_label", channel.as_str());
        template.insert(
            "reporter",
            match (reporter_type, reporter_name.as_deref()) {
                (ReporterType::Identified, Some(name)) => name,
                (ReporterType::Confidential, _) => "A confidential reporter",
                _ => "An anonymous reporter",
            },
        );
        let summary = context.narratives.render(INTAKE_SUMMARY, rng, &template)?;
        let narrative_kind = if incident_group.is_some() && !is_group_primary {
            CORROBORATING_NARRATIVE
        } else {
            INTAKE_NARRATIVE
        };
        let narrative = context.narratives.render(narrative_kind, rng, &template)?;

        records.push(IntakeRecord {
            id: IntakeRecordId(context.entity_id(EntityKind::IntakeRecord, &reference_number)),
            reference_number,
            intake_type,
            channel,
            severity,
            reporter_type,
            reporter_name,
            category_id: category.id.clone(),
            location_id: location.id.clone(),
            incident_group,
            is_group_primary,
            summary,
            narrative,
            created_at,
        });
    }

    Ok(records)
}

/// Root by volume weight, then a uniform child of that root (or the root itself when it
/// has none).
fn pick_category<'a>(
    rng: &mut PhaseRng,
    taxonomy: &'a Taxonomy,
    roots: &Distribution<CategoryId>,
) -> Result<&'a Category, GenerationError> {
    let root_id = rng.sample(roots);
    let root = taxonomy
        .get(root_id)
        .ok_or_else(|| GenerationError::missing("intake_records", "root category vanished"))?;
    let children = taxonomy.children_of(&root.id).collect::<Vec<_>>();
    Ok(rng.pick(&children).copied().unwrap_or(root))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

    use chrono::Duration;

    use crate::config::GenerationConfig;
    use crate::domain::intake::ReporterType;
    use crate::generators::cases::{flagship_intake_positions, flagship_opened_at};
    use crate::pipeline::test_support::Fixture;

    fn config(records: usize) -> GenerationConfig {
        let mut config = GenerationConfig::default();
        config.volumes.intake_records = records;
        config
    }

    #[test]
    fn produces_exact_count_with_sequential_references() {
        let fixture = Fixture::through_intake(config(600));

        assert_eq!(fixture.intake.len(), 600);
        assert_eq!(fixture.intake[0].reference_number, "RIU-000001");
        assert_eq!(fixture.intake[599].reference_number, "RIU-000600");
        let now = fixture.context.reference_now();
        let start = fixture.context.temporal.window_start();
        for record in &fixture.intake {
            assert!(record.created_at <= now, "{} is in the future", record.reference_number);
            assert!(record.created_at.date_naive() >= start - Duration::days(1));
            let category = fixture.taxonomy.get(&record.category_id).expect("category");
            assert_eq!(category.level, 1);
            assert_eq!(
                record.reporter_name.is_none(),
                record.reporter_type == ReporterType::Anonymous
            );
        }
    }

    #[test]
    fn incident_clusters_share_category_location_and_window() {
        let mut config = config(2000);
        config.rates.incident_cluster = 0.3;
        let fixture = Fixture::through_intake(config);

        let mut groups: BTreeMap<&str, Vec<_>> = BTreeMap::new();
        for record in &fixture.intake {
            if let Some(group) = record.incident_group.as_deref() {
                groups.entry(group).or_default().push(record);
            }
        }
        assert!(!groups.is_empty());

        for (group, members) in groups {
            assert!((2..=4).contains(&members.len()), "{group} has {} members", members.len());
            assert!(members[0].is_group_primary);
            assert!(members[1..].iter().all(|member| !member.is_group_primary));
            let categories = members.iter().map(|member| &member.category_id).collect::<HashSet<_>>();
            let locations = members.iter().map(|member| &member.location_id).collect::<HashSet<_>>();
            assert_eq!(categories.len(), 1);
            assert_eq!(locations.len(), 1);
            for member in &members[1..] {
                let gap = (member.created_at - members[0].created_at).num_days().abs();
                assert!(gap <= 2, "{group} spans {gap} days");
            }
        }
    }

    #[test]
    fn every_boundary_slot_carries_its_edge_date() {
        let mut config = config(5000);
        config.rates.incident_cluster = 0.3;
        let fixture = Fixture::through_intake(config);
        let temporal = &fixture.context.temporal;
        let offsets = fixture
            .locations
            .iter()
            .map(|location| (&location.id, location.utc_offset_minutes))
            .collect::<HashMap<_, _>>();

        let mut covered = BTreeSet::new();
        for (index, record) in fixture.intake.iter().enumerate() {
            let Some(edge) = temporal.boundary_date_for(index) else {
                continue;
            };
            let offset = offsets.get(&record.location_id).copied().expect("location");
            let local = (record.created_at + Duration::minutes(i64::from(offset))).date_naive();
            assert_eq!(local, edge, "{} should fall on {edge}", record.reference_number);
            assert!(record.incident_group.is_none() || record.is_group_primary);
            covered.insert(edge);
        }

        let expected = temporal.edge_dates().iter().copied().collect::<BTreeSet<_>>();
        assert!(!expected.is_empty());
        assert_eq!(covered, expected);
    }

    #[test]
    fn flagship_reports_carry_the_flagship_category() {
        let fixture = Fixture::through_intake(config(2000));
        let flagships = fixture.context.patterns.flagships();
        let positions =
            flagship_intake_positions(&fixture.context, flagships.len(), fixture.intake.len());

        assert_eq!(positions.len(), flagships.len());
        for (position, flagship) in positions.into_iter().zip(flagships) {
            let record = &fixture.intake[position];
            assert_eq!(record.category_id, flagship.category_id, "{}", record.reference_number);
            assert_eq!(record.severity, flagship.payload.severity);
            assert!(record.incident_group.is_none());
            assert!(record.created_at < flagship_opened_at(&fixture.context, flagship.payload));
        }
    }

    #[test]
    fn anonymity_follows_category_rate() {
        let fixture = Fixture::through_intake(config(4000));
        let anonymous = fixture
            .intake
            .iter()
            .filter(|record| record.reporter_type == ReporterType::Anonymous)
            .count() as f64;
        let expected = fixture
            .intake
            .iter()
            .map(|record| {
                let category = fixture.taxonomy.get(&record.category_id);
                category.map_or(0.0, |category| category.anonymity_rate)
            })
            .sum::<f64>();

        assert!((anonymous - expected).abs() / expected < 0.1, "{anonymous} vs {expected}");
    }
}
