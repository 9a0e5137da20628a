use crate::domain::location::Location;
use crate::domain::{EntityKind, LocationId};
use crate::pipeline::GenerationContext;

pub fn generate_locations(context: &GenerationContext) -> Vec<Location> {
    context
        .config
        .reference
        .locations
        .iter()
        .map(|spec| Location {
            id: LocationId(context.entity_id(EntityKind::Location, &spec.code)),
            code: spec.code.clone(),
            name: spec.name.clone(),
            city: spec.city.clone(),
            country: spec.country.clone(),
            region: spec.region,
            utc_offset_minutes: spec.utc_offset_minutes,
        })
        .collect()
}
