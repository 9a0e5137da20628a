use serde::{Deserialize, Serialize};

use super::{labeled_enum, LocationId, NaturalKey};

labeled_enum! {
    pub enum Region {
        NorthAmerica => "NORTH_AMERICA",
        Latam => "LATAM",
        Emea => "EMEA",
        Apac => "APAC",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub region: Region,
    pub utc_offset_minutes: i32,
}

impl NaturalKey for Location {
    fn natural_key(&self) -> String {
        self.code.clone()
    }
}
