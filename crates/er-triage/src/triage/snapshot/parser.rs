use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::super::domain::{
    parse_bed_count, parse_feed_timestamp, Availability, BedCategory, DirectoryEntry,
    EquipmentKind, FacilitySnapshot, HospitalId, LiveFeedEntry,
};
use super::super::geo::Coordinates;
use super::super::providers::Region;

/// Directory row together with the region it was listed under.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalEntry {
    pub region: Option<Region>,
    pub entry: DirectoryEntry,
}

pub(crate) fn parse_directory<R: Read>(reader: R) -> Result<Vec<RegionalEntry>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for record in csv_reader.deserialize::<DirectoryRow>() {
        let row = record?;
        let Some(id) = row.id.clone() else {
            debug!("skipping directory row without id");
            continue;
        };
        entries.push(row.into_entry(HospitalId::new(id)));
    }

    Ok(entries)
}

pub(crate) fn parse_feed<R: Read>(reader: R) -> Result<Vec<LiveFeedEntry>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for record in csv_reader.deserialize::<HashMap<String, String>>() {
        match feed_entry(record?) {
            Some(entry) => entries.push(entry),
            None => debug!("skipping feed row without id"),
        }
    }

    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct DirectoryRow {
    #[serde(alias = "hpid", default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
    #[serde(alias = "dutyName", default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(alias = "dutyAddr", default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(alias = "dutyTel3", default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(alias = "wgs84Lat", default, deserialize_with = "empty_string_as_none")]
    latitude: Option<String>,
    #[serde(alias = "wgs84Lon", default, deserialize_with = "empty_string_as_none")]
    longitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    region_primary: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    region_secondary: Option<String>,
}

impl DirectoryRow {
    fn into_entry(self, id: HospitalId) -> RegionalEntry {
        let coordinates = match (self.latitude.as_deref(), self.longitude.as_deref()) {
            (Some(lat), Some(lon)) => Coordinates::parse(lat, lon),
            _ => None,
        };
        let region = self
            .region_primary
            .map(|primary| Region::new(primary, self.region_secondary));

        RegionalEntry {
            region,
            entry: DirectoryEntry {
                id,
                name: self.name,
                address: self.address,
                phone: self.phone,
                coordinates,
            },
        }
    }
}

/// Columns are matched by snake_case key or live-feed field code; anything
/// unrecognised is ignored and unparsable values stay unknown.
fn feed_entry(row: HashMap<String, String>) -> Option<LiveFeedEntry> {
    let mut id = None;
    let mut facilities = FacilitySnapshot::default();
    let mut last_updated = None;
    let mut duty_doctor = None;
    let mut duty_doctor_phone = None;

    for (header, value) in row {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match header.trim().to_ascii_lowercase().as_str() {
            "id" | "hpid" => id = Some(HospitalId::new(value)),
            "last_updated" | "hvidate" => last_updated = parse_feed_timestamp(value),
            "duty_doctor" | "hvdnm" => duty_doctor = Some(value.to_string()),
            "duty_doctor_phone" | "hv1" => duty_doctor_phone = Some(value.to_string()),
            other => {
                if let Some(category) = BedCategory::from_key(other) {
                    if let Some(count) = parse_bed_count(value) {
                        facilities.bed_counts.insert(category, count);
                    }
                } else if let Some(kind) = EquipmentKind::from_key(other) {
                    let flag = Availability::parse(value);
                    if flag != Availability::Unknown {
                        facilities.equipment.insert(kind, flag);
                    }
                }
            }
        }
    }

    Some(LiveFeedEntry {
        id: id?,
        facilities,
        last_updated,
        duty_doctor,
        duty_doctor_phone,
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
