use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::geo::Coordinates;

/// Stable identifier joining directory rows and live-feed rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HospitalId(pub String);

impl HospitalId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HospitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bed categories reported by the live emergency bed feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedCategory {
    Emergency,
    Surgery,
    IcuGeneral,
    IcuNeuro,
    IcuNeonatal,
    IcuThoracic,
    Ward,
    IcuInternal,
    IcuSurgical,
    OrthoWard,
    NeuroWard,
    IcuNeurosurgical,
    IcuDrug,
    IcuBurn,
    IcuTrauma,
}

impl BedCategory {
    pub const fn ordered() -> [Self; 15] {
        [
            Self::Emergency,
            Self::Surgery,
            Self::IcuGeneral,
            Self::IcuNeuro,
            Self::IcuNeonatal,
            Self::IcuThoracic,
            Self::Ward,
            Self::IcuInternal,
            Self::IcuSurgical,
            Self::OrthoWard,
            Self::NeuroWard,
            Self::IcuNeurosurgical,
            Self::IcuDrug,
            Self::IcuBurn,
            Self::IcuTrauma,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Surgery => "surgery",
            Self::IcuGeneral => "icu_general",
            Self::IcuNeuro => "icu_neuro",
            Self::IcuNeonatal => "icu_neonatal",
            Self::IcuThoracic => "icu_thoracic",
            Self::Ward => "ward",
            Self::IcuInternal => "icu_internal",
            Self::IcuSurgical => "icu_surgical",
            Self::OrthoWard => "ortho_ward",
            Self::NeuroWard => "neuro_ward",
            Self::IcuNeurosurgical => "icu_neurosurgical",
            Self::IcuDrug => "icu_drug",
            Self::IcuBurn => "icu_burn",
            Self::IcuTrauma => "icu_trauma",
        }
    }

    /// Field code used by the national emergency bed feed.
    pub const fn feed_code(self) -> &'static str {
        match self {
            Self::Emergency => "hvec",
            Self::Surgery => "hvoc",
            Self::IcuGeneral => "hvicc",
            Self::IcuNeuro => "hvcc",
            Self::IcuNeonatal => "hvncc",
            Self::IcuThoracic => "hvccc",
            Self::Ward => "hvgc",
            Self::IcuInternal => "hv2",
            Self::IcuSurgical => "hv3",
            Self::OrthoWard => "hv4",
            Self::NeuroWard => "hv5",
            Self::IcuNeurosurgical => "hv6",
            Self::IcuDrug => "hv7",
            Self::IcuBurn => "hv8",
            Self::IcuTrauma => "hv9",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Emergency => "Emergency room",
            Self::Surgery => "Operating room",
            Self::IcuGeneral => "General ICU",
            Self::IcuNeuro => "Neurology ICU",
            Self::IcuNeonatal => "Neonatal ICU",
            Self::IcuThoracic => "Thoracic ICU",
            Self::Ward => "Inpatient ward",
            Self::IcuInternal => "Internal medicine ICU",
            Self::IcuSurgical => "Surgical ICU",
            Self::OrthoWard => "Orthopedic ward",
            Self::NeuroWard => "Neurology ward",
            Self::IcuNeurosurgical => "Neurosurgical ICU",
            Self::IcuDrug => "Toxicology ICU",
            Self::IcuBurn => "Burn ICU",
            Self::IcuTrauma => "Trauma ICU",
        }
    }

    /// Accepts either the snake_case key or the feed field code.
    pub fn from_key(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|category| category.key() == needle || category.feed_code() == needle)
    }
}

/// Equipment flags reported by the live emergency bed feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    Ct,
    Mri,
    Angiography,
    Ventilator,
    PediatricVentilator,
    Incubator,
}

impl EquipmentKind {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Ct,
            Self::Mri,
            Self::Angiography,
            Self::Ventilator,
            Self::PediatricVentilator,
            Self::Incubator,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Ct => "ct",
            Self::Mri => "mri",
            Self::Angiography => "angiography",
            Self::Ventilator => "ventilator",
            Self::PediatricVentilator => "pediatric_ventilator",
            Self::Incubator => "incubator",
        }
    }

    pub const fn feed_code(self) -> &'static str {
        match self {
            Self::Ct => "hvctayn",
            Self::Mri => "hvmriayn",
            Self::Angiography => "hvangioayn",
            Self::Ventilator => "hvventiayn",
            Self::PediatricVentilator => "hv10",
            Self::Incubator => "hv11",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ct => "CT",
            Self::Mri => "MRI",
            Self::Angiography => "Angiography",
            Self::Ventilator => "Ventilator",
            Self::PediatricVentilator => "Pediatric ventilator",
            Self::Incubator => "Incubator",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.key() == needle || kind.feed_code() == needle)
    }
}

/// Tri-state equipment flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Availability {
    /// Case-normalised parse; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "Y" | "YES" | "TRUE" | "1" => Self::Yes,
            "N" | "NO" | "FALSE" | "0" => Self::No,
            _ => Self::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Y",
            Self::No => "N",
            Self::Unknown => "N/A",
        }
    }
}

/// Parses a reported bed count. Blank or unparsable values are unknown;
/// negative counts (over-capacity reports) clamp to zero.
pub fn parse_bed_count(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("nan")
    {
        return None;
    }

    trimmed
        .parse::<i64>()
        .ok()
        .map(|count| count.clamp(0, u32::MAX as i64) as u32)
}

const FEED_TIMESTAMP_FORMATS: [&str; 2] = ["%Y%m%d%H%M%S", "%Y%m%d%H%M"];

/// Parses the feed's compact `YYYYMMDDHHMMSS` timestamp (12-digit form accepted).
pub fn parse_feed_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    FEED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

pub fn format_freshness(last_updated: Option<NaiveDateTime>) -> String {
    match last_updated {
        Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        None => "unknown".to_string(),
    }
}

/// Live capacity and equipment state. Absent keys read as unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilitySnapshot {
    #[serde(default)]
    pub bed_counts: BTreeMap<BedCategory, u32>,
    #[serde(default)]
    pub equipment: BTreeMap<EquipmentKind, Availability>,
}

impl FacilitySnapshot {
    pub fn with_beds(mut self, category: BedCategory, count: u32) -> Self {
        self.bed_counts.insert(category, count);
        self
    }

    pub fn with_equipment(mut self, kind: EquipmentKind, flag: Availability) -> Self {
        self.equipment.insert(kind, flag);
        self
    }

    pub fn bed_count(&self, category: BedCategory) -> Option<u32> {
        self.bed_counts.get(&category).copied()
    }

    /// Conservative read: unknown counts as zero.
    pub fn available_beds(&self, category: BedCategory) -> u32 {
        self.bed_count(category).unwrap_or(0)
    }

    pub fn equipment(&self, kind: EquipmentKind) -> Availability {
        self.equipment.get(&kind).copied().unwrap_or_default()
    }
}

/// Static metadata from the hospital directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: HospitalId,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// One row of the live bed/equipment feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFeedEntry {
    pub id: HospitalId,
    pub facilities: FacilitySnapshot,
    pub last_updated: Option<NaiveDateTime>,
    pub duty_doctor: Option<String>,
    pub duty_doctor_phone: Option<String>,
}

/// Directory metadata joined with the hospital's live feed, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub id: HospitalId,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub facilities: FacilitySnapshot,
    pub last_updated: Option<NaiveDateTime>,
    pub duty_doctor: Option<String>,
    pub duty_doctor_phone: Option<String>,
}

impl HospitalRecord {
    pub fn from_directory(entry: DirectoryEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            address: entry.address,
            phone: entry.phone,
            coordinates: entry.coordinates,
            facilities: FacilitySnapshot::default(),
            last_updated: None,
            duty_doctor: None,
            duty_doctor_phone: None,
        }
    }

    pub fn with_feed(mut self, feed: LiveFeedEntry) -> Self {
        self.facilities = feed.facilities;
        self.last_updated = feed.last_updated;
        self.duty_doctor = feed.duty_doctor;
        self.duty_doctor_phone = feed.duty_doctor_phone;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn freshness_label(&self) -> String {
        format_freshness(self.last_updated)
    }
}

/// Left join of directory rows with feed rows on `id`. Directory order is
/// kept; duplicate ids on either side keep their first occurrence.
pub fn merge_records(
    directory: Vec<DirectoryEntry>,
    feed: Vec<LiveFeedEntry>,
) -> Vec<HospitalRecord> {
    let mut feed_by_id: BTreeMap<HospitalId, LiveFeedEntry> = BTreeMap::new();
    for entry in feed {
        feed_by_id.entry(entry.id.clone()).or_insert(entry);
    }

    let mut seen: HashSet<HospitalId> = HashSet::new();
    directory
        .into_iter()
        .filter(|entry| seen.insert(entry.id.clone()))
        .map(|entry| {
            let live = feed_by_id.remove(&entry.id);
            let record = HospitalRecord::from_directory(entry);
            match live {
                Some(live) => record.with_feed(live),
                None => record,
            }
        })
        .collect()
}
