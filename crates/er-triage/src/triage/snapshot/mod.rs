//! Directory and live-feed snapshots loaded from CSV exports.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use super::domain::{DirectoryEntry, HospitalId, LiveFeedEntry};
use super::providers::{HospitalDirectoryProvider, LiveBedFeedProvider, ProviderError, Region};

pub use parser::RegionalEntry;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotImportError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Point-in-time copy of the hospital directory and bed feed.
///
/// Directory rows without a region are offered to every lookup; feed rows
/// follow the directory rows they belong to.
#[derive(Debug, Clone, Default)]
pub struct HospitalSnapshot {
    directory: Vec<RegionalEntry>,
    feed: Vec<LiveFeedEntry>,
}

impl HospitalSnapshot {
    pub fn new(directory: Vec<RegionalEntry>, feed: Vec<LiveFeedEntry>) -> Self {
        Self { directory, feed }
    }

    pub fn from_paths<P, Q>(directory: P, feed: Option<Q>) -> Result<Self, SnapshotImportError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let directory = std::fs::File::open(directory)?;
        match feed {
            Some(path) => {
                let feed = std::fs::File::open(path)?;
                Self::from_readers(directory, Some(feed))
            }
            None => Self::from_readers(directory, None::<std::fs::File>),
        }
    }

    pub fn from_readers<R, F>(directory: R, feed: Option<F>) -> Result<Self, SnapshotImportError>
    where
        R: Read,
        F: Read,
    {
        let directory = parser::parse_directory(directory)?;
        let feed = match feed {
            Some(reader) => parser::parse_feed(reader)?,
            None => Vec::new(),
        };

        tracing::info!(
            hospitals = directory.len(),
            feed_rows = feed.len(),
            "loaded hospital snapshot"
        );
        Ok(Self::new(directory, feed))
    }

    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    pub fn feed_len(&self) -> usize {
        self.feed.len()
    }

    /// Distinct listed regions, in first-seen order.
    pub fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<Region> = Vec::new();
        for region in self.directory.iter().filter_map(|row| row.region.as_ref()) {
            if !regions.contains(region) {
                regions.push(region.clone());
            }
        }
        regions
    }

    fn entries_in(&self, region: &Region) -> impl Iterator<Item = &DirectoryEntry> + '_ {
        let region = region.clone();
        self.directory
            .iter()
            .filter(move |row| row.region.as_ref().map_or(true, |listed| region.contains(listed)))
            .map(|row| &row.entry)
    }
}

impl HospitalDirectoryProvider for HospitalSnapshot {
    fn lookup(&self, region: &Region) -> Result<Vec<DirectoryEntry>, ProviderError> {
        Ok(self.entries_in(region).cloned().collect())
    }
}

impl LiveBedFeedProvider for HospitalSnapshot {
    fn lookup(&self, region: &Region) -> Result<Vec<LiveFeedEntry>, ProviderError> {
        let ids: HashSet<&HospitalId> = self.entries_in(region).map(|entry| &entry.id).collect();
        Ok(self
            .feed
            .iter()
            .filter(|entry| ids.contains(&entry.id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::domain::{Availability, BedCategory, EquipmentKind};
    use chrono::NaiveDate;
    use std::io::Cursor;

    const DIRECTORY: &str = "\
id,name,address,phone,latitude,longitude,region_primary,region_secondary
A100,Riverside General,Gwangju Buk-gu 1,062-000-0001,35.17,126.91,Gwangju,Buk-gu
A200,Harbor Medical,Gwangju Seo-gu 9,,35.15,126.88,Gwangju,Seo-gu
A300,Unmapped Clinic,Gwangju Buk-gu 3,,,,Gwangju,Buk-gu
,Nameless,,,35.0,126.0,Gwangju,Buk-gu
A400,Coastal Hospital,Busan Jung-gu 2,,35.10,129.03,Busan,Jung-gu
";

    const FEED: &str = "\
hpid,hvec,hvicc,hv6,hvctayn,hvangioayn,hvidate,hvdnm,hv1
A100,4,2,1,Y,n,20250130141500,Dr. Seo,010-1111-2222
A200,-2,None,,N,,garbage,,
A400,7,1,,Y,Y,,,
";

    fn snapshot() -> HospitalSnapshot {
        HospitalSnapshot::from_readers(Cursor::new(DIRECTORY), Some(Cursor::new(FEED)))
            .expect("snapshot parses")
    }

    #[test]
    fn directory_rows_keep_missing_values_unknown() {
        let snapshot = snapshot();
        assert_eq!(snapshot.directory_len(), 4, "row without id is skipped");

        let buk_gu = Region::new("Gwangju", Some("Buk-gu".to_string()));
        let entries = HospitalDirectoryProvider::lookup(&snapshot, &buk_gu).expect("lookup");
        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["A100", "A300"]);
        assert!(entries[1].coordinates.is_none());
        assert_eq!(entries[0].phone.as_deref(), Some("062-000-0001"));
    }

    #[test]
    fn feed_rows_accept_field_codes_and_degrade_conservatively() {
        let snapshot = snapshot();
        let gwangju = Region::new("Gwangju", None);
        let feed = LiveBedFeedProvider::lookup(&snapshot, &gwangju).expect("lookup");
        assert_eq!(feed.len(), 2);

        let riverside = &feed[0];
        assert_eq!(riverside.facilities.bed_count(BedCategory::Emergency), Some(4));
        assert_eq!(riverside.facilities.bed_count(BedCategory::IcuNeurosurgical), Some(1));
        assert_eq!(riverside.facilities.equipment(EquipmentKind::Ct), Availability::Yes);
        assert_eq!(riverside.facilities.equipment(EquipmentKind::Angiography), Availability::No);
        assert_eq!(riverside.duty_doctor.as_deref(), Some("Dr. Seo"));
        assert_eq!(
            riverside.last_updated,
            NaiveDate::from_ymd_opt(2025, 1, 30)
                .unwrap()
                .and_hms_opt(14, 15, 0)
        );

        let harbor = &feed[1];
        assert_eq!(harbor.facilities.bed_count(BedCategory::Emergency), Some(0));
        assert_eq!(harbor.facilities.bed_count(BedCategory::IcuGeneral), None);
        assert_eq!(harbor.facilities.equipment(EquipmentKind::Angiography), Availability::Unknown);
        assert!(harbor.last_updated.is_none());
    }

    #[test]
    fn regions_are_listed_once() {
        let regions = snapshot().regions();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[2].to_string(), "Busan Jung-gu");
    }

    #[test]
    fn missing_files_surface_io_errors() {
        match HospitalSnapshot::from_paths("./no-such-directory.csv", None::<&str>) {
            Err(SnapshotImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
