use er_triage::config::TriageConfig;
use er_triage::error::AppError;
use er_triage::triage::{
    Coordinates, HospitalSnapshot, RankingConfig, Region, RepositoryError, SessionId,
    SessionRepository, SortMode, TriageSession,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) data: Arc<DataSourceSummary>,
}

/// What the running service ranks against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DataSourceSummary {
    pub(crate) source: DataSource,
    pub(crate) hospitals: usize,
    pub(crate) feed_rows: usize,
    pub(crate) regions: Vec<String>,
    pub(crate) ranking: RankingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DataSource {
    Csv,
    Demo,
}

impl DataSourceSummary {
    pub(crate) fn describe(
        snapshot: &HospitalSnapshot,
        source: DataSource,
        ranking: RankingConfig,
    ) -> Self {
        Self {
            source,
            hospitals: snapshot.directory_len(),
            feed_rows: snapshot.feed_len(),
            regions: snapshot
                .regions()
                .iter()
                .map(ToString::to_string)
                .collect(),
            ranking,
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, TriageSession>>>,
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, session: TriageSession) -> Result<TriageSession, RepositoryError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store poisoned".to_string()))?;
        if guard.contains_key(session.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id().clone(), session.clone());
        Ok(session)
    }

    fn modify<R>(
        &self,
        id: &SessionId,
        apply: impl FnOnce(&mut TriageSession) -> R,
    ) -> Result<R, RepositoryError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store poisoned".to_string()))?;
        let session = guard
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        Ok(apply(session))
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

/// CSV snapshot when configured, otherwise the bundled demo district.
pub(crate) fn load_snapshot(
    config: &TriageConfig,
) -> Result<(HospitalSnapshot, DataSource), AppError> {
    match &config.directory_csv {
        Some(directory) => {
            let snapshot = HospitalSnapshot::from_paths(directory, config.feed_csv.as_ref())?;
            info!(
                directory = %directory.display(),
                hospitals = snapshot.directory_len(),
                feed_rows = snapshot.feed_len(),
                "loaded hospital snapshot"
            );
            Ok((snapshot, DataSource::Csv))
        }
        None => Ok((demo_snapshot()?, DataSource::Demo)),
    }
}

const DEMO_DIRECTORY: &str = "\
hpid,dutyName,dutyAddr,dutyTel3,wgs84Lat,wgs84Lon,region_primary,region_secondary
DEMO001,Riverside University Hospital,Gwangju Dong-gu Jebong-ro 42,062-220-0114,35.1422,126.9220,Gwangju,Dong-gu
DEMO002,Mudeung Medical Center,Gwangju Buk-gu Seoyang-ro 111,062-510-3000,35.1745,126.9121,Gwangju,Buk-gu
DEMO003,Seonam Christian Hospital,Gwangju Nam-gu Baekseo-ro 70,062-650-5000,35.1390,126.9075,Gwangju,Nam-gu
DEMO004,Sangmu General Hospital,Gwangju Seo-gu Sangmu-daero 1014,062-380-9000,35.1530,126.8495,Gwangju,Seo-gu
DEMO005,Gwangsan Community Hospital,Gwangju Gwangsan-gu Hanam-daero 99,062-950-7000,35.1900,126.8107,Gwangju,Gwangsan-gu
DEMO006,Buk-gu Neighbourhood Clinic,Gwangju Buk-gu Yongbong-ro 7,062-262-1100,35.1800,126.9000,Gwangju,Buk-gu
DEMO007,Harbor Children's Hospital,Gwangju Seo-gu Mujin-daero 250,062-600-1200,,,Gwangju,Seo-gu
";

const DEMO_FEED: &str = "\
hpid,hvidate,hvec,hvoc,hvicc,hvncc,hv3,hv4,hv5,hv6,hv9,hvctayn,hvmriayn,hvangioayn,hvventiayn,hv10,hv11,hvdnm,hv1
DEMO001,20241018091500,6,2,3,1,2,4,2,1,1,Y,Y,Y,Y,Y,Y,Dr. Han,010-1111-2222
DEMO002,20241018092000,4,1,1,0,1,2,0,0,0,Y,N,Y,Y,N,N,Dr. Moon,010-3333-4444
DEMO003,20241018084500,5,0,2,2,0,1,1,1,0,Y,Y,N,Y,Y,Y,,
DEMO004,20241018093000,3,1,0,0,1,3,0,0,2,N,N,N,Y,N,N,Dr. Oh,
DEMO005,20241018070000,2,1,2,0,1,0,0,0,0,Y,N,N,N,N,N,,
DEMO006,20241018093500,1,0,0,0,0,0,0,0,0,N,N,N,N,N,N,,
";

pub(crate) fn demo_snapshot() -> Result<HospitalSnapshot, AppError> {
    let snapshot =
        HospitalSnapshot::from_readers(DEMO_DIRECTORY.as_bytes(), Some(DEMO_FEED.as_bytes()))?;
    Ok(snapshot)
}

/// Default scene for the demo: Gwangju Buk-gu.
pub(crate) fn demo_origin() -> Coordinates {
    Coordinates {
        latitude: 35.1740,
        longitude: 126.9120,
    }
}

pub(crate) fn parse_coordinates(raw: &str) -> Result<Coordinates, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected 'LAT,LON', got '{raw}'"))?;
    Coordinates::parse(lat, lon)
        .ok_or_else(|| format!("'{raw}' is not a valid latitude/longitude pair"))
}

pub(crate) fn parse_sort_mode(raw: &str) -> Result<SortMode, String> {
    SortMode::parse(raw).ok_or_else(|| format!("unknown sort mode '{raw}'"))
}

pub(crate) fn parse_top_n(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("at least one visible slot is required".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("'{raw}' is not a slot count")),
    }
}

pub(crate) fn parse_region(raw: &str) -> Result<Region, String> {
    let mut parts = raw.split(['/', ',']).map(str::trim);
    match parts.next().filter(|primary| !primary.is_empty()) {
        Some(primary) => Ok(Region::new(
            primary,
            parts.next().filter(|value| !value.is_empty()).map(str::to_string),
        )),
        None => Err(format!("'{raw}' does not name a region")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_snapshot_covers_the_district() {
        let snapshot = demo_snapshot().expect("demo data parses");
        assert_eq!(snapshot.directory_len(), 7);
        assert_eq!(snapshot.feed_len(), 6);
        assert!(snapshot
            .regions()
            .contains(&Region::new("Gwangju", Some("Buk-gu".to_string()))));
    }

    #[test]
    fn parses_cli_values() {
        let origin = parse_coordinates("35.17, 126.91").expect("coordinates parse");
        assert!((origin.latitude - 35.17).abs() < f64::EPSILON);
        assert!(parse_coordinates("35.17").is_err());
        assert!(parse_coordinates("135,200").is_err());

        assert_eq!(parse_sort_mode("nearest"), Ok(SortMode::Proximity));
        assert!(parse_sort_mode("random").is_err());

        assert_eq!(
            parse_region("Gwangju/Buk-gu"),
            Ok(Region::new("Gwangju", Some("Buk-gu".to_string())))
        );
        assert_eq!(parse_region("Busan"), Ok(Region::new("Busan", None)));
        assert!(parse_region(" ").is_err());

        assert_eq!(parse_top_n("5"), Ok(5));
        assert!(parse_top_n("0").is_err());
        assert!(parse_top_n("-1").is_err());
        assert!(parse_top_n("three").is_err());
    }

    #[test]
    fn modify_requires_an_existing_session() {
        let repository = InMemorySessionRepository::default();
        let id = SessionId::new("triage-test");
        assert!(matches!(
            repository.modify(&id, |session| session.slots().len()),
            Err(RepositoryError::NotFound(_))
        ));

        let session = TriageSession::new(id.clone(), 3);
        repository.insert(session.clone()).expect("insert");
        assert!(matches!(
            repository.insert(session),
            Err(RepositoryError::Conflict)
        ));
        assert_eq!(
            repository
                .modify(&id, |session| session.slots().len())
                .expect("stored session"),
            3
        );
        assert!(repository.fetch(&id).expect("fetch").is_some());
    }
}
