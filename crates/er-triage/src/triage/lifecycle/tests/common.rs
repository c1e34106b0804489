use crate::triage::domain::{
    Availability, BedCategory, EquipmentKind, FacilitySnapshot, HospitalId, HospitalRecord,
};
use crate::triage::geo::Coordinates;
use crate::triage::lifecycle::{SessionId, TriageSession};
use crate::triage::ranking::{RankingConfig, RankingEngine, RankingOutcome, SortMode};
use crate::triage::rules::{SymptomCategory, SymptomRule, SymptomRuleTable};

pub(super) fn origin() -> Coordinates {
    Coordinates::new(35.0, 127.0).expect("valid origin")
}

pub(super) fn stroke() -> SymptomRule {
    SymptomRuleTable::standard()
        .get(&SymptomCategory::new("stroke"))
        .expect("stroke rule")
        .clone()
}

pub(super) fn id(raw: &str) -> HospitalId {
    HospitalId::new(raw)
}

/// Stroke-eligible hospital roughly `km_north` kilometres from the origin.
pub(super) fn ready(raw_id: &str, km_north: f64) -> HospitalRecord {
    record(
        raw_id,
        km_north,
        FacilitySnapshot::default()
            .with_equipment(EquipmentKind::Ct, Availability::Yes)
            .with_beds(BedCategory::IcuGeneral, 2),
    )
}

/// Hospital with no CT; never stroke-eligible.
pub(super) fn no_ct(raw_id: &str, km_north: f64) -> HospitalRecord {
    record(
        raw_id,
        km_north,
        FacilitySnapshot::default()
            .with_equipment(EquipmentKind::Ct, Availability::No)
            .with_beds(BedCategory::IcuGeneral, 5),
    )
}

fn record(raw_id: &str, km_north: f64, facilities: FacilitySnapshot) -> HospitalRecord {
    HospitalRecord {
        id: id(raw_id),
        name: Some(format!("{raw_id} Medical Center")),
        address: None,
        phone: None,
        coordinates: Coordinates::new(35.0 + km_north / 111.2, 127.0),
        facilities,
        last_updated: None,
        duty_doctor: None,
        duty_doctor_phone: None,
    }
}

pub(super) fn engine(top_n: usize, backup_pool_size: usize) -> RankingEngine {
    RankingEngine::new(RankingConfig {
        top_n,
        backup_pool_size,
        sort_mode: SortMode::Suitability,
    })
}

pub(super) fn rank(records: &[HospitalRecord], top_n: usize) -> RankingOutcome {
    engine(top_n, 10).rank(records, &stroke(), origin())
}

pub(super) fn session(top_n: usize) -> TriageSession {
    TriageSession::new(SessionId::new("triage-test"), top_n)
}

/// Five eligible hospitals one kilometre apart: three visible, two in backup.
pub(super) fn surfaced_session() -> TriageSession {
    let records: Vec<HospitalRecord> = (1..=5)
        .map(|n| ready(&format!("H{n}"), f64::from(n)))
        .collect();
    let mut session = session(3);
    session.surface(&rank(&records, 3));
    session
}

pub(super) fn active_ids(session: &TriageSession) -> Vec<String> {
    session
        .active()
        .iter()
        .map(|entry| entry.hospital_id.to_string())
        .collect()
}
