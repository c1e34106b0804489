use serde::Serialize;

use super::super::domain::{Availability, BedCategory, EquipmentKind, FacilitySnapshot, HospitalRecord};
use super::config::{BonusPredicate, SymptomRule};

/// Bed categories summed into the capacity term.
pub const CORE_BED_CATEGORIES: [BedCategory; 4] = [
    BedCategory::Emergency,
    BedCategory::Surgery,
    BedCategory::IcuGeneral,
    BedCategory::Ward,
];

/// Core bed total is capped before weighting.
pub const CORE_BED_CAP: u32 = 50;

/// Equipment rewarded for every symptom, on top of rule-specific bonuses.
/// A bonus predicate naming one of these flags is counted twice.
pub const COMMON_EQUIPMENT: [EquipmentKind; 4] = [
    EquipmentKind::Ct,
    EquipmentKind::Angiography,
    EquipmentKind::Ventilator,
    EquipmentKind::Mri,
];

const SCORE_BASELINE: f64 = 50.0;
const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;

/// Per-term contributions so a score can be audited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub distance_term: f64,
    pub core_beds: u32,
    pub bed_term: f64,
    pub bonus_hits: u32,
    pub common_equipment_hits: u32,
    pub equipment_term: f64,
    pub raw: f64,
    pub score: f64,
}

/// Bounded suitability in [0, 100], one decimal place.
pub fn score(record: &HospitalRecord, rule: &SymptomRule, distance_km: f64) -> f64 {
    score_breakdown(record, rule, distance_km).score
}

pub fn score_breakdown(record: &HospitalRecord, rule: &SymptomRule, distance_km: f64) -> ScoreBreakdown {
    let weights = rule.weights;
    let facilities = &record.facilities;

    let distance = if distance_km.is_nan() {
        f64::INFINITY
    } else {
        distance_km.max(0.0)
    };
    let distance_term = if weights.distance_coefficient == 0.0 {
        0.0
    } else {
        weights.distance_coefficient * distance
    };

    let core_beds = CORE_BED_CATEGORIES
        .iter()
        .map(|category| facilities.available_beds(*category))
        .fold(0u32, u32::saturating_add)
        .min(CORE_BED_CAP);
    let bed_term = weights.bed_coefficient * f64::from(core_beds);

    let bonus_hits = rule
        .bonus
        .iter()
        .filter(|predicate| bonus_satisfied(facilities, predicate))
        .count() as u32;
    let common_equipment_hits = COMMON_EQUIPMENT
        .iter()
        .filter(|kind| facilities.equipment(**kind) == Availability::Yes)
        .count() as u32;
    let equipment_term =
        weights.equipment_coefficient * f64::from(bonus_hits + common_equipment_hits);

    let raw = distance_term + bed_term + equipment_term;
    let bounded = (SCORE_BASELINE + raw / 2.0).clamp(SCORE_MIN, SCORE_MAX);
    let score = if bounded.is_nan() {
        SCORE_MIN
    } else {
        // Half-way values round to the even tenth.
        (bounded * 10.0).round_ties_even() / 10.0
    };

    ScoreBreakdown {
        distance_term,
        core_beds,
        bed_term,
        bonus_hits,
        common_equipment_hits,
        equipment_term,
        raw,
        score,
    }
}

fn bonus_satisfied(facilities: &FacilitySnapshot, predicate: &BonusPredicate) -> bool {
    match *predicate {
        BonusPredicate::Equipment {
            equipment,
            required,
        } => facilities.equipment(equipment) == required,
        BonusPredicate::Beds { bed, minimum } => facilities.available_beds(bed) >= minimum,
    }
}
