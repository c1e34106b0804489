use serde::Serialize;

use super::super::domain::{Availability, BedCategory, EquipmentKind, HospitalRecord};
use super::config::SymptomRule;

/// Hard requirement a hospital failed to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnmetRequirement {
    Equipment {
        equipment: EquipmentKind,
        required: Availability,
        found: Availability,
    },
    Beds {
        bed: BedCategory,
        minimum: u32,
        found: u32,
    },
}

impl UnmetRequirement {
    pub fn describe(&self) -> String {
        match self {
            UnmetRequirement::Equipment {
                equipment,
                required,
                found,
            } => format!(
                "{} must be {} (reported {})",
                equipment.label(),
                required.label(),
                found.label()
            ),
            UnmetRequirement::Beds {
                bed,
                minimum,
                found,
            } => format!("{} needs {} free (reported {})", bed.label(), minimum, found),
        }
    }
}

/// Short-circuit AND over every hard requirement of the rule.
pub fn is_eligible(record: &HospitalRecord, rule: &SymptomRule) -> bool {
    let facilities = &record.facilities;

    for requirement in &rule.required_boolean {
        if facilities.equipment(requirement.equipment) != requirement.required {
            return false;
        }
    }

    for requirement in &rule.required_minimum {
        if facilities.available_beds(requirement.bed) < requirement.minimum {
            return false;
        }
    }

    true
}

/// Every failed requirement, in rule order.
pub fn unmet_requirements(record: &HospitalRecord, rule: &SymptomRule) -> Vec<UnmetRequirement> {
    let facilities = &record.facilities;

    let equipment = rule.required_boolean.iter().filter_map(|requirement| {
        let found = facilities.equipment(requirement.equipment);
        (found != requirement.required).then_some(UnmetRequirement::Equipment {
            equipment: requirement.equipment,
            required: requirement.required,
            found,
        })
    });

    let beds = rule.required_minimum.iter().filter_map(|requirement| {
        let found = facilities.available_beds(requirement.bed);
        (found < requirement.minimum).then_some(UnmetRequirement::Beds {
            bed: requirement.bed,
            minimum: requirement.minimum,
            found,
        })
    });

    equipment.chain(beds).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::domain::{FacilitySnapshot, HospitalId};
    use crate::triage::rules::{SymptomCategory, SymptomRuleTable};

    fn record(facilities: FacilitySnapshot) -> HospitalRecord {
        HospitalRecord {
            id: HospitalId::new("H1"),
            name: None,
            address: None,
            phone: None,
            coordinates: None,
            facilities,
            last_updated: None,
            duty_doctor: None,
            duty_doctor_phone: None,
        }
    }

    fn rule(key: &str) -> SymptomRule {
        SymptomRuleTable::standard()
            .get(&SymptomCategory::new(key))
            .expect("reference rule")
            .clone()
    }

    #[test]
    fn stroke_requires_ct_and_icu() {
        let stroke = rule("stroke");
        let ready = record(
            FacilitySnapshot::default()
                .with_equipment(EquipmentKind::Ct, Availability::Yes)
                .with_beds(BedCategory::IcuGeneral, 2),
        );
        let no_ct = record(
            FacilitySnapshot::default()
                .with_equipment(EquipmentKind::Ct, Availability::No)
                .with_beds(BedCategory::IcuGeneral, 5),
        );

        assert!(is_eligible(&ready, &stroke));
        assert!(!is_eligible(&no_ct, &stroke));
        assert!(unmet_requirements(&ready, &stroke).is_empty());
    }

    #[test]
    fn unknown_values_never_pass() {
        let stroke = rule("stroke");
        let silent = record(FacilitySnapshot::default());

        assert!(!is_eligible(&silent, &stroke));
        let unmet = unmet_requirements(&silent, &stroke);
        assert_eq!(unmet.len(), 2);
        assert!(unmet[0].describe().contains("CT must be Y"));
    }

    #[test]
    fn rules_without_equipment_requirements_only_check_beds() {
        let pediatric = rule("pediatric_critical");
        let nicu = record(FacilitySnapshot::default().with_beds(BedCategory::IcuNeonatal, 1));

        assert!(is_eligible(&nicu, &pediatric));
        assert!(!is_eligible(&record(FacilitySnapshot::default()), &pediatric));
    }

    #[test]
    fn eligibility_is_repeatable() {
        let stemi = rule("stemi");
        let candidate = record(
            FacilitySnapshot::default()
                .with_equipment(EquipmentKind::Angiography, Availability::Yes)
                .with_beds(BedCategory::Surgery, 1)
                .with_beds(BedCategory::IcuGeneral, 1),
        );

        let first = is_eligible(&candidate, &stemi);
        assert_eq!(first, is_eligible(&candidate, &stemi));
        assert!(first);
    }
}
