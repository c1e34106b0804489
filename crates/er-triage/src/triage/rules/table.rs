use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::super::domain::{Availability, BedCategory, EquipmentKind};
use super::config::{
    BedRequirement, BonusPredicate, EquipmentRequirement, RuleWeights, SymptomCategory,
    SymptomRule,
};

/// Errors raised while building or querying a rule table.
#[derive(Debug, thiserror::Error)]
pub enum RuleTableError {
    #[error("unknown symptom category '{0}'")]
    UnknownSymptom(SymptomCategory),
    #[error("rule table defines no symptom categories")]
    Empty,
    #[error("symptom category '{0}' is defined more than once")]
    DuplicateCategory(SymptomCategory),
    #[error("invalid weights for '{category}': {reason}")]
    InvalidWeights {
        category: SymptomCategory,
        reason: &'static str,
    },
    #[error("equipment requirement for '{category}' cannot require an unknown flag")]
    UnknownRequirement { category: SymptomCategory },
    #[error("failed to read rule table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rule table JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct RuleTableDocument {
    rules: Vec<SymptomRule>,
}

/// Symptom-to-rule mapping injected into the ranking workflow.
#[derive(Debug, Clone)]
pub struct SymptomRuleTable {
    rules: Vec<SymptomRule>,
}

impl SymptomRuleTable {
    pub fn new(rules: Vec<SymptomRule>) -> Result<Self, RuleTableError> {
        if rules.is_empty() {
            return Err(RuleTableError::Empty);
        }

        for (index, rule) in rules.iter().enumerate() {
            if rules[..index]
                .iter()
                .any(|earlier| earlier.category == rule.category)
            {
                return Err(RuleTableError::DuplicateCategory(rule.category.clone()));
            }
            validate_rule(rule)?;
        }

        Ok(Self { rules })
    }

    /// The six reference categories.
    pub fn standard() -> Self {
        Self {
            rules: standard_rules(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RuleTableError> {
        let document: RuleTableDocument = serde_json::from_str(raw)?;
        Self::new(document.rules)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RuleTableError> {
        let document: RuleTableDocument = serde_json::from_reader(reader)?;
        Self::new(document.rules)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RuleTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn get(&self, category: &SymptomCategory) -> Result<&SymptomRule, RuleTableError> {
        self.rules
            .iter()
            .find(|rule| &rule.category == category)
            .ok_or_else(|| RuleTableError::UnknownSymptom(category.clone()))
    }

    pub fn rules(&self) -> &[SymptomRule] {
        &self.rules
    }

    pub fn categories(&self) -> impl Iterator<Item = &SymptomCategory> {
        self.rules.iter().map(|rule| &rule.category)
    }
}

impl Default for SymptomRuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn validate_rule(rule: &SymptomRule) -> Result<(), RuleTableError> {
    let RuleWeights {
        distance_coefficient,
        bed_coefficient,
        equipment_coefficient,
    } = rule.weights;

    let invalid = |reason| RuleTableError::InvalidWeights {
        category: rule.category.clone(),
        reason,
    };

    if !(distance_coefficient.is_finite()
        && bed_coefficient.is_finite()
        && equipment_coefficient.is_finite())
    {
        return Err(invalid("coefficients must be finite"));
    }
    if distance_coefficient > 0.0 {
        return Err(invalid("distance coefficient must not be positive"));
    }
    if bed_coefficient < 0.0 || equipment_coefficient < 0.0 {
        return Err(invalid("bed and equipment coefficients must not be negative"));
    }

    if rule
        .required_boolean
        .iter()
        .any(|req| req.required == Availability::Unknown)
    {
        return Err(RuleTableError::UnknownRequirement {
            category: rule.category.clone(),
        });
    }

    Ok(())
}

fn equipment(equipment: EquipmentKind) -> EquipmentRequirement {
    EquipmentRequirement {
        equipment,
        required: Availability::Yes,
    }
}

fn beds(bed: BedCategory) -> BedRequirement {
    BedRequirement { bed, minimum: 1 }
}

fn bonus_beds(bed: BedCategory) -> BonusPredicate {
    BonusPredicate::Beds { bed, minimum: 1 }
}

fn bonus_equipment(equipment: EquipmentKind) -> BonusPredicate {
    BonusPredicate::Equipment {
        equipment,
        required: Availability::Yes,
    }
}

fn standard_rules() -> Vec<SymptomRule> {
    vec![
        SymptomRule {
            category: SymptomCategory::new("stroke"),
            label: "Suspected stroke (FAST positive)".to_string(),
            summary: "CT available and a free general ICU bed are essential".to_string(),
            required_boolean: vec![equipment(EquipmentKind::Ct)],
            required_minimum: vec![beds(BedCategory::IcuGeneral)],
            bonus: vec![
                bonus_beds(BedCategory::NeuroWard),
                bonus_beds(BedCategory::IcuNeurosurgical),
            ],
            weights: RuleWeights {
                distance_coefficient: -2.0,
                bed_coefficient: 1.2,
                equipment_coefficient: 4.0,
            },
        },
        SymptomRule {
            category: SymptomCategory::new("stemi"),
            label: "Suspected myocardial infarction (STEMI)".to_string(),
            summary: "Angiography available plus operating room and ICU capacity".to_string(),
            required_boolean: vec![equipment(EquipmentKind::Angiography)],
            required_minimum: vec![beds(BedCategory::Surgery), beds(BedCategory::IcuGeneral)],
            bonus: Vec::new(),
            weights: RuleWeights {
                distance_coefficient: -2.0,
                bed_coefficient: 1.1,
                equipment_coefficient: 4.5,
            },
        },
        SymptomRule {
            category: SymptomCategory::new("major_trauma"),
            label: "Multiple or major trauma".to_string(),
            summary: "Ventilator available plus operating room and ICU capacity".to_string(),
            required_boolean: vec![equipment(EquipmentKind::Ventilator)],
            required_minimum: vec![beds(BedCategory::Surgery), beds(BedCategory::IcuGeneral)],
            bonus: vec![bonus_beds(BedCategory::IcuTrauma)],
            weights: RuleWeights {
                distance_coefficient: -2.2,
                bed_coefficient: 1.3,
                equipment_coefficient: 3.8,
            },
        },
        SymptomRule {
            category: SymptomCategory::new("pediatric_critical"),
            label: "Critical pediatric (respiratory distress, seizure)".to_string(),
            summary: "A free neonatal ICU bed is essential".to_string(),
            required_boolean: Vec::new(),
            required_minimum: vec![beds(BedCategory::IcuNeonatal)],
            bonus: vec![
                bonus_equipment(EquipmentKind::PediatricVentilator),
                bonus_equipment(EquipmentKind::Incubator),
            ],
            weights: RuleWeights {
                distance_coefficient: -1.8,
                bed_coefficient: 1.2,
                equipment_coefficient: 3.5,
            },
        },
        SymptomRule {
            category: SymptomCategory::new("severe_orthopedic"),
            label: "Severe orthopedic (major fracture, amputation)".to_string(),
            summary: "Operating room plus surgical ICU and general ICU capacity".to_string(),
            required_boolean: Vec::new(),
            required_minimum: vec![
                beds(BedCategory::Surgery),
                beds(BedCategory::IcuSurgical),
                beds(BedCategory::IcuGeneral),
            ],
            bonus: vec![bonus_beds(BedCategory::OrthoWard)],
            weights: RuleWeights {
                distance_coefficient: -2.1,
                bed_coefficient: 1.0,
                equipment_coefficient: 3.0,
            },
        },
        SymptomRule {
            category: SymptomCategory::new("neurosurgical_emergency"),
            label: "Neurosurgical emergency (reduced consciousness, traumatic bleed)".to_string(),
            summary: "CT available plus a neurosurgical ICU bed".to_string(),
            required_boolean: vec![equipment(EquipmentKind::Ct)],
            required_minimum: vec![
                beds(BedCategory::IcuNeurosurgical),
                beds(BedCategory::IcuGeneral),
            ],
            bonus: Vec::new(),
            weights: RuleWeights {
                distance_coefficient: -2.0,
                bed_coefficient: 1.1,
                equipment_coefficient: 4.0,
            },
        },
    ]
}
