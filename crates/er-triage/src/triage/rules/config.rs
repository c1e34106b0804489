use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::domain::{Availability, BedCategory, EquipmentKind};

/// Identifier for a symptom category in the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomCategory(pub String);

impl SymptomCategory {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymptomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scoring coefficients; distance is a penalty, beds and equipment are rewards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleWeights {
    pub distance_coefficient: f64,
    pub bed_coefficient: f64,
    pub equipment_coefficient: f64,
}

/// Hard equipment requirement: the flag must equal `required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRequirement {
    pub equipment: EquipmentKind,
    pub required: Availability,
}

/// Hard capacity requirement: at least `minimum` free beds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedRequirement {
    pub bed: BedCategory,
    pub minimum: u32,
}

/// Score-only predicate; never affects eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusPredicate {
    Equipment {
        equipment: EquipmentKind,
        required: Availability,
    },
    Beds {
        bed: BedCategory,
        minimum: u32,
    },
}

/// Requirements and weights attached to one symptom category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomRule {
    pub category: SymptomCategory,
    pub label: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub required_boolean: Vec<EquipmentRequirement>,
    #[serde(default)]
    pub required_minimum: Vec<BedRequirement>,
    #[serde(default)]
    pub bonus: Vec<BonusPredicate>,
    pub weights: RuleWeights,
}

/// Labelled facility lines for showing what a symptom needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityChecklist {
    pub required_equipment: Vec<&'static str>,
    pub required_beds: Vec<&'static str>,
    pub recommended: Vec<&'static str>,
}

impl SymptomRule {
    pub fn checklist(&self) -> FacilityChecklist {
        FacilityChecklist {
            required_equipment: self
                .required_boolean
                .iter()
                .map(|req| req.equipment.label())
                .collect(),
            required_beds: self
                .required_minimum
                .iter()
                .map(|req| req.bed.label())
                .collect(),
            recommended: self
                .bonus
                .iter()
                .map(|predicate| match predicate {
                    BonusPredicate::Equipment { equipment, .. } => equipment.label(),
                    BonusPredicate::Beds { bed, .. } => bed.label(),
                })
                .collect(),
        }
    }
}
