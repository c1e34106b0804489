mod config;
mod eligibility;
mod scoring;
mod table;

pub use config::{
    BedRequirement, BonusPredicate, EquipmentRequirement, FacilityChecklist, RuleWeights,
    SymptomCategory, SymptomRule,
};
pub use eligibility::{is_eligible, unmet_requirements, UnmetRequirement};
pub use scoring::{
    score, score_breakdown, ScoreBreakdown, COMMON_EQUIPMENT, CORE_BED_CAP, CORE_BED_CATEGORIES,
};
pub use table::{RuleTableError, SymptomRuleTable};
