use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::HospitalRecord;
use super::geo::{great_circle_km, Coordinates};
use super::rules::{self, SymptomRule, UnmetRequirement};

/// Primary ordering applied to eligible hospitals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Suitability,
    Proximity,
}

impl SortMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "suitability" | "score" => Some(Self::Suitability),
            "proximity" | "distance" | "nearest" => Some(Self::Proximity),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Suitability => "by suitability",
            Self::Proximity => "by proximity",
        }
    }
}

/// Why a candidate holds its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Met every hard requirement.
    Qualified,
    /// Nearest ineligible hospital filling a slot the eligible set could not.
    Padding,
    /// Nobody qualified; nearest hospitals shown instead.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub record: HospitalRecord,
    pub distance_km: f64,
    pub score: f64,
    pub meets_eligibility: bool,
    pub placement: Placement,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmet: Vec<UnmetRequirement>,
}

/// Degraded-success conditions attached to a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RankingNotice {
    NoEligibleCandidates,
    PaddedWithIneligible { count: usize },
}

impl RankingNotice {
    pub fn describe(&self) -> String {
        match self {
            RankingNotice::NoEligibleCandidates => {
                "no hospital met the requirements; showing nearest instead".to_string()
            }
            RankingNotice::PaddedWithIneligible { count } => {
                format!("{count} slot(s) filled with nearby hospitals that do not meet the requirements")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankingSummary {
    pub scanned: usize,
    pub missing_coordinates: usize,
    pub eligible: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingOutcome {
    pub sort_mode: SortMode,
    pub ordered: Vec<RankedCandidate>,
    pub backup_pool: Vec<RankedCandidate>,
    pub notices: Vec<RankingNotice>,
    pub summary: RankingSummary,
}

impl RankingOutcome {
    pub fn is_fallback(&self) -> bool {
        self.notices
            .iter()
            .any(|notice| matches!(notice, RankingNotice::NoEligibleCandidates))
    }
}

/// Slot count, backup pool bound, and default ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub top_n: usize,
    pub backup_pool_size: usize,
    pub sort_mode: SortMode,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            backup_pool_size: 10,
            sort_mode: SortMode::Suitability,
        }
    }
}

/// Stateless ranker over merged hospital records.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    config: RankingConfig,
}

struct Scored<'a> {
    record: &'a HospitalRecord,
    distance_km: f64,
    score: f64,
    eligible: bool,
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn rank(
        &self,
        records: &[HospitalRecord],
        rule: &SymptomRule,
        origin: Coordinates,
    ) -> RankingOutcome {
        self.rank_by(records, rule, origin, self.config.sort_mode)
    }

    pub fn rank_by(
        &self,
        records: &[HospitalRecord],
        rule: &SymptomRule,
        origin: Coordinates,
        mode: SortMode,
    ) -> RankingOutcome {
        let top_n = self.config.top_n;
        let mut summary = RankingSummary {
            scanned: records.len(),
            ..RankingSummary::default()
        };

        let mut eligible = Vec::new();
        let mut ineligible = Vec::new();
        for record in records {
            let Some(coordinates) = record.coordinates.filter(Coordinates::is_valid) else {
                debug!(hospital_id = %record.id, "excluding hospital without usable coordinates");
                summary.missing_coordinates += 1;
                continue;
            };

            let distance_km = great_circle_km(origin, coordinates);
            let scored = Scored {
                record,
                distance_km,
                score: rules::score(record, rule, distance_km),
                eligible: rules::is_eligible(record, rule),
            };
            if scored.eligible {
                eligible.push(scored);
            } else {
                ineligible.push(scored);
            }
        }
        summary.eligible = eligible.len();

        match mode {
            SortMode::Suitability => eligible.sort_by(by_suitability),
            SortMode::Proximity => eligible.sort_by(by_proximity),
        }
        ineligible.sort_by(by_distance);

        let mut notices = Vec::new();
        let mut ordered = Vec::with_capacity(top_n);
        let mut backup_pool = Vec::new();

        if eligible.is_empty() {
            info!(
                symptom = %rule.category,
                scanned = summary.scanned,
                "no hospital met the requirements, falling back to nearest"
            );
            notices.push(RankingNotice::NoEligibleCandidates);
            ordered.extend(
                ineligible
                    .iter()
                    .take(top_n)
                    .map(|scored| (scored, Placement::Fallback)),
            );
        } else {
            let visible = eligible.len().min(top_n);
            ordered.extend(
                eligible[..visible]
                    .iter()
                    .map(|scored| (scored, Placement::Qualified)),
            );
            backup_pool.extend(
                eligible[visible..]
                    .iter()
                    .take(self.config.backup_pool_size),
            );

            let shortfall = top_n - visible;
            if shortfall > 0 && !ineligible.is_empty() {
                let padding = shortfall.min(ineligible.len());
                info!(symptom = %rule.category, padding, "padding ranking with ineligible hospitals");
                notices.push(RankingNotice::PaddedWithIneligible { count: padding });
                ordered.extend(
                    ineligible[..padding]
                        .iter()
                        .map(|scored| (scored, Placement::Padding)),
                );
            }
        }

        let ordered: Vec<RankedCandidate> = ordered
            .into_iter()
            .enumerate()
            .map(|(index, (scored, placement))| to_candidate(scored, rule, index + 1, placement))
            .collect();
        let offset = ordered.len();
        let backup_pool = backup_pool
            .into_iter()
            .enumerate()
            .map(|(index, scored)| to_candidate(scored, rule, offset + index + 1, Placement::Qualified))
            .collect();

        RankingOutcome {
            sort_mode: mode,
            ordered,
            backup_pool,
            notices,
            summary,
        }
    }
}

fn to_candidate(
    scored: &Scored<'_>,
    rule: &SymptomRule,
    rank: usize,
    placement: Placement,
) -> RankedCandidate {
    let unmet = if scored.eligible {
        Vec::new()
    } else {
        rules::unmet_requirements(scored.record, rule)
    };

    RankedCandidate {
        rank,
        record: scored.record.clone(),
        distance_km: scored.distance_km,
        score: scored.score,
        meets_eligibility: scored.eligible,
        placement,
        unmet,
    }
}

fn by_suitability(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.distance_km.total_cmp(&b.distance_km))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

fn by_proximity(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    a.distance_km
        .total_cmp(&b.distance_km)
        .then_with(|| by_freshness(a, b))
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

/// Most recent report first; unknown freshness last.
fn by_freshness(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    match (a.record.last_updated, b.record.last_updated) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_distance(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    a.distance_km
        .total_cmp(&b.distance_km)
        .then_with(|| a.record.id.cmp(&b.record.id))
}
