use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use super::super::domain::{HospitalId, HospitalRecord};
use super::super::ranking::{Placement, RankedCandidate, RankingOutcome};
use super::status::{CallOutcome, CandidateEntry, CandidateStatus, SessionId};

/// Errors raised by operator actions against a session.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("hospital '{0}' has not been surfaced in this session")]
    UnknownHospital(HospitalId),
    #[error("hospital '{hospital_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        hospital_id: HospitalId,
        from: CandidateStatus,
        to: CandidateStatus,
    },
    #[error("session already resolved by hospital '{approved}'")]
    SessionResolved { approved: HospitalId },
}

/// Result of refilling a slot vacated by a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backfill {
    Promoted { hospital_id: HospitalId, slot: usize },
    PoolExhausted { slot: usize },
}

/// What a call outcome changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeReport {
    pub hospital_id: HospitalId,
    pub status: CandidateStatus,
    pub resolved: bool,
    pub backfill: Option<Backfill>,
}

/// What a ranking refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceReport {
    pub newly_surfaced: Vec<HospitalId>,
    pub active: Vec<HospitalId>,
    pub skipped_rejected: usize,
    pub resolved: bool,
}

/// Serializable view of a session for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub resolved: bool,
    pub approved: Option<HospitalId>,
    pub active: Vec<Option<CandidateEntry>>,
    pub hospital_stack: Vec<CandidateEntry>,
    pub rejected: Vec<HospitalId>,
    pub backup_pool: Vec<HospitalId>,
}

/// Per-operator lifecycle tracker.
///
/// Owns the append-only hospital stack, the visible slots, the backup pool
/// and the rejected set. At most one hospital is ever approved; once that
/// happens the session is resolved and stops surfacing candidates.
#[derive(Debug, Clone)]
pub struct TriageSession {
    id: SessionId,
    hospital_stack: Vec<CandidateEntry>,
    slots: Vec<Option<HospitalId>>,
    backup_pool: Vec<RankedCandidate>,
    rejected: BTreeSet<HospitalId>,
    approved: Option<HospitalId>,
}

impl TriageSession {
    pub fn new(id: SessionId, slot_count: usize) -> Self {
        Self {
            id,
            hospital_stack: Vec::new(),
            slots: vec![None; slot_count],
            backup_pool: Vec::new(),
            rejected: BTreeSet::new(),
            approved: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn hospital_stack(&self) -> &[CandidateEntry] {
        &self.hospital_stack
    }

    pub fn slots(&self) -> &[Option<HospitalId>] {
        &self.slots
    }

    /// Entries currently occupying a visible slot, in slot order.
    pub fn active(&self) -> Vec<&CandidateEntry> {
        self.slots
            .iter()
            .flatten()
            .filter_map(|id| self.entry(id))
            .collect()
    }

    pub fn backup_pool(&self) -> &[RankedCandidate] {
        &self.backup_pool
    }

    pub fn rejected(&self) -> &BTreeSet<HospitalId> {
        &self.rejected
    }

    pub fn approved(&self) -> Option<&HospitalId> {
        self.approved.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.approved.is_some()
    }

    pub fn entry(&self, hospital_id: &HospitalId) -> Option<&CandidateEntry> {
        self.hospital_stack
            .iter()
            .find(|entry| &entry.hospital_id == hospital_id)
    }

    pub fn status_of(&self, hospital_id: &HospitalId) -> Option<CandidateStatus> {
        self.entry(hospital_id).map(|entry| entry.status)
    }

    /// Drops records the operator has already ruled out.
    pub fn exclude_rejected(&self, records: Vec<HospitalRecord>) -> Vec<HospitalRecord> {
        records
            .into_iter()
            .filter(|record| !self.rejected.contains(&record.id))
            .collect()
    }

    /// Applies a fresh ranking to the visible slots.
    ///
    /// Hospitals already being called keep their slot. Remaining slots take
    /// the ranked candidates in order; first-time hospitals join the stack
    /// as pending. Qualified hospitals that no longer fit are queued ahead
    /// of the ranking's backup pool. Rejected hospitals never resurface.
    pub fn surface(&mut self, outcome: &RankingOutcome) -> SurfaceReport {
        if let Some(approved) = &self.approved {
            info!(session_id = %self.id, approved = %approved, "session resolved, not surfacing candidates");
            return SurfaceReport {
                active: self.slots.iter().flatten().cloned().collect(),
                resolved: true,
                ..SurfaceReport::default()
            };
        }

        let mut report = SurfaceReport::default();
        let slot_count = self.slots.len();
        let mut next: Vec<HospitalId> = self
            .slots
            .iter()
            .flatten()
            .filter(|id| self.status_of(id) == Some(CandidateStatus::Calling))
            .cloned()
            .collect();

        let mut overflow: Vec<RankedCandidate> = Vec::new();
        for candidate in &outcome.ordered {
            let id = &candidate.record.id;
            if self.rejected.contains(id) {
                report.skipped_rejected += 1;
                continue;
            }
            if next.contains(id) {
                continue;
            }
            if next.len() >= slot_count {
                // Qualified hospitals displaced by calling entries stay first in line.
                if candidate.placement == Placement::Qualified && self.entry(id).is_none() {
                    overflow.push(candidate.clone());
                }
                continue;
            }
            if self.entry(id).is_none() {
                self.push_entry(candidate);
                report.newly_surfaced.push(id.clone());
            }
            next.push(id.clone());
        }

        report.active = next.clone();
        let mut slots: Vec<Option<HospitalId>> = next.into_iter().map(Some).collect();
        slots.resize(slot_count, None);
        self.slots = slots;

        self.backup_pool = overflow
            .into_iter()
            .chain(outcome.backup_pool.iter().cloned())
            .filter(|candidate| {
                !self.rejected.contains(&candidate.record.id)
                    && !self.slots.iter().flatten().any(|id| id == &candidate.record.id)
            })
            .collect();

        info!(
            session_id = %self.id,
            surfaced = report.newly_surfaced.len(),
            backups = self.backup_pool.len(),
            "ranking surfaced into session"
        );
        report
    }

    /// Ranked rows for the hospitals in the visible slots, numbered by slot.
    ///
    /// Slots kept by in-progress calls may hold hospitals the latest ranking
    /// pushed into its backup pool, so both pools are searched.
    pub fn visible_candidates(&self, outcome: &RankingOutcome) -> Vec<RankedCandidate> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, id)| {
                let id = id.as_ref()?;
                let candidate = outcome
                    .ordered
                    .iter()
                    .chain(&outcome.backup_pool)
                    .chain(&self.backup_pool)
                    .find(|candidate| &candidate.record.id == id)?;
                Some(RankedCandidate {
                    rank: slot + 1,
                    ..candidate.clone()
                })
            })
            .collect()
    }

    /// `pending -> calling`.
    pub fn begin_call(&mut self, hospital_id: &HospitalId) -> Result<(), LifecycleError> {
        if let Some(approved) = &self.approved {
            return Err(LifecycleError::SessionResolved {
                approved: approved.clone(),
            });
        }

        let session_id = self.id.clone();
        let entry = self.entry_mut(hospital_id)?;
        if entry.status != CandidateStatus::Pending {
            return Err(LifecycleError::InvalidTransition {
                hospital_id: hospital_id.clone(),
                from: entry.status,
                to: CandidateStatus::Calling,
            });
        }

        entry.status = CandidateStatus::Calling;
        info!(session_id = %session_id, hospital_id = %hospital_id, "calling hospital");
        Ok(())
    }

    /// `calling -> approved | rejected`, backfilling the vacated slot on rejection.
    pub fn record_outcome(
        &mut self,
        hospital_id: &HospitalId,
        outcome: CallOutcome,
    ) -> Result<OutcomeReport, LifecycleError> {
        let target = outcome.target_status();
        let current = self
            .status_of(hospital_id)
            .ok_or_else(|| LifecycleError::UnknownHospital(hospital_id.clone()))?;

        if current != CandidateStatus::Calling {
            return Err(LifecycleError::InvalidTransition {
                hospital_id: hospital_id.clone(),
                from: current,
                to: target,
            });
        }

        if target == CandidateStatus::Approved {
            if let Some(approved) = &self.approved {
                return Err(LifecycleError::SessionResolved {
                    approved: approved.clone(),
                });
            }
            self.entry_mut(hospital_id)?.status = CandidateStatus::Approved;
            self.approved = Some(hospital_id.clone());
            info!(session_id = %self.id, hospital_id = %hospital_id, "hospital accepted, session resolved");

            return Ok(OutcomeReport {
                hospital_id: hospital_id.clone(),
                status: CandidateStatus::Approved,
                resolved: true,
                backfill: None,
            });
        }

        self.entry_mut(hospital_id)?.status = CandidateStatus::Rejected;
        self.rejected.insert(hospital_id.clone());
        info!(session_id = %self.id, hospital_id = %hospital_id, ?outcome, "hospital rejected");

        let slot = self
            .slots
            .iter()
            .position(|occupant| occupant.as_ref() == Some(hospital_id));
        let backfill = match slot {
            Some(slot) if !self.is_resolved() => Some(self.backfill(slot)),
            Some(slot) => {
                self.slots[slot] = None;
                None
            }
            None => None,
        };

        Ok(OutcomeReport {
            hospital_id: hospital_id.clone(),
            status: CandidateStatus::Rejected,
            resolved: self.is_resolved(),
            backfill,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            resolved: self.is_resolved(),
            approved: self.approved.clone(),
            active: self
                .slots
                .iter()
                .map(|slot| slot.as_ref().and_then(|id| self.entry(id)).cloned())
                .collect(),
            hospital_stack: self.hospital_stack.clone(),
            rejected: self.rejected.iter().cloned().collect(),
            backup_pool: self
                .backup_pool
                .iter()
                .map(|candidate| candidate.record.id.clone())
                .collect(),
        }
    }

    fn backfill(&mut self, slot: usize) -> Backfill {
        while !self.backup_pool.is_empty() {
            let candidate = self.backup_pool.remove(0);
            let id = &candidate.record.id;
            if self.rejected.contains(id) || self.entry(id).is_some() {
                continue;
            }

            self.push_entry(&candidate);
            self.slots[slot] = Some(id.clone());
            info!(session_id = %self.id, hospital_id = %id, slot, "promoted backup hospital");
            return Backfill::Promoted {
                hospital_id: id.clone(),
                slot,
            };
        }

        self.slots[slot] = None;
        warn!(session_id = %self.id, slot, "backup pool exhausted, slot left empty");
        Backfill::PoolExhausted { slot }
    }

    fn push_entry(&mut self, candidate: &RankedCandidate) {
        self.hospital_stack.push(CandidateEntry {
            hospital_id: candidate.record.id.clone(),
            hospital_name: candidate.record.display_name().to_string(),
            status: CandidateStatus::Pending,
            meets_eligibility: candidate.meets_eligibility,
            surfaced_at_rank: candidate.rank,
        });
    }

    fn entry_mut(&mut self, hospital_id: &HospitalId) -> Result<&mut CandidateEntry, LifecycleError> {
        self.hospital_stack
            .iter_mut()
            .find(|entry| &entry.hospital_id == hospital_id)
            .ok_or_else(|| LifecycleError::UnknownHospital(hospital_id.clone()))
    }
}
