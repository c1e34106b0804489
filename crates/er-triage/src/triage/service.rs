use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{merge_records, HospitalId};
use super::geo::{Coordinates, RouteEstimate};
use super::handoff::{sbar_note, HandoffContext};
use super::lifecycle::{
    CallOutcome, LifecycleError, OutcomeReport, SessionId, SessionSnapshot, SurfaceReport,
    TriageSession,
};
use super::providers::{
    guess_region_from_address, GeocodingService, HospitalDirectoryProvider, LiveBedFeedProvider,
    ProviderError, Region, RoutingService,
};
use super::ranking::{RankedCandidate, RankingConfig, RankingEngine, RankingOutcome, SortMode};
use super::repository::{RepositoryError, SessionRepository};
use super::rules::{RuleTableError, SymptomCategory, SymptomRule, SymptomRuleTable};

/// One ranking request from the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRequest {
    pub symptom: SymptomCategory,
    pub location: Coordinates,
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub sort_mode: Option<SortMode>,
    #[serde(default)]
    pub field_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRoute {
    pub hospital_id: HospitalId,
    pub route: RouteEstimate,
}

/// Ranking plus everything the operator needs to act on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub session_id: SessionId,
    pub symptom: SymptomCategory,
    pub symptom_label: String,
    pub region: Region,
    pub address: Option<String>,
    pub outcome: RankingOutcome,
    pub surfaced: SurfaceReport,
    pub routes: Vec<CandidateRoute>,
    pub handoff: String,
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum TriageServiceError {
    #[error("request location is not a valid latitude/longitude pair")]
    InvalidLocation,
    #[error("could not resolve a region for the request location")]
    RegionUnresolved,
    #[error(transparent)]
    Rules(#[from] RuleTableError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Ranking computed for a request, before it is applied to a session.
struct Ranked<'r> {
    rule: &'r SymptomRule,
    region: Region,
    address: Option<String>,
    outcome: RankingOutcome,
}

/// Service composing the providers, rule table, ranking engine and session store.
pub struct TriageService<D, F, S> {
    directory: Arc<D>,
    feed: Arc<F>,
    sessions: Arc<S>,
    geocoder: Option<Arc<dyn GeocodingService>>,
    routing: Option<Arc<dyn RoutingService>>,
    rules: Arc<SymptomRuleTable>,
    engine: RankingEngine,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("triage-{id:06}"))
}

impl<D, F, S> TriageService<D, F, S>
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    pub fn new(
        directory: Arc<D>,
        feed: Arc<F>,
        sessions: Arc<S>,
        rules: SymptomRuleTable,
        config: RankingConfig,
    ) -> Self {
        Self {
            directory,
            feed,
            sessions,
            geocoder: None,
            routing: None,
            rules: Arc::new(rules),
            engine: RankingEngine::new(config),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn GeocodingService>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_routing(mut self, routing: Arc<dyn RoutingService>) -> Self {
        self.routing = Some(routing);
        self
    }

    pub fn rules(&self) -> &SymptomRuleTable {
        &self.rules
    }

    pub fn ranking_config(&self) -> &RankingConfig {
        self.engine.config()
    }

    /// Creates and stores an empty session.
    pub fn open_session(&self) -> Result<SessionSnapshot, TriageServiceError> {
        let session = TriageSession::new(next_session_id(), self.engine.config().top_n);
        let stored = self.sessions.insert(session)?;
        info!(session_id = %stored.id(), "opened triage session");
        Ok(stored.snapshot())
    }

    pub fn session(&self, id: &SessionId) -> Result<SessionSnapshot, TriageServiceError> {
        Ok(self.load(id)?.snapshot())
    }

    /// Ranks for a stored session and persists the surfaced candidates.
    ///
    /// Lookups and ranking run against a copy. Only surfacing holds the
    /// stored session.
    pub fn recommend(
        &self,
        id: &SessionId,
        request: &TriageRequest,
    ) -> Result<Recommendation, TriageServiceError> {
        let ranked = self.rank(&self.load(id)?, request)?;
        let (surfaced, visible) = self.sessions.modify(id, |session| {
            let surfaced = session.surface(&ranked.outcome);
            (surfaced, session.visible_candidates(&ranked.outcome))
        })?;
        Ok(self.assemble(id.clone(), request, ranked, surfaced, &visible))
    }

    pub fn begin_call(
        &self,
        id: &SessionId,
        hospital_id: &HospitalId,
    ) -> Result<SessionSnapshot, TriageServiceError> {
        let snapshot = self.sessions.modify(id, |session| {
            session
                .begin_call(hospital_id)
                .map(|()| session.snapshot())
        })??;
        Ok(snapshot)
    }

    pub fn record_outcome(
        &self,
        id: &SessionId,
        hospital_id: &HospitalId,
        outcome: CallOutcome,
    ) -> Result<OutcomeReport, TriageServiceError> {
        let report = self
            .sessions
            .modify(id, |session| session.record_outcome(hospital_id, outcome))??;
        Ok(report)
    }

    /// Full pipeline against a caller-owned session: region, lookups, merge,
    /// rejected-id filter, ranking, surfacing and route enrichment.
    pub fn recommend_into(
        &self,
        session: &mut TriageSession,
        request: &TriageRequest,
    ) -> Result<Recommendation, TriageServiceError> {
        let ranked = self.rank(session, request)?;
        let surfaced = session.surface(&ranked.outcome);
        let visible = session.visible_candidates(&ranked.outcome);
        Ok(self.assemble(session.id().clone(), request, ranked, surfaced, &visible))
    }

    fn rank<'r>(
        &'r self,
        session: &TriageSession,
        request: &TriageRequest,
    ) -> Result<Ranked<'r>, TriageServiceError> {
        if !request.location.is_valid() {
            return Err(TriageServiceError::InvalidLocation);
        }
        let rule = self.rules.get(&request.symptom)?;
        let (region, address) = self.resolve_region(request)?;

        let directory = self.directory.lookup(&region)?;
        let feed = match self.feed.lookup(&region) {
            Ok(feed) => feed,
            Err(err) => {
                warn!(%region, error = %err, "live bed feed unavailable, treating capacity as unknown");
                Vec::new()
            }
        };

        let records = session.exclude_rejected(merge_records(directory, feed));
        let mode = request.sort_mode.unwrap_or(self.engine.config().sort_mode);
        let outcome = self.engine.rank_by(&records, rule, request.location, mode);

        info!(
            session_id = %session.id(),
            symptom = %request.symptom,
            %region,
            scanned = outcome.summary.scanned,
            eligible = outcome.summary.eligible,
            mode = mode.label(),
            "recommendation ready"
        );

        Ok(Ranked {
            rule,
            region,
            address,
            outcome,
        })
    }

    fn assemble(
        &self,
        session_id: SessionId,
        request: &TriageRequest,
        ranked: Ranked<'_>,
        surfaced: SurfaceReport,
        visible: &[RankedCandidate],
    ) -> Recommendation {
        let Ranked {
            rule,
            region,
            address,
            outcome,
        } = ranked;
        let routes = self.routes_for(request.location, visible);
        let handoff = sbar_note(
            &HandoffContext {
                rule,
                origin: request.location,
                address: address.as_deref(),
                field_note: request.field_note.as_deref(),
            },
            visible,
        );

        Recommendation {
            session_id,
            symptom: rule.category.clone(),
            symptom_label: rule.label.clone(),
            region,
            address,
            outcome,
            surfaced,
            routes,
            handoff,
        }
    }

    /// Explicit region, then reverse geocoding, then a guess from the address.
    pub fn resolve_region(
        &self,
        request: &TriageRequest,
    ) -> Result<(Region, Option<String>), TriageServiceError> {
        let mut address = request.address.clone();
        if let Some(region) = &request.region {
            return Ok((region.clone(), address));
        }

        if let Some(geocoder) = &self.geocoder {
            match geocoder.reverse(request.location) {
                Ok(answer) => {
                    if address.is_none() {
                        address = answer.address;
                    }
                    if let Some(region) = answer.region {
                        return Ok((region, address));
                    }
                }
                Err(err) => warn!(error = %err, "reverse geocoding failed, guessing region from address"),
            }
        }

        address
            .as_deref()
            .and_then(guess_region_from_address)
            .map(|region| (region, address.clone()))
            .ok_or(TriageServiceError::RegionUnresolved)
    }

    fn routes_for(&self, origin: Coordinates, candidates: &[RankedCandidate]) -> Vec<CandidateRoute> {
        candidates
            .iter()
            .filter_map(|candidate| {
                let destination = candidate.record.coordinates?;
                let route = match &self.routing {
                    Some(routing) => routing.route(origin, destination).unwrap_or_else(|err| {
                        warn!(hospital_id = %candidate.record.id, error = %err, "routing failed, using estimate");
                        RouteEstimate::estimated(origin, destination)
                    }),
                    None => RouteEstimate::estimated(origin, destination),
                };
                Some(CandidateRoute {
                    hospital_id: candidate.record.id.clone(),
                    route,
                })
            })
            .collect()
    }

    fn load(&self, id: &SessionId) -> Result<TriageSession, TriageServiceError> {
        self.sessions
            .fetch(id)?
            .ok_or_else(|| RepositoryError::NotFound(id.clone()).into())
    }
}
