//! Symptom-aware emergency-room ranking and call-around tracking.

pub mod domain;
pub mod geo;
pub mod handoff;
pub mod lifecycle;
pub mod providers;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
pub mod snapshot;

pub use domain::{
    merge_records, Availability, BedCategory, DirectoryEntry, EquipmentKind, FacilitySnapshot,
    HospitalId, HospitalRecord, LiveFeedEntry,
};
pub use geo::{Coordinates, RouteEstimate, RouteSource};
pub use lifecycle::{
    Backfill, CallOutcome, CandidateEntry, CandidateStatus, LifecycleError, OutcomeReport,
    SessionId, SessionSnapshot, SurfaceReport, TriageSession,
};
pub use providers::{
    GeocodingService, HospitalDirectoryProvider, LiveBedFeedProvider, ProviderError, Region,
    ReverseGeocode, RoutingService,
};
pub use ranking::{
    Placement, RankedCandidate, RankingConfig, RankingEngine, RankingNotice, RankingOutcome,
    SortMode,
};
pub use repository::{RepositoryError, SessionRepository};
pub use router::triage_router;
pub use rules::{RuleTableError, SymptomCategory, SymptomRule, SymptomRuleTable};
pub use service::{Recommendation, TriageRequest, TriageService, TriageServiceError};
pub use snapshot::{HospitalSnapshot, SnapshotImportError};
