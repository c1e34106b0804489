//! Candidate lifecycle tracking for one operator session.

mod session;
mod status;

#[cfg(test)]
mod tests;

pub use session::{
    Backfill, LifecycleError, OutcomeReport, SessionSnapshot, SurfaceReport, TriageSession,
};
pub use status::{CallOutcome, CandidateEntry, CandidateStatus, SessionId};
