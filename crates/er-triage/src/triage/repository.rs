use super::lifecycle::{SessionId, TriageSession};

/// Storage abstraction for open triage sessions.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: TriageSession) -> Result<TriageSession, RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError>;

    /// Runs `apply` against the stored session while holding exclusive access,
    /// so concurrent operator actions on one session are serialised.
    fn modify<R>(
        &self,
        id: &SessionId,
        apply: impl FnOnce(&mut TriageSession) -> R,
    ) -> Result<R, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session '{0}' not found")]
    NotFound(SessionId),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}
