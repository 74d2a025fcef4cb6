mod memory;

pub use memory::{ApplicationDraft, MemoryStore, SessionDraft};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationId, HistoryEntry, Location, LocationId, Session, SessionId, User,
    UserId,
};

/// Storage abstraction so the selector and rekey routine can be exercised
/// against any backing store.
pub trait AttributionStore: Send + Sync {
    fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError>;
    /// All sessions, ascending by id.
    fn sessions(&self) -> Result<Vec<Session>, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;
    fn applications_for_session(&self, id: SessionId)
        -> Result<Vec<Application>, StoreError>;
    /// The user's applications joined with their sessions, for scoring.
    fn user_history(&self, id: UserId) -> Result<Vec<HistoryEntry>, StoreError>;
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    fn location(&self, id: LocationId) -> Result<Option<Location>, StoreError>;
    /// Write back a computed rank value and bump the application's `updated`.
    fn record_score(
        &self,
        id: ApplicationId,
        score: f64,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Link the winning application, re-checking under the store lock that
    /// the session is still open and the application still standing.
    fn grant(
        &self,
        session_id: SessionId,
        application_id: ApplicationId,
        updated: DateTime<Utc>,
    ) -> Result<GrantOutcome, StoreError>;
    /// Open a renumbering unit of work; dropping it without commit rolls back.
    fn begin_rekey(&self) -> Result<Box<dyn RekeyTransaction>, StoreError>;
}

/// Result of a winner write attempt. Anything but `Granted` is a benign
/// race with a lock, cancel, or competing attribution and is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOutcome {
    Granted,
    AlreadyGranted,
    Locked,
    SessionMissing,
    ApplicationWithdrawn,
}

impl GrantOutcome {
    pub const fn granted(self) -> bool {
        matches!(self, GrantOutcome::Granted)
    }
}

/// Renumbering unit of work. Session ids move one at a time, cascading the
/// application foreign keys; a move onto an occupied id is a `Conflict`,
/// which is why callers stage through a disjoint temporary range.
pub trait RekeyTransaction {
    /// Current session ids with their computed start instants.
    fn session_order(&self) -> Vec<(SessionId, DateTime<Utc>)>;
    fn max_session_id(&self) -> SessionId;
    fn move_session(&mut self, from: SessionId, to: SessionId) -> Result<(), StoreError>;
    /// Point the id sequence at the new maximum after renumbering.
    fn reset_sequence(&mut self, max: SessionId);
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
