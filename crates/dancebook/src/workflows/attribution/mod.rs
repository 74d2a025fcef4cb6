//! Automatic attribution of contested session slots.
//!
//! The pieces compose one way: the calendar classifier feeds the score
//! model, the score model feeds the eligibility gate, and the selector
//! orchestrates all three over the store, writing back scores and at most
//! one winner per session. The rekey routine runs on its own cadence and
//! only ever touches identifiers; scores are always re-derived from current
//! data, so the two tolerate each other across runs as long as they never
//! overlap.

pub mod calendar;
pub mod domain;
pub mod rekey;
pub mod router;
pub mod scoring;
pub mod selector;
pub mod store;

#[cfg(test)]
mod tests;

pub use calendar::{easter_sunday, is_premium_day, CalendarError};
pub use domain::{
    Application, ApplicationId, DanceId, HistoryEntry, Location, LocationId, Session, SessionId,
    Slot, Tier, User, UserId, WeatherSample,
};
pub use rekey::{rekey_sessions, RekeyError, RekeyReport};
pub use router::attribution_router;
pub use scoring::{
    AttributionConfig, DeferralReason, EligibilityDecision, ScoreSheet, ScoringEngine,
};
pub use selector::{
    AttributionError, AttributionRunReport, AttributionService, CandidateReport, CandidateView,
    GrantedSession, PendingCause, PendingSession, SessionFailure,
};
pub use store::{
    ApplicationDraft, AttributionStore, GrantOutcome, MemoryStore, RekeyTransaction, SessionDraft,
    StoreError,
};
