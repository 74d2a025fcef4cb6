use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::calendar::CalendarError;
use super::domain::{
    Application, ApplicationId, LocationId, Session, SessionId, Tier, User, UserId,
};
use super::rekey::{rekey_sessions, RekeyError, RekeyReport};
use super::scoring::{AttributionConfig, ScoreSheet, ScoringEngine};
use super::store::{AttributionStore, StoreError};

/// Service composing the store and the scoring engine into the unattended
/// batch decision loop. One instance serializes its batch entry points
/// through an internal gate so an attribution sweep and a renumbering pass
/// can never interleave.
pub struct AttributionService<S> {
    store: Arc<S>,
    engine: ScoringEngine,
    batch_gate: Mutex<()>,
}

impl<S> AttributionService<S>
where
    S: AttributionStore + 'static,
{
    pub fn new(store: Arc<S>, config: AttributionConfig) -> Self {
        Self {
            store,
            engine: ScoringEngine::new(config),
            batch_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Batch entry point: resolve every session whose deadline has elapsed.
    ///
    /// Safe to re-run: granted and locked sessions are no longer candidates,
    /// and a session with no eligible candidate is left untouched for the
    /// next sweep. Per-session data errors are reported and skipped; only a
    /// failure to enumerate sessions aborts the run.
    pub fn run(&self, now: DateTime<Utc>) -> Result<AttributionRunReport, AttributionError> {
        let _gate = self.batch_gate.lock().expect("batch gate poisoned");

        let candidates = self.candidate_sessions(now)?;
        let mut report = AttributionRunReport {
            considered: candidates.len(),
            ..AttributionRunReport::default()
        };

        for session in candidates {
            if let Err(error) = self.resolve_session(&session, now, &mut report) {
                warn!(session = %session.id, %error, "session skipped");
                report.failures.push(SessionFailure {
                    session_id: session.id,
                    error: error.to_string(),
                });
            }
        }

        info!(
            considered = report.considered,
            granted = report.granted.len(),
            pending = report.pending.len(),
            failures = report.failures.len(),
            "attribution sweep finished"
        );
        Ok(report)
    }

    /// Renumber session ids into chronological order. Shares the batch gate
    /// with `run` so the two never overlap on this service instance.
    pub fn rekey(&self) -> Result<RekeyReport, RekeyError> {
        let _gate = self.batch_gate.lock().expect("batch gate poisoned");
        rekey_sessions(self.store.as_ref())
    }

    /// Manual-attribution support: rank the session's candidates right now,
    /// bypassing the session-level deadline, without writing anything.
    pub fn best_candidate(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<CandidateReport, AttributionError> {
        let session = self
            .store
            .session(session_id)?
            .ok_or(AttributionError::SessionNotFound(session_id))?;
        let scored = self.score_session(&session, now)?;
        let (mut ranked, held): (Vec<_>, Vec<_>) = scored
            .into_iter()
            .partition(|candidate| candidate.wins_allowed());
        rank(&mut ranked);

        Ok(CandidateReport {
            session_id,
            ranked: ranked.into_iter().map(ScoredCandidate::into_view).collect(),
            deferred: held.into_iter().map(ScoredCandidate::into_view).collect(),
        })
    }

    /// Sessions ready for automatic attribution: open, bid on, and at or
    /// inside their sliding deadline, ordered by start then creation.
    fn candidate_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, AttributionError> {
        let config = self.engine.config();
        let mut candidates = Vec::new();

        for session in self.store.sessions()? {
            if session.locked.is_some() || session.granted() {
                continue;
            }
            let start = session.start();
            let remaining = start - now;
            if remaining <= Duration::zero() {
                continue;
            }
            let earliest = self
                .store
                .applications_for_session(session.id)?
                .into_iter()
                .filter(|application| application.active_at(start, config.cancellation_grace))
                .map(|application| application.created)
                .min();
            let Some(earliest) = earliest else {
                continue;
            };
            if remaining <= sliding_deadline(start - earliest, config) {
                candidates.push(session);
            }
        }

        candidates.sort_by(|a, b| {
            a.start()
                .cmp(&b.start())
                .then_with(|| a.created.cmp(&b.created))
        });
        Ok(candidates)
    }

    fn resolve_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
        report: &mut AttributionRunReport,
    ) -> Result<(), AttributionError> {
        let scored = self.score_session(session, now)?;

        // Winners and losers alike keep their last rank value for audit.
        for candidate in &scored {
            self.store
                .record_score(candidate.application.id, candidate.sheet.location_score, now)?;
        }

        let mut ranked: Vec<&ScoredCandidate> = scored
            .iter()
            .filter(|candidate| candidate.wins_allowed())
            .collect();
        ranked.sort_by(|a, b| rank_order(a, b));

        let Some(winner) = ranked.first() else {
            debug!(session = %session.id, "no eligible candidate yet");
            report.pending.push(PendingSession {
                session_id: session.id,
                cause: PendingCause::NoEligibleCandidate,
            });
            return Ok(());
        };

        let outcome = self
            .store
            .grant(session.id, winner.application.id, now)?;
        if outcome.granted() {
            info!(
                session = %session.id,
                application = %winner.application.id,
                user = %winner.user.id,
                score = winner.sheet.location_score,
                "session granted"
            );
            report.granted.push(GrantedSession {
                session_id: session.id,
                application_id: winner.application.id,
                user_id: winner.user.id,
                score: winner.sheet.location_score,
            });
        } else {
            debug!(session = %session.id, ?outcome, "grant raced, leaving session");
            report.pending.push(PendingSession {
                session_id: session.id,
                cause: PendingCause::GrantConflict,
            });
        }
        Ok(())
    }

    /// Score every active application on the session.
    fn score_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, AttributionError> {
        let config = self.engine.config();
        let location = self.store.location(session.location_id)?.ok_or(
            AttributionError::MissingLocation {
                session: session.id,
                location: session.location_id,
            },
        )?;

        let start = session.start();
        let mut scored = Vec::new();
        for application in self.store.applications_for_session(session.id)? {
            if !application.active_at(start, config.cancellation_grace) {
                continue;
            }
            let user = self.store.user(application.user_id)?.ok_or(
                AttributionError::MissingUser {
                    application: application.id,
                    user: application.user_id,
                },
            )?;
            let history = self.store.user_history(application.user_id)?;
            let sheet = self
                .engine
                .score(session, &location, &application, user.tier, &history, now)?;
            scored.push(ScoredCandidate {
                application,
                user,
                sheet,
            });
        }
        Ok(scored)
    }
}

/// Sliding deadline: sessions booked far ahead open for attribution earlier
/// than `senior_delay` in proportion to how long they sat on the books.
fn sliding_deadline(creation_to_start: Duration, config: &AttributionConfig) -> Duration {
    let senior = config.senior_delay.num_seconds();
    let regular = config.regular_delay.num_seconds();
    let scaled =
        (creation_to_start.num_seconds() as f64 * regular as f64 / senior as f64).round() as i64;
    Duration::seconds(scaled.min(senior))
}

struct ScoredCandidate {
    application: Application,
    user: User,
    sheet: ScoreSheet,
}

impl ScoredCandidate {
    /// Canceled bids are scored for the audit trail but can never win.
    fn wins_allowed(&self) -> bool {
        self.sheet.is_eligible() && self.application.canceled.is_none()
    }

    fn into_view(self) -> CandidateView {
        CandidateView {
            application_id: self.application.id,
            user_id: self.user.id,
            user_name: self.user.name,
            tier: self.user.tier,
            sheet: self.sheet,
        }
    }
}

fn rank(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| rank_order(a, b));
}

/// Total order over candidates: lower location familiarity first, then lower
/// global familiarity, then earlier application, then lower user id.
fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    a.sheet
        .location_score
        .total_cmp(&b.sheet.location_score)
        .then_with(|| a.sheet.global_score.total_cmp(&b.sheet.global_score))
        .then_with(|| a.application.created.cmp(&b.application.created))
        .then_with(|| a.application.user_id.cmp(&b.application.user_id))
}

/// Aggregate outcome of one batch sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttributionRunReport {
    /// Number of sessions past their deadline this sweep.
    pub considered: usize,
    pub granted: Vec<GrantedSession>,
    pub pending: Vec<PendingSession>,
    pub failures: Vec<SessionFailure>,
}

impl AttributionRunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrantedSession {
    pub session_id: SessionId,
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingSession {
    pub session_id: SessionId,
    pub cause: PendingCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingCause {
    NoEligibleCandidate,
    GrantConflict,
}

impl PendingCause {
    pub const fn label(self) -> &'static str {
        match self {
            PendingCause::NoEligibleCandidate => "no eligible candidate yet",
            PendingCause::GrantConflict => "grant raced with another writer",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionFailure {
    pub session_id: SessionId,
    pub error: String,
}

/// Ranked candidates for one session, winner first, with the gated rest.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub session_id: SessionId,
    pub ranked: Vec<CandidateView>,
    pub deferred: Vec<CandidateView>,
}

impl CandidateReport {
    pub fn winner(&self) -> Option<&CandidateView> {
        self.ranked.first()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub user_name: String,
    pub tier: Tier,
    pub sheet: ScoreSheet,
}

/// Error raised while attributing sessions.
#[derive(Debug, thiserror::Error)]
pub enum AttributionError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session {session} references missing location {location}")]
    MissingLocation {
        session: SessionId,
        location: LocationId,
    },
    #[error("application {application} references missing user {user}")]
    MissingUser {
        application: ApplicationId,
        user: UserId,
    },
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
