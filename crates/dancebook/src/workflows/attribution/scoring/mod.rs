mod config;
mod policy;
mod rules;

pub use config::AttributionConfig;
pub use policy::{DeferralReason, EligibilityDecision};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::calendar::{is_premium_day, CalendarError};
use super::domain::{Application, ApplicationId, HistoryEntry, Location, Session, Tier, UserId};

/// Stateless scorer applying the fairness model and eligibility gate.
pub struct ScoringEngine {
    config: AttributionConfig,
}

impl ScoringEngine {
    pub fn new(config: AttributionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttributionConfig {
        &self.config
    }

    /// Score one candidate application for `session` against the user's
    /// history and decide its eligibility at `now`.
    pub fn score(
        &self,
        session: &Session,
        location: &Location,
        candidate: &Application,
        tier: Tier,
        history: &[HistoryEntry],
        now: DateTime<Utc>,
    ) -> Result<ScoreSheet, CalendarError> {
        let premium = is_premium_day(session.date, session.slot)?;
        let signals = rules::score_candidate(session, location, premium, history, &self.config, now)?;
        let eligibility = policy::decide_eligibility(tier, &signals, &self.config);

        Ok(ScoreSheet {
            application_id: candidate.id,
            user_id: candidate.user_id,
            location_count: signals.location_count,
            location_score: signals.location_score,
            location_temperature_ratio: signals.location_temperature_ratio,
            location_premium_ratio: signals.location_premium_ratio,
            location_previous_gap_days: signals.location_previous_gap,
            global_score: signals.global_score,
            global_temperature_ratio: signals.global_temperature_ratio,
            remaining_seconds: signals.remaining.num_seconds(),
            premium: signals.premium,
            hotspot: signals.hotspot,
            eligibility,
        })
    }
}

/// Composite score output for one application, persisted and exposed to
/// operators so near-misses stay visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSheet {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub location_count: u32,
    /// Recency-weighted familiarity at the session's location; lower wins.
    pub location_score: f64,
    pub location_temperature_ratio: Option<f64>,
    pub location_premium_ratio: f64,
    pub location_previous_gap_days: Option<i64>,
    /// Familiarity across all locations; secondary tie-break, lower wins.
    pub global_score: f64,
    pub global_temperature_ratio: Option<f64>,
    pub remaining_seconds: i64,
    pub premium: bool,
    pub hotspot: bool,
    pub eligibility: EligibilityDecision,
}

impl ScoreSheet {
    pub fn is_eligible(&self) -> bool {
        self.eligibility.is_eligible()
    }
}
