use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::super::domain::Tier;
use super::config::AttributionConfig;
use super::rules::ScoreSignals;

/// Why a candidate must wait for a last-chance window before it can win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferralReason {
    /// Guests who won at this location within the recent-gap window.
    RecentWinAtLocation,
    /// Regulars and below bidding on a premium day at a hotspot.
    PremiumHotspot,
    /// Seniors and below with few wins at this location.
    LowFamiliarity,
    /// Seniors and below whose wins here lean premium-heavy.
    PremiumHeavyHistory,
    /// Seniors and below enjoying a clear comfort advantage here.
    TemperatureAdvantage,
}

/// Outcome of the eligibility gate for one candidate at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum EligibilityDecision {
    Eligible,
    /// Every listed clause must clear before the candidate can win; the
    /// window is the tightest one among them, in seconds before start.
    Deferred {
        window_seconds: i64,
        reasons: Vec<DeferralReason>,
    },
    /// Base-tier members have no bidding rights at all.
    Barred,
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, EligibilityDecision::Eligible)
    }
}

/// Apply the tier exception clauses. Each clause that applies to the
/// candidate must also satisfy its delay window; the clauses only ever
/// relax as the tier rises.
pub(crate) fn decide_eligibility(
    tier: Tier,
    signals: &ScoreSignals,
    config: &AttributionConfig,
) -> EligibilityDecision {
    if !tier.may_bid() {
        return EligibilityDecision::Barred;
    }

    let mut reasons = Vec::new();
    let mut window: Option<Duration> = None;
    let mut defer = |reason: DeferralReason, clause_window: Duration| {
        reasons.push(reason);
        window = Some(window.map_or(clause_window, |current| current.min(clause_window)));
    };

    if tier <= Tier::Guest
        && signals
            .location_previous_gap
            .is_some_and(|gap| gap <= config.recent_win_gap_days)
        && signals.remaining > config.guest_delay
    {
        defer(DeferralReason::RecentWinAtLocation, config.guest_delay);
    }

    if tier <= Tier::Regular
        && signals.premium
        && signals.hotspot
        && signals.remaining > config.regular_delay
    {
        defer(DeferralReason::PremiumHotspot, config.regular_delay);
    }

    if tier <= Tier::Senior && signals.remaining > config.regular_delay {
        if signals.location_count <= config.familiarity_threshold {
            defer(DeferralReason::LowFamiliarity, config.regular_delay);
        }
        if signals.location_premium_ratio >= 1.0 {
            defer(DeferralReason::PremiumHeavyHistory, config.regular_delay);
        }
        if let (Some(here), Some(elsewhere)) = (
            signals.location_temperature_ratio,
            signals.global_temperature_ratio,
        ) {
            if here >= elsewhere + config.temperature_margin {
                defer(DeferralReason::TemperatureAdvantage, config.regular_delay);
            }
        }
    }

    match window {
        None => EligibilityDecision::Eligible,
        Some(window) => EligibilityDecision::Deferred {
            window_seconds: window.num_seconds(),
            reasons,
        },
    }
}
