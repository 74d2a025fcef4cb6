use chrono::{DateTime, Duration, Utc};

use super::super::calendar::{is_premium_day, CalendarError};
use super::super::domain::{HistoryEntry, Location, Session};
use super::config::AttributionConfig;

/// Raw per-candidate signals the eligibility gate and ranking consume.
pub(crate) struct ScoreSignals {
    pub location_count: u32,
    pub location_score: f64,
    pub location_temperature_ratio: Option<f64>,
    pub location_premium_ratio: f64,
    pub location_previous_gap: Option<i64>,
    pub global_score: f64,
    pub global_temperature_ratio: Option<f64>,
    pub remaining: Duration,
    pub premium: bool,
    pub hotspot: bool,
}

/// Running mean without keeping the samples around.
#[derive(Default)]
struct RatioAccumulator {
    sum: f64,
    samples: u32,
}

impl RatioAccumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.samples += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / f64::from(self.samples))
    }
}

/// Compute the fairness signals for one candidate application on `session`.
///
/// Only prior *wins* count: active applications on other sessions that were
/// granted to that very application and are not locked, within the trailing
/// window around the session start. Day gaps are whole-day date differences;
/// a zero-day gap contributes nothing to the reciprocal sums but still drives
/// the previous-gap minimum.
pub(crate) fn score_candidate(
    session: &Session,
    location: &Location,
    premium: bool,
    history: &[HistoryEntry],
    config: &AttributionConfig,
    now: DateTime<Utc>,
) -> Result<ScoreSignals, CalendarError> {
    let start = session.start();

    let mut location_count = 0u32;
    let mut location_score = 0.0f64;
    let mut global_score = 0.0f64;
    let mut premium_wins = 0u32;
    let mut plain_wins = 0u32;
    let mut location_previous_gap: Option<i64> = None;
    let mut location_comfort = RatioAccumulator::default();
    let mut global_comfort = RatioAccumulator::default();

    for entry in history {
        if entry.session.id == session.id {
            continue;
        }
        if !is_prior_win(entry, config) {
            continue;
        }

        let gap_days = (start.date_naive() - entry.session.start().date_naive())
            .num_days()
            .abs();
        if gap_days > config.history_window_days {
            continue;
        }

        if gap_days > 0 {
            global_score += 1.0 / gap_days as f64;
        }

        if entry.session.location_id == session.location_id {
            location_count += 1;
            if gap_days > 0 {
                location_score += 1.0 / gap_days as f64;
            }
            location_previous_gap =
                Some(location_previous_gap.map_or(gap_days, |gap| gap.min(gap_days)));
            if is_premium_day(entry.session.date, entry.session.slot)? {
                premium_wins += 1;
            } else {
                plain_wins += 1;
            }
            if let Some(weather) = entry.session.weather {
                location_comfort.push(weather.comfort_ratio());
            }
        } else if let Some(weather) = entry.session.weather {
            global_comfort.push(weather.comfort_ratio());
        }
    }

    Ok(ScoreSignals {
        location_count,
        location_score,
        location_temperature_ratio: location_comfort.mean(),
        // Laplace smoothing keeps the ratio defined for empty histories.
        location_premium_ratio: f64::from(premium_wins + 1) / f64::from(plain_wins + 1),
        location_previous_gap,
        global_score,
        global_temperature_ratio: global_comfort.mean(),
        remaining: start - now,
        premium,
        hotspot: location.hotspot,
    })
}

fn is_prior_win(entry: &HistoryEntry, config: &AttributionConfig) -> bool {
    let HistoryEntry {
        application,
        session,
    } = entry;
    session.locked.is_none()
        && session.application_id == Some(application.id)
        && application.active_at(session.start(), config.cancellation_grace)
}
