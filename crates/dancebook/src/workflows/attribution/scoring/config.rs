use chrono::Duration;

/// Dials governing the fairness windows and the tier delay ladder.
///
/// The three delays must stay strictly positive and ordered
/// `guest_delay <= regular_delay <= senior_delay`; the application
/// configuration validates environment overrides before building this.
#[derive(Debug, Clone)]
pub struct AttributionConfig {
    /// Last-chance window for gated guests.
    pub guest_delay: Duration,
    /// Window applied by the premium/familiarity exceptions.
    pub regular_delay: Duration,
    /// Upper bound of the sliding session deadline.
    pub senior_delay: Duration,
    /// Trailing history window, in whole days.
    pub history_window_days: i64,
    /// Cancellations inside this window before the session start still count.
    pub cancellation_grace: Duration,
    /// A win at the location within this many days gates guests.
    pub recent_win_gap_days: i64,
    /// At or below this many location wins, the familiarity exception applies.
    pub familiarity_threshold: u32,
    /// Comfort-ratio advantage over the global baseline that triggers gating.
    pub temperature_margin: f64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            guest_delay: Duration::hours(48),
            regular_delay: Duration::hours(72),
            senior_delay: Duration::hours(168),
            history_window_days: 365,
            cancellation_grace: Duration::days(1),
            recent_win_gap_days: 30,
            familiarity_threshold: 5,
            temperature_margin: 5.0,
        }
    }
}
