use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for bookable sessions. Ids are renumbered by the rekey
/// routine so they stay monotonic in chronological start order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub i64);

/// Identifier wrapper for submitted applications.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LocationId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DanceId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time-of-day band a session occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Afternoon,
    Evening,
    After,
}

impl Slot {
    pub const fn label(self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Afternoon => "afternoon",
            Slot::Evening => "evening",
            Slot::After => "after",
        }
    }

    /// Only the two afternoon/evening bands ever carry the premium flag.
    pub const fn premium_capable(self) -> bool {
        matches!(self, Slot::Afternoon | Slot::Evening)
    }

    /// Late slots key their premium classification to the day after the
    /// outing (the session is the eve of that day).
    pub const fn shifts_reference_day(self) -> bool {
        matches!(self, Slot::Evening | Slot::After)
    }

    /// After-midnight sessions take place on the following calendar day.
    pub const fn rolls_to_next_day(self) -> bool {
        matches!(self, Slot::After)
    }
}

/// Ordered privilege ladder. `Member` has no bidding rights; higher tiers
/// shed eligibility exceptions one by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Member,
    Guest,
    Regular,
    Senior,
    Admin,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::Member => "member",
            Tier::Guest => "guest",
            Tier::Regular => "regular",
            Tier::Senior => "senior",
            Tier::Admin => "admin",
        }
    }

    pub const fn may_bid(self) -> bool {
        !matches!(self, Tier::Member)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Hotspot locations apply stricter premium-day exceptions to lower tiers.
    pub hotspot: bool,
}

/// Weather observed during a past session, recorded by an external collector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Millimetres over the session window.
    pub rainfall: f64,
}

impl WeatherSample {
    /// Comfort metric used by the fairness ratios: warm dry outings score high.
    pub fn comfort_ratio(&self) -> f64 {
        self.temperature / (1.0 + self.rainfall)
    }
}

/// A bookable (location, date, slot) time-slot that applications compete for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub location_id: LocationId,
    pub slot: Slot,
    pub date: NaiveDate,
    pub begin: NaiveTime,
    pub length_minutes: u32,
    /// Once set, no further automatic attribution may touch this session.
    pub locked: Option<DateTime<Utc>>,
    /// The currently winning application, at most one.
    pub application_id: Option<ApplicationId>,
    pub weather: Option<WeatherSample>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Session {
    /// Concrete start instant; After-slot sessions begin on the next calendar day.
    pub fn start(&self) -> DateTime<Utc> {
        let day = if self.slot.rolls_to_next_day() {
            self.date + Duration::days(1)
        } else {
            self.date
        };
        Utc.from_utc_datetime(&day.and_time(self.begin))
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.start() + Duration::minutes(i64::from(self.length_minutes))
    }

    pub fn granted(&self) -> bool {
        self.application_id.is_some()
    }
}

/// One user's bid for a session, carrying a dance and the last computed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub dance_id: DanceId,
    /// Last rank value written by the selector, for winners and losers alike.
    pub score: Option<f64>,
    pub canceled: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Application {
    /// An application stays active when it was never canceled, or when the
    /// cancellation landed inside the grace window before the session start
    /// (late withdrawals keep counting against the fairness history).
    pub fn active_at(&self, session_start: DateTime<Utc>, grace: Duration) -> bool {
        match self.canceled {
            None => true,
            Some(at) => at > session_start - grace,
        }
    }
}

/// A user's application joined with its session, as loaded for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub application: Application,
    pub session: Session,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(slot: Slot) -> Session {
        let created = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).single().expect("valid");
        Session {
            id: SessionId(1),
            location_id: LocationId(1),
            slot,
            date: NaiveDate::from_ymd_opt(2026, 6, 12).expect("valid date"),
            begin: NaiveTime::from_hms_opt(0, 30, 0).expect("valid time"),
            length_minutes: 90,
            locked: None,
            application_id: None,
            weather: None,
            created,
            updated: created,
        }
    }

    #[test]
    fn after_slot_sessions_start_on_the_next_day() {
        let late = session(Slot::After);
        assert_eq!(
            late.start(),
            Utc.with_ymd_and_hms(2026, 6, 13, 0, 30, 0).single().expect("valid")
        );
        assert_eq!(late.stop(), late.start() + Duration::minutes(90));

        let evening = session(Slot::Evening);
        assert_eq!(
            evening.start(),
            Utc.with_ymd_and_hms(2026, 6, 12, 0, 30, 0).single().expect("valid")
        );
    }

    #[test]
    fn cancellations_outside_the_grace_window_deactivate() {
        let start = Utc.with_ymd_and_hms(2026, 6, 12, 20, 0, 0).single().expect("valid");
        let mut application = Application {
            id: ApplicationId(1),
            session_id: SessionId(1),
            user_id: UserId(1),
            dance_id: DanceId(1),
            score: None,
            canceled: None,
            created: start - Duration::days(10),
            updated: start - Duration::days(10),
        };
        let grace = Duration::days(1);

        assert!(application.active_at(start, grace));
        application.canceled = Some(start - Duration::hours(23));
        assert!(application.active_at(start, grace));
        application.canceled = Some(start - Duration::hours(25));
        assert!(!application.active_at(start, grace));
    }

    #[test]
    fn the_tier_ladder_orders_from_member_to_admin() {
        assert!(Tier::Member < Tier::Guest);
        assert!(Tier::Guest < Tier::Regular);
        assert!(Tier::Regular < Tier::Senior);
        assert!(Tier::Senior < Tier::Admin);
        assert!(!Tier::Member.may_bid());
        assert!(Tier::Guest.may_bid());
    }
}
