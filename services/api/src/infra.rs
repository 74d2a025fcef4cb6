use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use dancebook::workflows::attribution::{
    ApplicationDraft, AttributionStore, DanceId, Location, MemoryStore, Session, SessionDraft,
    Slot, StoreError, Tier, User, WeatherSample,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) struct DemoSeed {
    pub(crate) locations: Vec<Location>,
    pub(crate) users: Vec<User>,
    pub(crate) sessions: Vec<Session>,
}

/// Seed a store with a small realistic scenario: four users across the tier
/// ladder, a contested afternoon, a premium Saturday at the hotspot, and a
/// locked session the sweep must leave alone.
pub(crate) fn seed_demo_store(
    store: &MemoryStore,
    at: DateTime<Utc>,
) -> Result<DemoSeed, StoreError> {
    let riverside = store.insert_location("Riverside Bandstand", true);
    let orchard = store.insert_location("Orchard Hall", false);

    let iris = store.insert_user("iris", Tier::Admin);
    let selma = store.insert_user("selma", Tier::Senior);
    let rami = store.insert_user("rami", Tier::Regular);
    let gwen = store.insert_user("gwen", Tier::Guest);

    let today = at.date_naive();

    // Past wins shaping the familiarity scores.
    seed_win(
        store,
        &orchard,
        &gwen,
        today - Duration::days(7),
        Some(WeatherSample {
            temperature: 21.0,
            rainfall: 0.0,
        }),
    )?;
    seed_win(store, &orchard, &rami, today - Duration::days(12), None)?;
    seed_win(
        store,
        &orchard,
        &selma,
        today - Duration::days(340),
        Some(WeatherSample {
            temperature: 14.0,
            rainfall: 2.5,
        }),
    )?;
    seed_win(store, &riverside, &selma, today - Duration::days(60), None)?;

    // Contested afternoon two days out, three competing bids.
    let contested = store.insert_session(SessionDraft {
        location_id: orchard.id,
        slot: Slot::Afternoon,
        date: today + Duration::days(2),
        begin: begin_time(14),
        length_minutes: 120,
        weather: None,
        created: at - Duration::days(5),
    })?;
    for (offset, user) in [&gwen, &rami, &selma].into_iter().enumerate() {
        store.insert_application(ApplicationDraft {
            session_id: contested.id,
            user_id: user.id,
            dance_id: DanceId(offset as i64 + 1),
            created: at - Duration::days(5) + Duration::hours(offset as i64),
        })?;
    }

    // Premium Saturday afternoon at the hotspot, booked three weeks ahead.
    let saturday = next_weekday(today + Duration::days(3), Weekday::Sat);
    let premium = store.insert_session(SessionDraft {
        location_id: riverside.id,
        slot: Slot::Afternoon,
        date: saturday,
        begin: begin_time(14),
        length_minutes: 180,
        weather: None,
        created: at - Duration::days(21),
    })?;
    store.insert_application(ApplicationDraft {
        session_id: premium.id,
        user_id: rami.id,
        dance_id: DanceId(4),
        created: at - Duration::days(21),
    })?;

    // A locked session stays out of automatic attribution entirely.
    let locked = store.insert_session(SessionDraft {
        location_id: orchard.id,
        slot: Slot::Morning,
        date: today + Duration::days(1),
        begin: begin_time(10),
        length_minutes: 120,
        weather: None,
        created: at - Duration::days(4),
    })?;
    store.insert_application(ApplicationDraft {
        session_id: locked.id,
        user_id: iris.id,
        dance_id: DanceId(5),
        created: at - Duration::days(4),
    })?;
    store.lock_session(locked.id, at)?;

    Ok(DemoSeed {
        locations: vec![riverside, orchard],
        users: vec![iris, selma, rami, gwen],
        sessions: vec![contested, premium, locked],
    })
}

fn seed_win(
    store: &MemoryStore,
    location: &Location,
    user: &User,
    on: NaiveDate,
    weather: Option<WeatherSample>,
) -> Result<(), StoreError> {
    let created = Utc.from_utc_datetime(&on.and_time(begin_time(10))) - Duration::days(7);
    let session = store.insert_session(SessionDraft {
        location_id: location.id,
        slot: Slot::Morning,
        date: on,
        begin: begin_time(10),
        length_minutes: 120,
        weather,
        created,
    })?;
    let application = store.insert_application(ApplicationDraft {
        session_id: session.id,
        user_id: user.id,
        dance_id: DanceId(1),
        created,
    })?;
    store.grant(session.id, application.id, created)?;
    Ok(())
}

fn begin_time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()
}

fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let mut day = from;
    while day.weekday() != weekday {
        day += Duration::days(1);
    }
    day
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 instant ({err})"))
}
