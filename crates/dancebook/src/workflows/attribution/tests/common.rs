use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::workflows::attribution::{
    Application, ApplicationDraft, ApplicationId, AttributionConfig, AttributionService,
    AttributionStore, DanceId, HistoryEntry, Location, LocationId, MemoryStore, ScoringEngine,
    Session, SessionDraft, SessionId, Slot, Tier, User, UserId, WeatherSample,
};

/// Fixed reference instant: Monday 2026-06-15, midday.
pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub(super) fn engine_config() -> AttributionConfig {
    AttributionConfig::default()
}

pub(super) fn engine() -> ScoringEngine {
    ScoringEngine::new(engine_config())
}

pub(super) fn build_service() -> (AttributionService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = AttributionService::new(store.clone(), engine_config());
    (service, store)
}

pub(super) fn seed_session(
    store: &MemoryStore,
    location: &Location,
    slot: Slot,
    on: NaiveDate,
    begin: NaiveTime,
    created: DateTime<Utc>,
) -> Session {
    store
        .insert_session(SessionDraft {
            location_id: location.id,
            slot,
            date: on,
            begin,
            length_minutes: 120,
            weather: None,
            created,
        })
        .expect("session seeds")
}

pub(super) fn apply(
    store: &MemoryStore,
    session: &Session,
    user: &User,
    created: DateTime<Utc>,
) -> Application {
    store
        .insert_application(ApplicationDraft {
            session_id: session.id,
            user_id: user.id,
            dance_id: DanceId(1),
            created,
        })
        .expect("application seeds")
}

/// Seed a granted session for `user` at `location`, the way a completed
/// attribution leaves one behind.
pub(super) fn seed_win(
    store: &MemoryStore,
    location: &Location,
    user: &User,
    slot: Slot,
    on: NaiveDate,
    weather: Option<WeatherSample>,
) -> (Session, Application) {
    let created = Utc.from_utc_datetime(&on.and_time(time(10, 0))) - Duration::days(7);
    let session = store
        .insert_session(SessionDraft {
            location_id: location.id,
            slot,
            date: on,
            begin: time(10, 0),
            length_minutes: 120,
            weather,
            created,
        })
        .expect("session seeds");
    let application = apply(store, &session, user, created);
    let outcome = store
        .grant(session.id, application.id, created)
        .expect("grant writes");
    assert!(outcome.granted(), "seeded win should grant cleanly");
    let session = store
        .session(session.id)
        .expect("session lookup")
        .expect("session present");
    (session, application)
}

// Builders for engine-level tests that do not need a store.

pub(super) fn raw_location(id: i64, hotspot: bool) -> Location {
    Location {
        id: LocationId(id),
        name: format!("location-{id}"),
        hotspot,
    }
}

pub(super) fn raw_session(
    id: i64,
    location: &Location,
    slot: Slot,
    on: NaiveDate,
    begin: NaiveTime,
) -> Session {
    Session {
        id: SessionId(id),
        location_id: location.id,
        slot,
        date: on,
        begin,
        length_minutes: 120,
        locked: None,
        application_id: None,
        weather: None,
        created: now() - Duration::days(30),
        updated: now() - Duration::days(30),
    }
}

pub(super) fn raw_application(
    id: i64,
    session: &Session,
    user_id: i64,
    created: DateTime<Utc>,
) -> Application {
    Application {
        id: ApplicationId(id),
        session_id: session.id,
        user_id: UserId(user_id),
        dance_id: DanceId(1),
        score: None,
        canceled: None,
        created,
        updated: created,
    }
}

/// A prior win for `user_id` at `location`: the entry's session is granted
/// to the entry's own application.
pub(super) fn win_entry(
    session_id: i64,
    location: &Location,
    user_id: i64,
    slot: Slot,
    on: NaiveDate,
) -> HistoryEntry {
    let mut session = raw_session(session_id, location, slot, on, time(10, 0));
    let application =
        raw_application(session_id + 1000, &session, user_id, session.start() - Duration::days(7));
    session.application_id = Some(application.id);
    HistoryEntry {
        application,
        session,
    }
}

pub(super) fn with_weather(
    mut entry: HistoryEntry,
    temperature: f64,
    rainfall: f64,
) -> HistoryEntry {
    entry.session.weather = Some(WeatherSample {
        temperature,
        rainfall,
    });
    entry
}

pub(super) fn plain_wins(
    location: &Location,
    user_id: i64,
    count: usize,
) -> Vec<HistoryEntry> {
    (0..count)
        .map(|index| {
            win_entry(
                10 + index as i64,
                location,
                user_id,
                Slot::Morning,
                date(2026, 6, 1) + Duration::days(index as i64),
            )
        })
        .collect()
}

pub(super) fn admin(store: &MemoryStore, name: &str) -> User {
    store.insert_user(name, Tier::Admin)
}
