use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::super::domain::{
    Application, ApplicationId, DanceId, HistoryEntry, Location, LocationId, Session, SessionId,
    Slot, Tier, User, UserId, WeatherSample,
};
use super::{AttributionStore, GrantOutcome, RekeyTransaction, StoreError};

/// In-memory store backing the API service, the demo, and the test suites.
/// The rekey transaction works on a snapshot of the whole state and swaps it
/// in on commit, so a dropped transaction rolls back for free. Renumbering
/// must not run concurrently with attribution; callers serialize the two.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default, Clone)]
struct MemoryState {
    sessions: BTreeMap<SessionId, Session>,
    applications: BTreeMap<ApplicationId, Application>,
    users: BTreeMap<UserId, User>,
    locations: BTreeMap<LocationId, Location>,
    next_session: i64,
    next_application: i64,
    next_user: i64,
    next_location: i64,
}

/// Input record for seeding a session; ids and `updated` are assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct SessionDraft {
    pub location_id: LocationId,
    pub slot: Slot,
    pub date: NaiveDate,
    pub begin: NaiveTime,
    pub length_minutes: u32,
    pub weather: Option<WeatherSample>,
    pub created: DateTime<Utc>,
}

/// Input record for seeding an application.
#[derive(Debug, Clone)]
pub struct ApplicationDraft {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub dance_id: DanceId,
    pub created: DateTime<Utc>,
}

impl MemoryStore {
    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().expect("store mutex poisoned")
    }

    pub fn insert_location(&self, name: &str, hotspot: bool) -> Location {
        let mut state = self.state();
        state.next_location += 1;
        let location = Location {
            id: LocationId(state.next_location),
            name: name.to_string(),
            hotspot,
        };
        state.locations.insert(location.id, location.clone());
        location
    }

    pub fn insert_user(&self, name: &str, tier: Tier) -> User {
        let mut state = self.state();
        state.next_user += 1;
        let user = User {
            id: UserId(state.next_user),
            name: name.to_string(),
            tier,
        };
        state.users.insert(user.id, user.clone());
        user
    }

    pub fn insert_session(&self, draft: SessionDraft) -> Result<Session, StoreError> {
        let mut state = self.state();
        if !state.locations.contains_key(&draft.location_id) {
            return Err(StoreError::NotFound);
        }
        state.next_session += 1;
        let session = Session {
            id: SessionId(state.next_session),
            location_id: draft.location_id,
            slot: draft.slot,
            date: draft.date,
            begin: draft.begin,
            length_minutes: draft.length_minutes,
            locked: None,
            application_id: None,
            weather: draft.weather,
            created: draft.created,
            updated: draft.created,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    pub fn insert_application(&self, draft: ApplicationDraft) -> Result<Application, StoreError> {
        let mut state = self.state();
        if !state.sessions.contains_key(&draft.session_id)
            || !state.users.contains_key(&draft.user_id)
        {
            return Err(StoreError::NotFound);
        }
        state.next_application += 1;
        let application = Application {
            id: ApplicationId(state.next_application),
            session_id: draft.session_id,
            user_id: draft.user_id,
            dance_id: draft.dance_id,
            score: None,
            canceled: None,
            created: draft.created,
            updated: draft.created,
        };
        state
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    pub fn cancel_application(
        &self,
        id: ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let application = state.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        application.canceled = Some(at);
        application.updated = at;
        Ok(())
    }

    pub fn lock_session(&self, id: SessionId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state();
        let session = state.sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        session.locked = Some(at);
        session.updated = at;
        Ok(())
    }

    /// Drop a stale location. Only used by housekeeping and tests; sessions
    /// pointing at it become data errors the selector reports and skips.
    pub fn remove_location(&self, id: LocationId) -> Result<(), StoreError> {
        let mut state = self.state();
        state.locations.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }
}

impl AttributionStore for MemoryStore {
    fn session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.state().sessions.get(&id).cloned())
    }

    fn sessions(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self.state().sessions.values().cloned().collect())
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.state().applications.get(&id).cloned())
    }

    fn applications_for_session(
        &self,
        id: SessionId,
    ) -> Result<Vec<Application>, StoreError> {
        Ok(self
            .state()
            .applications
            .values()
            .filter(|application| application.session_id == id)
            .cloned()
            .collect())
    }

    fn user_history(&self, id: UserId) -> Result<Vec<HistoryEntry>, StoreError> {
        let state = self.state();
        Ok(state
            .applications
            .values()
            .filter(|application| application.user_id == id)
            .filter_map(|application| {
                state
                    .sessions
                    .get(&application.session_id)
                    .map(|session| HistoryEntry {
                        application: application.clone(),
                        session: session.clone(),
                    })
            })
            .collect())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state().users.get(&id).cloned())
    }

    fn location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        Ok(self.state().locations.get(&id).cloned())
    }

    fn record_score(
        &self,
        id: ApplicationId,
        score: f64,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let application = state.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        application.score = Some(score);
        application.updated = updated;
        Ok(())
    }

    fn grant(
        &self,
        session_id: SessionId,
        application_id: ApplicationId,
        updated: DateTime<Utc>,
    ) -> Result<GrantOutcome, StoreError> {
        let mut state = self.state();
        match state.applications.get(&application_id) {
            None => return Ok(GrantOutcome::ApplicationWithdrawn),
            Some(application) if application.canceled.is_some() => {
                return Ok(GrantOutcome::ApplicationWithdrawn)
            }
            Some(_) => {}
        }
        let Some(session) = state.sessions.get_mut(&session_id) else {
            return Ok(GrantOutcome::SessionMissing);
        };
        if session.locked.is_some() {
            return Ok(GrantOutcome::Locked);
        }
        if session.application_id.is_some() {
            return Ok(GrantOutcome::AlreadyGranted);
        }
        session.application_id = Some(application_id);
        session.updated = updated;
        Ok(GrantOutcome::Granted)
    }

    fn begin_rekey(&self) -> Result<Box<dyn RekeyTransaction>, StoreError> {
        let staged = self.state().clone();
        Ok(Box::new(MemoryRekeyTransaction {
            store: self.clone(),
            staged,
        }))
    }
}

struct MemoryRekeyTransaction {
    store: MemoryStore,
    staged: MemoryState,
}

impl RekeyTransaction for MemoryRekeyTransaction {
    fn session_order(&self) -> Vec<(SessionId, DateTime<Utc>)> {
        self.staged
            .sessions
            .values()
            .map(|session| (session.id, session.start()))
            .collect()
    }

    fn max_session_id(&self) -> SessionId {
        self.staged
            .sessions
            .keys()
            .next_back()
            .copied()
            .unwrap_or(SessionId(0))
    }

    fn move_session(&mut self, from: SessionId, to: SessionId) -> Result<(), StoreError> {
        if self.staged.sessions.contains_key(&to) {
            return Err(StoreError::Conflict);
        }
        let mut session = self
            .staged
            .sessions
            .remove(&from)
            .ok_or(StoreError::NotFound)?;
        session.id = to;
        self.staged.sessions.insert(to, session);
        for application in self.staged.applications.values_mut() {
            if application.session_id == from {
                application.session_id = to;
            }
        }
        Ok(())
    }

    fn reset_sequence(&mut self, max: SessionId) {
        self.staged.next_session = max.0;
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryRekeyTransaction { store, staged } = *self;
        *store.state() = staged;
        Ok(())
    }
}
