use chrono::Duration;

use super::common::*;
use crate::workflows::attribution::{
    rekey_sessions, AttributionStore, SessionId, Slot, StoreError,
};

#[test]
fn renumbers_into_chronological_order() {
    let (service, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);
    let alice = admin(&store, "alice");

    // Insertion order 1, 2, 3; chronological order 3, 1, 2.
    let first = seed_session(
        &store,
        &location,
        Slot::Morning,
        date(2026, 6, 10),
        time(10, 0),
        now() - Duration::days(30),
    );
    seed_session(
        &store,
        &location,
        Slot::Morning,
        date(2026, 6, 12),
        time(10, 0),
        now() - Duration::days(30),
    );
    let third = seed_session(
        &store,
        &location,
        Slot::Morning,
        date(2026, 6, 8),
        time(10, 0),
        now() - Duration::days(30),
    );
    let bid_on_first = apply(&store, &first, &alice, now() - Duration::days(29));
    let bid_on_third = apply(&store, &third, &alice, now() - Duration::days(29));

    let report = service.rekey().expect("rekey runs");

    assert_eq!(report.total, 3);
    assert_eq!(report.renumbered, 3);

    // 1 -> 2, 2 -> 3, 3 -> 1.
    let sessions = store.sessions().expect("snapshot");
    assert_eq!(
        sessions
            .iter()
            .map(|session| (session.id.0, session.date))
            .collect::<Vec<_>>(),
        vec![
            (1, date(2026, 6, 8)),
            (2, date(2026, 6, 10)),
            (3, date(2026, 6, 12)),
        ]
    );

    // Applications still point at the same logical sessions.
    let bid_on_first = store
        .application(bid_on_first.id)
        .expect("lookup")
        .expect("present");
    assert_eq!(bid_on_first.session_id, SessionId(2));
    let bid_on_third = store
        .application(bid_on_third.id)
        .expect("lookup")
        .expect("present");
    assert_eq!(bid_on_third.session_id, SessionId(1));
}

#[test]
fn ordered_sessions_are_left_alone() {
    let (service, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);

    for day in [8, 10, 12] {
        seed_session(
            &store,
            &location,
            Slot::Morning,
            date(2026, 6, day),
            time(10, 0),
            now() - Duration::days(30),
        );
    }
    let before = store.sessions().expect("snapshot");

    let report = service.rekey().expect("rekey runs");

    assert_eq!(report.total, 3);
    assert!(report.untouched());
    assert_eq!(store.sessions().expect("snapshot"), before);
}

#[test]
fn ids_end_up_strictly_increasing_in_start_order() {
    let (_, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);
    let alice = admin(&store, "alice");

    let days = [21, 9, 17, 5, 13];
    for day in days {
        let session = seed_session(
            &store,
            &location,
            Slot::Evening,
            date(2026, 6, day),
            time(20, 0),
            now() - Duration::days(30),
        );
        apply(&store, &session, &alice, now() - Duration::days(29));
    }

    rekey_sessions(store.as_ref()).expect("rekey runs");

    let sessions = store.sessions().expect("snapshot");
    assert_eq!(
        sessions.iter().map(|session| session.id.0).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    for pair in sessions.windows(2) {
        assert!(pair[0].start() < pair[1].start());
    }

    // Every application still references an existing session.
    for session in &sessions {
        let bids = store
            .applications_for_session(session.id)
            .expect("bids load");
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].session_id, session.id);
    }
}

#[test]
fn dropping_the_transaction_rolls_back() {
    let (_, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);

    for day in [12, 8] {
        seed_session(
            &store,
            &location,
            Slot::Morning,
            date(2026, 6, day),
            time(10, 0),
            now() - Duration::days(30),
        );
    }
    let before = store.sessions().expect("snapshot");

    {
        let mut txn = store.begin_rekey().expect("transaction opens");
        txn.move_session(SessionId(1), SessionId(10))
            .expect("staged move applies");
        // No commit: the staged state must evaporate.
    }

    assert_eq!(store.sessions().expect("snapshot"), before);
}

#[test]
fn direct_swaps_collide_which_is_why_staging_exists() {
    let (_, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);

    for day in [12, 8] {
        seed_session(
            &store,
            &location,
            Slot::Morning,
            date(2026, 6, day),
            time(10, 0),
            now() - Duration::days(30),
        );
    }

    let mut txn = store.begin_rekey().expect("transaction opens");
    match txn.move_session(SessionId(1), SessionId(2)) {
        Err(StoreError::Conflict) => {}
        other => panic!("expected id collision, got {other:?}"),
    }
}

#[test]
fn the_id_sequence_resumes_after_the_new_maximum() {
    let (service, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);

    for day in [12, 8, 10] {
        seed_session(
            &store,
            &location,
            Slot::Morning,
            date(2026, 6, day),
            time(10, 0),
            now() - Duration::days(30),
        );
    }

    service.rekey().expect("rekey runs");

    let fresh = seed_session(
        &store,
        &location,
        Slot::Morning,
        date(2026, 6, 30),
        time(10, 0),
        now(),
    );
    assert_eq!(fresh.id, SessionId(4));
}
