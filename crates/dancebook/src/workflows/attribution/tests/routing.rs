use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::attribution::{attribution_router, Slot};

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn run_route_reports_grants() {
    let (service, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);
    let alice = admin(&store, "alice");
    let bram = admin(&store, "bram");

    // The handlers read the wall clock, so the fixture hangs off it too.
    let wall = Utc::now();
    let start_date = (wall + Duration::days(2)).date_naive();
    seed_win(&store, &location, &alice, Slot::Morning, start_date - Duration::days(2), None);
    seed_win(&store, &location, &bram, Slot::Morning, start_date - Duration::days(10), None);

    let contested = seed_session(
        &store,
        &location,
        Slot::Morning,
        start_date,
        time(14, 0),
        wall - Duration::days(5),
    );
    apply(&store, &contested, &alice, wall - Duration::days(5));
    let bram_bid = apply(&store, &contested, &bram, wall - Duration::days(5));

    let router = attribution_router(Arc::new(service));
    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/attribution/run")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let granted = payload
        .get("granted")
        .and_then(Value::as_array)
        .expect("granted array");
    assert_eq!(granted.len(), 1);
    assert_eq!(
        granted[0].get("application_id").and_then(Value::as_i64),
        Some(bram_bid.id.0)
    );
}

#[tokio::test]
async fn candidate_route_previews_the_ranking() {
    let (service, store) = build_service();
    let location = store.insert_location("Orchard Hall", false);
    let alice = admin(&store, "alice");

    let contested = seed_session(
        &store,
        &location,
        Slot::Afternoon,
        date(2026, 6, 17),
        time(14, 0),
        now() - Duration::days(5),
    );
    let alice_bid = apply(&store, &contested, &alice, now() - Duration::days(5));

    let router = attribution_router(Arc::new(service));
    let response = router
        .oneshot(
            axum::http::Request::get(format!(
                "/api/v1/sessions/{}/candidate",
                contested.id.0
            ))
            .body(axum::body::Body::empty())
            .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let ranked = payload
        .get("ranked")
        .and_then(Value::as_array)
        .expect("ranked array");
    assert_eq!(
        ranked[0].get("application_id").and_then(Value::as_i64),
        Some(alice_bid.id.0)
    );
}

#[tokio::test]
async fn candidate_route_returns_not_found_for_unknown_sessions() {
    let (service, _) = build_service();
    let router = attribution_router(Arc::new(service));

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/sessions/999/candidate")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("not found"));
}

#[tokio::test]
async fn rekey_route_reports_the_renumbering() {
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

    let router = attribution_router(Arc::new(service));
    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/attribution/rekey")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("total").and_then(Value::as_u64), Some(3));
    assert_eq!(payload.get("renumbered").and_then(Value::as_u64), Some(3));
}
