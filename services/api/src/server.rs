use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use dancebook::config::AppConfig;
use dancebook::error::AppError;
use dancebook::telemetry;
use dancebook::workflows::attribution::{AttributionService, MemoryStore};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::infra::{seed_demo_store, AppState};
use crate::routes::with_engine_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryStore::default());
    if args.seed_demo {
        let seed = seed_demo_store(&store, Utc::now())?;
        info!(
            locations = seed.locations.len(),
            users = seed.users.len(),
            sessions = seed.sessions.len(),
            "demonstration data seeded"
        );
    }
    let service = Arc::new(AttributionService::new(
        store,
        config.attribution.engine_config(),
    ));

    // The scheduled sweep and the rekey route share the service's internal
    // gate, so the two batch paths never interleave.
    let sweeper = service.clone();
    let interval = config.attribution.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweeper.run(Utc::now()) {
                Ok(report) if !report.is_clean() => {
                    warn!(failures = report.failures.len(), "sweep finished with failures");
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "scheduled sweep failed"),
            }
        }
    });

    let app = with_engine_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "session attribution service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
