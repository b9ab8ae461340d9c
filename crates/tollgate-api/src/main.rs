//! Tollgate - Main Entry Point

use std::sync::Arc;

use tollgate_api::config::ServiceConfig;
use tollgate_api::events::{spawn_event_collector, EventLog};
use tollgate_api::{router, AppState};
use tollgate_core::WindowResolver;
use tollgate_engine::{AdmissionEngine, StaticDirectory, SubscriberProfile};
use tollgate_ledger::{CounterStore, MemoryCounterStore, SnapshotStore};
use tollgate_policy::PolicyStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Tollgate v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "/etc/tollgate/service.json".into());

    let config = ServiceConfig::load(&config_path).unwrap_or_else(|_| {
        tracing::warn!("Config not found, using defaults");
        ServiceConfig::default()
    });

    // Tier policy
    let policy = Arc::new(PolicyStore::from_file(&config.policy_path)?);
    tracing::info!(
        "policy v{} loaded from {} ({} features)",
        policy.version(),
        config.policy_path.display(),
        policy.features().len()
    );

    // Usage counters, durable when a snapshot path is configured
    let (counters, snapshot): (Arc<dyn CounterStore>, Option<Arc<SnapshotStore>>) =
        match &config.snapshot_path {
            Some(path) => {
                let store = Arc::new(SnapshotStore::open(path)?);
                SnapshotStore::spawn_flusher(
                    Arc::clone(&store),
                    std::time::Duration::from_secs(config.snapshot_flush_secs),
                );
                (Arc::clone(&store) as Arc<dyn CounterStore>, Some(store))
            }
            None => {
                tracing::warn!("no snapshot path configured, usage counters are in-memory only");
                (Arc::new(MemoryCounterStore::new()), None)
            }
        };

    // Subscriber directory seeded from config
    let directory = Arc::new(StaticDirectory::from_profiles(config.subscribers.iter().map(
        |seed| {
            (
                seed.id,
                SubscriberProfile {
                    tier: seed.tier.clone(),
                    created_at: seed.created_at,
                },
            )
        },
    )));
    tracing::info!("{} subscribers in directory", directory.len());

    // Admission engine
    let mut engine =
        AdmissionEngine::new(policy, counters, directory).with_failure_policy(config.failure_policy);
    if let Some(anchor) = config.weekly_anchor {
        engine = engine.with_resolver(WindowResolver::new(anchor));
    }
    let engine = Arc::new(engine);

    // Quota-exceeded feed for the events endpoint
    let events = Arc::new(EventLog::default());
    spawn_event_collector(&engine, Arc::clone(&events));

    let state = AppState {
        engine,
        events,
        policy_path: config.policy_path.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("listening on {}", config.listen_addr);

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // One last flush so counters admitted since the previous tick survive,
    // clean exit or not
    if let Some(store) = snapshot {
        if let Err(e) = store.flush() {
            tracing::warn!("final usage snapshot flush failed: {e}");
        }
    }

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("shutdown signal listener failed: {e}");
    }
    tracing::info!("shutting down");
}
