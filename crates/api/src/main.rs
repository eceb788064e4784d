use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cms_api::config::ServerConfig;
use cms_api::router::build_app_router;
use cms_api::state::AppState;
use cms_events::{EventBus, HookListener, RetryScheduler};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cms_api=debug,cms_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = cms_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    cms_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    cms_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Hooks ---
    let event_bus = Arc::new(EventBus::default());
    let state = AppState::new(pool, config.clone(), Arc::clone(&event_bus));
    let dispatcher = state.dispatcher.clone();

    let listener_handle = tokio::spawn(HookListener::run(
        dispatcher.clone(),
        event_bus.subscribe(),
    ));

    let scheduler_cancel = CancellationToken::new();
    let scheduler = RetryScheduler::new(dispatcher.clone());
    let scheduler_token = scheduler_cancel.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_token).await;
    });

    tracing::info!("Hook services started (listener, retry scheduler)");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    scheduler_cancel.cancel();
    if tokio::time::timeout(grace, scheduler_handle).await.is_err() {
        tracing::warn!("Retry scheduler did not stop in time");
    }

    // The router (and its state clone of the bus) is gone; dropping this
    // last sender closes the channel and stops the listener.
    drop(event_bus);
    if tokio::time::timeout(grace, listener_handle).await.is_err() {
        tracing::warn!("Hook listener did not stop in time");
    }

    // No new events can arrive; let in-flight dispatches record their outcome.
    tracing::info!(in_flight = dispatcher.in_flight(), "Draining hook dispatches");
    if tokio::time::timeout(grace, dispatcher.drain()).await.is_err() {
        tracing::warn!(
            in_flight = dispatcher.in_flight(),
            "Hook dispatches did not finish in time"
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
