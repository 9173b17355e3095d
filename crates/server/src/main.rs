//! Phone Agent Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use phone_agent_config::{load_settings, ConfigError, Settings};
use phone_agent_core::ConversationStore;
use phone_agent_persistence::{InMemoryStore, ScyllaConfig};
use phone_agent_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("PHONE_AGENT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(ConfigError::MissingRequired(keys)) => {
            eprintln!("Missing required configuration:");
            for key in &keys {
                eprintln!("  - {}", key);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Phone Agent Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(_) => tracing::info!("Initialized Prometheus metrics at /metrics"),
            Err(e) => tracing::warn!(error = %e, "Failed to install metrics recorder"),
        }
    }

    let store = init_store(&config).await;
    let state = AppState::from_settings(config.clone(), store)?;

    let report = state.orchestrator.preload().await;
    if !report.is_complete() {
        tracing::warn!(failed = ?report.failed, "Some prompts were not preloaded");
    }

    let cache = state.cache().clone();
    let sweep_shutdown = cache.start_sweep_task(config.tts.sweep_interval());

    let app = create_router(state);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = sweep_shutdown.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// ScyllaDB when enabled and reachable, in-memory otherwise
async fn init_store(config: &Settings) -> Arc<dyn ConversationStore> {
    if !config.persistence.enabled {
        tracing::info!("Persistence disabled, using in-memory conversation store");
        return Arc::new(InMemoryStore::new());
    }

    tracing::info!("Initializing ScyllaDB persistence layer...");
    match phone_agent_persistence::init(ScyllaConfig::from(&config.persistence)).await {
        Ok(store) => {
            tracing::info!(
                hosts = ?config.persistence.scylla_hosts,
                keyspace = %config.persistence.keyspace,
                "ScyllaDB persistence initialized"
            );
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!(
                "Failed to initialize ScyllaDB: {}. Falling back to in-memory.",
                e
            );
            Arc::new(InMemoryStore::new())
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("phone_agent={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
