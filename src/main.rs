use std::sync::Arc;

use adaptive_tutor::config::Config;
use adaptive_tutor::logging::{init_tracing, LogConfig};
use adaptive_tutor::state::AppState;
use adaptive_tutor::workers::WorkerManager;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&LogConfig::from_env(&config.log_level));

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, path = %config.item_bank_path.display(), "failed to load item bank");
            std::process::exit(1);
        }
    };

    let worker_manager = if config.eviction_enabled() {
        start_workers(&config, state.registry()).await
    } else {
        tracing::info!("SESSION_TTL_SECS not set, idle-session eviction disabled");
        None
    };

    let app = adaptive_tutor::create_app(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "bind listener failed");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "adaptive-tutor listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    if let Some(manager) = worker_manager {
        manager.stop().await;
    }

    tracing::info!("graceful shutdown complete");
}

async fn start_workers(
    config: &Config,
    registry: Arc<adaptive_tutor::adaptive::SessionRegistry>,
) -> Option<WorkerManager> {
    let manager = match WorkerManager::new(registry).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::warn!(error = %e, "worker manager not initialized");
            return None;
        }
    };
    if let Err(e) = manager.start(&config.cleanup_schedule, config.session_ttl).await {
        tracing::error!(error = %e, "failed to start workers");
    }
    Some(manager)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
