// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use dotenvy::dotenv;
use sqlx::PgPool;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use poll_server::render::JsonRenderer;
use poll_server::session::SessionManager;
use poll_server::store::PgStore;
use poll_server::{create_routes, db, AppError, AppState, Config};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("poll_server=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "server stopped with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::load()?;

    let (state, pool) = match config.database_url.clone() {
        Some(url) => {
            let pool = db::create_pool(&url, config.max_connections).await?;
            db::migrate(&pool).await?;
            info!("using postgres backend");
            let store = Arc::new(PgStore::new(pool.clone()));
            let state = AppState::new(config, store.clone(), store, Arc::new(JsonRenderer));
            (state, Some(pool))
        }
        None => {
            warn!("DATABASE_URL not set, polls and users are kept in memory");
            (AppState::in_memory(config), None)
        }
    };

    let sweeper = spawn_session_sweeper(state.sessions.clone(), state.config.session_sweep);

    let addr = SocketAddr::new(state.config.host, state.config.port);
    let app = create_routes(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    info!(%addr, "server running");
    let served = axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await;

    sweeper.abort();
    if let Some(pool) = pool {
        close_pool(pool).await;
    }
    info!("server stopped");

    served.map_err(|e| AppError::Internal(format!("server error: {e}")))
}

fn spawn_session_sweeper(
    sessions: Arc<SessionManager>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            let removed = sessions.prune_expired();
            if removed > 0 {
                info!(removed, "expired sessions swept");
            }
        }
    })
}

async fn shutdown_on_ctrl_c(handle: Handle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown requested");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

async fn close_pool(pool: PgPool) {
    pool.close().await;
    info!("database pool closed");
}
