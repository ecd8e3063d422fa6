use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use joinfutbol::auth::session;
use joinfutbol::config::{Cli, Config};
use joinfutbol::db;
use joinfutbol::routes;
use joinfutbol::state::{AppState, DbPool};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;
    if config.database.seed_demo {
        db::seed_demo(&pool, config.auth.bcrypt_cost)?;
    }

    tokio::spawn(sweep_sessions(pool.clone()));

    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drop expired sessions once an hour. Resolution already ignores them.
async fn sweep_sessions(pool: DbPool) {
    let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let purged = pool
            .get()
            .map_err(|e| e.to_string())
            .and_then(|conn| session::purge_expired(&conn).map_err(|e| e.to_string()));
        match purged {
            Ok(0) => {}
            Ok(n) => tracing::info!("Purged {} expired sessions", n),
            Err(e) => tracing::warn!("Session sweep failed: {}", e),
        }
    }
}
