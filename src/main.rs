use std::sync::Arc;

use tower_sessions_sqlx_store::PostgresStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wedding_backend::{
    app_state::AppState, build_app, config::AppConfig, db, invites::manager::InviteLinkManager,
    queries::invites::PgInviteStore,
};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let pool = match db::connect_to_db(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Error connecting to database: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&pool).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    let session_store = PostgresStore::new(pool.clone());
    if let Err(e) = session_store.migrate().await {
        error!("Failed to migrate session store: {}", e);
        std::process::exit(1);
    }

    let invites = InviteLinkManager::new(Arc::new(PgInviteStore::new(pool)), config.invites.clone());
    let state = AppState {
        invites,
        public_base_url: config.public_base_url.clone(),
    };
    let app = build_app(state, session_store, config.secure_cookies);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    info!(addr = %config.bind_addr, "listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
