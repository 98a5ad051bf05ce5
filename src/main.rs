use codronix_collab::config::Config;
use codronix_collab::db::{MemoryStore, PgStore, Store};
use codronix_collab::routes::build_router;
use codronix_collab::state::AppState;
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "codronix_collab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.auth_jwt_secret.is_none() {
        warn!("AUTH_JWT_SECRET is not set - protected API routes will refuse every request");
    }

    // Pick the store: Postgres when a URL is configured, memory otherwise
    let store: Arc<dyn Store> = match &config.db_url {
        Some(db_url) => match PgStore::connect(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to the in-memory store");
                Arc::new(MemoryStore::new())
            }
        },
        None => {
            warn!("No database URL configured - using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let address = config.server_address();
    let state = AppState::new(config, store);
    state.spawn_cursor_sweeper();

    let app_routes = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
