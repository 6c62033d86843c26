//! Countdown Keeper - persistent countdown timers grouped by category
//!
//! This is the main entry point for the countdown-keeper server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use countdown_keeper::{
    api::create_router,
    config::Config,
    engine::SystemClock,
    services::resume_countdowns,
    state::AppState,
    store::{FileStore, KeyValueStore, MemoryStore},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_keeper={},tower_http=info", config.log_level()))
        .init();

    info!("Starting countdown-keeper v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, tick={}ms, on_complete={:?}",
          config.host, config.port, config.tick_ms, config.on_complete);

    let kv: Arc<dyn KeyValueStore> = if config.in_memory {
        info!("Using in-memory storage; timers are lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let store = FileStore::open(&config.data_dir).await?;
        info!("Storing timers in {}", store.dir().display());
        Arc::new(store)
    };

    // Create application state
    let state = Arc::new(AppState::new(kv, Arc::new(SystemClock), config.engine_settings()));

    // Pick up timers that were running when the previous process exited
    resume_countdowns(&state).await;

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers                      - List timers with live remaining time");
    info!("  POST   /timers                      - Create a timer");
    info!("  GET    /timers/:id                  - Show one timer");
    info!("  DELETE /timers/:id                  - Delete a timer");
    info!("  POST   /timers/:id/start|pause|reset");
    info!("  GET    /categories                  - Timers grouped by category");
    info!("  POST   /categories/:category/start|pause|reset");
    info!("  GET    /history                     - Completion history");
    info!("  DELETE /history                     - Clear history");
    info!("  GET    /health                      - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Running timers stay running in storage and resume on next start.
    for handle in state.countdowns.cancel_all() {
        let _ = handle.await;
    }

    info!("Server shutdown complete");
    Ok(())
}
