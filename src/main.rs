//! Pomodoro Timer - a focus timer service with tasks, history and settings
//!
//! This is the main entry point for the pomodoro-timer application.

use std::sync::Arc;
use anyhow::anyhow;
use tokio::net::TcpListener;
use tracing::info;

use pomodoro_timer::{
    api::create_router,
    config::Config,
    engine::{Collaborators, TimerEngine},
    services::{JsonFileStorage, LocalNotifier, SessionStore, SettingsStore, Storage, TaskStore},
    state::AppState,
    tasks::wake_up_recovery_task,
    utils::{shutdown_signal, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomodoro_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting pomodoro-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_dir={}",
          config.host, config.port, config.data_dir.display());

    // Build the services once and hand them to the engine
    let storage: Arc<dyn Storage> = Arc::new(
        JsonFileStorage::open(&config.data_dir).await.map_err(|e| anyhow!(e))?,
    );
    let settings = Arc::new(SettingsStore::new(Arc::clone(&storage)));
    let loaded = settings.load().await;

    let collab = Collaborators {
        settings,
        tasks: Arc::new(TaskStore::new(Arc::clone(&storage))),
        sessions: Arc::new(SessionStore::new(Arc::clone(&storage))),
        storage,
        notifier: Arc::new(LocalNotifier::new(loaded.locale, loaded.sound)),
        clock: Arc::new(SystemClock),
    };
    let engine = TimerEngine::new(collab.clone());

    // Create application state and recover the timer
    let state = Arc::new(AppState::new(engine, &collab, config.port, config.host.clone()));
    state.load().await;

    // Deliver host wake-ups to the engine
    let wake_state = Arc::clone(&state);
    let wake_every = config.wake_check_interval();
    tokio::spawn(async move {
        wake_up_recovery_task(wake_state, wake_every).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start|pause|resume|reset - Timer commands");
    info!("  POST /timer/task                     - Select the current task");
    info!("  POST /app/resume                     - Recompute after backgrounding");
    info!("  GET|PATCH /settings, POST /settings/reset");
    info!("  GET|POST /tasks, PATCH|DELETE /tasks/:id");
    info!("  GET  /sessions, /sessions/summary    - Session history");
    info!("  GET  /status                         - Timer and server status");
    info!("  GET  /health                         - Health check");

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

    info!("Server shutdown complete");
    Ok(())
}
