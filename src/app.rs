use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::pipeline::{DashboardSnapshot, Pipeline};
use crate::scheduler;

/// Running dashboard: the HTTP server plus the background refresh scheduler.
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub refresh_scheduler_handle: JoinHandle<()>,
}

impl Application {
    /// Build and initialize the application
    ///
    /// Spawns:
    /// - Refresh scheduler (one pipeline cycle per refresh interval)
    /// - HTTP server (Axum) serving the dashboard and its JSON API
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let pipeline = Pipeline::from_config(&config);
        let (publisher, snapshots) = watch::channel(DashboardSnapshot::pending());

        let refresh_scheduler_handle = {
            let period = config.refresh_interval();
            tokio::spawn(async move {
                scheduler::start_refresh_scheduler(pipeline, publisher, period).await;
            })
        };

        let app_state = AppState {
            snapshots,
            refresh_interval_seconds: config.refresh_interval_seconds,
            timezone: config.timezone,
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            refresh_scheduler_handle,
        })
    }

    /// Run until the server stops; the scheduler runs alongside indefinitely.
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        self.refresh_scheduler_handle.abort();
        Ok(())
    }
}
