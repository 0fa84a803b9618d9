use tracing::{info, instrument};

use reservoir_level_monitor::app::Application;
use reservoir_level_monitor::config::Config;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env first so RUST_LOG from it reaches the filter
    dotenvy::dotenv().ok();

    reservoir_level_monitor::logging::init();

    let config = Config::from_env()?;
    info!(
        "Starting reservoir level monitor: endpoint={}, station={}, timezone={}, refresh={}s, thresholds=[{:.2}, {:.2}]",
        config.url_template.endpoint,
        config.url_template.station_code,
        config.timezone,
        config.refresh_interval_seconds,
        config.chart.lower_threshold,
        config.chart.upper_threshold
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await
}
