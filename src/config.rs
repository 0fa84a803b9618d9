use std::env;
use std::time::Duration;

use chrono_tz::Tz;

use crate::chart::{self, ChartSettings};
use crate::clock::UrlTemplate;

pub const DEFAULT_ENDPOINT: &str = "https://api.grupoconstruserv.eng.br/lerMedicoes";
pub const DEFAULT_STATION_CODE: &str = "1476";
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub url_template: UrlTemplate,
    pub timezone: Tz,
    pub refresh_interval_seconds: u64,
    pub chart: ChartSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ChartSettings::default();

        let timezone_name = env::var("TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid {
                name: "TIMEZONE",
                value: timezone_name.clone(),
            })?;

        let chart = ChartSettings {
            lower_threshold: env_f64("LOWER_THRESHOLD", defaults.lower_threshold),
            upper_threshold: env_f64("UPPER_THRESHOLD", defaults.upper_threshold),
            axis_min: env_f64("AXIS_MIN", defaults.axis_min),
            axis_max: env_f64("AXIS_MAX", defaults.axis_max),
            axis_step: env_f64("AXIS_STEP", defaults.axis_step),
        };
        validate_chart_settings(&chart)?;

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            url_template: UrlTemplate {
                endpoint: env::var("TELEMETRY_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
                token: env::var("TELEMETRY_TOKEN")
                    .map_err(|_| ConfigError::Missing("TELEMETRY_TOKEN"))?,
                station_code: env::var("STATION_CODE")
                    .unwrap_or_else(|_| DEFAULT_STATION_CODE.to_string()),
            },
            timezone,
            refresh_interval_seconds: env::var("REFRESH_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .unwrap_or(60),
            chart,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

/// Reject axis and threshold settings the renderer cannot draw.
fn validate_chart_settings(settings: &ChartSettings) -> Result<(), ConfigError> {
    if settings.axis_step <= 0.0 {
        return Err(ConfigError::Invalid {
            name: "AXIS_STEP",
            value: settings.axis_step.to_string(),
        });
    }
    if settings.axis_min >= settings.axis_max {
        return Err(ConfigError::Invalid {
            name: "AXIS_MIN",
            value: format!("{} (AXIS_MAX is {})", settings.axis_min, settings.axis_max),
        });
    }
    if chart::axis_tick_count(settings.axis_min, settings.axis_max, settings.axis_step).is_none() {
        return Err(ConfigError::Invalid {
            name: "AXIS_STEP",
            value: format!(
                "{} (more than {} ticks)",
                settings.axis_step,
                chart::MAX_AXIS_TICKS
            ),
        });
    }
    if settings.lower_threshold > settings.upper_threshold {
        return Err(ConfigError::Invalid {
            name: "LOWER_THRESHOLD",
            value: format!(
                "{} (UPPER_THRESHOLD is {})",
                settings.lower_threshold, settings.upper_threshold
            ),
        });
    }
    Ok(())
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
}
