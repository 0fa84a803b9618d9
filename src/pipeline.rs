use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::chart::{self, ChartSettings, ChartView, NoDataReason};
use crate::clock::{self, UrlTemplate};
use crate::config::Config;
use crate::fetcher::TelemetryFetcher;
use crate::series::{self, SeriesTable};

/// Everything the dashboard shows, produced fresh by one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardSnapshot {
    /// When the cycle that produced this snapshot finished
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Station-local date requested from the telemetry endpoint
    pub source_date: Option<String>,
    pub series: SeriesTable,
    pub view: ChartView,
}

impl DashboardSnapshot {
    /// Placeholder published before the first cycle completes.
    pub fn pending() -> Self {
        Self {
            refreshed_at: None,
            source_date: None,
            series: SeriesTable::default(),
            view: ChartView::no_data(NoDataReason::Pending),
        }
    }

    pub fn has_data(&self) -> bool {
        matches!(self.view, ChartView::Chart { .. })
    }
}

/// URL build, fetch, extract and render, wired with fixed settings.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: TelemetryFetcher,
    url_template: UrlTemplate,
    timezone: Tz,
    chart_settings: ChartSettings,
}

impl Pipeline {
    pub fn new(
        fetcher: TelemetryFetcher,
        url_template: UrlTemplate,
        timezone: Tz,
        chart_settings: ChartSettings,
    ) -> Self {
        Self {
            fetcher,
            url_template,
            timezone,
            chart_settings,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TelemetryFetcher::new(),
            config.url_template.clone(),
            config.timezone,
            config.chart.clone(),
        )
    }

    pub async fn run_cycle(&self) -> DashboardSnapshot {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one full cycle for the station date of `now`.
    ///
    /// Never fails: fetch and decode errors are logged and become the
    /// `FetchFailed` no-data view, an empty payload becomes `EmptyData`.
    #[instrument(skip(self))]
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        let date = clock::date_in_timezone(now, self.timezone);
        let url = self.url_template.build_url(&date);
        info!("Refreshing reservoir level for {}", date);
        debug!("Telemetry URL: {}", url);

        let series = match self.fetcher.fetch(&url).await {
            Ok(payload) => series::extract(&payload),
            Err(e) => {
                error!("Failed to fetch telemetry for {}: {}", date, e);
                return DashboardSnapshot {
                    refreshed_at: Some(Utc::now()),
                    source_date: Some(date),
                    series: SeriesTable::default(),
                    view: ChartView::no_data(NoDataReason::FetchFailed),
                };
            }
        };

        if series.is_empty() {
            warn!("No measurements returned for {}", date);
        } else {
            info!(
                "Extracted {} measurements for {} ({} missing values)",
                series.len(),
                date,
                series.missing_count()
            );
        }

        let view = chart::render(&series, &self.chart_settings);

        DashboardSnapshot {
            refreshed_at: Some(Utc::now()),
            source_date: Some(date),
            series,
            view,
        }
    }
}
