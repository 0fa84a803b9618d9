use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

/// Date format expected by the telemetry endpoint's `data` parameter.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's calendar date at the station, as `YYYY-MM-DD`.
pub fn current_date(tz: Tz) -> String {
    date_in_timezone(Utc::now(), tz)
}

/// Calendar date of `now` once shifted into `tz`.
///
/// Near midnight UTC the station's date differs from the UTC date, so the
/// conversion must happen before formatting.
pub fn date_in_timezone(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    debug!("Current time in {}: {}", tz, local);
    local.format(DATE_FORMAT).to_string()
}

/// Fixed pieces of the telemetry URL; only the date varies per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    pub endpoint: String,
    pub token: String,
    pub station_code: String,
}

impl UrlTemplate {
    pub fn build_url(&self, date: &str) -> String {
        format!(
            "{}?data={}&token={}&codigo={}&tipo=json",
            self.endpoint, date, self.token, self.station_code
        )
    }
}
