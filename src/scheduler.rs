use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::pipeline::{DashboardSnapshot, Pipeline};

/// Re-run the pipeline every `period` and publish each snapshot.
///
/// The first cycle starts immediately. A cycle always runs to completion
/// before the next tick is awaited; ticks missed during a slow fetch are
/// delayed rather than fired in a burst.
#[instrument(skip(pipeline, publisher), fields(period_secs = %period.as_secs()))]
pub async fn start_refresh_scheduler(
    pipeline: Pipeline,
    publisher: watch::Sender<DashboardSnapshot>,
    period: Duration,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Refresh scheduler started with {} second interval", period.as_secs());

    loop {
        interval.tick().await;
        debug!("Scheduler tick - running refresh cycle");

        let snapshot = pipeline.run_cycle().await;
        if !snapshot.has_data() {
            warn!("Refresh cycle produced no chart: {:?}", snapshot.view);
        }

        // send_replace keeps publishing even when no dashboard request holds a receiver
        publisher.send_replace(snapshot);
    }
}
