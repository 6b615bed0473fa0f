//! Periodic polling subscription.
//!
//! Immediate aggregate, then a fixed-interval re-run. `stop()` prevents
//! future invocations; an in-flight aggregate always runs to completion -
//! there is no cancellation of started work anywhere in the pipeline.

use crate::{EventFilter, RiskMapService};
use geo_grid::GeoBounds;
use risk_events::RiskEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle for a running subscription. Dropping it does NOT stop the task;
/// call [`SubscriptionHandle::stop`].
pub struct SubscriptionHandle {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stop scheduling future invocations. The current one, if any, finishes.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    /// Whether the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Poll `aggregate` on a fixed interval, delivering each result to `callback`.
pub fn subscribe<F>(
    service: Arc<RiskMapService>,
    bounds: Option<GeoBounds>,
    filter: Option<EventFilter>,
    interval: Duration,
    callback: F,
) -> SubscriptionHandle
where
    F: Fn(Vec<RiskEvent>) + Send + Sync + 'static,
{
    let stop = Arc::new(Notify::new());
    let stop_signal = stop.clone();

    let task = tokio::spawn(async move {
        loop {
            let events = service.aggregate(bounds, filter.as_ref()).await;
            callback(events);

            tokio::select! {
                _ = stop_signal.notified() => {
                    debug!("subscription stopped");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    });

    SubscriptionHandle { stop, task }
}
