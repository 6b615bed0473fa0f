//! Risk Event Aggregation Pipeline
//!
//! The single entry point the UI layer consumes. One `aggregate` call:
//! 1. fetches incident-feed reports and (when bounds are given) runs the ML
//!    grid scan, concurrently;
//! 2. optionally probes the congestion chokepoints (serial, rate-gated);
//! 3. normalizes everything into the canonical event shape;
//! 4. applies type/severity set filters;
//! 5. orders by distance from the caller's location, or by recency;
//! 6. attaches a composite risk score to every event that lacks one.
//!
//! Every step is independently fault-tolerant: an unavailable upstream
//! contributes an empty list, never an error. "Show less" beats "show
//! nothing" on a live map.

use chrono::{Local, Utc};
use futures::future::join_all;
use geo_grid::{haversine_km, GeoBounds, GeoPoint};
use prediction_client::{
    probe_chokepoints, scan_area, IncidentProvider, IntervalGate, PointFeatures, PointPredictor,
    ScanOptions, SpeedReader,
};
use risk_events::{EventType, RiskEvent, Severity};
use risk_scoring::{RiskFactors, ScoreContext};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

pub mod subscribe;

pub use risk_events::{summarize, EventStatistics};
pub use subscribe::{subscribe, SubscriptionHandle};

/// Set-membership filters plus the optional reference location.
///
/// An absent or empty set means "no restriction".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub types: Option<Vec<EventType>>,
    pub severities: Option<Vec<Severity>>,
    /// Inclusive upper bound, km; only meaningful with `user_location`
    pub max_distance_km: Option<f64>,
    pub user_location: Option<GeoPoint>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scan: ScanOptions,
    /// The probe burns tightly limited upstream quota, so it stays out of the
    /// aggregate path unless explicitly enabled.
    pub probe_congestion: bool,
    pub probe_range_deg: f64,
    pub max_probes: usize,
    pub probe_interval: std::time::Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            probe_congestion: false,
            probe_range_deg: 0.005,
            max_probes: 5,
            probe_interval: std::time::Duration::from_secs(1),
        }
    }
}

/// Aggregates the three upstream sources into one ordered event list.
pub struct RiskMapService {
    incidents: Arc<dyn IncidentProvider>,
    predictor: Arc<dyn PointPredictor>,
    speed: Arc<dyn SpeedReader>,
    gate: IntervalGate,
    config: PipelineConfig,
}

impl RiskMapService {
    pub fn new(
        incidents: Arc<dyn IncidentProvider>,
        predictor: Arc<dyn PointPredictor>,
        speed: Arc<dyn SpeedReader>,
        config: PipelineConfig,
    ) -> Self {
        let gate = IntervalGate::new(config.probe_interval);
        Self {
            incidents,
            predictor,
            speed,
            gate,
            config,
        }
    }

    /// Gather, normalize, filter, order and enrich the current event set.
    pub async fn aggregate(
        &self,
        bounds: Option<GeoBounds>,
        filter: Option<&EventFilter>,
    ) -> Vec<RiskEvent> {
        let now = Utc::now();
        let features = PointFeatures::now();

        // Incident feed and ML scan are independent network calls; run them
        // together and join.
        let incidents_fut = self.incidents.fetch_incidents(bounds.as_ref());
        let zones_fut = async {
            match &bounds {
                Some(b) => scan_area(self.predictor.as_ref(), b, &features, &self.config.scan).await,
                None => Vec::new(),
            }
        };
        let (reports, zones) = tokio::join!(incidents_fut, zones_fut);

        let mut events: Vec<RiskEvent> = reports.iter().map(|r| r.to_event(now)).collect();
        events.extend(zones.iter().map(|z| z.to_event()));

        if self.config.probe_congestion {
            let readings = probe_chokepoints(
                self.speed.as_ref(),
                &self.gate,
                bounds.as_ref(),
                self.config.probe_range_deg,
                self.config.max_probes,
            )
            .await;
            events.extend(readings.iter().map(|r| r.to_event()));
        }

        debug!(candidates = events.len(), "merged source events");

        if let Some(filter) = filter {
            apply_set_filters(&mut events, filter);
        }

        match filter.and_then(|f| f.user_location) {
            Some(user) => {
                for event in &mut events {
                    event.distance_km = Some(haversine_km(user, event.location));
                }
                if let Some(max_km) = filter.and_then(|f| f.max_distance_km) {
                    events.retain(|e| e.distance_km.unwrap_or(0.0) <= max_km);
                }
                events.sort_by(|a, b| {
                    a.distance_km
                        .partial_cmp(&b.distance_km)
                        .unwrap_or(Ordering::Equal)
                });
            }
            None => {
                // Most recent first
                events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            }
        }

        let events = self.enrich(events).await;
        info!(count = events.len(), "aggregation complete");
        events
    }

    /// Attach a risk score to every event that lacks one.
    ///
    /// One engine call per event, fanned out and joined; `join_all` preserves
    /// input order, so the ordering from the sort step survives enrichment.
    async fn enrich(&self, events: Vec<RiskEvent>) -> Vec<RiskEvent> {
        let traffic_index = self.incidents.traffic_index().await;

        join_all(events.into_iter().map(|mut event| async move {
            if event.risk_score.is_none() {
                let ctx = ScoreContext {
                    historical_accidents: Some(historical_proxy(event.severity)),
                    ..ScoreContext::default()
                };
                let factors = RiskFactors::build(traffic_index, &ctx, Local::now());
                event.risk_score = Some(risk_scoring::score_location(event.location, &factors));
            }
            event
        }))
        .await
    }

    /// Run the congestion probe on demand, outside the aggregate path.
    pub async fn scan_congestion(&self, bounds: Option<GeoBounds>) -> Vec<RiskEvent> {
        probe_chokepoints(
            self.speed.as_ref(),
            &self.gate,
            bounds.as_ref(),
            self.config.probe_range_deg,
            self.config.max_probes,
        )
        .await
        .iter()
        .map(|r| r.to_event())
        .collect()
    }

    /// Summarize a finished event list.
    pub fn statistics(&self, events: &[RiskEvent]) -> EventStatistics {
        summarize(events, Utc::now())
    }
}

/// Known approximation: the per-event historical feature is derived from the
/// event's own severity, since true per-point accident counts are not
/// available in this pipeline.
fn historical_proxy(severity: Severity) -> u32 {
    match severity {
        Severity::High => 30,
        Severity::Medium => 15,
        Severity::Low => 5,
    }
}

fn apply_set_filters(events: &mut Vec<RiskEvent>, filter: &EventFilter) {
    if let Some(types) = &filter.types {
        if !types.is_empty() {
            events.retain(|e| types.contains(&e.event_type));
        }
    }
    if let Some(severities) = &filter.severities {
        if !severities.is_empty() {
            events.retain(|e| severities.contains(&e.severity));
        }
    }
}
