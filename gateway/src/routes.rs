//! HTTP handlers: thin Json adapters over the aggregation pipeline.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Local;
use event_pipeline::{EventFilter, EventStatistics, RiskMapService};
use geo_grid::{GeoBounds, GeoPoint};
use prediction_client::{IncidentFeed, ProvinceIndex};
use risk_events::{EventType, RiskEvent, Severity};
use risk_scoring::{RiskFactors, RiskScore, ScoreContext, SeverityPrediction};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RiskMapService>,
    pub feed: Arc<IncidentFeed>,
}

/// Query shape shared by the event endpoints. Bounds require all four edges;
/// `types`/`severities` are comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub north: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub west: Option<f64>,
    pub types: Option<String>,
    pub severities: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub max_distance: Option<f64>,
}

impl EventsQuery {
    fn bounds(&self) -> Option<GeoBounds> {
        match (self.north, self.south, self.east, self.west) {
            (Some(north), Some(south), Some(east), Some(west)) => {
                Some(GeoBounds::new(north, south, east, west))
            }
            _ => None,
        }
    }

    fn filter(&self) -> EventFilter {
        EventFilter {
            types: self.types.as_deref().map(parse_list::<EventType>),
            severities: self.severities.as_deref().map(parse_list::<Severity>),
            max_distance_km: self.max_distance,
            user_location: match (self.lat, self.lng) {
                (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
                _ => None,
            },
        }
    }
}

/// Parse a comma-separated list, dropping tokens that do not name a known
/// variant. An unparsable list degrades to "no restriction", matching the
/// pipeline's empty-set semantics.
fn parse_list<T: FromStr<Err = String>>(raw: &str) -> Vec<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match T::from_str(token) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%err, "ignoring filter token");
                None
            }
        })
        .collect()
}

/// `GET /api/v1/events`
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<RiskEvent>> {
    let filter = query.filter();
    let events = state.service.aggregate(query.bounds(), Some(&filter)).await;
    Json(events)
}

/// `GET /api/v1/events/statistics`
pub async fn event_statistics(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventStatistics> {
    let filter = query.filter();
    let events = state.service.aggregate(query.bounds(), Some(&filter)).await;
    Json(state.service.statistics(&events))
}

/// `GET /api/v1/events/congestion` - on-demand chokepoint probe.
pub async fn scan_congestion(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<RiskEvent>> {
    Json(state.service.scan_congestion(query.bounds()).await)
}

/// `GET /api/v1/traffic/index`
pub async fn traffic_index(State(state): State<AppState>) -> Json<Vec<ProvinceIndex>> {
    Json(state.feed.traffic_index_table().await)
}

/// `POST /api/v1/cache/clear` - force the next call to re-fetch upstream.
pub async fn clear_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.feed.clear_cache().await;
    Json(serde_json::json!({ "cleared": true }))
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(flatten)]
    pub context: ScoreContext,
}

/// `POST /api/v1/risk/score`
pub async fn score_point(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Json<RiskScore> {
    let traffic_index = state.feed.bangkok_index().await;
    let factors = RiskFactors::build(traffic_index, &request.context, Local::now());
    Json(risk_scoring::score_location(
        GeoPoint::new(request.lat, request.lng),
        &factors,
    ))
}

/// `POST /api/v1/risk/severity`
pub async fn predict_severity(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Json<SeverityPrediction> {
    let traffic_index = state.feed.bangkok_index().await;
    let factors = RiskFactors::build(traffic_index, &request.context, Local::now());
    Json(risk_scoring::predict_severity_class(&factors))
}
