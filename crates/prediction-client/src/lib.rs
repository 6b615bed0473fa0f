//! Upstream Prediction Clients
//!
//! HTTP integration with the three read-only services feeding the risk map:
//! - ML point predictor (`POST /predict`, fully concurrent grid fan-out)
//! - speed probe (`GET /traffic/speed`, strictly serial behind a rate gate)
//! - incident feed + congestion index (bounded-area query, 5-minute cache)
//!
//! Every upstream failure degrades to "no data" for that call; nothing in
//! this crate aborts a scan because one point failed.

use async_trait::async_trait;
use geo_grid::{GeoBounds, GeoPoint};
use risk_events::{IncidentReport, MlRiskZone};
use thiserror::Error;

pub mod cache;
pub mod incidents;
pub mod ml;
pub mod rate;
pub mod speed;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use incidents::{IncidentFeed, IncidentFeedConfig, ProvinceIndex, TrafficLevel};
pub use ml::{scan_area, scan_points, MlPredictor, MlPredictorConfig, PointFeatures, ScanOptions};
pub use rate::IntervalGate;
pub use speed::{
    probe_chokepoints, Chokepoint, SpeedObservation, SpeedProbe, SpeedProbeConfig, CHOKEPOINTS,
};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::RequestFailed(err.to_string())
    }
}

/// Point-prediction seam. The HTTP client implements this; tests swap in
/// deterministic providers.
#[async_trait]
pub trait PointPredictor: Send + Sync {
    /// `None` means "no prediction for this point" - the caller carries on.
    async fn predict(&self, point: GeoPoint, features: &PointFeatures) -> Option<MlRiskZone>;
}

/// Incident-feed seam: bounded-area reports plus the region congestion index.
#[async_trait]
pub trait IncidentProvider: Send + Sync {
    async fn fetch_incidents(&self, bounds: Option<&GeoBounds>) -> Vec<IncidentReport>;

    /// Region congestion index on the 0-10 scale used by the score engine.
    async fn traffic_index(&self) -> f64;
}

/// Speed-probe seam: a single point observation, or `None` when the upstream
/// has no reading there.
#[async_trait]
pub trait SpeedReader: Send + Sync {
    async fn read_speed(&self, point: GeoPoint, range_deg: f64) -> Option<SpeedObservation>;
}
