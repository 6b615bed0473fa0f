//! ML point-predictor client and grid scan.
//!
//! One `POST /predict` per sample point, all points in flight concurrently
//! (bounded only by `max_concurrent`). A failed point logs and drops out;
//! its siblings are never cancelled.

use crate::{ClientError, PointPredictor, Result};
use async_trait::async_trait;
use chrono::{Datelike, Local, Timelike, Utc};
use futures::StreamExt;
use geo_grid::{sample_grid, GeoBounds, GeoPoint};
use risk_events::{MlRiskZone, Severity, ZoneFactors};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MlPredictorConfig {
    pub base_url: String,
    pub timeout_sec: u64,
}

impl Default for MlPredictorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:10000".to_string(),
            timeout_sec: 10,
        }
    }
}

/// Area-scan tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Points per dimension (total requests = grid_size²)
    pub grid_size: usize,
    /// Minimum risk score to keep; the model scores conservatively
    pub threshold: f64,
    /// Cap on returned zones
    pub max_zones: usize,
    /// In-flight request bound for the fan-out
    pub max_concurrent: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            grid_size: 5,
            threshold: 20.0,
            max_zones: 12,
            max_concurrent: 16,
        }
    }
}

/// Contextual features sent with every prediction request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointFeatures {
    /// 0-23
    pub hour: u32,
    /// 0 = Sunday
    pub day_of_week: u32,
    /// 1-12
    pub month: u32,
    pub rainfall_mm: f64,
    /// 0-1
    pub traffic_density: f64,
}

impl PointFeatures {
    /// Default features from the current wall clock: no rain, median density.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            hour: now.hour(),
            day_of_week: now.weekday().num_days_from_sunday(),
            month: now.month(),
            rainfall_mm: 0.0,
            traffic_density: 0.5,
        }
    }

    pub fn is_rush_hour(&self) -> bool {
        (7..=9).contains(&self.hour) || (17..=19).contains(&self.hour)
    }

    pub fn is_night(&self) -> bool {
        self.hour >= 22 || self.hour < 6
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week == 0 || self.day_of_week == 6
    }
}

#[derive(Serialize)]
struct PredictRequest {
    latitude: f64,
    longitude: f64,
    hour: u32,
    day_of_week: u32,
    month: u32,
    rainfall: f64,
    traffic_density: f64,
}

#[derive(Deserialize)]
struct PredictResponse {
    risk_score: f64,
    #[serde(default)]
    hotspot_probability: f64,
    #[serde(default)]
    predicted_severity: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    is_hotspot: bool,
}

/// HTTP client for the two-stage hotspot/severity model.
pub struct MlPredictor {
    config: MlPredictorConfig,
    client: reqwest::Client,
}

impl MlPredictor {
    pub fn new(config: MlPredictorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_sec))
            .build()?;
        Ok(Self { config, client })
    }

    async fn predict_point(&self, point: GeoPoint, features: &PointFeatures) -> Result<MlRiskZone> {
        let request = PredictRequest {
            latitude: point.lat,
            longitude: point.lng,
            hour: features.hour,
            day_of_week: features.day_of_week,
            month: features.month,
            rainfall: features.rainfall_mm,
            traffic_density: features.traffic_density,
        };

        let response = self
            .client
            .post(format!("{}/predict", self.config.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(zone_from_response(point, features, body))
    }
}

/// Assemble a zone from the model response. The boolean context factors are
/// recomputed from the request features rather than trusted from the body.
fn zone_from_response(
    point: GeoPoint,
    features: &PointFeatures,
    body: PredictResponse,
) -> MlRiskZone {
    MlRiskZone {
        id: format!("ml-risk-{:.4}-{:.4}", point.lat, point.lng),
        location: point,
        risk_score: body.risk_score,
        hotspot_probability: body.hotspot_probability,
        severity: Severity::from_ml_score(body.risk_score, body.is_hotspot),
        severity_class: body.predicted_severity,
        confidence: body.confidence.unwrap_or(0.8),
        factors: ZoneFactors {
            is_hotspot: body.is_hotspot,
            is_rush_hour: features.is_rush_hour(),
            is_night: features.is_night(),
            is_weekend: features.is_weekend(),
            rainfall: features.rainfall_mm,
            traffic_density: features.traffic_density,
        },
        timestamp: Utc::now(),
    }
}

#[async_trait]
impl PointPredictor for MlPredictor {
    async fn predict(&self, point: GeoPoint, features: &PointFeatures) -> Option<MlRiskZone> {
        match self.predict_point(point, features).await {
            Ok(zone) => Some(zone),
            Err(err) => {
                warn!(lat = point.lat, lng = point.lng, %err, "prediction unavailable");
                None
            }
        }
    }
}

/// Grid-scan an area and keep the highest-risk zones.
///
/// All `grid_size²` predictions run concurrently (up to `max_concurrent` in
/// flight); the join collects per-point options so one failure never aborts
/// the scan. Surviving zones are filtered by `threshold`, sorted descending
/// by score and truncated to `max_zones`.
pub async fn scan_area(
    predictor: &dyn PointPredictor,
    bounds: &GeoBounds,
    features: &PointFeatures,
    options: &ScanOptions,
) -> Vec<MlRiskZone> {
    let points = sample_grid(bounds, options.grid_size);
    let total = points.len();

    let results: Vec<Option<MlRiskZone>> =
        futures::stream::iter(points.into_iter().map(|p| predictor.predict(p, features)))
            .buffered(options.max_concurrent.max(1))
            .collect()
            .await;

    let answered = results.iter().filter(|r| r.is_some()).count();
    debug!(total, answered, "grid scan responses");

    let mut zones: Vec<MlRiskZone> = results
        .into_iter()
        .flatten()
        .filter(|z| z.risk_score >= options.threshold)
        .collect();

    zones.sort_by(|a, b| {
        b.risk_score
            .partial_cmp(&a.risk_score)
            .unwrap_or(Ordering::Equal)
    });
    zones.truncate(options.max_zones);

    info!(
        kept = zones.len(),
        threshold = options.threshold,
        "grid scan complete"
    );
    zones
}

/// Predict over a curated point list instead of a grid; used for the quick
/// initial load of well-known chokepoints. Keeps zones scoring >= 30.
pub async fn scan_points(
    predictor: &dyn PointPredictor,
    points: &[GeoPoint],
    features: &PointFeatures,
) -> Vec<MlRiskZone> {
    let results =
        futures::future::join_all(points.iter().map(|p| predictor.predict(*p, features))).await;

    results
        .into_iter()
        .flatten()
        .filter(|z| z.risk_score >= 30.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scores each point from a fixed table; fails everywhere else.
    struct TablePredictor {
        scores: Vec<(GeoPoint, f64, bool)>,
    }

    #[async_trait]
    impl PointPredictor for TablePredictor {
        async fn predict(&self, point: GeoPoint, features: &PointFeatures) -> Option<MlRiskZone> {
            self.scores
                .iter()
                .find(|(p, _, _)| (p.lat - point.lat).abs() < 1e-9 && (p.lng - point.lng).abs() < 1e-9)
                .map(|(p, score, hotspot)| {
                    zone_from_response(
                        *p,
                        features,
                        PredictResponse {
                            risk_score: *score,
                            hotspot_probability: 0.0,
                            predicted_severity: None,
                            confidence: None,
                            is_hotspot: *hotspot,
                        },
                    )
                })
        }
    }

    struct FailingPredictor;

    #[async_trait]
    impl PointPredictor for FailingPredictor {
        async fn predict(&self, _point: GeoPoint, _features: &PointFeatures) -> Option<MlRiskZone> {
            None
        }
    }

    fn features_at(hour: u32) -> PointFeatures {
        PointFeatures {
            hour,
            day_of_week: 3,
            month: 6,
            rainfall_mm: 0.0,
            traffic_density: 0.5,
        }
    }

    fn bounds() -> GeoBounds {
        GeoBounds::new(2.0, 0.0, 2.0, 0.0)
    }

    #[tokio::test]
    async fn test_scan_filters_sorts_and_truncates() {
        let grid = sample_grid(&bounds(), 2);
        let predictor = TablePredictor {
            scores: vec![
                (grid[0], 55.0, false),
                (grid[1], 15.0, false), // below threshold
                (grid[2], 30.0, false),
                (grid[3], 80.0, false),
            ],
        };

        let options = ScanOptions {
            grid_size: 2,
            threshold: 20.0,
            max_zones: 2,
            max_concurrent: 4,
        };
        let zones = scan_area(&predictor, &bounds(), &features_at(12), &options).await;

        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].risk_score, 80.0);
        assert_eq!(zones[1].risk_score, 55.0);
    }

    #[tokio::test]
    async fn test_all_points_failing_yields_empty_scan() {
        let options = ScanOptions::default();
        let zones = scan_area(&FailingPredictor, &bounds(), &features_at(12), &options).await;
        assert!(zones.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let grid = sample_grid(&bounds(), 2);
        // Only one of four points answers
        let predictor = TablePredictor {
            scores: vec![(grid[3], 60.0, false)],
        };
        let options = ScanOptions {
            grid_size: 2,
            ..ScanOptions::default()
        };
        let zones = scan_area(&predictor, &bounds(), &features_at(12), &options).await;
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].risk_score, 60.0);
    }

    #[tokio::test]
    async fn test_scan_points_keeps_notable_scores_only() {
        let curated = [GeoPoint::new(13.7563, 100.5018), GeoPoint::new(13.7245, 100.5674)];
        let predictor = TablePredictor {
            scores: vec![(curated[0], 45.0, false), (curated[1], 25.0, false)],
        };
        let zones = scan_points(&predictor, &curated, &features_at(12)).await;
        assert_eq!(zones.len(), 1, "sub-30 scores are dropped on the quick scan");
        assert_eq!(zones[0].risk_score, 45.0);
    }

    #[test]
    fn test_derived_factors_from_features_not_response() {
        let features = features_at(8); // morning rush
        let zone = zone_from_response(
            GeoPoint::new(13.75, 100.5),
            &features,
            PredictResponse {
                risk_score: 40.0,
                hotspot_probability: 0.2,
                predicted_severity: Some("serious".to_string()),
                confidence: Some(0.9),
                is_hotspot: false,
            },
        );
        assert!(zone.factors.is_rush_hour);
        assert!(!zone.factors.is_night);
        assert!(!zone.factors.is_weekend);
        assert_eq!(zone.severity, Severity::Medium);
        assert_eq!(zone.id, "ml-risk-13.7500-100.5000");
    }

    #[test]
    fn test_night_and_weekend_flags() {
        let mut features = features_at(23);
        features.day_of_week = 6;
        assert!(features.is_night());
        assert!(features.is_weekend());
        assert!(!features.is_rush_hour());
    }
}
