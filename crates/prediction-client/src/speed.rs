//! Speed-probe client.
//!
//! The probe upstream is tightly rate-limited, so scans are deliberately
//! incomplete: a small hand-curated chokepoint list, a hard cap on probes per
//! scan, and a mandatory spacing between calls. Quota preservation wins over
//! coverage here.

use crate::{ClientError, IntervalGate, Result, SpeedReader};
use async_trait::async_trait;
use chrono::Utc;
use geo_grid::{GeoBounds, GeoPoint};
use risk_events::CongestionReading;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Known traffic chokepoints probed in preference to a generic grid.
#[derive(Debug, Clone, Copy)]
pub struct Chokepoint {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Chokepoint {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Bangkok's perennial congestion hotspots.
pub const CHOKEPOINTS: [Chokepoint; 10] = [
    Chokepoint { name: "Victory Monument", lat: 13.7563, lng: 100.5018 },
    Chokepoint { name: "Ratchaprasong", lat: 13.7465, lng: 100.5356 },
    Chokepoint { name: "Asok", lat: 13.7245, lng: 100.5674 },
    Chokepoint { name: "Silom", lat: 13.7278, lng: 100.5241 },
    Chokepoint { name: "Ratchada", lat: 13.765, lng: 100.57 },
    Chokepoint { name: "Ekkamai", lat: 13.7307, lng: 100.5838 },
    Chokepoint { name: "Rama 9", lat: 13.759, lng: 100.5644 },
    Chokepoint { name: "Sathorn", lat: 13.7095, lng: 100.5357 },
    Chokepoint { name: "Don Mueang", lat: 13.8078, lng: 100.5608 },
    Chokepoint { name: "Bearing", lat: 13.6904, lng: 100.5998 },
];

#[derive(Debug, Clone)]
pub struct SpeedProbeConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_sec: u64,
    /// Search radius passed to the upstream, in degrees
    pub probe_range_deg: f64,
    /// Hard cap per scan, regardless of chokepoints in bounds
    pub max_probes: usize,
    /// Enforced spacing between consecutive probe calls
    pub min_interval: std::time::Duration,
}

impl Default for SpeedProbeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.longdo.com/RouteService/json".to_string(),
            api_key: String::new(),
            timeout_sec: 10,
            probe_range_deg: 0.005,
            max_probes: 5,
            min_interval: std::time::Duration::from_secs(1),
        }
    }
}

/// One raw speed reading, before tier classification.
#[derive(Debug, Clone)]
pub struct SpeedObservation {
    pub location: GeoPoint,
    pub road: String,
    pub speed_kmh: f64,
    /// Upstream marker: "real-time" or "predicted"
    pub origin: String,
}

#[derive(Deserialize)]
struct SpeedEnvelope {
    #[serde(default)]
    data: Option<SpeedPayload>,
}

#[derive(Deserialize)]
struct SpeedPayload {
    /// m/s
    speed: Option<f64>,
    road: Option<String>,
    source: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// HTTP client for the traffic speed endpoint.
pub struct SpeedProbe {
    config: SpeedProbeConfig,
    client: reqwest::Client,
    gate: IntervalGate,
}

impl SpeedProbe {
    pub fn new(config: SpeedProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_sec))
            .build()?;
        let gate = IntervalGate::new(config.min_interval);
        Ok(Self {
            config,
            client,
            gate,
        })
    }

    async fn fetch_speed(&self, point: GeoPoint, range_deg: f64) -> Result<Option<SpeedObservation>> {
        let url = format!(
            "{}/traffic/speed?lat={}&lon={}&range={}&key={}",
            self.config.base_url, point.lat, point.lng, range_deg, self.config.api_key
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        // The upstream sometimes answers with HTML error pages; treat any
        // non-JSON body as "no reading" rather than a failure.
        let text = response.text().await?;
        let trimmed = text.trim_start();
        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
            debug!(lat = point.lat, lng = point.lng, "non-JSON probe response");
            return Ok(None);
        }

        let envelope: SpeedEnvelope =
            serde_json::from_str(&text).map_err(|e| ClientError::Parse(e.to_string()))?;

        let Some(payload) = envelope.data else {
            // `{meta: ...}` answers mean no reading is available there
            return Ok(None);
        };
        let Some(speed_mps) = payload.speed else {
            return Ok(None);
        };

        Ok(Some(SpeedObservation {
            location: GeoPoint::new(
                payload.lat.unwrap_or(point.lat),
                payload.lon.unwrap_or(point.lng),
            ),
            road: payload.road.unwrap_or_else(|| "Unknown Road".to_string()),
            speed_kmh: speed_mps * 3.6,
            origin: payload.source.unwrap_or_else(|| "real-time".to_string()),
        }))
    }

    /// Serial, rate-gated scan of the chokepoints inside `bounds`.
    pub async fn scan(&self, bounds: Option<&GeoBounds>) -> Vec<CongestionReading> {
        probe_chokepoints(
            self,
            &self.gate,
            bounds,
            self.config.probe_range_deg,
            self.config.max_probes,
        )
        .await
    }
}

#[async_trait]
impl SpeedReader for SpeedProbe {
    async fn read_speed(&self, point: GeoPoint, range_deg: f64) -> Option<SpeedObservation> {
        match self.fetch_speed(point, range_deg).await {
            Ok(observation) => observation,
            Err(err) => {
                warn!(lat = point.lat, lng = point.lng, %err, "speed probe unavailable");
                None
            }
        }
    }
}

/// Probe the curated chokepoints one at a time behind the rate gate.
///
/// Keeps only readings in a reportable tier; smooth traffic is dropped.
pub async fn probe_chokepoints(
    reader: &dyn SpeedReader,
    gate: &IntervalGate,
    bounds: Option<&GeoBounds>,
    range_deg: f64,
    max_probes: usize,
) -> Vec<CongestionReading> {
    let candidates: Vec<Chokepoint> = CHOKEPOINTS
        .iter()
        .filter(|cp| bounds.map_or(true, |b| b.contains(cp.location())))
        .take(max_probes)
        .copied()
        .collect();

    debug!(probes = candidates.len(), "probing chokepoints");

    let mut readings = Vec::new();
    for chokepoint in candidates {
        gate.wait().await;

        let Some(observation) = reader.read_speed(chokepoint.location(), range_deg).await else {
            continue;
        };

        let reading = CongestionReading::classify(
            observation.location,
            observation.road,
            observation.speed_kmh,
            observation.origin,
            Utc::now(),
        );
        debug!(
            name = chokepoint.name,
            speed_kmh = reading.speed_kmh,
            tier = ?reading.tier,
            "chokepoint reading"
        );

        if reading.tier.is_reportable() {
            readings.push(reading);
        }
    }

    info!(found = readings.len(), "congestion probe complete");
    readings
}
