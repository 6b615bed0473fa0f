//! Incident feed and congestion index client.
//!
//! Both endpoints refresh upstream on a 5-minute cadence, so responses are
//! held in single-slot TTL caches and re-fetched only after expiry or a
//! manual clear.

use crate::{Clock, ClientError, IncidentProvider, Result, SystemClock, TtlCache};
use async_trait::async_trait;
use geo_grid::GeoBounds;
use risk_events::IncidentReport;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Congestion band for a 0-10 region index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLevel {
    Low,
    Moderate,
    High,
    Severe,
}

impl TrafficLevel {
    pub fn from_index(index: f64) -> Self {
        if index <= 3.0 {
            TrafficLevel::Low
        } else if index <= 5.0 {
            TrafficLevel::Moderate
        } else if index <= 7.0 {
            TrafficLevel::High
        } else {
            TrafficLevel::Severe
        }
    }
}

/// One row of the region congestion index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvinceIndex {
    pub province: String,
    /// 0-10
    pub index: f64,
    pub level: TrafficLevel,
}

#[derive(Debug, Clone)]
pub struct IncidentFeedConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_sec: u64,
    pub cache_ttl: std::time::Duration,
}

impl Default for IncidentFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://traffic.longdo.com/api/json".to_string(),
            api_key: String::new(),
            timeout_sec: 10,
            cache_ttl: std::time::Duration::from_secs(300),
        }
    }
}

#[derive(Deserialize)]
struct IncidentEnvelope {
    #[serde(default)]
    data: Vec<IncidentReport>,
}

/// HTTP client for the tagged incident feed plus the traffic index.
pub struct IncidentFeed {
    config: IncidentFeedConfig,
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    incidents_cache: TtlCache<Vec<IncidentReport>>,
    index_cache: TtlCache<Vec<ProvinceIndex>>,
}

impl IncidentFeed {
    pub fn new(config: IncidentFeedConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: IncidentFeedConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_sec))
            .build()?;
        let incidents_cache = TtlCache::new(config.cache_ttl);
        let index_cache = TtlCache::new(config.cache_ttl);
        Ok(Self {
            config,
            client,
            clock,
            incidents_cache,
            index_cache,
        })
    }

    /// Fetch the whole region feed. Bounds are applied locally per call so
    /// the single cache slot always holds the unfiltered list.
    async fn fetch_incidents_remote(&self) -> Result<Vec<IncidentReport>> {
        let url = format!(
            "{}/traffic/events?key={}",
            self.config.base_url, self.config.api_key
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        let envelope: IncidentEnvelope = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(envelope.data)
    }

    async fn fetch_index_remote(&self) -> Result<Vec<ProvinceIndex>> {
        let url = format!("{}/traffic/index", self.config.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        let raw: HashMap<String, serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(parse_index(raw))
    }

    /// Cached region congestion index, worst provinces first. Empty on
    /// upstream failure.
    pub async fn traffic_index_table(&self) -> Vec<ProvinceIndex> {
        let now = self.clock.now();
        if let Some(cached) = self.index_cache.get(now).await {
            return cached;
        }

        match self.fetch_index_remote().await {
            Ok(table) => {
                self.index_cache.put(table.clone(), now).await;
                table
            }
            Err(err) => {
                warn!(%err, "traffic index unavailable");
                Vec::new()
            }
        }
    }

    /// Bangkok's row of the index; 5 (mid-scale) when unavailable.
    pub async fn bangkok_index(&self) -> f64 {
        self.traffic_index_table()
            .await
            .into_iter()
            .find(|row| {
                let name = row.province.to_lowercase();
                name.contains("bangkok") || name.contains("กรุงเทพ")
            })
            .map(|row| row.index)
            .unwrap_or(5.0)
    }

    /// Drop both cached responses so the next call re-fetches.
    pub async fn clear_cache(&self) {
        self.incidents_cache.clear().await;
        self.index_cache.clear().await;
    }
}

/// Keep numeric entries only, ordered worst-first.
fn parse_index(raw: HashMap<String, serde_json::Value>) -> Vec<ProvinceIndex> {
    let mut table: Vec<ProvinceIndex> = raw
        .into_iter()
        .filter_map(|(province, value)| {
            let index = value.as_f64()?.round();
            Some(ProvinceIndex {
                province,
                index,
                level: TrafficLevel::from_index(index),
            })
        })
        .collect();

    table.sort_by(|a, b| b.index.partial_cmp(&a.index).unwrap_or(Ordering::Equal));
    table
}

#[async_trait]
impl IncidentProvider for IncidentFeed {
    async fn fetch_incidents(&self, bounds: Option<&GeoBounds>) -> Vec<IncidentReport> {
        let now = self.clock.now();

        // The cache holds the unfiltered feed; bounds are applied per call.
        let reports = if let Some(cached) = self.incidents_cache.get(now).await {
            cached
        } else {
            match self.fetch_incidents_remote().await {
                Ok(reports) => {
                    self.incidents_cache.put(reports.clone(), now).await;
                    reports
                }
                Err(err) => {
                    warn!(%err, "incident feed unavailable");
                    Vec::new()
                }
            }
        };

        let filtered: Vec<IncidentReport> = match bounds {
            Some(b) => reports
                .into_iter()
                .filter(|r| b.contains(geo_grid::GeoPoint::new(r.lat, r.lon)))
                .collect(),
            None => reports,
        };
        debug!(count = filtered.len(), "incident reports in view");
        filtered
    }

    async fn traffic_index(&self) -> f64 {
        self.bangkok_index().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traffic_level_bands() {
        assert_eq!(TrafficLevel::from_index(0.0), TrafficLevel::Low);
        assert_eq!(TrafficLevel::from_index(3.0), TrafficLevel::Low);
        assert_eq!(TrafficLevel::from_index(4.0), TrafficLevel::Moderate);
        assert_eq!(TrafficLevel::from_index(6.0), TrafficLevel::High);
        assert_eq!(TrafficLevel::from_index(8.0), TrafficLevel::Severe);
    }

    #[test]
    fn test_parse_index_skips_non_numeric() {
        let mut raw = HashMap::new();
        raw.insert("Bangkok".to_string(), serde_json::json!(7.3));
        raw.insert("Nonthaburi".to_string(), serde_json::json!(4));
        raw.insert("updated_at".to_string(), serde_json::json!("12:00"));

        let table = parse_index(raw);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].province, "Bangkok");
        assert_eq!(table[0].index, 7.0);
        assert_eq!(table[0].level, TrafficLevel::High);
        assert_eq!(table[1].level, TrafficLevel::Moderate);
    }

    #[test]
    fn test_incident_envelope_parsing() {
        let json = r#"{"data":[{"eid":"e1","title":"Accident","detail":"blocked",
            "lat":13.7,"lon":100.5,"start":"2024-06-10 08:15:00","stop":null,
            "tags":["accident"],"severity":8}]}"#;
        let envelope: IncidentEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.data[0].severity, 8);
    }

    #[test]
    fn test_empty_envelope_defaults() {
        let envelope: IncidentEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.data.is_empty());
    }
}
