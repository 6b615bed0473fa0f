//! Risk Event Model
//!
//! One canonical event shape for everything the map displays, normalized from
//! three source vocabularies:
//! - tagged incident-feed reports (16-tag taxonomy, severity 1-10)
//! - speed-derived congestion readings (five flow tiers)
//! - ML risk-zone predictions (hotspot/severity factors)
//!
//! Events are created fresh on every aggregation pass and carry no identity
//! across calls.

use chrono::{DateTime, Utc};
use geo_grid::GeoPoint;
use risk_scoring::RiskScore;
use serde::{Deserialize, Serialize};

pub mod congestion;
pub mod incident;
pub mod labels;
pub mod stats;
pub mod zones;

pub use congestion::{estimate_speed_limit_kmh, CongestionReading, CongestionTier};
pub use incident::IncidentReport;
pub use labels::{icon_for, severity_label, type_label, Language};
pub use stats::{summarize, EventStatistics};
pub use zones::{MlRiskZone, ZoneFactors};

/// Closed set of event categories shown on the risk map.
///
/// Unrecognized source tags normalize to [`EventType::Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Accident,
    Breakdown,
    Construction,
    Congestion,
    Weather,
    Flooding,
    Fire,
    Checkpoint,
    Gathering,
    Announcement,
    Alert,
    Event,
    Discount,
    Complaint,
    HighRisk,
}

/// Normalized event severity. Always present after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Map a 1-10 source severity scale onto the three display bands.
    pub fn from_scale(severity: u8) -> Self {
        match severity {
            s if s >= 8 => Severity::High,
            s if s >= 5 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// ML score bucketing: the upstream model scores conservatively, so a
    /// flagged hotspot is high regardless of the raw score.
    pub fn from_ml_score(risk_score: f64, is_hotspot: bool) -> Self {
        if risk_score >= 50.0 || is_hotspot {
            Severity::High
        } else if risk_score >= 23.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "accident" => Ok(EventType::Accident),
            "breakdown" => Ok(EventType::Breakdown),
            "construction" => Ok(EventType::Construction),
            "congestion" => Ok(EventType::Congestion),
            "weather" => Ok(EventType::Weather),
            "flooding" => Ok(EventType::Flooding),
            "fire" => Ok(EventType::Fire),
            "checkpoint" => Ok(EventType::Checkpoint),
            "gathering" => Ok(EventType::Gathering),
            "announcement" => Ok(EventType::Announcement),
            "alert" => Ok(EventType::Alert),
            "event" => Ok(EventType::Event),
            "discount" => Ok(EventType::Discount),
            "complaint" => Ok(EventType::Complaint),
            "high_risk" => Ok(EventType::HighRisk),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Which upstream produced an event. Display/analytics only, never scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    IncidentFeed,
    CongestionProbe,
    MlPredictor,
}

/// Bilingual text pair. Both variants are always populated; monolingual
/// sources copy the same string into both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    pub th: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, th: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            th: th.into(),
        }
    }

    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            en: text.clone(),
            th: text,
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::En => &self.en,
            Language::Th => &self.th,
        }
    }
}

/// The canonical unit flowing through the aggregation pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RiskEvent {
    /// Unique within one aggregation call; synthesized from the source id or
    /// from coordinates + timestamp when the source provides none.
    pub id: String,
    pub event_type: EventType,
    pub severity: Severity,
    pub location: GeoPoint,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_name: Option<String>,
    /// Attached by the enrichment step; never recomputed once present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<RiskScore>,
    /// Populated only when the caller supplies a reference location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub icon: &'static str,
    pub source: EventSource,
}
