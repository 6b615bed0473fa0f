//! Incident-feed normalization.
//!
//! The feed delivers tagged reports with a 1-10 severity scale. The first tag
//! decides the event category; anything outside the known taxonomy falls back
//! to `alert` rather than being dropped.

use crate::{labels, EventSource, EventType, LocalizedText, RiskEvent, Severity};
use chrono::{DateTime, NaiveDateTime, Utc};
use geo_grid::GeoPoint;
use serde::{Deserialize, Serialize};

/// Raw report as returned by the bounded-area incident query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReport {
    #[serde(default)]
    pub eid: Option<String>,
    pub title: String,
    pub detail: String,
    pub lat: f64,
    pub lon: f64,
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub stop: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 1-10
    #[serde(default = "default_severity")]
    pub severity: u8,
}

fn default_severity() -> u8 {
    1
}

impl EventType {
    /// Total mapping from the feed's tag vocabulary; unknown tags are alerts.
    pub fn from_incident_tag(tag: &str) -> Self {
        match tag {
            "accident" => EventType::Accident,
            "broken_vehicle" => EventType::Breakdown,
            "construction" => EventType::Construction,
            "rainfall" => EventType::Weather,
            "flooding" => EventType::Flooding,
            "gathering" => EventType::Gathering,
            "announcement" => EventType::Announcement,
            "checkpoint" => EventType::Checkpoint,
            "congestion" => EventType::Congestion,
            "alert" => EventType::Alert,
            "event" => EventType::Event,
            "discount" => EventType::Discount,
            "fire" => EventType::Fire,
            "complaint" => EventType::Complaint,
            _ => EventType::Alert,
        }
    }
}

impl IncidentReport {
    /// Parse the feed's naive timestamp format; `now` when absent or garbled.
    fn start_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.start
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
            .unwrap_or(now)
    }

    /// Normalize into the canonical event shape.
    pub fn to_event(&self, now: DateTime<Utc>) -> RiskEvent {
        let primary_tag = self.tags.first().map(String::as_str).unwrap_or("alert");
        let event_type = EventType::from_incident_tag(primary_tag);
        let timestamp = self.start_time(now);

        let id = self.eid.clone().unwrap_or_else(|| {
            format!(
                "incident-{:.4}-{:.4}-{}",
                self.lat,
                self.lon,
                timestamp.timestamp()
            )
        });

        RiskEvent {
            id,
            event_type,
            severity: Severity::from_scale(self.severity),
            location: GeoPoint::new(self.lat, self.lon),
            title: LocalizedText::same(&self.title),
            description: LocalizedText::same(&self.detail),
            timestamp,
            road_name: None,
            risk_score: None,
            distance_km: None,
            icon: labels::icon_for(event_type),
            source: EventSource::IncidentFeed,
        }
    }
}
