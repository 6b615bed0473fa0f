//! Speed-derived congestion classification.
//!
//! A probe reading is classified into one of five flow tiers purely from the
//! observed speed against an estimated road-class speed limit. Only the
//! congested and slow tiers are worth reporting; smooth traffic is discarded
//! by the caller.

use crate::{labels, EventSource, EventType, LocalizedText, RiskEvent, Severity};
use chrono::{DateTime, Utc};
use geo_grid::GeoPoint;
use serde::{Deserialize, Serialize};

/// Discrete traffic-flow class, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionTier {
    Severe,
    Heavy,
    Moderate,
    Light,
    Smooth,
}

impl CongestionTier {
    /// Classify an observed speed (km/h) against the estimated limit.
    pub fn from_speed(speed_kmh: f64, speed_limit_kmh: f64) -> Self {
        if speed_kmh < 10.0 {
            CongestionTier::Severe
        } else if speed_kmh < 20.0 {
            CongestionTier::Heavy
        } else if speed_kmh < 35.0 {
            CongestionTier::Moderate
        } else if speed_kmh < speed_limit_kmh * 0.7 {
            CongestionTier::Light
        } else {
            CongestionTier::Smooth
        }
    }

    /// Source-scale severity (1-10) for this tier.
    pub fn severity_scale(&self) -> u8 {
        match self {
            CongestionTier::Severe => 9,
            CongestionTier::Heavy => 7,
            CongestionTier::Moderate => 5,
            CongestionTier::Light => 3,
            CongestionTier::Smooth => 1,
        }
    }

    /// Whether the tier represents a traffic problem worth surfacing.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, CongestionTier::Smooth)
    }
}

/// Estimate a speed limit (km/h) from road-name substrings.
///
/// The probe does not return road class, so this mirrors the upstream naming
/// conventions, Thai names included.
pub fn estimate_speed_limit_kmh(road_name: &str) -> f64 {
    let road = road_name.to_lowercase();

    if road.contains("expressway")
        || road.contains("motorway")
        || road.contains("highway")
        || road.contains("ทางด่วน")
    {
        90.0
    } else if road.contains("road")
        || road.contains("avenue")
        || road.contains("boulevard")
        || road.contains("ถนน")
    {
        60.0
    } else if road.contains("street") || road.contains("soi") || road.contains("lane") || road.contains("ซอย") {
        50.0
    } else {
        60.0
    }
}

/// One classified probe observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongestionReading {
    pub location: GeoPoint,
    pub road: String,
    pub speed_kmh: f64,
    pub speed_limit_kmh: f64,
    pub tier: CongestionTier,
    /// Upstream source marker ("real-time" or "predicted")
    pub origin: String,
    pub timestamp: DateTime<Utc>,
}

impl CongestionReading {
    pub fn classify(
        location: GeoPoint,
        road: String,
        speed_kmh: f64,
        origin: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let speed_limit_kmh = estimate_speed_limit_kmh(&road);
        let tier = CongestionTier::from_speed(speed_kmh, speed_limit_kmh);
        Self {
            location,
            road,
            speed_kmh,
            speed_limit_kmh,
            tier,
            origin,
            timestamp,
        }
    }

    fn titles(&self) -> (LocalizedText, LocalizedText) {
        let speed = self.speed_kmh.round() as i64;
        let road = &self.road;
        match self.tier {
            CongestionTier::Severe => (
                LocalizedText::new(
                    format!("Severe Congestion - {road}"),
                    format!("รถติดหนักมาก - {road}"),
                ),
                LocalizedText::new(
                    format!("Heavy traffic jam, average speed {speed} km/h"),
                    format!("การจราจรติดขัดอย่างหนัก ความเร็วเฉลี่ย {speed} กม./ชม."),
                ),
            ),
            CongestionTier::Heavy => (
                LocalizedText::new(
                    format!("Heavy Traffic - {road}"),
                    format!("รถติดหนัก - {road}"),
                ),
                LocalizedText::new(
                    format!("Heavy traffic, average speed {speed} km/h"),
                    format!("การจราจรหนาแน่น ความเร็วเฉลี่ย {speed} กม./ชม."),
                ),
            ),
            CongestionTier::Moderate => (
                LocalizedText::new(format!("Slow Traffic - {road}"), format!("รถช้า - {road}")),
                LocalizedText::new(
                    format!("Slow moving traffic, average speed {speed} km/h"),
                    format!("การจราจรช้า ความเร็วเฉลี่ย {speed} กม./ชม."),
                ),
            ),
            CongestionTier::Light => (
                LocalizedText::new(
                    format!("Light Traffic - {road}"),
                    format!("การจราจรคล่องตัว - {road}"),
                ),
                LocalizedText::new(
                    format!("Light traffic, average speed {speed} km/h"),
                    format!("การจราจรคล่องตัว ความเร็วเฉลี่ย {speed} กม./ชม."),
                ),
            ),
            CongestionTier::Smooth => (
                LocalizedText::new(
                    format!("Normal Traffic - {road}"),
                    format!("การจราจรปกติ - {road}"),
                ),
                LocalizedText::new(
                    format!("Normal traffic flow, average speed {speed} km/h"),
                    format!("การจราจรปกติ ความเร็วเฉลี่ย {speed} กม./ชม."),
                ),
            ),
        }
    }

    /// Normalize into the canonical event shape.
    pub fn to_event(&self) -> RiskEvent {
        let (title, description) = self.titles();
        RiskEvent {
            id: format!(
                "traffic-{:.4}-{:.4}-{}",
                self.location.lat,
                self.location.lng,
                self.timestamp.timestamp()
            ),
            event_type: EventType::Congestion,
            severity: Severity::from_scale(self.tier.severity_scale()),
            location: self.location,
            title,
            description,
            timestamp: self.timestamp,
            road_name: Some(self.road.clone()),
            risk_score: None,
            distance_km: None,
            icon: labels::icon_for(EventType::Congestion),
            source: EventSource::CongestionProbe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(CongestionTier::from_speed(0.0, 60.0), CongestionTier::Severe);
        assert_eq!(CongestionTier::from_speed(9.9, 60.0), CongestionTier::Severe);
        assert_eq!(CongestionTier::from_speed(10.0, 60.0), CongestionTier::Heavy);
        assert_eq!(CongestionTier::from_speed(25.0, 60.0), CongestionTier::Moderate);
        assert_eq!(CongestionTier::from_speed(38.0, 60.0), CongestionTier::Light);
        assert_eq!(CongestionTier::from_speed(55.0, 60.0), CongestionTier::Smooth);
    }

    #[test]
    fn test_severity_monotonic_in_speed() {
        let limit = 90.0;
        let mut last = u8::MAX;
        for speed in 0..120 {
            let severity = CongestionTier::from_speed(speed as f64, limit).severity_scale();
            assert!(
                severity <= last,
                "severity went up at {} km/h: {} > {}",
                speed,
                severity,
                last
            );
            last = severity;
        }
    }

    #[test]
    fn test_speed_limit_estimation() {
        assert_eq!(estimate_speed_limit_kmh("Chalerm Maha Nakhon Expressway"), 90.0);
        assert_eq!(estimate_speed_limit_kmh("Sukhumvit Road"), 60.0);
        assert_eq!(estimate_speed_limit_kmh("Soi Thonglor 10"), 50.0);
        assert_eq!(estimate_speed_limit_kmh("ถนนพระราม 4"), 60.0);
        assert_eq!(estimate_speed_limit_kmh("Unknown"), 60.0);
    }

    #[test]
    fn test_reading_to_event() {
        let reading = CongestionReading::classify(
            GeoPoint::new(13.7563, 100.5018),
            "Phahonyothin Road".to_string(),
            8.0,
            "real-time".to_string(),
            Utc::now(),
        );
        assert_eq!(reading.tier, CongestionTier::Severe);

        let event = reading.to_event();
        assert_eq!(event.event_type, EventType::Congestion);
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.source, EventSource::CongestionProbe);
        assert!(event.title.en.contains("Phahonyothin Road"));
        assert!(event.description.en.contains("8 km/h"));
        assert!(event.description.th.contains("กม./ชม."));
    }

    #[test]
    fn test_smooth_tier_not_reportable() {
        assert!(!CongestionTier::Smooth.is_reportable());
        assert!(CongestionTier::Moderate.is_reportable());
        assert!(CongestionTier::Light.is_reportable());
    }
}
