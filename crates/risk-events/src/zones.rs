//! ML risk-zone normalization.
//!
//! A zone is one grid point the predictor flagged. The boolean factors are
//! derived locally from the request's time inputs, never trusted from the
//! model response.

use crate::{EventSource, EventType, Language, LocalizedText, RiskEvent, Severity};
use chrono::{DateTime, Utc};
use geo_grid::GeoPoint;
use serde::{Deserialize, Serialize};

/// Context flags attached to a prediction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneFactors {
    pub is_hotspot: bool,
    pub is_rush_hour: bool,
    pub is_night: bool,
    pub is_weekend: bool,
    /// mm over the prediction window
    pub rainfall: f64,
    /// 0-1
    pub traffic_density: f64,
}

/// One scored point from the ML predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlRiskZone {
    pub id: String,
    pub location: GeoPoint,
    /// 0-100
    pub risk_score: f64,
    /// 0-1
    pub hotspot_probability: f64,
    pub severity: Severity,
    /// Model's native severity class label, when provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_class: Option<String>,
    /// 0-1
    pub confidence: f64,
    pub factors: ZoneFactors,
    pub timestamp: DateTime<Utc>,
}

impl MlRiskZone {
    fn title(&self, language: Language) -> &'static str {
        if self.factors.is_hotspot {
            return match language {
                Language::En => "High Risk Area",
                Language::Th => "พื้นที่เสี่ยงสูง",
            };
        }
        match (self.severity, language) {
            (Severity::High, Language::En) => "Accident Risk Zone",
            (Severity::High, Language::Th) => "พื้นที่เสี่ยงอุบัติเหตุ",
            (Severity::Medium, Language::En) => "Moderate Risk Area",
            (Severity::Medium, Language::Th) => "พื้นที่เสี่ยงปานกลาง",
            (Severity::Low, Language::En) => "Risk Area",
            (Severity::Low, Language::Th) => "พื้นที่เสี่ยง",
        }
    }

    fn description(&self, language: Language) -> String {
        let mut parts: Vec<String> = Vec::new();

        if self.factors.is_hotspot {
            parts.push(
                match language {
                    Language::En => "Temporal hotspot",
                    Language::Th => "จุดเสี่ยงตามช่วงเวลา",
                }
                .to_string(),
            );
        }
        if self.factors.is_rush_hour {
            parts.push(
                match language {
                    Language::En => "Rush hour",
                    Language::Th => "ช่วงเร่งด่วน",
                }
                .to_string(),
            );
        }
        if self.factors.is_night {
            parts.push(
                match language {
                    Language::En => "Night time",
                    Language::Th => "เวลากลางคืน",
                }
                .to_string(),
            );
        }
        if self.factors.rainfall > 5.0 {
            parts.push(
                match language {
                    Language::En => "Heavy rain",
                    Language::Th => "ฝนตกหนัก",
                }
                .to_string(),
            );
        }
        if self.factors.traffic_density > 0.7 {
            parts.push(
                match language {
                    Language::En => "High traffic",
                    Language::Th => "จราจรหนาแน่น",
                }
                .to_string(),
            );
        }
        if let Some(class) = &self.severity_class {
            parts.push(class.clone());
        }

        let score = self.risk_score.round() as i64;
        let risk_text = match language {
            Language::En => format!("Risk Score: {score}/100"),
            Language::Th => format!("คะแนนความเสี่ยง: {score}/100"),
        };

        if parts.is_empty() {
            risk_text
        } else {
            format!("{risk_text} • {}", parts.join(", "))
        }
    }

    /// Zone glyph: hotspots outrank plain severity.
    pub fn icon(&self) -> &'static str {
        if self.factors.is_hotspot {
            "🔥"
        } else {
            match self.severity {
                Severity::High => "⚠️",
                Severity::Medium => "⚡",
                Severity::Low => "📍",
            }
        }
    }

    /// Normalize into the canonical event shape.
    pub fn to_event(&self) -> RiskEvent {
        RiskEvent {
            id: self.id.clone(),
            event_type: EventType::HighRisk,
            severity: self.severity,
            location: self.location,
            title: LocalizedText::new(self.title(Language::En), self.title(Language::Th)),
            description: LocalizedText::new(
                self.description(Language::En),
                self.description(Language::Th),
            ),
            timestamp: self.timestamp,
            road_name: None,
            risk_score: None,
            distance_km: None,
            icon: self.icon(),
            source: EventSource::MlPredictor,
        }
    }
}
