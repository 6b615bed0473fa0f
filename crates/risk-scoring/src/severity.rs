//! Accident severity-class prediction.
//!
//! Probability split over minor/serious/fatal outcomes, shifted by the same
//! factor set the composite score uses. This stands in for the upstream
//! gradient-boosted model when only local features are available.

use crate::{Lighting, RiskFactors, Weather};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityClass {
    Minor,
    Serious,
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityPrediction {
    pub class: SeverityClass,
    /// Probability of the predicted class, after normalization
    pub probability: f64,
    pub confidence: f64,
}

/// Predict the most likely accident severity class for the given factors.
pub fn predict_severity_class(factors: &RiskFactors) -> SeverityPrediction {
    let mut minor: f64 = 0.6;
    let mut serious: f64 = 0.3;
    let mut fatal: f64 = 0.1;

    if matches!(factors.weather, Weather::HeavyRain | Weather::Fog) {
        serious += 0.10;
        fatal += 0.05;
        minor -= 0.15;
    }

    if factors.speed_limit >= 90 {
        serious += 0.15;
        fatal += 0.10;
        minor -= 0.25;
    }

    if factors.lighting == Lighting::Night {
        serious += 0.10;
        fatal += 0.05;
        minor -= 0.15;
    }

    if factors.is_late_night() {
        fatal += 0.10;
        serious += 0.05;
        minor -= 0.15;
    }

    let total = minor + serious + fatal;
    minor /= total;
    serious /= total;
    fatal /= total;

    let (class, probability) = if fatal >= serious && fatal >= minor {
        (SeverityClass::Fatal, fatal)
    } else if serious >= minor {
        (SeverityClass::Serious, serious)
    } else {
        (SeverityClass::Minor, minor)
    };

    SeverityPrediction {
        class,
        probability,
        confidence: 0.75 + probability * 0.2,
    }
}
