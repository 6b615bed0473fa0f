//! Composite Risk Scoring
//!
//! Implements the 4-factor weighted risk model:
//!
//! ```text
//! overall = 0.30*traffic + 0.30*historical + 0.20*temporal + 0.20*environmental
//! ```
//!
//! Each factor is computed independently, clamped to 0-100 before the
//! weighted sum, and reported alongside the composite so the caller can show
//! a per-factor breakdown. Advisory strings are generated by evaluating each
//! trigger on its own; several can fire for the same score.

use chrono::{DateTime, Datelike, Local, Timelike};
use geo_grid::GeoPoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod severity;

pub use severity::{predict_severity_class, SeverityClass, SeverityPrediction};

/// Factor weights (sum = 1.0)
pub const W_TRAFFIC: f64 = 0.30;
pub const W_HISTORICAL: f64 = 0.30;
pub const W_TEMPORAL: f64 = 0.20;
pub const W_ENVIRONMENTAL: f64 = 0.20;

/// Weather condition feeding the environmental factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Clear,
    Cloudy,
    Rain,
    HeavyRain,
    Fog,
}

impl Weather {
    /// Additive environmental penalty for this condition.
    pub fn penalty(&self) -> f64 {
        match self {
            Weather::Clear => 0.0,
            Weather::Cloudy => 5.0,
            Weather::Rain => 25.0,
            Weather::HeavyRain => 45.0,
            Weather::Fog => 35.0,
        }
    }
}

/// Road class, scaling the traffic factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Highway,
    MainRoad,
    SecondaryRoad,
    LocalRoad,
}

impl RoadType {
    /// Higher speeds mean higher risk per unit of congestion.
    pub fn multiplier(&self) -> f64 {
        match self {
            RoadType::Highway => 1.2,
            RoadType::MainRoad => 1.0,
            RoadType::SecondaryRoad => 0.9,
            RoadType::LocalRoad => 0.7,
        }
    }
}

/// Lighting condition, derived from the hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lighting {
    Day,
    Night,
    DuskDawn,
}

impl Lighting {
    /// Dusk/dawn at 06-07 and 18-19, day 07-18, night otherwise.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6 => Lighting::DuskDawn,
            7..=17 => Lighting::Day,
            18 => Lighting::DuskDawn,
            _ => Lighting::Night,
        }
    }
}

/// Complete input set for one scoring call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactors {
    /// Region congestion index, 0-10
    pub traffic_index: f64,
    /// Accident count near the location
    pub historical_accidents: u32,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of week, 0 = Sunday
    pub day_of_week: u32,
    pub weather: Weather,
    pub road_type: RoadType,
    /// km/h
    pub speed_limit: u32,
    pub lighting: Lighting,
}

/// Partial overrides supplied by the caller; everything left `None` is
/// defaulted from the current wall clock and conservative assumptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreContext {
    pub historical_accidents: Option<u32>,
    pub weather: Option<Weather>,
    pub road_type: Option<RoadType>,
    pub speed_limit: Option<u32>,
    pub hour: Option<u32>,
    pub day_of_week: Option<u32>,
}

impl RiskFactors {
    /// Build a complete factor set from a partial context.
    ///
    /// `traffic_index` comes from the live congestion feed and is resolved by
    /// the caller; time fields default from `now`.
    pub fn build(traffic_index: f64, ctx: &ScoreContext, now: DateTime<Local>) -> Self {
        let hour = ctx.hour.unwrap_or_else(|| now.hour());
        let day_of_week = ctx
            .day_of_week
            .unwrap_or_else(|| now.weekday().num_days_from_sunday());

        Self {
            traffic_index,
            historical_accidents: ctx.historical_accidents.unwrap_or(0),
            hour,
            day_of_week,
            weather: ctx.weather.unwrap_or(Weather::Clear),
            road_type: ctx.road_type.unwrap_or(RoadType::MainRoad),
            speed_limit: ctx.speed_limit.unwrap_or(80),
            lighting: Lighting::from_hour(hour),
        }
    }

    pub fn is_rush_hour(&self) -> bool {
        (7..=9).contains(&self.hour) || (17..=19).contains(&self.hour)
    }

    pub fn is_late_night(&self) -> bool {
        self.hour >= 22 || self.hour <= 4
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week == 0 || self.day_of_week == 6
    }
}

/// Overall risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Severe,
}

impl RiskLevel {
    pub fn from_score(overall: u8) -> Self {
        match overall {
            0..=29 => RiskLevel::Low,
            30..=49 => RiskLevel::Medium,
            50..=69 => RiskLevel::High,
            _ => RiskLevel::Severe,
        }
    }
}

/// Per-factor breakdown, each 0-100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FactorScores {
    pub traffic: u8,
    pub historical: u8,
    pub temporal: u8,
    pub environmental: u8,
}

/// Result of one scoring call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Weighted composite, 0-100
    pub overall: u8,
    pub level: RiskLevel,
    pub factors: FactorScores,
    /// Advisory strings, in trigger evaluation order
    pub recommendations: Vec<String>,
}

/// Traffic factor: congestion index scaled to 0-100, adjusted by road class.
fn traffic_risk(factors: &RiskFactors) -> f64 {
    let risk = factors.traffic_index * 10.0 * factors.road_type.multiplier();
    risk.clamp(0.0, 100.0)
}

/// Historical factor: step function of nearby accident count.
///
/// The 75 band is inclusive of 30 so the severity-derived proxy (high -> 30)
/// lands on it rather than jumping to the top band.
fn historical_risk(factors: &RiskFactors) -> f64 {
    match factors.historical_accidents {
        0 => 10.0,
        1..=4 => 25.0,
        5..=9 => 40.0,
        10..=19 => 60.0,
        20..=30 => 75.0,
        _ => 90.0,
    }
}

/// Temporal factor: base 30 plus rush-hour / late-night / weekend / lighting
/// surcharges. The rush and late-night windows are disjoint by construction.
fn temporal_risk(factors: &RiskFactors) -> f64 {
    let mut risk: f64 = 30.0;

    if factors.is_rush_hour() {
        risk += 25.0;
    } else if factors.is_late_night() {
        // Fatigue, reduced visibility
        risk += 30.0;
    }

    if factors.is_weekend() {
        risk += 5.0;
    }

    match factors.lighting {
        Lighting::Night => risk += 15.0,
        Lighting::DuskDawn => risk += 10.0,
        Lighting::Day => {}
    }

    risk.min(100.0)
}

/// Environmental factor: base 20 plus weather and speed-limit penalties.
fn environmental_risk(factors: &RiskFactors) -> f64 {
    let mut risk = 20.0 + factors.weather.penalty();

    if factors.speed_limit >= 120 {
        risk += 15.0;
    } else if factors.speed_limit >= 90 {
        risk += 10.0;
    } else if factors.speed_limit >= 60 {
        risk += 5.0;
    }

    risk.min(100.0)
}

/// Score a complete factor set.
pub fn score(factors: &RiskFactors) -> RiskScore {
    let traffic = traffic_risk(factors);
    let historical = historical_risk(factors);
    let temporal = temporal_risk(factors);
    let environmental = environmental_risk(factors);

    let overall = (W_TRAFFIC * traffic
        + W_HISTORICAL * historical
        + W_TEMPORAL * temporal
        + W_ENVIRONMENTAL * environmental)
        .round() as u8;

    RiskScore {
        overall,
        level: RiskLevel::from_score(overall),
        factors: FactorScores {
            traffic: traffic.round() as u8,
            historical: historical.round() as u8,
            temporal: temporal.round() as u8,
            environmental: environmental.round() as u8,
        },
        recommendations: recommendations(overall, factors),
    }
}

/// Score a location. The coordinates do not change the math; they are kept on
/// the contract for logging and symmetry with the area-scan callers.
pub fn score_location(location: GeoPoint, factors: &RiskFactors) -> RiskScore {
    let result = score(factors);
    debug!(
        lat = location.lat,
        lng = location.lng,
        overall = result.overall,
        "scored location"
    );
    result
}

/// Evaluate every advisory trigger independently, in fixed order.
fn recommendations(overall: u8, factors: &RiskFactors) -> Vec<String> {
    let mut recs: Vec<String> = Vec::new();
    let mut push = |s: &str| recs.push(s.to_string());

    if overall >= 70 {
        push("Consider delaying your trip if possible");
        push("Use alternative routes with lower traffic");
    }

    if factors.traffic_index >= 7.0 {
        push("Heavy traffic detected - expect delays");
        push("Maintain safe following distance");
    }

    if factors.is_late_night() {
        push("Late night driving - stay alert for fatigue");
        push("Watch for reduced visibility");
    }

    if factors.is_rush_hour() {
        push("Rush hour period - exercise extra caution");
    }

    match factors.weather {
        Weather::HeavyRain | Weather::Fog => {
            push("Poor weather conditions - reduce speed");
            push("Turn on headlights and use fog lights if available");
        }
        Weather::Rain => push("Wet road conditions - drive carefully"),
        _ => {}
    }

    if factors.historical_accidents >= 20 {
        push("High accident zone - stay extra vigilant");
    }

    if factors.lighting != Lighting::Day {
        push("Reduced visibility - use headlights");
    }

    if factors.speed_limit >= 90 {
        push("High-speed area - maintain safe speeds");
    }

    if recs.is_empty() {
        recs.push("Area is relatively safe".to_string());
        recs.push("Continue to drive defensively".to_string());
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calm_midday() -> RiskFactors {
        RiskFactors {
            traffic_index: 2.0,
            historical_accidents: 0,
            hour: 11,
            day_of_week: 2,
            weather: Weather::Clear,
            road_type: RoadType::MainRoad,
            speed_limit: 50,
            lighting: Lighting::from_hour(11),
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(49), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::Severe);
    }

    #[test]
    fn test_historical_step_function() {
        let mut f = calm_midday();
        for (count, expected) in [(0, 10), (3, 25), (7, 40), (15, 60), (25, 75), (30, 75), (31, 90)]
        {
            f.historical_accidents = count;
            assert_eq!(
                historical_risk(&f) as u8, expected,
                "count {} should map to {}",
                count, expected
            );
        }
    }

    #[test]
    fn test_severity_proxy_lands_on_75() {
        // The enrichment proxy for a high-severity event is 30 accidents
        let mut f = calm_midday();
        f.historical_accidents = 30;
        let result = score(&f);
        assert_eq!(result.factors.historical, 75);
    }

    #[test]
    fn test_rush_hour_and_late_night_disjoint() {
        let mut f = calm_midday();
        f.hour = 8;
        assert!(f.is_rush_hour() && !f.is_late_night());
        f.hour = 23;
        assert!(f.is_late_night() && !f.is_rush_hour());
    }

    #[test]
    fn test_late_night_outranks_rush_bonus() {
        let mut rush = calm_midday();
        rush.hour = 8; // day lighting
        let mut late = calm_midday();
        late.hour = 2; // night lighting

        // 30 + 25 (rush) vs 30 + 30 (late) + 15 (night lighting)
        assert_eq!(temporal_risk(&rush) as u8, 55);
        assert_eq!(temporal_risk(&late) as u8, 75);
    }

    #[test]
    fn test_road_type_scales_traffic() {
        let mut f = calm_midday();
        f.traffic_index = 8.0;
        f.road_type = RoadType::Highway;
        let highway = traffic_risk(&f);
        f.road_type = RoadType::LocalRoad;
        let local = traffic_risk(&f);
        assert!(highway > local, "{} vs {}", highway, local);
        assert_eq!(highway as u8, 96);
        assert_eq!(local as u8, 56);
    }

    #[test]
    fn test_traffic_capped_at_100() {
        let mut f = calm_midday();
        f.traffic_index = 10.0;
        f.road_type = RoadType::Highway;
        assert_eq!(traffic_risk(&f) as u8, 100);
    }

    #[test]
    fn test_quiet_area_gets_generic_advice() {
        let result = score(&calm_midday());
        assert_eq!(result.level, RiskLevel::Low);
        assert_eq!(
            result.recommendations,
            vec![
                "Area is relatively safe".to_string(),
                "Continue to drive defensively".to_string()
            ]
        );
    }

    #[test]
    fn test_multiple_triggers_co_occur() {
        let f = RiskFactors {
            traffic_index: 9.0,
            historical_accidents: 35,
            hour: 23,
            day_of_week: 6,
            weather: Weather::HeavyRain,
            road_type: RoadType::Highway,
            speed_limit: 120,
            lighting: Lighting::from_hour(23),
        };
        let result = score(&f);
        assert_eq!(result.level, RiskLevel::Severe);
        // overall, traffic, late-night, weather, historical, lighting, speed
        assert!(result.recommendations.len() >= 8);
        assert_eq!(
            result.recommendations[0],
            "Consider delaying your trip if possible"
        );
    }

    #[test]
    fn test_context_defaults() {
        let now = Local::now();
        let f = RiskFactors::build(5.0, &ScoreContext::default(), now);
        assert_eq!(f.historical_accidents, 0);
        assert_eq!(f.weather, Weather::Clear);
        assert_eq!(f.road_type, RoadType::MainRoad);
        assert_eq!(f.speed_limit, 80);
        assert_eq!(f.lighting, Lighting::from_hour(f.hour));
    }

    #[test]
    fn test_lighting_windows() {
        assert_eq!(Lighting::from_hour(6), Lighting::DuskDawn);
        assert_eq!(Lighting::from_hour(7), Lighting::Day);
        assert_eq!(Lighting::from_hour(17), Lighting::Day);
        assert_eq!(Lighting::from_hour(18), Lighting::DuskDawn);
        assert_eq!(Lighting::from_hour(19), Lighting::Night);
        assert_eq!(Lighting::from_hour(2), Lighting::Night);
    }

    proptest! {
        #[test]
        fn prop_all_factors_in_range(
            traffic_index in 0.0f64..10.0,
            accidents in 0u32..200,
            hour in 0u32..24,
            dow in 0u32..7,
            speed in 30u32..160,
        ) {
            let f = RiskFactors {
                traffic_index,
                historical_accidents: accidents,
                hour,
                day_of_week: dow,
                weather: Weather::HeavyRain,
                road_type: RoadType::Highway,
                speed_limit: speed,
                lighting: Lighting::from_hour(hour),
            };
            let result = score(&f);
            prop_assert!(result.overall <= 100);
            prop_assert!(result.factors.traffic <= 100);
            prop_assert!(result.factors.historical <= 100);
            prop_assert!(result.factors.temporal <= 100);
            prop_assert!(result.factors.environmental <= 100);
            prop_assert!(!result.recommendations.is_empty());
        }
    }
}
