use anyhow::Result;
use axum::{
    routing::{get, post},
    Json, Router,
};
use event_pipeline::{PipelineConfig, RiskMapService};
use prediction_client::{
    IncidentFeed, IncidentFeedConfig, MlPredictor, MlPredictorConfig, SpeedProbe, SpeedProbeConfig,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "roadrisk_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let traffic_key = std::env::var("TRAFFIC_API_KEY").unwrap_or_default();

    let feed = Arc::new(IncidentFeed::new(IncidentFeedConfig {
        base_url: std::env::var("TRAFFIC_API_URL")
            .unwrap_or_else(|_| "https://traffic.longdo.com/api/json".to_string()),
        api_key: traffic_key.clone(),
        ..IncidentFeedConfig::default()
    })?);

    let predictor = Arc::new(MlPredictor::new(MlPredictorConfig {
        base_url: std::env::var("ML_API_URL")
            .unwrap_or_else(|_| "http://localhost:10000".to_string()),
        ..MlPredictorConfig::default()
    })?);

    let probe = Arc::new(SpeedProbe::new(SpeedProbeConfig {
        base_url: std::env::var("SPEED_API_URL")
            .unwrap_or_else(|_| "https://api.longdo.com/RouteService/json".to_string()),
        api_key: traffic_key,
        ..SpeedProbeConfig::default()
    })?);

    let pipeline_config = PipelineConfig {
        probe_congestion: std::env::var("PROBE_CONGESTION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        ..PipelineConfig::default()
    };

    let service = Arc::new(RiskMapService::new(
        feed.clone(),
        predictor,
        probe,
        pipeline_config,
    ));

    let state = AppState { service, feed };

    // API routes for event aggregation and point scoring
    let api_routes = Router::new()
        .route("/events", get(routes::list_events))
        .route("/events/statistics", get(routes::event_statistics))
        .route("/events/congestion", get(routes::scan_congestion))
        .route("/traffic/index", get(routes::traffic_index))
        .route("/cache/clear", post(routes::clear_cache))
        .route("/risk/score", post(routes::score_point))
        .route("/risk/severity", post(routes::predict_severity))
        .with_state(state);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes)
        .layer(CorsLayer::permissive());

    let port = std::env::var("ROADRISK_GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "18080".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("🚦 RoadRisk Gateway starting on {}", addr);
    tracing::info!("   Sources: incident feed, ML predictor, speed probe");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "roadrisk-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
