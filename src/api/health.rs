use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;

use crate::api::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyReport {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub set_cache_age_secs: Option<u64>,
    pub dependencies: DependencyStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub vision: ServiceHealth,
    pub pokemon_tcg: ServiceHealth,
    pub tcgdex: ServiceHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    fn from_result<E: std::fmt::Display>(start: Instant, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => ServiceHealth {
                status: "healthy".to_string(),
                response_time_ms: start.elapsed().as_millis(),
                error: None,
            },
            Err(e) => ServiceHealth {
                status: "unhealthy".to_string(),
                response_time_ms: start.elapsed().as_millis(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Dependency check
/// Returns 200 if both card catalogs answer, 503 if either is down
pub async fn dependency_health(State(state): State<AppState>) -> (StatusCode, Json<DependencyReport>) {
    let start = Instant::now();

    // The vision model is only checked for configuration; a probe call costs tokens.
    let vision_health = if state.vision.is_configured() {
        ServiceHealth {
            status: "configured".to_string(),
            response_time_ms: 0,
            error: None,
        }
    } else {
        ServiceHealth {
            status: "not_configured".to_string(),
            response_time_ms: 0,
            error: Some("OPENAI_API_KEY not configured".to_string()),
        }
    };

    let probe_start = Instant::now();
    let pokemon_tcg_health = ServiceHealth::from_result(
        probe_start,
        state.resolver.pokemon_tcg().ping().await,
    );

    let probe_start = Instant::now();
    let tcgdex_health =
        ServiceHealth::from_result(probe_start, state.resolver.tcgdex().ping().await);

    let all_healthy = pokemon_tcg_health.status == "healthy" && tcgdex_health.status == "healthy";

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = DependencyReport {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        set_cache_age_secs: state
            .resolver
            .set_cache()
            .age()
            .await
            .map(|age| age.as_secs()),
        dependencies: DependencyStatus {
            vision: vision_health,
            pokemon_tcg: pokemon_tcg_health,
            tcgdex: tcgdex_health,
        },
    };

    tracing::info!(
        status = %response.status,
        duration_ms = start.elapsed().as_millis(),
        "Health check completed"
    );

    (status_code, Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/health/dependencies", get(dependency_health))
}
