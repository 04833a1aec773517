use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::api::{scan::json_rejection, state::AppState};
use crate::error::{AppError, Result};
use crate::models::{DetectedCard, ResolvedCard};

/// A card typed in by hand, e.g. to correct a misread detection.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/resolve
async fn resolve_card(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<ResolvedCard>> {
    let Json(request) = payload.map_err(|e| json_rejection(e, state.config.max_body_bytes))?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Missing name".to_string()));
    }

    let detected = DetectedCard {
        name: name.to_string(),
        set: non_blank(request.set),
        number: non_blank(request.number),
        confidence: 1.0,
    };

    Ok(Json(state.resolver.resolve(&detected).await))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/resolve", post(resolve_card))
}
