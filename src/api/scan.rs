use axum::{
    extract::{
        multipart::MultipartError,
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{DetectedCard, ResolvedCard};
use crate::services::image_payload::{parse_image_payload, ImagePayload};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub enrich: Option<bool>,
}

/// A card in the scan response; bare detections when enrichment is off.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScannedCard {
    Resolved(ResolvedCard),
    Detected(DetectedCard),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub scan_id: Uuid,
    pub scanned_at: String,
    pub model: String,
    pub count: usize,
    pub cards: Vec<ScannedCard>,
}

/// Maps axum's body rejections onto the JSON error shape.
pub(crate) fn json_rejection(rejection: JsonRejection, limit: usize) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::Validation(rejection.body_text())
    }
}

fn multipart_rejection(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::Validation(err.body_text())
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Detect, then optionally resolve every card against the catalogs.
async fn run_scan(state: &AppState, image: ImagePayload, enrich: bool) -> Result<ScanResponse> {
    let start = Instant::now();
    let scan_id = Uuid::new_v4();

    tracing::info!(
        scan_id = %scan_id,
        mime = %image.mime_type,
        bytes = image.byte_len,
        enrich,
        "Scan started"
    );

    let detected = state.vision.detect_cards(&image).await?;

    let cards: Vec<ScannedCard> = if enrich {
        state
            .resolver
            .resolve_all(&detected)
            .await
            .into_iter()
            .map(ScannedCard::Resolved)
            .collect()
    } else {
        detected.into_iter().map(ScannedCard::Detected).collect()
    };

    tracing::info!(
        scan_id = %scan_id,
        card_count = cards.len(),
        duration_ms = start.elapsed().as_millis(),
        "Scan completed"
    );

    Ok(ScanResponse {
        scan_id,
        scanned_at: chrono::Utc::now().to_rfc3339(),
        model: state.vision.model().to_string(),
        count: cards.len(),
        cards,
    })
}

/// POST /api/scan with `{"imageBase64": "..."}`
async fn scan(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>> {
    let Json(request) = payload.map_err(|e| json_rejection(e, state.config.max_body_bytes))?;

    let raw = request.image_base64.as_deref().unwrap_or_default();
    let image = parse_image_payload(raw, request.mime_type.as_deref())?;

    let response = run_scan(&state, image, request.enrich.unwrap_or(true)).await?;
    Ok(Json(response))
}

/// POST /api/scan/upload with a multipart `image` file
async fn scan_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>> {
    let limit = state.config.max_body_bytes;
    let mut image = None;
    let mut enrich = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_rejection(e, limit))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_rejection(e, limit))?;
                image = Some(ImagePayload::from_bytes(&bytes, content_type.as_deref())?);
            }
            Some("enrich") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_rejection(e, limit))?;
                enrich = parse_flag(&text).ok_or_else(|| {
                    AppError::Validation(format!("Invalid enrich flag: {}", text))
                })?;
            }
            _ => {
                tracing::debug!(field = ?name, "Ignoring unknown multipart field");
            }
        }
    }

    let image = image.ok_or_else(|| AppError::Validation("Missing image file".to_string()))?;

    let response = run_scan(&state, image, enrich).await?;
    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/scan", post(scan))
        .route("/api/scan/upload", post(scan_upload))
}
