use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::models::DetectedCard;
use crate::services::image_payload::ImagePayload;

const DEFAULT_CONFIDENCE: f32 = 0.5;

pub const DETECTION_PROMPT: &str = r#"You are an expert Pokemon Trading Card Game cataloguer.
The photo shows a binder page holding Pokemon cards, usually in a 3x3 grid.
Identify every card you can see, in reading order (left to right, top to bottom).
For each card report:
- "name": the card name exactly as printed, including suffixes such as ex, GX, V, VMAX or VSTAR
- "set": the expansion name if you can tell it from the set symbol or card layout, otherwise null
- "number": the collector number as printed (for example "025/165"), otherwise null
- "confidence": a number between 0 and 1
Skip empty pockets and card backs. Do not guess names you cannot read.
Reply with JSON only, in the form {"cards":[{"name":"...","set":"...","number":"...","confidence":0.9}]}"#;

#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("OpenAI API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    ApiError(String),

    #[error("Could not parse model reply: {0}")]
    InvalidReply(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

/// Client for the OpenAI chat-completions vision endpoint.
#[derive(Clone)]
pub struct VisionClient {
    http: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    model: String,
    max_tokens: u32,
    max_cards: usize,
}

impl VisionClient {
    pub fn from_config(config: &Config) -> Result<Self, VisionError> {
        let http = Client::builder()
            .timeout(config.vision_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            max_tokens: config.openai_max_tokens,
            max_cards: config.max_cards,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Asks the model which cards are on the binder page.
    #[tracing::instrument(skip(self, image), fields(mime = %image.mime_type, bytes = image.byte_len))]
    pub async fn detect_cards(&self, image: &ImagePayload) -> Result<Vec<DetectedCard>, VisionError> {
        let api_key = self.api_key.as_ref().ok_or(VisionError::MissingApiKey)?;

        let request_body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: DETECTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                            detail: "high",
                        },
                    },
                ],
            }],
        };

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(
                status = %status,
                error = %error_text,
                "OpenAI request failed"
            );
            return Err(VisionError::ApiError(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidReply(format!("Failed to parse response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VisionError::InvalidReply("Empty reply".to_string()))?;

        let cards = parse_detected_cards(&content, self.max_cards)?;

        tracing::info!(card_count = cards.len(), "Cards detected");

        Ok(cards)
    }
}

/// Turns the model's free-form reply into detected cards.
pub fn parse_detected_cards(content: &str, max_cards: usize) -> Result<Vec<DetectedCard>, VisionError> {
    let json_text = extract_json(content)
        .ok_or_else(|| VisionError::InvalidReply("No JSON found in reply".to_string()))?;

    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| VisionError::InvalidReply(e.to_string()))?;

    let entries: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("cards").or_else(|| map.get("results")) {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(VisionError::InvalidReply(
                    "\"cards\" is not an array".to_string(),
                ))
            }
        },
        _ => {
            return Err(VisionError::InvalidReply(
                "Reply is neither an object nor an array".to_string(),
            ))
        }
    };

    Ok(entries
        .iter()
        .filter_map(detected_card_from_value)
        .take(max_cards)
        .collect())
}

/// Strips Markdown fences and any prose around the JSON payload.
fn extract_json(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
            rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest)
        }
        None => trimmed,
    };

    let start = unfenced.find(&['{', '['][..])?;
    let close = if unfenced[start..].starts_with('{') { '}' } else { ']' };
    let end = unfenced.rfind(close)?;
    (end > start).then(|| &unfenced[start..=end])
}

fn detected_card_from_value(value: &Value) -> Option<DetectedCard> {
    let name = text_field(value.get("name")?)?;

    Some(DetectedCard {
        name,
        set: value
            .get("set")
            .or_else(|| value.get("setName"))
            .and_then(text_field),
        number: value
            .get("number")
            .or_else(|| value.get("collectorNumber"))
            .and_then(text_field),
        confidence: value
            .get("confidence")
            .and_then(confidence_field)
            .unwrap_or(DEFAULT_CONFIDENCE),
    })
}

fn text_field(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let lowered = text.to_ascii_lowercase();
    if text.is_empty() || matches!(lowered.as_str(), "null" | "unknown" | "n/a" | "?") {
        return None;
    }

    Some(text)
}

fn confidence_field(value: &Value) -> Option<f32> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !raw.is_finite() {
        return None;
    }

    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(scaled.clamp(0.0, 1.0) as f32)
}
