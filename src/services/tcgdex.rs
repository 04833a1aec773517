use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum TcgdexError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Card not found")]
    NotFound,

    #[error("TCGdex API error: {0}")]
    ApiError(String),
}

/// Search result entry from `/cards?name=`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgdexCardBrief {
    pub id: String,
    pub local_id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl TcgdexCardBrief {
    pub fn image_url(&self) -> Option<String> {
        self.image.as_deref().map(high_quality_image)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgdexCard {
    pub id: String,
    pub local_id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub set: Option<TcgdexSetBrief>,
    #[serde(default)]
    pub pricing: Option<TcgdexPricing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TcgdexSetBrief {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TcgdexPricing {
    #[serde(default)]
    pub cardmarket: Option<TcgdexCardmarketPrice>,
    #[serde(default)]
    pub tcgplayer: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TcgdexCardmarketPrice {
    pub avg: Option<f64>,
    pub trend: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// TCGdex serves assets without an extension; quality and format are appended.
pub fn high_quality_image(base: &str) -> String {
    format!("{}/high.png", base.trim_end_matches('/'))
}

/// Client for `api.tcgdex.net/v2`.
#[derive(Clone)]
pub struct TcgdexClient {
    http: Client,
    base_url: String,
    language: String,
}

impl TcgdexClient {
    pub fn from_config(config: &Config) -> Result<Self, TcgdexError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.tcgdex_base_url.trim_end_matches('/').to_string(),
            language: config.tcgdex_language.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.language, path)
    }

    pub async fn ping(&self) -> Result<(), TcgdexError> {
        let response = self.http.get(self.endpoint("/series")).send().await?;

        if response.status().is_server_error() {
            return Err(TcgdexError::ApiError(format!(
                "TCGdex unavailable: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Name search; TCGdex matches names containing the given text.
    #[tracing::instrument(skip(self))]
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<TcgdexCardBrief>, TcgdexError> {
        let url = self.endpoint("/cards");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(&[("name", name)])
            .send()
            .await?;

        // TCGdex answers an empty search with 404
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TCGdex search failed");
            return Err(TcgdexError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let cards: Vec<TcgdexCardBrief> = response
            .json()
            .await
            .map_err(|e| TcgdexError::ApiError(format!("Failed to parse response: {}", e)))?;

        tracing::debug!(results = cards.len(), "TCGdex search completed");

        Ok(cards)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_card(&self, id: &str) -> Result<TcgdexCard, TcgdexError> {
        let url = self.endpoint(&format!("/cards/{}", id));

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Err(TcgdexError::NotFound),
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| TcgdexError::ApiError(format!("Failed to parse response: {}", e))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(TcgdexError::ApiError(format!("HTTP {}: {}", status, body)))
            }
        }
    }
}
