use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;

use crate::config::Config;
use crate::models::CardSet;

const SET_PAGE_SIZE: u32 = 250;
/// Guards against a misbehaving `totalCount`.
const MAX_SET_PAGES: u32 = 10;

#[derive(thiserror::Error, Debug)]
pub enum PokemonTcgError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Pokemon TCG API error: {0}")]
    ApiError(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    total_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgCard {
    pub id: String,
    pub name: String,
    pub number: String,
    pub set: CardSet,
    #[serde(default)]
    pub images: Option<CardImages>,
    #[serde(default)]
    pub tcgplayer: Option<TcgPlayer>,
    #[serde(default)]
    pub cardmarket: Option<CardMarket>,
}

impl TcgCard {
    pub fn image_url(&self) -> Option<&str> {
        let images = self.images.as_ref()?;
        images.large.as_deref().or(images.small.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardImages {
    pub small: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TcgPlayer {
    #[serde(default)]
    pub prices: HashMap<String, TcgPlayerPrice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TcgPlayerPrice {
    pub low: Option<f64>,
    pub mid: Option<f64>,
    pub market: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardMarket {
    #[serde(default)]
    pub prices: Option<CardMarketPrices>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMarketPrices {
    pub average_sell_price: Option<f64>,
    pub trend_price: Option<f64>,
}

/// Sort order for card searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOrder {
    Relevance,
    NewestFirst,
}

/// Client for `api.pokemontcg.io/v2`.
#[derive(Clone)]
pub struct PokemonTcgClient {
    http: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
}

impl PokemonTcgClient {
    pub fn from_config(config: &Config) -> Result<Self, PokemonTcgError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.pokemontcg_base_url.trim_end_matches('/').to_string(),
            api_key: config.pokemontcg_api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PokemonTcgError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(query);

        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key.expose_secret());
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, url = %url, "Pokemon TCG API request failed");
            return Err(PokemonTcgError::ApiError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PokemonTcgError::ApiError(format!("Failed to parse response: {}", e)))
    }

    /// Cheap reachability probe for the dependency health check.
    pub async fn ping(&self) -> Result<(), PokemonTcgError> {
        let _: Page<CardSet> = self
            .get_json("/sets", &[("pageSize", "1".to_string())])
            .await?;
        Ok(())
    }

    /// Runs a card search using the API's Lucene-like `q` syntax.
    #[tracing::instrument(skip(self))]
    pub async fn search_cards(
        &self,
        q: &str,
        page_size: u32,
        order: CardOrder,
    ) -> Result<Vec<TcgCard>, PokemonTcgError> {
        let mut query = vec![("q", q.to_string()), ("pageSize", page_size.to_string())];
        if order == CardOrder::NewestFirst {
            query.push(("orderBy", "-set.releaseDate".to_string()));
        }

        let page: Page<TcgCard> = self.get_json("/cards", &query).await?;

        tracing::debug!(q = %q, results = page.data.len(), "Card search completed");

        Ok(page.data)
    }

    /// Fetches every set, following pagination.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_sets(&self) -> Result<Vec<CardSet>, PokemonTcgError> {
        let mut sets = Vec::new();

        for page_number in 1..=MAX_SET_PAGES {
            let query = [
                ("page", page_number.to_string()),
                ("pageSize", SET_PAGE_SIZE.to_string()),
                ("orderBy", "releaseDate".to_string()),
            ];
            let page: Page<CardSet> = self.get_json("/sets", &query).await?;
            let fetched = page.data.len();
            sets.extend(page.data);

            let total = page.total_count.unwrap_or(0) as usize;
            if fetched < SET_PAGE_SIZE as usize || sets.len() >= total {
                break;
            }
        }

        tracing::info!(set_count = sets.len(), "Fetched Pokemon TCG set list");

        Ok(sets)
    }
}
