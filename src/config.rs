use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_POKEMONTCG_BASE_URL: &str = "https://api.pokemontcg.io/v2";
pub const DEFAULT_TCGDEX_BASE_URL: &str = "https://api.tcgdex.net/v2";
pub const DEFAULT_PLACEHOLDER_IMAGE_URL: &str =
    "https://images.pokemontcg.io/placeholder/card-back.png";

/// 12 hours
pub const DEFAULT_SET_CACHE_TTL_SECS: u64 = 12 * 60 * 60;
/// 12 MiB, enough for a base64 encoded phone photo
pub const DEFAULT_MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    // OpenAI vision model
    pub openai_api_key: Option<Secret<String>>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,

    // Pokemon TCG API
    pub pokemontcg_api_key: Option<Secret<String>>,
    pub pokemontcg_base_url: String,

    // TCGdex
    pub tcgdex_base_url: String,
    pub tcgdex_language: String,

    // Set list cache
    pub set_cache_ttl_secs: u64,
    pub set_refresh_enabled: bool,

    // Scan behaviour
    pub placeholder_image_url: String,
    pub max_body_bytes: usize,
    pub max_cards: usize,
    pub request_timeout_secs: u64,
    pub vision_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let cfg = Self {
            host: config.get("host").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: config.get("port").unwrap_or(3001),

            openai_api_key: config
                .get::<String>("openai_api_key")
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(Secret::new),
            openai_base_url: config
                .get("openai_base_url")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: config
                .get("openai_model")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            openai_max_tokens: config.get("openai_max_tokens").unwrap_or(1500),

            pokemontcg_api_key: config
                .get::<String>("pokemontcg_api_key")
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(Secret::new),
            pokemontcg_base_url: config
                .get("pokemontcg_base_url")
                .unwrap_or_else(|_| DEFAULT_POKEMONTCG_BASE_URL.to_string()),

            tcgdex_base_url: config
                .get("tcgdex_base_url")
                .unwrap_or_else(|_| DEFAULT_TCGDEX_BASE_URL.to_string()),
            tcgdex_language: config
                .get("tcgdex_language")
                .unwrap_or_else(|_| "en".to_string()),

            set_cache_ttl_secs: config
                .get("set_cache_ttl_secs")
                .unwrap_or(DEFAULT_SET_CACHE_TTL_SECS),
            set_refresh_enabled: config.get("set_refresh_enabled").unwrap_or(true),

            placeholder_image_url: config
                .get("placeholder_image_url")
                .unwrap_or_else(|_| DEFAULT_PLACEHOLDER_IMAGE_URL.to_string()),
            max_body_bytes: config
                .get("max_body_bytes")
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            max_cards: config.get("max_cards").unwrap_or(30),
            request_timeout_secs: config.get("request_timeout_secs").unwrap_or(30),
            vision_timeout_secs: config.get("vision_timeout_secs").unwrap_or(60),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Configuration with public defaults and no API keys.
    pub fn with_defaults() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_max_tokens: 1500,
            pokemontcg_api_key: None,
            pokemontcg_base_url: DEFAULT_POKEMONTCG_BASE_URL.to_string(),
            tcgdex_base_url: DEFAULT_TCGDEX_BASE_URL.to_string(),
            tcgdex_language: "en".to_string(),
            set_cache_ttl_secs: DEFAULT_SET_CACHE_TTL_SECS,
            set_refresh_enabled: true,
            placeholder_image_url: DEFAULT_PLACEHOLDER_IMAGE_URL.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_cards: 30,
            request_timeout_secs: 30,
            vision_timeout_secs: 60,
        }
    }

    /// Rejects base URLs that would only fail later, on the first request.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        for (key, value) in [
            ("openai_base_url", &self.openai_base_url),
            ("pokemontcg_base_url", &self.pokemontcg_base_url),
            ("tcgdex_base_url", &self.tcgdex_base_url),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| config::ConfigError::Message(format!("{key}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(config::ConfigError::Message(format!(
                    "{key}: unsupported scheme {}",
                    parsed.scheme()
                )));
            }
        }

        if self.max_cards == 0 {
            return Err(config::ConfigError::Message(
                "max_cards must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn set_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.set_cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn vision_timeout(&self) -> Duration {
        Duration::from_secs(self.vision_timeout_secs)
    }
}
