use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    card_resolver::CardResolver, pokemon_tcg::PokemonTcgClient, set_cache::SetCache,
    tcgdex::TcgdexClient, vision::VisionClient,
};

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub vision: VisionClient,
    pub resolver: CardResolver,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let vision = VisionClient::from_config(&config)?;
        let pokemon_tcg = PokemonTcgClient::from_config(&config)?;
        let tcgdex = TcgdexClient::from_config(&config)?;
        let set_cache = Arc::new(SetCache::new(config.set_cache_ttl()));

        let resolver = CardResolver::new(
            pokemon_tcg,
            tcgdex,
            set_cache,
            config.placeholder_image_url.clone(),
        );

        Ok(Self {
            config,
            vision,
            resolver,
        })
    }
}
