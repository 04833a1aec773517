// Services module - upstream clients and matching logic

pub mod card_resolver;
pub mod image_payload;
pub mod normalize;
pub mod pokemon_tcg;
pub mod pricing;
pub mod set_cache;
pub mod tcgdex;
pub mod vision;
