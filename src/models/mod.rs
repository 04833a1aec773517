// Models module - transient request/response records

pub mod card_set;
pub mod detected_card;
pub mod resolved_card;

pub use card_set::CardSet;
pub use detected_card::DetectedCard;
pub use resolved_card::{MatchStage, Price, ResolvedCard};
