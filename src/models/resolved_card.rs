use serde::{Deserialize, Serialize};

use super::detected_card::DetectedCard;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// Which lookup produced the match, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    SetAndNumber,
    NameAndNumber,
    NameAndSet,
    ExactName,
    PartialName,
    Tcgdex,
    WeakSetAndNumber,
    Unresolved,
}

/// A detected card enriched with catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCard {
    #[serde(flatten)]
    pub detected: DetectedCard,
    pub image_url: String,
    pub price: Option<Price>,
    pub match_id: Option<String>,
    pub matched_name: Option<String>,
    pub matched_set: Option<String>,
    pub stage: MatchStage,
}

impl ResolvedCard {
    pub fn unresolved(detected: DetectedCard, placeholder_image_url: &str) -> Self {
        Self {
            detected,
            image_url: placeholder_image_url.to_string(),
            price: None,
            match_id: None,
            matched_name: None,
            matched_set: None,
            stage: MatchStage::Unresolved,
        }
    }
}
