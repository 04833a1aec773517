use serde::{Deserialize, Serialize};

/// A card as reported by the vision model, before catalog lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedCard {
    pub name: String,
    pub set: Option<String>,
    pub number: Option<String>,
    pub confidence: f32,
}

impl DetectedCard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            set: None,
            number: None,
            confidence: 1.0,
        }
    }

    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = Some(set.into());
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }
}
