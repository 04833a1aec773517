use serde::{Deserialize, Serialize};

/// One entry of the Pokemon TCG set list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub printed_total: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub ptcgo_code: Option<String>,
    /// "YYYY/MM/DD" as published by the API
    #[serde(default)]
    pub release_date: Option<String>,
}
