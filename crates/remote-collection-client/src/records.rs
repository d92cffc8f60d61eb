//! Wire records shared by the collection endpoints and the local list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Analyzing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeAlternativeReport {
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub scientific_name: String,
    #[serde(default)]
    pub characteristics: String,
}

/// Analysis service response, also embedded in saved records as
/// `plant_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specie_identified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_region: Option<String>,
    #[serde(default)]
    pub invasive_or_not: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_reasoning: Option<String>,
    #[serde(default)]
    pub invasive_effects: String,
    #[serde(default)]
    pub native_alternatives: Vec<NativeAlternativeReport>,
    #[serde(default)]
    pub remove_instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_awarded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// One collection item as stored remotely or in the local list.
///
/// `preview` and `filename` are only written locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItemRecord {
    pub id: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub region: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_data: Option<PlantReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl CollectionItemRecord {
    /// Copy suitable for the remote store.
    pub fn for_remote(&self) -> Self {
        Self {
            preview: None,
            filename: None,
            ..self.clone()
        }
    }
}

/// RFC 3339, or a naive ISO timestamp read as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveCollectionRequest<'a> {
    pub collection_item: &'a CollectionItemRecord,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteItemRequest<'a> {
    pub item_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AckResponse {
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionListResponse {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub collection: Vec<Value>,
    #[serde(default)]
    pub total_items: usize,
}

impl CollectionListResponse {
    pub fn into_records(self) -> Vec<CollectionItemRecord> {
        decode_records(self.collection)
    }
}

/// Decode each value on its own, skipping the ones that are not records.
pub fn decode_records(values: Vec<Value>) -> Vec<CollectionItemRecord> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let id = value.get("id").and_then(Value::as_str).map(str::to_string);
            match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, id = ?id, error = %e, "Skipping unreadable collection record");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RewardsSummary {
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub awarded_species: Vec<String>,
}
