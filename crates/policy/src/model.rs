//! Policy data models.

use serde::{Deserialize, Serialize};

/// Disclosure sentinel meaning "any service provider"; it matches every
/// disclosure target.
pub const SERVICE_PROVIDERS: &str = "service providers";

/// Stand-in ceiling for "as long as retained" / unspecified retention.
pub const UNBOUNDED_RETENTION: f64 = 1e5;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMethod {
    Direct,
    Indirect,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingUse {
    Relevant,
    Irrelevant,
}

/// The compliance rule for one fine-grained data type. Produced once at
/// startup by the formatter and read-only thereafter.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PolicyTarget {
    pub data_type: String,
    #[serde(default)]
    pub prohibited_col: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<ProcessingUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosure: Option<String>,
    #[serde(default)]
    pub prohibited_dis: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<f64>,
}

/// Live compliance ledger entry for one observed data instance.
///
/// Keyed by `data_name`; `retention` holds the collection timestamp in unix
/// seconds. Entries are mutated in place and never deleted during a session.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PolicyChecking {
    pub data_name: String,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<ProcessingUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosure: Option<String>,
    pub retention: f64,
}

/// One coarse entry from the simplified policy file.
#[derive(Debug, Deserialize, Clone)]
pub struct PolicyEntry {
    #[serde(default)]
    pub types_of_data_collected: String,
    #[serde(default)]
    pub methods_of_collection: Option<String>,
    #[serde(default)]
    pub data_usage: Option<String>,
    /// A single destination string or a list of destinations.
    #[serde(default)]
    pub data_disclosure: Option<serde_json::Value>,
    /// A numeric ceiling in seconds or a free-text phrase.
    #[serde(default)]
    pub retention_period: Option<serde_json::Value>,
    #[serde(default)]
    pub prohibited_col: bool,
    #[serde(default)]
    pub prohibited_dis: bool,
}

/// One node of the data-type ontology tree.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OntologyNode {
    pub name: String,
    #[serde(default)]
    pub children: Vec<OntologyNode>,
}

pub(crate) fn unix_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
