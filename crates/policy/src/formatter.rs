//! Policy target formatter.
//!
//! Expands coarse natural-language policy entries into fine-grained
//! [`PolicyTarget`]s by matching their data-type descriptions against an
//! ontology tree of data-type names.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::model::{
    CollectionMethod, OntologyNode, PolicyEntry, PolicyTarget, ProcessingUse, SERVICE_PROVIDERS,
    UNBOUNDED_RETENTION,
};

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Policy file error: {0}")]
    File(#[from] std::io::Error),

    #[error("Policy parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tokens ignored when matching entry descriptions against ontology names.
const STOPWORDS: &[&str] = &[
    "and",
    "or",
    "the",
    "of",
    "a",
    "an",
    "to",
    "for",
    "data",
    "information",
    "personal",
    "similar",
    "technologies",
];

/// Synonyms commonly appearing in policy text, keyed by normalized token.
const SYNONYM_REDIRECTS: &[(&str, &str)] = &[
    ("identity", "identifiers"),
    ("payment", "financial information"),
    ("cookie", "cookie identifier"),
    ("connection", "device information"),
    ("device", "device information"),
    ("contact", "contact information"),
    ("usage", "behavioral and usage data"),
];

/// Map each ontology node name (lowercased) to its set of leaf data-type
/// names. A childless node is its own leaf; every leaf also self-maps. The
/// implicit root itself is excluded.
pub fn build_ontology_map(root: &OntologyNode) -> HashMap<String, BTreeSet<String>> {
    let mut mapping: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut stack: Vec<&OntologyNode> = root.children.iter().collect();
    while let Some(node) = stack.pop() {
        let leaves = collect_leaves(node);
        mapping.insert(node.name.to_lowercase(), leaves);
        stack.extend(node.children.iter());
    }
    let all_leaves: Vec<String> = mapping.values().flatten().cloned().collect();
    for leaf in all_leaves {
        mapping
            .entry(leaf.to_lowercase())
            .or_insert_with(|| BTreeSet::from([leaf]));
    }
    mapping
}

fn collect_leaves(node: &OntologyNode) -> BTreeSet<String> {
    if node.children.is_empty() {
        return BTreeSet::from([node.name.clone()]);
    }
    node.children.iter().flat_map(collect_leaves).collect()
}

/// Light stemming for plural/inflection normalization.
fn stem(token: &str) -> String {
    if token.len() > 3 {
        if let Some(base) = token.strip_suffix("ies") {
            return format!("{}y", base);
        }
        if let Some(base) = token.strip_suffix("es") {
            return base.to_string();
        }
        if let Some(base) = token.strip_suffix('s') {
            return base.to_string();
        }
    }
    token.to_string()
}

fn tokens(text: &str, drop_stop: bool) -> Vec<String> {
    let lowered = text.to_lowercase().replace('_', " ");
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .map(stem)
        .filter(|t| !drop_stop || !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Token-overlap match: at least half of the phrase's content tokens must
/// appear in the text.
fn token_overlap_match(phrase: &str, text: &str) -> bool {
    let phrase_tokens: BTreeSet<String> = tokens(phrase, true).into_iter().collect();
    if phrase_tokens.is_empty() {
        return false;
    }
    let text_tokens: BTreeSet<String> = tokens(text, true).into_iter().collect();
    let overlap = phrase_tokens.intersection(&text_tokens).count();
    (overlap as f64 / phrase_tokens.len() as f64) >= 0.5
}

fn normalize_collection(raw: Option<&str>) -> Option<CollectionMethod> {
    let lowered = raw?.to_lowercase();
    if lowered.contains("indirect") {
        Some(CollectionMethod::Indirect)
    } else if lowered.contains("direct") {
        Some(CollectionMethod::Direct)
    } else {
        None
    }
}

fn normalize_processing(raw: Option<&str>) -> Option<ProcessingUse> {
    let lowered = raw?.to_lowercase();
    if lowered.contains("irrelevant") {
        Some(ProcessingUse::Irrelevant)
    } else if lowered.contains("relevant") {
        Some(ProcessingUse::Relevant)
    } else {
        None
    }
}

fn normalize_disclosure(raw: Option<&serde_json::Value>) -> Option<String> {
    match raw? {
        serde_json::Value::Array(items) => {
            let mentions_providers = items
                .iter()
                .any(|v| value_text(v).to_lowercase().contains(SERVICE_PROVIDERS));
            if mentions_providers {
                Some(SERVICE_PROVIDERS.to_string())
            } else {
                Some(
                    items
                        .iter()
                        .map(value_text)
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            }
        }
        other => Some(value_text(other)),
    }
}

fn normalize_retention(raw: Option<&serde_json::Value>) -> f64 {
    match raw {
        Some(value) if value.is_number() => value.as_f64().unwrap_or(UNBOUNDED_RETENTION),
        // "as long as ..." phrasing and anything unparseable mean unbounded.
        _ => UNBOUNDED_RETENTION,
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Offline/startup expansion of coarse policy entries into fine-grained
/// per-data-type targets.
pub struct PolicyTargetFormatter {
    entries: Vec<PolicyEntry>,
    ontology_map: HashMap<String, BTreeSet<String>>,
}

impl PolicyTargetFormatter {
    pub fn new(entries: Vec<PolicyEntry>, ontology_root: &OntologyNode) -> Self {
        Self {
            entries,
            ontology_map: build_ontology_map(ontology_root),
        }
    }

    /// Load the simplified policy JSON and ontology JSON from disk.
    ///
    /// # Errors
    /// Returns an error if either file is missing or does not parse.
    pub fn from_files(
        policy_path: impl AsRef<Path>,
        ontology_path: impl AsRef<Path>,
    ) -> Result<Self, PolicyError> {
        let entries: Vec<PolicyEntry> =
            serde_json::from_str(&std::fs::read_to_string(policy_path)?)?;
        let ontology: OntologyNode =
            serde_json::from_str(&std::fs::read_to_string(ontology_path)?)?;
        Ok(Self::new(entries, &ontology))
    }

    /// Expand every entry into one [`PolicyTarget`] per matched ontology leaf.
    pub fn format_target_policy(&self) -> Vec<PolicyTarget> {
        let mut results = Vec::new();

        for entry in &self.entries {
            let description = entry.types_of_data_collected.to_lowercase();
            let mut matched: BTreeSet<String> = BTreeSet::new();

            // Substring containment or token-overlap against every node name.
            for (node_name, leaves) in &self.ontology_map {
                if description.contains(node_name.as_str())
                    || description.contains(&node_name.replace('_', " "))
                    || token_overlap_match(node_name, &description)
                {
                    matched.extend(leaves.iter().cloned());
                }
            }

            // Synonym redirects keyed by tokens present in the entry.
            let entry_tokens: BTreeSet<String> = tokens(&description, true).into_iter().collect();
            for (token, redirect) in SYNONYM_REDIRECTS {
                if entry_tokens.contains(*token) {
                    if let Some(leaves) = self.ontology_map.get(*redirect) {
                        matched.extend(leaves.iter().cloned());
                    }
                }
            }

            if matched.is_empty() {
                warn!(
                    "Policy entry '{}' matched no ontology node; dropping it",
                    entry.types_of_data_collected
                );
                continue;
            }

            let collection = normalize_collection(entry.methods_of_collection.as_deref());
            let processing = normalize_processing(entry.data_usage.as_deref());
            let disclosure = normalize_disclosure(entry.data_disclosure.as_ref());
            let retention = normalize_retention(entry.retention_period.as_ref());

            for data_type in matched {
                results.push(PolicyTarget {
                    data_type,
                    prohibited_col: entry.prohibited_col,
                    collection,
                    processing,
                    disclosure: disclosure.clone(),
                    prohibited_dis: entry.prohibited_dis,
                    retention: Some(retention),
                });
            }
        }
        results
    }
}
