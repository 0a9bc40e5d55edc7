//! Shared state handed to extractors.

use std::collections::HashMap;

use audient_policy::RuntimeChecker;

use crate::detector::PiiDetector;

/// Everything an extractor needs besides the payload itself: the PII
/// detector, the (optional) runtime policy checker, and the HTTP headers of
/// the triggering leg.
///
/// Without a checker every compliance transition is a no-op; extraction and
/// graph building still run.
pub struct ExtractContext<'a> {
    pub detector: &'a dyn PiiDetector,
    pub checker: Option<&'a mut RuntimeChecker>,
    pub headers: &'a HashMap<String, String>,
}

impl<'a> ExtractContext<'a> {
    pub fn new(
        detector: &'a dyn PiiDetector,
        checker: Option<&'a mut RuntimeChecker>,
        headers: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            detector,
            checker,
            headers,
        }
    }

    /// Host of the triggering request, used to key MCP server nodes.
    pub fn host(&self) -> String {
        self.headers
            .get("host")
            .or_else(|| self.headers.get("Host"))
            .cloned()
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// Collection stage: register every detected entity as a data item.
    pub fn collect_pii(&mut self, text: &str) {
        let annotations = self.detector.analyze(text);
        if let Some(checker) = self.checker.as_deref_mut() {
            for annotation in &annotations {
                let data_name = &text[annotation.start..annotation.end];
                let data_type = normalize_entity_type(&annotation.entity_type);
                checker.add_data_name(data_name, &data_type);
            }
        }
    }

    /// Processing stage: verify collection is permitted for each entity's
    /// type, then mark the item processed.
    pub fn process_pii(&mut self, text: &str) {
        let annotations = self.detector.analyze(text);
        if let Some(checker) = self.checker.as_deref_mut() {
            for annotation in &annotations {
                let data_name = &text[annotation.start..annotation.end];
                let data_type = normalize_entity_type(&annotation.entity_type);
                checker.check_collection_allowed(&data_type);
                checker.update_processing_con(data_name);
            }
        }
    }

    /// Disclosure stage: processing plus a disclosure record to `target`.
    pub fn disclose_pii(&mut self, text: &str, target: &str) {
        let annotations = self.detector.analyze(text);
        if let Some(checker) = self.checker.as_deref_mut() {
            for annotation in &annotations {
                let data_name = &text[annotation.start..annotation.end];
                let data_type = normalize_entity_type(&annotation.entity_type);
                checker.check_collection_allowed(&data_type);
                checker.update_processing_con(data_name);
                checker.update_disclosure_con(data_name, target);
            }
        }
    }

    /// Accumulated issues for the edge being built; clears the checker's list.
    pub fn drain_violations(&mut self) -> Option<String> {
        self.checker.as_deref_mut().and_then(|c| c.drain_issues())
    }
}

/// Detector entity types are free-form; fold them onto ontology naming.
fn normalize_entity_type(entity_type: &str) -> String {
    entity_type.to_lowercase().replace('_', " ")
}
