//! Runtime policy checker.
//!
//! Tracks each observed data item through collection, processing and
//! disclosure; violations accumulate as human-readable issue strings that
//! callers drain and attach to the triggering graph edge.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{
    unix_now, CollectionMethod, PolicyChecking, PolicyTarget, ProcessingUse, SERVICE_PROVIDERS,
};

pub struct RuntimeChecker {
    data_names: HashMap<String, PolicyChecking>,
    target_policies: HashMap<String, PolicyTarget>,
    issues: Vec<String>,
}

impl RuntimeChecker {
    pub fn new(policies: Vec<PolicyTarget>) -> Self {
        if policies.is_empty() {
            debug!("No target policies provided to runtime checker yet");
        }
        let target_policies = policies
            .into_iter()
            .map(|p| (p.data_type.clone(), p))
            .collect();
        Self {
            data_names: HashMap::new(),
            target_policies,
            issues: Vec::new(),
        }
    }

    /// Record a data item at the collection stage.
    ///
    /// A previously seen `data_name` only refreshes its retention reference
    /// (re-collection). A new name is gated on the target policy for its
    /// type: missing or collection-prohibited types are rejected with an
    /// issue and left untracked.
    pub fn add_data_name(&mut self, data_name: &str, data_type: &str) {
        if let Some(entry) = self.data_names.get_mut(data_name) {
            debug!("Data name {} already tracked, refreshing retention", data_name);
            entry.retention = unix_now();
            return;
        }
        if !self.check_collection_allowed(data_type) {
            return;
        }
        // A fine-grained target for the exact name overrides the coarse type.
        let data_type = if self.target_policies.contains_key(data_name) {
            data_name
        } else {
            data_type
        };
        self.data_names.insert(
            data_name.to_string(),
            PolicyChecking {
                data_name: data_name.to_string(),
                data_type: data_type.to_string(),
                collection: Some(CollectionMethod::Direct),
                processing: Some(ProcessingUse::Irrelevant),
                disclosure: None,
                retention: unix_now(),
            },
        );
        debug!("Added data name {} to runtime checker", data_name);
    }

    /// Whether collection of `data_type` is permitted by the target table.
    pub fn check_collection_allowed(&mut self, data_type: &str) -> bool {
        match self.target_policies.get(data_type) {
            None => {
                self.issues
                    .push(format!("Data type {} not found in target policies.", data_type));
                false
            }
            Some(target) if target.prohibited_col => {
                self.issues.push(format!(
                    "Data type {} collection is prohibited in the target policy.",
                    data_type
                ));
                false
            }
            Some(_) => {
                debug!("Data type {} collection is allowed", data_type);
                true
            }
        }
    }

    /// Mark `data_name` as processed (processing = relevant).
    pub fn update_processing_con(&mut self, data_name: &str) {
        let data_type = match self.data_names.get_mut(data_name) {
            Some(entry) => {
                entry.processing = Some(ProcessingUse::Relevant);
                entry.data_type.clone()
            }
            None => {
                self.issues.push(format!(
                    "Data name {} not found in runtime checker for processing update.",
                    data_name
                ));
                return;
            }
        };
        self.check_retention(data_name, &data_type);
    }

    /// Record a disclosure of `data_name` to `disclosure_name`.
    ///
    /// Prohibited disclosure stops before the target is recorded. A recorded
    /// target that differs from the declared one raises a mismatch unless the
    /// declared value is the "service providers" sentinel.
    pub fn update_disclosure_con(&mut self, data_name: &str, disclosure_name: &str) {
        let data_type = match self.data_names.get(data_name) {
            Some(entry) => entry.data_type.clone(),
            None => {
                self.issues.push(format!(
                    "Data name {} not found in runtime checker for disclosure update.",
                    data_name
                ));
                return;
            }
        };

        if let Some(target) = self.target_policies.get(&data_type) {
            if target.prohibited_dis {
                self.issues.push(format!(
                    "Data name {} disclosure is prohibited in the target policy.",
                    data_name
                ));
                return;
            }
        }

        if let Some(entry) = self.data_names.get_mut(data_name) {
            entry.disclosure = Some(disclosure_name.to_string());
        }

        if let Some(target) = self.target_policies.get(&data_type) {
            let declared = target.disclosure.as_deref();
            if declared != Some(disclosure_name) && declared != Some(SERVICE_PROVIDERS) {
                self.issues.push(format!(
                    "Data name {} disclosure {} is not allowed in the target policy.",
                    data_name, disclosure_name
                ));
            }
        }

        self.check_retention(data_name, &data_type);
    }

    fn check_retention(&mut self, data_name: &str, data_type: &str) {
        let ceiling = self
            .target_policies
            .get(data_type)
            .and_then(|t| t.retention);
        let collected_at = self.data_names.get(data_name).map(|e| e.retention);
        if let (Some(ceiling), Some(collected_at)) = (ceiling, collected_at) {
            if unix_now() - collected_at > ceiling {
                self.issues.push(format!(
                    "Data name {} retention time exceeded target policy limit.",
                    data_name
                ));
            }
        }
    }

    /// Join and clear accumulated issues for attachment to one edge.
    ///
    /// Clearing here keeps issues from being double-reported across edges.
    pub fn drain_issues(&mut self) -> Option<String> {
        if self.issues.is_empty() {
            return None;
        }
        let joined = self.issues.join("; ");
        self.issues.clear();
        Some(joined)
    }

    pub fn tracked(&self, data_name: &str) -> Option<&PolicyChecking> {
        self.data_names.get(data_name)
    }

    pub fn has_targets(&self) -> bool {
        !self.target_policies.is_empty()
    }
}
