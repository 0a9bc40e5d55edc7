//! Audient policy compliance
//!
//! Target policy expansion from coarse natural-language entries and the
//! runtime state machine tracking each observed data item through
//! collection, processing, disclosure and retention.

pub mod checker;
pub mod formatter;
pub mod model;

pub use checker::RuntimeChecker;
pub use formatter::{build_ontology_map, PolicyError, PolicyTargetFormatter};
pub use model::{
    CollectionMethod, OntologyNode, PolicyChecking, PolicyEntry, PolicyTarget, ProcessingUse,
    SERVICE_PROVIDERS, UNBOUNDED_RETENTION,
};
