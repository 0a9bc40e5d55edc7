//! Audient call graph
//!
//! Nodes and edges discovered from intercepted agent traffic, accumulated
//! into one logical append-only graph.

pub mod builder;
pub mod model;

pub use builder::GraphBuilder;
pub use model::{Edge, EdgeDetail, EdgeType, GraphStructure, McpMethod, Node, NodeType, APP_NODE_ID};
