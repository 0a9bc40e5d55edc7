//! Append-only accumulation of extracted graph structure.

use tracing::debug;

use crate::model::{Edge, GraphStructure, Node};

/// Owns the logical graph. Nodes insert idempotently by id; edges are an
/// append-only log whose order is append order.
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    /// Create a builder holding the application root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::app()],
            edges: Vec::new(),
        }
    }

    pub fn append_structure(&mut self, structure: GraphStructure) {
        let (nodes, edges) = structure;
        self.append_nodes(nodes);
        self.append_edges(edges);
    }

    /// Insert nodes, skipping any id already present. The first-inserted
    /// node's attributes win.
    pub fn append_nodes(&mut self, nodes: Vec<Node>) {
        for node in nodes {
            if self.nodes.iter().any(|n| n.node_id == node.node_id) {
                debug!("Node {} already present, skipping", node.node_id);
                continue;
            }
            self.nodes.push(node);
        }
    }

    pub fn append_edges(&mut self, edges: Vec<Edge>) {
        self.edges.extend(edges);
    }

    /// Snapshot of the current graph for notification sinks.
    pub fn snapshot(&self) -> GraphStructure {
        (self.nodes.clone(), self.edges.clone())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::model::{NodeType, APP_NODE_ID};
    use serde_json::json;

    #[test]
    fn test_builder_starts_with_app_root() {
        let builder = GraphBuilder::new();
        let (nodes, edges) = builder.snapshot();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_id, APP_NODE_ID);
        assert_eq!(nodes[0].node_type, NodeType::Application);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_node_insertion_is_idempotent() {
        let mut builder = GraphBuilder::new();
        builder.append_nodes(vec![Node::tool("search", "first description")]);
        builder.append_nodes(vec![Node::tool("search", "second description")]);

        assert_eq!(builder.node_count(), 2);
        let (nodes, _) = builder.snapshot();
        let tool = nodes.iter().find(|n| n.node_id == "search").unwrap();
        assert_eq!(tool.tool_description.as_deref(), Some("first description"));
    }

    #[test]
    fn test_app_node_is_never_duplicated() {
        let mut builder = GraphBuilder::new();
        builder.append_nodes(vec![Node::app()]);
        assert_eq!(builder.node_count(), 1);
    }

    #[test]
    fn test_edges_are_append_only() {
        let mut builder = GraphBuilder::new();
        builder.append_edges(vec![Edge::model_generate("app", "m", "hi")]);
        builder.append_edges(vec![
            Edge::model_generate("app", "m", "hi"),
            Edge::tool_call("app", "search", json!({}), None),
        ]);

        // Duplicates are tolerated; length is the sum of appended batches.
        assert_eq!(builder.edge_count(), 3);
    }

    #[test]
    fn test_append_structure_applies_both_sides() {
        let mut builder = GraphBuilder::new();
        builder.append_structure((
            vec![Node::llm("claude-x")],
            vec![Edge::model_generate("app", "claude-x", "hello")],
        ));
        assert_eq!(builder.node_count(), 2);
        assert_eq!(builder.edge_count(), 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut builder = GraphBuilder::new();
        let (mut nodes, _) = builder.snapshot();
        nodes.push(Node::llm("claude-x"));
        assert_eq!(builder.node_count(), 1);
        builder.append_nodes(vec![Node::llm("claude-x")]);
        assert_eq!(builder.node_count(), 2);
    }
}
