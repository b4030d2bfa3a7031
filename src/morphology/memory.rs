// In-memory annotation graph for fakes and tests; same query contract as a loaded dataset

use std::collections::{HashMap, HashSet};

use super::{AnnotationGraph, NodeId};
use crate::diagnostics::GraphError;

#[derive(Debug, Clone)]
struct Node {
    otype: String,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    // index is NodeId - 1
    nodes: Vec<Node>,
    features: HashMap<(NodeId, String), String>,
    failing: HashSet<(NodeId, String)>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent`; ids start at 1 and follow insertion (corpus) order
    pub fn add_node(&mut self, otype: &str, parent: Option<NodeId>) -> NodeId {
        self.nodes.push(Node {
            otype: otype.to_string(),
            children: Vec::new(),
        });
        let id = self.nodes.len() as NodeId;
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.push(id);
        }
        id
    }

    pub fn set_feature(&mut self, node: NodeId, name: &str, value: &str) {
        self.features.insert((node, name.to_string()), value.to_string());
    }

    /// Make every read of `name` on `node` fail
    pub fn fail_feature(&mut self, node: NodeId, name: &str) {
        self.failing.insert((node, name.to_string()));
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        id.checked_sub(1)
            .and_then(|i| self.nodes.get(i as usize))
            .ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        id.checked_sub(1).and_then(|i| self.nodes.get_mut(i as usize))
    }

    fn collect_descendants(&self, id: NodeId, otype: &str, out: &mut Vec<NodeId>) -> Result<(), GraphError> {
        for &child in &self.node(id)?.children {
            if self.node(child)?.otype == otype {
                out.push(child);
            }
            self.collect_descendants(child, otype, out)?;
        }
        Ok(())
    }
}

impl AnnotationGraph for MemoryGraph {
    fn nodes_of_type(&self, otype: &str) -> Result<Vec<NodeId>, GraphError> {
        Ok(self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.otype == otype)
            .map(|(i, _)| i as NodeId + 1)
            .collect())
    }

    fn children(&self, parent: NodeId, otype: &str) -> Result<Vec<NodeId>, GraphError> {
        let mut out = Vec::new();
        self.collect_descendants(parent, otype, &mut out)?;
        Ok(out)
    }

    fn feature(&self, node: NodeId, name: &str) -> Result<Option<String>, GraphError> {
        self.node(node)?;
        let key = (node, name.to_string());
        if self.failing.contains(&key) {
            return Err(GraphError::FeatureAccess {
                node,
                feature: name.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        Ok(self.features.get(&key).cloned())
    }
}
