//! The visible graph: nodes and edges keyed by id.
//!
//! Lookups and removals of unknown ids are no-ops; callers are expected to
//! race with the user (a node can vanish between a click and its results).

use crate::style::{local_name, NodeStyle};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionState {
    #[default]
    Collapsed,
    /// A neighbourhood query has been issued and its results are not in yet.
    Pending,
    Expanded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub title: String,
    pub clickable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub style: NodeStyle,
    #[serde(default)]
    pub state: ExpansionState,
    /// Satellite nodes currently folded into this node by a reduction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absorbed: Vec<AbsorbedChild>,
    /// The label as it was before any absorbed lines were appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_label: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, style: NodeStyle) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            title: id.clone(),
            id,
            clickable: true,
            type_name: None,
            style,
            state: ExpansionState::Collapsed,
            absorbed: Vec::new(),
            original_label: None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.state == ExpansionState::Expanded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub predicate: String,
    pub label: String,
    pub title: String,
}

impl Edge {
    /// Edges are keyed by their endpoints only, so a second predicate between
    /// the same ordered pair does not produce a second edge.
    pub fn key(from: &str, to: &str) -> String {
        format!("{from}_{to}")
    }

    pub fn new(from: &str, to: &str, predicate: &str) -> Self {
        let name = local_name(predicate);
        Self {
            id: Self::key(from, to),
            from: from.to_string(),
            to: to.to_string(),
            predicate: predicate.to_string(),
            label: name.clone(),
            title: name,
        }
    }

    /// The endpoint opposite `id`, if `id` is one of them.
    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.from == id {
            Some(&self.to)
        } else if self.to == id {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// A node removed from view by a reduction, together with the edges that
/// connected it, so it can be put back exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsorbedChild {
    /// Parent type key of the reduction that absorbed it.
    pub reduction: String,
    pub node: Node,
    pub edges: Vec<Edge>,
}

impl AbsorbedChild {
    /// One-line description shown in the parent label: `Type: values`.
    pub fn summary_line(&self) -> String {
        let node = &self.node;
        let heading = node
            .type_name
            .as_ref()
            .map(|_| node.title.clone())
            .unwrap_or_else(|| local_name(&node.id));
        let bold = format!("<b>{}</b>", node.title);
        let prefix = format!("{heading}: ");

        let values: Vec<&str> = node
            .label
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && *line != bold && *line != node.id)
            .map(|line| line.strip_prefix(prefix.as_str()).unwrap_or(line))
            .collect();

        if values.is_empty() {
            heading
        } else {
            format!("{heading}: {}", values.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualGraph {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
}

impl VisualGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Insert `node` unless a node with the same id exists. Returns whether it
    /// was inserted.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// The node for `id`, inserting the one built by `make` if absent.
    pub fn node_or_insert_with(&mut self, id: &str, make: impl FnOnce() -> Node) -> &mut Node {
        self.nodes.entry(id.to_string()).or_insert_with(make)
    }

    /// First edge for a key wins.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edges.contains_key(&edge.id) {
            return false;
        }
        self.edges.insert(edge.id.clone(), edge);
        true
    }

    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        self.nodes.remove(id)
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        self.edges.remove(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_ids(&self) -> BTreeSet<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn edge_ids(&self) -> BTreeSet<String> {
        self.edges.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Ids of edges touching `id`.
    pub fn connected_edges(&self, id: &str) -> Vec<String> {
        self.edges
            .values()
            .filter(|e| e.from == id || e.to == id)
            .map(|e| e.id.clone())
            .collect()
    }

    /// Neighbours of `id` through any edge, excluding `id` itself.
    pub fn connected_nodes(&self, id: &str) -> BTreeSet<String> {
        self.edges
            .values()
            .filter_map(|e| e.other_end(id))
            .filter(|other| *other != id)
            .map(str::to_string)
            .collect()
    }

    /// Ids of edges running between `a` and `b`, either direction.
    pub fn edges_between(&self, a: &str, b: &str) -> Vec<String> {
        self.edges
            .values()
            .filter(|e| (e.from == a && e.to == b) || (e.from == b && e.to == a))
            .map(|e| e.id.clone())
            .collect()
    }

    /// A leaf of `parent`: its only neighbour is `parent`.
    pub fn is_leaf_of(&self, id: &str, parent: &str) -> bool {
        let neighbours = self.connected_nodes(id);
        neighbours.len() == 1 && neighbours.contains(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleRule;
    use crate::style::ResolvedStyle;

    fn node(id: &str) -> Node {
        Node::new(
            id,
            ResolvedStyle::new(&StyleRule::builtin_default(), None).node_style(),
        )
    }

    #[test]
    fn first_edge_for_a_key_wins() {
        let mut g = VisualGraph::new();
        assert!(g.add_edge(Edge::new("a", "b", "http://example.org/p")));
        assert!(!g.add_edge(Edge::new("a", "b", "http://example.org/q")));
        assert_eq!(g.edge("a_b").map(|e| e.label.as_str()), Some("p"));
        assert!(g.add_edge(Edge::new("b", "a", "http://example.org/q")));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn leaf_detection_and_no_op_removals() {
        let mut g = VisualGraph::new();
        for id in ["a", "b", "c"] {
            g.add_node(node(id));
        }
        g.add_edge(Edge::new("a", "b", "http://example.org/p"));
        g.add_edge(Edge::new("b", "a", "http://example.org/p"));
        g.add_edge(Edge::new("c", "a", "http://example.org/p"));
        g.add_edge(Edge::new("c", "b", "http://example.org/p"));

        assert!(!g.is_leaf_of("b", "a"));
        assert!(!g.is_leaf_of("a", "b"));
        g.remove_edge("c_b");
        assert!(g.is_leaf_of("b", "a"));
        assert_eq!(g.edges_between("a", "b").len(), 2);

        assert!(g.remove_node("zzz").is_none());
        assert!(g.remove_edge("zzz").is_none());
        assert!(!g.add_node(node("a")));
    }

    #[test]
    fn summary_line_strips_heading_and_type_prefix() {
        let mut child = node("http://example.org/input1");
        child.type_name = Some("CommandInput".to_string());
        child.title = "CommandInput".to_string();
        child.label = "<b>CommandInput</b>\ndata.csv\nposition: 1".to_string();
        let absorbed = AbsorbedChild {
            reduction: "Action".to_string(),
            node: child,
            edges: Vec::new(),
        };
        assert_eq!(absorbed.summary_line(), "CommandInput: data.csv, position: 1");

        let bare = AbsorbedChild {
            reduction: "Action".to_string(),
            node: node("http://example.org/thing"),
            edges: Vec::new(),
        };
        assert_eq!(bare.summary_line(), "thing");
    }
}
