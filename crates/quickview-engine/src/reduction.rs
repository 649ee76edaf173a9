//! Reductions: folding leaf satellites of a node into its label.
//!
//! Enabling a reduction for a parent type removes matching leaf neighbours of
//! every visible node of that type and keeps them, with their edges, in the
//! parent's payload. Disabling puts them back exactly as they were.

use crate::error::ExploreError;
use crate::explorer::GraphExplorer;
use crate::graph::{AbsorbedChild, Node};
use crate::layout::Network;
use crate::style::local_name;
use std::collections::BTreeSet;

/// Rebuild a parent's label from its original label and its payload.
pub(crate) fn refresh_absorbed_label(node: &mut Node) {
    if node.absorbed.is_empty() {
        if let Some(original) = node.original_label.take() {
            node.label = original;
        }
        return;
    }
    let original = node
        .original_label
        .get_or_insert_with(|| node.label.clone())
        .clone();
    let mut label = original;
    for child in &node.absorbed {
        let line = child.summary_line();
        if !label.contains(&line) {
            if !label.is_empty() {
                label.push('\n');
            }
            label.push_str(&line);
        }
    }
    node.label = label;
}

impl<N: Network> GraphExplorer<N> {
    /// Turn on the reduction keyed by `parent_type` and apply it to what is on
    /// screen. Returns the number of nodes absorbed.
    pub fn enable_reduction(&mut self, parent_type: &str) -> Result<usize, ExploreError> {
        self.context.set_reduction_enabled(parent_type, true)?;
        let rule = self
            .context
            .reduction_rule(parent_type)
            .cloned()
            .ok_or_else(|| ExploreError::UnknownReduction(parent_type.to_string()))?;

        let parents: Vec<String> = self
            .graph
            .nodes()
            .filter(|n| n.type_name.as_deref() == Some(parent_type))
            .map(|n| n.id.clone())
            .collect();

        let mut absorbed = 0;
        for parent_id in parents {
            if !self.graph.contains_node(&parent_id) {
                continue;
            }
            let candidates: BTreeSet<String> = self
                .graph
                .connected_edges(&parent_id)
                .iter()
                .filter_map(|edge_id| {
                    let edge = self.graph.edge(edge_id)?;
                    let far = edge.other_end(&parent_id)?;
                    let far_node = self.graph.node(far)?;
                    let eligible = far != parent_id
                        && rule.absorbs_predicate(&local_name(&edge.predicate))
                        && far_node.type_name.as_deref() != Some(parent_type)
                        && rule.absorbs_type(far_node.type_name.as_deref())
                        && self.graph.is_leaf_of(far, &parent_id);
                    eligible.then(|| far.to_string())
                })
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let mut children = Vec::with_capacity(candidates.len());
            for far in candidates {
                let edges = self
                    .graph
                    .connected_edges(&far)
                    .iter()
                    .filter_map(|edge_id| self.graph.remove_edge(edge_id))
                    .collect();
                if let Some(node) = self.graph.remove_node(&far) {
                    children.push(AbsorbedChild {
                        reduction: parent_type.to_string(),
                        node,
                        edges,
                    });
                }
            }
            absorbed += children.len();
            if let Some(parent) = self.graph.node_mut(&parent_id) {
                parent.absorbed.extend(children);
                refresh_absorbed_label(parent);
            }
        }
        tracing::info!(reduction = %rule.name, parent_type, absorbed, "enabled reduction");
        Ok(absorbed)
    }

    /// Turn off the reduction keyed by `parent_type` and restore everything it
    /// absorbed next to its parent. Returns the number of nodes restored.
    pub fn disable_reduction(&mut self, parent_type: &str) -> Result<usize, ExploreError> {
        self.context.set_reduction_enabled(parent_type, false)?;
        let pinned: Vec<String> = self.graph.node_ids().into_iter().collect();
        self.network.set_fixed(&pinned, true);

        let parents: Vec<String> = self
            .graph
            .nodes()
            .filter(|n| n.absorbed.iter().any(|c| c.reduction == parent_type))
            .map(|n| n.id.clone())
            .collect();

        let mut restored = 0;
        for parent_id in parents {
            let Some(parent) = self.graph.node_mut(&parent_id) else {
                continue;
            };
            let (released, kept): (Vec<AbsorbedChild>, Vec<AbsorbedChild>) =
                std::mem::take(&mut parent.absorbed)
                    .into_iter()
                    .partition(|c| c.reduction == parent_type);
            parent.absorbed = kept;
            refresh_absorbed_label(parent);

            for child in released {
                let child_id = child.node.id.clone();
                if self.graph.add_node(child.node) {
                    restored += 1;
                }
                for edge in child.edges {
                    if self.graph.contains_node(&edge.from) && self.graph.contains_node(&edge.to) {
                        self.graph.add_edge(edge);
                    }
                }
                self.network.place_near(&child_id, &parent_id);
            }
        }
        tracing::info!(parent_type, restored, "disabled reduction");
        self.apply_layout();
        Ok(restored)
    }
}
