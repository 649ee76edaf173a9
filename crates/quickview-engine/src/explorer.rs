//! Session controller: owns the store, the context, the visible graph and the
//! rendering surface, and turns user actions into graph changes.
//!
//! Expansion is split into explicit steps so a host can run the neighbourhood
//! query wherever it likes:
//!
//! 1. [`GraphExplorer::begin_expansion`] marks the node pending and hands back
//!    the query to run.
//! 2. [`GraphExplorer::apply_results`] feeds result triples in.
//! 3. [`GraphExplorer::finish_expansion`] (or [`GraphExplorer::abandon_expansion`]
//!    on failure) settles the node.
//!
//! [`GraphExplorer::expand`] runs all three against the local store.

use crate::binding::{ActiveReduction, BindingProcessor};
use crate::context::{LegendEntry, NamespaceFilter, StyleGroupState, VisualizationContext};
use crate::error::ExploreError;
use crate::graph::{AbsorbedChild, Edge, ExpansionState, Node, VisualGraph};
use crate::layout::{LayoutMode, LayoutPreset, Network};
use crate::reduction::refresh_absorbed_label;
use quickview_store::queries::{initial_graph_query, neighborhood_query};
use quickview_store::{ConstructQuery, Term, Triple, TripleStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// What one expansion added, so collapsing can take it back out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ExpansionRecord {
    pub(crate) nodes: BTreeSet<String>,
    pub(crate) edges: BTreeSet<String>,
}

/// Ticket for an in-flight expansion.
#[derive(Debug)]
pub struct PendingExpansion {
    node_id: String,
    query: ConstructQuery,
    suppressed_nodes: BTreeSet<String>,
    suppressed_edges: BTreeSet<String>,
    nodes_before: BTreeSet<String>,
    edges_before: BTreeSet<String>,
}

impl PendingExpansion {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn query(&self) -> &ConstructQuery {
        &self.query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Expanded {
        added_nodes: usize,
        added_edges: usize,
    },
    Collapsed {
        removed_nodes: usize,
        removed_edges: usize,
    },
    /// The node is not clickable.
    Ignored,
}

/// Everything a renderer needs to draw the current view.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorerSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub legend: Vec<LegendEntry>,
    pub layout: LayoutMode,
    pub layout_options: LayoutPreset,
    pub style_groups: Vec<StyleGroupState>,
    pub namespace_filters: Vec<NamespaceFilter>,
}

pub struct GraphExplorer<N: Network> {
    pub(crate) store: TripleStore,
    pub(crate) context: VisualizationContext,
    pub(crate) graph: VisualGraph,
    pub(crate) network: N,
    pub(crate) expansions: BTreeMap<String, ExpansionRecord>,
}

impl<N: Network> GraphExplorer<N> {
    pub fn new(store: TripleStore, context: VisualizationContext, network: N) -> Self {
        Self {
            store,
            context,
            graph: VisualGraph::new(),
            network,
            expansions: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &TripleStore {
        &self.store
    }

    pub fn context(&self) -> &VisualizationContext {
        &self.context
    }

    pub fn graph(&self) -> &VisualGraph {
        &self.graph
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// Populate the view with the activity/action backbone. Returns the number
    /// of result triples processed.
    pub fn load_initial_graph(&mut self) -> Result<usize, ExploreError> {
        let results = initial_graph_query().evaluate(&self.store).map_err(|err| {
            tracing::error!(error = %err, "initial graph query failed");
            err
        })?;
        let processor = BindingProcessor::new(&self.context, &self.store);
        for triple in &results {
            processor.process(&mut self.graph, triple);
        }
        tracing::info!(
            triples = results.len(),
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "loaded initial graph"
        );
        self.apply_layout();
        Ok(results.len())
    }

    /// Drop everything on screen (including reduction payloads) and reload
    /// the backbone.
    pub fn reset_graph(&mut self) -> Result<usize, ExploreError> {
        self.graph.clear();
        self.expansions.clear();
        self.load_initial_graph()
    }

    /// Toggle a node: expand when collapsed, collapse when expanded.
    pub fn click(&mut self, node_id: &str) -> Result<ClickOutcome, ExploreError> {
        let node = self
            .graph
            .node(node_id)
            .ok_or_else(|| ExploreError::UnknownNode(node_id.to_string()))?;
        if !node.clickable {
            return Ok(ClickOutcome::Ignored);
        }
        match node.state {
            ExpansionState::Collapsed => self.expand(node_id),
            ExpansionState::Pending => Err(ExploreError::ExpansionPending(node_id.to_string())),
            ExpansionState::Expanded => self.collapse(node_id),
        }
    }

    /// Expand `node_id` against the local store.
    pub fn expand(&mut self, node_id: &str) -> Result<ClickOutcome, ExploreError> {
        let pending = self.begin_expansion(node_id)?;
        let results = match pending.query.evaluate(&self.store) {
            Ok(results) => results,
            Err(err) => {
                self.abandon_expansion(pending, &err);
                return Err(err.into());
            }
        };
        self.apply_results(&pending, &results);
        Ok(self.finish_expansion(pending))
    }

    pub fn begin_expansion(&mut self, node_id: &str) -> Result<PendingExpansion, ExploreError> {
        let node = self
            .graph
            .node_mut(node_id)
            .ok_or_else(|| ExploreError::UnknownNode(node_id.to_string()))?;
        if node.state == ExpansionState::Pending {
            return Err(ExploreError::ExpansionPending(node_id.to_string()));
        }
        node.state = ExpansionState::Pending;

        // Anything already folded into a payload, here or elsewhere, stays there.
        let absorbed: Vec<&AbsorbedChild> =
            self.graph.nodes().flat_map(|n| n.absorbed.iter()).collect();
        let suppressed_nodes = absorbed.iter().map(|c| c.node.id.clone()).collect();
        let suppressed_edges = absorbed
            .iter()
            .flat_map(|c| c.edges.iter().map(|e| e.id.clone()))
            .collect();

        let nodes_before = self.graph.node_ids();
        let edges_before = self.graph.edge_ids();
        let pinned: Vec<String> = nodes_before.iter().cloned().collect();
        self.network.set_fixed(&pinned, true);

        let blocked = self.context.blocked_namespaces(&self.store);
        let query = neighborhood_query(&self.term_for(node_id), &blocked);
        tracing::debug!(node = %node_id, blocked = blocked.len(), "expanding node");

        Ok(PendingExpansion {
            node_id: node_id.to_string(),
            query,
            suppressed_nodes,
            suppressed_edges,
            nodes_before,
            edges_before,
        })
    }

    /// Feed neighbourhood results for `pending` into the graph. Returns how
    /// many triples were processed.
    pub fn apply_results<'t>(
        &mut self,
        pending: &PendingExpansion,
        results: impl IntoIterator<Item = &'t Triple>,
    ) -> usize {
        let reduction = self
            .graph
            .node(&pending.node_id)
            .and_then(|n| n.type_name.clone())
            .and_then(|parent_type| {
                let rule = self.context.active_reduction(&parent_type)?.clone();
                Some(ActiveReduction { parent_type, rule })
            });
        let processor = BindingProcessor::for_expansion(
            &self.context,
            &self.store,
            &pending.node_id,
            reduction,
            pending.suppressed_nodes.clone(),
            pending.suppressed_edges.clone(),
        );
        let mut processed = 0;
        for triple in results {
            processor.process(&mut self.graph, triple);
            processed += 1;
        }
        processed
    }

    pub fn finish_expansion(&mut self, pending: PendingExpansion) -> ClickOutcome {
        let mut record = ExpansionRecord {
            nodes: self
                .graph
                .node_ids()
                .difference(&pending.nodes_before)
                .cloned()
                .collect(),
            edges: self
                .graph
                .edge_ids()
                .difference(&pending.edges_before)
                .cloned()
                .collect(),
        };
        let outcome = ClickOutcome::Expanded {
            added_nodes: record.nodes.len(),
            added_edges: record.edges.len(),
        };
        if let Some(node) = self.graph.node_mut(&pending.node_id) {
            node.state = ExpansionState::Expanded;
            refresh_absorbed_label(node);
            // Folded neighbours count as brought in by this expansion, so a
            // collapse after the reduction is disabled takes them out too.
            let staged = node
                .absorbed
                .iter()
                .filter(|c| !pending.nodes_before.contains(&c.node.id));
            for child in staged {
                record.nodes.insert(child.node.id.clone());
                record.edges.extend(child.edges.iter().map(|e| e.id.clone()));
            }
        }
        tracing::info!(
            node = %pending.node_id,
            added_nodes = record.nodes.len(),
            added_edges = record.edges.len(),
            "expanded node"
        );
        self.expansions.insert(pending.node_id, record);
        self.apply_layout();
        outcome
    }

    /// The query failed: log it and put the node back to collapsed.
    pub fn abandon_expansion(&mut self, pending: PendingExpansion, error: &dyn std::fmt::Display) {
        tracing::error!(node = %pending.node_id, error = %error, "neighbourhood query failed");
        if let Some(node) = self.graph.node_mut(&pending.node_id) {
            node.state = ExpansionState::Collapsed;
        }
    }

    /// Remove the leaf neighbours `node_id`'s expansion brought in.
    ///
    /// Neighbours that were already on screen stay; so do neighbours that have
    /// picked up other connections since.
    pub fn collapse(&mut self, node_id: &str) -> Result<ClickOutcome, ExploreError> {
        if !self.graph.contains_node(node_id) {
            return Err(ExploreError::UnknownNode(node_id.to_string()));
        }
        let Some(record) = self.expansions.remove(node_id) else {
            tracing::debug!(node = %node_id, "collapse ignored: node was never expanded");
            return Ok(ClickOutcome::Ignored);
        };
        let mut removed_nodes = 0;
        let mut removed_edges = 0;

        for neighbour in self.graph.connected_nodes(node_id) {
            if !self.graph.is_leaf_of(&neighbour, node_id) {
                continue;
            }
            if record.nodes.contains(&neighbour) {
                for edge_id in self.graph.connected_edges(&neighbour) {
                    if self.graph.remove_edge(&edge_id).is_some() {
                        removed_edges += 1;
                    }
                }
                if self.graph.remove_node(&neighbour).is_some() {
                    removed_nodes += 1;
                }
                self.expansions.remove(&neighbour);
            } else {
                for edge_id in self.graph.edges_between(node_id, &neighbour) {
                    if record.edges.contains(&edge_id) && self.graph.remove_edge(&edge_id).is_some() {
                        removed_edges += 1;
                    }
                }
            }
        }

        if let Some(node) = self.graph.node_mut(node_id) {
            node.state = ExpansionState::Collapsed;
        }
        tracing::info!(node = %node_id, removed_nodes, removed_edges, "collapsed node");
        Ok(ClickOutcome::Collapsed {
            removed_nodes,
            removed_edges,
        })
    }

    /// Switch a style group on or off and restyle the visible nodes it
    /// governs. Returns how many nodes changed.
    pub fn set_style_group_enabled(
        &mut self,
        group: &str,
        enabled: bool,
    ) -> Result<usize, ExploreError> {
        self.context.set_style_group_enabled(group, enabled)?;
        let context = &self.context;
        let mut restyled = 0;
        for node in self.graph.nodes_mut() {
            let in_group = node
                .type_name
                .as_deref()
                .and_then(|t| context.styles().rule(t))
                .and_then(|rule| rule.config_file.as_deref())
                == Some(group);
            if in_group {
                node.style = context.node_style(node.type_name.as_deref());
                restyled += 1;
            }
        }
        tracing::debug!(group, enabled, restyled, "toggled style group");
        Ok(restyled)
    }

    /// Takes effect on the next expansion; nothing already shown is removed.
    pub fn set_namespace_filter_enabled(
        &mut self,
        filter_id: &str,
        enabled: bool,
    ) -> Result<(), ExploreError> {
        self.context.set_namespace_filter_enabled(filter_id, enabled)
    }

    pub fn set_layout(&mut self, layout: LayoutMode) {
        self.context.set_layout(layout);
        self.apply_layout();
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.context.legend()
    }

    pub fn snapshot(&self) -> ExplorerSnapshot {
        ExplorerSnapshot {
            nodes: self.graph.nodes().cloned().collect(),
            edges: self.graph.edges().cloned().collect(),
            legend: self.context.legend(),
            layout: self.context.layout(),
            layout_options: self.context.layout().preset(),
            style_groups: self.context.style_groups(),
            namespace_filters: self.context.namespace_filters().to_vec(),
        }
    }

    pub(crate) fn apply_layout(&mut self) {
        let preset = self.context.layout().preset();
        self.network.apply_layout(&preset);
    }

    /// Node ids are bare strings; recover whether `id` names an IRI or a
    /// blank node from the store.
    fn term_for(&self, id: &str) -> Term {
        let iri = Term::iri(id);
        let known = !self.store.matching(Some(&iri), None, None).is_empty()
            || !self.store.matching(None, None, Some(&iri)).is_empty();
        if known {
            return iri;
        }
        let blank = Term::blank(id);
        if !self.store.matching(Some(&blank), None, None).is_empty()
            || !self.store.matching(None, None, Some(&blank)).is_empty()
        {
            blank
        } else {
            iri
        }
    }
}
