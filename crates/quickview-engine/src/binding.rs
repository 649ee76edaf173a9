//! Applies query result triples to the visible graph, one at a time.
//!
//! Order matters: a node's type binding must be processed before its literal
//! bindings, since the type decides how literals are rendered. The fixed
//! queries emit triples in that order.

use crate::context::VisualizationContext;
use crate::config::ReductionRule;
use crate::graph::{AbsorbedChild, Edge, Node, VisualGraph};
use crate::style::{local_name, type_name_from_iri};
use quickview_store::{vocab, Term, Triple, TripleStore};
use std::collections::BTreeSet;

/// What a single binding did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOutcome {
    /// The node received its type, label heading and style.
    Typed,
    /// The node already had a type; the first one wins.
    TypeKept,
    /// No type name could be extracted; default style retained.
    TypeUnresolved,
    LiteralAppended,
    /// Hidden by the style, or already present in the label.
    LiteralSkipped,
    Linked { node_added: bool, edge_added: bool },
    /// Staged into the clicked node's reduction payload.
    Absorbed,
    /// Refers to something already represented in a reduction payload.
    Suppressed,
    /// Activity/plan linkage that is never shown.
    Dropped,
}

/// A reduction in force for the node being expanded.
#[derive(Debug, Clone)]
pub struct ActiveReduction {
    pub parent_type: String,
    pub rule: ReductionRule,
}

pub struct BindingProcessor<'a> {
    context: &'a VisualizationContext,
    store: &'a TripleStore,
    clicked: Option<String>,
    reduction: Option<ActiveReduction>,
    suppressed_nodes: BTreeSet<String>,
    suppressed_edges: BTreeSet<String>,
}

impl<'a> BindingProcessor<'a> {
    /// Processor for the initial graph: no clicked node, nothing suppressed.
    pub fn new(context: &'a VisualizationContext, store: &'a TripleStore) -> Self {
        Self {
            context,
            store,
            clicked: None,
            reduction: None,
            suppressed_nodes: BTreeSet::new(),
            suppressed_edges: BTreeSet::new(),
        }
    }

    /// Processor for one expansion of `clicked`.
    ///
    /// `suppressed_nodes`/`suppressed_edges` are what reduction payloads
    /// already hold; bindings that would re-create them are skipped.
    pub fn for_expansion(
        context: &'a VisualizationContext,
        store: &'a TripleStore,
        clicked: &str,
        reduction: Option<ActiveReduction>,
        suppressed_nodes: BTreeSet<String>,
        suppressed_edges: BTreeSet<String>,
    ) -> Self {
        Self {
            context,
            store,
            clicked: Some(clicked.to_string()),
            reduction,
            suppressed_nodes,
            suppressed_edges,
        }
    }

    pub fn process(&self, graph: &mut VisualGraph, triple: &Triple) -> BindingOutcome {
        let subject_id = triple.subject.value();
        let object_id = triple.object.value();
        let clicked = self.clicked.as_deref();
        if self.suppressed_nodes.contains(subject_id) {
            if Some(object_id) == clicked && self.is_link(triple) {
                return self.record_payload_edge(graph, subject_id, triple);
            }
            return BindingOutcome::Suppressed;
        }

        if let Some(staged) = self.staged_child(graph, subject_id) {
            return match &triple.object {
                _ if vocab::is_type_predicate(&triple.predicate) => {
                    assign_type(self.context, &mut staged.node, object_id)
                }
                Term::Literal(lit) => {
                    append_literal(self.context, &mut staged.node, &triple.predicate, &lit.lexical)
                }
                _ if Some(object_id) == clicked => {
                    attach_edge(staged, Edge::new(subject_id, object_id, &triple.predicate))
                }
                _ => BindingOutcome::Suppressed,
            };
        }

        if vocab::is_type_predicate(&triple.predicate) {
            let node = self.ensure_node(graph, subject_id);
            return assign_type(self.context, node, triple.object.value());
        }

        if let Term::Literal(lit) = &triple.object {
            let node = self.ensure_node(graph, subject_id);
            return append_literal(self.context, node, &triple.predicate, &lit.lexical);
        }

        if vocab::is_structural_predicate(&triple.predicate) {
            return BindingOutcome::Dropped;
        }

        if self
            .suppressed_edges
            .contains(&Edge::key(subject_id, object_id))
        {
            self.ensure_node(graph, subject_id);
            return BindingOutcome::Suppressed;
        }
        if self.suppressed_nodes.contains(object_id) {
            self.ensure_node(graph, subject_id);
            if Some(subject_id) == clicked {
                return self.record_payload_edge(graph, object_id, triple);
            }
            return BindingOutcome::Suppressed;
        }

        if let Some(staged) = self.staged_child(graph, object_id) {
            if Some(subject_id) == clicked {
                return attach_edge(staged, Edge::new(subject_id, object_id, &triple.predicate));
            }
            return BindingOutcome::Suppressed;
        }

        if let Some(outcome) = self.try_absorb(graph, triple) {
            return outcome;
        }

        self.ensure_node(graph, subject_id);
        let node_added = if graph.contains_node(object_id) {
            false
        } else {
            graph.add_node(Node::new(object_id, self.context.default_node_style()))
        };
        let edge_added = graph.add_edge(Edge::new(subject_id, object_id, &triple.predicate));
        BindingOutcome::Linked {
            node_added,
            edge_added,
        }
    }

    fn ensure_node<'g>(&self, graph: &'g mut VisualGraph, id: &str) -> &'g mut Node {
        graph.node_or_insert_with(id, || Node::new(id, self.context.default_node_style()))
    }

    fn is_link(&self, triple: &Triple) -> bool {
        !triple.object.is_literal()
            && !vocab::is_type_predicate(&triple.predicate)
            && !vocab::is_structural_predicate(&triple.predicate)
    }

    /// A node already folded into some parent's payload is linked to the
    /// clicked node too. Keep the edge with the payload entry so disabling
    /// the reduction brings it back along with the node.
    fn record_payload_edge(
        &self,
        graph: &mut VisualGraph,
        absorbed_id: &str,
        triple: &Triple,
    ) -> BindingOutcome {
        let edge = Edge::new(triple.subject.value(), triple.object.value(), &triple.predicate);
        let child = graph
            .nodes_mut()
            .flat_map(|n| n.absorbed.iter_mut())
            .find(|child| child.node.id == absorbed_id);
        match child {
            Some(child) => {
                tracing::debug!(child = %absorbed_id, edge = %edge.id, "kept edge with absorbed node");
                attach_edge(child, edge)
            }
            None => BindingOutcome::Suppressed,
        }
    }

    /// A payload entry staged into the clicked node during this expansion.
    fn staged_child<'g>(
        &self,
        graph: &'g mut VisualGraph,
        id: &str,
    ) -> Option<&'g mut AbsorbedChild> {
        self.reduction.as_ref()?;
        let clicked = self.clicked.as_deref()?;
        graph
            .node_mut(clicked)?
            .absorbed
            .iter_mut()
            .find(|child| child.node.id == id)
    }

    /// Stage the far end of a clicked-node edge into the payload when the
    /// active reduction covers it. `None` means the binding is not absorbed.
    fn try_absorb(&self, graph: &mut VisualGraph, triple: &Triple) -> Option<BindingOutcome> {
        let active = self.reduction.as_ref()?;
        let clicked = self.clicked.as_deref()?;
        let subject_id = triple.subject.value();
        let object_id = triple.object.value();

        let (far_term, far_id) = if subject_id == clicked && object_id != clicked {
            (&triple.object, object_id)
        } else if object_id == clicked && subject_id != clicked {
            (&triple.subject, subject_id)
        } else {
            return None;
        };

        if !active.rule.absorbs_predicate(&local_name(&triple.predicate))
            || graph.contains_node(far_id)
        {
            return None;
        }
        let far_type = self.store.first_type_of(far_term).and_then(type_name_from_iri);
        if far_type.as_deref() == Some(active.parent_type.as_str())
            || !active.rule.absorbs_type(far_type.as_deref())
        {
            return None;
        }

        let edge = Edge::new(subject_id, object_id, &triple.predicate);
        let node = Node::new(far_id, self.context.default_node_style());
        graph.node_mut(clicked)?.absorbed.push(AbsorbedChild {
            reduction: active.parent_type.clone(),
            node,
            edges: vec![edge],
        });
        tracing::debug!(parent = %clicked, child = %far_id, "staged node into reduction");
        Some(BindingOutcome::Absorbed)
    }
}

/// Record another edge between a staged node and its parent; first edge per
/// key wins, as on screen.
fn attach_edge(child: &mut AbsorbedChild, edge: Edge) -> BindingOutcome {
    if !child.edges.iter().any(|e| e.id == edge.id) {
        child.edges.push(edge);
    }
    BindingOutcome::Absorbed
}

/// Give `node` its type, unless it already has one.
pub fn assign_type(
    context: &VisualizationContext,
    node: &mut Node,
    type_iri: &str,
) -> BindingOutcome {
    if node.type_name.is_some() {
        return BindingOutcome::TypeKept;
    }
    let Some(type_name) = type_name_from_iri(type_iri) else {
        tracing::debug!(node = %node.id, type_iri, "no type name in IRI; keeping default style");
        return BindingOutcome::TypeUnresolved;
    };
    let (label, title) = context.resolved_style(&type_name).heading(&type_name);
    node.label = label;
    node.title = title;
    node.style = context.node_style(Some(&type_name));
    node.type_name = Some(type_name);
    BindingOutcome::Typed
}

/// Append the label line for one literal, deduplicated by containment.
pub fn append_literal(
    context: &VisualizationContext,
    node: &mut Node,
    predicate_iri: &str,
    lexical: &str,
) -> BindingOutcome {
    let predicate = local_name(predicate_iri);
    let line = match node.type_name.as_deref() {
        Some(type_name) => {
            let style = context.resolved_style(type_name);
            let value = style.substitute_keyword(&predicate, lexical);
            style.literal_line(&predicate, &value)
        }
        None => Some(format!("{predicate}: {lexical}")),
    };
    let Some(line) = line.filter(|l| !l.is_empty()) else {
        return BindingOutcome::LiteralSkipped;
    };
    if node.label.contains(&line) {
        return BindingOutcome::LiteralSkipped;
    }
    if !node.label.is_empty() {
        node.label.push('\n');
    }
    node.label.push_str(&line);
    BindingOutcome::LiteralAppended
}
