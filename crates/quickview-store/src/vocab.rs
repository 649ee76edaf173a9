//! IRIs the explorer queries for by name.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const SCHEMA_ACTION: &str = "http://schema.org/Action";

pub const RENKU_COMMAND: &str = "https://swissdatasciencecenter.github.io/renku-ontology#command";

pub const PROV_STARTED_AT_TIME: &str = "http://www.w3.org/ns/prov#startedAtTime";
pub const PROV_QUALIFIED_ASSOCIATION: &str = "http://www.w3.org/ns/prov#qualifiedAssociation";
pub const PROV_HAD_PLAN: &str = "http://www.w3.org/ns/prov#hadPlan";

/// Activity/plan linkage predicates. They are walked by the backbone query but
/// never materialize as visible edges.
pub const STRUCTURAL_PREDICATES: [&str; 2] = [PROV_QUALIFIED_ASSOCIATION, PROV_HAD_PLAN];

/// Type-assignment predicates are recognised by suffix, so `rdf:type` and
/// look-alikes from other vocabularies are treated the same way.
pub fn is_type_predicate(iri: &str) -> bool {
    iri.ends_with("#type")
}

pub fn is_structural_predicate(iri: &str) -> bool {
    STRUCTURAL_PREDICATES.contains(&iri)
}
