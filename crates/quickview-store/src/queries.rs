//! The two query shapes the explorer issues.
//!
//! - [`initial_graph_query`]: the activity/action/plan backbone the view opens on.
//! - [`neighborhood_query`]: everything one hop around a clicked node, with
//!   the neighbours' types and literals so they render fully styled.

use crate::query::{
    ConstructQuery, Filter, GroupPattern, PathExpr, PatternTerm, TemplateTriple, TriplePattern,
};
use crate::vocab::{
    PROV_HAD_PLAN, PROV_QUALIFIED_ASSOCIATION, PROV_STARTED_AT_TIME, RDF_TYPE, RENKU_COMMAND,
    SCHEMA_ACTION, STRUCTURAL_PREDICATES,
};
use crate::Term;

fn var(name: &str) -> PatternTerm {
    PatternTerm::var(name)
}

fn iri(value: &str) -> PatternTerm {
    PatternTerm::iri(value)
}

fn pattern(subject: PatternTerm, path: PathExpr, object: PatternTerm) -> TriplePattern {
    TriplePattern::new(subject, path, object)
}

fn template(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> TemplateTriple {
    TemplateTriple::new(subject, predicate, object)
}

fn backbone_group() -> GroupPattern {
    GroupPattern::new(vec![
        pattern(var("action"), PathExpr::iri(RDF_TYPE), iri(SCHEMA_ACTION)),
        pattern(var("action"), PathExpr::iri(RENKU_COMMAND), var("actionCommand")),
        pattern(
            var("activity"),
            PathExpr::seq([PROV_QUALIFIED_ASSOCIATION, PROV_HAD_PLAN]),
            var("action"),
        ),
        pattern(var("activity"), PathExpr::iri(RDF_TYPE), var("activityType")),
        pattern(var("activity"), PathExpr::iri(PROV_STARTED_AT_TIME), var("activityTime")),
    ])
}

/// The plan link itself is deliberately absent from the template: it is how
/// activities are found, not something the view shows.
fn backbone_template() -> Vec<TemplateTriple> {
    vec![
        template(var("action"), iri(RDF_TYPE), iri(SCHEMA_ACTION)),
        template(var("action"), iri(RENKU_COMMAND), var("actionCommand")),
        template(var("activity"), iri(RDF_TYPE), var("activityType")),
        template(var("activity"), iri(PROV_STARTED_AT_TIME), var("activityTime")),
    ]
}

pub fn initial_graph_query() -> ConstructQuery {
    ConstructQuery {
        template: backbone_template(),
        union: vec![backbone_group()],
    }
}

fn structural_filter() -> Filter {
    Filter::NotOneOf {
        var: "p".to_string(),
        values: STRUCTURAL_PREDICATES.iter().map(|p| p.to_string()).collect(),
    }
}

fn namespace_filters<'a>(
    vars: &'a [&'a str],
    blocked_namespaces: &'a [String],
) -> impl Iterator<Item = Filter> + 'a {
    vars.iter().flat_map(move |v| {
        blocked_namespaces.iter().map(move |ns| Filter::NotStartsWith {
            var: v.to_string(),
            prefix: ns.clone(),
        })
    })
}

/// One hop around `clicked`, in both directions.
///
/// `blocked_namespaces` are namespace IRIs (already expanded from their
/// prefixes); any neighbour, neighbour type, predicate or literal predicate
/// in one of them is left out. The backbone branch is carried along so that a
/// reset view can always be rebuilt from any expansion.
pub fn neighborhood_query(clicked: &Term, blocked_namespaces: &[String]) -> ConstructQuery {
    let c = || PatternTerm::Const(clicked.clone());

    let incoming_with_literals = GroupPattern::new(vec![
        pattern(var("s"), PathExpr::var("p"), c()),
        pattern(var("s"), PathExpr::iri(RDF_TYPE), var("s_type")),
        pattern(var("s"), PathExpr::var("p_literal"), var("s_literal")),
    ])
    .with_filter(Filter::IsLiteral("s_literal".to_string()))
    .with_filter(structural_filter())
    .with_filters(namespace_filters(
        &["s", "p", "s_type", "p_literal"],
        blocked_namespaces,
    ));

    let incoming_typed = GroupPattern::new(vec![
        pattern(var("s"), PathExpr::var("p"), c()),
        pattern(var("s"), PathExpr::iri(RDF_TYPE), var("s_type")),
    ])
    .with_filter(structural_filter())
    .with_filters(namespace_filters(&["s", "p", "s_type"], blocked_namespaces));

    let incoming = GroupPattern::new(vec![pattern(var("s"), PathExpr::var("p"), c())])
        .with_filter(structural_filter())
        .with_filters(namespace_filters(&["s", "p"], blocked_namespaces));

    let outgoing_with_literals = GroupPattern::new(vec![
        pattern(c(), PathExpr::var("p"), var("o")),
        pattern(var("o"), PathExpr::iri(RDF_TYPE), var("o_type")),
        pattern(var("o"), PathExpr::var("p_literal"), var("o_literal")),
    ])
    .with_filter(Filter::IsLiteral("o_literal".to_string()))
    .with_filter(structural_filter())
    .with_filters(namespace_filters(
        &["o", "p", "o_type", "p_literal"],
        blocked_namespaces,
    ));

    let outgoing_typed = GroupPattern::new(vec![
        pattern(c(), PathExpr::var("p"), var("o")),
        pattern(var("o"), PathExpr::iri(RDF_TYPE), var("o_type")),
    ])
    .with_filter(structural_filter())
    .with_filters(namespace_filters(&["o", "p", "o_type"], blocked_namespaces));

    let outgoing = GroupPattern::new(vec![pattern(c(), PathExpr::var("p"), var("o"))])
        .with_filter(structural_filter())
        .with_filters(namespace_filters(&["o", "p"], blocked_namespaces));

    let mut template = vec![
        template(var("s"), var("p"), c()),
        template(var("s"), iri(RDF_TYPE), var("s_type")),
        template(var("s"), var("p_literal"), var("s_literal")),
        template(c(), var("p"), var("o")),
        template(var("o"), iri(RDF_TYPE), var("o_type")),
        template(var("o"), var("p_literal"), var("o_literal")),
    ];
    template.extend(backbone_template());

    ConstructQuery {
        template,
        union: vec![
            incoming_with_literals,
            incoming_typed,
            incoming,
            outgoing_with_literals,
            outgoing_typed,
            outgoing,
            backbone_group(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Triple, TripleStore};

    const DOC: &str = r#"
@prefix schema: <http://schema.org/> .
@prefix prov: <http://www.w3.org/ns/prov#> .
@prefix renku: <https://swissdatasciencecenter.github.io/renku-ontology#> .
@prefix ex: <http://example.org/> .
@prefix oda: <http://odahub.io/ontology#> .

ex:plan a schema:Action ;
    renku:command "python run.py" ;
    renku:isUsing ex:input1 , oda:thing .

ex:input1 a renku:CommandInput ;
    renku:value "data.csv" .

oda:thing a oda:AstroqueryModule .

ex:run a prov:Activity ;
    prov:startedAtTime "2022-03-01T10:00:00" ;
    prov:qualifiedAssociation ex:assoc .

ex:assoc prov:hadPlan ex:plan .
"#;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    #[test]
    fn initial_query_builds_backbone_without_plan_links() {
        let (store, report) = TripleStore::from_turtle(DOC);
        assert!(report.skipped.is_empty());
        let out = initial_graph_query().evaluate(&store).expect("evaluate");
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|t| t.predicate != PROV_HAD_PLAN
            && t.predicate != PROV_QUALIFIED_ASSOCIATION));
        assert_eq!(out[0], Triple::new(ex("plan"), RDF_TYPE, Term::iri(SCHEMA_ACTION)));
    }

    #[test]
    fn neighborhood_excludes_structural_predicates_and_blocked_namespaces() {
        let (store, _) = TripleStore::from_turtle(DOC);
        let out = neighborhood_query(&ex("plan"), &[]).evaluate(&store).expect("evaluate");
        assert!(out.iter().any(|t| t.object == ex("input1")));
        assert!(out.iter().any(|t| t.subject == ex("input1") && t.object.is_literal()));
        assert!(out
            .iter()
            .any(|t| t.object.value().starts_with("http://odahub.io/")));
        assert!(!out.iter().any(|t| t.predicate == PROV_HAD_PLAN));

        let blocked = vec!["http://odahub.io/ontology#".to_string()];
        let out = neighborhood_query(&ex("plan"), &blocked)
            .evaluate(&store)
            .expect("evaluate");
        assert!(out.iter().any(|t| t.object == ex("input1")));
        assert!(!out.iter().any(|t| t.subject.value().starts_with(&blocked[0])
            || t.object.value().starts_with(&blocked[0])));
    }

    #[test]
    fn neighborhood_emits_type_before_literals() {
        let (store, _) = TripleStore::from_turtle(DOC);
        let out = neighborhood_query(&ex("plan"), &[]).evaluate(&store).expect("evaluate");
        let type_pos = out
            .iter()
            .position(|t| t.subject == ex("input1") && t.predicate == RDF_TYPE)
            .expect("type triple");
        let literal_pos = out
            .iter()
            .position(|t| t.subject == ex("input1") && t.object.is_literal())
            .expect("literal triple");
        assert!(type_pos < literal_pos);
    }
}
