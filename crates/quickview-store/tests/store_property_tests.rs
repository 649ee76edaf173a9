use proptest::prelude::*;
use quickview_store::{
    ConstructQuery, GroupPattern, PathExpr, PatternTerm, TemplateTriple, Term, Triple,
    TriplePattern, TripleStore,
};
use std::collections::BTreeSet;

const EX: &str = "http://example.org/";
const MAX_NODES: usize = 8;
const MAX_PREDICATES: usize = 3;

fn ex(local: String) -> String {
    format!("{EX}{local}")
}

fn edges_strategy() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
    prop::collection::vec((0..MAX_NODES, 0..MAX_PREDICATES, 0..MAX_NODES), 0..24)
}

fn build_store(edges: &[(usize, usize, usize)]) -> TripleStore {
    let mut store = TripleStore::new();
    for (s, p, o) in edges {
        store
            .insert(Triple::new(
                Term::iri(ex(format!("n{s}"))),
                ex(format!("p{p}")),
                Term::iri(ex(format!("n{o}"))),
            ))
            .expect("iri triple");
    }
    store
}

fn var(name: &str) -> PatternTerm {
    PatternTerm::var(name)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn construct_identity_returns_store_without_duplicates(edges in edges_strategy()) {
        let store = build_store(&edges);
        let group = GroupPattern::new(vec![TriplePattern::new(var("s"), PathExpr::var("p"), var("o"))]);
        let query = ConstructQuery {
            template: vec![TemplateTriple::new(var("s"), var("p"), var("o"))],
            union: vec![group.clone(), group],
        };

        let results = query.evaluate(&store).expect("evaluate");
        let expected: BTreeSet<&Triple> = store.iter().collect();
        let got: BTreeSet<&Triple> = results.iter().collect();
        prop_assert_eq!(results.len(), store.len());
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn sequence_path_matches_manual_two_hop_join(edges in edges_strategy()) {
        let store = build_store(&edges);
        let (p0, p1) = (ex("p0".to_string()), ex("p1".to_string()));
        let query = ConstructQuery {
            template: vec![TemplateTriple::new(var("a"), PatternTerm::iri(ex("hop".to_string())), var("c"))],
            union: vec![GroupPattern::new(vec![TriplePattern::new(
                var("a"),
                PathExpr::seq([p0.as_str(), p1.as_str()]),
                var("c"),
            )])],
        };

        let got: BTreeSet<(String, String)> = query
            .evaluate(&store)
            .expect("evaluate")
            .into_iter()
            .map(|t| (t.subject.value().to_string(), t.object.value().to_string()))
            .collect();

        let mut expected = BTreeSet::new();
        for first in store.matching(None, Some(&p0), None) {
            for second in store.matching(Some(&first.object), Some(&p1), None) {
                expected.insert((
                    first.subject.value().to_string(),
                    second.object.value().to_string(),
                ));
            }
        }
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn malformed_statements_are_skipped_and_the_rest_kept(
        statements in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        let mut ttl = String::from("@prefix ex: <http://example.org/> .\n");
        for (i, ok) in statements.iter().enumerate() {
            if *ok {
                ttl.push_str(&format!("ex:s{i} ex:p \"value {i}\" .\n"));
            } else {
                ttl.push_str(&format!("ex:s{i} ex:p .\n"));
            }
        }

        let (store, report) = TripleStore::from_turtle(&ttl);
        let good = statements.iter().filter(|ok| **ok).count();
        prop_assert_eq!(store.len(), good);
        prop_assert_eq!(report.triples, good);
        prop_assert_eq!(report.skipped.len(), statements.len() - good);
        for skipped in &report.skipped {
            prop_assert!(!statements[skipped.index]);
        }
    }
}
