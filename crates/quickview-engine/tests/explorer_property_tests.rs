use proptest::prelude::*;
use quickview_engine::*;
use quickview_store::TripleStore;
use std::collections::BTreeSet;

const MAX_SATELLITES: usize = 10;
const PLANS: usize = 2;

const PREFIXES: &str = r#"
@prefix schema: <http://schema.org/> .
@prefix prov: <http://www.w3.org/ns/prov#> .
@prefix renku: <https://swissdatasciencecenter.github.io/renku-ontology#> .
@prefix ex: <http://example.org/> .
"#;

const PREDICATES: [&str; 2] = ["renku:hasInputs", "renku:isUsing"];

#[derive(Debug, Clone)]
struct Satellite {
    // 0 = CommandInput, 1 = ex:Other, 2 = untyped
    kind: usize,
    links: Vec<(usize, usize)>, // (plan_idx, predicate_idx)
}

fn satellites_strategy() -> impl Strategy<Value = Vec<Satellite>> {
    prop::collection::vec(
        (
            0usize..3,
            prop::collection::vec((0usize..PLANS, 0usize..PREDICATES.len()), 1..=3),
        )
            .prop_map(|(kind, links)| Satellite { kind, links }),
        0..=MAX_SATELLITES,
    )
}

fn build_turtle(satellites: &[Satellite]) -> String {
    let mut ttl = String::from(PREFIXES);
    for p in 0..PLANS {
        ttl.push_str(&format!(
            "ex:plan{p} a schema:Action ; renku:command \"run {p}\" .\n\
             ex:run{p} a prov:Activity ; prov:startedAtTime \"2022-01-0{}\" ; \
             prov:qualifiedAssociation ex:assoc{p} .\n\
             ex:assoc{p} prov:hadPlan ex:plan{p} .\n",
            p + 1
        ));
    }
    for (i, sat) in satellites.iter().enumerate() {
        match sat.kind {
            0 => ttl.push_str(&format!(
                "ex:s{i} a renku:CommandInput ; renku:value \"v{i}\" .\n"
            )),
            1 => ttl.push_str(&format!("ex:s{i} a ex:Other ; renku:value \"o{i}\" .\n")),
            _ => {}
        }
        for (plan, pred) in &sat.links {
            ttl.push_str(&format!("ex:plan{plan} {} ex:s{i} .\n", PREDICATES[*pred]));
        }
    }
    ttl
}

fn explorer(satellites: &[Satellite], reductions: &str) -> GraphExplorer<RecordingNetwork> {
    let (store, report) = TripleStore::from_turtle(&build_turtle(satellites));
    assert!(report.skipped.is_empty());
    let context = VisualizationContext::new(
        StyleConfig::default(),
        ReductionConfig::parse(reductions, ConfigFormat::Yaml).expect("reductions"),
    );
    let mut explorer = GraphExplorer::new(store, context, RecordingNetwork::new());
    explorer.load_initial_graph().expect("initial graph");
    explorer
}

fn plan(p: usize) -> String {
    format!("http://example.org/plan{p}")
}

const TYPED_REDUCTION: &str =
    "Action:\n  name: inputs\n  predicates_to_absorb: hasInputs\n  nodes_to_absorb: CommandInput\n";
const ANY_REDUCTION: &str = "Action:\n  name: all\n  predicates_to_absorb: hasInputs,isUsing\n";

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn expand_then_collapse_restores_initial_graph(satellites in satellites_strategy()) {
        let mut explorer = explorer(&satellites, TYPED_REDUCTION);
        let nodes: BTreeSet<String> = explorer.graph().node_ids();
        let edges: BTreeSet<String> = explorer.graph().edge_ids();

        explorer.expand(&plan(0)).expect("expand");
        explorer.collapse(&plan(0)).expect("collapse");

        prop_assert_eq!(explorer.graph().node_ids(), nodes);
        prop_assert_eq!(explorer.graph().edge_ids(), edges);
    }

    #[test]
    fn collapse_keeps_shared_neighbours(satellites in satellites_strategy()) {
        let mut explorer = explorer(&satellites, TYPED_REDUCTION);
        explorer.expand(&plan(0)).expect("expand plan0");
        let after_first = explorer.graph().node_ids();

        explorer.expand(&plan(1)).expect("expand plan1");
        explorer.collapse(&plan(1)).expect("collapse plan1");

        prop_assert_eq!(explorer.graph().node_ids(), after_first);
    }

    #[test]
    fn reduction_enable_disable_is_identity(
        satellites in satellites_strategy(),
        any_type in any::<bool>(),
    ) {
        let reductions = if any_type { ANY_REDUCTION } else { TYPED_REDUCTION };
        let mut explorer = explorer(&satellites, reductions);
        explorer.expand(&plan(0)).expect("expand plan0");
        explorer.expand(&plan(1)).expect("expand plan1");
        let before = explorer.graph().clone();

        let absorbed = explorer.enable_reduction("Action").expect("enable");
        let restored = explorer.disable_reduction("Action").expect("disable");

        prop_assert_eq!(absorbed, restored);
        prop_assert_eq!(explorer.graph(), &before);
    }

    #[test]
    fn absorbed_nodes_are_never_visible(satellites in satellites_strategy()) {
        let mut explorer = explorer(&satellites, TYPED_REDUCTION);
        explorer.enable_reduction("Action").expect("enable");
        explorer.expand(&plan(0)).expect("expand plan0");
        explorer.expand(&plan(1)).expect("expand plan1");

        for node in explorer.graph().nodes() {
            for child in &node.absorbed {
                prop_assert!(!explorer.graph().contains_node(&child.node.id));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn reduction_during_expansion_restores_plain_expansion(
        satellites in satellites_strategy(),
        any_type in any::<bool>(),
    ) {
        let reductions = if any_type { ANY_REDUCTION } else { TYPED_REDUCTION };
        let mut plain = explorer(&satellites, reductions);
        plain.expand(&plan(0)).expect("expand plan0");
        plain.expand(&plan(1)).expect("expand plan1");

        let mut reduced = explorer(&satellites, reductions);
        reduced.enable_reduction("Action").expect("enable");
        reduced.expand(&plan(0)).expect("expand plan0");
        reduced.expand(&plan(1)).expect("expand plan1");
        reduced.disable_reduction("Action").expect("disable");

        prop_assert_eq!(reduced.graph().node_ids(), plain.graph().node_ids());
        prop_assert_eq!(reduced.graph().edge_ids(), plain.graph().edge_ids());
    }
}
