//! Output rendering for `quickview render`.

use anyhow::{anyhow, Result};
use quickview_engine::ExplorerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VizFormat {
    Html,
    Json,
}

impl VizFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("unknown format `{other}` (expected html|json)")),
        }
    }
}

pub fn render_json(snapshot: &ExplorerSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Standalone page: the snapshot is embedded in the bundled template and
/// drawn client-side.
pub fn render_html(snapshot: &ExplorerSnapshot, title: &str) -> Result<String> {
    // `</` is escaped so graph text cannot close the `<script>` tag.
    let json = serde_json::to_string(snapshot)?.replace("</", "<\\/");

    let template = include_str!("../templates/explorer.html");
    let mut html = template.to_string();
    html = html.replace("{{TITLE}}", &escape_html(title));
    html = html.replace("{{NODES_COUNT}}", &snapshot.nodes.len().to_string());
    html = html.replace("{{EDGES_COUNT}}", &snapshot.edges.len().to_string());
    html = html.replace("{{GRAPH_JSON}}", &json);
    Ok(html)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickview_engine::{
        ConfigFormat, GraphExplorer, RecordingNetwork, ReductionConfig, StyleConfig,
        VisualizationContext,
    };
    use quickview_store::TripleStore;

    fn snapshot() -> ExplorerSnapshot {
        let (store, _) = TripleStore::from_turtle(
            r#"
@prefix schema: <http://schema.org/> .
@prefix prov: <http://www.w3.org/ns/prov#> .
@prefix renku: <https://swissdatasciencecenter.github.io/renku-ontology#> .
<http://e.org/plan> a schema:Action ; renku:command "echo </script>" .
<http://e.org/run> a prov:Activity ; prov:startedAtTime "2022" ;
    prov:qualifiedAssociation <http://e.org/assoc> .
<http://e.org/assoc> prov:hadPlan <http://e.org/plan> .
"#,
        );
        let styles = StyleConfig::parse("{}", ConfigFormat::Json).expect("styles");
        let context = VisualizationContext::new(styles, ReductionConfig::default());
        let mut explorer = GraphExplorer::new(store, context, RecordingNetwork::new());
        explorer.load_initial_graph().expect("load");
        explorer.snapshot()
    }

    #[test]
    fn html_embeds_escaped_snapshot() {
        let html = render_html(&snapshot(), "run <1>").expect("render");
        assert!(!html.contains("{{GRAPH_JSON}}"));
        assert!(html.contains("echo <\\/script>"));
        assert!(html.contains("run &lt;1&gt;"));
    }

    #[test]
    fn json_round_trips_through_serde() {
        let json = render_json(&snapshot()).expect("render");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["edges"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["layout"], "random");
    }

    #[test]
    fn format_parse_rejects_unknown() {
        assert_eq!(VizFormat::parse("HTML").expect("html"), VizFormat::Html);
        assert!(VizFormat::parse("dot").is_err());
    }
}
