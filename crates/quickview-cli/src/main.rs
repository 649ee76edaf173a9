//! Quickview CLI
//!
//! Command-line front end for the provenance graph explorer:
//! - `render`: load a Turtle graph and its style/reduction configuration,
//!   replay explorer actions (expand, reduce, toggle groups, hide
//!   namespaces, pick a layout) and write the view as JSON or HTML
//! - `inspect`: report what was ingested from a Turtle file

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use quickview_engine::{
    GraphExplorer, LayoutMode, RecordingNetwork, ReductionConfig, StyleConfig,
    VisualizationContext,
};
use quickview_store::queries::initial_graph_query;
use quickview_store::TripleStore;
use std::fs;
use std::path::{Path, PathBuf};

mod viz;

#[derive(Parser)]
#[command(name = "quickview")]
#[command(author, version, about = "Quickview: interactive provenance graph explorer")]
struct Cli {
    /// More log output on stderr (`-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a view of the graph and write it to a file.
    Render(RenderArgs),

    /// Summarize a Turtle file: triples, prefixes, skipped statements.
    Inspect {
        /// Input Turtle file.
        #[arg(long)]
        graph: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Input Turtle file.
    #[arg(long)]
    graph: PathBuf,
    /// Style configuration (`.json`, `.yaml` or `.yml`).
    #[arg(long)]
    styles: PathBuf,
    /// Reduction configuration (`.json`, `.yaml` or `.yml`).
    #[arg(long)]
    reductions: Option<PathBuf>,
    /// Node id to expand (repeatable, applied in order).
    #[arg(long)]
    expand: Vec<String>,
    /// Parent type whose reduction should be enabled (repeatable).
    #[arg(long)]
    reduce: Vec<String>,
    /// Style group to switch off (repeatable).
    #[arg(long)]
    disable_group: Vec<String>,
    /// Comma-separated namespace prefixes to hide from expansions
    /// (repeatable), e.g. `oda,odas`.
    #[arg(long)]
    hide_namespace: Vec<String>,
    /// Layout preset: random|hierarchical
    #[arg(long, default_value = "random")]
    layout: String,
    /// Output format: json|html
    #[arg(long, default_value = "html")]
    format: String,
    /// Output file.
    #[arg(short, long)]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render(args) => cmd_render(&args)?,
        Commands::Inspect { graph } => cmd_inspect(&graph)?,
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_store(path: &Path) -> Result<TripleStore> {
    let (store, report) = TripleStore::from_turtle_file(path)?;
    if !report.skipped.is_empty() {
        eprintln!(
            "{} skipped {} malformed statement(s) in {}",
            "warning:".yellow().bold(),
            report.skipped.len(),
            path.display()
        );
    }
    Ok(store)
}

fn cmd_render(args: &RenderArgs) -> Result<()> {
    let format = viz::VizFormat::parse(&args.format)?;
    let layout = LayoutMode::parse(&args.layout).ok_or_else(|| {
        anyhow!(
            "unknown layout `{}` (expected random|hierarchical)",
            args.layout
        )
    })?;

    let store = load_store(&args.graph)?;
    let styles = StyleConfig::load(&args.styles)
        .with_context(|| format!("loading styles from {}", args.styles.display()))?;
    let reductions = match &args.reductions {
        Some(path) => ReductionConfig::load(path)
            .with_context(|| format!("loading reductions from {}", path.display()))?,
        None => ReductionConfig::default(),
    };

    let mut context = VisualizationContext::new(styles, reductions);
    for prefixes in &args.hide_namespace {
        context = context.with_namespace_filter(
            prefixes.clone(),
            prefixes.split(',').map(str::trim).filter(|p| !p.is_empty()),
        );
    }

    let mut explorer = GraphExplorer::new(store, context, RecordingNetwork::new());
    explorer.set_layout(layout);
    for filter in &args.hide_namespace {
        explorer.set_namespace_filter_enabled(filter, false)?;
    }
    for group in &args.disable_group {
        explorer.set_style_group_enabled(group, false)?;
    }
    explorer.load_initial_graph()?;

    for node_id in &args.expand {
        explorer
            .expand(node_id)
            .with_context(|| format!("expanding `{node_id}`"))?;
    }
    for parent_type in &args.reduce {
        let absorbed = explorer.enable_reduction(parent_type)?;
        tracing::debug!(parent_type = %parent_type, absorbed, "reduction applied");
    }

    let snapshot = explorer.snapshot();
    let rendered = match format {
        viz::VizFormat::Json => viz::render_json(&snapshot)?,
        viz::VizFormat::Html => {
            let title = args
                .graph
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "quickview".to_string());
            viz::render_html(&snapshot, &title)?
        }
    };

    fs::write(&args.out, rendered)
        .with_context(|| format!("writing {}", args.out.display()))?;
    println!(
        "wrote {} (nodes={} edges={})",
        args.out.display(),
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let (store, report) = TripleStore::from_turtle_file(path)?;
    let backbone = initial_graph_query().evaluate(&store)?;

    println!("{} {}", "graph:".green().bold(), path.display());
    println!("  triples: {}", store.len());
    println!("  backbone triples: {}", backbone.len());
    println!("  prefixes: {}", store.prefixes().len());
    for (name, namespace) in store.prefixes() {
        println!("    {name}: <{namespace}>");
    }
    if report.skipped.is_empty() {
        println!("  skipped statements: 0");
    } else {
        println!(
            "  {} {}",
            "skipped statements:".yellow().bold(),
            report.skipped.len()
        );
        for skipped in &report.skipped {
            println!(
                "    #{} {}: {}",
                skipped.index, skipped.excerpt, skipped.message
            );
        }
    }
    Ok(())
}
