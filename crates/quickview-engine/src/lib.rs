//! Interactive exploration engine for provenance graphs.
//!
//! The engine keeps a *visible graph* that starts from the activity/action
//! backbone of a [`quickview_store::TripleStore`] and grows or shrinks as the
//! user expands and collapses nodes. Styling, label text and reductions are
//! driven by two configuration files (see [`config`]).
//!
//! ```text
//! TripleStore ──query──▶ result triples ──BindingProcessor──▶ VisualGraph
//!                                            ▲                    │
//!                        VisualizationContext┘          Network ◀─┘
//! ```

pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod explorer;
pub mod graph;
pub mod layout;
pub mod reduction;
pub mod style;

pub use binding::{BindingOutcome, BindingProcessor};
pub use config::{
    ConfigFormat, DisplayedInformation, ReductionConfig, ReductionRule, StyleConfig, StyleRule,
};
pub use context::{LegendEntry, NamespaceFilter, StyleGroupState, VisualizationContext};
pub use error::{ConfigError, ExploreError};
pub use explorer::{ClickOutcome, ExplorerSnapshot, GraphExplorer, PendingExpansion};
pub use graph::{AbsorbedChild, Edge, ExpansionState, Node, VisualGraph};
pub use layout::{LayoutMode, LayoutPreset, Network, NetworkCall, RecordingNetwork};
pub use style::{local_name, type_name_from_iri, NodeStyle, ResolvedStyle};
