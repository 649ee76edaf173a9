//! Session-wide visualization state.
//!
//! One [`VisualizationContext`] lives for the whole exploration session. It
//! holds the loaded configuration and the user's toggles; the explorer reads
//! it on every binding and changes it only through the setters below.

use crate::config::{ReductionConfig, ReductionRule, StyleConfig};
use crate::error::ExploreError;
use crate::layout::LayoutMode;
use crate::style::{NodeStyle, ResolvedStyle};
use quickview_store::TripleStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named set of namespace prefixes. While the filter is disabled, neighbours
/// in those namespaces are left out of expansions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFilter {
    pub id: String,
    pub prefixes: Vec<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub type_name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleGroupState {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct VisualizationContext {
    styles: StyleConfig,
    reductions: ReductionConfig,
    disabled_groups: BTreeSet<String>,
    enabled_reductions: BTreeSet<String>,
    namespace_filters: Vec<NamespaceFilter>,
    layout: LayoutMode,
}

impl VisualizationContext {
    pub fn new(styles: StyleConfig, reductions: ReductionConfig) -> Self {
        Self {
            styles,
            reductions,
            disabled_groups: BTreeSet::new(),
            enabled_reductions: BTreeSet::new(),
            namespace_filters: Vec::new(),
            layout: LayoutMode::default(),
        }
    }

    /// Register a namespace filter, enabled (its namespaces visible).
    pub fn with_namespace_filter(
        mut self,
        id: impl Into<String>,
        prefixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.namespace_filters.push(NamespaceFilter {
            id: id.into(),
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            enabled: true,
        });
        self
    }

    pub fn styles(&self) -> &StyleConfig {
        &self.styles
    }

    pub fn reductions(&self) -> &ReductionConfig {
        &self.reductions
    }

    /// Style for `type_name` regardless of whether its group is enabled. Used
    /// for label text, which does not change with group toggles.
    pub fn resolved_style(&self, type_name: &str) -> ResolvedStyle {
        ResolvedStyle::new(self.styles.default_rule(), self.styles.rule(type_name))
    }

    pub fn default_node_style(&self) -> NodeStyle {
        ResolvedStyle::new(self.styles.default_rule(), None).node_style()
    }

    /// Visual style for a node of `type_name`, honouring disabled groups.
    pub fn node_style(&self, type_name: Option<&str>) -> NodeStyle {
        let rule = type_name
            .and_then(|t| self.styles.rule(t))
            .filter(|rule| {
                rule.config_file
                    .as_deref()
                    .map_or(true, |group| self.is_style_group_enabled(group))
            });
        ResolvedStyle::new(self.styles.default_rule(), rule).node_style()
    }

    pub fn is_style_group_enabled(&self, group: &str) -> bool {
        !self.disabled_groups.contains(group)
    }

    pub fn style_groups(&self) -> Vec<StyleGroupState> {
        self.styles
            .groups()
            .into_iter()
            .map(|name| StyleGroupState {
                enabled: self.is_style_group_enabled(&name),
                name,
            })
            .collect()
    }

    pub(crate) fn set_style_group_enabled(
        &mut self,
        group: &str,
        enabled: bool,
    ) -> Result<(), ExploreError> {
        if !self.styles.groups().contains(group) {
            return Err(ExploreError::UnknownStyleGroup(group.to_string()));
        }
        if enabled {
            self.disabled_groups.remove(group);
        } else {
            self.disabled_groups.insert(group.to_string());
        }
        Ok(())
    }

    /// Legend entries: every rule whose style group is present and enabled.
    pub fn legend(&self) -> Vec<LegendEntry> {
        self.styles
            .rules()
            .filter(|(_, rule)| {
                rule.config_file
                    .as_deref()
                    .is_some_and(|group| self.is_style_group_enabled(group))
            })
            .map(|(type_name, rule)| LegendEntry {
                type_name: rule
                    .displayed_type_name
                    .clone()
                    .unwrap_or_else(|| type_name.to_string()),
                color: rule.color.clone(),
            })
            .collect()
    }

    pub fn namespace_filters(&self) -> &[NamespaceFilter] {
        &self.namespace_filters
    }

    pub fn set_namespace_filter_enabled(
        &mut self,
        id: &str,
        enabled: bool,
    ) -> Result<(), ExploreError> {
        let filter = self
            .namespace_filters
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| ExploreError::UnknownNamespaceFilter(id.to_string()))?;
        filter.enabled = enabled;
        Ok(())
    }

    /// Namespace IRIs currently hidden, resolved through the store's prefix
    /// table. Prefixes the dataset never declares are skipped.
    pub fn blocked_namespaces(&self, store: &TripleStore) -> Vec<String> {
        let mut blocked = Vec::new();
        for filter in self.namespace_filters.iter().filter(|f| !f.enabled) {
            for prefix in &filter.prefixes {
                match store.namespace(prefix) {
                    Some(ns) => blocked.push(ns.to_string()),
                    None => tracing::debug!(
                        filter = %filter.id,
                        prefix = %prefix,
                        "namespace prefix not declared by the dataset; ignoring"
                    ),
                }
            }
        }
        blocked
    }

    pub fn reduction_rule(&self, parent_type: &str) -> Option<&ReductionRule> {
        self.reductions.rule(parent_type)
    }

    /// The rule for `parent_type`, if that reduction is switched on.
    pub fn active_reduction(&self, parent_type: &str) -> Option<&ReductionRule> {
        if !self.enabled_reductions.contains(parent_type) {
            return None;
        }
        self.reductions.rule(parent_type)
    }

    pub fn is_reduction_enabled(&self, parent_type: &str) -> bool {
        self.enabled_reductions.contains(parent_type)
    }

    pub(crate) fn set_reduction_enabled(
        &mut self,
        parent_type: &str,
        enabled: bool,
    ) -> Result<(), ExploreError> {
        if self.reductions.rule(parent_type).is_none() {
            return Err(ExploreError::UnknownReduction(parent_type.to_string()));
        }
        if enabled {
            self.enabled_reductions.insert(parent_type.to_string());
        } else {
            self.enabled_reductions.remove(parent_type);
        }
        Ok(())
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub(crate) fn set_layout(&mut self, layout: LayoutMode) {
        self.layout = layout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    fn context() -> VisualizationContext {
        let styles = StyleConfig::parse(
            r##"{
                "Action": {"shape": "ellipse", "color": "#FF0000", "config_file": "renku"},
                "AstroqueryModule": {"shape": "box", "color": "#00FF00", "config_file": "oda",
                                     "displayed_type_name": "Module"},
                "Loose": {"shape": "box", "color": "#0000FF"}
            }"##,
            ConfigFormat::Json,
        )
        .expect("styles");
        VisualizationContext::new(styles, ReductionConfig::default())
            .with_namespace_filter("oda_filter", ["oda", "odas"])
    }

    #[test]
    fn disabled_group_falls_back_to_default_style() {
        let mut ctx = context();
        assert_eq!(ctx.node_style(Some("Action")).color, "#FF0000");
        ctx.set_style_group_enabled("renku", false).expect("toggle");
        assert_eq!(ctx.node_style(Some("Action")).color, "#FFFFFF");
        assert_eq!(ctx.node_style(Some("Loose")).color, "#0000FF");
        assert!(ctx.set_style_group_enabled("nope", false).is_err());
    }

    #[test]
    fn legend_lists_enabled_grouped_rules() {
        let mut ctx = context();
        let names: Vec<_> = ctx.legend().into_iter().map(|e| e.type_name).collect();
        assert_eq!(names, vec!["Action", "Module"]);
        ctx.set_style_group_enabled("oda", false).expect("toggle");
        let names: Vec<_> = ctx.legend().into_iter().map(|e| e.type_name).collect();
        assert_eq!(names, vec!["Action"]);
    }

    #[test]
    fn blocked_namespaces_resolve_declared_prefixes_only() {
        let (store, _) = TripleStore::from_turtle(
            "@prefix oda: <http://odahub.io/ontology#> .\n<http://e.org/a> a oda:X .\n",
        );
        let mut ctx = context();
        assert!(ctx.blocked_namespaces(&store).is_empty());
        ctx.set_namespace_filter_enabled("oda_filter", false)
            .expect("toggle");
        assert_eq!(
            ctx.blocked_namespaces(&store),
            vec!["http://odahub.io/ontology#".to_string()]
        );
        assert!(ctx.set_namespace_filter_enabled("missing", true).is_err());
    }
}
