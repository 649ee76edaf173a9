//! Style resolution and label text.

use crate::config::{DisplayedInformation, Font, LiteralFormat, StyleRule};
use serde::{Deserialize, Serialize};

/// Type local name from a type IRI: the text after the last `/`, then after
/// the first `#` when there is one.
///
/// `None` when the IRI has no `/` or the extracted name is empty; such nodes
/// keep the default style.
pub fn type_name_from_iri(iri: &str) -> Option<String> {
    let (_, tail) = iri.rsplit_once('/')?;
    let name = fragment(tail);
    (!name.is_empty()).then(|| name.to_string())
}

/// Short display name for any IRI (predicates, node ids). Falls back to the
/// full IRI when nothing usable is left.
pub fn local_name(iri: &str) -> String {
    let tail = iri.rsplit_once('/').map_or(iri, |(_, tail)| tail);
    let name = fragment(tail);
    if name.is_empty() {
        iri.to_string()
    } else {
        name.to_string()
    }
}

fn fragment(tail: &str) -> &str {
    tail.split_once('#').map_or(tail, |(_, frag)| frag)
}

/// Visual attributes attached to a rendered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub shape: String,
    pub color: String,
    pub border_color: String,
    pub style: String,
    pub border: u32,
    pub cellborder: u32,
    pub value: u32,
    pub margin: u32,
    pub font: Font,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
}

/// A type's rule overlaid on the default rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    rule: StyleRule,
}

impl ResolvedStyle {
    pub fn new(default: &StyleRule, specific: Option<&StyleRule>) -> Self {
        let rule = match specific {
            Some(rule) => rule.overlay(default),
            None => default.clone(),
        };
        Self { rule }
    }

    pub fn rule(&self) -> &StyleRule {
        &self.rule
    }

    pub fn node_style(&self) -> NodeStyle {
        let rule = &self.rule;
        NodeStyle {
            shape: rule.shape.clone(),
            color: rule.color.clone(),
            border_color: rule.color.clone(),
            style: rule.style.clone().unwrap_or_else(|| "filled".to_string()),
            border: rule.border.unwrap_or(0),
            cellborder: rule.cellborder.unwrap_or(0),
            value: rule.value.unwrap_or(20),
            margin: rule.margin.unwrap_or(10),
            font: rule.font.clone().unwrap_or_default(),
            config_file: rule.config_file.clone(),
        }
    }

    pub fn display_name<'a>(&'a self, type_name: &'a str) -> &'a str {
        self.rule.displayed_type_name.as_deref().unwrap_or(type_name)
    }

    /// Label and tooltip for a freshly typed node.
    ///
    /// The label is the bold type heading unless the type is configured to
    /// show literals only, in which case it starts out empty.
    pub fn heading(&self, type_name: &str) -> (String, String) {
        let display = self.display_name(type_name).to_string();
        let label = match self.rule.displayed_information {
            Some(DisplayedInformation::Literals) => String::new(),
            _ => format!("<b>{display}</b>"),
        };
        (label, display)
    }

    /// Replace `value` with the first configured keyword it contains.
    pub fn substitute_keyword(&self, predicate: &str, value: &str) -> String {
        self.rule
            .literals_keyword_to_substitute
            .as_ref()
            .and_then(|subs| subs.find(predicate, value))
            .unwrap_or(value)
            .to_string()
    }

    /// The label line for a literal, or `None` when it should not be shown.
    pub fn literal_line(&self, predicate: &str, value: &str) -> Option<String> {
        if self.rule.displayed_information == Some(DisplayedInformation::Title) {
            return None;
        }
        let Some(table) = &self.rule.displayed_literals_format else {
            // Literals-only nodes show nothing unless a table names the predicate.
            if self.rule.displayed_information == Some(DisplayedInformation::Literals) {
                return None;
            }
            return Some(format!("{predicate}: {value}"));
        };
        match table.lookup(predicate)? {
            LiteralFormat::No => Some(value.to_string()),
            LiteralFormat::Yes | LiteralFormat::Other(_) => Some(format!("{predicate}: {value}")),
        }
    }
}
