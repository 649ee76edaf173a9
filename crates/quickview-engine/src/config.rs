//! Style and reduction configuration.
//!
//! Both files are maps keyed by RDF type local name. They can be JSON or
//! YAML; the format is picked from the file extension. Several fields use
//! compact delimited strings instead of nested structures:
//!
//! - `displayed_literals_format`: `"command:no,value:yes"`
//! - `literals_keyword_to_substitute`: `"command:python,bash;value:csv"`
//! - `predicates_to_absorb` / `nodes_to_absorb`: `"isUsing,hasInputs"` (a
//!   YAML/JSON list is accepted as well)
//!
//! A missing required field in any entry is fatal for the whole file.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Key of the optional entry that overrides the built-in default style.
pub const DEFAULT_STYLE_KEY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

// ============================================================================
// Style rules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayedInformation {
    Title,
    Literals,
    Both,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoldFont {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<BoldFont>,
}

/// How a literal predicate is rendered inside a node label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralFormat {
    /// `pred: value`
    Yes,
    /// `value` only
    No,
    /// Anything else; rendered like `Yes`.
    Other(String),
}

impl LiteralFormat {
    fn parse(raw: &str) -> Self {
        match raw {
            "yes" => LiteralFormat::Yes,
            "no" => LiteralFormat::No,
            other => LiteralFormat::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            LiteralFormat::Yes => "yes",
            LiteralFormat::No => "no",
            LiteralFormat::Other(raw) => raw,
        }
    }
}

/// Parsed `displayed_literals_format`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LiteralFormatTable {
    entries: Vec<(String, LiteralFormat)>,
}

impl LiteralFormatTable {
    /// First entry for `predicate`.
    pub fn lookup(&self, predicate: &str) -> Option<&LiteralFormat> {
        self.entries
            .iter()
            .find(|(p, _)| p == predicate)
            .map(|(_, f)| f)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&str> for LiteralFormatTable {
    fn from(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (predicate, format) = entry.split_once(':').unwrap_or((entry, ""));
                (predicate.trim().to_string(), LiteralFormat::parse(format.trim()))
            })
            .collect();
        Self { entries }
    }
}

impl From<String> for LiteralFormatTable {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<LiteralFormatTable> for String {
    fn from(table: LiteralFormatTable) -> Self {
        table
            .entries
            .iter()
            .map(|(p, f)| format!("{p}:{}", f.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parsed `literals_keyword_to_substitute`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct KeywordSubstitutions {
    entries: Vec<(String, Vec<String>)>,
}

impl KeywordSubstitutions {
    /// The first configured keyword for `predicate` that occurs in `value`.
    pub fn find(&self, predicate: &str, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|(p, _)| p == predicate)
            .flat_map(|(_, keywords)| keywords.iter())
            .find(|kw| value.contains(kw.as_str()))
            .map(String::as_str)
    }
}

impl From<&str> for KeywordSubstitutions {
    fn from(raw: &str) -> Self {
        let entries = raw
            .split(';')
            .filter_map(|entry| {
                let (predicate, keywords) = entry.split_once(':')?;
                let keywords: Vec<String> = keywords
                    .split(',')
                    .map(str::trim)
                    .filter(|kw| !kw.is_empty())
                    .map(str::to_string)
                    .collect();
                Some((predicate.trim().to_string(), keywords))
            })
            .collect();
        Self { entries }
    }
}

impl From<String> for KeywordSubstitutions {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<KeywordSubstitutions> for String {
    fn from(subs: KeywordSubstitutions) -> Self {
        subs.entries
            .iter()
            .map(|(p, kws)| format!("{p}:{}", kws.join(",")))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// One entry of the style configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    pub shape: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cellborder: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    /// Style group this rule belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_information: Option<DisplayedInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_literals_format: Option<LiteralFormatTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literals_keyword_to_substitute: Option<KeywordSubstitutions>,
}

impl StyleRule {
    /// Built-in fallback used for untyped nodes, types without a rule and
    /// types whose style group is disabled.
    pub fn builtin_default() -> Self {
        Self {
            shape: "box".to_string(),
            color: "#FFFFFF".to_string(),
            style: Some("filled".to_string()),
            border: Some(0),
            cellborder: Some(0),
            value: Some(20),
            margin: Some(10),
            font: Some(Font {
                size: Some(24),
                face: None,
                bold: Some(BoldFont { size: Some(36) }),
            }),
            config_file: None,
            displayed_information: None,
            displayed_type_name: None,
            displayed_literals_format: None,
            literals_keyword_to_substitute: None,
        }
    }

    /// Field-wise overlay: every field set on `self` wins over `base`.
    pub fn overlay(&self, base: &StyleRule) -> StyleRule {
        StyleRule {
            shape: self.shape.clone(),
            color: self.color.clone(),
            style: self.style.clone().or_else(|| base.style.clone()),
            border: self.border.or(base.border),
            cellborder: self.cellborder.or(base.cellborder),
            value: self.value.or(base.value),
            margin: self.margin.or(base.margin),
            font: self.font.clone().or_else(|| base.font.clone()),
            config_file: self.config_file.clone().or_else(|| base.config_file.clone()),
            displayed_information: self.displayed_information.or(base.displayed_information),
            displayed_type_name: self
                .displayed_type_name
                .clone()
                .or_else(|| base.displayed_type_name.clone()),
            displayed_literals_format: self
                .displayed_literals_format
                .clone()
                .or_else(|| base.displayed_literals_format.clone()),
            literals_keyword_to_substitute: self
                .literals_keyword_to_substitute
                .clone()
                .or_else(|| base.literals_keyword_to_substitute.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    default: StyleRule,
    rules: BTreeMap<String, StyleRule>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            default: StyleRule::builtin_default(),
            rules: BTreeMap::new(),
        }
    }
}

impl StyleConfig {
    /// A `"default"` entry, if present, is overlaid onto the built-in default
    /// instead of being treated as a type.
    pub fn new(mut rules: BTreeMap<String, StyleRule>) -> Self {
        let builtin = StyleRule::builtin_default();
        let default = match rules.remove(DEFAULT_STYLE_KEY) {
            Some(rule) => rule.overlay(&builtin),
            None => builtin,
        };
        Self { default, rules }
    }

    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let rules = decode_table::<StyleRule>(text, format, "style")?;
        for (name, rule) in &rules {
            if rule.shape.trim().is_empty() || rule.color.trim().is_empty() {
                return Err(ConfigError::InvalidRule {
                    kind: "style",
                    name: name.clone(),
                    message: "`shape` and `color` must not be empty".to_string(),
                });
            }
        }
        tracing::debug!(rules = rules.len(), "loaded style configuration");
        Ok(Self::new(rules))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        Self::parse(&read_config(path)?, format)
    }

    pub fn default_rule(&self) -> &StyleRule {
        &self.default
    }

    pub fn rule(&self, type_name: &str) -> Option<&StyleRule> {
        self.rules.get(type_name)
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &StyleRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every style group named by some rule.
    pub fn groups(&self) -> BTreeSet<String> {
        self.rules
            .values()
            .filter_map(|r| r.config_file.clone())
            .collect()
    }
}

// ============================================================================
// Reduction rules
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNameList {
    Delimited(String),
    List(Vec<String>),
}

/// Comma-delimited list of local names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawNameList", into = "Vec<String>")]
pub struct NameList(Vec<String>);

impl NameList {
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<RawNameList> for NameList {
    fn from(raw: RawNameList) -> Self {
        let names = match raw {
            RawNameList::Delimited(s) => s.split(',').map(str::to_string).collect(),
            RawNameList::List(v) => v,
        };
        NameList(
            names
                .into_iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }
}

impl From<&str> for NameList {
    fn from(raw: &str) -> Self {
        NameList::from(RawNameList::Delimited(raw.to_string()))
    }
}

impl From<NameList> for Vec<String> {
    fn from(list: NameList) -> Self {
        list.0
    }
}

/// Reduction for one parent type: which predicates and far-node types get
/// folded into the parent's label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionRule {
    pub name: String,
    pub predicates_to_absorb: NameList,
    /// Empty means any far-node type is accepted.
    #[serde(default)]
    pub nodes_to_absorb: NameList,
}

impl ReductionRule {
    pub fn absorbs_predicate(&self, predicate_local_name: &str) -> bool {
        self.predicates_to_absorb.contains(predicate_local_name)
    }

    pub fn absorbs_type(&self, type_name: Option<&str>) -> bool {
        if self.nodes_to_absorb.is_empty() {
            return true;
        }
        type_name.is_some_and(|t| self.nodes_to_absorb.contains(t))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReductionConfig {
    rules: BTreeMap<String, ReductionRule>,
}

impl ReductionConfig {
    pub fn new(rules: BTreeMap<String, ReductionRule>) -> Self {
        Self { rules }
    }

    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let rules = decode_table::<ReductionRule>(text, format, "reduction")?;
        for (name, rule) in &rules {
            if rule.predicates_to_absorb.is_empty() {
                return Err(ConfigError::InvalidRule {
                    kind: "reduction",
                    name: name.clone(),
                    message: "`predicates_to_absorb` must name at least one predicate"
                        .to_string(),
                });
            }
        }
        tracing::debug!(rules = rules.len(), "loaded reduction configuration");
        Ok(Self::new(rules))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        Self::parse(&read_config(path)?, format)
    }

    /// Rule keyed by the parent node's type local name.
    pub fn rule(&self, parent_type: &str) -> Option<&ReductionRule> {
        self.rules.get(parent_type)
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &ReductionRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Decode a `name -> entry` map, reporting which entry failed.
fn decode_table<T: DeserializeOwned>(
    text: &str,
    format: ConfigFormat,
    kind: &'static str,
) -> Result<BTreeMap<String, T>, ConfigError> {
    let malformed = |message: String| ConfigError::Malformed { kind, message };
    let invalid = |name: &str, message: String| ConfigError::InvalidRule {
        kind,
        name: name.to_string(),
        message,
    };

    let mut out = BTreeMap::new();
    match format {
        ConfigFormat::Json => {
            let raw: BTreeMap<String, serde_json::Value> =
                serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
            for (name, value) in raw {
                let entry = serde_json::from_value(value).map_err(|e| invalid(&name, e.to_string()))?;
                out.insert(name, entry);
            }
        }
        ConfigFormat::Yaml => {
            let raw: BTreeMap<String, serde_yaml::Value> =
                serde_yaml::from_str(text).map_err(|e| malformed(e.to_string()))?;
            for (name, value) in raw {
                let entry = serde_yaml::from_value(value).map_err(|e| invalid(&name, e.to_string()))?;
                out.insert(name, entry);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_format_table_parses_delimited_entries() {
        let table = LiteralFormatTable::from("command:no, value:yes,odd:maybe,bare");
        assert_eq!(table.lookup("command"), Some(&LiteralFormat::No));
        assert_eq!(table.lookup("value"), Some(&LiteralFormat::Yes));
        assert_eq!(
            table.lookup("odd"),
            Some(&LiteralFormat::Other("maybe".to_string()))
        );
        assert_eq!(
            table.lookup("bare"),
            Some(&LiteralFormat::Other(String::new()))
        );
        assert_eq!(table.lookup("missing"), None);
    }

    #[test]
    fn keyword_substitutions_pick_first_contained_keyword() {
        let subs = KeywordSubstitutions::from("command:python,bash;value:csv;broken");
        assert_eq!(subs.find("command", "bash -c 'python x.py'"), Some("python"));
        assert_eq!(subs.find("value", "data.csv"), Some("csv"));
        assert_eq!(subs.find("command", "ls"), None);
        assert_eq!(subs.find("broken", "broken"), None);
    }

    #[test]
    fn style_config_requires_shape_and_color() {
        let err = StyleConfig::parse(r##"{"Action": {"shape": "box"}}"##, ConfigFormat::Json)
            .expect_err("missing color");
        assert!(matches!(err, ConfigError::InvalidRule { ref name, .. } if name == "Action"));

        let cfg = StyleConfig::parse(
            r##"{"Action": {"shape": "ellipse", "color": "#FF0000", "config_file": "renku"}}"##,
            ConfigFormat::Json,
        )
        .expect("parse");
        assert_eq!(cfg.rule("Action").map(|r| r.shape.as_str()), Some("ellipse"));
        assert_eq!(cfg.groups().into_iter().collect::<Vec<_>>(), vec!["renku"]);
    }

    #[test]
    fn default_entry_overrides_builtin_default() {
        let cfg = StyleConfig::parse(
            "default:\n  shape: ellipse\n  color: '#EEEEEE'\n",
            ConfigFormat::Yaml,
        )
        .expect("parse");
        assert_eq!(cfg.default_rule().shape, "ellipse");
        assert_eq!(cfg.default_rule().value, Some(20));
        assert!(cfg.rule(DEFAULT_STYLE_KEY).is_none());
    }

    #[test]
    fn reduction_config_accepts_strings_and_lists() {
        let yaml = r#"
Action:
  name: inputs
  predicates_to_absorb: "isUsing, hasInputs"
  nodes_to_absorb: [CommandInput]
Activity:
  name: any
  predicates_to_absorb: [generated]
"#;
        let cfg = ReductionConfig::parse(yaml, ConfigFormat::Yaml).expect("parse");
        let action = cfg.rule("Action").expect("Action rule");
        assert!(action.absorbs_predicate("hasInputs"));
        assert!(action.absorbs_type(Some("CommandInput")));
        assert!(!action.absorbs_type(Some("Other")));
        assert!(!action.absorbs_type(None));
        assert!(cfg.rule("Activity").expect("Activity").absorbs_type(None));
    }

    #[test]
    fn reduction_config_rejects_missing_or_empty_predicates() {
        let err = ReductionConfig::parse(r#"{"Action": {"name": "x"}}"#, ConfigFormat::Json)
            .expect_err("missing predicates");
        assert!(matches!(err, ConfigError::InvalidRule { .. }));
        let err = ReductionConfig::parse(
            r#"{"Action": {"name": "x", "predicates_to_absorb": ""}}"#,
            ConfigFormat::Json,
        )
        .expect_err("empty predicates");
        assert!(matches!(err, ConfigError::InvalidRule { .. }));
    }

    #[test]
    fn format_is_chosen_by_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/graph_config.JSON")).expect("json"),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("reductions.yml")).expect("yml"),
            ConfigFormat::Yaml
        );
        assert!(ConfigFormat::from_path(Path::new("styles.toml")).is_err());
    }
}
