//! RDF triple store for the Quickview provenance explorer.
//!
//! This crate owns everything the explorer knows about the dataset:
//!
//! - It ingests a Turtle document once (untrusted input; bad statements are
//!   logged and skipped, see [`turtle`]).
//! - It keeps the statements in an append-only, indexed [`TripleStore`].
//! - It evaluates small CONSTRUCT-style graph-pattern queries ([`query`]) and
//!   provides the two fixed query shapes the explorer issues ([`queries`]).
//!
//! There is no persistence: a store lives for one exploration session.

pub mod queries;
pub mod query;
pub mod turtle;
pub mod vocab;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub use query::{
    ConstructQuery, Filter, GroupPattern, PathExpr, PatternTerm, QueryError, Solution,
    TemplateTriple, TriplePattern,
};
pub use turtle::{IngestReport, SkippedStatement};

// ============================================================================
// RDF term model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn simple(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Iri { value: String },
    BlankNode { id: String },
    Literal(Literal),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri {
            value: value.into(),
        }
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::BlankNode { id: id.into() }
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(lexical))
    }

    /// The string form used for node identifiers and `STR()`-style filters.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri { value } => value,
            Term::BlankNode { id } => id,
            Term::Literal(lit) => &lit.lexical,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri { value } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("literal cannot be used as a subject: {0}")]
    LiteralSubject(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Store
// ============================================================================

/// Append-only set of triples with subject/predicate/object indexes.
#[derive(Debug, Default, Clone)]
pub struct TripleStore {
    triples: Vec<Triple>,
    seen: HashSet<Triple>,
    by_subject: HashMap<Term, Vec<usize>>,
    by_predicate: HashMap<String, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
    prefixes: BTreeMap<String, String>,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Turtle document into a fresh store.
    pub fn from_turtle(text: &str) -> (Self, IngestReport) {
        let mut store = Self::new();
        let report = turtle::load_turtle(&mut store, text);
        (store, report)
    }

    pub fn from_turtle_file(path: &std::path::Path) -> Result<(Self, IngestReport), StoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_turtle(&text))
    }

    /// Insert a triple. Returns `false` if it was already present.
    pub fn insert(&mut self, triple: Triple) -> Result<bool, StoreError> {
        if triple.subject.is_literal() {
            return Err(StoreError::LiteralSubject(triple.subject.value().to_string()));
        }
        if self.seen.contains(&triple) {
            return Ok(false);
        }
        let index = self.triples.len();
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(index);
        self.by_predicate
            .entry(triple.predicate.clone())
            .or_default()
            .push(index);
        self.by_object
            .entry(triple.object.clone())
            .or_default()
            .push(index);
        self.seen.insert(triple.clone());
        self.triples.push(triple);
        Ok(true)
    }

    pub fn add_prefix(&mut self, name: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(name.into(), namespace.into());
    }

    /// Prefix table recovered while parsing (`prefix name -> namespace IRI`).
    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// All triples matching the given (optional) positions, in insertion order.
    pub fn matching<'a>(
        &'a self,
        subject: Option<&Term>,
        predicate: Option<&str>,
        object: Option<&Term>,
    ) -> Vec<&'a Triple> {
        let mut candidates: Option<&Vec<usize>> = None;
        let mut consider = |list: Option<&'a Vec<usize>>| -> bool {
            let Some(list) = list else {
                return false;
            };
            if candidates.map_or(true, |c| list.len() < c.len()) {
                candidates = Some(list);
            }
            true
        };

        if let Some(s) = subject {
            if !consider(self.by_subject.get(s)) {
                return Vec::new();
            }
        }
        if let Some(p) = predicate {
            if !consider(self.by_predicate.get(p)) {
                return Vec::new();
            }
        }
        if let Some(o) = object {
            if !consider(self.by_object.get(o)) {
                return Vec::new();
            }
        }

        let keep = |t: &Triple| {
            subject.map_or(true, |s| &t.subject == s)
                && predicate.map_or(true, |p| t.predicate == p)
                && object.map_or(true, |o| &t.object == o)
        };

        match candidates {
            Some(indexes) => indexes
                .iter()
                .map(|&i| &self.triples[i])
                .filter(|t| keep(*t))
                .collect(),
            None => self.triples.iter().collect(),
        }
    }

    /// IRI of the first type statement recorded for `subject`, using the same
    /// predicate test as [`vocab::is_type_predicate`].
    pub fn first_type_of(&self, subject: &Term) -> Option<&str> {
        self.matching(Some(subject), None, None)
            .into_iter()
            .filter(|t| vocab::is_type_predicate(&t.predicate))
            .find_map(|t| t.object.as_iri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    #[test]
    fn insert_ignores_duplicates_and_literal_subjects() {
        let mut store = TripleStore::new();
        let t = Triple::new(ex("a"), "http://example.org/knows", ex("b"));
        assert!(store.insert(t.clone()).expect("insert"));
        assert!(!store.insert(t).expect("insert dup"));
        assert_eq!(store.len(), 1);

        let bad = Triple::new(Term::literal("x"), "http://example.org/p", ex("b"));
        assert!(matches!(
            store.insert(bad),
            Err(StoreError::LiteralSubject(_))
        ));
    }

    #[test]
    fn matching_uses_all_bound_positions() {
        let mut store = TripleStore::new();
        store
            .insert(Triple::new(ex("a"), "http://example.org/p", ex("b")))
            .expect("insert");
        store
            .insert(Triple::new(ex("a"), "http://example.org/q", ex("c")))
            .expect("insert");
        store
            .insert(Triple::new(ex("d"), "http://example.org/p", ex("b")))
            .expect("insert");

        assert_eq!(store.matching(Some(&ex("a")), None, None).len(), 2);
        assert_eq!(
            store
                .matching(None, Some("http://example.org/p"), Some(&ex("b")))
                .len(),
            2
        );
        assert_eq!(
            store
                .matching(Some(&ex("a")), Some("http://example.org/p"), None)
                .len(),
            1
        );
        assert!(store.matching(Some(&ex("zzz")), None, None).is_empty());
        assert_eq!(store.matching(None, None, None).len(), 3);
    }

    #[test]
    fn first_type_wins_in_insertion_order() {
        let mut store = TripleStore::new();
        store
            .insert(Triple::new(ex("a"), vocab::RDF_TYPE, ex("A")))
            .expect("insert");
        store
            .insert(Triple::new(ex("a"), vocab::RDF_TYPE, ex("B")))
            .expect("insert");
        assert_eq!(store.first_type_of(&ex("a")), Some("http://example.org/A"));
        assert_eq!(store.first_type_of(&ex("b")), None);
    }

    #[test]
    fn first_type_accepts_any_type_predicate() {
        let mut store = TripleStore::new();
        store
            .insert(Triple::new(ex("a"), "http://example.org/ns#label", Term::literal("a")))
            .expect("insert");
        store
            .insert(Triple::new(ex("a"), "http://example.org/ns#type", ex("Custom")))
            .expect("insert");
        store
            .insert(Triple::new(ex("a"), vocab::RDF_TYPE, ex("A")))
            .expect("insert");
        assert_eq!(store.first_type_of(&ex("a")), Some("http://example.org/Custom"));
    }
}
