//! CONSTRUCT-style graph pattern queries over a [`TripleStore`].
//!
//! The algebra is intentionally small; it covers exactly what the explorer
//! needs from SPARQL:
//!
//! - a `WHERE` clause that is a union of groups, each group a conjunction of
//!   triple patterns plus filters;
//! - fixed-length property paths (`p1/p2`);
//! - `isLiteral`, `!STRSTARTS(STR(?v), ns)` and `?v NOT IN (...)` filters;
//! - a template instantiated once per solution.
//!
//! Results are de-duplicated (CONSTRUCT returns a graph) but keep the order
//! in which solutions were found, one solution at a time, template order within
//! a solution. Consumers rely on that order: a node's type triple is emitted
//! before its literal triples.

use crate::{Term, Triple, TripleStore};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub type Solution = BTreeMap<String, Term>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("filter on `?{var}` in union branch {branch} refers to a variable the branch never binds")]
    UnboundFilterVariable { branch: usize, var: String },
    #[error("empty property path in union branch {branch}")]
    EmptyPath { branch: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    Var(String),
    Const(Term),
}

impl PatternTerm {
    pub fn var(name: impl Into<String>) -> Self {
        PatternTerm::Var(name.into())
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        PatternTerm::Const(Term::iri(iri))
    }

    fn var_name(&self) -> Option<&str> {
        match self {
            PatternTerm::Var(name) => Some(name),
            PatternTerm::Const(_) => None,
        }
    }

    fn resolve<'a>(&'a self, solution: &'a Solution) -> Option<&'a Term> {
        match self {
            PatternTerm::Var(name) => solution.get(name),
            PatternTerm::Const(term) => Some(term),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    Predicate(PatternTerm),
    /// `p1/p2/.../pn` over predicate IRIs.
    Sequence(Vec<String>),
}

impl PathExpr {
    pub fn iri(iri: impl Into<String>) -> Self {
        PathExpr::Predicate(PatternTerm::iri(iri))
    }

    pub fn var(name: impl Into<String>) -> Self {
        PathExpr::Predicate(PatternTerm::var(name))
    }

    pub fn seq<I, S>(iris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathExpr::Sequence(iris.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub path: PathExpr,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, path: PathExpr, object: PatternTerm) -> Self {
        Self {
            subject,
            path,
            object,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    IsLiteral(String),
    NotStartsWith { var: String, prefix: String },
    NotOneOf { var: String, values: Vec<String> },
}

impl Filter {
    pub fn var(&self) -> &str {
        match self {
            Filter::IsLiteral(var) => var,
            Filter::NotStartsWith { var, .. } => var,
            Filter::NotOneOf { var, .. } => var,
        }
    }

    /// An unbound variable makes the filter expression an error, which
    /// eliminates the solution.
    fn accepts(&self, solution: &Solution) -> bool {
        let Some(term) = solution.get(self.var()) else {
            return false;
        };
        match self {
            Filter::IsLiteral(_) => term.is_literal(),
            Filter::NotStartsWith { prefix, .. } => !term.value().starts_with(prefix.as_str()),
            Filter::NotOneOf { values, .. } => !values.iter().any(|v| v == term.value()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPattern {
    pub patterns: Vec<TriplePattern>,
    pub filters: Vec<Filter>,
}

impl GroupPattern {
    pub fn new(patterns: Vec<TriplePattern>) -> Self {
        Self {
            patterns,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Variables bound by the group's triple patterns.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut vars = BTreeSet::new();
        for pattern in &self.patterns {
            vars.extend(pattern.subject.var_name());
            vars.extend(pattern.object.var_name());
            if let PathExpr::Predicate(p) = &pattern.path {
                vars.extend(p.var_name());
            }
        }
        vars
    }

    fn solutions(&self, store: &TripleStore) -> Vec<Solution> {
        let mut solutions = vec![Solution::new()];
        for pattern in &self.patterns {
            solutions = solutions
                .iter()
                .flat_map(|solution| extend(store, pattern, solution))
                .collect();
            if solutions.is_empty() {
                break;
            }
        }
        solutions.retain(|solution| self.filters.iter().all(|f| f.accepts(solution)));
        solutions
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTriple {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TemplateTriple {
    pub fn new(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Ill-formed instantiations (unbound variable, literal subject,
    /// non-IRI predicate) produce no triple.
    fn instantiate(&self, solution: &Solution) -> Option<Triple> {
        let subject = self.subject.resolve(solution)?;
        if subject.is_literal() {
            return None;
        }
        let predicate = self.predicate.resolve(solution)?.as_iri()?;
        let object = self.object.resolve(solution)?;
        Some(Triple::new(subject.clone(), predicate, object.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructQuery {
    pub template: Vec<TemplateTriple>,
    /// `WHERE { g0 } UNION { g1 } ...`
    pub union: Vec<GroupPattern>,
}

impl ConstructQuery {
    pub fn validate(&self) -> Result<(), QueryError> {
        for (branch, group) in self.union.iter().enumerate() {
            for pattern in &group.patterns {
                if matches!(&pattern.path, PathExpr::Sequence(steps) if steps.is_empty()) {
                    return Err(QueryError::EmptyPath { branch });
                }
            }
            let vars = group.variables();
            for filter in &group.filters {
                if !vars.contains(filter.var()) {
                    return Err(QueryError::UnboundFilterVariable {
                        branch,
                        var: filter.var().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Solutions of the `WHERE` clause, branch by branch.
    pub fn solutions(&self, store: &TripleStore) -> Result<Vec<Solution>, QueryError> {
        self.validate()?;
        Ok(self
            .union
            .iter()
            .flat_map(|group| group.solutions(store))
            .collect())
    }

    pub fn evaluate(&self, store: &TripleStore) -> Result<Vec<Triple>, QueryError> {
        let solutions = self.solutions(store)?;
        let mut seen: HashSet<Triple> = HashSet::new();
        let mut out = Vec::new();
        for solution in &solutions {
            for template in &self.template {
                let Some(triple) = template.instantiate(solution) else {
                    continue;
                };
                if seen.insert(triple.clone()) {
                    out.push(triple);
                }
            }
        }
        Ok(out)
    }
}

fn bind(solution: &mut Solution, pattern: &PatternTerm, value: &Term) -> bool {
    match pattern {
        PatternTerm::Const(term) => term == value,
        PatternTerm::Var(name) => match solution.get(name) {
            Some(existing) => existing == value,
            None => {
                solution.insert(name.clone(), value.clone());
                true
            }
        },
    }
}

fn extend(store: &TripleStore, pattern: &TriplePattern, solution: &Solution) -> Vec<Solution> {
    let subject = pattern.subject.resolve(solution);
    let object = pattern.object.resolve(solution);
    let mut out = Vec::new();

    match &pattern.path {
        PathExpr::Predicate(predicate) => {
            let bound_predicate = match predicate.resolve(solution) {
                Some(term) => match term.as_iri() {
                    Some(iri) => Some(iri),
                    None => return out,
                },
                None => None,
            };
            for t in store.matching(subject, bound_predicate, object) {
                let mut next = solution.clone();
                if bind(&mut next, &pattern.subject, &t.subject)
                    && bind(&mut next, predicate, &Term::iri(t.predicate.as_str()))
                    && bind(&mut next, &pattern.object, &t.object)
                {
                    out.push(next);
                }
            }
        }
        PathExpr::Sequence(steps) => {
            for (start, end) in follow_sequence(store, steps, subject, object) {
                let mut next = solution.clone();
                if bind(&mut next, &pattern.subject, &start)
                    && bind(&mut next, &pattern.object, &end)
                {
                    out.push(next);
                }
            }
        }
    }
    out
}

fn follow_sequence(
    store: &TripleStore,
    steps: &[String],
    start: Option<&Term>,
    end: Option<&Term>,
) -> Vec<(Term, Term)> {
    let Some((first, rest)) = steps.split_first() else {
        return Vec::new();
    };
    let mut frontier: Vec<(Term, Term)> = store
        .matching(start, Some(first), None)
        .into_iter()
        .map(|t| (t.subject.clone(), t.object.clone()))
        .collect();

    for step in rest {
        let mut next = Vec::new();
        for (origin, current) in &frontier {
            if current.is_literal() {
                continue;
            }
            for t in store.matching(Some(current), Some(step), None) {
                next.push((origin.clone(), t.object.clone()));
            }
        }
        frontier = next;
    }

    let mut seen = HashSet::new();
    frontier.retain(|(origin, target)| {
        end.map_or(true, |e| target == e) && seen.insert((origin.clone(), target.clone()))
    });
    frontier
}
