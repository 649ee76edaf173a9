//! Turtle ingestion with per-statement recovery.
//!
//! `rio_turtle` stops at the first syntax error. A provenance export with one
//! malformed statement should still be explorable, so ingestion works in two
//! passes:
//!
//! 1. Parse the whole document. This is the common case and keeps blank-node
//!    labels consistent across the document.
//! 2. If that fails, split the document into top-level statements and parse
//!    each one on its own (prefixed by the directives seen so far). Statements
//!    that still fail are logged and reported, the rest are kept.

use crate::{Literal, Term, Triple, TripleStore};
use rio_api::model::{Literal as RioLiteral, Subject, Term as RioTerm, Triple as RioTriple};
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleError, TurtleParser};

const EXCERPT_CHARS: usize = 120;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Number of triples added to the store.
    pub triples: usize,
    pub skipped: Vec<SkippedStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStatement {
    /// Zero-based position among the document's statements (directives excluded).
    pub index: usize,
    pub excerpt: String,
    pub message: String,
}

pub fn load_turtle(store: &mut TripleStore, text: &str) -> IngestReport {
    let chunks = split_statements(text);
    for chunk in &chunks {
        if let Chunk::Directive {
            prefix: Some((name, namespace)),
            ..
        } = chunk
        {
            store.add_prefix(name.clone(), namespace.clone());
        }
    }

    let mut report = IngestReport::default();
    match parse_document(text) {
        Ok(triples) => insert_all(store, triples, &mut report),
        Err(err) => {
            tracing::debug!(error = %err, "document parse failed; recovering per statement");
            let mut header = String::new();
            let mut index = 0usize;
            for chunk in chunks {
                match chunk {
                    Chunk::Directive { text, .. } => {
                        header.push_str(text);
                        header.push('\n');
                    }
                    Chunk::Statement { text } => {
                        let document = format!("{header}{text}\n");
                        match parse_document(&document) {
                            Ok(triples) => insert_all(store, triples, &mut report),
                            Err(err) => {
                                let excerpt = excerpt(text);
                                tracing::warn!(
                                    statement = index,
                                    excerpt = %excerpt,
                                    error = %err,
                                    "skipping malformed Turtle statement"
                                );
                                report.skipped.push(SkippedStatement {
                                    index,
                                    excerpt,
                                    message: err.to_string(),
                                });
                            }
                        }
                        index += 1;
                    }
                }
            }
        }
    }
    report
}

fn insert_all(store: &mut TripleStore, triples: Vec<Triple>, report: &mut IngestReport) {
    for triple in triples {
        match store.insert(triple) {
            Ok(true) => report.triples += 1,
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "dropping ill-formed triple"),
        }
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    out.push('…');
    out
}

fn parse_document(text: &str) -> Result<Vec<Triple>, TurtleError> {
    let mut out = Vec::new();
    let mut parser = TurtleParser::new(text.as_bytes(), None);
    parser.parse_all(&mut |t: RioTriple<'_>| -> Result<(), TurtleError> {
        if let Some(triple) = convert_triple(&t) {
            out.push(triple);
        }
        Ok(())
    })?;
    Ok(out)
}

fn convert_triple(t: &RioTriple<'_>) -> Option<Triple> {
    let subject = match t.subject {
        Subject::NamedNode(n) => Term::iri(n.iri),
        Subject::BlankNode(b) => Term::blank(b.id),
        // Quoted (RDF-star) triples have no place in the visual graph.
        _ => return None,
    };
    let object = match t.object {
        RioTerm::NamedNode(n) => Term::iri(n.iri),
        RioTerm::BlankNode(b) => Term::blank(b.id),
        RioTerm::Literal(RioLiteral::Simple { value }) => Term::literal(value),
        RioTerm::Literal(RioLiteral::LanguageTaggedString { value, language }) => {
            Term::Literal(Literal {
                lexical: value.to_string(),
                datatype: None,
                language: Some(language.to_string()),
            })
        }
        RioTerm::Literal(RioLiteral::Typed { value, datatype }) => Term::Literal(Literal {
            lexical: value.to_string(),
            datatype: Some(datatype.iri.to_string()),
            language: None,
        }),
        _ => return None,
    };
    Some(Triple::new(subject, t.predicate.iri, object))
}

// ============================================================================
// Statement splitting
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk<'a> {
    Directive {
        text: &'a str,
        prefix: Option<(String, String)>,
    },
    Statement {
        text: &'a str,
    },
}

fn split_statements(text: &str) -> Vec<Chunk<'_>> {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut depth = 0i32;
    let mut has_content = false;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b'#' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if !has_content {
            has_content = true;
            // SPARQL-style directives carry no terminating dot.
            if starts_with_keyword(&bytes[i..], b"PREFIX") || starts_with_keyword(&bytes[i..], b"BASE")
            {
                let end = match bytes[i..].iter().position(|&c| c == b'>') {
                    Some(offset) => i + offset + 1,
                    None => bytes.len(),
                };
                chunks.push(classify(&text[start..end]));
                start = end;
                has_content = false;
                i = end;
                continue;
            }
        }

        match b {
            b'<' => {
                while i < bytes.len() && bytes[i] != b'>' {
                    i += 1;
                }
            }
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth -= 1,
            b'.' if depth <= 0 && is_terminator(bytes, i) => {
                chunks.push(classify(&text[start..=i]));
                start = i + 1;
                depth = 0;
                has_content = false;
            }
            _ => {}
        }
        i += 1;
    }

    if has_content {
        chunks.push(classify(&text[start..]));
    }
    chunks
}

fn starts_with_keyword(bytes: &[u8], keyword: &[u8]) -> bool {
    bytes.len() > keyword.len()
        && bytes[..keyword.len()].eq_ignore_ascii_case(keyword)
        && bytes[keyword.len()].is_ascii_whitespace()
}

fn is_terminator(bytes: &[u8], i: usize) -> bool {
    match bytes.get(i + 1) {
        None => true,
        Some(next) => next.is_ascii_whitespace() || *next == b'#',
    }
}

/// Returns the index just past the closing quote of the string starting at `i`.
fn skip_string(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i];
    let long = bytes.len() >= i + 3 && bytes[i + 1] == quote && bytes[i + 2] == quote;
    let mut j = if long { i + 3 } else { i + 1 };
    while j < bytes.len() {
        let c = bytes[j];
        if c == b'\\' {
            j += 2;
            continue;
        }
        if c == quote {
            if !long {
                return j + 1;
            }
            if bytes.len() >= j + 3 && bytes[j + 1] == quote && bytes[j + 2] == quote {
                return j + 3;
            }
        } else if c == b'\n' && !long {
            // Unterminated short string: rescan the line as plain text so the
            // statement still ends at its dot and the parser reports it.
            return i + 1;
        }
        j += 1;
    }
    bytes.len()
}

fn classify(text: &str) -> Chunk<'_> {
    let body = strip_leading_trivia(text);
    if body.starts_with('@')
        || starts_with_keyword(body.as_bytes(), b"PREFIX")
        || starts_with_keyword(body.as_bytes(), b"BASE")
    {
        return Chunk::Directive {
            text,
            prefix: parse_prefix_directive(body),
        };
    }
    Chunk::Statement { text }
}

fn strip_leading_trivia(text: &str) -> &str {
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if rest.starts_with('#') {
            rest = rest.split_once('\n').map_or("", |(_, tail)| tail);
        } else {
            return rest;
        }
    }
}

fn parse_prefix_directive(body: &str) -> Option<(String, String)> {
    let rest = if let Some(rest) = body.strip_prefix("@prefix") {
        rest
    } else if starts_with_keyword(body.as_bytes(), b"PREFIX") {
        &body["PREFIX".len()..]
    } else {
        return None;
    };
    let (name, rest) = rest.trim_start().split_once(':')?;
    let (namespace, _) = rest.trim_start().strip_prefix('<')?.split_once('>')?;
    Some((name.trim().to_string(), namespace.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab;

    const PROV_DOC: &str = r#"
@prefix schema: <http://schema.org/> .
@prefix prov: <http://www.w3.org/ns/prov#> .
@prefix ex: <http://example.org/> .

# a plan
ex:action1 a schema:Action ;
    ex:label "run; then stop." .

ex:activity1 a prov:Activity ;
    prov:startedAtTime "2022-03-01T10:00:00"^^<http://www.w3.org/2001/XMLSchema#dateTime> .
"#;

    #[test]
    fn parses_document_and_records_prefixes() {
        let (store, report) = TripleStore::from_turtle(PROV_DOC);
        assert!(report.skipped.is_empty());
        assert_eq!(report.triples, 4);
        assert_eq!(store.namespace("prov"), Some("http://www.w3.org/ns/prov#"));
        assert_eq!(store.namespace("ex"), Some("http://example.org/"));
        assert_eq!(
            store.first_type_of(&Term::iri("http://example.org/action1")),
            Some("http://schema.org/Action")
        );

        let time = store
            .matching(None, Some(vocab::PROV_STARTED_AT_TIME), None)
            .into_iter()
            .next()
            .expect("time literal");
        match &time.object {
            Term::Literal(lit) => {
                assert_eq!(lit.lexical, "2022-03-01T10:00:00");
                assert_eq!(
                    lit.datatype.as_deref(),
                    Some("http://www.w3.org/2001/XMLSchema#dateTime")
                );
            }
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn malformed_statement_is_skipped_and_rest_is_kept() {
        let doc = r#"
PREFIX ex: <http://example.org/>
ex:a ex:knows ex:b .
ex:broken ex:knows "unterminated .
ex:c ex:knows ex:d .
ex:e ex:knows ex:f ex:g .
ex:h ex:label """multi
line . still inside""" .
"#;
        let (store, report) = TripleStore::from_turtle(doc);
        assert_eq!(store.namespace("ex"), Some("http://example.org/"));
        assert!(!report.skipped.is_empty());
        assert!(report
            .skipped
            .iter()
            .any(|s| s.excerpt.starts_with("ex:e")));

        let ex = |l: &str| Term::iri(format!("http://example.org/{l}"));
        assert_eq!(store.matching(Some(&ex("a")), None, None).len(), 1);
        assert_eq!(store.matching(Some(&ex("c")), None, None).len(), 1);
        assert_eq!(store.matching(Some(&ex("h")), None, None).len(), 1);
        assert!(store.matching(Some(&ex("e")), None, None).is_empty());
    }

    #[test]
    fn splitter_respects_iris_strings_and_decimals() {
        let doc = "@prefix ex: <http://example.org/a.b#> .\nex:x ex:v 1.5 ; ex:s \"a. b\" .\n# trailing comment .\n";
        let chunks = split_statements(doc);
        assert_eq!(chunks.len(), 2);
        assert!(matches!(
            &chunks[0],
            Chunk::Directive { prefix: Some((name, ns)), .. }
                if name == "ex" && ns == "http://example.org/a.b#"
        ));
        assert!(matches!(&chunks[1], Chunk::Statement { text } if text.ends_with("\"a. b\" .")));
    }
}
