//! Keyword relevance scoring shared by every document-backed lookup.
//!
//! A query is split into distinct lowercase word terms. Each term found in
//! a document's title is worth 5, plus one per occurrence in the body.

use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Bonus for a term that appears in the document title.
pub const TITLE_MATCH_WEIGHT: u32 = 5;

/// A titled markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub body: String,
}

impl Document {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("WORD_RE is a compile-time constant"));

static UNSAFE_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s-]").expect("UNSAFE_TITLE_RE is a compile-time constant")
});

/// Distinct lowercase word terms (`\w+` runs) of `text`.
pub fn query_terms(text: &str) -> BTreeSet<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Relevance of one document for the given terms. Zero means irrelevant.
pub fn score_document(terms: &BTreeSet<String>, doc: &Document) -> u32 {
    let title = doc.title.to_lowercase();
    let body = doc.body.to_lowercase();

    terms
        .iter()
        .map(|term| {
            let title_bonus = if title.contains(term.as_str()) { TITLE_MATCH_WEIGHT } else { 0 };
            title_bonus + body.matches(term.as_str()).count() as u32
        })
        .sum()
}

/// Score, filter and order documents, best first, keeping at most `limit`.
///
/// Equal scores are ordered by title so results are reproducible.
pub fn rank<'a, I>(docs: I, query: &str, limit: usize) -> Vec<(&'a Document, u32)>
where
    I: IntoIterator<Item = &'a Document>,
{
    let terms = query_terms(query);
    if terms.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(&Document, u32)> = docs
        .into_iter()
        .map(|d| (d, score_document(&terms, d)))
        .filter(|(_, score)| *score > 0)
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.title.cmp(&b.0.title)));
    scored.truncate(limit);
    scored
}

/// Turn a document title into a safe file stem: characters other than word
/// characters, whitespace and `-` are removed, then spaces become `_`.
pub fn sanitize_title(title: &str) -> String {
    UNSAFE_TITLE_RE.replace_all(title, "").trim().replace(' ', "_")
}
