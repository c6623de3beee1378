//! Keyword leg: sanitize the query, run the ranked full-text primitive, and map
//! raw ranks to `(0, 1]` scores.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::documents::{Document, DocumentType};
use crate::search::types::ScoredCandidate;

/// Characters with meaning in the FTS5 query grammar.
const FTS_SPECIAL_CHARS: &[char] = &[
    '?', '*', '+', '-', '(', ')', '^', '~', '"', '\'', ':', '{', '}', '[', ']', '.', ',', ';',
    '!', '&', '|', '\\', '/', '<', '>', '=', '@', '#', '$', '%',
];

/// What the lexical leg needs from the document store.
///
/// Implementations are synchronous; [`LexicalSearcher`] runs them on the
/// blocking pool.
pub trait DocumentIndex: Send + Sync {
    /// Ranked keyword search returning `(id, rank)`, best first. Ranks are
    /// negative and closer to zero is better.
    fn ranked_search(
        &self,
        query: &str,
        type_filter: Option<DocumentType>,
        limit: usize,
    ) -> Result<Vec<(String, f64)>>;

    /// Side-channel lookup of document payloads by id.
    fn fetch_documents(&self, ids: &[&str]) -> Result<HashMap<String, Document>>;
}

/// Strip query-grammar characters, collapse whitespace, trim, then quote each
/// remaining word so bare `AND`/`OR`/`NOT`/`NEAR` match as terms. Empty when
/// nothing searchable is left.
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .map(|c| if FTS_SPECIAL_CHARS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(|word| format!("\"{word}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `exp(-decay * |rank|)`: 1.0 for a perfect match, decaying toward 0.
pub fn normalize_rank(rank: f64, decay: f64) -> f64 {
    (-decay * rank.abs()).exp()
}

/// The lexical leg.
#[derive(Clone)]
pub struct LexicalSearcher {
    index: Arc<dyn DocumentIndex>,
    decay: f64,
}

impl LexicalSearcher {
    pub fn new(index: Arc<dyn DocumentIndex>, decay: f64) -> Self {
        Self { index, decay }
    }

    pub fn index(&self) -> &Arc<dyn DocumentIndex> {
        &self.index
    }

    pub async fn search(
        &self,
        query: &str,
        type_filter: Option<DocumentType>,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        let sanitized = sanitize_query(query);
        let effective = if sanitized.is_empty() {
            tracing::warn!(query = %query, "query is empty after sanitization, using it unsanitized");
            query.to_string()
        } else {
            sanitized
        };

        let index = Arc::clone(&self.index);
        let ranked = tokio::task::spawn_blocking(move || {
            index.ranked_search(&effective, type_filter, limit)
        })
        .await
        .map_err(|e| anyhow::anyhow!("lexical search task failed: {e}"))??;

        Ok(ranked
            .into_iter()
            .map(|(id, rank)| ScoredCandidate::lexical(id, rank, normalize_rank(rank, self.decay)))
            .collect())
    }
}
