//! Vector leg: text and embedding queries against the subprocess collection,
//! with distances mapped to similarity scores.

use serde_json::{json, Value};
use std::collections::HashMap;

use crate::documents::{Document, DocumentType};
use crate::error::VectorError;
use crate::search::types::ScoredCandidate;
use crate::vector::collection::QueryMatch;
use crate::vector::Collection;

/// `1 - distance`. Distances are expected in `[0, 1]`; anything outside is
/// clamped so scores stay in `[0, 1]`.
pub fn normalize_distance(distance: f64) -> f64 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Candidates from the vector leg plus the payloads the index returned, used
/// when the document store has no row for a hit.
#[derive(Debug, Default)]
pub struct SemanticResults {
    pub candidates: Vec<ScoredCandidate>,
    pub documents: HashMap<String, Document>,
}

impl SemanticResults {
    fn from_matches(matches: Vec<QueryMatch>) -> Self {
        let mut results = SemanticResults::default();
        for m in matches {
            results.candidates.push(ScoredCandidate::semantic(
                m.id.clone(),
                m.distance,
                normalize_distance(m.distance),
            ));
            results.documents.insert(m.id.clone(), m.to_document());
        }
        results
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The semantic leg.
#[derive(Clone)]
pub struct SemanticSearcher {
    collection: Collection,
}

impl SemanticSearcher {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub async fn search(
        &self,
        query: &str,
        type_filter: Option<DocumentType>,
        limit: usize,
    ) -> Result<SemanticResults, VectorError> {
        let where_filter = type_filter.map(|t| json!({ "type": t.as_str() }));
        let matches = self
            .collection
            .query_by_text(query, limit, where_filter)
            .await?;
        Ok(SemanticResults::from_matches(matches))
    }

    /// Documents most similar to `doc_id`, never including `doc_id` itself.
    pub async fn nearest_neighbors(
        &self,
        doc_id: &str,
        n: usize,
    ) -> Result<SemanticResults, VectorError> {
        let embedding = self
            .collection
            .get_embedding(doc_id)
            .await?
            .ok_or_else(|| VectorError::NotFound(doc_id.to_string()))?;

        let mut matches = self.collection.query_by_embedding(&embedding, n + 1).await?;
        // Filter by id; the backend may return the source anywhere, or twice
        matches.retain(|m| m.id != doc_id);
        matches.truncate(n);
        Ok(SemanticResults::from_matches(matches))
    }

    /// Advisory document count; 0 when the backend cannot answer.
    pub async fn collection_count(&self) -> u64 {
        match self.collection.count().await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(error = %err, "collection count unavailable");
                0
            }
        }
    }

    /// Advisory collection info; an empty object when the backend cannot answer.
    pub async fn collection_info(&self) -> Value {
        match self.collection.info().await {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(error = %err, "collection info unavailable");
                json!({})
            }
        }
    }
}
