//! Search orchestration: fan out the legs, tolerate a failing semantic leg,
//! fuse, paginate, hydrate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::documents::{Document, DocumentType};
use crate::error::{SearchError, VectorError};
use crate::search::fusion::{fuse, paginate, FusionWeights};
use crate::search::lexical::{DocumentIndex, LexicalSearcher};
use crate::search::semantic::{SemanticResults, SemanticSearcher};
use crate::search::types::{
    ProvenanceLabel, ScoredCandidate, SearchHit, SearchMetadata, SearchMode, SearchRequest,
    SearchResponse, SourceBreakdown,
};

/// What the semantic leg produced. It never fails the request.
struct SemanticOutcome {
    results: SemanticResults,
    warning: Option<String>,
}

impl SemanticOutcome {
    fn degraded(warning: String) -> Self {
        Self {
            results: SemanticResults::default(),
            warning: Some(warning),
        }
    }
}

/// The retrieval engine. Built once per process and shared by `Arc` with
/// every surface (MCP tools, HTTP handlers, CLI).
pub struct SearchEngine {
    lexical: LexicalSearcher,
    semantic: Option<SemanticSearcher>,
    config: RetrievalConfig,
}

impl SearchEngine {
    /// `semantic: None` runs keyword-only; hybrid requests then carry a warning.
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        semantic: Option<SemanticSearcher>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            lexical: LexicalSearcher::new(index, config.lexical_decay),
            semantic,
            config,
        }
    }

    pub fn semantic(&self) -> Option<&SemanticSearcher> {
        self.semantic.as_ref()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        self.validate(&request.query, request.limit, request.offset)?;
        let started = Instant::now();
        let type_filter = request.type_filter.as_type();
        let wanted = request.offset + request.limit;

        tracing::info!(
            query = %request.query,
            mode = %request.mode,
            limit = request.limit,
            offset = request.offset,
            "search"
        );

        let (lexical, semantic) = match request.mode {
            SearchMode::Hybrid => {
                let candidates = wanted * 2;
                tokio::join!(
                    self.lexical_leg(&request.query, type_filter, candidates),
                    self.semantic_leg(&request.query, type_filter, candidates),
                )
            }
            SearchMode::LexicalOnly => (
                self.lexical_leg(&request.query, type_filter, wanted).await,
                SemanticOutcome {
                    results: SemanticResults::default(),
                    warning: None,
                },
            ),
            SearchMode::SemanticOnly => (
                Ok(Vec::new()),
                self.semantic_leg(&request.query, type_filter, wanted).await,
            ),
        };
        let lexical = lexical?;

        let lexical_matches = lexical.len();
        let semantic_matches = semantic.results.len();
        let SemanticOutcome {
            results: SemanticResults {
                candidates: semantic_candidates,
                documents: semantic_documents,
            },
            warning,
        } = semantic;

        let fused = fuse(lexical, semantic_candidates, FusionWeights::from(&self.config));
        let page = paginate(&fused, request.offset, request.limit);
        let results = self.hydrate(page, &semantic_documents).await?;
        // Hits without a payload anywhere are not results
        let total = fused.len() - (page.len() - results.len());

        let mut sources = SourceBreakdown::default();
        for hit in &results {
            match hit.provenance {
                ProvenanceLabel::Fts => sources.lexical += 1,
                ProvenanceLabel::Vector => sources.semantic += 1,
                ProvenanceLabel::Hybrid => sources.hybrid += 1,
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            total,
            returned = results.len(),
            lexical_matches,
            semantic_matches,
            elapsed_ms,
            degraded = warning.is_some(),
            "search complete"
        );

        Ok(SearchResponse {
            total,
            metadata: SearchMetadata {
                mode: request.mode,
                limit: request.limit,
                offset: request.offset,
                total,
                lexical_matches,
                semantic_matches,
                sources,
                elapsed_ms,
                warning,
            },
            results,
        })
    }

    /// Documents most similar to `doc_id`. Errors propagate: there is no
    /// fallback leg for similarity.
    pub async fn similar(&self, doc_id: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.validate(doc_id, limit, 0)?;
        let semantic = self
            .semantic
            .as_ref()
            .ok_or_else(|| VectorError::Unavailable("vector search is disabled".into()))?;

        let timeout = self.config.leg_timeout();
        let neighbors = tokio::time::timeout(timeout, semantic.nearest_neighbors(doc_id, limit))
            .await
            .map_err(|_| VectorError::Timeout(timeout))??;

        let fused = fuse(Vec::new(), neighbors.candidates, FusionWeights::from(&self.config));
        self.hydrate(&fused, &neighbors.documents).await
    }

    fn validate(&self, query: &str, limit: usize, offset: usize) -> Result<(), SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidParams("query must not be empty".into()));
        }
        if limit == 0 || limit > self.config.max_limit {
            return Err(SearchError::InvalidParams(format!(
                "limit must be between 1 and {}",
                self.config.max_limit
            )));
        }
        if offset > self.config.max_offset {
            return Err(SearchError::InvalidParams(format!(
                "offset must be at most {}",
                self.config.max_offset
            )));
        }
        Ok(())
    }

    async fn lexical_leg(
        &self,
        query: &str,
        type_filter: Option<DocumentType>,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>, SearchError> {
        let timeout = self.config.leg_timeout();
        match tokio::time::timeout(timeout, self.lexical.search(query, type_filter, limit)).await {
            Ok(result) => result.map_err(SearchError::Lexical),
            Err(_) => Err(SearchError::LexicalTimeout(timeout)),
        }
    }

    async fn semantic_leg(
        &self,
        query: &str,
        type_filter: Option<DocumentType>,
        limit: usize,
    ) -> SemanticOutcome {
        let Some(semantic) = &self.semantic else {
            return SemanticOutcome::degraded("vector search is disabled; keyword results only".into());
        };

        let timeout = self.config.leg_timeout();
        match tokio::time::timeout(timeout, semantic.search(query, type_filter, limit)).await {
            Ok(Ok(results)) if results.is_empty() => SemanticOutcome {
                results,
                warning: Some("vector search returned no results".into()),
            },
            Ok(Ok(results)) => SemanticOutcome {
                results,
                warning: None,
            },
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "semantic leg failed, continuing with keyword results");
                SemanticOutcome::degraded(format!(
                    "vector search unavailable, keyword results only: {err}"
                ))
            }
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "semantic leg timed out");
                SemanticOutcome::degraded(format!(
                    "vector search timed out after {} ms, keyword results only",
                    timeout.as_millis()
                ))
            }
        }
    }

    /// Attach document payloads to a page of candidates. Store rows win;
    /// the vector index's copy is the fallback.
    async fn hydrate(
        &self,
        page: &[ScoredCandidate],
        fallback: &HashMap<String, Document>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if page.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = page.iter().map(|c| c.id().to_string()).collect();
        let index = Arc::clone(self.lexical.index());
        let stored = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            index.fetch_documents(&refs)
        })
        .await
        .map_err(|e| SearchError::Lexical(anyhow::anyhow!("hydration task failed: {e}")))?
        .map_err(SearchError::Lexical)?;

        let max_chars = self.config.max_content_chars;
        let hits = page
            .iter()
            .filter_map(|candidate| {
                let doc = stored.get(candidate.id()).or_else(|| fallback.get(candidate.id()));
                if doc.is_none() {
                    tracing::warn!(id = candidate.id(), "search hit has no document payload, skipping");
                }
                doc.map(|doc| to_hit(candidate, doc, max_chars))
            })
            .collect();
        Ok(hits)
    }
}

fn to_hit(candidate: &ScoredCandidate, doc: &Document, max_chars: usize) -> SearchHit {
    SearchHit {
        id: doc.id.clone(),
        doc_type: doc.doc_type,
        content: truncate_content(&doc.content, max_chars),
        source_file: doc.source_file.clone(),
        concepts: doc.concepts.clone(),
        project: doc.project.clone(),
        score: candidate.fused_score(),
        provenance: candidate.provenance().label(),
        lexical_score: candidate.lexical_score(),
        semantic_score: candidate.semantic_score(),
    }
}

/// Truncate to `max_chars` characters, appending "..." if truncated. 0 means no limit.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return content.to_string();
    }
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}
