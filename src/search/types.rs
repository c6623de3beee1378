//! Request and response types for hybrid search.

use serde::{Deserialize, Serialize};

use crate::documents::{DocumentType, TypeFilter};
use crate::error::SearchError;

/// Which legs a search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchMode {
    #[default]
    #[serde(rename = "hybrid")]
    Hybrid,
    #[serde(rename = "fts")]
    LexicalOnly,
    #[serde(rename = "vector")]
    SemanticOnly,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::LexicalOnly => "fts",
            Self::SemanticOnly => "vector",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hybrid" => Ok(Self::Hybrid),
            "fts" => Ok(Self::LexicalOnly),
            "vector" => Ok(Self::SemanticOnly),
            _ => Err(format!("unknown search mode: {s} (expected hybrid, fts, or vector)")),
        }
    }
}

/// Which leg(s) found a candidate, with the raw backend scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Provenance {
    Lexical { raw_rank: f64 },
    Semantic { raw_distance: f64 },
    Hybrid { raw_rank: f64, raw_distance: f64 },
}

impl Provenance {
    pub fn label(&self) -> ProvenanceLabel {
        match self {
            Self::Lexical { .. } => ProvenanceLabel::Fts,
            Self::Semantic { .. } => ProvenanceLabel::Vector,
            Self::Hybrid { .. } => ProvenanceLabel::Hybrid,
        }
    }
}

/// Wire form of [`Provenance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceLabel {
    Fts,
    Vector,
    Hybrid,
}

/// One document id scored by one or both legs, alive for a single request.
///
/// Normalized scores are `None` when the leg did not find the document, which
/// is different from the leg scoring it 0. Constructors and
/// [`ScoredCandidate::merge_semantic`] keep provenance and scores consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    id: String,
    provenance: Provenance,
    lexical_score: Option<f64>,
    semantic_score: Option<f64>,
    fused_score: f64,
}

impl ScoredCandidate {
    pub fn lexical(id: impl Into<String>, raw_rank: f64, normalized: f64) -> Self {
        Self {
            id: id.into(),
            provenance: Provenance::Lexical { raw_rank },
            lexical_score: Some(normalized),
            semantic_score: None,
            fused_score: 0.0,
        }
    }

    pub fn semantic(id: impl Into<String>, raw_distance: f64, normalized: f64) -> Self {
        Self {
            id: id.into(),
            provenance: Provenance::Semantic { raw_distance },
            lexical_score: None,
            semantic_score: Some(normalized),
            fused_score: 0.0,
        }
    }

    /// Fold a semantic hit for the same id into this candidate.
    ///
    /// A lexical candidate becomes hybrid. Anything else keeps its provenance
    /// and only takes the better semantic score, so a leg that returns the
    /// same id twice cannot fabricate corroboration.
    pub fn merge_semantic(&mut self, other: &ScoredCandidate) {
        let (Provenance::Semantic { raw_distance }, Some(score)) =
            (other.provenance, other.semantic_score)
        else {
            return;
        };
        match self.provenance {
            Provenance::Lexical { raw_rank } => {
                self.provenance = Provenance::Hybrid {
                    raw_rank,
                    raw_distance,
                };
                self.semantic_score = Some(score);
            }
            Provenance::Semantic { .. } | Provenance::Hybrid { .. } => {
                if self.semantic_score.map_or(true, |s| score > s) {
                    self.semantic_score = Some(score);
                    self.provenance = match self.provenance {
                        Provenance::Hybrid { raw_rank, .. } => Provenance::Hybrid {
                            raw_rank,
                            raw_distance,
                        },
                        _ => Provenance::Semantic { raw_distance },
                    };
                }
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn lexical_score(&self) -> Option<f64> {
        self.lexical_score
    }

    pub fn semantic_score(&self) -> Option<f64> {
        self.semantic_score
    }

    pub fn fused_score(&self) -> f64 {
        self.fused_score
    }

    pub(crate) fn set_fused_score(&mut self, score: f64) {
        self.fused_score = score;
    }
}

/// A single search result with its document payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub content: String,
    pub source_file: String,
    pub concepts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub score: f64,
    pub provenance: ProvenanceLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f64>,
}

/// How many returned results came from each leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceBreakdown {
    pub lexical: usize,
    pub semantic: usize,
    pub hybrid: usize,
}

/// Diagnostics attached to every response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub mode: SearchMode,
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
    pub lexical_matches: usize,
    pub semantic_matches: usize,
    pub sources: SourceBreakdown,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub metadata: SearchMetadata,
}

/// Search parameters as received from a caller.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub type_filter: TypeFilter,
    pub limit: usize,
    pub offset: usize,
    pub mode: SearchMode,
}

impl SearchRequest {
    /// Build a request from loosely typed surface arguments. Missing values
    /// take their defaults; unparseable ones are rejected.
    pub fn from_args(
        query: impl Into<String>,
        type_filter: Option<&str>,
        limit: Option<usize>,
        offset: Option<usize>,
        mode: Option<&str>,
        default_limit: usize,
    ) -> Result<Self, SearchError> {
        let type_filter = type_filter
            .map(str::parse::<TypeFilter>)
            .transpose()
            .map_err(SearchError::InvalidParams)?
            .unwrap_or_default();
        let mode = mode
            .map(str::parse::<SearchMode>)
            .transpose()
            .map_err(SearchError::InvalidParams)?
            .unwrap_or_default();
        Ok(Self {
            query: query.into(),
            type_filter,
            limit: limit.unwrap_or(default_limit),
            offset: offset.unwrap_or(0),
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leg_candidates_leave_other_score_unset() {
        let lex = ScoredCandidate::lexical("a", -1.0, 0.74);
        assert_eq!(lex.lexical_score(), Some(0.74));
        assert_eq!(lex.semantic_score(), None);

        let sem = ScoredCandidate::semantic("a", 0.2, 0.8);
        assert_eq!(sem.lexical_score(), None);
        assert_eq!(sem.semantic_score(), Some(0.8));
    }

    #[test]
    fn merging_semantic_into_lexical_yields_hybrid() {
        let mut c = ScoredCandidate::lexical("a", -2.0, 0.55);
        c.merge_semantic(&ScoredCandidate::semantic("a", 0.25, 0.75));
        assert_eq!(
            c.provenance(),
            Provenance::Hybrid {
                raw_rank: -2.0,
                raw_distance: 0.25
            }
        );
        assert_eq!(c.lexical_score(), Some(0.55));
        assert_eq!(c.semantic_score(), Some(0.75));
    }

    #[test]
    fn duplicate_semantic_hits_do_not_become_hybrid() {
        let mut c = ScoredCandidate::semantic("a", 0.4, 0.6);
        c.merge_semantic(&ScoredCandidate::semantic("a", 0.1, 0.9));
        assert_eq!(c.provenance(), Provenance::Semantic { raw_distance: 0.1 });
        assert_eq!(c.lexical_score(), None);
        assert_eq!(c.semantic_score(), Some(0.9));
    }

    #[test]
    fn request_from_args_applies_defaults_and_rejects_garbage() {
        let req = SearchRequest::from_args("q", None, None, None, None, 10).unwrap();
        assert_eq!(req.limit, 10);
        assert_eq!(req.offset, 0);
        assert_eq!(req.mode, SearchMode::Hybrid);
        assert_eq!(req.type_filter, TypeFilter::All);

        let req =
            SearchRequest::from_args("q", Some("pattern"), Some(3), Some(6), Some("fts"), 10).unwrap();
        assert_eq!(req.type_filter, TypeFilter::Only(DocumentType::Pattern));
        assert_eq!(req.mode, SearchMode::LexicalOnly);

        assert!(matches!(
            SearchRequest::from_args("q", None, None, None, Some("fuzzy"), 10),
            Err(SearchError::InvalidParams(_))
        ));
    }

    #[test]
    fn mode_round_trips_through_wire_names() {
        for mode in [SearchMode::Hybrid, SearchMode::LexicalOnly, SearchMode::SemanticOnly] {
            assert_eq!(mode.as_str().parse::<SearchMode>().unwrap(), mode);
        }
        assert!("keyword".parse::<SearchMode>().is_err());
        assert_eq!(
            serde_json::to_value(SearchMode::LexicalOnly).unwrap(),
            serde_json::json!("fts")
        );
    }
}
