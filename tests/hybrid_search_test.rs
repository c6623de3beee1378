mod helpers;

use helpers::{context_with, doc, query_response, test_config, ConnectMode, FakeBackend};
use oracle_kb::documents::{DocumentType, TypeFilter};
use oracle_kb::error::{SearchError, VectorError};
use oracle_kb::search::types::ProvenanceLabel;
use oracle_kb::search::{SearchMode, SearchRequest};
use std::time::Duration;

fn corpus() -> Vec<oracle_kb::documents::Document> {
    vec![
        doc("cache-1", DocumentType::Learning, "cache invalidation needs a version key"),
        doc("cache-2", DocumentType::Pattern, "write-through cache in front of the store"),
        doc("retro-1", DocumentType::Retro, "the cache outage retro and what we changed"),
        doc("unrelated", DocumentType::Principle, "prefer boring technology"),
    ]
}

fn request(query: &str, mode: SearchMode) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        type_filter: TypeFilter::All,
        limit: 10,
        offset: 0,
        mode,
    }
}

#[tokio::test]
async fn hybrid_marks_documents_found_by_both_legs() {
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[("cache-2", 0.1), ("vec-only", 0.3)])));
    let ctx = context_with(&corpus(), &backend, &test_config());

    let response = ctx.engine().search(request("cache", SearchMode::Hybrid)).await.unwrap();

    assert!(response.metadata.warning.is_none());
    assert_eq!(response.metadata.lexical_matches, 3);
    assert_eq!(response.metadata.semantic_matches, 2);
    assert_eq!(response.total, 4, "three keyword hits plus one vector-only hit");

    let top = &response.results[0];
    assert_eq!(top.id, "cache-2");
    assert_eq!(top.provenance, ProvenanceLabel::Hybrid);
    assert!(top.lexical_score.is_some() && top.semantic_score.is_some());

    let ids: Vec<&str> = response.results.iter().map(|h| h.id.as_str()).collect();
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(ids.len(), unique.len(), "no id appears twice");

    assert_eq!(
        response.metadata.sources.hybrid
            + response.metadata.sources.lexical
            + response.metadata.sources.semantic,
        response.results.len()
    );
    assert!(response
        .results
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn vector_only_hits_are_hydrated_from_the_vector_payload() {
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[("vec-only", 0.2)])));
    let ctx = context_with(&corpus(), &backend, &test_config());

    let response = ctx
        .engine()
        .search(request("anything at all", SearchMode::SemanticOnly))
        .await
        .unwrap();

    assert_eq!(response.results.len(), 1);
    let hit = &response.results[0];
    assert_eq!(hit.id, "vec-only");
    assert_eq!(hit.provenance, ProvenanceLabel::Vector);
    assert_eq!(hit.content, "vector copy of vec-only");
    assert_eq!(hit.doc_type, DocumentType::Learning);
    assert_eq!(hit.source_file, "vec/vec-only.md");
    assert!((hit.score - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn failing_vector_backend_degrades_to_keyword_results() {
    let backend = FakeBackend::new(|tool, _| {
        Err(VectorError::Tool {
            tool: tool.to_string(),
            message: "collection does not exist".into(),
        })
    });
    let ctx = context_with(&corpus(), &backend, &test_config());

    let response = ctx.engine().search(request("cache", SearchMode::Hybrid)).await.unwrap();

    assert_eq!(response.results.len(), 3);
    assert!(response
        .results
        .iter()
        .all(|h| h.provenance == ProvenanceLabel::Fts));
    let warning = response.metadata.warning.expect("degraded search carries a warning");
    assert!(warning.contains("keyword results only"));
}

#[tokio::test]
async fn missing_vector_executable_degrades_and_stays_down() {
    let backend = FakeBackend::constant("unused");
    backend.set_connect_mode(ConnectMode::NotFound);
    let ctx = context_with(&corpus(), &backend, &test_config());

    for _ in 0..2 {
        let response = ctx.engine().search(request("cache", SearchMode::Hybrid)).await.unwrap();
        assert_eq!(response.results.len(), 3);
        assert!(response.metadata.warning.is_some());
    }
    assert_eq!(backend.connects(), 1);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn empty_vector_results_still_warn() {
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[])));
    let ctx = context_with(&corpus(), &backend, &test_config());

    let response = ctx.engine().search(request("cache", SearchMode::Hybrid)).await.unwrap();
    assert_eq!(response.results.len(), 3);
    assert_eq!(
        response.metadata.warning.as_deref(),
        Some("vector search returned no results")
    );
}

#[tokio::test]
async fn slow_vector_leg_is_abandoned_with_a_warning() {
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[("cache-1", 0.1)])));
    backend.set_delay(Duration::from_secs(5));
    let mut config = test_config();
    config.retrieval.leg_timeout_ms = 300;
    let ctx = context_with(&corpus(), &backend, &config);

    let response = ctx.engine().search(request("cache", SearchMode::Hybrid)).await.unwrap();
    assert_eq!(response.results.len(), 3);
    assert!(response.metadata.warning.unwrap().contains("timed out"));
}

#[tokio::test]
async fn keyword_mode_never_touches_the_vector_backend() {
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[("cache-1", 0.1)])));
    let ctx = context_with(&corpus(), &backend, &test_config());

    let response = ctx
        .engine()
        .search(request("cache", SearchMode::LexicalOnly))
        .await
        .unwrap();
    assert_eq!(response.results.len(), 3);
    assert!(response.metadata.warning.is_none());
    assert_eq!(backend.connects(), 0);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn vector_mode_skips_the_keyword_leg() {
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[("retro-1", 0.4)])));
    let ctx = context_with(&corpus(), &backend, &test_config());

    let response = ctx
        .engine()
        .search(request("cache", SearchMode::SemanticOnly))
        .await
        .unwrap();
    assert_eq!(response.metadata.lexical_matches, 0);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].provenance, ProvenanceLabel::Vector);
    // Store row wins over the vector copy
    assert_eq!(response.results[0].content, "the cache outage retro and what we changed");
}

#[tokio::test]
async fn type_filter_reaches_both_legs() {
    let backend = FakeBackend::new(|_, args| {
        assert_eq!(args.get("where"), Some(&serde_json::json!({ "type": "pattern" })));
        Ok(query_response(&[]))
    });
    let ctx = context_with(&corpus(), &backend, &test_config());

    let mut req = request("cache", SearchMode::Hybrid);
    req.type_filter = TypeFilter::Only(DocumentType::Pattern);
    let response = ctx.engine().search(req).await.unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].id, "cache-2");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn pagination_slices_the_fused_list() {
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[])));
    let ctx = context_with(&corpus(), &backend, &test_config());

    let full = ctx.engine().search(request("cache", SearchMode::LexicalOnly)).await.unwrap();
    let mut req = request("cache", SearchMode::LexicalOnly);
    req.limit = 2;
    req.offset = 1;
    let page = ctx.engine().search(req).await.unwrap();

    let full_ids: Vec<&str> = full.results.iter().map(|h| h.id.as_str()).collect();
    let page_ids: Vec<&str> = page.results.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(page_ids, full_ids[1..3].to_vec());
    assert_eq!(page.metadata.offset, 1);
    assert_eq!(page.metadata.limit, 2);

    let mut req = request("cache", SearchMode::LexicalOnly);
    req.offset = 50;
    let past_end = ctx.engine().search(req).await.unwrap();
    assert!(past_end.results.is_empty());
}

#[tokio::test]
async fn invalid_parameters_are_rejected_before_any_io() {
    let backend = FakeBackend::constant("unused");
    let ctx = context_with(&corpus(), &backend, &test_config());

    let cases = [
        SearchRequest { query: "   ".into(), ..request("x", SearchMode::Hybrid) },
        SearchRequest { limit: 0, ..request("cache", SearchMode::Hybrid) },
        SearchRequest { limit: 101, ..request("cache", SearchMode::Hybrid) },
        SearchRequest { offset: 10_001, ..request("cache", SearchMode::Hybrid) },
    ];
    for req in cases {
        let err = ctx.engine().search(req).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidParams(_)), "got {err:?}");
    }
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn operator_words_are_searched_as_plain_terms() {
    let mut docs = corpus();
    docs.push(doc("ops", DocumentType::Learning, "cache and not or near"));
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[])));
    let ctx = context_with(&docs, &backend, &test_config());

    for query in ["cache AND", "cache OR", "NOT cache", "NEAR cache", "cache AND (NOT"] {
        let response = ctx
            .engine()
            .search(request(query, SearchMode::Hybrid))
            .await
            .unwrap_or_else(|err| panic!("{query:?} failed: {err}"));
        assert!(
            response.results.iter().any(|h| h.id == "ops"),
            "{query:?} should match the document containing those words"
        );
    }
}

#[tokio::test]
async fn long_content_is_truncated() {
    let mut docs = corpus();
    docs.push(doc("long", DocumentType::Learning, &format!("cache {}", "x".repeat(3000))));
    let backend = FakeBackend::new(|_, _| Ok(query_response(&[])));
    let mut config = test_config();
    config.retrieval.max_content_chars = 100;
    let ctx = context_with(&docs, &backend, &config);

    let response = ctx.engine().search(request("cache", SearchMode::LexicalOnly)).await.unwrap();
    let long = response.results.iter().find(|h| h.id == "long").unwrap();
    assert_eq!(long.content.chars().count(), 103);
    assert!(long.content.ends_with("..."));
}
