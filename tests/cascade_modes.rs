//! Search mode selection across the fallback cascade.

mod util;

use std::time::{Duration, Instant};

use hybrid_retrieval::config::HybridConfig;
use hybrid_retrieval::search::{Candidate, MatchSource, SearchError, SearchMode, SearchQuery};
use util::{StubEmbedder, StubLexical, StubVector, TestTracing, semantic_config, stub_searcher};

const EPS: f32 = 1e-5;

fn lexical_ab() -> Vec<Candidate> {
    vec![
        Candidate::lexical("A", "alpha", 0.8),
        Candidate::lexical("B", "beta", 0.6),
    ]
}

fn vector_a() -> Vec<Candidate> {
    vec![Candidate::vector("A", "alpha", 0.9)]
}

#[tokio::test]
async fn flag_off_is_bm25_and_skips_semantic_path() {
    let lexical = StubLexical::with_hits(lexical_ab());
    let embedder = StubEmbedder::ok();
    let vector = StubVector::with_hits(vector_a());
    let searcher = stub_searcher(&lexical, &embedder, &vector, HybridConfig::default());

    for text in ["alpha", "beta gamma", "anything at all"] {
        let result = searcher.search(&SearchQuery::new(text, 5)).await.unwrap();
        assert_eq!(result.search_mode, SearchMode::Bm25);
        assert!(result.fallback_reason.is_none());
    }

    assert_eq!(lexical.calls(), 3);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(vector.calls(), 0);
}

#[tokio::test]
async fn worked_example_orders_a_before_b() {
    let lexical = StubLexical::with_hits(lexical_ab());
    let embedder = StubEmbedder::ok();
    let vector = StubVector::with_hits(vector_a());
    let searcher = stub_searcher(
        &lexical,
        &embedder,
        &vector,
        semantic_config(Duration::from_secs(5)),
    );

    let result = searcher.search(&SearchQuery::new("alpha", 10)).await.unwrap();

    assert_eq!(result.search_mode, SearchMode::Hybrid);
    assert_eq!(result.ids(), vec!["A", "B"]);
    assert!((result.candidates[0].fused_score - 0.87).abs() < EPS);
    assert!((result.candidates[1].fused_score - 0.18).abs() < EPS);
    assert_eq!(result.total_candidates, 2);
    assert_eq!(embedder.calls(), 1);
    assert_eq!(vector.calls(), 1);
}

#[tokio::test]
async fn overlapping_ids_merge_into_one_weighted_candidate() {
    let lexical = StubLexical::with_hits(vec![
        Candidate::lexical("shared", "s", 0.5),
        Candidate::lexical("lex-only", "l", 0.9),
    ]);
    let vector = StubVector::with_hits(vec![
        Candidate::vector("shared", "s", 0.4),
        Candidate::vector("vec-only", "v", 0.3),
    ]);
    let searcher = stub_searcher(
        &lexical,
        &StubEmbedder::ok(),
        &vector,
        semantic_config(Duration::from_secs(5)),
    );

    let result = searcher.search(&SearchQuery::new("s", 10)).await.unwrap();

    let shared: Vec<_> = result
        .candidates
        .iter()
        .filter(|c| c.id == "shared")
        .collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].source, MatchSource::Both);
    assert!((shared[0].fused_score - (0.7 * 0.4 + 0.3 * 0.5)).abs() < EPS);

    for c in &result.candidates {
        let expected = 0.7 * c.vector_score.unwrap_or(0.0) + 0.3 * c.lexical_score.unwrap_or(0.0);
        assert!((c.fused_score - expected).abs() < EPS, "{}", c.id);
    }
    assert_eq!(result.total_candidates, 3);
}

#[tokio::test]
async fn vector_timeout_degrades_to_bm25_fallback() {
    let tracing = TestTracing::new();
    let _guard = tracing.install();

    let lexical = StubLexical::with_hits(lexical_ab());
    let vector = StubVector::slow(vector_a(), Duration::from_secs(5));
    let searcher = stub_searcher(
        &lexical,
        &StubEmbedder::ok(),
        &vector,
        semantic_config(Duration::from_millis(50)),
    );

    let start = Instant::now();
    let result = searcher.search(&SearchQuery::new("alpha", 10)).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(result.search_mode, SearchMode::Bm25Fallback);
    assert_eq!(result.ids(), vec!["A", "B"]);
    assert!(result.candidates.iter().all(|c| c.vector_score.is_none()));
    assert!(result.candidates.iter().all(|c| c.source == MatchSource::Lexical));
    assert!(
        result
            .fallback_reason
            .as_deref()
            .unwrap()
            .contains("timed out after 50ms")
    );
    assert_eq!(vector.calls(), 1);

    assert_eq!(tracing.warnings().len(), 1);
    tracing.assert_contains("semantic path degraded");
    tracing.assert_contains("search_complete");
}

#[tokio::test]
async fn lexical_and_semantic_paths_run_concurrently() {
    let lexical = StubLexical::slow(lexical_ab(), Duration::from_millis(80));
    let embedder = StubEmbedder::ok();
    let vector = StubVector::slow(vector_a(), Duration::from_millis(80));
    let searcher = stub_searcher(
        &lexical,
        &embedder,
        &vector,
        semantic_config(Duration::from_millis(150)),
    );

    let start = Instant::now();
    let result = searcher.search(&SearchQuery::new("alpha", 10)).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result.search_mode, SearchMode::Hybrid);
    assert_eq!(result.ids(), vec!["A", "B"]);
    assert!(
        elapsed < Duration::from_millis(140),
        "paths ran sequentially: {elapsed:?}"
    );
}

#[tokio::test]
async fn vector_timeout_does_not_cut_the_lexical_branch() {
    let lexical = StubLexical::slow(lexical_ab(), Duration::from_millis(200));
    let embedder = StubEmbedder::ok();
    let vector = StubVector::slow(vector_a(), Duration::from_secs(5));
    let searcher = stub_searcher(
        &lexical,
        &embedder,
        &vector,
        semantic_config(Duration::from_millis(50)),
    );

    let start = Instant::now();
    let result = searcher.search(&SearchQuery::new("alpha", 10)).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result.search_mode, SearchMode::Bm25Fallback);
    assert_eq!(result.ids(), vec!["A", "B"]);
    assert!(result.candidates.iter().all(|c| c.vector_score.is_none()));
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(lexical.calls(), 1);
}

#[tokio::test]
async fn slow_embedder_counts_against_the_budget() {
    let vector = StubVector::with_hits(vector_a());
    let searcher = stub_searcher(
        &StubLexical::with_hits(lexical_ab()),
        &StubEmbedder::slow(Duration::from_secs(5)),
        &vector,
        semantic_config(Duration::from_millis(50)),
    );

    let result = searcher.search(&SearchQuery::new("alpha", 10)).await.unwrap();

    assert_eq!(result.search_mode, SearchMode::Bm25Fallback);
    assert_eq!(vector.calls(), 0);
}

#[tokio::test]
async fn embedding_failure_degrades_with_warning() {
    let tracing = TestTracing::new();
    let _guard = tracing.install();

    let vector = StubVector::with_hits(vector_a());
    let searcher = stub_searcher(
        &StubLexical::with_hits(lexical_ab()),
        &StubEmbedder::failing(),
        &vector,
        semantic_config(Duration::from_secs(5)),
    );

    let result = searcher.search(&SearchQuery::new("alpha", 10)).await.unwrap();

    assert_eq!(result.search_mode, SearchMode::Bm25Fallback);
    assert_eq!(result.ids(), vec!["A", "B"]);
    assert_eq!(vector.calls(), 0);
    tracing.assert_contains("semantic path degraded");
    tracing.assert_contains("provider unreachable");
}

#[tokio::test]
async fn vector_store_error_degrades() {
    let searcher = stub_searcher(
        &StubLexical::with_hits(lexical_ab()),
        &StubEmbedder::ok(),
        &StubVector::failing(),
        semantic_config(Duration::from_secs(5)),
    );

    let result = searcher.search(&SearchQuery::new("alpha", 10)).await.unwrap();

    assert_eq!(result.search_mode, SearchMode::Bm25Fallback);
    assert!(
        result
            .fallback_reason
            .as_deref()
            .unwrap()
            .contains("connection refused")
    );
}

#[tokio::test]
async fn lexical_failure_is_fatal_even_when_semantic_succeeds() {
    let searcher = stub_searcher(
        &StubLexical::failing(),
        &StubEmbedder::ok(),
        &StubVector::with_hits(vector_a()),
        semantic_config(Duration::from_secs(5)),
    );

    let err = searcher
        .search(&SearchQuery::new("alpha", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::LexicalSearchFailure(_)));
    assert_eq!(err.status_code(), 500);

    let searcher = stub_searcher(
        &StubLexical::failing(),
        &StubEmbedder::ok(),
        &StubVector::with_hits(vector_a()),
        HybridConfig::default(),
    );
    let err = searcher
        .search(&SearchQuery::new("alpha", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::LexicalSearchFailure(_)));
}

#[tokio::test]
async fn invalid_requests_touch_no_client() {
    let lexical = StubLexical::with_hits(lexical_ab());
    let embedder = StubEmbedder::ok();
    let vector = StubVector::with_hits(vector_a());
    let searcher = stub_searcher(
        &lexical,
        &embedder,
        &vector,
        semantic_config(Duration::from_secs(5)),
    );

    let too_long = "x".repeat(5000);
    let bad = [
        SearchQuery::new("", 10),
        SearchQuery::new("  \t ", 10),
        SearchQuery::new("alpha", 0),
        SearchQuery::new("alpha", 1000),
        SearchQuery::new(too_long.as_str(), 10),
        SearchQuery::new("alpha", 10).with_filter(" ", "x"),
    ];
    for query in &bad {
        let err = searcher.search(query).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)), "{query:?}");
        assert_eq!(err.status_code(), 400);
    }

    assert_eq!(lexical.calls(), 0);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(vector.calls(), 0);
}

#[tokio::test]
async fn results_are_truncated_to_limit() {
    let hits = (0..20)
        .map(|i| Candidate::lexical(format!("doc-{i:02}"), "", 20.0 - i as f32))
        .collect();
    let searcher = stub_searcher(
        &StubLexical::with_hits(hits),
        &StubEmbedder::ok(),
        &StubVector::with_hits(Vec::new()),
        semantic_config(Duration::from_secs(5)),
    );

    let result = searcher.search(&SearchQuery::new("doc", 3)).await.unwrap();
    assert_eq!(result.search_mode, SearchMode::Hybrid);
    assert_eq!(result.ids(), vec!["doc-00", "doc-01", "doc-02"]);
    // Over-fetch is limit * candidate_multiplier.
    assert_eq!(result.total_candidates, 6);
}

#[tokio::test]
async fn neural_disabled_rejects_without_touching_any_path() {
    let lexical = StubLexical::with_hits(lexical_ab());
    let embedder = StubEmbedder::ok();
    let vector = StubVector::with_hits(vector_a());
    let searcher = stub_searcher(&lexical, &embedder, &vector, HybridConfig::default());

    let err = searcher
        .search_neural(&SearchQuery::new("alpha", 10))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::NeuralDisabled));
    assert_eq!(err.status_code(), 503);
    assert_eq!(lexical.calls(), 0);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(vector.calls(), 0);
}

#[tokio::test]
async fn neural_returns_vector_only_candidates() {
    let lexical = StubLexical::with_hits(lexical_ab());
    let vector = StubVector::with_hits(vec![
        Candidate::vector("B", "beta", 0.4),
        Candidate::vector("A", "alpha", 0.9),
    ]);
    let searcher = stub_searcher(
        &lexical,
        &StubEmbedder::ok(),
        &vector,
        semantic_config(Duration::from_secs(5)),
    );

    let result = searcher
        .search_neural(&SearchQuery::new("alpha", 10))
        .await
        .unwrap();

    assert_eq!(result.search_mode, SearchMode::Neural);
    assert_eq!(result.ids(), vec!["A", "B"]);
    assert!((result.candidates[0].fused_score - 0.9).abs() < EPS);
    assert!(result.candidates.iter().all(|c| c.lexical_score.is_none()));
    assert_eq!(lexical.calls(), 0);
}

#[tokio::test]
async fn neural_timeout_is_semantic_unavailable() {
    let searcher = stub_searcher(
        &StubLexical::with_hits(lexical_ab()),
        &StubEmbedder::ok(),
        &StubVector::slow(vector_a(), Duration::from_secs(5)),
        semantic_config(Duration::from_millis(30)),
    );

    let err = searcher
        .search_neural(&SearchQuery::new("alpha", 10))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::SemanticUnavailable(_)));
    assert_eq!(err.status_code(), 503);
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let lexical = StubLexical::with_hits(lexical_ab());
    let vector = StubVector::with_hits(vector_a());
    let searcher = std::sync::Arc::new(stub_searcher(
        &lexical,
        &StubEmbedder::ok(),
        &vector,
        semantic_config(Duration::from_secs(5)),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let searcher = searcher.clone();
        handles.push(tokio::spawn(async move {
            searcher.search(&SearchQuery::new("alpha", 10)).await
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.search_mode, SearchMode::Hybrid);
        assert_eq!(result.ids(), vec!["A", "B"]);
    }
    assert_eq!(lexical.calls(), 8);
    assert_eq!(vector.calls(), 8);
}
