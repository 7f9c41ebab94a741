use std::{sync::Arc, time::Duration};

use hyrank_config::Config;
use hyrank_domain::Strategy;
use hyrank_service::{
	Error, ErrorCode, HybridRankingService, LexicalPageRequest, QueryByStrategyRequest,
	QueryByStrategyResponse, RankExplainRequest, RetrievalError, RetrievalOrigin, Retrievers,
};
use hyrank_testkit::{FixtureLexicalRetriever, FixtureSemanticRetriever, lexical_hit, semantic_hit};

struct Harness {
	service: HybridRankingService,
	lexical: Arc<FixtureLexicalRetriever>,
	semantic: Arc<FixtureSemanticRetriever>,
}

fn harness(lexical: FixtureLexicalRetriever, semantic: FixtureSemanticRetriever) -> Harness {
	harness_with_config(Config::default(), lexical, semantic)
}

fn harness_with_config(
	cfg: Config,
	lexical: FixtureLexicalRetriever,
	semantic: FixtureSemanticRetriever,
) -> Harness {
	let lexical = Arc::new(lexical);
	let semantic = Arc::new(semantic);
	let service = HybridRankingService::with_retrievers(
		cfg,
		Retrievers::new(lexical.clone(), semantic.clone()),
	);

	Harness { service, lexical, semantic }
}

fn query(strategy: &str) -> QueryByStrategyRequest {
	QueryByStrategyRequest {
		project_id: "p1".to_string(),
		query: "rust ranking".to_string(),
		strategy: strategy.to_string(),
		limit: None,
		offset: None,
	}
}

fn explain(strategy: &str) -> RankExplainRequest {
	RankExplainRequest {
		project_id: "p1".to_string(),
		query: "rust ranking".to_string(),
		strategy: strategy.to_string(),
		document_id: None,
		chunk_id: None,
		limit: None,
		offset: None,
	}
}

fn mixed_sources() -> (FixtureLexicalRetriever, FixtureSemanticRetriever) {
	let lexical = FixtureLexicalRetriever::new().with_rows(
		"p1",
		vec![lexical_hit("d1", "lexical d1", 3.0, 100), lexical_hit("d2", "lexical d2", 1.0, 50)],
	);
	let semantic = FixtureSemanticRetriever::new().with_items(
		"p1",
		vec![
			semantic_hit("d1", "fts:d1:0", "semantic snippet for d1", 0.9, 120),
			semantic_hit("d3", "c1", "semantic d3", 0.8, 110),
		],
	);

	(lexical, semantic)
}

fn ids(response: &QueryByStrategyResponse) -> Vec<(&str, &str)> {
	response
		.results
		.iter()
		.map(|item| (item.document_id.as_str(), item.chunk_id.as_str()))
		.collect()
}

fn lexical_rows(count: usize) -> FixtureLexicalRetriever {
	let rows = (0..count)
		.map(|idx| lexical_hit(&format!("doc-{idx:03}"), "row", (count - idx) as f64, 1_000))
		.collect();

	FixtureLexicalRetriever::new().with_rows("p1", rows)
}

#[tokio::test]
async fn hybrid_merges_same_passage_once() {
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical, semantic);
	let response =
		harness.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	assert_eq!(response.strategy, Strategy::Hybrid);
	assert_eq!(ids(&response), vec![("d1", "fts:d1:0"), ("d3", "c1")]);
	assert_eq!(response.total, 2);
	assert!(!response.has_more);
	assert!(response.degradation.is_none());

	let top = &response.results[0];

	assert_eq!(top.snippet, "semantic snippet for d1");
	assert_eq!(top.updated_at, 120);
	assert_eq!(top.final_score, 0.965);
	assert_eq!(top.score_breakdown.bm25, 1.0);
	assert_eq!(top.score_breakdown.semantic, 0.9);
	assert_eq!(top.score_breakdown.recency, 1.0);

	let second = &response.results[1];

	assert_eq!(second.final_score, 0.365714);
	assert_eq!(second.score_breakdown.bm25, 0.0);
	assert_eq!(second.score_breakdown.recency, 0.857143);
}

#[tokio::test]
async fn identical_inputs_rank_identically() {
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical, semantic);
	let first = harness.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");
	let second = harness.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	assert_eq!(first, second);
}

#[tokio::test]
async fn returned_scores_respect_threshold_and_bounds() {
	let harness = harness(lexical_rows(40), FixtureSemanticRetriever::new());
	let response = harness.service.query_by_strategy(query("fts")).await.expect("Query failed.");

	assert!(!response.results.is_empty());

	for item in &response.results {
		assert!(item.final_score >= 0.25);
		assert!(item.final_score <= 1.0);

		for value in
			[item.score_breakdown.bm25, item.score_breakdown.semantic, item.score_breakdown.recency]
		{
			assert!((0.0..=1.0).contains(&value));
		}
	}
}

#[tokio::test]
async fn hybrid_degrades_when_semantic_fails() {
	let (lexical, _) = mixed_sources();
	let failure = RetrievalError::model_not_ready("Embedding model is loading");
	let harness = harness(lexical, FixtureSemanticRetriever::failing(failure));
	let response =
		harness.service.query_by_strategy(query("hybrid")).await.expect("Query should degrade.");

	assert_eq!(ids(&response), vec![("d1", "fts:d1:0")]);

	let degradation = response.degradation.expect("Expected a degradation record.");

	assert_eq!(degradation.source, RetrievalOrigin::Semantic);
	assert_eq!(degradation.code, ErrorCode::ModelNotReady);
	assert_eq!(degradation.message, "Embedding model is loading");
	assert_eq!(harness.semantic.requests().len(), 1);
}

#[tokio::test]
async fn semantic_strategy_surfaces_semantic_failure() {
	let failure = RetrievalError::model_not_ready("Embedding model is loading");
	let harness = harness(lexical_rows(3), FixtureSemanticRetriever::failing(failure.clone()));
	let err = harness
		.service
		.query_by_strategy(query("semantic"))
		.await
		.expect_err("Expected semantic failure.");

	match err {
		Error::Retrieval { origin, error } => {
			assert_eq!(origin, RetrievalOrigin::Semantic);
			assert_eq!(error, failure);
		},
		other => panic!("Unexpected error: {other}"),
	}

	assert!(harness.lexical.requests().is_empty());
}

#[tokio::test]
async fn lexical_failure_propagates_in_hybrid_mode() {
	let failure = RetrievalError::from_backend_message("disk I/O error");
	let (_, semantic) = mixed_sources();
	let harness = harness(FixtureLexicalRetriever::failing(failure), semantic);
	let err = harness
		.service
		.query_by_strategy(query("hybrid"))
		.await
		.expect_err("Expected lexical failure.");
	let envelope = err.envelope();

	assert!(matches!(err, Error::Retrieval { origin: RetrievalOrigin::Lexical, .. }));
	assert_eq!(envelope.code, ErrorCode::DbError);
	assert_eq!(envelope.message, "Fulltext search failed");
	assert!(envelope.retryable);
}

#[tokio::test]
async fn lexical_syntax_errors_keep_their_code() {
	let failure = RetrievalError::from_backend_message("fts5: syntax error near \"(\"");
	let harness =
		harness(FixtureLexicalRetriever::failing(failure), FixtureSemanticRetriever::new());
	let err =
		harness.service.query_by_strategy(query("fts")).await.expect_err("Expected failure.");

	assert_eq!(err.code(), ErrorCode::InvalidArgument);
	assert!(!err.envelope().retryable);
}

#[tokio::test]
async fn validation_fails_before_any_retrieval() {
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical, semantic);

	for req in [
		QueryByStrategyRequest { project_id: "  ".to_string(), ..query("hybrid") },
		QueryByStrategyRequest { query: String::new(), ..query("hybrid") },
		query("bm25"),
		QueryByStrategyRequest { limit: Some(51), ..query("hybrid") },
		QueryByStrategyRequest { limit: Some(0), ..query("hybrid") },
		QueryByStrategyRequest { offset: Some(-3), ..query("hybrid") },
	] {
		let err = harness.service.query_by_strategy(req).await.expect_err("Expected rejection.");

		assert_eq!(err.code(), ErrorCode::InvalidArgument);
	}

	let err = harness
		.service
		.rank_explain(RankExplainRequest {
			document_id: Some("d1".to_string()),
			..explain("hybrid")
		})
		.await
		.expect_err("Expected rejection.");

	assert_eq!(err.code(), ErrorCode::InvalidArgument);
	assert!(harness.lexical.requests().is_empty());
	assert!(harness.semantic.requests().is_empty());
}

#[tokio::test]
async fn long_queries_only_limit_lexical_strategies() {
	let semantic = FixtureSemanticRetriever::new()
		.with_items("p1", vec![semantic_hit("d1", "c1", "semantic d1", 0.9, 100)]);
	let harness = harness(FixtureLexicalRetriever::new(), semantic);
	let long_query = "a".repeat(1025);
	let response = harness
		.service
		.query_by_strategy(QueryByStrategyRequest {
			query: long_query.clone(),
			..query("semantic")
		})
		.await
		.expect("Query failed.");

	assert_eq!(ids(&response), vec![("d1", "c1")]);
	assert_eq!(harness.semantic.requests()[0].query, long_query);

	for strategy in ["fts", "hybrid"] {
		let err = harness
			.service
			.query_by_strategy(QueryByStrategyRequest {
				query: long_query.clone(),
				..query(strategy)
			})
			.await
			.expect_err("Expected rejection.");
		let envelope = err.envelope();

		assert_eq!(envelope.code, ErrorCode::InvalidArgument);
		assert_eq!(envelope.message, "query is too long.");
		assert_eq!(envelope.details, Some(serde_json::json!({ "max_length": 1024 })));
	}

	assert!(harness.lexical.requests().is_empty());
	assert_eq!(harness.semantic.requests().len(), 1);
}

#[tokio::test]
async fn retrievers_receive_trimmed_inputs() {
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical, semantic);

	harness
		.service
		.query_by_strategy(QueryByStrategyRequest {
			project_id: " p1 ".to_string(),
			query: "  rust ranking\n".to_string(),
			..query("hybrid")
		})
		.await
		.expect("Query failed.");

	let lexical = harness.lexical.requests();
	let semantic = harness.semantic.requests();

	assert_eq!(lexical[0].project_id, "p1");
	assert_eq!(lexical[0].query, "rust ranking");
	assert_eq!(semantic.len(), 1);
	assert_eq!(semantic[0].project_id, "p1");
	assert_eq!(semantic[0].limit, 200);
}

#[tokio::test]
async fn lexical_recall_fetches_at_most_two_pages() {
	let harness = harness(lexical_rows(250), FixtureSemanticRetriever::new());

	harness.service.query_by_strategy(query("fts")).await.expect("Query failed.");

	let requests: Vec<(u32, u32)> =
		harness.lexical.requests().iter().map(|req| (req.limit, req.offset)).collect();

	assert_eq!(requests, vec![(100, 0), (100, 100)]);
	assert!(harness.semantic.requests().is_empty());
}

#[tokio::test]
async fn lexical_recall_stops_after_a_final_page() {
	let harness = harness(lexical_rows(80), FixtureSemanticRetriever::new());

	harness.service.query_by_strategy(query("fts")).await.expect("Query failed.");

	assert_eq!(
		harness.lexical.requests(),
		vec![LexicalPageRequest {
			project_id: "p1".to_string(),
			query: "rust ranking".to_string(),
			limit: 100,
			offset: 0,
		}]
	);
}

#[tokio::test]
async fn second_lexical_page_respects_recall_ceiling() {
	let mut cfg = Config::default();

	cfg.search.recall.fts_page_limit = 60;
	cfg.search.recall.fts_recall_limit = 90;

	let harness = harness_with_config(cfg, lexical_rows(250), FixtureSemanticRetriever::new());

	harness.service.query_by_strategy(query("fts")).await.expect("Query failed.");

	let requests: Vec<(u32, u32)> =
		harness.lexical.requests().iter().map(|req| (req.limit, req.offset)).collect();

	assert_eq!(requests, vec![(60, 0), (30, 60)]);
}

#[tokio::test]
async fn pages_concatenate_to_the_full_ranking() {
	let harness = harness(lexical_rows(30), FixtureSemanticRetriever::new());
	let full = harness
		.service
		.rank_explain(RankExplainRequest { limit: Some(50), ..explain("fts") })
		.await
		.expect("Explain failed.");
	let mut collected = Vec::new();
	let mut offset = 0;

	loop {
		let page = harness
			.service
			.query_by_strategy(QueryByStrategyRequest {
				limit: Some(7),
				offset: Some(offset),
				..query("fts")
			})
			.await
			.expect("Query failed.");

		assert_eq!(page.total, full.total);

		collected.extend(page.results.clone());

		if !page.has_more {
			break;
		}

		offset += 7;
	}

	assert_eq!(collected, full.explanations);
	assert_eq!(collected.len(), full.total);
}

#[tokio::test]
async fn offset_past_the_end_is_an_empty_page() {
	let harness = harness(lexical_rows(5), FixtureSemanticRetriever::new());
	let response = harness
		.service
		.query_by_strategy(QueryByStrategyRequest { offset: Some(1_000), ..query("fts") })
		.await
		.expect("Query failed.");

	assert!(response.results.is_empty());
	assert!(!response.has_more);
	assert!(response.total > 0);
}

#[tokio::test]
async fn backpressure_truncates_oversized_candidate_sets() {
	let mut cfg = Config::default();

	cfg.search.recall.semantic_recall_limit = 20_000;

	let items = (0..10_001)
		.map(|idx| semantic_hit(&format!("doc-{idx:05}"), "c0", "text", 0.5, idx))
		.collect();
	let harness = harness_with_config(
		cfg,
		FixtureLexicalRetriever::new(),
		FixtureSemanticRetriever::new().with_items("p1", items),
	);
	let response =
		harness.service.query_by_strategy(query("semantic")).await.expect("Query failed.");

	assert!(response.backpressure.truncated);
	assert_eq!(response.backpressure.candidate_count, 10_001);
	assert_eq!(response.backpressure.candidate_limit, 10_000);
	assert!(response.results.len() <= 50);
	assert!(response.results.iter().all(|item| item.document_id.as_str() < "doc-10000"));
}

#[tokio::test]
async fn small_candidate_sets_are_not_truncated() {
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical, semantic);
	let response =
		harness.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	assert!(!response.backpressure.truncated);
	assert_eq!(response.backpressure.candidate_count, 3);
}

#[tokio::test]
async fn explain_matches_listing_for_every_result() {
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical, semantic);
	let listing =
		harness.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	for item in &listing.results {
		let explained = harness
			.service
			.rank_explain(RankExplainRequest {
				document_id: Some(format!(" {} ", item.document_id)),
				chunk_id: Some(item.chunk_id.clone()),
				..explain("hybrid")
			})
			.await
			.expect("Explain failed.");

		assert_eq!(explained.explanations, vec![item.clone()]);
		assert_eq!(explained.total, listing.total);
	}
}

#[tokio::test]
async fn explain_without_target_returns_the_listing_page() {
	let harness = harness(lexical_rows(30), FixtureSemanticRetriever::new());
	let listing = harness
		.service
		.query_by_strategy(QueryByStrategyRequest {
			limit: Some(5),
			offset: Some(2),
			..query("fts")
		})
		.await
		.expect("Query failed.");
	let explained = harness
		.service
		.rank_explain(RankExplainRequest { limit: Some(5), offset: Some(2), ..explain("fts") })
		.await
		.expect("Explain failed.");

	assert_eq!(explained.explanations, listing.results);
	assert_eq!(explained.total, listing.total);
	assert_eq!(explained.backpressure, listing.backpressure);
}

#[tokio::test]
async fn explain_for_unknown_target_is_empty() {
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical, semantic);
	let explained = harness
		.service
		.rank_explain(RankExplainRequest {
			document_id: Some("d2".to_string()),
			chunk_id: Some("fts:d2:0".to_string()),
			..explain("hybrid")
		})
		.await
		.expect("Explain failed.");

	// d2 exists in recall but falls below the score threshold.
	assert!(explained.explanations.is_empty());
	assert_eq!(explained.total, 2);
}

#[tokio::test]
async fn equal_scores_order_by_document_id() {
	let semantic = FixtureSemanticRetriever::new().with_items(
		"p1",
		vec![
			semantic_hit("b", "c0", "text", 0.8, 10),
			semantic_hit("a", "c0", "text", 0.8, 10),
			semantic_hit("c", "c0", "text", 0.8, 10),
		],
	);
	let harness = harness(FixtureLexicalRetriever::new(), semantic);
	let response =
		harness.service.query_by_strategy(query("semantic")).await.expect("Query failed.");

	assert_eq!(ids(&response), vec![("a", "c0"), ("b", "c0"), ("c", "c0")]);
}

#[tokio::test]
async fn lexical_only_service_ranks_without_semantic_results() {
	let (lexical, _) = mixed_sources();
	let service = HybridRankingService::new(Config::default(), Arc::new(lexical));
	let response = service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	assert_eq!(ids(&response), vec![("d1", "fts:d1:0")]);
	assert!(response.degradation.is_none());
}

#[tokio::test]
async fn hybrid_recall_runs_both_sources_concurrently() {
	let delay = Duration::from_millis(200);
	let (lexical, semantic) = mixed_sources();
	let harness = harness(lexical.with_delay(delay), semantic.with_delay(delay));
	let started = tokio::time::Instant::now();
	let response =
		harness.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	assert!(started.elapsed() < delay * 2);
	assert_eq!(ids(&response), vec![("d1", "fts:d1:0"), ("d3", "c1")]);
}

#[tokio::test]
async fn merge_order_ignores_which_source_finishes_first() {
	let mut cfg = Config::default();

	cfg.search.recall.candidate_limit = 2;

	let lexical = FixtureLexicalRetriever::new()
		.with_rows("p1", vec![lexical_hit("d1", "l1", 2.0, 100), lexical_hit("d2", "l2", 2.0, 100)])
		.with_delay(Duration::from_millis(50));
	let semantic = FixtureSemanticRetriever::new().with_items(
		"p1",
		vec![semantic_hit("d3", "c3", "s3", 0.9, 120), semantic_hit("d4", "c4", "s4", 0.8, 110)],
	);
	let harness = harness_with_config(cfg, lexical, semantic);
	let response =
		harness.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	assert!(response.backpressure.truncated);
	assert_eq!(response.backpressure.candidate_count, 4);

	let kept: Vec<&str> =
		response.results.iter().map(|item| item.document_id.as_str()).collect();

	assert_eq!(kept, vec!["d1", "d2"]);

	let (lexical, semantic) = mixed_sources();
	let immediate = harness_with_config(Config::default(), lexical, semantic);
	let (lexical, semantic) = mixed_sources();
	let delayed = harness_with_config(
		Config::default(),
		lexical.with_delay(Duration::from_millis(50)),
		semantic,
	);
	let expected =
		immediate.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");
	let actual = delayed.service.query_by_strategy(query("hybrid")).await.expect("Query failed.");

	assert_eq!(actual, expected);
}
