use time::OffsetDateTime;
use uuid::Uuid;

use docex_service::{Error, ResultSource, SearchRequest, SearchType};
use docex_storage::index::IndexKind;
use docex_testkit::{TestService, document_hit, note_hit};

use super::scores;

fn request(query: &str, page: u32, page_size: u32) -> SearchRequest {
	SearchRequest {
		query: query.to_string(),
		document_id: None,
		search_type: SearchType::Both,
		page,
		page_size,
	}
}

fn seed_climate_corpus(test: &TestService) {
	let now = OffsetDateTime::now_utc();

	test.index.seed(
		IndexKind::Documents,
		vec![
			document_hit("paper-1", "Physical climate risk.", 0.9, now),
			document_hit("paper-1", "Transition risk.", 0.7, now),
			document_hit("paper-2", "Adaptation finance.", 0.5, now),
		],
	);
	test.index.seed(
		IndexKind::Notes,
		vec![
			note_hit(Uuid::new_v4(), "paper-1", "Stress test assumptions.", 0.8, now),
			note_hit(Uuid::new_v4(), "paper-2", "Missing scope 3 data.", 0.6, now),
		],
	);
}

#[tokio::test]
async fn merges_sources_by_score_and_paginates() {
	let test = TestService::new();

	seed_climate_corpus(&test);

	let response = test
		.service
		.hybrid_search(request("climate risk", 1, 2))
		.await
		.expect("Hybrid search failed.");

	assert_eq!(scores(&response.results), vec![0.9, 0.8]);
	assert_eq!(response.total_results, 5);
	assert_eq!(response.total_pages, 3);
	assert_eq!(response.page, 1);
	assert_eq!(response.query, "climate risk");
	assert_eq!(response.search_type, SearchType::Both);
	assert!(!response.results[0].is_research_note());
	assert!(response.results[1].is_research_note());

	let last = test
		.service
		.hybrid_search(request("climate risk", 3, 2))
		.await
		.expect("Hybrid search failed.");

	assert_eq!(scores(&last.results), vec![0.5]);
}

#[tokio::test]
async fn page_past_the_end_is_empty_not_an_error() {
	let test = TestService::new();

	seed_climate_corpus(&test);

	let response = test
		.service
		.hybrid_search(request("climate risk", 2, 10))
		.await
		.expect("Hybrid search failed.");

	assert!(response.results.is_empty());
	assert_eq!(response.total_results, 5);
	assert_eq!(response.total_pages, 1);
}

#[tokio::test]
async fn empty_corpus_has_zero_pages() {
	let test = TestService::new();
	let response = test
		.service
		.hybrid_search(request("climate risk", 1, 10))
		.await
		.expect("Hybrid search failed.");

	assert!(response.results.is_empty());
	assert_eq!(response.total_results, 0);
	assert_eq!(response.total_pages, 0);
}

#[tokio::test]
async fn equal_scores_keep_documents_before_notes() {
	let test = TestService::new();
	let now = OffsetDateTime::now_utc();

	test.index.seed(
		IndexKind::Notes,
		vec![note_hit(Uuid::new_v4(), "paper-1", "Note.", 0.8, now)],
	);
	test.index.seed(IndexKind::Documents, vec![document_hit("paper-1", "Chunk.", 0.8, now)]);

	let response = test
		.service
		.hybrid_search(request("tie", 1, 10))
		.await
		.expect("Hybrid search failed.");

	assert_eq!(response.results[0].content, "Chunk.");
	assert_eq!(response.results[1].content, "Note.");
}

#[tokio::test]
async fn document_scope_restricts_both_sources() {
	let test = TestService::new();

	seed_climate_corpus(&test);

	let mut req = request("climate risk", 1, 10);

	req.document_id = Some("paper-2".to_string());

	let response = test.service.hybrid_search(req).await.expect("Hybrid search failed.");

	assert_eq!(scores(&response.results), vec![0.6, 0.5]);
	assert!(response.results.iter().all(|result| result.document_id == "paper-2"));
	assert_eq!(response.document_id.as_deref(), Some("paper-2"));
	assert!(
		test.index
			.queries()
			.iter()
			.all(|query| query.document_id.as_deref() == Some("paper-2"))
	);
}

#[tokio::test]
async fn search_type_selects_collections() {
	let test = TestService::new();

	seed_climate_corpus(&test);

	let mut req = request("climate risk", 1, 10);

	req.search_type = SearchType::Document;

	let response = test.service.hybrid_search(req).await.expect("Hybrid search failed.");
	let queries = test.index.queries();

	assert_eq!(response.total_results, 3);
	assert!(response.results.iter().all(|result| !result.is_research_note()));
	assert_eq!(queries.len(), 1);
	assert_eq!(queries[0].kind, IndexKind::Documents);
	assert_eq!(queries[0].limit, test.service.cfg.search.candidate_k);

	let mut req = request("climate risk", 1, 10);

	req.search_type = SearchType::ResearchNotes;

	let response = test.service.hybrid_search(req).await.expect("Hybrid search failed.");

	assert_eq!(scores(&response.results), vec![0.8, 0.6]);
}

#[tokio::test]
async fn research_notes_never_carry_document_fields() {
	let test = TestService::new();

	seed_climate_corpus(&test);

	let response = test
		.service
		.hybrid_search(request("climate risk", 1, 10))
		.await
		.expect("Hybrid search failed.");

	for result in &response.results {
		match &result.source {
			ResultSource::Document { page_number, .. } => assert_eq!(*page_number, Some(1)),
			ResultSource::ResearchNote { note_id, .. } => assert!(note_id.is_some()),
		}
	}
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_provider_call() {
	let test = TestService::new();
	let err = test
		.service
		.hybrid_search(request("   ", 1, 10))
		.await
		.expect_err("Expected blank query to be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");
	assert_eq!(test.embedding.calls(), 0);
	assert!(test.index.queries().is_empty());
}

#[tokio::test]
async fn invalid_paging_is_rejected() {
	let test = TestService::new();

	for (page, page_size) in [(0, 10), (1, 0), (1, 101)] {
		let err = test
			.service
			.hybrid_search(request("climate risk", page, page_size))
			.await
			.expect_err("Expected paging to be rejected.");

		assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");
	}
}

#[tokio::test]
async fn provider_failures_are_wrapped_without_retry() {
	let test = TestService::new();

	test.embedding.fail_next_calls(true);

	let err = test
		.service
		.hybrid_search(request("climate risk", 1, 10))
		.await
		.expect_err("Expected embedding failure.");

	assert!(matches!(err, Error::Provider { .. }), "Unexpected error: {err:?}");
	assert!(err.to_string().contains("503"));
	assert_eq!(test.embedding.calls(), 1);

	test.embedding.fail_next_calls(false);
	test.index.fail_searches(true);

	let err = test
		.service
		.hybrid_search(request("climate risk", 1, 10))
		.await
		.expect_err("Expected index failure.");

	assert!(matches!(err, Error::Index { .. }), "Unexpected error: {err:?}");
}
