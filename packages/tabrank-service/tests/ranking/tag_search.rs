use tabrank_service::{DocumentId, ResultSource, SearchContext, SearchRequest, SearchStatus};

use super::{Harness, ScriptedModel, SpySummarizer, StubDocuments, ids, meta};

fn harness() -> Harness {
	let documents = StubDocuments::new(vec![
		meta(1, "Frontend weekly", "https://example.com/1"),
		meta(2, "Node tips", "https://example.com/2"),
		meta(3, "Rust on the web", "https://example.com/3"),
	]);
	let summarizer = SpySummarizer::with(&[
		(1, "Newsletter.", &["webdev"]),
		(2, "Tips.", &["js"]),
		(3, "Wasm.", &["web", "rust"]),
	]);

	Harness::new(documents, summarizer, ScriptedModel::unavailable())
}

#[tokio::test]
async fn hashtag_queries_match_tags_by_containment() {
	let harness = harness();
	let outcome =
		harness.service.search(&SearchContext::new(), SearchRequest::new("#web")).await.unwrap();

	assert_eq!(outcome.mode.label(), "hashtag");
	assert!(outcome.keywords.is_empty());
	assert_eq!(ids(outcome.results.ids()), vec![1, 3]);
	assert_eq!(outcome.results.source(), ResultSource::Lexical);
	assert_eq!(outcome.results.score(DocumentId(1)), Some(10.0));
	assert!(harness.model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn each_matched_tag_adds_to_the_score() {
	let harness = harness();
	let outcome = harness
		.service
		.search(&SearchContext::new(), SearchRequest::new("#web, #rust"))
		.await
		.unwrap();

	assert_eq!(ids(outcome.results.ids()), vec![3, 1]);
	assert_eq!(outcome.results.score(DocumentId(3)), Some(20.0));
	assert_eq!(outcome.results.reason(DocumentId(3)), Some("Tagged #web, #rust"));
	assert_eq!(outcome.results.reason(DocumentId(1)), Some("Tagged #web"));
}

#[tokio::test]
async fn abbreviations_do_not_match_longer_tags() {
	let harness = harness();
	let outcome = harness
		.service
		.search(&SearchContext::new(), SearchRequest::new("#javascript"))
		.await
		.unwrap();

	assert!(outcome.results.is_empty());
	assert_eq!(outcome.session.status, SearchStatus::NoResults);
}
