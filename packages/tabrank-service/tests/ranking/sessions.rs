use time::OffsetDateTime;

use tabrank_service::{DocumentId, SearchContext, SearchRequest, SearchStatus};

use super::{Harness, ScriptedModel, SpySummarizer, StubDocuments, ids, meta};

fn harness() -> Harness {
	let documents = StubDocuments::new(vec![
		meta(1, "Rust borrow checker guide", "https://example.com/a"),
		meta(2, "Rust async book", "https://example.com/b"),
		meta(3, "Sourdough starter", "https://example.com/c"),
	]);
	let summarizer = SpySummarizer::with(&[
		(1, "How the borrow checker works.", &["rust"]),
		(2, "Futures and executors.", &["rust", "async"]),
		(3, "Feeding schedules.", &["baking"]),
	]);

	Harness::new(documents, summarizer, ScriptedModel::unavailable())
}

async fn search_rust(harness: &Harness) {
	let outcome =
		harness.service.search(&SearchContext::new(), SearchRequest::new("rust")).await.unwrap();

	if let Some(refinement) = outcome.refinement {
		refinement.wait().await.unwrap();
	}
}

#[tokio::test]
async fn completed_searches_resume_by_query() {
	let harness = harness();

	search_rust(&harness).await;

	let resumed = harness.service.resume_session("  RUST ").await.unwrap().unwrap();

	assert_eq!(ids(resumed.tab_ids()), vec![1, 2]);
	assert_eq!(resumed.status, SearchStatus::Found { count: 2 });
	assert!(harness.service.resume_session("python").await.unwrap().is_none());
}

#[tokio::test]
async fn resuming_prunes_closed_documents_in_order() {
	let harness = harness();

	search_rust(&harness).await;
	harness.documents.close(1);

	let resumed = harness.service.resume_session("rust").await.unwrap().unwrap();

	assert_eq!(ids(resumed.tab_ids()), vec![2]);
	assert_eq!(resumed.status, SearchStatus::Found { count: 1 });
	assert!(resumed.results.reason(DocumentId(1)).is_none());

	let stored = harness.service.session_store().load().await.unwrap().unwrap();

	assert_eq!(stored, resumed);
}

#[tokio::test]
async fn removing_a_document_updates_the_session_and_forgets_its_summary() {
	let harness = harness();

	search_rust(&harness).await;

	let session = harness.service.remove_document(DocumentId(2)).await.unwrap().unwrap();

	assert_eq!(ids(session.tab_ids()), vec![1]);

	let session = harness.service.remove_document(DocumentId(1)).await.unwrap().unwrap();

	assert!(session.tab_ids().is_empty());
	assert_eq!(session.status, SearchStatus::NoResults);

	let cached = harness
		.service
		.summary_cache()
		.lookup(&[meta(2, "Rust async book", "https://example.com/b")], OffsetDateTime::now_utc())
		.await
		.unwrap();

	assert!(cached.is_empty());
}

#[tokio::test]
async fn a_failed_listing_is_an_empty_search_not_an_error() {
	let mut documents = StubDocuments::new(Vec::new());

	documents.fail_listing = true;

	let harness = Harness::new(documents, SpySummarizer::default(), ScriptedModel::unavailable());
	let outcome =
		harness.service.search(&SearchContext::new(), SearchRequest::new("rust")).await.unwrap();

	assert!(outcome.results.is_empty());
	assert_eq!(outcome.session.status, SearchStatus::NoResults);
}

#[tokio::test]
async fn a_cleared_session_cannot_be_resumed() {
	let harness = harness();

	search_rust(&harness).await;
	harness.service.session_store().clear().await.unwrap();

	assert!(harness.service.resume_session("rust").await.unwrap().is_none());
}
