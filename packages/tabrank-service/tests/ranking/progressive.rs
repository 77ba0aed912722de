use std::{collections::HashMap, sync::atomic::Ordering};

use tabrank_service::{
	DocumentId, RequestedMode, SearchContext, SearchEvent, SearchRequest, SearchStatus,
};

use super::{Harness, ScriptedModel, SpySummarizer, StubDocuments, drain, ids, meta};

#[tokio::test]
async fn aggressive_mode_scores_one_document_at_a_time() {
	let mut documents = StubDocuments::new(vec![
		meta(1, "Weekly notes", "https://example.com/notes"),
		meta(2, "Tokio internals", "https://example.com/tokio"),
		meta(3, "Holiday photos", "https://example.com/photos"),
	]);

	documents.texts = HashMap::from([
		(DocumentId(1), "Scheduling work on a runtime.".to_string()),
		(DocumentId(2), "The runtime drives every task.".to_string()),
	]);

	let harness = Harness::new(documents, SpySummarizer::default(), ScriptedModel::unavailable());
	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	let ctx = SearchContext::with_events(tx);
	let request = SearchRequest::new("runtime").with_mode(RequestedMode::Aggressive);
	let outcome = harness.service.search(&ctx, request).await.unwrap();

	assert_eq!(outcome.mode.label(), "aggressive");
	assert_eq!(ids(outcome.results.ids()), vec![1, 2]);
	assert!(outcome.refinement.is_none());
	assert_eq!(harness.summarizer.count(), 0);
	assert_eq!(harness.documents.text_calls.load(Ordering::SeqCst), 3);

	let events = drain(&mut rx);
	let progress: Vec<String> = events
		.iter()
		.filter_map(|event| match event {
			SearchEvent::Partial { progress, .. } => Some(progress.to_string()),
			_ => None,
		})
		.collect();

	assert_eq!(
		progress,
		vec!["Searched 1/3, found 1", "Searched 2/3, found 2", "Searched 3/3, found 2"]
	);
	assert!(matches!(&events[0], SearchEvent::Partial { results, .. } if ids(results.ids()) == vec![1]));
	assert_eq!(events[3], SearchEvent::Status(SearchStatus::Found { count: 2 }));
	assert_eq!(events[4], SearchEvent::Complete(outcome.results.clone()));
}

#[tokio::test]
async fn unreadable_pages_fall_back_to_title_and_url() {
	let documents = StubDocuments::new(vec![meta(7, "Runtime tuning", "https://example.com/")]);
	let harness = Harness::new(documents, SpySummarizer::default(), ScriptedModel::unavailable());
	let request = SearchRequest::new("tuning").with_mode(RequestedMode::Aggressive);
	let outcome = harness.service.search(&SearchContext::new(), request).await.unwrap();

	assert_eq!(ids(outcome.results.ids()), vec![7]);
	assert_eq!(
		outcome.results.reason(DocumentId(7)),
		Some("Matched \"tuning\" in title, content")
	);
}
