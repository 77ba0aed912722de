use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde_json::Value;

use tabrank_service::{
	BoxFuture, Collaborators, DocumentId, Error, KvStore, MemoryStore, RequestedMode, Result,
	SearchContext, SearchEvent, SearchRequest, SearchStatus, StoreScope, TabRankService,
};

use super::{
	Harness, Reply, ScriptedModel, SpySummarizer, StubDocuments, drain, ids, meta, test_config,
};

/// Cancels `ctx` while the `cancel_on`-th search session write is in flight.
struct CancellingStore {
	inner: MemoryStore,
	ctx: SearchContext,
	cancel_on: usize,
	session_writes: AtomicUsize,
}
impl KvStore for CancellingStore {
	fn get<'a>(
		&'a self,
		scope: StoreScope,
		keys: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, Value>>> {
		self.inner.get(scope, keys)
	}

	fn set(&self, scope: StoreScope, entries: HashMap<String, Value>) -> BoxFuture<'_, Result<()>> {
		if entries.contains_key("search_session")
			&& self.session_writes.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_on
		{
			self.ctx.cancel();
		}

		self.inner.set(scope, entries)
	}

	fn remove<'a>(&'a self, scope: StoreScope, keys: &'a [String]) -> BoxFuture<'a, Result<()>> {
		self.inner.remove(scope, keys)
	}
}

fn service_cancelling_on(
	ctx: &SearchContext,
	cancel_on: usize,
	documents: StubDocuments,
	model: ScriptedModel,
) -> TabRankService {
	let store = CancellingStore {
		inner: MemoryStore::new(),
		ctx: ctx.clone(),
		cancel_on,
		session_writes: AtomicUsize::new(0),
	};
	let collaborators = Collaborators::new(
		Arc::new(documents),
		Arc::new(summaries()),
		Arc::new(model),
		Arc::new(store),
	);

	TabRankService::with_collaborators(test_config(), collaborators)
}

fn documents() -> StubDocuments {
	StubDocuments::new(vec![
		meta(1, "Rust borrow checker guide", "https://example.com/a"),
		meta(2, "Ownership explained", "https://example.com/b"),
	])
}

fn summaries() -> SpySummarizer {
	SpySummarizer::with(&[
		(1, "How the borrow checker works.", &["rust"]),
		(2, "Moves and borrows in systems languages.", &["memory"]),
	])
}

fn is_result_event(event: &SearchEvent) -> bool {
	!matches!(event, SearchEvent::Cancelled)
}

#[tokio::test]
async fn cancelling_mid_search_reports_cancelled_not_empty() {
	let harness = Harness::new(documents(), summaries(), ScriptedModel::replying(vec![Reply::Hang]));
	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	let ctx = SearchContext::with_events(tx);
	let task = tokio::spawn({
		let service = harness.service.clone();
		let ctx = ctx.clone();

		async move { service.search(&ctx, SearchRequest::new("garbage collection")).await }
	});

	harness.model.prompted.notified().await;
	ctx.cancel();

	let result = task.await.unwrap();

	assert!(matches!(result, Err(Error::Cancelled)));

	let events = drain(&mut rx);

	assert_eq!(events, vec![SearchEvent::Cancelled]);
	assert!(!events.iter().any(is_result_event));

	let session = harness.service.session_store().load().await.unwrap().unwrap();

	assert_eq!(session.status, SearchStatus::Cancelled);
	assert!(session.tab_ids().is_empty());
	assert_ne!(session.status.to_string(), SearchStatus::NoResults.to_string());
}

#[tokio::test]
async fn a_new_search_supersedes_the_one_in_flight() {
	let model = ScriptedModel::replying(vec![
		Reply::Hang,
		Reply::Text(
			serde_json::json!({ "results": [
				{ "ref": "doc2", "relevanceScore": 8, "reason": "Summary 'Moves and borrows' replaces garbage collection." },
			] })
			.to_string(),
		),
	]);
	let harness = Harness::new(documents(), summaries(), model);
	let ctx = SearchContext::new();
	let first = tokio::spawn({
		let service = harness.service.clone();
		let ctx = ctx.clone();

		async move { service.search(&ctx, SearchRequest::new("garbage collection")).await }
	});

	harness.model.prompted.notified().await;

	let second =
		harness.service.search(&ctx, SearchRequest::new("garbage collection")).await.unwrap();

	assert!(matches!(first.await.unwrap(), Err(Error::Cancelled)));
	assert_eq!(ids(second.results.ids()), vec![2]);

	let session = harness.service.session_store().load().await.unwrap().unwrap();

	assert_eq!(session.id, second.session.id);
	assert_eq!(session.status, SearchStatus::Found { count: 1 });
}

#[tokio::test]
async fn cancelling_a_progressive_search_discards_partial_results() {
	let mut documents = documents();

	documents.texts = HashMap::from([(DocumentId(1), "Rust lifetimes in depth.".to_string())]);
	documents.hang_on = Some(DocumentId(2));

	let harness = Harness::new(documents, summaries(), ScriptedModel::unavailable());
	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	let ctx = SearchContext::with_events(tx);
	let task = tokio::spawn({
		let service = harness.service.clone();
		let ctx = ctx.clone();
		let request = SearchRequest::new("rust").with_mode(RequestedMode::Aggressive);

		async move { service.search(&ctx, request).await }
	});

	harness.documents.reading.notified().await;
	ctx.cancel();

	assert!(matches!(task.await.unwrap(), Err(Error::Cancelled)));

	let events = drain(&mut rx);

	assert_eq!(events.len(), 2);
	assert!(matches!(&events[0], SearchEvent::Partial { progress, .. } if progress.searched == 1));
	assert_eq!(events[1], SearchEvent::Cancelled);

	let session = harness.service.session_store().load().await.unwrap().unwrap();

	assert_eq!(session.status, SearchStatus::Cancelled);
	assert!(session.tab_ids().is_empty());
}

#[tokio::test]
async fn a_cancel_during_the_final_session_write_leaves_a_cancelled_session() {
	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	let ctx = SearchContext::with_events(tx);
	let service = service_cancelling_on(&ctx, 2, documents(), ScriptedModel::unavailable());
	let request = SearchRequest::new("rust").with_mode(RequestedMode::Aggressive);

	assert!(matches!(service.search(&ctx, request).await, Err(Error::Cancelled)));

	let events = drain(&mut rx);

	assert_eq!(events.last(), Some(&SearchEvent::Cancelled));
	assert!(!events.iter().any(|event| {
		matches!(event, SearchEvent::Status(_) | SearchEvent::Complete(_))
	}));

	let session = service.session_store().load().await.unwrap().unwrap();

	assert_eq!(session.status, SearchStatus::Cancelled);
	assert!(session.tab_ids().is_empty());
}

#[tokio::test]
async fn a_cancel_during_the_refined_session_write_leaves_a_cancelled_session() {
	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	let ctx = SearchContext::with_events(tx);
	let service = service_cancelling_on(&ctx, 3, documents(), ScriptedModel::unavailable());
	let outcome = service.search(&ctx, SearchRequest::new("rust")).await.unwrap();

	assert_eq!(ids(outcome.results.ids()), vec![1]);
	assert!(matches!(outcome.refinement.unwrap().wait().await, Err(Error::Cancelled)));

	let events = drain(&mut rx);

	assert_eq!(events.len(), 2);
	assert!(matches!(&events[0], SearchEvent::Provisional(set) if ids(set.ids()) == vec![1]));
	assert_eq!(events[1], SearchEvent::Cancelled);

	let session = service.session_store().load().await.unwrap().unwrap();

	assert_eq!(session.status, SearchStatus::Cancelled);
}
