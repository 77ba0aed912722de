use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use tabrank_service::{
	DocumentId, KvStore, MemoryStore, SearchContext, SearchRequest, StoreScope, SummaryCache,
	SummaryRecord,
};

use super::{Harness, ScriptedModel, SpySummarizer, StubDocuments, ids, meta};

fn cache(store: &Arc<MemoryStore>) -> SummaryCache {
	let kv: Arc<dyn KvStore> = store.clone();

	SummaryCache::new(kv, &tabrank_config::Cache::default())
}

fn record(id: u64) -> SummaryRecord {
	SummaryRecord {
		id: DocumentId(id),
		summary: "Slow-cooked stews.".to_string(),
		tags: vec!["food".to_string()],
	}
}

#[tokio::test]
async fn entries_expire_per_scope() {
	let store = Arc::new(MemoryStore::new());
	let cache = cache(&store);
	let doc = meta(1, "Stews", "https://example.com/stews");
	let written = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);

	cache.store(&[(&doc, &record(1))], written).await.unwrap();

	let fresh = cache.lookup(std::slice::from_ref(&doc), written + Duration::minutes(1)).await.unwrap();

	assert_eq!(fresh.get(&DocumentId(1)), Some(&record(1)));

	// Past the session window, the durable copy still answers.
	let durable =
		cache.lookup(std::slice::from_ref(&doc), written + Duration::hours(2)).await.unwrap();

	assert!(durable.contains_key(&DocumentId(1)));

	store.clear_session();

	let stale = cache.lookup(std::slice::from_ref(&doc), written + Duration::hours(25)).await.unwrap();

	assert!(stale.is_empty());
}

#[tokio::test]
async fn a_url_change_invalidates_the_entry() {
	let store = Arc::new(MemoryStore::new());
	let cache = cache(&store);
	let now = OffsetDateTime::now_utc();

	cache.store(&[(&meta(1, "Stews", "https://example.com/stews"), &record(1))], now).await.unwrap();

	let moved = meta(1, "Stews", "https://example.com/soups");
	let found = cache.lookup(&[moved], now).await.unwrap();

	assert!(found.is_empty());
}

#[tokio::test]
async fn invalidate_clears_both_scopes() {
	let store = Arc::new(MemoryStore::new());
	let cache = cache(&store);
	let now = OffsetDateTime::now_utc();

	cache.store(&[(&meta(4, "Stews", "https://example.com/"), &record(4))], now).await.unwrap();

	assert_eq!(store.len(StoreScope::Session), 1);
	assert_eq!(store.len(StoreScope::Durable), 1);

	cache.invalidate(&[DocumentId(4)]).await.unwrap();

	assert!(store.is_empty(StoreScope::Session));
	assert!(store.is_empty(StoreScope::Durable));
}

#[tokio::test]
async fn repeated_searches_reuse_cached_summaries() {
	let documents = StubDocuments::new(vec![
		meta(1, "Stew night", "https://example.com/stew"),
		meta(2, "Tax forms", "https://example.com/tax"),
	]);
	let summarizer = SpySummarizer::with(&[
		(1, "Slow-cooked stews.", &["food"]),
		(2, "Filing deadlines.", &["finance"]),
	]);
	let harness = Harness::new(documents, summarizer, ScriptedModel::unavailable());
	let ctx = SearchContext::new();
	let first = harness.service.search(&ctx, SearchRequest::new("#food")).await.unwrap();
	let second = harness.service.search(&ctx, SearchRequest::new("#food")).await.unwrap();

	assert_eq!(ids(first.results.ids()), vec![1]);
	assert_eq!(first.results.ids(), second.results.ids());
	assert_eq!(harness.summarizer.count(), 1);
	assert_eq!(*harness.summarizer.batch_sizes.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn summarizer_failure_falls_back_to_heuristic_tags() {
	let documents = StubDocuments::new(vec![
		meta(1, "Chocolate cake recipe", "https://www.allrecipes.com/recipe/cake"),
		meta(2, "Inbox", "https://mail.example.com/"),
	]);
	let summarizer = SpySummarizer { fail: true, ..SpySummarizer::default() };
	let harness = Harness::new(documents, summarizer, ScriptedModel::unavailable());
	let ctx = SearchContext::new();
	let by_domain = harness.service.search(&ctx, SearchRequest::new("#allrecipes")).await.unwrap();
	let by_topic = harness.service.search(&ctx, SearchRequest::new("#food")).await.unwrap();

	assert_eq!(ids(by_domain.results.ids()), vec![1]);
	assert_eq!(ids(by_topic.results.ids()), vec![1]);
}
