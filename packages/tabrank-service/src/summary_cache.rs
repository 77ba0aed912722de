use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{DocumentId, DocumentMeta, KvStore, Result, StoreScope, SummaryRecord};

const KEY_PREFIX: &str = "summary:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedSummary {
	url: String,
	summary: String,
	tags: Vec<String>,
	/// Unix seconds.
	cached_at: i64,
}

/// Summaries and tags keyed by document id, valid only for the URL they were built from.
///
/// Entries are written to both scopes. The session scope answers within its short window; the
/// durable scope covers restarts within its longer one. No locking: concurrent writers for
/// the same document produce equivalent entries and the last one wins.
#[derive(Clone)]
pub struct SummaryCache {
	store: Arc<dyn KvStore>,
	durable_ttl_secs: i64,
	session_ttl_secs: i64,
}
impl SummaryCache {
	pub fn new(store: Arc<dyn KvStore>, cfg: &tabrank_config::Cache) -> Self {
		Self {
			store,
			durable_ttl_secs: i64::try_from(cfg.durable_ttl_secs).unwrap_or(i64::MAX),
			session_ttl_secs: i64::try_from(cfg.session_ttl_secs).unwrap_or(i64::MAX),
		}
	}

	pub fn key(id: DocumentId) -> String {
		format!("{KEY_PREFIX}{id}")
	}

	/// Returns fresh entries whose URL still matches the document.
	pub async fn lookup(
		&self,
		documents: &[DocumentMeta],
		now: OffsetDateTime,
	) -> Result<HashMap<DocumentId, SummaryRecord>> {
		if documents.is_empty() {
			return Ok(HashMap::new());
		}

		let keys: Vec<String> = documents.iter().map(|meta| Self::key(meta.id)).collect();
		let mut session = self.store.get(StoreScope::Session, &keys).await?;
		let mut durable = self.store.get(StoreScope::Durable, &keys).await?;
		let now = now.unix_timestamp();
		let mut out = HashMap::new();

		for (meta, key) in documents.iter().zip(&keys) {
			let hit = [
				(session.remove(key), self.session_ttl_secs),
				(durable.remove(key), self.durable_ttl_secs),
			]
			.into_iter()
			.filter_map(|(value, ttl)| Some((decode(key, value?)?, ttl)))
			.find(|(entry, ttl)| {
				entry.url == meta.url && now.saturating_sub(entry.cached_at) < *ttl
			});
			let Some((entry, _)) = hit else { continue };

			out.insert(
				meta.id,
				SummaryRecord { id: meta.id, summary: entry.summary, tags: entry.tags },
			);
		}

		tracing::debug!(requested = documents.len(), hits = out.len(), "Summary cache lookup.");

		Ok(out)
	}

	pub async fn store(
		&self,
		records: &[(&DocumentMeta, &SummaryRecord)],
		now: OffsetDateTime,
	) -> Result<()> {
		if records.is_empty() {
			return Ok(());
		}

		let cached_at = now.unix_timestamp();
		let mut entries = HashMap::with_capacity(records.len());

		for (meta, record) in records {
			let entry = CachedSummary {
				url: meta.url.clone(),
				summary: record.summary.clone(),
				tags: record.tags.clone(),
				cached_at,
			};

			entries.insert(Self::key(meta.id), serde_json::to_value(entry)?);
		}

		self.store.set(StoreScope::Session, entries.clone()).await?;
		self.store.set(StoreScope::Durable, entries).await
	}

	pub async fn invalidate(&self, ids: &[DocumentId]) -> Result<()> {
		if ids.is_empty() {
			return Ok(());
		}

		let keys: Vec<String> = ids.iter().map(|id| Self::key(*id)).collect();

		self.store.remove(StoreScope::Session, &keys).await?;
		self.store.remove(StoreScope::Durable, &keys).await
	}
}

fn decode(key: &str, value: Value) -> Option<CachedSummary> {
	match serde_json::from_value(value) {
		Ok(entry) => Some(entry),
		Err(err) => {
			tracing::debug!(key, error = %err, "Ignoring unreadable summary cache entry.");

			None
		},
	}
}
