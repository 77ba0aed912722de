use std::{
	collections::HashMap,
	fmt,
	sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
	DocumentId, Error, KvStore, Result, StoreScope,
	search::{ResultSet, ResultSource},
};

const SESSION_KEY: &str = "search_session";

/// Caller-owned state for one search surface.
///
/// Holds the cancellation token of the search in flight and, optionally, the channel that
/// receives incremental results. Clones share that state, so any clone can cancel the search
/// or start the next one. Beginning a new search cancels the previous one.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
	inner: Arc<ContextInner>,
}
impl SearchContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_events(events: UnboundedSender<SearchEvent>) -> Self {
		Self {
			inner: Arc::new(ContextInner {
				cancel: Mutex::new(CancellationToken::new()),
				events: Some(events),
			}),
		}
	}

	/// Cancels whatever search is in flight and returns a fresh token for the next one.
	pub fn begin(&self) -> CancellationToken {
		let mut cancel = self.inner.cancel.lock().unwrap_or_else(|err| err.into_inner());

		cancel.cancel();

		*cancel = CancellationToken::new();

		cancel.clone()
	}

	pub fn cancel(&self) {
		self.token().cancel();
	}

	pub fn token(&self) -> CancellationToken {
		self.inner.cancel.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn is_cancelled(&self) -> bool {
		self.token().is_cancelled()
	}

	pub(crate) fn sink(&self, token: CancellationToken) -> EventSink {
		EventSink { tx: self.inner.events.clone(), token }
	}
}

#[derive(Debug, Default)]
struct ContextInner {
	cancel: Mutex<CancellationToken>,
	events: Option<UnboundedSender<SearchEvent>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProgress {
	pub searched: usize,
	pub total: usize,
	pub found: usize,
}
impl fmt::Display for SearchProgress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Searched {}/{}, found {}", self.searched, self.total, self.found)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchStatus {
	Searching { progress: Option<SearchProgress> },
	Found { count: usize },
	NoResults,
	Cancelled,
}
impl SearchStatus {
	pub fn for_results(results: &ResultSet) -> Self {
		if results.is_empty() { Self::NoResults } else { Self::Found { count: results.len() } }
	}
}

impl fmt::Display for SearchStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Searching { progress: Some(progress) } => write!(f, "{progress}"),
			Self::Searching { progress: None } => write!(f, "Searching..."),
			Self::Found { count: 1 } => write!(f, "Found 1 tab"),
			Self::Found { count } => write!(f, "Found {count} tabs"),
			Self::NoResults => write!(f, "No matching tabs"),
			Self::Cancelled => write!(f, "Search cancelled"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
	/// Fast lexical results, shown while the semantic pass is still running.
	Provisional(ResultSet),
	/// Ordered results so far in progressive mode.
	Partial { results: ResultSet, progress: SearchProgress },
	/// The semantic pass produced a different ranking that supersedes the provisional one.
	Replaced(ResultSet),
	Status(SearchStatus),
	Complete(ResultSet),
	Cancelled,
}

/// Publishes events for one search. Result-bearing events are dropped once the search is
/// cancelled.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
	tx: Option<UnboundedSender<SearchEvent>>,
	token: CancellationToken,
}
impl EventSink {
	pub(crate) fn publish(&self, event: SearchEvent) -> Result<()> {
		if self.token.is_cancelled() {
			return Err(Error::Cancelled);
		}

		self.send(event);

		Ok(())
	}

	pub(crate) fn cancelled(&self) {
		self.send(SearchEvent::Cancelled);
	}

	fn send(&self, event: SearchEvent) {
		let Some(tx) = self.tx.as_ref() else { return };

		if tx.send(event).is_err() {
			tracing::debug!("Search event receiver dropped.");
		}
	}
}

/// The resumable record of the latest search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
	pub id: Uuid,
	pub query: String,
	pub results: ResultSet,
	pub status: SearchStatus,
	pub created_at: OffsetDateTime,
	/// Consumers must keep `results` in the stored order.
	pub preserve_order: bool,
}
impl SearchSession {
	pub fn start(query: &str, now: OffsetDateTime) -> Self {
		Self {
			id: Uuid::new_v4(),
			query: query.trim().to_string(),
			results: ResultSet::new(ResultSource::Lexical),
			status: SearchStatus::Searching { progress: None },
			created_at: now,
			preserve_order: true,
		}
	}

	pub fn tab_ids(&self) -> &[DocumentId] {
		self.results.ids()
	}

	pub fn matches_query(&self, query: &str) -> bool {
		self.query.to_lowercase() == query.trim().to_lowercase()
	}

	pub fn complete(&mut self, results: ResultSet) {
		self.status = SearchStatus::for_results(&results);
		self.results = results;
	}

	/// Drops an id, keeping the remaining order. Returns whether anything changed.
	pub fn remove_document(&mut self, id: DocumentId) -> bool {
		let removed = self.results.remove(id);

		let settled = matches!(self.status, SearchStatus::Found { .. } | SearchStatus::NoResults);

		if removed && settled {
			self.status = SearchStatus::for_results(&self.results);
		}

		removed
	}
}

/// Persists the latest search session in the session scope of the store.
#[derive(Clone)]
pub struct SessionStore {
	store: Arc<dyn KvStore>,
}
impl SessionStore {
	pub fn new(store: Arc<dyn KvStore>) -> Self {
		Self { store }
	}

	pub async fn load(&self) -> Result<Option<SearchSession>> {
		let keys = [SESSION_KEY.to_string()];
		let mut found = self.store.get(StoreScope::Session, &keys).await?;
		let Some(value) = found.remove(SESSION_KEY) else { return Ok(None) };

		match serde_json::from_value(value) {
			Ok(session) => Ok(Some(session)),
			Err(err) => {
				tracing::warn!(error = %err, "Discarding unreadable search session.");

				Ok(None)
			},
		}
	}

	pub async fn save(&self, session: &SearchSession) -> Result<()> {
		let value = serde_json::to_value(session)?;

		self.store.set(StoreScope::Session, HashMap::from([(SESSION_KEY.to_string(), value)])).await
	}

	/// Saves `session` only while it is still the stored one, so a superseded search cannot
	/// overwrite the session of the search that replaced it.
	pub async fn save_if_current(&self, session: &SearchSession) -> Result<bool> {
		match self.load().await? {
			Some(stored) if stored.id != session.id => Ok(false),
			_ => {
				self.save(session).await?;

				Ok(true)
			},
		}
	}

	pub async fn clear(&self) -> Result<()> {
		self.store.remove(StoreScope::Session, &[SESSION_KEY.to_string()]).await
	}
}
